use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version number: {input}")]
pub struct VersionParseError {
    pub input: String,
}

/// A release or installed version.
///
/// Accepts the loose forms release tags tend to use (`v1.2`, `3.1-beta`,
/// `1.02.0`, `2.0.0-rc.01`). Missing components default to zero and the
/// prerelease and build suffixes are kept as written. Ordering and equality
/// ignore build metadata.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: String,
    build: String,
}

impl SemanticVersion {
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: String::new(),
            build: String::new(),
        }
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.minor
    }

    #[must_use]
    pub fn patch(&self) -> u64 {
        self.patch
    }
}

impl From<Version> for SemanticVersion {
    fn from(version: Version) -> Self {
        Self {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
            pre: version.pre.as_str().to_string(),
            build: version.build.as_str().to_string(),
        }
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unprefixed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        if let Ok(strict) = Version::parse(unprefixed) {
            return Ok(strict.into());
        }
        parse_loose(unprefixed).ok_or_else(|| VersionParseError {
            input: s.to_string(),
        })
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| cmp_prerelease(&self.pre, &other.pre))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

/// One dot-separated prerelease identifier. Numeric identifiers sort below
/// alphanumeric ones.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Identifier<'a> {
    Numeric(u64),
    Text(&'a str),
}

impl<'a> From<&'a str> for Identifier<'a> {
    fn from(part: &'a str) -> Self {
        if is_numeric(part)
            && let Ok(number) = part.parse()
        {
            return Self::Numeric(number);
        }
        Self::Text(part)
    }
}

fn cmp_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a
            .split('.')
            .map(Identifier::from)
            .cmp(b.split('.').map(Identifier::from)),
    }
}

fn parse_loose(version: &str) -> Option<SemanticVersion> {
    let (core, suffix) = split_core_and_suffix(version);

    let mut parts = core.split('.');
    let major = parse_component(parts.next()?)?;
    let minor = parts.next().map(parse_component).unwrap_or(Some(0))?;
    let patch = parts.next().map(parse_component).unwrap_or(Some(0))?;
    if parts.next().is_some() {
        return None;
    }

    let (pre, build) = match suffix.split_once('+') {
        Some((pre, build)) => (pre, build),
        None => (suffix, ""),
    };
    let pre = if pre.is_empty() {
        ""
    } else {
        pre.strip_prefix('-')?
    };

    Some(SemanticVersion {
        major,
        minor,
        patch,
        pre: pre.to_string(),
        build: build.to_string(),
    })
}

fn parse_component(part: &str) -> Option<u64> {
    if !is_numeric(part) {
        return None;
    }
    part.parse().ok()
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

fn split_core_and_suffix(version: &str) -> (&str, &str) {
    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    version.split_at(suffix_idx)
}
