use std::fmt;
use std::str::FromStr;

use crate::error::UpdateError;

/// An `owner/name` repository slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache key for this repository's release list.
    ///
    /// The owner is length-prefixed since both segments may contain `-`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("gh-releases-{}-{}-{}", self.owner.len(), self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UpdateError::InvalidIdentifier {
            identifier: s.to_string(),
        };

        let (owner, name) = s.trim().split_once('/').ok_or_else(invalid)?;
        let valid_segment = |segment: &str| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        };

        if !valid_segment(owner) || !valid_segment(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
