use relgate_core::{HostCapabilities, SemanticVersion};

/// Version of the launcher running the workflow, as it exports it.
pub const LAUNCHER_VERSION_ENV: &str = "alfred_version";

/// First launcher major version that installs extended packages.
const EXTENDED_FORMAT_MAJOR: u64 = 3;

pub fn detect(force_extended: bool) -> HostCapabilities {
    if force_extended {
        return HostCapabilities {
            extended_format: true,
        };
    }
    capabilities_for(std::env::var(LAUNCHER_VERSION_ENV).ok().as_deref())
}

fn capabilities_for(launcher_version: Option<&str>) -> HostCapabilities {
    let extended_format = launcher_version
        .and_then(|raw| raw.parse::<SemanticVersion>().ok())
        .is_some_and(|version| version.major() >= EXTENDED_FORMAT_MAJOR);

    HostCapabilities { extended_format }
}
