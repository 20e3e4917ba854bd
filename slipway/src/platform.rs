use std::fmt;

use constcat::concat;
use itertools::Itertools;

pub const LINUX_AMD64: &str = "linux/amd64";
pub const LINUX_ARM64: &str = "linux/arm64";

/// The platform set selected by `--multi-arch`.
pub const MULTI_ARCH_SPEC: &str = concat!(LINUX_AMD64, ",", LINUX_ARM64);

/// A build target in the engine's `os/arch` or `os/arch/variant` form, e.g. `linux/amd64` or
/// `linux/arm/v7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform(String);

impl Platform {
    pub fn parse(value: &str) -> Result<Self, String> {
        let components = value.split('/').count();
        if !(2..=3).contains(&components) || value.split('/').any(|part| part.is_empty()) {
            return Err(format!(
                "expected a platform of the form os/arch or os/arch/variant, e.g. {LINUX_AMD64}, got {value:?}"
            ));
        }
        Ok(Platform(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a comma-joined platform list as accepted by `--platform`.
pub fn parse_list(value: &str) -> Result<Vec<Platform>, String> {
    value.split(',').map(Platform::parse).collect()
}

/// Comma-joins platforms in configuration order, producing the value of the engine's
/// `--platform` flag.
pub fn join_spec(platforms: &[Platform]) -> String {
    platforms.iter().map(Platform::as_str).join(",")
}

pub fn multi_arch_platforms() -> Vec<Platform> {
    vec![
        Platform(LINUX_AMD64.to_owned()),
        Platform(LINUX_ARM64.to_owned()),
    ]
}
