use std::fmt;

use log::warn;

use crate::{
    image_ref::ImageRef,
    platform::{self, Platform},
};

/// A `KEY=VALUE` build-time argument forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArg {
    pub key: String,
    pub value: String,
}

impl BuildArg {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(BuildArg {
                key: key.to_owned(),
                value: value.to_owned(),
            }),
            _ => Err(format!(
                "expected a build argument of the form KEY=VALUE with a non-empty KEY, got {value:?}"
            )),
        }
    }
}

impl fmt::Display for BuildArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{key}={value}", key = self.key, value = self.value)
    }
}

/// Flag values exactly as parsed from the command line, before invariant resolution.
#[derive(Debug)]
pub struct RawConfig {
    pub name: String,
    pub tag: String,
    pub registry: Option<String>,
    pub platforms: Vec<Platform>,
    pub multi_arch: bool,
    pub push: bool,
    pub retry_limit: u32,
    pub buildx: bool,
    pub cache_from: Option<String>,
    pub cache_to: Option<String>,
    pub build_args: Vec<BuildArg>,
}

/// Immutable snapshot of all build parameters. Constructed exactly once from the parsed command
/// line and passed by reference to every later pipeline stage. The constructor upholds the
/// builder invariants: layer caching, more than one target platform, and `--multi-arch` all
/// require the multi-platform builder, whether or not `--buildx` was given.
#[derive(Debug)]
pub struct BuildConfig {
    pub image: ImageRef,
    pub platforms: Vec<Platform>,
    pub push: bool,
    pub retry_limit: u32,
    pub buildx: bool,
    pub cache_from: Option<String>,
    pub cache_to: Option<String>,
    pub build_args: Vec<BuildArg>,
}

impl BuildConfig {
    pub fn resolve(raw: RawConfig) -> Self {
        let RawConfig {
            name,
            tag,
            registry,
            platforms,
            multi_arch,
            push,
            retry_limit,
            buildx,
            cache_from,
            cache_to,
            build_args,
        } = raw;

        // `--multi-arch` replaces any explicitly requested platforms with the fixed pair.
        let platforms = if multi_arch {
            platform::multi_arch_platforms()
        } else {
            platforms
        };

        let caching = cache_from.is_some() || cache_to.is_some();
        let buildx = buildx || multi_arch || platforms.len() > 1 || caching;

        if !buildx && platforms.len() == 1 {
            warn!(
                "the classic builder always targets the host platform and ignores --platform {spec}, pass --buildx to honor it",
                spec = platform::join_spec(&platforms),
            );
        }

        BuildConfig {
            image: ImageRef::new(registry, name, tag),
            platforms,
            push,
            retry_limit,
            buildx,
            cache_from,
            cache_to,
            build_args,
        }
    }
}
