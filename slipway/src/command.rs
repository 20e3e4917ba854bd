use std::fmt;

use itertools::Itertools;

use crate::{config::BuildConfig, docker, platform};

/// The build context handed to the engine, always the current working directory.
pub const BUILD_CONTEXT: &str = ".";

/// An engine build invocation as an argument vector. Operator-supplied values (tags, cache
/// locators, build arguments) stay discrete arguments all the way down to
/// `std::process::Command`, so shell metacharacters in them carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    args: Vec<String>,
}

impl EngineCommand {
    /// Derives the build invocation from the configuration. Pure: identical configurations
    /// always yield identical commands.
    pub fn for_config(config: &BuildConfig) -> Self {
        let mut args = Vec::new();

        if config.buildx {
            args.push("buildx".to_owned());
            args.push("build".to_owned());
            if !config.platforms.is_empty() {
                args.push("--platform".to_owned());
                args.push(platform::join_spec(&config.platforms));
            }
            if let Some(cache_from) = &config.cache_from {
                args.push("--cache-from".to_owned());
                args.push(cache_from.clone());
            }
            if let Some(cache_to) = &config.cache_to {
                args.push("--cache-to".to_owned());
                args.push(cache_to.clone());
            }
            // buildx keeps its result inside the builder unless told where to put it: the
            // registry (`--push`) or the local engine (`--load`).
            args.push(if config.push { "--push" } else { "--load" }.to_owned());
        } else {
            args.push("build".to_owned());
        }

        args.push("--tag".to_owned());
        args.push(config.image.to_string());

        for build_arg in &config.build_args {
            args.push("--build-arg".to_owned());
            args.push(build_arg.to_string());
        }

        args.push(BUILD_CONTEXT.to_owned());

        EngineCommand { args }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_buildx(&self) -> bool {
        self.args.first().map(String::as_str) == Some("buildx")
    }
}

/// Renders the invocation for logs and reports. Execution never goes through a shell.
impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{engine} {args}",
            engine = docker::ENGINE,
            args = self.args.iter().join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildArg, RawConfig};

    fn raw() -> RawConfig {
        RawConfig {
            name: "x".to_string(),
            tag: "latest".to_string(),
            registry: None,
            platforms: Vec::new(),
            multi_arch: false,
            push: false,
            retry_limit: 3,
            buildx: false,
            cache_from: None,
            cache_to: None,
            build_args: Vec::new(),
        }
    }

    fn command(raw: RawConfig) -> EngineCommand {
        EngineCommand::for_config(&BuildConfig::resolve(raw))
    }

    #[test]
    fn test_plain_build() {
        let command = command(raw());
        assert_eq!(command.args(), ["build", "--tag", "x:latest", "."]);
    }

    #[test]
    fn test_identical_configs_yield_identical_commands() {
        assert_eq!(command(raw()), command(raw()));

        let configured = || RawConfig {
            registry: Some("registry.io".to_string()),
            platforms: platform::parse_list("linux/amd64,linux/arm64").unwrap(),
            push: true,
            build_args: vec![BuildArg::parse("A=1").unwrap()],
            ..raw()
        };
        assert_eq!(command(configured()), command(configured()));
    }

    #[test]
    fn test_buildx_without_push_loads_into_local_engine() {
        let command = command(RawConfig {
            buildx: true,
            ..raw()
        });
        assert_eq!(command.args(), ["buildx", "build", "--load", "--tag", "x:latest", "."]);
    }

    #[test]
    fn test_buildx_with_push_publishes_directly() {
        let command = command(RawConfig {
            buildx: true,
            push: true,
            ..raw()
        });
        assert!(command.args().contains(&"--push".to_string()));
        assert!(!command.args().contains(&"--load".to_string()));
    }

    #[test]
    fn test_cache_options_force_buildx_and_are_forwarded() {
        let command = command(RawConfig {
            cache_from: Some("type=registry,ref=registry.io/x:cache".to_string()),
            cache_to: Some("type=inline".to_string()),
            ..raw()
        });
        assert!(command.is_buildx());
        assert_eq!(
            command.args(),
            [
                "buildx",
                "build",
                "--cache-from",
                "type=registry,ref=registry.io/x:cache",
                "--cache-to",
                "type=inline",
                "--load",
                "--tag",
                "x:latest",
                ".",
            ]
        );
    }

    #[test]
    fn test_multi_arch_with_push() {
        let command = command(RawConfig {
            multi_arch: true,
            push: true,
            ..raw()
        });
        assert_eq!(
            command.args(),
            [
                "buildx",
                "build",
                "--platform",
                "linux/amd64,linux/arm64",
                "--push",
                "--tag",
                "x:latest",
                ".",
            ]
        );
    }

    #[test]
    fn test_multi_arch_overrides_explicit_platform() {
        let command = command(RawConfig {
            platforms: platform::parse_list("linux/riscv64").unwrap(),
            multi_arch: true,
            ..raw()
        });
        assert!(command
            .args()
            .contains(&platform::MULTI_ARCH_SPEC.to_string()));
        assert!(!command.args().contains(&"linux/riscv64".to_string()));
    }

    #[test]
    fn test_plain_build_has_no_platform_flag() {
        let command = command(RawConfig {
            platforms: platform::parse_list("linux/arm64").unwrap(),
            ..raw()
        });
        assert_eq!(command.args(), ["build", "--tag", "x:latest", "."]);
    }

    #[test]
    fn test_build_args_preserve_order() {
        let command = command(RawConfig {
            build_args: vec![
                BuildArg::parse("B=2").unwrap(),
                BuildArg::parse("A=1").unwrap(),
            ],
            ..raw()
        });
        assert_eq!(
            command.args(),
            ["build", "--tag", "x:latest", "--build-arg", "B=2", "--build-arg", "A=1", "."]
        );
    }

    #[test]
    fn test_tag_is_fully_qualified() {
        let command = command(RawConfig {
            registry: Some("registry.io".to_string()),
            tag: "v1".to_string(),
            ..raw()
        });
        assert!(command.args().contains(&"registry.io/x:v1".to_string()));
    }

    #[test]
    fn test_metacharacters_stay_single_arguments() {
        let command = command(RawConfig {
            build_args: vec![BuildArg::parse("CMD=$(rm -rf /); echo `pwnd`").unwrap()],
            ..raw()
        });
        assert!(command
            .args()
            .contains(&"CMD=$(rm -rf /); echo `pwnd`".to_string()));
    }
}
