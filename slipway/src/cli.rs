use clap::Parser;
use constcat::concat;
use log::debug;

use crate::{
    command::EngineCommand,
    config::{BuildArg, BuildConfig, RawConfig},
    docker,
    platform::{self, Platform},
    preflight, report,
    retry::{BuildResult, Retry, RetryOutcome},
    temp_path::TempPath,
    validate, Result,
};

// The alias keeps clap's derive from treating the Vec as a repeated argument; the whole list
// arrives as one comma-joined value.
type PlatformList = Vec<Platform>;

fn expect_platforms(value: &str) -> Result<PlatformList, String> {
    platform::parse_list(value)
}

fn expect_name(value: &str) -> Result<String, &'static str> {
    if value.is_empty() {
        return Err("expected a non-empty image name");
    }
    Ok(value.to_string())
}

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Name of the image to build.
    #[arg(short = 'n', long = "name", default_value = "app", value_parser = expect_name)]
    name: String,

    /// Tag to apply to the image.
    #[arg(short = 't', long = "tag", default_value = "latest")]
    tag: String,

    /// Comma-joined list of target platforms in os/arch form, e.g. linux/arm64. More than one
    /// platform implies --buildx.
    #[arg(short = 'p', long = "platform", value_name = "SPEC", value_parser = expect_platforms)]
    platform: Option<PlatformList>,

    /// Registry host the image reference is qualified with, e.g. registry.example.com.
    #[arg(short = 'r', long = "registry")]
    registry: Option<String>,

    #[arg(long = "multi-arch", default_value_t, help = concat!("Build for ", platform::MULTI_ARCH_SPEC, ", overriding --platform and implying --buildx"))]
    multi_arch: bool,

    /// Push the image to its registry instead of keeping it local.
    #[arg(long = "push", default_value_t)]
    push: bool,

    /// Maximum number of build attempts before giving up.
    #[arg(long = "retry", value_name = "N", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    retry: u32,

    /// Use the multi-platform builder even when nothing else requires it.
    #[arg(long = "buildx", default_value_t)]
    buildx: bool,

    /// Import build cache from the given locator, e.g. type=registry,ref=registry.io/app:cache.
    /// Implies --buildx.
    #[arg(long = "cache-from", value_name = "SRC")]
    cache_from: Option<String>,

    /// Export build cache to the given locator. Implies --buildx.
    #[arg(long = "cache-to", value_name = "DEST")]
    cache_to: Option<String>,

    /// KEY=VALUE made available as a build-time variable; may be repeated.
    #[arg(long = "build-arg", value_name = "KEY=VALUE", value_parser = BuildArg::parse)]
    build_args: Vec<BuildArg>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        build(&self.into_config())
    }

    fn into_config(self) -> BuildConfig {
        let Cli {
            name,
            tag,
            platform,
            registry,
            multi_arch,
            push,
            retry,
            buildx,
            cache_from,
            cache_to,
            build_args,
        } = self;

        BuildConfig::resolve(RawConfig {
            name,
            tag,
            registry,
            platforms: platform.unwrap_or_default(),
            multi_arch,
            push,
            retry_limit: retry,
            buildx,
            cache_from,
            cache_to,
            build_args,
        })
    }
}

/// Exit code for a parse failure: usage problems are fatal (1), while help and version requests
/// are not errors at all (0).
pub fn parse_error_exit_code(error: &clap::Error) -> i32 {
    match error.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn build(config: &BuildConfig) -> Result<()> {
    docker::check(config.buildx)?;
    preflight::check_package_registry();

    let command = EngineCommand::for_config(config);
    debug!("build command: {command}");

    // Owns the engine-written identity file; dropping it removes the file on every exit path
    // below, the early error returns included.
    let identity_file = TempPath::json();

    let outcome =
        Retry { limit: config.retry_limit }.run(|_| docker::build(&command, &identity_file));

    let result = match outcome {
        RetryOutcome::Succeeded { value, attempts } => {
            BuildResult::new(config.image.clone(), true, &attempts, value.identity)
        }
        RetryOutcome::Exhausted { attempts } => {
            BuildResult::new(config.image.clone(), false, &attempts, None)
        }
    };

    if !result.succeeded {
        report::failure(&result);
        return Err(format!(
            "build of {image} failed after {attempts} attempts",
            image = result.image,
            attempts = result.attempts_consumed
        )
        .into());
    }

    if config.push && !config.buildx {
        // The classic builder cannot push during the build; publish the tag it just produced.
        docker::push(&config.image).map_err(|error| {
            format!(
                "{error}. Check that you are logged in to the registry and allowed to write to \
                {image}",
                image = config.image
            )
        })?;
    }

    if config.push {
        debug!("skipping the smoke test, pushed images leave no local artifact to probe");
    } else {
        validate::smoke_test(&config.image);
    }

    report::success(&result, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["slipway"]).unwrap();
        assert_eq!(cli.name, "app");
        assert_eq!(cli.tag, "latest");
        assert_eq!(cli.platform, None);
        assert_eq!(cli.registry, None);
        assert!(!cli.multi_arch);
        assert!(!cli.push);
        assert_eq!(cli.retry, 3);
        assert!(!cli.buildx);
        assert!(cli.build_args.is_empty());
    }

    #[test]
    fn test_platform_takes_a_comma_joined_list() {
        let cli = Cli::try_parse_from(["slipway", "-p", "linux/amd64,linux/arm64"]).unwrap();
        let config = cli.into_config();
        assert_eq!(
            platform::join_spec(&config.platforms),
            "linux/amd64,linux/arm64"
        );
        assert!(config.buildx);
    }

    #[test]
    fn test_platform_rejects_malformed_specs() {
        let error = Cli::try_parse_from(["slipway", "-p", "linux"]).unwrap_err();
        assert_eq!(parse_error_exit_code(&error), 1);
    }

    #[test]
    fn test_name_rejects_empty() {
        let error = Cli::try_parse_from(["slipway", "-n", ""]).unwrap_err();
        assert_eq!(parse_error_exit_code(&error), 1);
    }

    #[test]
    fn test_multi_arch_push_resolves_to_a_buildx_config() {
        let cli = Cli::try_parse_from(["slipway", "--multi-arch", "--push", "-r", "registry.io"])
            .unwrap();
        let config = cli.into_config();
        assert!(config.buildx);
        assert!(config.push);
        assert_eq!(
            platform::join_spec(&config.platforms),
            platform::MULTI_ARCH_SPEC
        );
        assert_eq!(config.image.to_string(), "registry.io/app:latest");
    }

    #[test]
    fn test_retry_rejects_zero() {
        let error = Cli::try_parse_from(["slipway", "--retry", "0"]).unwrap_err();
        assert_eq!(parse_error_exit_code(&error), 1);
    }

    #[test]
    fn test_build_args_repeat_and_preserve_order() {
        let cli = Cli::try_parse_from(["slipway", "--build-arg", "B=2", "--build-arg", "A=1"])
            .unwrap();
        assert_eq!(cli.build_args.len(), 2);
        assert_eq!(cli.build_args[0].to_string(), "B=2");
        assert_eq!(cli.build_args[1].to_string(), "A=1");
    }

    #[test]
    fn test_unknown_flag_is_a_fatal_usage_error() {
        let error = Cli::try_parse_from(["slipway", "--bogus"]).unwrap_err();
        assert_eq!(parse_error_exit_code(&error), 1);
    }

    #[test]
    fn test_help_and_version_are_not_usage_errors() {
        let help = Cli::try_parse_from(["slipway", "--help"]).unwrap_err();
        assert_eq!(parse_error_exit_code(&help), 0);

        let version = Cli::try_parse_from(["slipway", "--version"]).unwrap_err();
        assert_eq!(parse_error_exit_code(&version), 0);
    }
}
