use std::{ffi::OsStr, path::Path};

use log::{debug, info};

use crate::{
    command::EngineCommand,
    image_ref::ImageRef,
    process::{self, Deadline},
    temp_path::TempPath,
    Result,
};

pub const ENGINE: &str = "docker";

/// Partial implementation of the JSON emitted by the `--metadata-file` option of
/// `docker buildx build`. See https://docs.docker.com/reference/cli/docker/buildx/build/#metadata-file.
#[derive(serde::Deserialize)]
struct MetadataFile {
    #[serde(rename = "containerimage.digest")]
    containerimage_digest: String,
}

pub struct BuildOutput {
    /// The buildx metadata digest or the classic builder's image ID. Capture is best-effort:
    /// the artifact exists whether or not the engine reported an identity.
    pub identity: Option<String>,
}

/// Verifies that the engine binary is present and its daemon responsive, and logs the daemon
/// version for diagnostics. When the multi-platform builder is required, additionally verifies
/// that the buildx extension answers. Any failure here is fatal and precedes the first build
/// attempt.
pub fn check(buildx_required: bool) -> Result<()> {
    let output =
        process::command!(ENGINE, "version", "--format", "{{.Server.Version}}").try_output()?;

    if !output.status.success() {
        return Err(format!(
            "the `{ENGINE}` daemon did not respond, make sure it is running and that your user \
            is allowed to access its socket"
        )
        .into());
    }

    log_engine_version(&output.stdout);

    if buildx_required {
        let buildx = process::command!(ENGINE, "buildx", "version").try_output()?;
        if !buildx.status.success() {
            return Err(format!(
                "this build requires the `{ENGINE} buildx` extension which is not available, \
                install the buildx plugin (https://docs.docker.com/go/buildx/) and try again"
            )
            .into());
        }
    }

    Ok(())
}

// Best-effort: a missing or unparsable version only degrades the log line.
fn log_engine_version(stdout: &[u8]) {
    let reported = match std::str::from_utf8(stdout) {
        Ok(reported) => reported.trim(),
        Err(_) => {
            debug!("engine reported a non-UTF-8 server version");
            return;
        }
    };
    if reported.is_empty() {
        debug!("engine did not report a server version");
        return;
    }
    match semver::Version::parse(reported.trim_start_matches('v')) {
        Ok(version) => info!("using {ENGINE} engine {version}"),
        Err(_) => info!("using {ENGINE} engine {reported:?}"),
    }
}

/// Runs one build attempt. The engine inherits the terminal so its own progress output stays
/// visible; a non-zero exit becomes an error that the caller may retry. The identity file is
/// parsed only after a successful exit.
pub fn build(command: &EngineCommand, identity_file: &TempPath) -> process::Result<BuildOutput> {
    let mut args: Vec<&OsStr> = command.args().iter().map(AsRef::as_ref).collect();

    // The capture flag goes in front of the positional build context.
    let capture_flag: &str = if command.is_buildx() {
        "--metadata-file"
    } else {
        "--iidfile"
    };
    let context_position = args.len() - 1;
    args.insert(context_position, capture_flag.as_ref());
    args.insert(context_position + 1, identity_file.path().as_ref());

    process::Command::new(ENGINE).args(args).status()?;

    Ok(BuildOutput {
        identity: read_identity(command.is_buildx(), identity_file.path()),
    })
}

fn read_identity(buildx: bool, path: &Path) -> Option<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            debug!("no identity file at {path}: {error}", path = path.display());
            return None;
        }
    };
    if buildx {
        digest_from_metadata(&contents)
    } else {
        id_from_iidfile(&contents)
    }
}

fn digest_from_metadata(contents: &str) -> Option<String> {
    match serde_json::from_str::<MetadataFile>(contents) {
        Ok(metadata) => Some(metadata.containerimage_digest),
        Err(error) => {
            debug!("could not parse the buildx metadata file: {error}");
            None
        }
    }
}

fn id_from_iidfile(contents: &str) -> Option<String> {
    let id = contents.trim();
    (!id.is_empty()).then(|| id.to_owned())
}

/// Publishes the tagged image to its registry. Only used after classic builds; buildx builds
/// push from within the builder.
pub fn push(image: &ImageRef) -> process::Result<()> {
    process::command!(ENGINE, "push", image.to_string()).status()
}

/// Starts a throwaway container from the image with a single argument, bounded by the deadline.
/// Returns `Ok(None)` when the deadline expired before the container finished.
pub fn run_probe(
    image: &ImageRef,
    probe_arg: &str,
    deadline: Deadline,
) -> process::Result<Option<process::ExitStatus>> {
    process::command!(ENGINE, "run", "--rm", image.to_string(), probe_arg)
        .try_status_within(deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_from_metadata() {
        let contents = r#"{
            "buildx.build.ref": "builder/builder0/abc",
            "containerimage.digest": "sha256:74e3"
        }"#;
        assert_eq!(digest_from_metadata(contents).as_deref(), Some("sha256:74e3"));
    }

    #[test]
    fn test_digest_from_metadata_requires_the_digest_key() {
        assert_eq!(digest_from_metadata(r#"{"buildx.build.ref": "x"}"#), None);
        assert_eq!(digest_from_metadata("not json"), None);
    }

    #[test]
    fn test_id_from_iidfile_trims() {
        assert_eq!(id_from_iidfile("sha256:74e3\n").as_deref(), Some("sha256:74e3"));
    }

    #[test]
    fn test_id_from_iidfile_rejects_empty() {
        assert_eq!(id_from_iidfile("  \n"), None);
    }
}
