use std::time::Duration;

use log::{debug, info, warn};

use crate::{docker, image_ref::ImageRef, process::Deadline};

/// Upper bound on a single smoke probe, including image start-up.
pub const SMOKE_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const PROBE_ARGS: [&str; 2] = ["--help", "--version"];

/// Smoke-tests a locally available image by asking it to describe itself: `--help` first, then
/// `--version`, each bounded by [`SMOKE_PROBE_TIMEOUT`]. The first probe that exits cleanly
/// settles it. Advisory only: images that are not self-describing CLIs legitimately fail both
/// probes, so failure warns without demoting the build.
pub fn smoke_test(image: &ImageRef) {
    info!("smoke testing {image}...");

    for probe_arg in PROBE_ARGS {
        match docker::run_probe(image, probe_arg, Deadline::after(SMOKE_PROBE_TIMEOUT)) {
            Ok(Some(status)) if status.success() => {
                debug!("smoke probe `{probe_arg}` succeeded");
                info!("{image} starts and responds");
                return;
            }
            Ok(Some(_)) => debug!("smoke probe `{probe_arg}` exited with a failure"),
            Ok(None) => debug!("smoke probe `{probe_arg}` timed out"),
            Err(error) => debug!("smoke probe `{probe_arg}` could not run: {error}"),
        }
    }

    warn!(
        "{image} answered neither --help nor --version. This is expected for images that are \
        not self-describing CLIs; verify it by hand with `docker run --rm {image}`."
    );
}
