use std::time::Duration;

use log::{debug, warn};

/// The package registry that the image's dependency-restore step pulls from during the build.
pub const PACKAGE_REGISTRY_URL: &str = "https://registry.npmjs.org/";

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort reachability probe of the package registry. Purely advisory: the outcome shapes
/// troubleshooting, never control flow, since a failed probe usually foretells a failing
/// dependency restore inside the build rather than a broken build setup.
pub fn check_package_registry() {
    match probe(PACKAGE_REGISTRY_URL) {
        Ok(status) => {
            debug!("package registry {PACKAGE_REGISTRY_URL} answered with status {status}")
        }
        Err(error) => warn!(
            "could not reach the package registry at {PACKAGE_REGISTRY_URL}: {error}. The build \
            may fail while restoring dependencies; check your connectivity, set HTTPS_PROXY if \
            you are behind a proxy, or raise --retry to ride out flaky networking."
        ),
    }
}

fn probe(url: &str) -> Result<reqwest::StatusCode, reqwest::Error> {
    let client = reqwest::blocking::Client::builder().build()?;
    let response = client.head(url).timeout(PROBE_TIMEOUT).send()?;
    Ok(response.status())
}
