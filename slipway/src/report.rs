use log::{info, warn};

use crate::{config::BuildConfig, docker, retry::BuildResult, Result};

/// Prints the success summary table and what to do with the image next.
pub fn success(result: &BuildResult, config: &BuildConfig) -> Result<()> {
    use comfy_table::{Attribute, Cell, ContentArrangement, Table};

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["image", "identity", "attempts", "build time", "finished (UTC)"]
                .map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
        );

    table.add_row([
        result.image.to_string(),
        result.identity.clone().unwrap_or_default(),
        result.attempts_consumed.to_string(),
        format!("{:.1?}", result.final_attempt_duration),
        format_timestamp(result.finished_at)?,
    ]);

    println!("{table}");

    let image = &result.image;
    if config.push {
        info!(
            "pushed {image}; pull it with `{engine} pull {image}`",
            engine = docker::ENGINE
        );
    } else {
        info!(
            "{image} is available locally; run it with `{engine} run --rm {image}`",
            engine = docker::ENGINE
        );
    }

    Ok(())
}

/// Prints the failure summary. The caller still surfaces the fatal error itself.
pub fn failure(result: &BuildResult) {
    warn!(
        "the build of {image} failed {attempts} times in a row. If the failures look network \
        related, check your connectivity, set HTTPS_PROXY if you are behind a proxy, or raise \
        --retry; otherwise look for the first error in the engine output above.",
        image = result.image,
        attempts = result.attempts_consumed,
    );
}

fn format_timestamp(value: time::OffsetDateTime) -> Result<String> {
    let fd = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    Ok(value.format(fd)?)
}
