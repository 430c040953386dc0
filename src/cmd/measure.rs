//! Measure command: local measurement without any remote interaction.

use anyhow::Result;
use console::style;
use std::path::Path;

use crate::config::GateConfig;
use crate::context::RunContext;
use crate::fmt::format_bytes;

use super::check::measure_current;
use super::CliOverrides;

/// Measure the output directory and print the result.
///
/// With `json` set, the raw measurement record is printed instead of the
/// human-readable table.
pub fn cmd_measure(
    root: &Path,
    ctx: &RunContext,
    overrides: &CliOverrides,
    json: bool,
) -> Result<()> {
    let mut config = GateConfig::load(root)?;
    overrides.apply(&mut config)?;

    let stats = measure_current(root, ctx, &config, overrides, json)?;

    if json {
        println!("{}", stats.to_json()?);
        return Ok(());
    }

    println!();
    println!(
        "{:<40} {:>10} {:>10} {:>10}",
        style("File").bold(),
        style("Size").bold(),
        style("Gzip").bold(),
        style("Brotli").bold()
    );
    for file in &stats.files {
        println!(
            "{:<40} {:>10} {:>10} {:>10}",
            file.path,
            format_bytes(file.size),
            format_bytes(file.gzip),
            format_bytes(file.brotli)
        );
    }
    println!(
        "{:<40} {:>10} {:>10} {:>10}",
        style("Total").bold(),
        format_bytes(stats.total_size),
        format_bytes(stats.total_gzip),
        format_bytes(stats.total_brotli)
    );
    println!("\nCommit: {}", stats.commit);

    Ok(())
}
