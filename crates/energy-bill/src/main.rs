mod bootstrap;
mod report;

use anyhow::{Context, Result};
use energy_core::settings::Settings;
use energy_data::analysis::analyze_files;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("energy-bill v{} starting", env!("CARGO_PKG_VERSION"));

    let params = settings.pipeline_params()?;
    let granularities = settings.granularities()?;
    tracing::info!(
        "Join: {}, periods: {:?}, range: {:?} .. {:?}",
        params.join,
        granularities,
        params.range.start,
        params.range.end
    );

    let result = analyze_files(
        &settings.consumption,
        settings.consumption_format()?,
        &settings.prices,
        settings.price_format()?,
        &params,
        &granularities,
    )
    .context("energy bill analysis failed")?;

    let output = if settings.wants_json() {
        report::render_json(&result)?
    } else {
        report::render_text(&result)
    };
    print!("{}", output);

    Ok(())
}
