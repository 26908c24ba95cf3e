use clap::Parser;
use std::path::PathBuf;

use crate::error::{EnergyError, Result};
use crate::models::{DateRange, Granularity, JoinPolicy, PipelineParams, SourceFormat};
use crate::time_utils::parse_date_bound;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Hourly electricity bill report from consumption and spot-price exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "energy-bill",
    about = "Hourly electricity bill report from consumption and spot-price exports",
    version
)]
pub struct Settings {
    /// Consumption export (timestamp;total;night;day;temperature)
    #[arg(long)]
    pub consumption: PathBuf,

    /// Spot price export (timestamp,price)
    #[arg(long)]
    pub prices: PathBuf,

    /// Field delimiter of the consumption export
    #[arg(long, default_value_t = ';')]
    pub consumption_delimiter: char,

    /// Field delimiter of the price export
    #[arg(long, default_value_t = ',')]
    pub price_delimiter: char,

    /// Banner lines to skip before the price header
    #[arg(long, default_value_t = 0)]
    pub price_skip_rows: usize,

    /// Join policy used to align the two sources
    #[arg(long, default_value = "inner", value_parser = ["inner", "outer"])]
    pub join: String,

    /// Aggregation period
    #[arg(long, default_value = "all", value_parser = ["daily", "weekly", "monthly", "all"])]
    pub period: String,

    /// First timestamp to include (YYYY-MM-DD, YYYY/MM/DD or DD-MM-YYYY)
    #[arg(long)]
    pub start: Option<String>,

    /// Last timestamp to include (same layouts as --start)
    #[arg(long)]
    pub end: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::finalize(Settings::parse())
    }

    /// Same as [`Settings::load`] but from an explicit argument list.
    pub fn try_load_from<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::finalize)
    }

    fn finalize(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Build the typed pipeline parameters from the raw CLI values.
    ///
    /// Fails when a date bound cannot be parsed or the range is inverted.
    pub fn pipeline_params(&self) -> Result<PipelineParams> {
        let join: JoinPolicy = self.join.parse()?;
        let start = self.start.as_deref().map(parse_date_bound).transpose()?;
        let end = self.end.as_deref().map(parse_date_bound).transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(EnergyError::Config(format!(
                    "start {} is after end {}",
                    s, e
                )));
            }
        }

        Ok(PipelineParams {
            join,
            range: DateRange::new(start, end),
        })
    }

    /// Granularities to report, in display order.
    pub fn granularities(&self) -> Result<Vec<Granularity>> {
        if self.period == "all" {
            return Ok(Granularity::ALL.to_vec());
        }
        Ok(vec![self.period.parse()?])
    }

    pub fn consumption_format(&self) -> Result<SourceFormat> {
        SourceFormat::new(self.consumption_delimiter, 0)
    }

    pub fn price_format(&self) -> Result<SourceFormat> {
        SourceFormat::new(self.price_delimiter, self.price_skip_rows)
    }

    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
