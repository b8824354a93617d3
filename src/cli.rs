use clap::Parser;

use crate::entry_date::EntryDate;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Output file. Existing entries in it are kept and only missing days are fetched.
    #[arg(long, default_value = "titles.csv")]
    pub output: String,

    /// First year to collect; the range starts on January 1st (UTC).
    #[arg(long, default_value_t = 2010)]
    pub start_year: i32,

    /// Last day to collect (YYYY-MM-DD). Defaults to yesterday in UTC.
    #[arg(long, value_parser = parse_entry_date)]
    pub end: Option<EntryDate>,

    /// Minimum wait between front page requests.
    #[arg(long, default_value_t = 20_000)]
    pub min_wait_ms: u64,

    /// Maximum wait between front page requests.
    #[arg(long, default_value_t = 30_000)]
    pub max_wait_ms: u64,

    /// Seconds to run before stopping and saving what was collected.
    #[arg(long, default_value_t = 60)]
    pub duration: u64,

    /// Run until the whole range is collected.
    #[arg(long, conflicts_with = "duration")]
    pub no_deadline: bool,

    /// Origin serving the dated front pages.
    #[arg(long, default_value = crate::source::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Timeout for a single front page request.
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,
}

fn parse_entry_date(value: &str) -> Result<EntryDate, String> {
    EntryDate::parse(value).map_err(|err| err.to_string())
}
