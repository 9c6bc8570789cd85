use crate::domain::model::{Country, Traveler};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "country-tracker")]
#[command(about = "Track travel days per country and year")]
pub struct CliConfig {
    /// Path to TOML configuration file [default: tracker-config.toml, if present]
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override storage.data_dir
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Override remote.endpoint
    #[arg(long)]
    pub remote_endpoint: Option<String>,

    /// Use the local store only
    #[arg(long)]
    pub no_remote: bool,

    /// Ignore the [github] section
    #[arg(long)]
    pub no_github: bool,

    /// Name recorded in the activity log
    #[arg(long)]
    pub user: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Record a new trip
    Add {
        #[arg(long, value_parser = parse_traveler)]
        traveler: Traveler,
        #[arg(long, value_parser = parse_country)]
        country: Country,
        /// Departure date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Arrival date (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List trips, most recent first
    List {
        #[arg(long, value_parser = parse_traveler)]
        traveler: Option<Traveler>,
    },
    /// Edit fields of an existing trip
    Update {
        id: String,
        #[arg(long, value_parser = parse_traveler)]
        traveler: Option<Traveler>,
        #[arg(long, value_parser = parse_country)]
        country: Option<Country>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Pass an empty string to remove the note
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a trip
    Delete { id: String },
    /// Per-country day totals for one traveler and year
    Stats {
        #[arg(long, value_parser = parse_traveler)]
        traveler: Traveler,
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
    /// Years that have trips, most recent first
    Years,
    /// Per-year breakdown for all travelers
    Report {
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write all trips as JSON
    Export {
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Replace all trips with the contents of a JSON export
    Import { file: String },
    /// Show the activity log
    Activity,
    /// Delete all data from every backend
    Clear {
        /// Overrides remote.admin_password
        #[arg(long)]
        admin_password: Option<String>,
        /// Required to actually clear
        #[arg(long)]
        yes: bool,
        /// Leave the GitHub data file in place
        #[arg(long)]
        keep_github: bool,
    },
    /// Copy trips between the active store and the GitHub file
    Sync {
        #[arg(value_enum)]
        direction: SyncDirection,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncDirection {
    /// Overwrite the GitHub file with the current trips
    Push,
    /// Replace the current trips with the GitHub file
    Pull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Csv,
}

fn parse_traveler(value: &str) -> Result<Traveler, String> {
    value.parse().map_err(|e: crate::utils::error::TrackerError| e.to_string())
}

fn parse_country(value: &str) -> Result<Country, String> {
    value.parse().map_err(|e: crate::utils::error::TrackerError| e.to_string())
}
