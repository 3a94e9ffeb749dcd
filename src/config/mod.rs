pub mod toml_config;

pub use toml_config::ValidatorConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "membership-validate")]
#[command(about = "Validate membership application data against the field rules")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Applicant data file (.json or .toml)
    #[arg(short, long, required_unless_present = "watch")]
    pub data: Option<String>,

    /// Only validate the fields of this wizard step
    #[arg(long, conflicts_with = "fields")]
    pub step: Option<u32>,

    /// Only validate these fields
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Feed stdin lines into this field as the user would type them
    #[arg(long, conflicts_with_all = ["data", "step", "fields"])]
    pub watch: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
