pub mod team_config;

pub use team_config::TeamConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "year-review")]
#[command(about = "Generate year-in-review pages from GitHub, Slack and calendar activity")]
pub struct CliConfig {
    #[arg(long, default_value = "config/team_config.json")]
    pub config: String,

    #[arg(long, help = "Override the output directory for HTML pages")]
    pub output_dir: Option<String>,

    #[arg(long, help = "Override the raw data cache directory")]
    pub data_dir: Option<String>,

    #[arg(long, help = "Override the report year")]
    pub year: Option<i32>,

    #[arg(long, help = "Ignore cached data and collect again")]
    pub refresh: bool,

    #[arg(long, help = "Print the run plan without collecting or writing anything")]
    pub dry_run: bool,

    #[arg(long, help = "Log process CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Log in JSON instead of compact text")]
    pub json_logs: bool,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Command-line values take precedence over the team file.
    pub fn apply_overrides(&self, config: &mut TeamConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(year) = self.year {
            config.year = year;
        }
    }
}
