use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "homegarden")]
#[command(about = "Garden proximity search and outbound URL safety checks")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "homegarden.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List gardens within a radius of a point, nearest first
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in kilometers (config default when omitted)
        #[arg(long)]
        radius: Option<f64>,

        /// Maximum number of gardens to return
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Report whether a URL may be fetched, and why not
    CheckUrl { url: String },

    /// Fetch an image through the guard and write it to a file
    FetchImage {
        url: String,

        #[arg(short, long)]
        output: String,
    },
}
