use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

/// Reservoir site suitability CLI tool
#[derive(Parser)]
#[command(name = "hydrosite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ten-layer analysis for a point and buffer radius
    Analyze {
        /// Latitude of the candidate site in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Longitude of the candidate site in decimal degrees
        #[arg(long)]
        lon: f64,

        /// Buffer radius in meters (1000-50000)
        #[arg(short, long)]
        buffer: Option<u32>,

        /// Pretty-print the JSON response
        #[arg(short, long)]
        pretty: bool,
    },

    /// List the layers the analysis evaluates
    Layers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            lat,
            lon,
            buffer,
            pretty,
        } => commands::analyze::run(lat, lon, buffer, pretty).await,
        Commands::Layers => commands::layers::run(),
    }
}
