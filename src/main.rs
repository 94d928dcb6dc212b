use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use pairflow::{
    commands::{build_dataset, export_bars, find_pair, inspect_dataset, rank_symbols},
    config::{parse_date, range_from_dates, PipelineSettings},
    context::AppContext,
    dataset::Device,
};
use std::env;
use std::path::PathBuf;

const DEFAULT_DATASET_FILE: &str = "../data/universal-dataset.bin";
const DEFAULT_BAR_SNAPSHOT_FILE: &str = "../data/bars.bin";

#[derive(Parser)]
#[command(name = "pairflow")]
#[command(about = "Builds option/future minute-bar training datasets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank active options, pair them with futures and write the windowed dataset
    BuildDataset {
        /// Read bars from a snapshot file instead of the database
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: Option<PathBuf>,
        /// Destination for the dataset file
        #[arg(short, long = "output", value_name = "PATH")]
        output: Option<PathBuf>,
        /// Maximum number of option symbols to use
        #[arg(long)]
        limit: Option<usize>,
        /// Feature vectors per window
        #[arg(long)]
        lookback: Option<usize>,
        /// Minutes ahead the label looks
        #[arg(long)]
        horizon: Option<usize>,
        /// Days of history used to rank symbols
        #[arg(long)]
        days: Option<u32>,
        /// First ranking date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last ranking date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Target device: cpu, cuda or cuda:N
        #[arg(long)]
        device: Option<String>,
    },
    /// Print the most traded option symbols
    RankSymbols {
        /// Read bars from a snapshot file instead of the database
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: Option<PathBuf>,
        /// Maximum number of option symbols to print
        #[arg(long)]
        limit: Option<usize>,
        /// Days of history used to rank symbols
        #[arg(long)]
        days: Option<u32>,
    },
    /// Print the future paired with an option symbol
    FindPair {
        /// Option symbol code
        option_symbol: String,
        /// Read bars from a snapshot file instead of the database
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: Option<PathBuf>,
    },
    /// Export stored bars to a snapshot file for offline builds
    ExportBars {
        /// Destination file for the snapshot
        #[arg(short, long = "output", value_name = "PATH")]
        output: Option<PathBuf>,
        /// First date to export (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last date to export, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
    /// Print shape and label balance of a dataset file
    InspectDataset {
        /// Dataset file to inspect
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Cli { command } = cli;

    let database_url = env::var("DATABASE_URL").ok();
    if database_url.is_none() && command_requires_database(&command) {
        return Err(anyhow!(
            "DATABASE_URL must be set for this command. For offline runs, pass --data-file with a bar snapshot."
        ));
    }
    let app_context = AppContext::initialize(database_url).await?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting pairflow.");

    match command {
        Commands::BuildDataset {
            data_file,
            output,
            limit,
            lookback,
            horizon,
            days,
            start,
            end,
            device,
        } => {
            let mut settings = PipelineSettings::from_env()?;
            if let Some(limit) = limit {
                settings.symbol_limit = limit;
            }
            if let Some(lookback) = lookback {
                settings.lookback = lookback;
            }
            if let Some(horizon) = horizon {
                settings.horizon = horizon;
            }
            if let Some(days) = days {
                settings.days_to_lookback = days;
            }
            if let Some(device) = device {
                settings.device = device.parse::<Device>()?;
            }
            settings.ranking_range = range_from_dates(
                parse_optional_date(start.as_deref())?,
                parse_optional_date(end.as_deref())?,
                settings.days_to_lookback,
                Utc::now(),
            )?;

            let output_path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_FILE));
            build_dataset::run(&app_context, data_file.as_deref(), &output_path, &settings)
                .await?;
        }
        Commands::RankSymbols {
            data_file,
            limit,
            days,
        } => {
            let mut settings = PipelineSettings::from_env()?;
            if let Some(limit) = limit {
                settings.symbol_limit = limit;
            }
            if let Some(days) = days {
                settings.days_to_lookback = days;
            }
            rank_symbols::run(&app_context, data_file.as_deref(), &settings).await?;
        }
        Commands::FindPair {
            option_symbol,
            data_file,
        } => {
            find_pair::run(&app_context, data_file.as_deref(), &option_symbol).await?;
        }
        Commands::ExportBars { output, start, end } => {
            let range = range_from_dates(
                parse_optional_date(start.as_deref())?,
                parse_optional_date(end.as_deref())?,
                PipelineSettings::default().days_to_lookback,
                Utc::now(),
            )?;
            let output_path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_BAR_SNAPSHOT_FILE));
            export_bars::run(&app_context, &output_path, range.as_ref()).await?;
        }
        Commands::InspectDataset { path } => {
            inspect_dataset::run(&path)?;
        }
    }

    Ok(())
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<chrono::NaiveDate>> {
    raw.map(parse_date).transpose()
}

fn command_requires_database(command: &Commands) -> bool {
    match command {
        Commands::BuildDataset { data_file, .. }
        | Commands::RankSymbols { data_file, .. }
        | Commands::FindPair { data_file, .. } => data_file.is_none(),
        Commands::ExportBars { .. } => true,
        Commands::InspectDataset { .. } => false,
    }
}
