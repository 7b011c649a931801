mod brands;
mod history;
mod insights;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::history::HistoryCommands;
use crate::insights::MentionOrder;

#[derive(Debug, Parser)]
#[command(name = "brandpulse")]
#[command(about = "Brand sentiment insights and ad creative generation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full insights pipeline for one brand and print the JSON result
    Insights {
        /// Brand name, handle, or alias from brands.yaml (unknown names run ad hoc)
        #[arg(long)]
        brand: String,

        /// Skip ad ideas and media generation
        #[arg(long)]
        skip_creative: bool,

        /// Skip per-topic playbooks
        #[arg(long)]
        skip_playbooks: bool,

        /// Generate video ads instead of single images
        #[arg(long)]
        video: bool,

        /// Submit video jobs without waiting for them (implies --video)
        #[arg(long)]
        async_video: bool,

        /// Order of the mentions in the output
        #[arg(long, value_enum, default_value_t = MentionOrder::Fetch)]
        sort: MentionOrder,

        /// Write the result to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Inspect or reset the suggestion history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Check on a submitted video job
    VideoStatus {
        /// Job id returned when the video was submitted
        job_id: String,
    },
    /// Rebuild insights snapshots for a set of brands on a cron schedule
    Worker {
        /// Brands to refresh (repeatable)
        #[arg(long = "brand", required = true)]
        brands: Vec<String>,

        /// Six-field cron expression (seconds first)
        #[arg(long, default_value = "0 0 */3 * * *")]
        schedule: String,

        /// Directory that receives one `<brand>.json` snapshot per brand
        #[arg(long, default_value = "data/insights")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = brandpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Insights {
            brand,
            skip_creative,
            skip_playbooks,
            video,
            async_video,
            sort,
            output,
        } => {
            let args = insights::InsightsArgs {
                brand,
                skip_creative,
                skip_playbooks,
                video: video || async_video,
                async_video,
                sort,
                output,
            };
            insights::run_insights(&config, &args).await
        }
        Commands::History { command } => history::run_history(&config, &command),
        Commands::VideoStatus { job_id } => insights::run_video_status(&config, &job_id).await,
        Commands::Worker {
            brands,
            schedule,
            output_dir,
        } => worker::run_worker(&config, &brands, &schedule, &output_dir).await,
    }
}

#[cfg(test)]
mod tests;
