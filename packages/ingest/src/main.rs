#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the NYISO report ingestion tool.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use grid_ingest::summary::{RunSummary, job_line, report_codes};
use grid_ingest::{Clock, IngestConfig, Pipeline, Scheduler};
use grid_ingest_database_models::ScrapingJob;
use grid_ingest_source::SourceConfig;

#[derive(Parser)]
#[command(name = "grid_ingest", about = "NYISO report ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and store reports
    Scrape {
        /// Single day to scrape (YYYY-MM-DD). Overrides `--days`.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Number of past days to scrape, in addition to today
        #[arg(long, default_value = "1")]
        days: i64,
        /// Only scrape this report (e.g., "P-24A")
        #[arg(long)]
        report_code: Option<String>,
        /// Re-scrape even when a completed job exists
        #[arg(long)]
        force: bool,
    },
    /// Poll every report on its update cadence until interrupted
    Schedule {
        /// Run every task once and exit
        #[arg(long)]
        run_once: bool,
    },
    /// List registered report sources
    Sources {
        /// Only list sources in this category (e.g., "Pricing Data")
        #[arg(long)]
        category: Option<String>,
    },
    /// Catch up on the last day of every report plus Open-Meteo weather,
    /// then print a summary. Exits non-zero if any job failed.
    Hourly,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = IngestConfig::from_env()?;

    match cli.command {
        Commands::Sources { category } => {
            let registry = config.registry()?;
            let configs = match &category {
                Some(category) => registry.configs_by_category(category),
                None => registry.list_configs(),
            };
            print_sources(&configs);
        }
        Commands::Scrape {
            date,
            days,
            report_code,
            force,
        } => {
            let mut pipeline = Pipeline::from_config(&config)?;
            let jobs = match date {
                Some(date) => {
                    pipeline
                        .scrape_day(date, report_code.as_deref(), force)
                        .await
                }
                None => {
                    pipeline
                        .scrape_recent(days, report_code.as_deref(), force)
                        .await
                }
            };
            print_jobs(&pipeline, &jobs)?;
        }
        Commands::Schedule { run_once } => {
            let pipeline = Pipeline::from_config(&config)?;
            let clock: Arc<dyn Clock> = pipeline.clock();
            let configs: Vec<SourceConfig> = pipeline
                .registry()
                .list_configs()
                .into_iter()
                .cloned()
                .collect();

            let mut scheduler =
                Scheduler::new(pipeline, clock, config.scheduler.clone(), &configs);

            if run_once {
                scheduler.run_once().await;
            } else {
                scheduler
                    .start(true, async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            log::error!("Failed to listen for Ctrl-C: {e}");
                        }
                    })
                    .await;
            }
        }
        Commands::Hourly => {
            let start = Instant::now();
            let mut pipeline = Pipeline::from_config(&config)?;

            let mut jobs = pipeline.scrape_recent(1, None, false).await;
            match pipeline.scrape_openmeteo_weather().await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => log::error!("Open-Meteo weather: {e}"),
            }

            print_jobs(&pipeline, &jobs)?;

            let summary = RunSummary::from_jobs(&jobs);
            println!();
            println!("{summary}");
            log::info!(
                "Hourly update finished in {:.1}s",
                start.elapsed().as_secs_f64()
            );

            if summary.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_sources(configs: &[&SourceConfig]) {
    println!("{:<14} {:<24} {:<24} DATASET", "CODE", "CATEGORY", "FREQUENCY");
    println!("{}", "-".repeat(90));
    for config in configs {
        println!(
            "{:<14} {:<24} {:<24} {}",
            config.report_code,
            config.category.as_deref().unwrap_or("-"),
            config.update_frequency.as_deref().unwrap_or("-"),
            config.dataset_name
        );
    }
}

fn print_jobs(pipeline: &Pipeline, jobs: &[ScrapingJob]) -> Result<(), Box<dyn std::error::Error>> {
    let codes = report_codes(pipeline.connection())?;
    for job in jobs {
        let code = codes.get(&job.data_source_id).map_or("?", String::as_str);
        println!("{}", job_line(code, job));
    }
    Ok(())
}
