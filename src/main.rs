mod auction;
mod catalog;
mod config;
mod controller;
mod decision;
mod event;
mod event_log;
mod finalizer;
mod increment;
mod ledger;
mod narrative;
mod observer;
mod priority;
mod round;
mod seed;
mod service;

use anyhow::{bail, Result};
use clap::Parser;
use config::{AuctionConfig, SeedConfig};
use seed::SeedSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Sequential lot-by-lot auction simulator
#[derive(Parser, Debug)]
#[command(version, about)]
struct Opts {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON seed file; overrides the configured seed
    #[arg(long)]
    seed: Option<PathBuf>,
    /// Where to write the final result as JSON
    #[arg(long)]
    export: Option<PathBuf>,
    /// Seed for the built-in heuristic bidders
    #[arg(long, default_value_t = 7)]
    rng_seed: u64,
    /// Keep the observer running after the auction ends, until stopped
    #[arg(long)]
    linger: bool,
}

fn load_seed(opts: &Opts, config: &AuctionConfig) -> Result<seed::Seed> {
    match (&opts.seed, &config.seed) {
        (Some(path), _) | (None, Some(SeedConfig::Json(path))) => {
            seed::JsonSeedSource::new(path).load()
        }
        (None, Some(SeedConfig::Postgres(url))) => seed::PostgresSeedSource::connect(url)?.load(),
        (None, None) => bail!("no seed given: use --seed or set `seed` in the configuration"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    let config = match &opts.config {
        Some(path) => AuctionConfig::from_file(path)?,
        None => AuctionConfig::default(),
    };
    let seed = load_seed(&opts, &config)?;

    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let decider = decision::DeadlineDecider::new(
        decision::HeuristicDecider::seeded(opts.rng_seed),
        config.decision_timeout(),
    )?;
    let controller =
        controller::AuctionController::new(&seed, &config, Arc::new(decider), event_writer)?
            .with_narrator(Arc::new(narrative::TemplateNarrator));
    let observer = controller.observer();

    let svc_ctr = service::ServiceControl::new();

    ctrlc::set_handler({
        let svc_ctr = svc_ctr.clone();
        move || {
            eprintln!("Stopping after the current item...");
            svc_ctr.stop_all();
        }
    })?;

    let ui = match &config.http_bind {
        Some(addr) => Some(svc_ctr.spawn_loop(service::Ui::new(
            addr,
            observer.clone(),
            event_reader.clone(),
            svc_ctr.clone(),
        )?)),
        None => None,
    };

    let auction = svc_ctr.spawn_loop(controller);
    let outcome = auction.join();

    match observer.result() {
        Some(result) => {
            info!(
                sold = observer.snapshot().progress.items_sold,
                unsold = result.unsold.len(),
                "final ledger ready"
            );
            if let Some(path) = &opts.export {
                result.write_json(path)?;
                info!(path = %path.display(), "result exported");
            }
        }
        None => warn!(
            status = ?observer.snapshot().status,
            progress = ?observer.snapshot().progress,
            "auction ended before completion"
        ),
    }

    if let Some(ui) = ui {
        if !opts.linger || outcome.is_err() {
            svc_ctr.stop_all();
        }
        ui.join()?;
    }

    outcome
}
