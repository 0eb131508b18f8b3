//! # pedsim: Pedigree Genotype Simulation
//!
//! Simulates genotypes for every member of a pedigree that is missing from a
//! population VCF, parents before children.
//!
//! ## Usage
//! ```bash
//! pedsim -i population.vcf.gz -p family.ped -t ref.fa -o out --seed 42
//!
//! # With de novo mutations and per-sample genomes
//! pedsim -i population.vcf.gz -p family.ped -t ref.fa -o out --num-mutations 5 --output-genomes
//! ```

use std::io;
use std::time::Instant;

use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pedsim::config::Config;
use pedsim::data::PedigreeGraph;
use pedsim::error::Result;
use pedsim::io::reference::ReferenceGenome;
use pedsim::model::simulator::VcfSimulator;
use pedsim::utils::telemetry::{HeartbeatConfig, HeartbeatHandle, ProgressBoard};
use pedsim::PedigreeSimulation;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(profile: bool) {
    let span_events = if profile { FmtSpan::CLOSE } else { FmtSpan::NONE };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_span_events(span_events))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn run() -> Result<()> {
    let start = Instant::now();

    let config = Config::parse_and_validate()?;
    init_tracing(config.profile);

    info!("pedsim v{}", env!("CARGO_PKG_VERSION"));
    info!(input = ?config.input, pedigree = ?config.pedigree, output = ?config.output, "starting");

    let pedigree = PedigreeGraph::load(&config.pedigree)?;
    let reference = ReferenceGenome::load(&config.reference)?;
    let settings = config.settings();
    let mut simulator = VcfSimulator::new(reference, settings.ploidy, settings.extra_crossovers);

    let board = ProgressBoard::new();
    let heartbeat = if config.heartbeat_secs > 0 {
        Some(HeartbeatHandle::spawn(
            board.clone(),
            HeartbeatConfig {
                interval_secs: config.heartbeat_secs,
                ..HeartbeatConfig::default()
            },
        )?)
    } else {
        None
    };

    let simulation = PedigreeSimulation::new(&config.input, &config.output, settings).with_progress(board);
    let result = simulation.run(&pedigree, &mut simulator, &mut io::stdout().lock());
    if let Some(heartbeat) = heartbeat {
        heartbeat.shutdown();
    }
    let outcome = result?;

    info!(
        output = ?outcome.output,
        seed = outcome.seed,
        samples = outcome.created.len(),
        jobs = outcome.jobs,
        "Completed in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
