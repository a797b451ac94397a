mod config;
mod log;
mod simulate;

use config::*;
use log::*;
use simulate::*;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use transcoder::{JobScheduler, JobState};

#[derive(Parser, Clone)]
#[command(name = "transcoder", version, about)]
pub struct Cli {
	#[command(flatten)]
	log: Log,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
	/// Run a full transcode against a synthetic decoder and a headless renderer.
	Simulate {
		/// Load the simulation from a TOML file; flags override its values.
		#[arg(long, env = "TRANSCODER_CONFIG")]
		config: Option<PathBuf>,

		#[command(flatten)]
		simulate: SimulateConfig,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	cli.log.init();

	match cli.command {
		Command::Simulate { config, simulate } => {
			let config = match config {
				Some(path) => SimulateConfig::load(&path)?.merge(simulate),
				None => simulate,
			};

			run(config.resolve()?).await
		}
	}
}

async fn run(simulation: Simulation) -> anyhow::Result<()> {
	tracing::info!(?simulation, "starting simulation");

	let counters = Arc::new(Counters::default());
	let mut scheduler = JobScheduler::new();
	let handle = scheduler.submit(simulation.job(counters.clone(), Report::default()))?;

	let mut waiter = {
		let handle = handle.clone();
		tokio::task::spawn_blocking(move || handle.wait())
	};

	let state = tokio::select! {
		res = &mut waiter => res.context("waiter panicked")?,
		res = tokio::signal::ctrl_c() => {
			res.context("failed to listen for ctrl-c")?;
			tracing::warn!("interrupted, cancelling");
			scheduler.cancel(true);
			waiter.await.context("waiter panicked")?
		}
	};

	tracing::info!(
		created = counters.render.created(),
		drawn = counters.render.drawn(),
		encoded = counters.encoded.load(std::sync::atomic::Ordering::Relaxed),
		released = counters.render.destroyed(),
		"render stats"
	);

	match state {
		JobState::Completed(status) => {
			tracing::info!(?status, "done");
			Ok(())
		}
		JobState::Failed(err) => Err(anyhow::Error::new(err).context("transcode failed")),
		JobState::Cancelled => anyhow::bail!("transcode cancelled"),
		state => anyhow::bail!("job ended in unexpected state: {state:?}"),
	}
}
