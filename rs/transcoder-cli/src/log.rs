use tracing_subscriber::{EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(clap::Args, Clone, Debug)]
pub struct Log {
	/// The log level, used unless RUST_LOG is set.
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "TRANSCODER_LOG_LEVEL")]
	pub level: tracing::Level,
}

impl Log {
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(LevelFilter::from_level(self.level).into())
			.from_env_lossy();

		tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init();
	}
}
