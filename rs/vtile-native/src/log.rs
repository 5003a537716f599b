use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging configuration.
#[derive(Clone, Debug, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct Log {
	/// The log level or a list of filter directives, like `info,vtile=debug`.
	#[arg(id = "log-level", long = "log-level", env = "VTILE_LOG", default_value = "info")]
	pub level: String,

	/// Include the thread name in each line; useful to tell render threads apart.
	#[arg(id = "log-threads", long = "log-threads", env = "VTILE_LOG_THREADS")]
	pub threads: bool,
}

impl Default for Log {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			threads: false,
		}
	}
}

impl Log {
	pub fn new(level: impl Into<String>) -> Self {
		Self {
			level: level.into(),
			..Default::default()
		}
	}

	/// Parse the filter, falling back to `info` if the directives are invalid.
	pub fn filter(&self) -> EnvFilter {
		EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"))
	}

	/// Install the global subscriber. Does nothing if one is already installed.
	pub fn init(&self) {
		let layer = fmt::layer()
			.with_target(true)
			.with_thread_names(self.threads)
			.with_writer(std::io::stderr);

		let res = tracing_subscriber::registry().with(self.filter()).with(layer).try_init();
		if res.is_err() {
			tracing::debug!("global subscriber already installed");
		}

		if EnvFilter::try_new(&self.level).is_err() {
			tracing::warn!(level = %self.level, "invalid log filter, using info");
		}
	}
}
