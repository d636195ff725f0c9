//! # Reach Check Library
//!
//! A bounded, cancellable prober that tells which domains of a
//! blocklist/allowlist file are reachable from the local network.
//!
//! Domains are extracted and normalized from list-file text, then probed
//! in chunks of at most `concurrency` concurrent requests. Each probe tries
//! HTTPS and falls back to HTTP once; any completed response counts as
//! reachable. Outcomes are cached for the run, progress is streamed to a
//! reporter as probes settle, and a run can be cancelled at any time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reach_check_lib::{DomainProber, NoopReporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prober = DomainProber::new()?;
//!     let summary = prober
//!         .check_text("youtube.com\nhttps://www.discord.com/app\n", &mut NoopReporter)
//!         .await?;
//!
//!     println!("{} accessible, {} blocked", summary.accessible, summary.blocked);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **List parsing**: comments, schemes, `www.`, paths and ports are stripped
//! - **Protocol fallback**: HTTPS first, plain HTTP once on failure
//! - **Bounded concurrency**: chunked dispatch, never more than N probes in flight
//! - **Cancellation**: cooperative, with in-flight requests aborted
//! - **Configurable**: TOML files and `RC_*` environment variables

// Re-export main public API types and functions
pub use cache::ProbeCache;
pub use config::{
    load_env_config, load_env_config_from, parse_duration, ConfigManager, EnvConfig, FileConfig,
    OutputConfig, ProbeFileConfig,
};
pub use error::ReachCheckError;
pub use extract::{extract_domains, is_list_file};
pub use probe::{HttpProbe, ReachabilityProbe, Scheme};
pub use prober::DomainProber;
pub use progress::{ChannelReporter, NoopReporter, ProgressCounters, ProgressEvent, ProgressReporter};
pub use scheduler::{BoundedScheduler, RunState};
pub use types::{CheckConfig, Domain, ProbeResult, Summary};

// Probe implementations need the token type in their signatures.
pub use tokio_util::sync::CancellationToken;

mod cache;
mod config;
mod error;
mod extract;
mod probe;
mod prober;
mod progress;
mod scheduler;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ReachCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
