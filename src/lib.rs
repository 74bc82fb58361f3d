//! gdp_etl
//!
//! A small ETL library for IMF GDP figures. Pairs with the `gdp-etl` CLI.
//!
//! ### Features
//! - Fetch GDP (current prices, billions of USD) for the latest year from the IMF DataMapper API
//! - Enrich countries with a region taken from a CP949-encoded reference table
//! - Keep economies at or above 100B USD, rounded to cents, largest first
//! - Append each run to line-delimited JSON or to an SQLite table
//! - Report the latest run: large economies, and the mean of each region's top 5
//!
//! ### Example
//! ```no_run
//! use gdp_etl::{Client, EtlConfig, Pipeline, RunLog};
//!
//! let config = EtlConfig::default();
//! let client = Client::new(&config.api_base_url);
//! let sink = config.open_sink();
//! let mut log = RunLog::open(&config.log_path);
//! let summary = Pipeline::new(&config, &client, sink.as_ref())
//!     .run(&mut log, &mut std::io::stdout())?;
//! println!("wrote {} rows for {}", summary.written, summary.metadata.year);
//! # Ok::<(), gdp_etl::EtlError>(())
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod regions;
pub mod report;
pub mod runlog;
pub mod storage;
pub mod transform;

pub use api::{Client, GdpSource};
pub use config::{EtlConfig, SinkKind};
pub use error::{EtlError, Result};
pub use models::{CountryRecord, RegionMap, RunMetadata};
pub use pipeline::{Pipeline, RunSummary};
pub use runlog::RunLog;
pub use storage::{JsonLinesSink, RecordSink, SqliteSink};
