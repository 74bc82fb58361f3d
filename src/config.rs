use crate::api::DEFAULT_BASE_URL;
use crate::report::DEFAULT_TOP_N;
use crate::storage::{JsonLinesSink, RecordSink, SqliteSink};
use crate::transform::GDP_THRESHOLD_BILLION;
use encoding_rs::Encoding;
use std::path::PathBuf;

/// Where transformed runs are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    Json,
    #[default]
    Sqlite,
}

/// Settings for one run. `Default` reproduces the stock file names in the
/// working directory.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub api_base_url: String,
    pub regions_path: PathBuf,
    pub region_encoding: &'static Encoding,
    pub sink: SinkKind,
    pub json_path: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub threshold: f64,
    pub top_n: usize,
    pub locale: String,
    /// Print the report after loading.
    pub report: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            regions_path: PathBuf::from("iso_code_region.csv"),
            region_encoding: encoding_rs::EUC_KR,
            sink: SinkKind::default(),
            json_path: PathBuf::from("Countries_by_GDP.json"),
            db_path: PathBuf::from("World_Economies"),
            log_path: PathBuf::from("etl_project_log.txt"),
            threshold: GDP_THRESHOLD_BILLION,
            top_n: DEFAULT_TOP_N,
            locale: "en".to_string(),
            report: true,
        }
    }
}

impl EtlConfig {
    /// Build the configured sink.
    pub fn open_sink(&self) -> Box<dyn RecordSink> {
        match self.sink {
            SinkKind::Json => Box::new(JsonLinesSink::new(&self.json_path)),
            SinkKind::Sqlite => Box::new(SqliteSink::new(&self.db_path)),
        }
    }
}
