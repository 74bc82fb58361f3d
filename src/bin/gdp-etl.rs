use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use encoding_rs::Encoding;
use gdp_etl::{Client, EtlConfig, Pipeline, RunLog, SinkKind};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gdp-etl",
    version,
    about = "Extract IMF GDP figures, enrich them with regions, append them to a store and report"
)]
struct Cli {
    /// Base URL of the IMF DataMapper API.
    #[arg(long, env = "GDP_ETL_API_BASE_URL")]
    api_base_url: Option<String>,
    /// Region reference file (CSV: ISO alpha-3 code, region).
    #[arg(long, env = "GDP_ETL_REGIONS")]
    regions: Option<PathBuf>,
    /// Encoding label of the region file (e.g. windows-949, euc-kr, utf-8).
    #[arg(long, env = "GDP_ETL_REGION_ENCODING", default_value = "windows-949")]
    region_encoding: String,
    /// Where to append the run.
    #[arg(long, value_enum, env = "GDP_ETL_SINK", default_value_t = SinkArg::Sqlite)]
    sink: SinkArg,
    /// Line-delimited JSON output (with --sink json).
    #[arg(long, env = "GDP_ETL_JSON_OUT")]
    json_out: Option<PathBuf>,
    /// SQLite database file (with --sink sqlite).
    #[arg(long, env = "GDP_ETL_DB")]
    db: Option<PathBuf>,
    /// Stage log file.
    #[arg(long, env = "GDP_ETL_LOG_FILE")]
    log_file: Option<PathBuf>,
    /// Minimum GDP in billions of USD.
    #[arg(long, env = "GDP_ETL_THRESHOLD")]
    threshold: Option<f64>,
    /// Countries per region in the regional average.
    #[arg(long, env = "GDP_ETL_TOP_N")]
    top_n: Option<usize>,
    /// Number format of the report (en, de, fr, ...).
    #[arg(long, env = "GDP_ETL_LOCALE")]
    locale: Option<String>,
    /// Skip the report after loading.
    #[arg(long, default_value_t = false)]
    no_report: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SinkArg {
    Json,
    Sqlite,
}

impl Cli {
    fn into_config(self) -> Result<EtlConfig> {
        let mut cfg = EtlConfig::default();
        if let Some(v) = self.api_base_url {
            cfg.api_base_url = v;
        }
        if let Some(v) = self.regions {
            cfg.regions_path = v;
        }
        cfg.region_encoding = Encoding::for_label(self.region_encoding.trim().as_bytes())
            .with_context(|| format!("unknown encoding label: {}", self.region_encoding))?;
        cfg.sink = match self.sink {
            SinkArg::Json => SinkKind::Json,
            SinkArg::Sqlite => SinkKind::Sqlite,
        };
        if let Some(v) = self.json_out {
            cfg.json_path = v;
        }
        if let Some(v) = self.db {
            cfg.db_path = v;
        }
        if let Some(v) = self.log_file {
            cfg.log_path = v;
        }
        if let Some(v) = self.threshold {
            if !v.is_finite() {
                bail!("invalid --threshold: {}", v);
            }
            cfg.threshold = v;
        }
        if let Some(v) = self.top_n {
            if v == 0 {
                bail!("--top-n must be at least 1");
            }
            cfg.top_n = v;
        }
        if let Some(v) = self.locale {
            cfg.locale = v;
        }
        cfg.report = !self.no_report;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cfg = Cli::parse().into_config()?;

    let client = Client::new(&cfg.api_base_url);
    let sink = cfg.open_sink();
    let summary = {
        let mut log = RunLog::open(&cfg.log_path);
        Pipeline::new(&cfg, &client, sink.as_ref())
            .run(&mut log, &mut std::io::stdout())
            .context("ETL run aborted")?
    };

    log::info!(
        "run {} done: {} extracted, {} written for {}",
        summary.metadata.updated_time,
        summary.extracted,
        summary.written,
        summary.metadata.year
    );
    Ok(())
}
