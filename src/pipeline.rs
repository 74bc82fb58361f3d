//! One ETL run: Load Region Data → Extract → Transform → Load → Report.
//!
//! Stages run strictly in order and the first error aborts the run. Every
//! stage is bracketed by Started/Completed (or Failed) lines in the run log.

use crate::api::GdpSource;
use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::models::{RunMetadata, StoredRun};
use crate::regions::RegionLoader;
use crate::report::{Report, render};
use crate::runlog::RunLog;
use crate::storage::RecordSink;
use crate::transform::transform;
use std::io::Write;

pub const STAGE_RUN: &str = "ETL Process";
pub const STAGE_REGIONS: &str = "Load Region Data";
pub const STAGE_EXTRACT: &str = "Extract GDP Data";
pub const STAGE_TRANSFORM: &str = "Transform Data";
pub const STAGE_REPORT: &str = "Monitor GDP Data";

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    pub extracted: usize,
    pub written: usize,
    /// `None` when reporting is disabled.
    pub report: Option<Report>,
}

pub struct Pipeline<'a> {
    config: &'a EtlConfig,
    source: &'a dyn GdpSource,
    sink: &'a dyn RecordSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a EtlConfig,
        source: &'a dyn GdpSource,
        sink: &'a dyn RecordSink,
    ) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    /// Execute one run. The rendered report, if any, goes to `out`.
    pub fn run(&self, log: &mut RunLog, out: &mut dyn Write) -> Result<RunSummary> {
        // Brackets the four inner stages; the report stage runs after it.
        log.started(STAGE_RUN);
        let summary = match self.load(log) {
            Ok(s) => {
                log.completed(STAGE_RUN);
                s
            }
            Err(e) => {
                log.failed(STAGE_RUN, &e);
                return Err(e);
            }
        };
        if !self.config.report {
            return Ok(summary);
        }

        let current = &summary.metadata;
        let report = log.stage(STAGE_REPORT, || {
            // An empty run stores no rows; never report an older run in its place.
            let run = self
                .sink
                .latest_run()?
                .filter(|run| run.updated_time == current.updated_time)
                .unwrap_or_else(|| StoredRun {
                    year: current.year,
                    updated_time: current.updated_time.clone(),
                    records: Vec::new(),
                });
            Ok::<_, EtlError>(Report::from_run(
                &run,
                self.config.threshold,
                self.config.top_n,
            ))
        })?;
        let _ = out.write_all(render(&report, &self.config.locale).as_bytes());
        Ok(RunSummary {
            report: Some(report),
            ..summary
        })
    }

    fn load(&self, log: &mut RunLog) -> Result<RunSummary> {
        let loader = RegionLoader::new(&self.config.regions_path)
            .with_encoding(self.config.region_encoding);
        let regions = log.stage(STAGE_REGIONS, || loader.load())?;

        let extraction = log.stage(STAGE_EXTRACT, || self.source.extract())?;

        let records = log.stage(STAGE_TRANSFORM, || {
            Ok::<_, EtlError>(transform(
                &extraction.observations,
                &regions,
                self.config.threshold,
            ))
        })?;

        let load_stage = format!("Load Data to {}", self.sink.describe());
        log.stage(&load_stage, || self.sink.append(&records, &extraction.metadata))?;

        Ok(RunSummary {
            metadata: extraction.metadata,
            extracted: extraction.observations.len(),
            written: records.len(),
            report: None,
        })
    }
}
