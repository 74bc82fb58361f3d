//! Append-only sinks for transformed runs.
//!
//! Two backends share the [`RecordSink`] trait:
//! - [`JsonLinesSink`]: one `{metadata, data}` JSON object per line
//! - [`SqliteSink`]: one row per record in the `cleaned_data` table
//!
//! Neither backend rewrites or deletes what earlier runs stored.

use crate::error::{EtlError, Result};
use crate::models::{CountryRecord, RunBatch, RunMetadata, StoredRun};
use rusqlite::{Connection, params};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

macro_rules! table {
    () => {
        "cleaned_data"
    };
}

/// Name of the table written by [`SqliteSink`].
pub const TABLE: &str = table!();

/// Destination for transformed records.
pub trait RecordSink {
    /// Short backend name used in stage labels, e.g. `SQLite`.
    fn describe(&self) -> &'static str;

    /// Append one run. Previously stored runs are left untouched.
    fn append(&self, records: &[CountryRecord], metadata: &RunMetadata) -> Result<()>;

    /// Every stored run, oldest first.
    fn runs(&self) -> Result<Vec<StoredRun>>;

    /// The run with the greatest `updated_time`, if anything is stored.
    fn latest_run(&self) -> Result<Option<StoredRun>> {
        Ok(self
            .runs()?
            .into_iter()
            .max_by(|a, b| a.updated_time.cmp(&b.updated_time)))
    }
}

/// Line-delimited JSON file.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }
}

impl RecordSink for JsonLinesSink {
    fn describe(&self) -> &'static str {
        "JSON"
    }

    fn append(&self, records: &[CountryRecord], metadata: &RunMetadata) -> Result<()> {
        let batch = RunBatch {
            metadata: metadata.clone(),
            data: records.to_vec(),
        };
        let mut line =
            serde_json::to_string(&batch).map_err(|e| EtlError::write(self.target(), e))?;
        line.push('\n');

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| EtlError::write(self.target(), e))?;
        f.write_all(line.as_bytes())
            .and_then(|_| f.flush())
            .map_err(|e| EtlError::write(self.target(), e))?;
        log::debug!("appended {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn runs(&self) -> Result<Vec<StoredRun>> {
        let f = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EtlError::read(self.target(), e)),
        };

        let mut out = Vec::new();
        for (n, line) in BufReader::new(f).lines().enumerate() {
            let line = line.map_err(|e| EtlError::read(self.target(), e))?;
            if line.trim().is_empty() {
                continue;
            }
            let batch: RunBatch = serde_json::from_str(&line)
                .map_err(|e| EtlError::read(format!("{} line {}", self.target(), n + 1), e))?;
            out.push(batch.into());
        }
        Ok(out)
    }
}

/// Table `cleaned_data` in an embedded SQLite database.
///
/// Rows are inserted one by one in autocommit mode; a failure midway leaves
/// the rows written so far in place.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    path: PathBuf,
}

const CREATE_TABLE: &str = concat!(
    "CREATE TABLE IF NOT EXISTS ",
    table!(),
    r#" (
        "Country"      TEXT    NOT NULL,
        "GDP (1B USD)" REAL    NOT NULL,
        "Region"       TEXT    NOT NULL,
        "year"         INTEGER NOT NULL,
        "update_time"  TEXT    NOT NULL
    )"#
);

const INSERT_ROW: &str = concat!(
    "INSERT INTO ",
    table!(),
    r#" ("Country", "GDP (1B USD)", "Region", "year", "update_time")
    VALUES (?1, ?2, ?3, ?4, ?5)"#
);

const SELECT_ALL: &str = concat!(
    r#"SELECT "Country", "GDP (1B USD)", "Region", "year", "update_time" FROM "#,
    table!(),
    r#" ORDER BY "update_time" ASC, "GDP (1B USD)" DESC, "Country" ASC"#
);

const SELECT_LATEST: &str = concat!(
    r#"SELECT "Country", "GDP (1B USD)", "Region", "year", "update_time" FROM "#,
    table!(),
    r#" WHERE "update_time" = (SELECT MAX("update_time") FROM "#,
    table!(),
    r#") ORDER BY "GDP (1B USD)" DESC, "Country" ASC"#
);

type Row = (CountryRecord, i32, String);

impl SqliteSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(CREATE_TABLE)?;
        Ok(conn)
    }

    fn query(&self, sql: &str) -> rusqlite::Result<Vec<Row>> {
        // A missing database reads as empty and is left uncreated.
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |r| -> rusqlite::Result<Row> {
            Ok((
                CountryRecord {
                    country: r.get(0)?,
                    gdp_billion_usd: r.get(1)?,
                    region: r.get(2)?,
                },
                r.get(3)?,
                r.get(4)?,
            ))
        })?;
        rows.collect()
    }
}

/// Group rows that arrive sorted by `update_time` into runs.
fn group_runs(rows: Vec<Row>) -> Vec<StoredRun> {
    let mut out: Vec<StoredRun> = Vec::new();
    for (record, year, updated_time) in rows {
        match out.last_mut() {
            Some(run) if run.updated_time == updated_time => run.records.push(record),
            _ => out.push(StoredRun {
                year,
                updated_time,
                records: vec![record],
            }),
        }
    }
    out
}

impl RecordSink for SqliteSink {
    fn describe(&self) -> &'static str {
        "SQLite"
    }

    fn append(&self, records: &[CountryRecord], metadata: &RunMetadata) -> Result<()> {
        let conn = self.connect().map_err(|e| EtlError::write(self.target(), e))?;
        let mut stmt = conn
            .prepare(INSERT_ROW)
            .map_err(|e| EtlError::write(self.target(), e))?;
        for r in records {
            stmt.execute(params![
                r.country,
                r.gdp_billion_usd,
                r.region,
                metadata.year,
                metadata.updated_time
            ])
            .map_err(|e| EtlError::write(self.target(), e))?;
        }
        log::debug!(
            "inserted {} rows into {} at {}",
            records.len(),
            TABLE,
            self.path.display()
        );
        Ok(())
    }

    fn runs(&self) -> Result<Vec<StoredRun>> {
        let rows = self
            .query(SELECT_ALL)
            .map_err(|e| EtlError::read(self.target(), e))?;
        Ok(group_runs(rows))
    }

    fn latest_run(&self) -> Result<Option<StoredRun>> {
        let rows = self
            .query(SELECT_LATEST)
            .map_err(|e| EtlError::read(self.target(), e))?;
        Ok(group_runs(rows).pop())
    }
}
