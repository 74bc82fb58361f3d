use chrono::NaiveDateTime;
use gdp_etl::RunLog;
use gdp_etl::runlog::LOG_TIME_FORMAT;
use std::fs;
use std::io::{self, Write};
use tempfile::tempdir;

fn split_line(line: &str) -> (&str, &str) {
    line.split_once(", ").expect("timestamp separator")
}

#[test]
fn stage_lines_are_appended_with_timestamps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("etl_project_log.txt");
    fs::write(&path, "earlier run\n").unwrap();

    {
        let mut log = RunLog::open(&path).with_echo(false);
        log.started("Extract GDP Data");
        log.completed("Extract GDP Data");
    }

    let txt = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = txt.lines().collect();
    assert_eq!(lines[0], "earlier run");
    assert_eq!(lines.len(), 3);

    let (ts, msg) = split_line(lines[1]);
    assert!(NaiveDateTime::parse_from_str(ts, LOG_TIME_FORMAT).is_ok(), "{ts}");
    assert_eq!(msg, "[Extract GDP Data] Started");
    assert_eq!(split_line(lines[2]).1, "[Extract GDP Data] Completed");
}

#[test]
fn stage_combinator_records_failure_and_passes_error_through() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let mut log = RunLog::open(&path).with_echo(false);

    let ok: Result<u32, String> = log.stage("Transform Data", || Ok(7));
    assert_eq!(ok, Ok(7));
    let err: Result<u32, String> =
        log.stage("Load Data to SQLite", || Err("disk full".to_string()));
    assert_eq!(err, Err("disk full".to_string()));
    drop(log);

    let msgs: Vec<String> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| split_line(l).1.to_string())
        .collect();
    assert_eq!(
        msgs,
        vec![
            "[Transform Data] Started",
            "[Transform Data] Completed",
            "[Load Data to SQLite] Started",
            "[Load Data to SQLite] Failed: disk full",
        ]
    );
}

#[test]
fn logging_never_panics_without_a_file() {
    let dir = tempdir().unwrap();
    let mut log = RunLog::open(dir.path().join("missing").join("log.txt")).with_echo(false);
    log.started("ETL Process");
    log.completed("ETL Process");

    let mut console = RunLog::console_only().with_echo(false);
    console.message("still fine");
    assert!(console.path().is_none());
}

struct BrokenStdout;

impl Write for BrokenStdout {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }
    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

#[test]
fn broken_echo_does_not_stop_file_logging() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let mut log = RunLog::open(&path).with_echo_to(BrokenStdout);

    let out: Result<(), String> = log.stage("Extract GDP Data", || Ok(()));
    assert!(out.is_ok());
    log.message("after the pipe closed");
    drop(log);

    let txt = fs::read_to_string(&path).unwrap();
    let msgs: Vec<&str> = txt.lines().map(|l| split_line(l).1).collect();
    assert_eq!(
        msgs,
        vec![
            "[Extract GDP Data] Started",
            "[Extract GDP Data] Completed",
            "after the pipe closed",
        ]
    );
}
