use crate::models::{CountryRecord, StoredRun, UNKNOWN_REGION};
use crate::transform::{by_gdp_desc, round2};
use num_format::{Locale, ToFormattedString};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Number of countries per region that enter the regional average.
pub const DEFAULT_TOP_N: usize = 5;

const RULE_WIDTH: usize = 70;

/// Mean GDP of a region's largest economies.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAverage {
    pub region: String,
    /// How many countries entered the mean (at most the configured top-N).
    pub count: usize,
    /// Rounded to two decimals.
    pub mean: f64,
}

/// Both report views over one stored run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub year: i32,
    pub updated_time: String,
    pub threshold: f64,
    pub top_n: usize,
    pub above_threshold: Vec<CountryRecord>,
    pub region_averages: Vec<RegionAverage>,
}

impl Report {
    pub fn from_run(run: &StoredRun, threshold: f64, top_n: usize) -> Self {
        Self {
            year: run.year,
            updated_time: run.updated_time.clone(),
            threshold,
            top_n,
            above_threshold: above_threshold(&run.records, threshold),
            region_averages: region_top_averages(&run.records, top_n),
        }
    }
}

/// Records with `gdp >= threshold`, largest first.
pub fn above_threshold(records: &[CountryRecord], threshold: f64) -> Vec<CountryRecord> {
    let mut out: Vec<CountryRecord> = records
        .iter()
        .filter(|r| r.gdp_billion_usd >= threshold)
        .cloned()
        .collect();
    out.sort_by(by_gdp_desc);
    out
}

/// Per region, the mean of its `top_n` largest GDP values.
///
/// The `Unknown` region is not reported. Output is ordered by mean
/// descending, then region name.
pub fn region_top_averages(records: &[CountryRecord], top_n: usize) -> Vec<RegionAverage> {
    let mut groups: BTreeMap<&str, Vec<&CountryRecord>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.region != UNKNOWN_REGION) {
        groups.entry(r.region.as_str()).or_default().push(r);
    }

    let mut out: Vec<RegionAverage> = groups
        .into_iter()
        .filter_map(|(region, mut members)| {
            members.sort_by(|a, b| by_gdp_desc(a, b));
            members.truncate(top_n);
            if members.is_empty() {
                return None;
            }
            let count = members.len();
            let sum: f64 = members.iter().map(|r| r.gdp_billion_usd).sum();
            Some(RegionAverage {
                region: region.to_string(),
                count,
                mean: round2(sum / count as f64),
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.mean
            .partial_cmp(&a.mean)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.region.cmp(&b.region))
    });
    out
}

/// Map a user-provided locale tag to a `num_format::Locale` and its decimal separator char.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`, `ko`. Defaults to English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        "ko" | "ko_kr" => (&Locale::ko, '.'),
        _ => (&Locale::en, '.'), // default
    }
}

/// Two-decimal amount with locale grouping, e.g. `26,854.60` or `26.854,60`.
pub fn format_amount(v: f64, locale_tag: &str) -> String {
    if !v.is_finite() {
        return "NA".to_string();
    }
    let (locale, dec) = map_locale(locale_tag);
    let cents = (v.abs() * 100.0).round() as i64;
    let sign = if v < 0.0 && cents != 0 { "-" } else { "" };
    format!(
        "{}{}{}{:02}",
        sign,
        (cents / 100).to_formatted_string(locale),
        dec,
        cents % 100
    )
}

/// Render both views as plain text.
pub fn render(report: &Report, locale_tag: &str) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut s = String::new();

    let _ = writeln!(
        s,
        "\n[IMF GDP report] year {} (run {})",
        report.year, report.updated_time
    );
    let _ = writeln!(s, "{heavy}");

    let _ = writeln!(
        s,
        "\n1. Countries with GDP >= {} B USD",
        format_amount(report.threshold, locale_tag)
    );
    let _ = writeln!(s, "{light}");
    if report.above_threshold.is_empty() {
        let _ = writeln!(s, "No data");
    } else {
        let _ = writeln!(s, "Total: {} countries", report.above_threshold.len());
        let _ = writeln!(s, "{light}");
        let _ = writeln!(s, "{:>4}  {:<32} {:>16}  Region", "#", "Country", "GDP (1B USD)");
        for (i, r) in report.above_threshold.iter().enumerate() {
            let _ = writeln!(
                s,
                "{:>4}  {:<32} {:>16}  {}",
                i + 1,
                r.country,
                format_amount(r.gdp_billion_usd, locale_tag),
                r.region
            );
        }
    }

    let _ = writeln!(s, "\n2. Average GDP of the top {} countries per region", report.top_n);
    let _ = writeln!(s, "{heavy}");
    if report.region_averages.is_empty() {
        let _ = writeln!(s, "No data");
    } else {
        let _ = writeln!(
            s,
            "{:>4}  {:<24} {:>9} {:>22}",
            "#", "Region", "Countries", "Avg GDP (1B USD)"
        );
        for (i, a) in report.region_averages.iter().enumerate() {
            let _ = writeln!(
                s,
                "{:>4}  {:<24} {:>9} {:>22}",
                i + 1,
                a.region,
                a.count,
                format_amount(a.mean, locale_tag)
            );
        }
    }
    let _ = writeln!(s, "{heavy}");
    s
}
