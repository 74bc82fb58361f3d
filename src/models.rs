use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Region assigned to countries that are missing from the reference file.
pub const UNKNOWN_REGION: &str = "Unknown";

/// One transformed row: a country, its GDP in billions of USD and its region.
///
/// Field names on the wire match the persisted layout (`Country`,
/// `GDP (1B USD)`, `Region`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryRecord {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "GDP (1B USD)")]
    pub gdp_billion_usd: f64,
    #[serde(rename = "Region")]
    pub region: String,
}

/// Provenance of one run. `updated_time` identifies the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunMetadata {
    #[serde(rename = "api_url")]
    pub source_url: String,
    pub year: i32,
    pub updated_time: String,
}

impl RunMetadata {
    pub fn new(source_url: impl Into<String>, year: i32, at: DateTime<Utc>) -> Self {
        Self {
            source_url: source_url.into(),
            year,
            updated_time: format_run_time(at),
        }
    }
}

/// Fixed-width UTC timestamp, so that string order is time order in every sink.
pub fn format_run_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// One entry of the line-delimited JSON sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunBatch {
    pub metadata: RunMetadata,
    pub data: Vec<CountryRecord>,
}

/// A run as read back from a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub year: i32,
    pub updated_time: String,
    pub records: Vec<CountryRecord>,
}

impl From<RunBatch> for StoredRun {
    fn from(b: RunBatch) -> Self {
        Self {
            year: b.metadata.year,
            updated_time: b.metadata.updated_time,
            records: b.data,
        }
    }
}

/// Extracted tuple before enrichment (one country, latest year).
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    /// ISO alpha-3 code, e.g. `USA`.
    pub code: String,
    /// Display label from the countries endpoint.
    pub country: String,
    pub year: i32,
    /// GDP in billions of current USD.
    pub gdp: f64,
}

/// Output of the extract stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub observations: Vec<RawObservation>,
    pub metadata: RunMetadata,
}

/// Country code to region name. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    regions: HashMap<String, String>,
}

impl RegionMap {
    /// Region for `code`, or [`UNKNOWN_REGION`] when the code is not mapped.
    pub fn region_for(&self, code: &str) -> &str {
        self.regions
            .get(code)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_REGION)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RegionMap {
    /// The first occurrence of a code wins.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut regions = HashMap::new();
        for (k, v) in iter {
            regions.entry(k.into()).or_insert_with(|| v.into());
        }
        Self { regions }
    }
}

/// Body of `GET {base}/NGDPD`: `{"values": {"NGDPD": {ISO: {YEAR: value}}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GdpResponse {
    pub values: HashMap<String, HashMap<String, BTreeMap<String, Option<Amount>>>>,
}

/// Body of `GET {base}/countries`: `{"countries": {ISO: {"label": name}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountriesResponse {
    pub countries: BTreeMap<String, CountryLabel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryLabel {
    pub label: Option<String>,
}

/// A numeric observation. Some responses encode numbers as strings;
/// accept both and normalize to `f64`. A string that is not a number
/// (e.g. `"n/a"`) becomes `NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount(pub f64);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a number or a string holding a number")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Amount(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Amount(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Amount(v as f64))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(Amount(s.trim().parse::<f64>().unwrap_or(f64::NAN)))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_uses_persisted_field_names() {
        let r = CountryRecord {
            country: "Korea".into(),
            gdp_billion_usd: 1712.79,
            region: "Asia".into(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["Country"], "Korea");
        assert_eq!(v["GDP (1B USD)"], 1712.79);
        assert_eq!(v["Region"], "Asia");
    }

    #[test]
    fn run_time_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        let (sa, sb) = (format_run_time(a), format_run_time(b));
        assert_eq!(sa, "2025-01-02T03:04:05.000000Z");
        assert_eq!(sa.len(), sb.len());
        assert!(sa < sb);
    }

    #[test]
    fn region_map_first_code_wins() {
        let m: RegionMap = [("KOR", "Asia"), ("KOR", "Elsewhere")].into_iter().collect();
        assert_eq!(m.region_for("KOR"), "Asia");
        assert_eq!(m.region_for("XXX"), UNKNOWN_REGION);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn amount_accepts_string_or_number() {
        let a: Amount = serde_json::from_str("26854.6").unwrap();
        let b: Amount = serde_json::from_str("\"26854.6\"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn amount_text_that_is_not_a_number_is_nan() {
        let a: Amount = serde_json::from_str("\"n/a\"").unwrap();
        assert!(a.0.is_nan());
    }
}
