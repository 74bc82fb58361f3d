//! Synchronous client for the **IMF DataMapper API (v1)**.
//!
//! Two endpoints are used:
//! - `{base}/NGDPD`: GDP at current prices, billions of USD, keyed by ISO code and year
//! - `{base}/countries`: display labels keyed by ISO code
//!
//! ### Notes
//! - The GDP series also contains regional aggregates (`EURO`, `WEOWORLD`, …). Only
//!   codes listed by the countries endpoint become observations.
//! - Requests are not retried. A single failure aborts the extraction.
//! - Network timeouts use a sane default (30s) and can be adjusted by editing the client builder.
//!
//! Typical usage:
//! ```no_run
//! # use gdp_etl::{Client, GdpSource};
//! let client = Client::default();
//! let extraction = client.extract()?;
//! println!("{} countries for {}", extraction.observations.len(), extraction.metadata.year);
//! # Ok::<(), gdp_etl::EtlError>(())
//! ```
use crate::error::{EtlError, Result};
use crate::models::{
    Amount, CountriesResponse, Extraction, GdpResponse, RawObservation, RunMetadata,
};
use chrono::Utc;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Default DataMapper base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.imf.org/external/datamapper/api/v1";
/// Indicator id for GDP, current prices, billions of USD.
pub const GDP_INDICATOR: &str = "NGDPD";

/// Source of one extraction. Implemented by [`Client`]; tests substitute fixtures.
pub trait GdpSource {
    /// Fetch raw observations for the latest year present in the source.
    fn extract(&self) -> Result<Extraction>;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("gdp_etl/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// URL of the GDP series; recorded as the run's `api_url`.
    pub fn gdp_url(&self) -> String {
        format!("{}/{}", self.base_url, GDP_INDICATOR)
    }

    pub fn countries_url(&self) -> String {
        format!("{}/countries", self.base_url)
    }

    /// GDP series keyed by ISO code, then year.
    pub fn fetch_gdp(&self) -> Result<HashMap<String, BTreeMap<i32, f64>>> {
        let url = self.gdp_url();
        let body: GdpResponse = self.get_json(&url)?;
        gdp_series(body, &url)
    }

    /// Display labels keyed by ISO code.
    pub fn fetch_countries(&self) -> Result<BTreeMap<String, String>> {
        let url = self.countries_url();
        let body: CountriesResponse = self.get_json(&url)?;
        Ok(country_labels(body))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let network = |source| EtlError::Network {
            url: url.to_string(),
            source,
        };
        log::debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        let bytes = resp.bytes().map_err(network)?;
        serde_json::from_slice(&bytes).map_err(|e| EtlError::schema(url, e.to_string()))
    }
}

impl GdpSource for Client {
    fn extract(&self) -> Result<Extraction> {
        let series = self.fetch_gdp()?;
        let labels = self.fetch_countries()?;
        latest_observations(&series, &labels, &self.gdp_url())
    }
}

/// Pull the `NGDPD` series out of a GDP response and parse year keys.
///
/// Null, non-numeric and non-finite values are dropped; a year key that is
/// not an integer is a schema violation.
pub fn gdp_series(body: GdpResponse, url: &str) -> Result<HashMap<String, BTreeMap<i32, f64>>> {
    let mut values = body.values;
    let by_code = values
        .remove(GDP_INDICATOR)
        .ok_or_else(|| EtlError::schema(url, format!("missing values.{}", GDP_INDICATOR)))?;

    let mut out = HashMap::with_capacity(by_code.len());
    for (code, years) in by_code {
        let mut series = BTreeMap::new();
        for (year, amount) in years {
            let y = year.trim().parse::<i32>().map_err(|_| {
                EtlError::schema(url, format!("bad year key {:?} for {}", year, code))
            })?;
            if let Some(Amount(v)) = amount.filter(|a| a.0.is_finite()) {
                series.insert(y, v);
            }
        }
        out.insert(code, series);
    }
    Ok(out)
}

/// Labels by code; a missing or blank label falls back to the code.
pub fn country_labels(body: CountriesResponse) -> BTreeMap<String, String> {
    body.countries
        .into_iter()
        .map(|(code, meta)| {
            let label = meta
                .label
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| code.clone());
            (code, label)
        })
        .collect()
}

/// The maximum year present anywhere in the series.
pub fn latest_year(series: &HashMap<String, BTreeMap<i32, f64>>) -> Option<i32> {
    series
        .values()
        .filter_map(|years| years.keys().next_back().copied())
        .max()
}

/// One observation per listed country that has a positive value for the
/// latest year, stamped with fresh run metadata.
pub fn latest_observations(
    series: &HashMap<String, BTreeMap<i32, f64>>,
    labels: &BTreeMap<String, String>,
    source_url: &str,
) -> Result<Extraction> {
    let year = latest_year(series)
        .ok_or_else(|| EtlError::schema(source_url, "no observations in GDP series"))?;

    let observations: Vec<RawObservation> = labels
        .iter()
        .filter_map(|(code, label)| {
            let gdp = *series.get(code)?.get(&year)?;
            (gdp.is_finite() && gdp > 0.0).then(|| RawObservation {
                code: code.clone(),
                country: label.clone(),
                year,
                gdp,
            })
        })
        .collect();

    log::debug!("extracted {} observations for {}", observations.len(), year);
    Ok(Extraction {
        observations,
        metadata: RunMetadata::new(source_url, year, Utc::now()),
    })
}
