use crate::models::{CountryRecord, RawObservation, RegionMap};
use std::cmp::Ordering;

/// Minimum GDP, in billions of USD, for a country to be kept.
pub const GDP_THRESHOLD_BILLION: f64 = 100.0;

/// Attach regions, keep rows with `gdp >= threshold`, round to cents.
///
/// Output is ordered by GDP descending; equal values are ordered by country name.
pub fn transform(
    observations: &[RawObservation],
    regions: &RegionMap,
    threshold: f64,
) -> Vec<CountryRecord> {
    let mut out: Vec<CountryRecord> = observations
        .iter()
        .filter(|o| o.gdp.is_finite() && o.gdp >= threshold)
        .map(|o| CountryRecord {
            country: o.country.clone(),
            gdp_billion_usd: round2(o.gdp),
            region: regions.region_for(&o.code).to_string(),
        })
        .collect();
    out.sort_by(by_gdp_desc);
    out
}

/// Round half away from zero to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// GDP descending, then country ascending.
pub(crate) fn by_gdp_desc(a: &CountryRecord, b: &CountryRecord) -> Ordering {
    b.gdp_billion_usd
        .partial_cmp(&a.gdp_billion_usd)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.country.cmp(&b.country))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(code: &str, gdp: f64) -> RawObservation {
        RawObservation {
            code: code.into(),
            country: code.into(),
            year: 2025,
            gdp,
        }
    }

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round2(120.345_6), 120.35);
        assert_eq!(round2(26854.6), 26854.6);
        assert_eq!(round2(100.004), 100.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let out = transform(&[obs("A", 100.0), obs("B", 99.99)], &RegionMap::default(), 100.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].country, "A");
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let out = transform(
            &[obs("A", f64::NAN), obs("B", f64::INFINITY)],
            &RegionMap::default(),
            100.0,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn ties_order_by_country() {
        let out = transform(&[obs("ZZZ", 500.0), obs("AAA", 500.0)], &RegionMap::default(), 100.0);
        assert_eq!(out[0].country, "AAA");
        assert_eq!(out[1].country, "ZZZ");
    }
}
