use gdp_etl::models::{CountryRecord, StoredRun, UNKNOWN_REGION};
use gdp_etl::report::{Report, above_threshold, region_top_averages, render};

fn rec(country: &str, gdp: f64, region: &str) -> CountryRecord {
    CountryRecord {
        country: country.into(),
        gdp_billion_usd: gdp,
        region: region.into(),
    }
}

fn europe_heavy() -> Vec<CountryRecord> {
    vec![
        rec("Germany", 4744.8, "Europe"),
        rec("United Kingdom", 3839.18, "Europe"),
        rec("France", 3211.29, "Europe"),
        rec("Italy", 2422.86, "Europe"),
        rec("Spain", 1799.51, "Europe"),
        rec("Netherlands", 1272.01, "Europe"),
        rec("Poland", 979.96, "Europe"),
        rec("United States", 30507.22, "Americas"),
        rec("Canada", 2225.34, "Americas"),
        rec("Taiwan", 804.89, UNKNOWN_REGION),
        rec("Tonga", 0.6, "Oceania"),
    ]
}

#[test]
fn top_five_per_region_uses_largest_values_only() {
    let avgs = region_top_averages(&europe_heavy(), 5);

    let europe = avgs.iter().find(|a| a.region == "Europe").unwrap();
    assert_eq!(europe.count, 5);
    let expected = (4744.8 + 3839.18 + 3211.29 + 2422.86 + 1799.51) / 5.0;
    assert!((europe.mean - expected).abs() < 0.006, "{}", europe.mean);

    let americas = avgs.iter().find(|a| a.region == "Americas").unwrap();
    assert_eq!(americas.count, 2);
    assert_eq!(americas.mean, 16366.28);

    assert!(avgs.iter().all(|a| a.count <= 5));
}

#[test]
fn unknown_region_is_not_averaged() {
    let avgs = region_top_averages(&europe_heavy(), 5);
    assert!(avgs.iter().all(|a| a.region != UNKNOWN_REGION));
}

#[test]
fn region_averages_are_ordered_by_mean() {
    let avgs = region_top_averages(&europe_heavy(), 5);
    let names: Vec<&str> = avgs.iter().map(|a| a.region.as_str()).collect();
    assert_eq!(names, vec!["Americas", "Europe", "Oceania"]);
}

#[test]
fn input_order_does_not_change_top_n() {
    let mut shuffled = europe_heavy();
    shuffled.reverse();
    assert_eq!(region_top_averages(&shuffled, 3), region_top_averages(&europe_heavy(), 3));
}

#[test]
fn threshold_view_filters_and_sorts() {
    let mut records = europe_heavy();
    records.reverse();
    let view = above_threshold(&records, 100.0);
    assert_eq!(view.len(), 10);
    assert_eq!(view[0].country, "United States");
    assert!(view.iter().all(|r| r.gdp_billion_usd >= 100.0));
    assert!(view.windows(2).all(|w| w[0].gdp_billion_usd >= w[1].gdp_billion_usd));
}

#[test]
fn rendered_report_lists_both_views() {
    let run = StoredRun {
        year: 2025,
        updated_time: "2025-09-01T10:00:00.000000Z".into(),
        records: europe_heavy(),
    };
    let report = Report::from_run(&run, 100.0, 5);
    let txt = render(&report, "en");

    assert!(txt.contains("year 2025"));
    assert!(txt.contains("Total: 10 countries"));
    assert!(txt.contains("30,507.22"));
    assert!(txt.contains("16,366.28"));
    assert!(!txt.contains("Tonga"));

    let de = render(&report, "de");
    assert!(de.contains("30.507,22"));
}
