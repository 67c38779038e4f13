//! Live STAC search tests.
//!
//! These hit a public STAC endpoint and are ignored by default; run with
//! `cargo test -p wastelens-catalog -- --ignored` when network access is
//! available.

use chrono::NaiveDate;
use wastelens_catalog::stac::{optical_search, radar_search, StacClientOptions};
use wastelens_catalog::sync_api::StacClientBlocking;
use wastelens_core::{AreaOfInterest, DateWindow};

const EARTH_SEARCH: &str = "https://earth-search.aws.element84.com/v1";

fn test_aoi() -> AreaOfInterest {
    AreaOfInterest::from_rect(30.4, 50.4, 30.5, 50.5, 0.0).unwrap()
}

fn test_window() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
    )
    .unwrap()
}

#[test]
#[ignore = "requires network access"]
fn optical_search_returns_items_with_cloud_cover() {
    let client = StacClientBlocking::new(EARTH_SEARCH, StacClientOptions::default()).unwrap();
    let params = optical_search(&test_aoi(), &test_window()).limit(10);

    let items = client.search_all(&params).unwrap();
    assert!(!items.is_empty(), "expected optical items for a mid-latitude summer");
    for item in &items {
        assert!(item.cloud_cover().is_some(), "item {} lacks eo:cloud_cover", item.id);
        let date = item.acquisition_date().expect("item missing datetime");
        assert!(test_window().contains(date));
    }
}

#[test]
#[ignore = "requires network access"]
fn radar_search_filters_to_dual_polarization() {
    let client = StacClientBlocking::new(EARTH_SEARCH, StacClientOptions::default()).unwrap();
    let params = radar_search(&test_aoi(), &test_window()).limit(10);

    let items = client.search_all(&params).unwrap();
    let dual: Vec<_> = items.iter().filter(|i| i.has_dual_polarization()).collect();
    // land scenes over Europe are routinely VV+VH
    assert!(!dual.is_empty());
}
