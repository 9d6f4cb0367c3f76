//! Strategy planner: ordered search tiers from tightest to loosest.

use autocote_core::VehicleQuery;
use autocote_sites::{LocationScope, SearchFilter, SearchStrategy};
use std::collections::BTreeSet;

const ALL_FILTERS: [SearchFilter; 4] = [
    SearchFilter::Fuel,
    SearchFilter::Gearbox,
    SearchFilter::Power,
    SearchFilter::Mileage,
];
const NO_MILEAGE: [SearchFilter; 3] = [
    SearchFilter::Fuel,
    SearchFilter::Gearbox,
    SearchFilter::Power,
];
const FUEL_GEARBOX: [SearchFilter; 2] = [SearchFilter::Fuel, SearchFilter::Gearbox];

/// Filters from `wanted` for which the query actually has a value.
fn available(query: &VehicleQuery, wanted: &[SearchFilter]) -> BTreeSet<SearchFilter> {
    wanted
        .iter()
        .copied()
        .filter(|f| match f {
            SearchFilter::Fuel => query.fuel.is_some(),
            SearchFilter::Gearbox => query.gearbox.is_some(),
            SearchFilter::Power => query.horse_power_hp.is_some(),
            SearchFilter::Mileage => query.mileage_km.is_some(),
        })
        .collect()
}

fn tier(
    query: &VehicleQuery,
    location_scope: LocationScope,
    year_spread: i32,
    filters: &[SearchFilter],
    precision_tier: u8,
    region_code: Option<&str>,
) -> SearchStrategy {
    SearchStrategy {
        location_scope,
        year_spread,
        filters: available(query, filters),
        precision_tier,
        region_code: region_code.map(str::to_string),
    }
}

/// Full cascade for the vehicle being collected.
///
/// `region_code` is the marketplace's code for the query's region, when the
/// marketplace maps it. The result is never empty.
#[must_use]
pub fn plan(query: &VehicleQuery, region_code: Option<&str>) -> Vec<SearchStrategy> {
    let mut strategies = Vec::with_capacity(7);

    if query.has_geo() {
        strategies.push(tier(query, LocationScope::Geo, 1, &ALL_FILTERS, 5, None));
    }
    if let Some(code) = region_code {
        strategies.push(tier(query, LocationScope::Region, 1, &NO_MILEAGE, 4, Some(code)));
        strategies.push(tier(query, LocationScope::Region, 2, &FUEL_GEARBOX, 4, Some(code)));
    }
    strategies.push(tier(query, LocationScope::National, 1, &NO_MILEAGE, 3, None));
    strategies.push(tier(query, LocationScope::National, 2, &NO_MILEAGE, 3, None));
    strategies.push(tier(query, LocationScope::National, 2, &FUEL_GEARBOX, 2, None));
    strategies.push(tier(query, LocationScope::National, 3, &FUEL_GEARBOX, 1, None));

    strategies
}

/// Single short pass used for coordinator-assigned bonus jobs.
///
/// Without a region code the tier falls back to a national search at precision 3.
#[must_use]
pub fn plan_bonus(query: &VehicleQuery, region_code: Option<&str>) -> Vec<SearchStrategy> {
    let strategy = match region_code {
        Some(code) => tier(query, LocationScope::Region, 1, &FUEL_GEARBOX, 4, Some(code)),
        None => tier(query, LocationScope::National, 1, &FUEL_GEARBOX, 3, None),
    };
    vec![strategy]
}
