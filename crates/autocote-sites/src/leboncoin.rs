//! leboncoin.fr: JSON finder API.

use crate::error::{Result, SiteError};
use crate::request::{HttpMethod, SearchRequest};
use crate::site::Site;
use crate::strategy::{mileage_window, power_window, LocationScope, SearchFilter, SearchStrategy};
use autocote_core::{fold_accents, Fuel, Gearbox, PriceSample, SiteTokens, VehicleQuery};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

pub(crate) const SEARCH_URL: &str = "https://api.leboncoin.fr/finder/search";

/// Category id of "Voitures".
const CARS_CATEGORY: &str = "2";

/// Radius of geo tiers, in metres.
const GEO_RADIUS_M: u32 = 50_000;

const BRAND_ALIASES: &[(&str, &str)] = &[
    ("MERCEDES-BENZ", "MERCEDES"),
    ("MERCEDES BENZ", "MERCEDES"),
    ("VW", "VOLKSWAGEN"),
    ("CITROËN", "CITROEN"),
    ("DS AUTOMOBILES", "DS"),
    ("LAND-ROVER", "LAND ROVER"),
    ("ALFA-ROMEO", "ALFA ROMEO"),
    ("ŠKODA", "SKODA"),
];

/// Legacy region ids; the post-2016 merged regions map to their largest predecessor.
const REGIONS: &[(&str, &str)] = &[
    ("alsace", "1"),
    ("aquitaine", "2"),
    ("nouvelle-aquitaine", "2"),
    ("auvergne", "3"),
    ("basse-normandie", "4"),
    ("bourgogne", "5"),
    ("bourgogne-franche-comte", "5"),
    ("bretagne", "6"),
    ("centre", "7"),
    ("centre-val de loire", "7"),
    ("champagne-ardenne", "8"),
    ("corse", "9"),
    ("franche-comte", "10"),
    ("haute-normandie", "11"),
    ("normandie", "11"),
    ("ile-de-france", "12"),
    ("languedoc-roussillon", "13"),
    ("limousin", "14"),
    ("lorraine", "15"),
    ("grand est", "15"),
    ("midi-pyrenees", "16"),
    ("occitanie", "16"),
    ("nord-pas-de-calais", "17"),
    ("hauts-de-france", "17"),
    ("pays de la loire", "18"),
    ("picardie", "19"),
    ("poitou-charentes", "20"),
    ("provence-alpes-cote d'azur", "21"),
    ("paca", "21"),
    ("rhone-alpes", "22"),
    ("auvergne-rhone-alpes", "22"),
];

pub(crate) fn matches_host(host: &str) -> bool {
    host == "leboncoin.fr" || host.ends_with(".leboncoin.fr")
}

pub(crate) fn is_ad_path(path: &str) -> bool {
    static AD_PATH: OnceLock<Regex> = OnceLock::new();
    AD_PATH
        .get_or_init(|| Regex::new(r"^/(ad/)?voitures/\d+(\.htm)?/?$").expect("valid regex"))
        .is_match(path)
}

pub(crate) fn fuel_code(fuel: Fuel) -> Option<&'static str> {
    Some(match fuel {
        Fuel::Petrol => "1",
        Fuel::Diesel => "2",
        Fuel::Lpg => "3",
        Fuel::Electric => "4",
        Fuel::Other => "5",
        Fuel::Hybrid => "6",
        Fuel::PlugInHybrid => "8",
    })
}

pub(crate) fn gearbox_code(gearbox: Gearbox) -> Option<&'static str> {
    Some(match gearbox {
        Gearbox::Manual => "1",
        Gearbox::Automatic => "2",
    })
}

pub(crate) fn region_code(region: &str) -> Option<&'static str> {
    let key = fold_accents(&region.trim().to_lowercase()).replace(['’', '_'], "'");
    REGIONS
        .iter()
        .find(|(name, _)| *name == key || name.replace(' ', "-") == key.replace(' ', "-"))
        .map(|(_, code)| *code)
}

pub(crate) fn fallback_tokens(make: &str, model: &str) -> SiteTokens {
    let upper = make.trim().to_uppercase();
    let brand = BRAND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map_or(upper.clone(), |(_, canonical)| (*canonical).to_string());
    let model_token = format!("{brand}_{}", model.trim());
    SiteTokens::new(brand, model_token)
}

pub(crate) fn build_request(
    query: &VehicleQuery,
    strategy: &SearchStrategy,
    tokens: &SiteTokens,
    page_limit: u32,
) -> SearchRequest {
    let mut enums = Map::new();
    enums.insert("ad_type".into(), json!(["offer"]));
    enums.insert("u_car_brand".into(), json!([tokens.brand]));
    enums.insert("u_car_model".into(), json!([tokens.model]));
    if strategy.applies(SearchFilter::Fuel) {
        if let Some(code) = query.fuel.and_then(fuel_code) {
            enums.insert("fuel".into(), json!([code]));
        }
    }
    if strategy.applies(SearchFilter::Gearbox) {
        if let Some(code) = query.gearbox.and_then(gearbox_code) {
            enums.insert("gearbox".into(), json!([code]));
        }
    }

    let (year_min, year_max) = strategy.year_window(query.year);
    let mut ranges = Map::new();
    ranges.insert("regdate".into(), json!({"min": year_min, "max": year_max}));
    if strategy.applies(SearchFilter::Mileage) {
        if let Some(km) = query.mileage_km {
            let (min, max) = mileage_window(km);
            ranges.insert("mileage".into(), json!({"min": min, "max": max}));
        }
    }
    if strategy.applies(SearchFilter::Power) {
        if let Some(hp) = query.horse_power_hp {
            let (min, max) = power_window(hp);
            ranges.insert("horse_power_din".into(), json!({"min": min, "max": max}));
        }
    }

    let mut filters = Map::new();
    filters.insert("category".into(), json!({"id": CARS_CATEGORY}));
    filters.insert("enums".into(), Value::Object(enums));
    filters.insert("ranges".into(), Value::Object(ranges));
    if let Some(location) = location_filter(query, strategy) {
        filters.insert("location".into(), location);
    }

    SearchRequest {
        site: Site::LeBonCoin,
        method: HttpMethod::Post,
        url: SEARCH_URL.to_string(),
        body: Some(json!({
            "limit": page_limit,
            "limit_alu": 0,
            "sort_by": "time",
            "sort_order": "desc",
            "filters": Value::Object(filters),
        })),
    }
}

fn location_filter(query: &VehicleQuery, strategy: &SearchStrategy) -> Option<Value> {
    match strategy.location_scope {
        LocationScope::Geo => {
            let location = query.location.as_ref().filter(|l| l.has_geo())?;
            let city = location.city.as_deref().unwrap_or_default();
            let zipcode = location.zipcode.as_deref().unwrap_or_default();
            Some(json!({
                "locations": [{
                    "locationType": "city",
                    "label": format!("{city} ({zipcode})"),
                    "city": city,
                    "zipcode": zipcode,
                    "area": {
                        "lat": location.lat,
                        "lng": location.lng,
                        "radius": GEO_RADIUS_M,
                    },
                }]
            }))
        }
        LocationScope::Region => strategy
            .region_code
            .as_ref()
            .map(|code| json!({"regions": [code]})),
        LocationScope::National => None,
    }
}

#[derive(Debug, Deserialize)]
struct FinderResponse {
    #[serde(default)]
    ads: Vec<FinderAd>,
}

#[derive(Debug, Deserialize)]
struct FinderAd {
    #[serde(default)]
    price: Vec<u32>,
    #[serde(default)]
    attributes: Vec<FinderAttribute>,
}

#[derive(Debug, Deserialize)]
struct FinderAttribute {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    value_label: Option<String>,
}

impl FinderAd {
    fn attribute(&self, key: &str) -> Option<&FinderAttribute> {
        self.attributes.iter().find(|a| a.key == key)
    }

    fn into_sample(self) -> Option<PriceSample> {
        let price = self.price.first().copied().filter(|p| *p > 0)?;
        let year = self
            .attribute("regdate")
            .and_then(|a| a.value.as_deref())
            .and_then(|v| v.trim().parse().ok());
        let mileage_km = self
            .attribute("mileage")
            .and_then(|a| a.value.as_deref())
            .and_then(|v| v.trim().parse().ok());
        Some(PriceSample {
            price,
            year,
            mileage_km,
            fuel: self.label("fuel").and_then(Fuel::parse_label),
            gearbox: self.label("gearbox").and_then(Gearbox::parse_label),
        })
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.attribute(key)
            .and_then(|a| a.value_label.as_deref().or(a.value.as_deref()))
    }
}

pub(crate) fn parse_response(body: &str) -> Result<Vec<PriceSample>> {
    let response: FinderResponse =
        serde_json::from_str(body).map_err(|e| SiteError::Parse {
            site: Site::LeBonCoin,
            reason: format!("invalid finder JSON: {e}"),
        })?;

    Ok(response
        .ads
        .into_iter()
        .filter_map(FinderAd::into_sample)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocote_core::Location;
    use std::collections::BTreeSet;

    fn query() -> VehicleQuery {
        VehicleQuery::new("Peugeot", "3008", 2021)
            .with_fuel(Fuel::Diesel)
            .with_gearbox(Gearbox::Automatic)
            .with_horse_power(130)
            .with_mileage(60_000)
            .with_location(Location {
                city: Some("Lyon".to_string()),
                zipcode: Some("69003".to_string()),
                lat: Some(45.76),
                lng: Some(4.85),
                region: Some("Auvergne-Rhône-Alpes".to_string()),
            })
    }

    fn strategy(scope: LocationScope, filters: &[SearchFilter]) -> SearchStrategy {
        SearchStrategy {
            location_scope: scope,
            year_spread: 1,
            filters: filters.iter().copied().collect::<BTreeSet<_>>(),
            precision_tier: 5,
            region_code: None,
        }
    }

    #[test]
    fn test_fallback_tokens() {
        assert_eq!(
            fallback_tokens("Peugeot", "3008"),
            SiteTokens::new("PEUGEOT", "PEUGEOT_3008")
        );
        assert_eq!(
            fallback_tokens("Mercedes-Benz", "Classe A"),
            SiteTokens::new("MERCEDES", "MERCEDES_Classe A")
        );
        assert_eq!(fallback_tokens("Citroën", "C3").brand, "CITROEN");
    }

    #[test]
    fn test_region_code() {
        assert_eq!(region_code("Auvergne-Rhône-Alpes"), Some("22"));
        assert_eq!(region_code("Île-de-France"), Some("12"));
        assert_eq!(region_code("pays de la loire"), Some("18"));
        assert_eq!(region_code("Provence-Alpes-Côte d’Azur"), Some("21"));
        assert_eq!(region_code("Bavaria"), None);
    }

    #[test]
    fn test_build_geo_request_with_all_filters() {
        let s = strategy(
            LocationScope::Geo,
            &[
                SearchFilter::Fuel,
                SearchFilter::Gearbox,
                SearchFilter::Power,
                SearchFilter::Mileage,
            ],
        );
        let tokens = fallback_tokens("Peugeot", "3008");
        let request = build_request(&query(), &s, &tokens, 35);

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, SEARCH_URL);
        let body = request.body.expect("finder body");
        let filters = &body["filters"];
        assert_eq!(filters["category"]["id"], "2");
        assert_eq!(filters["enums"]["u_car_brand"], json!(["PEUGEOT"]));
        assert_eq!(filters["enums"]["u_car_model"], json!(["PEUGEOT_3008"]));
        assert_eq!(filters["enums"]["fuel"], json!(["2"]));
        assert_eq!(filters["enums"]["gearbox"], json!(["2"]));
        assert_eq!(filters["ranges"]["regdate"], json!({"min": 2020, "max": 2022}));
        assert_eq!(filters["ranges"]["horse_power_din"], json!({"min": 117, "max": 143}));
        assert_eq!(filters["ranges"]["mileage"], json!({"min": 30000, "max": 90000}));
        assert_eq!(filters["location"]["locations"][0]["zipcode"], "69003");
        assert_eq!(filters["location"]["locations"][0]["area"]["radius"], 50_000);
        assert_eq!(body["limit"], 35);
    }

    #[test]
    fn test_build_region_request_omits_unapplied_filters() {
        let mut s = strategy(LocationScope::Region, &[SearchFilter::Fuel]);
        s.region_code = Some("22".to_string());
        let request = build_request(&query(), &s, &fallback_tokens("Peugeot", "3008"), 35);

        let filters = &request.body.expect("finder body")["filters"];
        assert_eq!(filters["location"], json!({"regions": ["22"]}));
        assert!(filters["enums"].get("gearbox").is_none());
        assert!(filters["ranges"].get("mileage").is_none());
        assert!(filters["ranges"].get("horse_power_din").is_none());
    }

    #[test]
    fn test_build_national_request_has_no_location() {
        let s = strategy(LocationScope::National, &[]);
        let request = build_request(&query(), &s, &fallback_tokens("Peugeot", "3008"), 35);
        assert!(request.body.expect("finder body")["filters"]
            .get("location")
            .is_none());
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "total": 3,
            "ads": [
                {"price": [24500], "attributes": [
                    {"key": "regdate", "value": "2021"},
                    {"key": "mileage", "value": "41000"},
                    {"key": "fuel", "value": "2", "value_label": "Diesel"},
                    {"key": "gearbox", "value": "2", "value_label": "Automatique"}
                ]},
                {"price": [], "attributes": []},
                {"price": [0]},
                {"price": [19900], "attributes": [{"key": "regdate", "value": "n/a"}]}
            ]
        }"#;

        let samples = parse_response(body).expect("parse finder response");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].price, 24_500);
        assert_eq!(samples[0].year, Some(2021));
        assert_eq!(samples[0].mileage_km, Some(41_000));
        assert_eq!(samples[0].fuel, Some(Fuel::Diesel));
        assert_eq!(samples[0].gearbox, Some(Gearbox::Automatic));
        assert_eq!(samples[1].fuel, None);
        assert_eq!(samples[1].year, None);
    }

    #[test]
    fn test_parse_response_without_ads() {
        let samples = parse_response(r#"{"total": 0}"#).expect("parse empty response");
        assert!(samples.is_empty());
    }

    #[test]
    fn test_parse_response_rejects_html() {
        let err = parse_response("<html>blocked</html>").expect_err("not JSON");
        assert!(matches!(err, SiteError::Parse { .. }));
    }
}
