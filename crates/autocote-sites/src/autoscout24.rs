//! autoscout24: server-rendered listing pages carrying a Next.js data island.

use crate::error::{Result, SiteError};
use crate::request::{HttpMethod, SearchRequest};
use crate::site::Site;
use crate::strategy::{mileage_window, power_window, LocationScope, SearchFilter, SearchStrategy};
use autocote_core::{fold_accents, Fuel, Gearbox, PriceSample, SiteTokens, VehicleQuery};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

const LISTING_BASE: &str = "https://www.autoscout24.fr/lst";

/// Radius of geo tiers, in kilometres.
const GEO_RADIUS_KM: u32 = 50;
/// Radius around a region's representative postal code.
const REGION_RADIUS_KM: u32 = 150;

const BRAND_ALIASES: &[(&str, &str)] = &[
    ("vw", "volkswagen"),
    ("mercedes", "mercedes-benz"),
    ("ds-automobiles", "ds"),
    ("land-rover", "land-rover"),
];

/// Postal code of each region's main city, searched with a wide radius.
const REGION_ZIPS: &[(&str, &str)] = &[
    ("auvergne-rhone-alpes", "69001"),
    ("rhone-alpes", "69001"),
    ("auvergne", "63000"),
    ("bourgogne-franche-comte", "21000"),
    ("bourgogne", "21000"),
    ("franche-comte", "25000"),
    ("bretagne", "35000"),
    ("centre-val-de-loire", "45000"),
    ("centre", "45000"),
    ("corse", "20000"),
    ("grand-est", "67000"),
    ("alsace", "67000"),
    ("lorraine", "54000"),
    ("champagne-ardenne", "51100"),
    ("hauts-de-france", "59000"),
    ("nord-pas-de-calais", "59000"),
    ("picardie", "80000"),
    ("ile-de-france", "75001"),
    ("normandie", "76000"),
    ("haute-normandie", "76000"),
    ("basse-normandie", "14000"),
    ("nouvelle-aquitaine", "33000"),
    ("aquitaine", "33000"),
    ("limousin", "87000"),
    ("poitou-charentes", "86000"),
    ("occitanie", "31000"),
    ("midi-pyrenees", "31000"),
    ("languedoc-roussillon", "34000"),
    ("pays-de-la-loire", "44000"),
    ("provence-alpes-cote-d-azur", "13001"),
    ("paca", "13001"),
];

pub(crate) fn matches_host(host: &str) -> bool {
    static HOST: OnceLock<Regex> = OnceLock::new();
    HOST.get_or_init(|| {
        Regex::new(r"^(?:[a-z0-9-]+\.)*autoscout24\.(?:fr|de|it|es|be|nl|at|lu|ch|com)$")
            .expect("valid regex")
    })
    .is_match(host)
}

pub(crate) fn is_ad_path(path: &str) -> bool {
    static AD_PATH: OnceLock<Regex> = OnceLock::new();
    AD_PATH
        .get_or_init(|| {
            Regex::new(r"^/(?:offres|angebote|annunci|anuncios|aanbod|offers)/[a-z0-9-]+/?$")
                .expect("valid regex")
        })
        .is_match(path)
}

pub(crate) fn fuel_code(fuel: Fuel) -> Option<&'static str> {
    Some(match fuel {
        Fuel::Petrol => "B",
        Fuel::Diesel => "D",
        Fuel::Electric => "E",
        Fuel::Lpg => "L",
        Fuel::Hybrid | Fuel::PlugInHybrid => "2",
        Fuel::Other => "O",
    })
}

pub(crate) fn gearbox_code(gearbox: Gearbox) -> Option<&'static str> {
    Some(match gearbox {
        Gearbox::Manual => "M",
        Gearbox::Automatic => "A",
    })
}

pub(crate) fn region_code(region: &str) -> Option<&'static str> {
    let key = slugify(region);
    REGION_ZIPS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, zip)| *zip)
}

/// Lowercase, accent-free, dash-separated form used in listing URLs.
fn slugify(input: &str) -> String {
    let folded = fold_accents(&input.trim().to_lowercase());
    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub(crate) fn fallback_tokens(make: &str, model: &str) -> SiteTokens {
    let brand = slugify(make);
    let brand = BRAND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == brand)
        .map_or(brand.clone(), |(_, canonical)| (*canonical).to_string());
    SiteTokens::new(brand, slugify(model))
}

pub(crate) fn build_request(
    query: &VehicleQuery,
    strategy: &SearchStrategy,
    tokens: &SiteTokens,
    page_limit: u32,
) -> SearchRequest {
    let (year_min, year_max) = strategy.year_window(query.year);
    let mut params: Vec<(&str, String)> = vec![
        ("atype", "C".to_string()),
        ("cy", "F".to_string()),
        ("sort", "age".to_string()),
        ("desc", "1".to_string()),
        ("size", page_limit.to_string()),
        ("fregfrom", year_min.to_string()),
        ("fregto", year_max.to_string()),
    ];

    if strategy.applies(SearchFilter::Fuel) {
        if let Some(code) = query.fuel.and_then(fuel_code) {
            params.push(("fuel", code.to_string()));
        }
    }
    if strategy.applies(SearchFilter::Gearbox) {
        if let Some(code) = query.gearbox.and_then(gearbox_code) {
            params.push(("gear", code.to_string()));
        }
    }
    if strategy.applies(SearchFilter::Power) {
        if let Some(hp) = query.horse_power_hp {
            let (min, max) = power_window(hp);
            params.push(("powerfrom", min.to_string()));
            params.push(("powerto", max.to_string()));
            params.push(("powertype", "hp".to_string()));
        }
    }
    if strategy.applies(SearchFilter::Mileage) {
        if let Some(km) = query.mileage_km {
            let (min, max) = mileage_window(km);
            params.push(("kmfrom", min.to_string()));
            params.push(("kmto", max.to_string()));
        }
    }

    match strategy.location_scope {
        LocationScope::Geo => {
            if let Some(zip) = query
                .location
                .as_ref()
                .filter(|l| l.has_geo())
                .and_then(|l| l.zipcode.clone())
            {
                params.push(("zip", zip));
                params.push(("zipr", GEO_RADIUS_KM.to_string()));
            }
        }
        LocationScope::Region => {
            if let Some(zip) = &strategy.region_code {
                params.push(("zip", zip.clone()));
                params.push(("zipr", REGION_RADIUS_KM.to_string()));
            }
        }
        LocationScope::National => {}
    }

    let base = format!("{LISTING_BASE}/{}/{}", tokens.brand, tokens.model);
    let url = url::Url::parse_with_params(&base, &params)
        .map_or_else(|_| base.clone(), |u| u.to_string());

    SearchRequest {
        site: Site::AutoScout24,
        method: HttpMethod::Get,
        url,
        body: None,
    }
}

fn looks_like_challenge(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("captcha") || lower.contains("datadome") || lower.contains("are you a robot")
}

/// Integer out of a tracking field that may be serialized as a number or a string.
fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Year out of a `"MM-YYYY"` first-registration field.
fn registration_year(value: &Value) -> Option<i32> {
    let text = value.as_str()?;
    text.rsplit(['-', '/']).next()?.trim().parse().ok()
}

fn listing_sample(listing: &Value) -> Option<PriceSample> {
    let tracking = listing.get("tracking")?;
    let price = tracking.get("price").and_then(as_u32).filter(|p| *p > 0)?;
    Some(PriceSample {
        price,
        year: tracking.get("firstRegistration").and_then(registration_year),
        mileage_km: tracking.get("mileage").and_then(as_u32),
        fuel: listing
            .pointer("/vehicle/fuel")
            .and_then(Value::as_str)
            .and_then(Fuel::parse_label),
        gearbox: listing
            .pointer("/vehicle/transmission")
            .and_then(Value::as_str)
            .and_then(Gearbox::parse_label),
    })
}

pub(crate) fn parse_response(body: &str) -> Result<Vec<PriceSample>> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("script#__NEXT_DATA__").map_err(|e| SiteError::Parse {
        site: Site::AutoScout24,
        reason: format!("invalid data island selector: {e}"),
    })?;

    let Some(script) = document.select(&selector).next() else {
        if looks_like_challenge(body) {
            return Err(SiteError::Blocked {
                site: Site::AutoScout24,
            });
        }
        return Err(SiteError::Parse {
            site: Site::AutoScout24,
            reason: "page has no __NEXT_DATA__ script".to_string(),
        });
    };

    let raw: String = script.text().collect();
    let data: Value = serde_json::from_str(&raw).map_err(|e| SiteError::Parse {
        site: Site::AutoScout24,
        reason: format!("invalid __NEXT_DATA__ JSON: {e}"),
    })?;

    Ok(data
        .pointer("/props/pageProps/listings")
        .and_then(Value::as_array)
        .map(|listings| listings.iter().filter_map(listing_sample).collect())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocote_core::Location;
    use std::collections::BTreeSet;

    fn query() -> VehicleQuery {
        VehicleQuery::new("Peugeot", "3008", 2021)
            .with_fuel(Fuel::Diesel)
            .with_gearbox(Gearbox::Manual)
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
            year_spread: 2,
            filters: filters.iter().copied().collect::<BTreeSet<_>>(),
            precision_tier: 3,
            region_code: None,
        }
    }

    fn query_pairs(url: &str) -> Vec<(String, String)> {
        url::Url::parse(url)
            .expect("valid url")
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param(url: &str, key: &str) -> Option<String> {
        query_pairs(url).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn test_slugify_and_fallback_tokens() {
        assert_eq!(slugify("Série 3"), "serie-3");
        assert_eq!(slugify("  Classe A (W177) "), "classe-a-w177");
        assert_eq!(
            fallback_tokens("Mercedes-Benz", "Classe C"),
            SiteTokens::new("mercedes-benz", "classe-c")
        );
        assert_eq!(fallback_tokens("VW", "Golf").brand, "volkswagen");
        assert_eq!(fallback_tokens("Citroën", "C5 Aircross").model, "c5-aircross");
    }

    #[test]
    fn test_matches_host() {
        assert!(matches_host("www.autoscout24.fr"));
        assert!(matches_host("autoscout24.de"));
        assert!(!matches_host("autoscout24.fr.example.com"));
        assert!(!matches_host("notautoscout24.fr"));
    }

    #[test]
    fn test_region_code() {
        assert_eq!(region_code("Île-de-France"), Some("75001"));
        assert_eq!(region_code("Provence-Alpes-Côte d'Azur"), Some("13001"));
        assert_eq!(region_code("Atlantis"), None);
    }

    #[test]
    fn test_build_national_request() {
        let s = strategy(
            LocationScope::National,
            &[SearchFilter::Fuel, SearchFilter::Gearbox, SearchFilter::Power],
        );
        let request = build_request(&query(), &s, &fallback_tokens("Peugeot", "3008"), 20);

        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.body.is_none());
        assert!(request
            .url
            .starts_with("https://www.autoscout24.fr/lst/peugeot/3008?"));
        assert_eq!(param(&request.url, "fregfrom").as_deref(), Some("2019"));
        assert_eq!(param(&request.url, "fregto").as_deref(), Some("2023"));
        assert_eq!(param(&request.url, "fuel").as_deref(), Some("D"));
        assert_eq!(param(&request.url, "gear").as_deref(), Some("M"));
        assert_eq!(param(&request.url, "powerfrom").as_deref(), Some("117"));
        assert_eq!(param(&request.url, "powerto").as_deref(), Some("143"));
        assert_eq!(param(&request.url, "kmfrom"), None);
        assert_eq!(param(&request.url, "zip"), None);
    }

    #[test]
    fn test_build_geo_and_region_requests() {
        let geo = strategy(LocationScope::Geo, &[SearchFilter::Mileage]);
        let request = build_request(&query(), &geo, &fallback_tokens("Peugeot", "3008"), 20);
        assert_eq!(param(&request.url, "zip").as_deref(), Some("69003"));
        assert_eq!(param(&request.url, "zipr").as_deref(), Some("50"));
        assert_eq!(param(&request.url, "kmfrom").as_deref(), Some("30000"));
        assert_eq!(param(&request.url, "kmto").as_deref(), Some("90000"));

        let mut region = strategy(LocationScope::Region, &[]);
        region.region_code = Some("69001".to_string());
        let request = build_request(&query(), &region, &fallback_tokens("Peugeot", "3008"), 20);
        assert_eq!(param(&request.url, "zip").as_deref(), Some("69001"));
        assert_eq!(param(&request.url, "zipr").as_deref(), Some("150"));
    }

    #[test]
    fn test_parse_response() {
        let body = r#"<html><body>
            <script id="__NEXT_DATA__" type="application/json">
            {"props": {"pageProps": {"listings": [
                {"tracking": {"price": "21990", "firstRegistration": "03-2021", "mileage": "45000"},
                 "vehicle": {"fuel": "Diesel", "transmission": "Boîte manuelle"}},
                {"tracking": {"price": 18500, "firstRegistration": "2020"}},
                {"tracking": {"firstRegistration": "01-2019"}},
                {"vehicle": {"fuel": "Essence"}}
            ]}}}
            </script></body></html>"#;

        let samples = parse_response(body).expect("parse listing page");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].price, 21_990);
        assert_eq!(samples[0].year, Some(2021));
        assert_eq!(samples[0].mileage_km, Some(45_000));
        assert_eq!(samples[0].fuel, Some(Fuel::Diesel));
        assert_eq!(samples[0].gearbox, Some(Gearbox::Manual));
        assert_eq!(samples[1].price, 18_500);
        assert_eq!(samples[1].year, Some(2020));
    }

    #[test]
    fn test_parse_response_without_listings() {
        let body = r#"<script id="__NEXT_DATA__">{"props": {"pageProps": {}}}</script>"#;
        assert!(parse_response(body).expect("parse empty page").is_empty());
    }

    #[test]
    fn test_parse_challenge_page() {
        let err = parse_response("<html><div class=\"captcha-box\">Please verify</div></html>")
            .expect_err("challenge page");
        assert!(matches!(err, SiteError::Blocked { .. }));

        let err = parse_response("<html><body>maintenance</body></html>").expect_err("no data");
        assert!(matches!(err, SiteError::Parse { .. }));
    }
}
