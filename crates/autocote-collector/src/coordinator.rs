//! Job coordinator protocol and its HTTP client.

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::submission::{FailedSearchReport, JobDone, SubmissionPayload};
use async_trait::async_trait;
use autocote_core::{CoordinatorConfig, Fuel, Gearbox, Location, SiteTokens, VehicleQuery};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Query of `GET next-job`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Brand as displayed
    pub make: String,
    /// Model as displayed
    pub model: String,
    /// Year of first registration
    pub year: i32,
    /// Region name of the viewed listing
    pub region: Option<String>,
    /// Fuel type, if known
    pub fuel: Option<Fuel>,
    /// Gearbox, if known
    pub gearbox: Option<Gearbox>,
    /// 20 hp bucket, e.g. `120-139`
    pub hp_range: Option<String>,
}

impl JobRequest {
    /// Request describing the viewed vehicle.
    #[must_use]
    pub fn for_vehicle(query: &VehicleQuery) -> Self {
        Self {
            make: query.make.clone(),
            model: query.model.clone(),
            year: query.year,
            region: query.region().map(str::to_string),
            fuel: query.fuel,
            gearbox: query.gearbox,
            hp_range: query.hp_range(),
        }
    }

    /// Query-string pairs; absent values are omitted.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("make", self.make.clone()),
            ("model", self.model.clone()),
            ("year", self.year.to_string()),
            ("region", self.region.clone().unwrap_or_default()),
        ];
        if let Some(fuel) = self.fuel {
            pairs.push(("fuel", fuel.as_str().to_string()));
        }
        if let Some(gearbox) = self.gearbox {
            pairs.push(("gearbox", gearbox.as_str().to_string()));
        }
        if let Some(hp_range) = &self.hp_range {
            pairs.push(("hp_range", hp_range.clone()));
        }
        pairs
    }
}

/// A vehicle as described by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobVehicle {
    /// Brand as displayed
    pub make: String,
    /// Model as displayed
    pub model: String,
    /// Year of first registration
    pub year: i32,
    /// Fuel type, if known
    #[serde(default)]
    pub fuel: Option<Fuel>,
    /// Gearbox, if known
    #[serde(default)]
    pub gearbox: Option<Gearbox>,
    /// DIN horse power, if known
    #[serde(default)]
    pub horse_power_hp: Option<u32>,
    /// Odometer reading in kilometres, if known
    #[serde(default)]
    pub mileage_km: Option<u32>,
    /// Marketplace tokens learned from other agents
    #[serde(default)]
    pub site_tokens: Option<SiteTokens>,
}

impl JobVehicle {
    /// Query for this vehicle in `region`. Never carries geo data.
    #[must_use]
    pub fn to_query(&self, region: Option<&str>) -> VehicleQuery {
        VehicleQuery {
            make: self.make.clone(),
            model: self.model.clone(),
            year: self.year,
            fuel: self.fuel,
            gearbox: self.gearbox,
            horse_power_hp: self.horse_power_hp,
            mileage_km: self.mileage_km,
            location: region.map(Location::region_only),
        }
    }
}

/// Extra vehicle the coordinator asks this agent to price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusJob {
    /// Echoed back in `job-done`
    pub job_id: String,
    /// Vehicle to price
    pub vehicle: JobVehicle,
    /// Region to search in
    #[serde(default)]
    pub region: Option<String>,
}

/// Answer of `GET next-job`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionJob {
    /// Whether any collection is wanted
    pub should_collect: bool,
    /// Vehicle to collect instead of the viewed one
    pub target_vehicle: Option<JobVehicle>,
    /// Region to search the target in
    pub target_region: Option<String>,
    /// Whether the target differs from the viewed vehicle
    pub is_redirect: bool,
    /// Extra vehicles to price after the main collection
    pub bonus_jobs: Vec<BonusJob>,
}

#[derive(Debug, Deserialize)]
struct SubmitAck {
    #[serde(default = "default_ok")]
    ok: bool,
}

fn default_ok() -> bool {
    true
}

/// Remote job-assignment service.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Ask which vehicle most needs fresh prices.
    async fn next_job(&self, request: &JobRequest) -> CoordinatorResult<CollectionJob>;

    /// Submit a validated sample set.
    async fn submit_prices(&self, payload: &SubmissionPayload) -> CoordinatorResult<()>;

    /// Report completion of a bonus job.
    async fn report_job_done(&self, report: &JobDone) -> CoordinatorResult<()>;

    /// Send the diagnostic of a search that came up short.
    async fn report_failed_search(&self, report: &FailedSearchReport) -> CoordinatorResult<()>;
}

/// reqwest client for the coordinator's JSON API.
pub struct HttpCoordinator {
    client: Client,
    base_url: String,
}

impl HttpCoordinator {
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &CoordinatorConfig) -> CoordinatorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoordinatorError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> CoordinatorResult<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| CoordinatorError::from_transport(e.to_string()))?;
        check_status(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> CoordinatorResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| CoordinatorError::Decode(e.to_string()))
    }
}

fn check_status(response: reqwest::Response) -> CoordinatorResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CoordinatorError::Rejected {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn next_job(&self, request: &JobRequest) -> CoordinatorResult<CollectionJob> {
        let url = url::Url::parse_with_params(&self.endpoint("next-job"), request.query_pairs())
            .map_err(|e| CoordinatorError::Client(format!("invalid coordinator URL: {e}")))?;

        tracing::debug!(url = %url, "requesting next job");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoordinatorError::from_transport(e.to_string()))?;
        let response = check_status(response)?;
        Self::decode(response).await
    }

    async fn submit_prices(&self, payload: &SubmissionPayload) -> CoordinatorResult<()> {
        let response = self.post("market-prices", payload).await?;
        let status = response.status().as_u16();
        let ack: SubmitAck = Self::decode(response).await?;
        if ack.ok {
            Ok(())
        } else {
            Err(CoordinatorError::Rejected { status })
        }
    }

    async fn report_job_done(&self, report: &JobDone) -> CoordinatorResult<()> {
        self.post("market-prices/job-done", report).await?;
        Ok(())
    }

    async fn report_failed_search(&self, report: &FailedSearchReport) -> CoordinatorResult<()> {
        self.post("market-prices/failed-search", report).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_request_query_pairs() {
        let query = VehicleQuery::new("Peugeot", "3008", 2021)
            .with_fuel(Fuel::Diesel)
            .with_horse_power(130)
            .with_location(Location::region_only("Bretagne"));
        let pairs = JobRequest::for_vehicle(&query).query_pairs();

        assert!(pairs.contains(&("make", "Peugeot".to_string())));
        assert!(pairs.contains(&("year", "2021".to_string())));
        assert!(pairs.contains(&("region", "Bretagne".to_string())));
        assert!(pairs.contains(&("fuel", "diesel".to_string())));
        assert!(pairs.contains(&("hp_range", "120-139".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "gearbox"));
    }

    #[test]
    fn test_collection_job_deserializes() {
        let json = r#"{
            "shouldCollect": true,
            "isRedirect": true,
            "targetRegion": "Occitanie",
            "targetVehicle": {
                "make": "Renault", "model": "Clio", "year": 2019, "fuel": "petrol",
                "siteTokens": {"brand": "RENAULT", "model": "RENAULT_Clio"}
            },
            "bonusJobs": [
                {"jobId": "b-1", "vehicle": {"make": "Dacia", "model": "Sandero", "year": 2020}, "region": "Bretagne"}
            ]
        }"#;
        let job: CollectionJob = serde_json::from_str(json).expect("deserialize job");

        assert!(job.should_collect && job.is_redirect);
        let target = job.target_vehicle.expect("target");
        assert_eq!(target.site_tokens.expect("tokens").brand, "RENAULT");
        assert_eq!(job.bonus_jobs[0].job_id, "b-1");
    }

    #[test]
    fn test_minimal_job_defaults() {
        let job: CollectionJob = serde_json::from_str(r#"{"shouldCollect": false}"#).expect("deserialize");
        assert!(!job.should_collect);
        assert!(job.bonus_jobs.is_empty());
        assert!(!job.is_redirect);
    }

    #[test]
    fn test_redirect_target_has_no_geo() {
        let vehicle = JobVehicle {
            make: "Renault".to_string(),
            model: "Clio".to_string(),
            year: 2019,
            fuel: None,
            gearbox: None,
            horse_power_hp: None,
            mileage_km: None,
            site_tokens: None,
        };
        let query = vehicle.to_query(Some("Occitanie"));
        assert!(!query.has_geo());
        assert_eq!(query.region(), Some("Occitanie"));
    }

    #[test]
    fn test_http_coordinator_endpoints() {
        let config = CoordinatorConfig {
            base_url: "https://coordinator.test/v1/".to_string(),
            ..CoordinatorConfig::default()
        };
        let coordinator = HttpCoordinator::new(&config).expect("client");
        assert_eq!(
            coordinator.endpoint("market-prices/job-done"),
            "https://coordinator.test/v1/market-prices/job-done"
        );
    }
}
