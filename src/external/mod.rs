pub mod google_maps;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::{Address, ReservationDraft};
use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteQuery {
    pub origin: Address,
    pub destination: Address,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub duration_text: String,
    pub estimated: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub reservation_id: String,
    pub notification_results: Option<serde_json::Value>,
}

#[async_trait]
pub trait DistanceService: Send + Sync {
    async fn route_distance(&self, query: &RouteQuery) -> Result<RouteEstimate, Error>;
}

#[async_trait]
pub trait ReservationSink: Send + Sync {
    async fn submit(&self, draft: &ReservationDraft) -> Result<SubmissionReceipt, Error>;
}
