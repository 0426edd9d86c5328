use axum::extract::{Extension, Json, Query};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::DynAPI;
use crate::error::Error;
use crate::fare::{FareBreakdown, PriceRange, TripFacts};

#[derive(Serialize, Deserialize)]
pub struct RangeParams {
    distance_km: f64,
    at: NaiveDateTime,
}

pub async fn calculate(
    Extension(api): Extension<DynAPI>,
    Json(trip): Json<TripFacts>,
) -> Result<Json<FareBreakdown>, Error> {
    let breakdown = api.calculate_fare(trip).await?;

    Ok(breakdown.into())
}

pub async fn range(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<RangeParams>,
) -> Result<Json<PriceRange>, Error> {
    let range = api.estimate_range(params.distance_km, params.at).await?;

    Ok(range.into())
}
