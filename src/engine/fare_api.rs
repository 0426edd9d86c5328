use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::Engine;
use crate::api::FareAPI;
use crate::error::Error;
use crate::fare::{FareBreakdown, PriceRange, TripFacts};

#[async_trait]
impl FareAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn calculate_fare(&self, trip: TripFacts) -> Result<FareBreakdown, Error> {
        Ok(self.schedule.compute(&trip))
    }

    #[tracing::instrument(skip(self))]
    async fn estimate_range(
        &self,
        distance_km: f64,
        at: NaiveDateTime,
    ) -> Result<PriceRange, Error> {
        Ok(self.schedule.estimate_range(distance_km, at))
    }
}
