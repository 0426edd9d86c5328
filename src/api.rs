use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{Address, Booking, DraftPatch};
use crate::error::Error;
use crate::external::google_maps::PlaceSuggestion;
use crate::fare::{FareBreakdown, PriceRange, TripFacts};

#[async_trait]
pub trait BookingAPI {
    async fn create_booking(&self, user: User) -> Result<Booking, Error>;
    async fn find_booking(&self, user: User, token: Uuid) -> Result<Booking, Error>;
    async fn update_booking(
        &self,
        user: User,
        token: Uuid,
        patch: DraftPatch,
    ) -> Result<Booking, Error>;
    async fn advance_booking(&self, user: User, token: Uuid) -> Result<Booking, Error>;
    async fn regress_booking(&self, user: User, token: Uuid) -> Result<Booking, Error>;
    async fn go_to_stage(&self, user: User, token: Uuid, target: u8) -> Result<Booking, Error>;
}

#[async_trait]
pub trait FareAPI {
    async fn calculate_fare(&self, trip: TripFacts) -> Result<FareBreakdown, Error>;
    async fn estimate_range(
        &self,
        distance_km: f64,
        at: NaiveDateTime,
    ) -> Result<PriceRange, Error>;
}

#[async_trait]
pub trait PlaceAPI {
    async fn place_suggestions(
        &self,
        input: String,
        session_token: String,
    ) -> Result<Vec<PlaceSuggestion>, Error>;
    async fn find_place(&self, id: String, session_token: String) -> Result<Address, Error>;
}

pub trait API: BookingAPI + FareAPI + PlaceAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
