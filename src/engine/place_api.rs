use async_trait::async_trait;

use super::Engine;
use crate::api::PlaceAPI;
use crate::entities::Address;
use crate::error::Error;
use crate::external::google_maps::{self, PlaceSuggestion};

#[async_trait]
impl PlaceAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn place_suggestions(
        &self,
        input: String,
        session_token: String,
    ) -> Result<Vec<PlaceSuggestion>, Error> {
        google_maps::find_place_suggestions(input, session_token).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_place(&self, id: String, session_token: String) -> Result<Address, Error> {
        google_maps::find_place(id, session_token).await
    }
}
