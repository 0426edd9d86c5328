use axum::extract::{Extension, Json, Path, Query};
use serde::{Deserialize, Serialize};

use crate::api::DynAPI;
use crate::entities::Address;
use crate::error::Error;
use crate::external::google_maps::PlaceSuggestion;

#[derive(Serialize, Deserialize)]
pub struct SuggestionParams {
    input: String,
    session_token: String,
}

#[derive(Serialize, Deserialize)]
pub struct SessionParams {
    session_token: String,
}

pub async fn find_suggestions(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<Vec<PlaceSuggestion>>, Error> {
    let suggestions = api
        .place_suggestions(params.input, params.session_token)
        .await?;

    Ok(suggestions.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
    Query(params): Query<SessionParams>,
) -> Result<Json<Address>, Error> {
    let address = api.find_place(id, params.session_token).await?;

    Ok(address.into())
}
