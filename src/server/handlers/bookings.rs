use axum::extract::{Extension, Json, Path};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::{Booking, DraftPatch};
use crate::error::Error;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
) -> Result<Json<Booking>, Error> {
    let booking = api.create_booking(user).await?;

    Ok(booking.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(token): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.find_booking(user, token).await?;

    Ok(booking.into())
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(token): Path<Uuid>,
    Json(patch): Json<DraftPatch>,
) -> Result<Json<Booking>, Error> {
    let booking = api.update_booking(user, token, patch).await?;

    Ok(booking.into())
}

#[axum_macros::debug_handler]
pub async fn next(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(token): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.advance_booking(user, token).await?;

    Ok(booking.into())
}

pub async fn back(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path(token): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.regress_booking(user, token).await?;

    Ok(booking.into())
}

pub async fn go_to(
    Extension(api): Extension<DynAPI>,
    Extension(user): Extension<User>,
    Path((token, target)): Path<(Uuid, u8)>,
) -> Result<Json<Booking>, Error> {
    let booking = api.go_to_stage(user, token, target).await?;

    Ok(booking.into())
}
