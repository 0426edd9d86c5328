use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use super::Engine;
use crate::api::BookingAPI;
use crate::auth::User;
use crate::entities::{Booking, DraftPatch, Estimate, Stage};
use crate::error::{
    invalid_input_error, invalid_state_error, unexpected_error, validation_error, Error,
};
use crate::external::{RouteEstimate, RouteQuery};
use crate::fare::TripFacts;

// canned estimate substituted when the distance collaborator is unavailable
const FALLBACK_DISTANCE_KM: f64 = 10.0;
const FALLBACK_DURATION_MINUTES: f64 = 20.0;

// probing the same date late in the evening yields the night end of the band
const NIGHT_PROBE_HOUR: u32 = 22;

enum Followup {
    None,
    Estimate { seq: u64 },
    Submit,
}

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn create_booking(&self, user: User) -> Result<Booking, Error> {
        let booking = Booking::new(user.id);

        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.token, booking.clone());

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, user: User, token: Uuid) -> Result<Booking, Error> {
        let bookings = self.bookings.read().await;
        let booking = bookings.get(&token).ok_or_else(invalid_input_error)?;

        self.authorize(&user, booking)?;

        Ok(booking.clone())
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_booking(
        &self,
        user: User,
        token: Uuid,
        patch: DraftPatch,
    ) -> Result<Booking, Error> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&token).ok_or_else(invalid_input_error)?;

        self.authorize(&user, booking)?;

        if booking.stage == Stage::Confirmed {
            return Err(invalid_state_error());
        }

        booking.draft.apply(patch);

        Ok(booking.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn advance_booking(&self, user: User, token: Uuid) -> Result<Booking, Error> {
        let today = Utc::now().date_naive();

        // validate and move under the lock, run the slow path unlocked
        let (snapshot, followup) = {
            let mut bookings = self.bookings.write().await;
            let booking = bookings.get_mut(&token).ok_or_else(invalid_input_error)?;

            self.authorize(&user, booking)?;

            match booking.stage {
                Stage::Contact => {
                    let errors = booking.validate_stage(today);
                    if !errors.is_empty() {
                        return Err(validation_error(errors));
                    }

                    (booking.clone(), Followup::Submit)
                }
                _ => {
                    let stage = booking.advance(today)?;
                    let followup = match stage {
                        Stage::Estimate => Followup::Estimate {
                            seq: booking.estimate_seq,
                        },
                        _ => Followup::None,
                    };

                    (booking.clone(), followup)
                }
            }
        };

        match followup {
            Followup::None => Ok(snapshot),
            Followup::Estimate { seq } => self.populate_estimate(snapshot, seq).await,
            Followup::Submit => self.submit_reservation(snapshot).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn regress_booking(&self, user: User, token: Uuid) -> Result<Booking, Error> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&token).ok_or_else(invalid_input_error)?;

        self.authorize(&user, booking)?;
        booking.back()?;

        Ok(booking.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn go_to_stage(&self, user: User, token: Uuid, target: u8) -> Result<Booking, Error> {
        let target = Stage::from_number(target).ok_or_else(invalid_input_error)?;

        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&token).ok_or_else(invalid_input_error)?;

        self.authorize(&user, booking)?;
        booking.go_to(target);

        Ok(booking.clone())
    }
}

impl Engine {
    async fn route_or_fallback(&self, query: &RouteQuery) -> (RouteEstimate, bool) {
        match self.distance.route_distance(query).await {
            Ok(route) => (route, false),
            Err(err) => {
                tracing::warn!(
                    code = err.code,
                    "distance lookup failed, substituting fallback estimate"
                );

                (
                    RouteEstimate {
                        distance_km: FALLBACK_DISTANCE_KM,
                        duration_minutes: FALLBACK_DURATION_MINUTES,
                        duration_text: format!("{} min environ", FALLBACK_DURATION_MINUTES as i64),
                        estimated: true,
                    },
                    true,
                )
            }
        }
    }

    #[tracing::instrument(skip(self, snapshot))]
    async fn populate_estimate(&self, snapshot: Booking, seq: u64) -> Result<Booking, Error> {
        let (travel_date, travel_time) =
            match (snapshot.draft.travel_date, snapshot.draft.travel_time) {
                (Some(date), Some(time)) => (date, time),
                // the schedule stage validated presence before this point
                _ => return Err(invalid_state_error()),
            };

        let query = RouteQuery {
            origin: snapshot.draft.origin.clone(),
            destination: snapshot.draft.destination.clone(),
        };
        let (route, degraded) = self.route_or_fallback(&query).await;

        let probe_time =
            NaiveTime::from_hms_opt(NIGHT_PROBE_HOUR, 0, 0).ok_or_else(unexpected_error)?;

        let facts = |time: NaiveTime| TripFacts {
            distance_km: route.distance_km,
            at: NaiveDateTime::new(travel_date, time),
            passengers: snapshot.draft.passengers,
            luggage: snapshot.draft.luggage,
            animals: snapshot.draft.animals,
            empty_return: snapshot.draft.empty_return(),
        };

        // both ends of the day/night band are computed before anything is
        // written; the midpoint is the single scalar shown to the user
        let (low, high) = (
            self.schedule.compute(&facts(travel_time)),
            self.schedule.compute(&facts(probe_time)),
        );

        let estimate = Estimate {
            distance_km: route.distance_km,
            duration_text: Some(route.duration_text.clone()),
            price_low: low.total,
            price_high: high.total,
            price: (low.total + high.total) / 2.0,
            estimated: route.estimated || degraded,
            degraded,
        };

        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&snapshot.token)
            .ok_or_else(invalid_input_error)?;

        if !booking.apply_estimate(seq, estimate) {
            tracing::info!("discarding stale route estimate");
        }

        Ok(booking.clone())
    }

    #[tracing::instrument(skip(self, snapshot))]
    async fn submit_reservation(&self, snapshot: Booking) -> Result<Booking, Error> {
        // an upstream failure propagates and leaves the booking at the
        // contact stage, draft intact for a retry
        let receipt = self.sink.submit(&snapshot.draft).await?;

        tracing::info!(
            reservation_id = %receipt.reservation_id,
            "reservation accepted by the operator relay"
        );

        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&snapshot.token)
            .ok_or_else(invalid_input_error)?;

        booking.confirm(receipt.reservation_id)?;

        Ok(booking.clone())
    }
}
