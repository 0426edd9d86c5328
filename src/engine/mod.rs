mod booking_api;
mod fare_api;
mod place_api;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::API;
use crate::auth::User;
use crate::entities::Booking;
use crate::error::{unauthorized_error, Error};
use crate::external::{DistanceService, ReservationSink};
use crate::fare::FareSchedule;

pub struct Engine {
    schedule: FareSchedule,
    distance: Arc<dyn DistanceService>,
    sink: Arc<dyn ReservationSink>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(
        schedule: FareSchedule,
        distance: Arc<dyn DistanceService>,
        sink: Arc<dyn ReservationSink>,
    ) -> Self {
        Self {
            schedule,
            distance,
            sink,
            bookings: RwLock::new(HashMap::new()),
        }
    }

    // placeholder gate: the session that opened a booking, or the system user
    fn authorize(&self, user: &User, booking: &Booking) -> Result<(), Error> {
        if user.has_role("system") || user.id == booking.owner_id {
            return Ok(());
        }

        Err(unauthorized_error())
    }
}

impl API for Engine {}

#[cfg(test)]
pub(crate) mod stubs {
    use async_trait::async_trait;

    use crate::entities::ReservationDraft;
    use crate::error::{upstream_error, Error};
    use crate::external::{
        DistanceService, ReservationSink, RouteEstimate, RouteQuery, SubmissionReceipt,
    };

    pub struct StubDistance {
        pub distance_km: f64,
        pub delay_ms: u64,
        pub fail: bool,
    }

    impl Default for StubDistance {
        fn default() -> Self {
            Self {
                distance_km: 12.0,
                delay_ms: 0,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl DistanceService for StubDistance {
        async fn route_distance(&self, _query: &RouteQuery) -> Result<RouteEstimate, Error> {
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }

            if self.fail {
                return Err(upstream_error());
            }

            Ok(RouteEstimate {
                distance_km: self.distance_km,
                duration_minutes: 18.0,
                duration_text: "18 min".into(),
                estimated: false,
            })
        }
    }

    pub struct StubSink {
        pub fail: bool,
    }

    #[async_trait]
    impl ReservationSink for StubSink {
        async fn submit(&self, _draft: &ReservationDraft) -> Result<SubmissionReceipt, Error> {
            if self.fail {
                return Err(upstream_error());
            }

            Ok(SubmissionReceipt {
                reservation_id: "RES-1".into(),
                notification_results: None,
            })
        }
    }
}

#[cfg(test)]
fn test_engine(distance: stubs::StubDistance, sink: stubs::StubSink) -> Arc<Engine> {
    Arc::new(Engine::new(
        FareSchedule::default(),
        Arc::new(distance),
        Arc::new(sink),
    ))
}

#[cfg(test)]
async fn booking_at_options(engine: &Engine, user: &User) -> Uuid {
    use crate::api::BookingAPI;
    use crate::entities::{Address, DraftPatch, TripType};

    let booking = engine.create_booking(user.clone()).await.unwrap();
    let token = booking.token;

    let travel_date = chrono::Utc::now().date_naive() + chrono::Duration::days(7);

    engine
        .update_booking(
            user.clone(),
            token,
            DraftPatch {
                origin: Some(Address {
                    text: "12 rue des Lilas".into(),
                    ..Address::default()
                }),
                destination: Some(Address {
                    text: "Gare centrale".into(),
                    ..Address::default()
                }),
                travel_date: Some(travel_date),
                travel_time: chrono::NaiveTime::from_hms_opt(14, 0, 0),
                trip_type: Some(TripType::OneWay),
                ..DraftPatch::default()
            },
        )
        .await
        .unwrap();

    engine.advance_booking(user.clone(), token).await.unwrap();
    engine.advance_booking(user.clone(), token).await.unwrap();

    token
}

#[cfg(test)]
async fn booking_at_contact(engine: &Engine, user: &User) -> Uuid {
    use crate::api::BookingAPI;
    use crate::entities::DraftPatch;

    let token = booking_at_options(engine, user).await;

    engine.advance_booking(user.clone(), token).await.unwrap();
    engine.advance_booking(user.clone(), token).await.unwrap();

    engine
        .update_booking(
            user.clone(),
            token,
            DraftPatch {
                last_name: Some("Dupont".into()),
                first_name: Some("Marie".into()),
                phone: Some("0612345678".into()),
                email: Some("marie@example.com".into()),
                ..DraftPatch::default()
            },
        )
        .await
        .unwrap();

    token
}

#[test]
fn entering_the_estimate_stage_populates_a_price_band() {
    use crate::api::BookingAPI;
    use crate::entities::Stage;
    use crate::fare::TripFacts;
    use chrono::{NaiveDateTime, NaiveTime};
    use tokio_test::block_on;

    let engine = test_engine(stubs::StubDistance::default(), stubs::StubSink { fail: false });
    let user = User::new_guest();

    block_on(async {
        let token = booking_at_options(&engine, &user).await;
        let booking = engine.advance_booking(user.clone(), token).await.unwrap();

        assert_eq!(booking.stage, Stage::Estimate);

        let estimate = booking.estimate.unwrap();
        assert_eq!(estimate.distance_km, 12.0);
        assert!(!estimate.degraded);
        assert!(!estimate.estimated);

        let date = booking.draft.travel_date.unwrap();
        let facts = |time: NaiveTime| TripFacts {
            distance_km: 12.0,
            at: NaiveDateTime::new(date, time),
            passengers: 1,
            luggage: 0,
            animals: 0,
            empty_return: true,
        };

        let low = engine
            .schedule
            .compute(&facts(NaiveTime::from_hms_opt(14, 0, 0).unwrap()));
        let high = engine
            .schedule
            .compute(&facts(NaiveTime::from_hms_opt(22, 0, 0).unwrap()));

        assert!((estimate.price_low - low.total).abs() < 1e-9);
        assert!((estimate.price_high - high.total).abs() < 1e-9);
        assert!((estimate.price - (low.total + high.total) / 2.0).abs() < 1e-9);
        assert_eq!(booking.draft.price_estimate, Some(estimate.price));
        assert_eq!(booking.draft.distance_km, Some(12.0));
    });
}

#[test]
fn distance_failure_degrades_to_the_canned_estimate() {
    use crate::api::BookingAPI;
    use crate::entities::Stage;
    use tokio_test::block_on;

    let engine = test_engine(
        stubs::StubDistance {
            fail: true,
            ..stubs::StubDistance::default()
        },
        stubs::StubSink { fail: false },
    );
    let user = User::new_guest();

    block_on(async {
        let token = booking_at_options(&engine, &user).await;
        let booking = engine.advance_booking(user.clone(), token).await.unwrap();

        // fail-soft: the stage is reached and the estimate is never left empty
        assert_eq!(booking.stage, Stage::Estimate);

        let estimate = booking.estimate.unwrap();
        assert!(estimate.degraded);
        assert!(estimate.estimated);
        assert_eq!(estimate.distance_km, 10.0);
        assert!(booking.draft.price_estimate.is_some());
    });
}

#[test]
fn stale_estimates_are_discarded_after_navigating_back() {
    use crate::api::BookingAPI;
    use crate::entities::Stage;
    use tokio_test::block_on;

    let engine = test_engine(
        stubs::StubDistance {
            delay_ms: 50,
            ..stubs::StubDistance::default()
        },
        stubs::StubSink { fail: false },
    );
    let user = User::new_guest();

    block_on(async {
        let token = booking_at_options(&engine, &user).await;

        let handle = tokio::spawn({
            let engine = engine.clone();
            let user = user.clone();
            async move { engine.advance_booking(user, token).await }
        });

        // let the advance reach the collaborator, then leave the stage
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        engine.regress_booking(user.clone(), token).await.unwrap();

        handle.await.unwrap().unwrap();

        let booking = engine.find_booking(user.clone(), token).await.unwrap();
        assert_eq!(booking.stage, Stage::Options);
        assert!(booking.estimate.is_none());
        assert!(booking.draft.price_estimate.is_none());
    });
}

#[test]
fn submission_failure_keeps_the_contact_stage_intact() {
    use crate::api::BookingAPI;
    use crate::entities::Stage;
    use tokio_test::block_on;

    let engine = test_engine(stubs::StubDistance::default(), stubs::StubSink { fail: true });
    let user = User::new_guest();

    block_on(async {
        let token = booking_at_contact(&engine, &user).await;

        let err = engine
            .advance_booking(user.clone(), token)
            .await
            .unwrap_err();
        assert_eq!(err.code, 4);

        let booking = engine.find_booking(user.clone(), token).await.unwrap();
        assert_eq!(booking.stage, Stage::Contact);
        assert_eq!(booking.draft.email, "marie@example.com");
        assert!(booking.reservation_id.is_none());
    });
}

#[test]
fn successful_submission_confirms_the_booking() {
    use crate::api::BookingAPI;
    use crate::entities::Stage;
    use tokio_test::block_on;

    let engine = test_engine(stubs::StubDistance::default(), stubs::StubSink { fail: false });
    let user = User::new_guest();

    block_on(async {
        let token = booking_at_contact(&engine, &user).await;

        let booking = engine.advance_booking(user.clone(), token).await.unwrap();

        assert_eq!(booking.stage, Stage::Confirmed);
        assert_eq!(booking.reservation_id.as_deref(), Some("RES-1"));

        // terminal stage rejects further edits
        let err = engine
            .update_booking(user.clone(), token, Default::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, 100);
    });
}

#[test]
fn submission_requires_valid_contact_details() {
    use crate::api::BookingAPI;
    use crate::entities::{DraftPatch, Stage};
    use tokio_test::block_on;

    let engine = test_engine(stubs::StubDistance::default(), stubs::StubSink { fail: false });
    let user = User::new_guest();

    block_on(async {
        let token = booking_at_contact(&engine, &user).await;

        engine
            .update_booking(
                user.clone(),
                token,
                DraftPatch {
                    email: Some("not-an-email".into()),
                    ..DraftPatch::default()
                },
            )
            .await
            .unwrap();

        let err = engine
            .advance_booking(user.clone(), token)
            .await
            .unwrap_err();

        assert_eq!(err.code, 102);
        let fields = err.fields.unwrap();
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("phone"));

        let booking = engine.find_booking(user.clone(), token).await.unwrap();
        assert_eq!(booking.stage, Stage::Contact);
    });
}

#[test]
fn bookings_are_gated_to_their_owner() {
    use crate::api::BookingAPI;
    use tokio_test::block_on;

    let engine = test_engine(stubs::StubDistance::default(), stubs::StubSink { fail: false });
    let owner = User::new_guest();
    let stranger = User::new_guest();
    let system = User::new_system_user();

    block_on(async {
        let booking = engine.create_booking(owner.clone()).await.unwrap();

        let err = engine
            .find_booking(stranger, booking.token)
            .await
            .unwrap_err();
        assert_eq!(err.code, 103);

        assert!(engine.find_booking(system, booking.token).await.is_ok());
    });
}
