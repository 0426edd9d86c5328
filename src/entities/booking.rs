use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::ReservationDraft;
use crate::error::{invalid_state_error, validation_error, Error, FieldErrors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Addresses,
    Schedule,
    Options,
    Estimate,
    Contact,
    Confirmed,
}

impl Stage {
    pub fn number(&self) -> u8 {
        match self {
            Self::Addresses => 1,
            Self::Schedule => 2,
            Self::Options => 3,
            Self::Estimate => 4,
            Self::Contact => 5,
            Self::Confirmed => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Addresses),
            2 => Some(Self::Schedule),
            3 => Some(Self::Options),
            4 => Some(Self::Estimate),
            5 => Some(Self::Contact),
            6 => Some(Self::Confirmed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Estimate {
    pub distance_km: f64,
    pub duration_text: Option<String>,
    pub price_low: f64,
    pub price_high: f64,
    pub price: f64,
    pub estimated: bool,
    pub degraded: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    pub token: Uuid,
    pub owner_id: Uuid,
    pub stage: Stage,
    pub draft: ReservationDraft,
    pub estimate: Option<Estimate>,
    #[serde(skip)]
    pub estimate_seq: u64,
    pub reservation_id: Option<String>,
}

impl Booking {
    pub fn new(owner_id: Uuid) -> Self {
        Self {
            token: Uuid::new_v4(),
            owner_id,
            stage: Stage::Addresses,
            draft: ReservationDraft::default(),
            estimate: None,
            estimate_seq: 0,
            reservation_id: None,
        }
    }

    pub fn validate_stage(&self, today: NaiveDate) -> FieldErrors {
        match self.stage {
            Stage::Addresses => self.draft.validate_addresses(),
            Stage::Schedule => self.draft.validate_schedule(today),
            Stage::Contact => self.draft.validate_contact(),
            // options all have defaults, the estimate stage has no guard
            Stage::Options | Stage::Estimate | Stage::Confirmed => FieldErrors::new(),
        }
    }

    /// Moves one stage forward once the current stage validates. The jump from
    /// Contact to Confirmed is reserved for `confirm`, which only the
    /// submission path goes through.
    #[tracing::instrument(skip(self, today))]
    pub fn advance(&mut self, today: NaiveDate) -> Result<Stage, Error> {
        let next = match self.stage {
            Stage::Addresses => Stage::Schedule,
            Stage::Schedule => Stage::Options,
            Stage::Options => Stage::Estimate,
            Stage::Estimate => Stage::Contact,
            Stage::Contact | Stage::Confirmed => return Err(invalid_state_error()),
        };

        let errors = self.validate_stage(today);
        if !errors.is_empty() {
            return Err(validation_error(errors));
        }

        if next == Stage::Estimate {
            self.begin_estimate();
        }

        self.stage = next;
        Ok(next)
    }

    #[tracing::instrument(skip(self))]
    pub fn back(&mut self) -> Result<Stage, Error> {
        let previous = match self.stage {
            Stage::Schedule => Stage::Addresses,
            Stage::Options => Stage::Schedule,
            Stage::Estimate => Stage::Options,
            Stage::Contact => Stage::Estimate,
            Stage::Addresses | Stage::Confirmed => return Err(invalid_state_error()),
        };

        if self.stage == Stage::Estimate {
            // anything still in flight for this stage is now stale
            self.estimate_seq += 1;
        }

        self.stage = previous;
        Ok(previous)
    }

    /// Backward jumps to any completed stage are allowed; anything else is a
    /// no-op so the indicator row can never skip validation.
    #[tracing::instrument(skip(self))]
    pub fn go_to(&mut self, target: Stage) -> Stage {
        if target < self.stage && self.stage != Stage::Confirmed {
            if self.stage == Stage::Estimate {
                self.estimate_seq += 1;
            }
            self.stage = target;
        }

        self.stage
    }

    fn begin_estimate(&mut self) {
        self.estimate_seq += 1;
        self.estimate = None;
        self.draft.distance_km = None;
        self.draft.price_estimate = None;
    }

    /// Writes an estimate produced for `seq`. Returns false when the response
    /// is stale, i.e. the user has navigated away from the estimate stage
    /// since the lookup started.
    pub fn apply_estimate(&mut self, seq: u64, estimate: Estimate) -> bool {
        if self.stage != Stage::Estimate || self.estimate_seq != seq {
            return false;
        }

        self.draft.distance_km = Some(estimate.distance_km);
        self.draft.price_estimate = Some(estimate.price);
        self.estimate = Some(estimate);
        true
    }

    pub fn confirm(&mut self, reservation_id: String) -> Result<(), Error> {
        if self.stage != Stage::Contact {
            return Err(invalid_state_error());
        }

        self.stage = Stage::Confirmed;
        self.reservation_id = Some(reservation_id);
        Ok(())
    }
}

#[cfg(test)]
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

#[cfg(test)]
fn booking_at_contact() -> Booking {
    use crate::entities::{Address, DraftPatch, TripType};
    use chrono::{NaiveDate, NaiveTime};

    let mut booking = Booking::new(Uuid::new_v4());

    booking.draft.apply(DraftPatch {
        origin: Some(Address {
            text: "12 rue des Lilas".into(),
            ..Address::default()
        }),
        destination: Some(Address {
            text: "Gare centrale".into(),
            ..Address::default()
        }),
        travel_date: NaiveDate::from_ymd_opt(2025, 3, 14),
        travel_time: NaiveTime::from_hms_opt(14, 0, 0),
        trip_type: Some(TripType::OneWay),
        ..DraftPatch::default()
    });

    booking.advance(today()).unwrap();
    booking.advance(today()).unwrap();
    booking.advance(today()).unwrap();
    booking.advance(today()).unwrap();

    assert_eq!(booking.stage, Stage::Contact);
    booking
}

#[test]
fn advance_blocks_on_empty_addresses() {
    let mut booking = Booking::new(Uuid::new_v4());

    let err = booking.advance(today()).unwrap_err();

    assert_eq!(err.code, 102);
    let fields = err.fields.unwrap();
    assert!(fields.contains_key("origin"));
    assert!(fields.contains_key("destination"));
    assert_eq!(booking.stage, Stage::Addresses);
}

#[test]
fn advance_walks_the_happy_path() {
    let booking = booking_at_contact();

    assert_eq!(booking.stage.number(), 5);
}

#[test]
fn back_is_unavailable_at_the_edges() {
    let mut booking = Booking::new(Uuid::new_v4());
    assert!(booking.back().is_err());

    let mut booking = booking_at_contact();
    booking.confirm("RES-1".into()).unwrap();
    assert!(booking.back().is_err());
}

#[test]
fn back_steps_through_completed_stages() {
    let mut booking = booking_at_contact();

    assert_eq!(booking.back().unwrap(), Stage::Estimate);
    assert_eq!(booking.back().unwrap(), Stage::Options);
    assert_eq!(booking.back().unwrap(), Stage::Schedule);
    assert_eq!(booking.back().unwrap(), Stage::Addresses);
}

#[test]
fn go_to_only_jumps_backward() {
    let mut booking = booking_at_contact();

    // forward jumps are no-ops
    assert_eq!(booking.go_to(Stage::Confirmed), Stage::Contact);
    assert_eq!(booking.go_to(Stage::Contact), Stage::Contact);

    assert_eq!(booking.go_to(Stage::Addresses), Stage::Addresses);

    // and from there nothing later is reachable by jumping
    assert_eq!(booking.go_to(Stage::Options), Stage::Addresses);
}

#[test]
fn leaving_the_estimate_stage_invalidates_in_flight_lookups() {
    let mut booking = booking_at_contact();

    booking.back().unwrap();
    assert_eq!(booking.stage, Stage::Estimate);
    let seq = booking.estimate_seq;

    booking.back().unwrap();

    let applied = booking.apply_estimate(
        seq,
        Estimate {
            distance_km: 10.0,
            duration_text: None,
            price_low: 13.02,
            price_high: 17.22,
            price: 15.12,
            estimated: false,
            degraded: false,
        },
    );

    assert!(!applied);
    assert!(booking.estimate.is_none());
    assert!(booking.draft.price_estimate.is_none());
}

#[test]
fn fresh_estimates_apply_and_fill_the_draft() {
    let mut booking = booking_at_contact();

    booking.back().unwrap();
    let seq = booking.estimate_seq;

    let applied = booking.apply_estimate(
        seq,
        Estimate {
            distance_km: 12.5,
            duration_text: Some("18 min".into()),
            price_low: 15.52,
            price_high: 20.77,
            price: 18.145,
            estimated: false,
            degraded: false,
        },
    );

    assert!(applied);
    assert_eq!(booking.draft.distance_km, Some(12.5));
    assert_eq!(booking.draft.price_estimate, Some(18.145));
}

#[test]
fn confirm_requires_the_contact_stage() {
    let mut booking = Booking::new(Uuid::new_v4());
    assert!(booking.confirm("RES-1".into()).is_err());

    let mut booking = booking_at_contact();
    booking.confirm("RES-42".into()).unwrap();

    assert_eq!(booking.stage, Stage::Confirmed);
    assert_eq!(booking.reservation_id.as_deref(), Some("RES-42"));

    // terminal: no further advance
    assert!(booking.advance(today()).is_err());
}

#[test]
fn stage_numbers_round_trip() {
    for n in 1..=6 {
        assert_eq!(Stage::from_number(n).unwrap().number(), n);
    }
    assert!(Stage::from_number(0).is_none());
    assert!(Stage::from_number(7).is_none());
}
