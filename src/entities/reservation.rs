use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;

pub const PASSENGERS_MIN: u32 = 1;
pub const PASSENGERS_MAX: u32 = 7;
pub const LUGGAGE_MAX: u32 = 10;
pub const ANIMALS_MAX: u32 = 3;

const PHONE_MIN_LEN: usize = 10;
const PHONE_MAX_LEN: usize = 15;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Address {
    pub text: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub place_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

impl TripType {
    // the vehicle comes back without a paying passenger on a one-way trip
    pub fn empty_return(&self) -> bool {
        matches!(self, Self::OneWay)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub origin: Address,
    pub destination: Address,
    pub travel_date: Option<NaiveDate>,
    pub travel_time: Option<NaiveTime>,
    pub trip_type: Option<TripType>,
    pub passengers: u32,
    pub luggage: u32,
    pub animals: u32,
    pub child_seat: bool,
    pub wheelchair: bool,
    pub distance_km: Option<f64>,
    pub price_estimate: Option<f64>,
    pub last_name: String,
    pub first_name: String,
    pub phone: String,
    pub email: String,
    pub comment: Option<String>,
}

impl Default for ReservationDraft {
    fn default() -> Self {
        Self {
            origin: Address::default(),
            destination: Address::default(),
            travel_date: None,
            travel_time: None,
            trip_type: None,
            passengers: PASSENGERS_MIN,
            luggage: 0,
            animals: 0,
            child_seat: false,
            wheelchair: false,
            distance_km: None,
            price_estimate: None,
            last_name: String::new(),
            first_name: String::new(),
            phone: String::new(),
            email: String::new(),
            comment: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftPatch {
    pub origin: Option<Address>,
    pub destination: Option<Address>,
    pub travel_date: Option<NaiveDate>,
    pub travel_time: Option<NaiveTime>,
    pub trip_type: Option<TripType>,
    pub passengers: Option<u32>,
    pub luggage: Option<u32>,
    pub animals: Option<u32>,
    pub child_seat: Option<bool>,
    pub wheelchair: Option<bool>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub comment: Option<String>,
}

impl ReservationDraft {
    /// Merges a patch into the draft. Absent fields are left untouched, so a
    /// stage only ever overwrites what it collected. Counters are clamped to
    /// their bounds rather than rejected.
    pub fn apply(&mut self, patch: DraftPatch) {
        if let Some(origin) = patch.origin {
            self.origin = origin;
        }
        if let Some(destination) = patch.destination {
            self.destination = destination;
        }
        if let Some(travel_date) = patch.travel_date {
            self.travel_date = Some(travel_date);
        }
        if let Some(travel_time) = patch.travel_time {
            self.travel_time = Some(travel_time);
        }
        if let Some(trip_type) = patch.trip_type {
            self.trip_type = Some(trip_type);
        }
        if let Some(passengers) = patch.passengers {
            self.passengers = passengers.clamp(PASSENGERS_MIN, PASSENGERS_MAX);
        }
        if let Some(luggage) = patch.luggage {
            self.luggage = luggage.min(LUGGAGE_MAX);
        }
        if let Some(animals) = patch.animals {
            self.animals = animals.min(ANIMALS_MAX);
        }
        if let Some(child_seat) = patch.child_seat {
            self.child_seat = child_seat;
        }
        if let Some(wheelchair) = patch.wheelchair {
            self.wheelchair = wheelchair;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(comment) = patch.comment {
            self.comment = Some(comment);
        }
    }

    pub fn empty_return(&self) -> bool {
        // an unset trip type is billed as one-way
        self.trip_type.map(|t| t.empty_return()).unwrap_or(true)
    }

    pub fn validate_addresses(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.origin.text.trim().is_empty() {
            errors.insert(
                "origin".into(),
                "Veuillez indiquer une adresse de départ".into(),
            );
        }
        if self.destination.text.trim().is_empty() {
            errors.insert(
                "destination".into(),
                "Veuillez indiquer une adresse d'arrivée".into(),
            );
        }

        errors
    }

    pub fn validate_schedule(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();

        match self.travel_date {
            None => {
                errors.insert("travel_date".into(), "Veuillez choisir une date".into());
            }
            Some(date) if date < today => {
                errors.insert(
                    "travel_date".into(),
                    "La date choisie est déjà passée".into(),
                );
            }
            Some(_) => {}
        }

        if self.travel_time.is_none() {
            errors.insert("travel_time".into(), "Veuillez choisir un horaire".into());
        }

        errors
    }

    pub fn validate_contact(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.last_name.trim().is_empty() {
            errors.insert("last_name".into(), "Veuillez indiquer votre nom".into());
        }
        if self.first_name.trim().is_empty() {
            errors.insert("first_name".into(), "Veuillez indiquer votre prénom".into());
        }
        if !is_valid_phone(self.phone.trim()) {
            errors.insert(
                "phone".into(),
                "Veuillez indiquer un numéro de téléphone valide".into(),
            );
        }
        if !is_valid_email(self.email.trim()) {
            errors.insert(
                "email".into(),
                "Veuillez indiquer une adresse e-mail valide".into(),
            );
        }

        errors
    }
}

// 10 to 15 characters, digits with an optional leading "+" and spacing
fn is_valid_phone(phone: &str) -> bool {
    (PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&phone.chars().count())
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || c == '+' || c.is_whitespace())
}

// loose local@domain.tld shape, nothing close to full RFC 5322
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(|c| c.is_whitespace()) {
        return false;
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !name.ends_with('.') && !tld.is_empty(),
        None => false,
    }
}

#[test]
fn patch_accumulates_without_dropping() {
    let mut draft = ReservationDraft::default();

    draft.apply(DraftPatch {
        origin: Some(Address {
            text: "12 rue des Lilas".into(),
            ..Address::default()
        }),
        destination: Some(Address {
            text: "Gare centrale".into(),
            ..Address::default()
        }),
        ..DraftPatch::default()
    });

    draft.apply(DraftPatch {
        passengers: Some(3),
        ..DraftPatch::default()
    });

    assert_eq!(draft.origin.text, "12 rue des Lilas");
    assert_eq!(draft.destination.text, "Gare centrale");
    assert_eq!(draft.passengers, 3);
}

#[test]
fn counters_clamp_silently() {
    let mut draft = ReservationDraft::default();

    draft.apply(DraftPatch {
        passengers: Some(12),
        luggage: Some(25),
        animals: Some(9),
        ..DraftPatch::default()
    });

    assert_eq!(draft.passengers, PASSENGERS_MAX);
    assert_eq!(draft.luggage, LUGGAGE_MAX);
    assert_eq!(draft.animals, ANIMALS_MAX);

    draft.apply(DraftPatch {
        passengers: Some(0),
        ..DraftPatch::default()
    });

    assert_eq!(draft.passengers, PASSENGERS_MIN);
}

#[test]
fn address_validation_keys_are_independent() {
    let mut draft = ReservationDraft::default();

    let errors = draft.validate_addresses();
    assert!(errors.contains_key("origin"));
    assert!(errors.contains_key("destination"));

    draft.apply(DraftPatch {
        origin: Some(Address {
            text: "12 rue des Lilas".into(),
            ..Address::default()
        }),
        ..DraftPatch::default()
    });

    let errors = draft.validate_addresses();
    assert!(!errors.contains_key("origin"));
    assert!(errors.contains_key("destination"));
}

#[test]
fn whitespace_only_address_is_rejected() {
    let mut draft = ReservationDraft::default();

    draft.apply(DraftPatch {
        origin: Some(Address {
            text: "   ".into(),
            ..Address::default()
        }),
        ..DraftPatch::default()
    });

    assert!(draft.validate_addresses().contains_key("origin"));
}

#[test]
fn past_travel_dates_are_rejected() {
    use chrono::NaiveDate;

    let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let mut draft = ReservationDraft::default();

    let errors = draft.validate_schedule(today);
    assert!(errors.contains_key("travel_date"));
    assert!(errors.contains_key("travel_time"));

    draft.apply(DraftPatch {
        travel_date: NaiveDate::from_ymd_opt(2025, 3, 9),
        travel_time: NaiveTime::from_hms_opt(14, 0, 0),
        ..DraftPatch::default()
    });

    let errors = draft.validate_schedule(today);
    assert!(errors.contains_key("travel_date"));
    assert!(!errors.contains_key("travel_time"));

    draft.apply(DraftPatch {
        travel_date: NaiveDate::from_ymd_opt(2025, 3, 10),
        ..DraftPatch::default()
    });

    assert!(draft.validate_schedule(today).is_empty());
}

#[test]
fn phone_validation_accepts_loose_formats() {
    assert!(is_valid_phone("0612345678"));
    assert!(is_valid_phone("+33 6 12 34 56"));
    assert!(!is_valid_phone("061234"));
    assert!(!is_valid_phone("06-12-34-56-78"));
    assert!(!is_valid_phone("0612345678901234"));
}

#[test]
fn email_validation_wants_a_domain_and_tld() {
    assert!(is_valid_email("marie@example.com"));
    assert!(is_valid_email("jean.dupont@mail.example.fr"));
    assert!(!is_valid_email("not-an-email"));
    assert!(!is_valid_email("marie@example"));
    assert!(!is_valid_email("@example.com"));
    assert!(!is_valid_email("marie dupont@example.com"));
}

#[test]
fn fixing_one_contact_field_clears_exactly_that_error() {
    let mut draft = ReservationDraft::default();

    draft.apply(DraftPatch {
        email: Some("not-an-email".into()),
        ..DraftPatch::default()
    });

    let errors = draft.validate_contact();
    assert!(errors.contains_key("email"));
    assert!(errors.contains_key("phone"));
    assert!(errors.contains_key("last_name"));
    assert!(errors.contains_key("first_name"));

    draft.apply(DraftPatch {
        email: Some("marie@example.com".into()),
        ..DraftPatch::default()
    });

    let errors = draft.validate_contact();
    assert!(!errors.contains_key("email"));
    assert!(errors.contains_key("phone"));
    assert!(errors.contains_key("last_name"));
    assert!(errors.contains_key("first_name"));
}
