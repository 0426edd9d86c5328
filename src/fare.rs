use std::collections::HashSet;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

// Jours fériés observed by the tariff table. Night rates apply for the whole day.
const HOLIDAYS: &[&str] = &[
    "2024-01-01",
    "2024-04-01",
    "2024-05-01",
    "2024-05-08",
    "2024-05-09",
    "2024-05-20",
    "2024-07-14",
    "2024-08-15",
    "2024-11-01",
    "2024-11-11",
    "2024-12-25",
    "2025-01-01",
    "2025-04-21",
    "2025-05-01",
    "2025-05-08",
    "2025-05-29",
    "2025-06-09",
    "2025-07-14",
    "2025-08-15",
    "2025-11-01",
    "2025-11-11",
    "2025-12-25",
    "2026-01-01",
    "2026-04-06",
    "2026-05-01",
    "2026-05-08",
    "2026-05-14",
    "2026-05-25",
    "2026-07-14",
    "2026-08-15",
    "2026-11-01",
    "2026-11-11",
    "2026-12-25",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffClass {
    A,
    B,
    C,
    D,
}

impl TariffClass {
    pub fn is_night(&self) -> bool {
        matches!(self, Self::B | Self::D)
    }

    pub fn is_empty_return(&self) -> bool {
        matches!(self, Self::C | Self::D)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "Tarif A : course de jour, retour en charge",
            Self::B => "Tarif B : course de nuit, dimanche ou jour férié, retour en charge",
            Self::C => "Tarif C : course de jour, retour à vide",
            Self::D => "Tarif D : course de nuit, dimanche ou jour férié, retour à vide",
        }
    }
}

/// Regulated tariff table, built once at startup and handed to the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FareSchedule {
    pub base_fee: f64,
    pub rate_a: f64,
    pub rate_b: f64,
    pub rate_c: f64,
    pub rate_d: f64,
    pub minimum_fare: f64,
    pub waiting_hour_rate: f64,
    pub extra_passenger_from: u32,
    pub extra_passenger_unit: f64,
    pub luggage_unit: f64,
    pub animal_unit: f64,
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    holidays: HashSet<String>,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            base_fee: 3.02,
            rate_a: 1.00,
            rate_b: 1.42,
            rate_c: 2.00,
            rate_d: 2.84,
            minimum_fare: 8.00,
            waiting_hour_rate: 30.00,
            extra_passenger_from: 5,
            extra_passenger_unit: 4.00,
            luggage_unit: 2.00,
            animal_unit: 2.00,
            day_start_hour: 7,
            day_end_hour: 19,
            holidays: HOLIDAYS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripFacts {
    pub distance_km: f64,
    pub at: NaiveDateTime,
    pub passengers: u32,
    pub luggage: u32,
    pub animals: u32,
    pub empty_return: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub tariff: TariffClass,
    pub base_fee: f64,
    pub rate_per_km: f64,
    pub distance_km: f64,
    pub distance_amount: f64,
    pub passenger_surcharge: f64,
    pub luggage_surcharge: f64,
    pub animal_surcharge: f64,
    pub surcharge_total: f64,
    pub subtotal: f64,
    pub total: f64,
    pub minimum_applied: bool,
    pub details: Vec<String>,
}

/// Heuristic bounds for a trip whose composition is not known yet: the low end
/// is a lone passenger on a charged return, the high end two bags on an empty
/// return. Not a true min/max over every surcharge combination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl FareSchedule {
    pub fn rate(&self, tariff: TariffClass) -> f64 {
        match tariff {
            TariffClass::A => self.rate_a,
            TariffClass::B => self.rate_b,
            TariffClass::C => self.rate_c,
            TariffClass::D => self.rate_d,
        }
    }

    pub fn is_holiday(&self, at: NaiveDateTime) -> bool {
        self.holidays
            .contains(&at.date().format("%Y-%m-%d").to_string())
    }

    // Night rates apply outside the day window, all Sunday, and on holidays.
    pub fn is_night(&self, at: NaiveDateTime) -> bool {
        let hour = at.hour();

        hour >= self.day_end_hour
            || hour < self.day_start_hour
            || at.weekday() == Weekday::Sun
            || self.is_holiday(at)
    }

    pub fn select_tariff(&self, at: NaiveDateTime, empty_return: bool) -> TariffClass {
        match (self.is_night(at), empty_return) {
            (false, false) => TariffClass::A,
            (true, false) => TariffClass::B,
            (false, true) => TariffClass::C,
            (true, true) => TariffClass::D,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn compute(&self, trip: &TripFacts) -> FareBreakdown {
        let tariff = self.select_tariff(trip.at, trip.empty_return);
        let rate = self.rate(tariff);
        let distance_amount = trip.distance_km * rate;

        let billable_passengers = trip.passengers.saturating_sub(self.extra_passenger_from - 1);
        let passenger_surcharge = billable_passengers as f64 * self.extra_passenger_unit;
        let luggage_surcharge = trip.luggage as f64 * self.luggage_unit;
        let animal_surcharge = trip.animals as f64 * self.animal_unit;
        let surcharge_total = passenger_surcharge + luggage_surcharge + animal_surcharge;

        let subtotal = self.base_fee + distance_amount + surcharge_total;
        let minimum_applied = subtotal < self.minimum_fare;
        let total = if minimum_applied {
            self.minimum_fare
        } else {
            subtotal
        };

        let mut details = vec![
            tariff.label().to_string(),
            format!("Prise en charge : {:.2} €", self.base_fee),
        ];

        if trip.distance_km > 0.0 {
            details.push(format!(
                "Distance : {:.1} km x {:.2} €/km = {:.2} €",
                trip.distance_km, rate, distance_amount
            ));
        }

        if passenger_surcharge > 0.0 {
            details.push(format!(
                "Supplément passagers ({} x {:.2} €) = {:.2} €",
                billable_passengers, self.extra_passenger_unit, passenger_surcharge
            ));
        }

        if luggage_surcharge > 0.0 {
            details.push(format!(
                "Supplément bagages ({} x {:.2} €) = {:.2} €",
                trip.luggage, self.luggage_unit, luggage_surcharge
            ));
        }

        if animal_surcharge > 0.0 {
            details.push(format!(
                "Supplément animaux ({} x {:.2} €) = {:.2} €",
                trip.animals, self.animal_unit, animal_surcharge
            ));
        }

        if minimum_applied {
            details.push(format!("Course minimum : {:.2} €", self.minimum_fare));
        }

        FareBreakdown {
            tariff,
            base_fee: self.base_fee,
            rate_per_km: rate,
            distance_km: trip.distance_km,
            distance_amount,
            passenger_surcharge,
            luggage_surcharge,
            animal_surcharge,
            surcharge_total,
            subtotal,
            total,
            minimum_applied,
            details,
        }
    }

    pub fn estimate_range(&self, distance_km: f64, at: NaiveDateTime) -> PriceRange {
        let min = self.compute(&TripFacts {
            distance_km,
            at,
            passengers: 1,
            luggage: 0,
            animals: 0,
            empty_return: false,
        });

        let max = self.compute(&TripFacts {
            distance_km,
            at,
            passengers: 1,
            luggage: 2,
            animals: 0,
            empty_return: true,
        });

        PriceRange {
            min: min.total,
            max: max.total,
        }
    }
}

#[cfg(test)]
fn dt(y: i32, m: u32, d: u32, hour: u32, min: u32) -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

#[cfg(test)]
fn trip(distance_km: f64, at: NaiveDateTime) -> TripFacts {
    TripFacts {
        distance_km,
        at,
        passengers: 1,
        luggage: 0,
        animals: 0,
        empty_return: false,
    }
}

#[test]
fn night_boundaries() {
    let schedule = FareSchedule::default();

    // 2025-03-10 is a regular Monday
    assert!(schedule.is_night(dt(2025, 3, 10, 6, 59)));
    assert!(!schedule.is_night(dt(2025, 3, 10, 7, 0)));
    assert!(!schedule.is_night(dt(2025, 3, 10, 18, 59)));
    assert!(schedule.is_night(dt(2025, 3, 10, 19, 0)));
    assert!(schedule.is_night(dt(2025, 3, 10, 23, 0)));
}

#[test]
fn sunday_is_always_night() {
    let schedule = FareSchedule::default();

    // 2025-03-09 is a Sunday
    assert!(schedule.is_night(dt(2025, 3, 9, 10, 0)));
    assert!(schedule.is_night(dt(2025, 3, 9, 14, 30)));
    assert!(schedule.is_night(dt(2025, 3, 9, 22, 0)));
}

#[test]
fn holiday_is_night_even_at_day_hours() {
    let schedule = FareSchedule::default();

    // 2025-07-14 falls on a Monday
    assert!(schedule.is_holiday(dt(2025, 7, 14, 10, 0)));
    assert!(schedule.is_night(dt(2025, 7, 14, 10, 0)));
    assert!(schedule.is_night(dt(2024, 12, 25, 12, 0)));
    assert!(schedule.is_night(dt(2026, 1, 1, 8, 0)));
}

#[test]
fn tariff_table_is_total() {
    let schedule = FareSchedule::default();

    let day = dt(2025, 3, 10, 14, 0);
    let night = dt(2025, 3, 10, 21, 0);

    assert_eq!(schedule.select_tariff(day, false), TariffClass::A);
    assert_eq!(schedule.select_tariff(night, false), TariffClass::B);
    assert_eq!(schedule.select_tariff(day, true), TariffClass::C);
    assert_eq!(schedule.select_tariff(night, true), TariffClass::D);

    // repeated calls with identical inputs agree
    assert_eq!(
        schedule.select_tariff(day, false),
        schedule.select_tariff(day, false)
    );
}

#[test]
fn daytime_charged_return_fare() {
    let schedule = FareSchedule::default();

    // Monday 14:00, 10 km, no surcharges
    let fare = schedule.compute(&trip(10.0, dt(2025, 3, 10, 14, 0)));

    assert_eq!(fare.tariff, TariffClass::A);
    assert!((fare.distance_amount - 10.00).abs() < 1e-9);
    assert!((fare.subtotal - 13.02).abs() < 1e-9);
    assert!((fare.total - 13.02).abs() < 1e-9);
    assert!(!fare.minimum_applied);
}

#[test]
fn short_sunday_trip_hits_minimum_fare() {
    let schedule = FareSchedule::default();

    // Sunday 10:00, 2 km
    let fare = schedule.compute(&trip(2.0, dt(2025, 3, 9, 10, 0)));

    assert_eq!(fare.tariff, TariffClass::B);
    assert!((fare.distance_amount - 2.84).abs() < 1e-9);
    assert!((fare.subtotal - 5.86).abs() < 1e-9);
    assert!((fare.total - 8.00).abs() < 1e-9);
    assert!(fare.minimum_applied);
    assert!(fare
        .details
        .iter()
        .any(|line| line.starts_with("Course minimum")));
}

#[test]
fn loaded_night_empty_return_fare() {
    let schedule = FareSchedule::default();

    // Tuesday 21:00, 15 km, 6 passengers, 3 bags, 1 animal, empty return
    let fare = schedule.compute(&TripFacts {
        distance_km: 15.0,
        at: dt(2025, 3, 11, 21, 0),
        passengers: 6,
        luggage: 3,
        animals: 1,
        empty_return: true,
    });

    assert_eq!(fare.tariff, TariffClass::D);
    assert!((fare.distance_amount - 42.60).abs() < 1e-9);
    assert!((fare.passenger_surcharge - 8.00).abs() < 1e-9);
    assert!((fare.luggage_surcharge - 6.00).abs() < 1e-9);
    assert!((fare.animal_surcharge - 2.00).abs() < 1e-9);
    assert!((fare.subtotal - 61.62).abs() < 1e-9);
    assert!((fare.total - 61.62).abs() < 1e-9);
    assert!(!fare.minimum_applied);
}

#[test]
fn total_never_falls_below_minimum_fare() {
    let schedule = FareSchedule::default();

    for tenth_km in 0..60 {
        let fare = schedule.compute(&trip(tenth_km as f64 / 10.0, dt(2025, 3, 10, 14, 0)));

        assert!(fare.total >= schedule.minimum_fare);
        assert_eq!(fare.minimum_applied, fare.subtotal < schedule.minimum_fare);
    }
}

#[test]
fn surcharges_are_monotonic() {
    let schedule = FareSchedule::default();
    let at = dt(2025, 3, 10, 14, 0);

    let mut previous = 0.0;
    for luggage in 0..=10 {
        let fare = schedule.compute(&TripFacts {
            distance_km: 5.0,
            at,
            passengers: 1,
            luggage,
            animals: 0,
            empty_return: false,
        });

        assert!(fare.total >= previous);
        previous = fare.total;
    }

    let mut previous = 0.0;
    for animals in 0..=3 {
        let fare = schedule.compute(&TripFacts {
            distance_km: 5.0,
            at,
            passengers: 1,
            luggage: 0,
            animals,
            empty_return: false,
        });

        assert!(fare.total >= previous);
        previous = fare.total;
    }
}

#[test]
fn passenger_surcharge_starts_at_the_fifth_seat() {
    let schedule = FareSchedule::default();
    let at = dt(2025, 3, 10, 14, 0);

    for passengers in 1..=4 {
        let fare = schedule.compute(&TripFacts {
            distance_km: 5.0,
            at,
            passengers,
            luggage: 0,
            animals: 0,
            empty_return: false,
        });

        assert!((fare.passenger_surcharge - 0.0).abs() < 1e-9);
    }

    let five = schedule.compute(&TripFacts {
        distance_km: 5.0,
        at,
        passengers: 5,
        luggage: 0,
        animals: 0,
        empty_return: false,
    });
    assert!((five.passenger_surcharge - 4.00).abs() < 1e-9);

    let seven = schedule.compute(&TripFacts {
        distance_km: 5.0,
        at,
        passengers: 7,
        luggage: 0,
        animals: 0,
        empty_return: false,
    });
    assert!((seven.passenger_surcharge - 12.00).abs() < 1e-9);
}

#[test]
fn details_are_bounded_and_ordered() {
    let schedule = FareSchedule::default();

    let bare = schedule.compute(&trip(0.0, dt(2025, 3, 10, 14, 0)));
    assert_eq!(bare.details.len(), 3);
    assert_eq!(bare.details[0], TariffClass::A.label());
    assert!(bare.details[1].starts_with("Prise en charge"));

    let loaded = schedule.compute(&TripFacts {
        distance_km: 15.0,
        at: dt(2025, 3, 11, 21, 0),
        passengers: 6,
        luggage: 3,
        animals: 1,
        empty_return: true,
    });
    assert_eq!(loaded.details.len(), 6);

    for fare in [&bare, &loaded] {
        assert!(fare.details.len() >= 2);
        assert!(fare.details.len() <= 6);
    }
}

#[test]
fn estimate_range_brackets_the_trip() {
    let schedule = FareSchedule::default();
    let at = dt(2025, 3, 10, 14, 0);

    let range = schedule.estimate_range(10.0, at);

    // day charged return vs empty return with two bags
    assert!((range.min - 13.02).abs() < 1e-9);
    assert!((range.max - (3.02 + 20.00 + 4.00)).abs() < 1e-9);
    assert!(range.min <= range.max);
}

#[test]
fn compute_is_deterministic() {
    let schedule = FareSchedule::default();
    let facts = TripFacts {
        distance_km: 12.3,
        at: dt(2025, 3, 11, 21, 0),
        passengers: 5,
        luggage: 2,
        animals: 1,
        empty_return: true,
    };

    let first = schedule.compute(&facts);
    let second = schedule.compute(&facts);

    assert_eq!(first.total, second.total);
    assert_eq!(first.details, second.details);
}
