use async_trait::async_trait;
use geo::{Distance, Haversine};
use geo_types::Point;
use serde::{Deserialize, Serialize};
use std::env;

use crate::entities::Address;
use crate::error::{invalid_input_error, upstream_error, Error};
use crate::external::{DistanceService, RouteEstimate, RouteQuery};

// straight-line distances understate road distances
const ROAD_FACTOR: f64 = 1.3;
const AVERAGE_SPEED_KMH: f64 = 40.0;
const IN_CITY_FALLBACK_KM: f64 = 10.0;

// rough one-way distances for destinations the booking form sees most often
const KNOWN_PLACES: &[(&str, f64)] = &[
    ("aéroport", 35.0),
    ("aeroport", 35.0),
    ("airport", 35.0),
    ("gare", 12.0),
    ("centre hospitalier", 8.0),
    ("clinique", 8.0),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub place_id: String,
    pub description: String,
}

pub type PlaceSuggestions = Vec<PlaceSuggestion>;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Place {
    place_id: String,
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    result: Option<T>,
    predictions: Option<T>,
}

#[derive(Clone, Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    rows: Vec<MatrixRow>,
}

#[derive(Clone, Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Clone, Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<ValueText>,
    duration: Option<ValueText>,
}

#[derive(Clone, Debug, Deserialize)]
struct ValueText {
    value: f64,
    text: String,
}

#[derive(Debug, Default)]
pub struct GoogleMaps;

impl GoogleMaps {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DistanceService for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn route_distance(&self, query: &RouteQuery) -> Result<RouteEstimate, Error> {
        match distance_matrix(query).await {
            Ok(estimate) => Ok(estimate),
            Err(err) => {
                tracing::warn!(
                    code = err.code,
                    "distance matrix lookup failed, falling back to heuristic"
                );
                Ok(heuristic_estimate(query))
            }
        }
    }
}

fn waypoint(address: &Address) -> String {
    match (address.lat, address.lng) {
        (Some(lat), Some(lng)) => format!("{},{}", lat, lng),
        _ => address.text.clone(),
    }
}

#[tracing::instrument]
async fn distance_matrix(query: &RouteQuery) -> Result<RouteEstimate, Error> {
    let api_base = env::var("GOOGLE_MAPS_API_BASE")?;
    let url = format!("https://{}/maps/api/distancematrix/json", api_base);
    let key = env::var("GOOGLE_MAPS_API_KEY")?;

    let res = reqwest::Client::new()
        .get(url)
        .query(&[("key", key)])
        .query(&[("origins", waypoint(&query.origin))])
        .query(&[("destinations", waypoint(&query.destination))])
        .send()
        .await?;

    let status_code = res.status().as_u16();

    if status_code >= 400 && status_code < 500 {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    let data: MatrixResponse = res.json().await?;

    if data.status != "OK" {
        return Err(upstream_error());
    }

    let element = data
        .rows
        .first()
        .and_then(|row| row.elements.first())
        .ok_or_else(upstream_error)?;

    if element.status != "OK" {
        return Err(upstream_error());
    }

    let distance = element.distance.as_ref().ok_or_else(upstream_error)?;
    let duration = element.duration.as_ref().ok_or_else(upstream_error)?;

    Ok(RouteEstimate {
        distance_km: distance.value / 1000.0,
        duration_minutes: duration.value / 60.0,
        duration_text: duration.text.clone(),
        estimated: false,
    })
}

/// Used when the mapping provider is unreachable: scaled straight-line
/// distance when both endpoints carry coordinates, otherwise a lookup over
/// recognized place names, otherwise a fixed in-city estimate.
fn heuristic_estimate(query: &RouteQuery) -> RouteEstimate {
    let distance_km = match coordinates(&query.origin).zip(coordinates(&query.destination)) {
        Some((from, to)) => Haversine.distance(from, to) / 1000.0 * ROAD_FACTOR,
        None => known_place_distance(&query.origin)
            .or_else(|| known_place_distance(&query.destination))
            .unwrap_or(IN_CITY_FALLBACK_KM),
    };

    let duration_minutes = distance_km / AVERAGE_SPEED_KMH * 60.0;

    RouteEstimate {
        distance_km,
        duration_minutes,
        duration_text: format!("{} min environ", duration_minutes.round() as i64),
        estimated: true,
    }
}

fn coordinates(address: &Address) -> Option<Point<f64>> {
    match (address.lat, address.lng) {
        (Some(lat), Some(lng)) => Some(Point::new(lng, lat)),
        _ => None,
    }
}

fn known_place_distance(address: &Address) -> Option<f64> {
    let text = address.text.to_lowercase();

    KNOWN_PLACES
        .iter()
        .find(|(name, _)| text.contains(name))
        .map(|(_, km)| *km)
}

#[tracing::instrument]
pub async fn find_place_suggestions(
    input: String,
    session_token: String,
) -> Result<Vec<PlaceSuggestion>, Error> {
    let api_base = env::var("GOOGLE_MAPS_API_BASE")?;
    let url = format!("https://{}/maps/api/place/autocomplete/json", api_base);
    let key = env::var("GOOGLE_MAPS_API_KEY")?;

    let res = reqwest::Client::new()
        .get(url)
        .query(&[("key", key)])
        .query(&[("input", input)])
        .query(&[("sessiontoken", session_token)])
        .send()
        .await?;

    let status_code = res.status().as_u16();

    if status_code >= 400 && status_code < 500 {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    let data: Response<PlaceSuggestions> = res.json().await?;

    if !(data.status == "OK" || data.status == "ZERO_RESULTS") {
        return Err(upstream_error());
    }

    Ok(data.predictions.unwrap_or_default())
}

#[tracing::instrument]
pub async fn find_place(id: String, session_token: String) -> Result<Address, Error> {
    let api_base = env::var("GOOGLE_MAPS_API_BASE")?;
    let url = format!("https://{}/maps/api/place/details/json", api_base);
    let key = env::var("GOOGLE_MAPS_API_KEY")?;

    let res = reqwest::Client::new()
        .get(url)
        .query(&[("key", key)])
        .query(&[("sessiontoken", session_token)])
        .query(&[("place_id", id)])
        .send()
        .await?;

    let status_code = res.status().as_u16();

    if status_code >= 400 && status_code < 500 {
        return Err(invalid_input_error());
    } else if status_code != 200 {
        return Err(upstream_error());
    }

    let data: Response<Place> = res.json().await?;

    if data.status != "OK" {
        return Err(upstream_error());
    }

    let place = data.result.ok_or_else(upstream_error)?;

    Ok(Address {
        text: place.formatted_address,
        lat: Some(place.geometry.location.lat),
        lng: Some(place.geometry.location.lng),
        place_id: Some(place.place_id),
    })
}

#[test]
fn heuristic_prefers_coordinates() {
    use crate::entities::Address;

    // Nantes to its airport, roughly 8 km apart as the crow flies
    let query = RouteQuery {
        origin: Address {
            text: "Centre".into(),
            lat: Some(47.2184),
            lng: Some(-1.5536),
            place_id: None,
        },
        destination: Address {
            text: "Aéroport".into(),
            lat: Some(47.1532),
            lng: Some(-1.6108),
            place_id: None,
        },
    };

    let estimate = heuristic_estimate(&query);

    assert!(estimate.estimated);
    assert!(estimate.distance_km > 8.0 && estimate.distance_km < 15.0);
}

#[test]
fn heuristic_recognizes_place_names() {
    use crate::entities::Address;

    let query = RouteQuery {
        origin: Address {
            text: "12 rue des Lilas".into(),
            ..Address::default()
        },
        destination: Address {
            text: "Aéroport Nantes Atlantique".into(),
            ..Address::default()
        },
    };

    let estimate = heuristic_estimate(&query);
    assert_eq!(estimate.distance_km, 35.0);

    let query = RouteQuery {
        origin: Address {
            text: "12 rue des Lilas".into(),
            ..Address::default()
        },
        destination: Address {
            text: "Quartier sans repère".into(),
            ..Address::default()
        },
    };

    let estimate = heuristic_estimate(&query);
    assert_eq!(estimate.distance_km, IN_CITY_FALLBACK_KM);
}
