//! Mapbox geocoding and optimized-trips clients.
//!
//! No deadline is applied here, callers bound every call. Transient transport and
//! server failures are retried with a linearly growing delay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use route_trace_lib::{coordinates::{coordinates, Coordinates}, stop::Stop};
use serde::{de::DeserializeOwned, Deserialize};
use tokio::time::sleep;

use super::{AddressResolver, OptimizeOptions, OptimizedRoute, Place, PlaceSearcher, RouteOptimizer, SearchKind};
use crate::{config::SessionConfig, error::AdapterError};

/// The optimized-trips API accepts at most this many coordinates.
pub const MAX_OPTIMIZE_WAYPOINTS: usize = 12;
const FORWARD_GEOCODE_LIMIT: &str = "8";
const POI_TYPES: &str = "poi";
const GENERAL_TYPES: &str = "place,address,region,district,postcode,locality,neighborhood";

#[derive(Debug, Clone)]
pub struct MapboxClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    language: String,
    country: String,
    geocode_retries: u32,
    geocode_retry_delay: Duration,
    optimize_retries: u32,
    optimize_retry_delay: Duration,
}

impl MapboxClient {
    pub fn new(config: &SessionConfig) -> Result<Self, AdapterError> {
        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| AdapterError::Transport(format!("Failed to build HTTP client: {err}")))?;

        if config.mapbox_token.is_none() {
            tracing::warn!("No Mapbox token configured, lookups will fall back");
        }

        Ok(Self {
            http,
            base_url: config.mapbox_base_url.clone(),
            token: config.mapbox_token.clone(),
            language: config.language.clone(),
            country: config.search_country.clone(),
            geocode_retries: config.geocode_retries,
            geocode_retry_delay: config.geocode_retry_delay,
            optimize_retries: config.optimize_retries,
            optimize_retry_delay: config.optimize_retry_delay,
        })
    }

    fn token(&self) -> Result<&str, AdapterError> {
        self.token.as_deref().ok_or(AdapterError::Unavailable)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AdapterError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| AdapterError::Malformed(format!("Invalid base url {}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| AdapterError::Malformed(format!("Base url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn reverse_geocode_url(&self, point: Coordinates) -> Result<Url, AdapterError> {
        let token = self.token()?;
        let mut url = self.endpoint(&["geocoding", "v5", "mapbox.places", &format!("{},{}.json", point.x(), point.y())])?;
        url.query_pairs_mut()
            .append_pair("access_token", token)
            .append_pair("language", &self.language)
            .append_pair("limit", "1");
        Ok(url)
    }

    pub fn forward_geocode_url(&self, query: &str, kind: SearchKind) -> Result<Url, AdapterError> {
        let token = self.token()?;
        let types = match kind {
            SearchKind::Poi => POI_TYPES,
            SearchKind::General => GENERAL_TYPES,
        };
        let mut url = self.endpoint(&["geocoding", "v5", "mapbox.places", &format!("{query}.json")])?;
        url.query_pairs_mut()
            .append_pair("access_token", token)
            .append_pair("country", &self.country)
            .append_pair("language", &self.language)
            .append_pair("limit", FORWARD_GEOCODE_LIMIT)
            .append_pair("types", types);
        Ok(url)
    }

    pub fn optimize_url(&self, stops: &[Stop], options: &OptimizeOptions) -> Result<Url, AdapterError> {
        let token = self.token()?;
        let waypoints = stops.iter()
            .map(|stop| format!("{},{}", stop.coordinates.x(), stop.coordinates.y()))
            .collect::<Vec<_>>()
            .join(";");

        let mut url = self.endpoint(&["optimized-trips", "v1", "mapbox", "driving", &waypoints])?;
        url.query_pairs_mut()
            .append_pair("access_token", token)
            .append_pair("source", options.source.as_str())
            .append_pair("destination", options.destination.as_str())
            .append_pair("roundtrip", if options.roundtrip { "true" } else { "false" });
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, retries: u32, delay: Duration) -> Result<T, AdapterError> {
        let mut attempt = 0;
        loop {
            match self.fetch(url.clone()).await {
                Ok(value) => return Ok(value),
                Err(err @ AdapterError::Transport(_)) if attempt < retries => {
                    attempt += 1;
                    tracing::warn!("Request to {} failed ({err}), retry {}/{}", url.path(), attempt, retries);
                    sleep(delay * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, AdapterError> {
        let response = self.http.get(url)
            .send()
            .await
            .map_err(|err| AdapterError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AdapterError::Unavailable);
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::Transport(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AdapterError::Malformed(format!("HTTP {status}")));
        }

        response.json::<T>()
            .await
            .map_err(|err| AdapterError::Malformed(err.without_url().to_string()))
    }
}

#[async_trait]
impl AddressResolver for MapboxClient {
    async fn resolve(&self, point: Coordinates) -> Result<String, AdapterError> {
        let url = self.reverse_geocode_url(point)?;
        let response: GeocodingResponse = self.get_json(url, self.geocode_retries, self.geocode_retry_delay).await?;
        response.features
            .into_iter()
            .next()
            .map(|feature| feature.place_name)
            .ok_or_else(|| AdapterError::Malformed("no features for coordinates".to_string()))
    }
}

#[async_trait]
impl PlaceSearcher for MapboxClient {
    async fn search_places(&self, query: &str, kind: SearchKind) -> Result<Vec<Place>, AdapterError> {
        let url = self.forward_geocode_url(query, kind)?;
        let response: GeocodingResponse = self.get_json(url, self.geocode_retries, self.geocode_retry_delay).await?;
        Ok(response.into_places())
    }
}

#[async_trait]
impl RouteOptimizer for MapboxClient {
    async fn optimize(&self, stops: &[Stop], options: &OptimizeOptions) -> Result<OptimizedRoute, AdapterError> {
        if stops.len() > MAX_OPTIMIZE_WAYPOINTS {
            return Err(AdapterError::Malformed(format!(
                "{} stops exceed the optimizer limit of {}", stops.len(), MAX_OPTIMIZE_WAYPOINTS
            )));
        }

        let url = self.optimize_url(stops, options)?;
        let response: OptimizationResponse = self.get_json(url, self.optimize_retries, self.optimize_retry_delay).await?;
        response.into_route(stops.len())
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    place_name: String,
    #[serde(default)]
    text: String,
    center: [f64; 2],
    #[serde(default)]
    place_type: Vec<String>,
}

impl GeocodingResponse {
    fn into_places(self) -> Vec<Place> {
        self.features.into_iter()
            .map(|feature| Place {
                id: feature.id,
                place_name: feature.place_name,
                text: feature.text,
                center: coordinates(feature.center[0], feature.center[1]),
                place_type: feature.place_type,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct OptimizationResponse {
    code: String,
    #[serde(default)]
    waypoints: Vec<Waypoint>,
    #[serde(default)]
    trips: Vec<Trip>,
}

/// Listed in input order, `waypoint_index` is the position within the trip.
#[derive(Debug, Deserialize)]
struct Waypoint {
    waypoint_index: usize,
}

#[derive(Debug, Deserialize)]
struct Trip {
    distance: Option<f64>,
    duration: Option<f64>,
}

impl OptimizationResponse {
    fn into_route(self, stop_count: usize) -> Result<OptimizedRoute, AdapterError> {
        if self.code != "Ok" {
            return Err(AdapterError::Malformed(format!("optimizer answered {}", self.code)));
        }
        let trip = self.trips.first()
            .ok_or_else(|| AdapterError::Malformed("no trip in response".to_string()))?;

        let positions: Vec<usize> = self.waypoints.iter().map(|waypoint| waypoint.waypoint_index).collect();
        Ok(OptimizedRoute {
            ordered_waypoint_indices: ordered_indices_from_positions(&positions, stop_count)?,
            distance_meters: trip.distance,
            duration_seconds: trip.duration,
        })
    }
}

/// Turns "input `i` is visited at `positions[i]`" into input indices in visiting order.
pub fn ordered_indices_from_positions(positions: &[usize], stop_count: usize) -> Result<Vec<usize>, AdapterError> {
    if positions.len() != stop_count {
        return Err(AdapterError::Malformed(format!("expected {} waypoints, got {}", stop_count, positions.len())));
    }

    let mut ordered = vec![None; stop_count];
    for (input, &position) in positions.iter().enumerate() {
        match ordered.get_mut(position) {
            Some(slot) if slot.is_none() => *slot = Some(input),
            _ => return Err(AdapterError::Malformed(format!("invalid waypoint position {position}"))),
        }
    }

    // Every slot is filled, n distinct positions below n.
    Ok(ordered.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use route_trace_lib::stop::StopId;

    use super::*;
    use crate::adapters::Endpoint;

    fn client(token: Option<&str>) -> MapboxClient {
        let config = SessionConfig {
            mapbox_token: token.map(str::to_string),
            ..SessionConfig::default()
        };
        MapboxClient::new(&config).unwrap()
    }

    #[test]
    fn positions_are_inverted() {
        assert_eq!(ordered_indices_from_positions(&[2, 0, 1], 3), Ok(vec![1, 2, 0]));
        assert_eq!(ordered_indices_from_positions(&[0, 1], 2), Ok(vec![0, 1]));
    }

    #[test]
    fn malformed_positions_are_rejected() {
        assert!(ordered_indices_from_positions(&[0, 0, 1], 3).is_err());
        assert!(ordered_indices_from_positions(&[0, 3, 1], 3).is_err());
        assert!(ordered_indices_from_positions(&[0, 1], 3).is_err());
    }

    #[test]
    fn optimization_response_parses() {
        let body = r#"{
            "code": "Ok",
            "waypoints": [
                {"waypoint_index": 0, "trips_index": 0, "location": [-46.63, -23.55], "name": "Rua A"},
                {"waypoint_index": 2, "trips_index": 0, "location": [-46.64, -23.56], "name": "Rua B"},
                {"waypoint_index": 1, "trips_index": 0, "location": [-46.65, -23.57], "name": "Rua C"}
            ],
            "trips": [{"distance": 5123.4, "duration": 812.0, "geometry": "abc"}]
        }"#;
        let response: OptimizationResponse = serde_json::from_str(body).unwrap();
        let route = response.into_route(3).unwrap();
        assert_eq!(route.ordered_waypoint_indices, vec![0, 2, 1]);
        assert_eq!(route.distance_meters, Some(5123.4));
        assert_eq!(route.duration_seconds, Some(812.0));
    }

    #[test]
    fn optimization_error_code_is_malformed() {
        let response: OptimizationResponse = serde_json::from_str(r#"{"code": "NoTrips", "message": "x"}"#).unwrap();
        assert!(matches!(response.into_route(2), Err(AdapterError::Malformed(_))));
    }

    #[test]
    fn geocoding_response_parses() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "id": "poi.123",
                "place_name": "Padaria Real, Rua Augusta 100, São Paulo",
                "text": "Padaria Real",
                "center": [-46.6512, -23.5523],
                "place_type": ["poi"]
            }]
        }"#;
        let places = serde_json::from_str::<GeocodingResponse>(body).unwrap().into_places();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].text, "Padaria Real");
        assert_eq!(places[0].center, coordinates(-46.6512, -23.5523));
    }

    #[test]
    fn urls_carry_parameters() {
        let client = client(Some("pk.test"));
        let url = client.reverse_geocode_url(coordinates(-46.63, -23.55)).unwrap();
        assert_eq!(url.path(), "/geocoding/v5/mapbox.places/-46.63,-23.55.json");
        assert!(url.query().unwrap().contains("access_token=pk.test"));
        assert!(url.query().unwrap().contains("language=pt"));

        let url = client.forward_geocode_url("Rua Augusta", SearchKind::Poi).unwrap();
        assert_eq!(url.path(), "/geocoding/v5/mapbox.places/Rua%20Augusta.json");
        assert!(url.query().unwrap().contains("country=BR"));
        assert!(url.query().unwrap().contains("types=poi"));

        let stops: Vec<Stop> = [(-46.63, -23.55), (-46.64, -23.56)].iter().enumerate()
            .map(|(i, &(lng, lat))| Stop::new(StopId::new(format!("s{i}")), format!("Stop {i}"), coordinates(lng, lat), None, i as u32 + 1))
            .collect();
        let options = OptimizeOptions { source: Endpoint::First, destination: Endpoint::Any, roundtrip: false };
        let url = client.optimize_url(&stops, &options).unwrap();
        assert_eq!(url.path(), "/optimized-trips/v1/mapbox/driving/-46.63,-23.55;-46.64,-23.56");
        assert!(url.query().unwrap().contains("destination=any"));
        assert!(url.query().unwrap().contains("roundtrip=false"));
    }

    #[tokio::test]
    async fn missing_token_is_unavailable() {
        let client = client(None);
        assert_eq!(client.resolve(coordinates(0.0, 0.0)).await, Err(AdapterError::Unavailable));
        assert_eq!(client.search_places("Rua Augusta", SearchKind::General).await, Err(AdapterError::Unavailable));
    }
}
