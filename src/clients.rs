use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::geo::GeoCoordinate;
use crate::models::{BusSnapshot, OperationalStatus, RouteRef, StopSnapshot};

/// Speed assumed when the bus service omits the averaged speed entirely.
/// A reported speed of zero is not defaulted; it means the bus is stalled.
const DEFAULT_AVERAGE_SPEED_KMH: f64 = 40.0;

// --- Wire shapes of the sibling services ---

#[derive(Debug, Clone, Deserialize)]
struct CoordinatesDto {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct SpeedDto {
    average: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct RouteAssignmentDto {
    #[serde(rename = "routeId")]
    route_id: i64,
    #[serde(rename = "routeName")]
    route_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct BusDto {
    #[serde(rename = "busId")]
    bus_id: i64,
    nomor_polisi: String,
    lokasi_geografis: CoordinatesDto,
    #[serde(default)]
    speed: Option<SpeedDto>,
    #[serde(default)]
    route: Option<RouteAssignmentDto>,
    #[serde(default)]
    operational_status: Option<String>,
}

impl BusDto {
    fn into_snapshot(self) -> BusSnapshot {
        BusSnapshot {
            bus_id: self.bus_id,
            bus_number: self.nomor_polisi,
            location: GeoCoordinate::new(
                self.lokasi_geografis.latitude,
                self.lokasi_geografis.longitude,
            ),
            average_speed_kmh: self
                .speed
                .map(|s| s.average)
                .unwrap_or(DEFAULT_AVERAGE_SPEED_KMH),
            route: self.route.map(|r| RouteRef {
                route_id: r.route_id,
                route_name: r.route_name,
            }),
            status: OperationalStatus::from_wire(self.operational_status.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StopDto {
    name: String,
    coordinates: CoordinatesDto,
}

#[derive(Debug, Deserialize)]
struct RouteDto {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RosterDto {
    buses: Vec<serde_json::Value>,
}

// Individual roster entries can be malformed without poisoning the whole
// feed; decode each one on its own and drop the ones that do not parse.
fn parse_roster(roster: RosterDto) -> Vec<BusSnapshot> {
    roster
        .buses
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<BusDto>(value) {
            Ok(bus) => Some(bus.into_snapshot()),
            Err(err) => {
                debug!(error = %err, "skipping malformed roster entry");
                None
            }
        })
        .collect()
}

/// Client for the sibling route, stop, and bus services. One lookup is one
/// request with a fixed timeout; any failure collapses to `None` and is not
/// retried, so a missing upstream degrades a single request rather than
/// cascading.
pub struct ServiceLocationClient {
    http: reqwest::Client,
    route_base: String,
    stop_base: String,
    bus_base: String,
}

impl ServiceLocationClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            route_base: config.route_service_url.clone(),
            stop_base: config.stop_service_url.clone(),
            bus_base: config.bus_service_url.clone(),
        })
    }

    /// Current position and metadata for one bus.
    pub async fn fetch_bus(&self, bus_id: i64) -> Option<BusSnapshot> {
        let url = format!("{}/buses/{}", self.bus_base, bus_id);
        let dto: BusDto = self.get_json(&url).await?;
        Some(dto.into_snapshot())
    }

    /// Name and coordinates for one stop.
    pub async fn fetch_stop(&self, stop_id: i64) -> Option<StopSnapshot> {
        let url = format!("{}/stops/{}", self.stop_base, stop_id);
        let dto: StopDto = self.get_json(&url).await?;
        Some(StopSnapshot {
            stop_id,
            name: dto.name,
            location: GeoCoordinate::new(dto.coordinates.latitude, dto.coordinates.longitude),
        })
    }

    /// Canonical route name, for display enrichment only. Callers fall back
    /// to the denormalized name carried on the bus when this fails.
    pub async fn fetch_route_name(&self, route_id: i64) -> Option<String> {
        let url = format!("{}/routes/{}", self.route_base, route_id);
        let dto: RouteDto = self.get_json(&url).await?;
        Some(dto.name)
    }

    /// The full current fleet, in one bulk call.
    pub async fn fetch_bus_roster(&self) -> Option<Vec<BusSnapshot>> {
        let url = format!("{}/buses", self.bus_base);
        let roster: RosterDto = self.get_json(&url).await?;
        Some(parse_roster(roster))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<T>().await {
                    Ok(body) => Some(body),
                    Err(err) => {
                        warn!(url, error = %err, "malformed response from upstream service");
                        None
                    }
                }
            }
            Ok(response) => {
                warn!(url, status = %response.status(), "upstream service returned an error");
                None
            }
            Err(err) => {
                warn!(url, error = %err, "request to upstream service failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_bus_payload_decodes() {
        let raw = r#"{
            "busId": 3,
            "nomor_polisi": "B 9012 GHI",
            "lokasi_geografis": {"latitude": -6.9147, "longitude": 107.6015},
            "speed": {"average": 35.0},
            "route": {"routeId": 2, "routeName": "Rute B"},
            "operational_status": "In Service"
        }"#;

        let bus = serde_json::from_str::<BusDto>(raw).unwrap().into_snapshot();
        assert_eq!(bus.bus_id, 3);
        assert_eq!(bus.bus_number, "B 9012 GHI");
        assert_eq!(bus.average_speed_kmh, 35.0);
        assert_eq!(bus.status, OperationalStatus::InService);
        let route = bus.route.unwrap();
        assert_eq!(route.route_id, 2);
        assert_eq!(route.route_name, "Rute B");
    }

    #[test]
    fn minimal_bus_payload_gets_defaults() {
        // Freshly registered buses have no speed, route, or status yet.
        let raw = r#"{
            "busId": 7,
            "nomor_polisi": "B 1234 ABC",
            "lokasi_geografis": {"latitude": 0.0, "longitude": 0.0}
        }"#;

        let bus = serde_json::from_str::<BusDto>(raw).unwrap().into_snapshot();
        assert_eq!(bus.average_speed_kmh, DEFAULT_AVERAGE_SPEED_KMH);
        assert!(bus.route.is_none());
        assert_eq!(bus.status, OperationalStatus::OutOfService);
        assert!(bus.location.is_unfixed());
    }

    #[test]
    fn reported_zero_speed_is_kept() {
        let raw = r#"{
            "busId": 8,
            "nomor_polisi": "B 5678 DEF",
            "lokasi_geografis": {"latitude": -6.92, "longitude": 107.61},
            "speed": {"average": 0.0}
        }"#;

        let bus = serde_json::from_str::<BusDto>(raw).unwrap().into_snapshot();
        assert_eq!(bus.average_speed_kmh, 0.0);
    }

    #[test]
    fn stop_payload_decodes() {
        let raw = r#"{
            "stopId": 10,
            "name": "Alun-alun Bandung",
            "address": "Halte 7",
            "coordinates": {"latitude": -6.9217, "longitude": 107.6074}
        }"#;

        let dto: StopDto = serde_json::from_str(raw).unwrap();
        assert_eq!(dto.name, "Alun-alun Bandung");
        assert_eq!(dto.coordinates.latitude, -6.9217);
    }

    #[test]
    fn malformed_roster_entries_are_skipped() {
        let raw = r#"{"buses": [
            {"busId": 1, "nomor_polisi": "B 1111 AA",
             "lokasi_geografis": {"latitude": -6.91, "longitude": 107.60}},
            {"busId": "not-a-number"},
            {"busId": 2, "nomor_polisi": "B 2222 BB",
             "lokasi_geografis": {"latitude": -6.92, "longitude": 107.61}}
        ]}"#;

        let roster: RosterDto = serde_json::from_str(raw).unwrap();
        let buses = parse_roster(roster);
        assert_eq!(buses.len(), 2);
        assert_eq!(buses[0].bus_id, 1);
        assert_eq!(buses[1].bus_id, 2);
    }
}
