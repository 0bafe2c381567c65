use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::GeoCoordinate;

/// Fleet status as reported by the bus service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalStatus {
    Available,
    InService,
    Maintenance,
    OutOfService,
}

impl OperationalStatus {
    // The bus service sends display strings, not identifiers. Anything
    // unrecognized is treated as out of service.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("Available") => Self::Available,
            Some("In Service") => Self::InService,
            Some("Maintenance") => Self::Maintenance,
            _ => Self::OutOfService,
        }
    }
}

/// Route assignment denormalized onto a bus payload.
#[derive(Debug, Clone)]
pub struct RouteRef {
    pub route_id: i64,
    pub route_name: String,
}

/// Point-in-time copy of one bus, valid for a single computation.
#[derive(Debug, Clone)]
pub struct BusSnapshot {
    pub bus_id: i64,
    pub bus_number: String,
    pub location: GeoCoordinate,
    pub average_speed_kmh: f64,
    pub route: Option<RouteRef>,
    pub status: OperationalStatus,
}

/// Point-in-time copy of one stop.
#[derive(Debug, Clone)]
pub struct StopSnapshot {
    pub stop_id: i64,
    pub name: String,
    pub location: GeoCoordinate,
}

/// Status of a single persisted prediction: arrived once the ETA hits zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PredictionStatus {
    Approaching,
    Arrived,
}

impl PredictionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approaching => "Approaching",
            Self::Arrived => "Arrived",
        }
    }
}

/// Label used by the per-stop arrivals listing. Flips at two minutes out,
/// unlike `PredictionStatus` which flips at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApproachLabel {
    Approaching,
    #[serde(rename = "Arriving Soon")]
    ArrivingSoon,
}

/// One arrival prediction, written exactly once and never mutated.
#[derive(Debug, Clone)]
pub struct ArrivalPrediction {
    pub stop_id: i64,
    pub stop_name: String,
    pub bus_id: i64,
    pub bus_number: String,
    pub route_id: i64,
    pub route_name: String,
    pub eta_minutes: i64,
    pub distance_km: f64,
    pub status: PredictionStatus,
    pub predicted_at: DateTime<Utc>,
}
