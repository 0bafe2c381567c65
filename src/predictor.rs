use chrono::Utc;
use tracing::{debug, info, warn};

use crate::clients::ServiceLocationClient;
use crate::error::PredictionError;
use crate::geo::{self, GeoCoordinate};
use crate::models::{
    ApproachLabel, ArrivalPrediction, BusSnapshot, OperationalStatus, PredictionStatus,
    StopSnapshot,
};
use crate::store::PredictionStore;

/// Buses farther than this from the stop are not listed as approaching.
pub const MAX_SEARCH_RADIUS_KM: f64 = 10.0;

/// An arrivals listing returns at most this many buses.
pub const MAX_ARRIVALS: usize = 10;

/// Optional narrowing of an arrivals listing. When both are set a bus must
/// match both to be listed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrivalFilter {
    pub route_id: Option<i64>,
    pub bus_id: Option<i64>,
}

/// Result of a single-bus ETA computation: the persisted prediction plus the
/// raw coordinates and speed for the caller's display.
#[derive(Debug)]
pub struct EtaReport {
    pub prediction: ArrivalPrediction,
    pub bus_location: GeoCoordinate,
    pub stop_location: GeoCoordinate,
    pub average_speed_kmh: f64,
}

/// One bus in an arrivals listing. Transient, never persisted.
#[derive(Debug, Clone)]
pub struct ArrivalSummary {
    pub bus_id: i64,
    pub bus_number: String,
    pub route_id: i64,
    pub route_name: String,
    pub eta_minutes: i64,
    pub distance_km: f64,
    pub label: ApproachLabel,
}

#[derive(Debug)]
pub struct StopArrivals {
    pub stop_id: i64,
    pub stop_name: String,
    pub total_arrivals: usize,
    pub arrivals: Vec<ArrivalSummary>,
}

// A single prediction counts as arrived the moment its ETA reaches zero.
fn prediction_status(eta_minutes: i64) -> PredictionStatus {
    if eta_minutes > 0 {
        PredictionStatus::Approaching
    } else {
        PredictionStatus::Arrived
    }
}

// The listing flips to "Arriving Soon" at two minutes out instead. The two
// thresholds are intentionally different.
fn approach_label(eta_minutes: i64) -> ApproachLabel {
    if eta_minutes > 2 {
        ApproachLabel::Approaching
    } else {
        ApproachLabel::ArrivingSoon
    }
}

// Rank the roster against one stop: drop buses that are not in revenue
// service, have no route, miss the filters, have no GPS fix, or are outside
// the search radius; then sort by ETA and cap the list. The sort is stable,
// so ties keep roster order.
fn collect_arrivals(
    stop: &StopSnapshot,
    buses: Vec<BusSnapshot>,
    filter: &ArrivalFilter,
) -> StopArrivals {
    let mut arrivals = Vec::new();

    for bus in buses {
        if bus.status != OperationalStatus::InService {
            continue;
        }
        let Some(route) = bus.route else { continue };
        if filter.route_id.is_some_and(|id| route.route_id != id) {
            continue;
        }
        if filter.bus_id.is_some_and(|id| bus.bus_id != id) {
            continue;
        }
        if bus.location.is_unfixed() {
            continue;
        }

        let distance_km = geo::haversine_distance_km(bus.location, stop.location);
        if distance_km > MAX_SEARCH_RADIUS_KM {
            continue;
        }

        let eta_minutes = geo::estimate_eta_minutes(distance_km, bus.average_speed_kmh);

        arrivals.push(ArrivalSummary {
            bus_id: bus.bus_id,
            bus_number: bus.bus_number,
            route_id: route.route_id,
            route_name: route.route_name,
            eta_minutes,
            distance_km,
            label: approach_label(eta_minutes),
        });
    }

    // Sort by ETA (closest first)
    arrivals.sort_by_key(|arrival| arrival.eta_minutes);

    let total_arrivals = arrivals.len();
    arrivals.truncate(MAX_ARRIVALS);

    StopArrivals {
        stop_id: stop.stop_id,
        stop_name: stop.name.clone(),
        total_arrivals,
        arrivals,
    }
}

/// Answers "when will bus B reach stop S" and "which buses are approaching
/// stop S" from live snapshots fetched off the sibling services.
pub struct ArrivalPredictor {
    clients: ServiceLocationClient,
    store: PredictionStore,
}

impl ArrivalPredictor {
    pub fn new(clients: ServiceLocationClient, store: PredictionStore) -> Self {
        Self { clients, store }
    }

    pub async fn predict_eta(
        &self,
        bus_id: i64,
        stop_id: i64,
    ) -> Result<EtaReport, PredictionError> {
        let bus = self
            .clients
            .fetch_bus(bus_id)
            .await
            .ok_or(PredictionError::BusNotFound(bus_id))?;

        // A bus without a GPS fix cannot be predicted against.
        if bus.location.is_unfixed() {
            return Err(PredictionError::BusNotFound(bus_id));
        }

        let stop = self
            .clients
            .fetch_stop(stop_id)
            .await
            .ok_or(PredictionError::StopNotFound(stop_id))?;

        let distance_km = geo::haversine_distance_km(bus.location, stop.location);
        let eta_minutes = geo::estimate_eta_minutes(distance_km, bus.average_speed_kmh);

        // Enrich the route name from the route service when the bus has an
        // assignment; fall back to the denormalized copy it carries.
        let (route_id, route_name) = match &bus.route {
            Some(assigned) => {
                let name = self
                    .clients
                    .fetch_route_name(assigned.route_id)
                    .await
                    .unwrap_or_else(|| assigned.route_name.clone());
                (assigned.route_id, name)
            }
            None => (0, "Unknown".to_string()),
        };

        let prediction = ArrivalPrediction {
            stop_id: stop.stop_id,
            stop_name: stop.name.clone(),
            bus_id: bus.bus_id,
            bus_number: bus.bus_number.clone(),
            route_id,
            route_name,
            eta_minutes,
            distance_km,
            status: prediction_status(eta_minutes),
            predicted_at: Utc::now(),
        };

        // Persistence is best effort: a failed insert is logged and the
        // caller still gets the computed ETA.
        match self.store.append(&prediction).await {
            Ok(id) => debug!(id, bus_id, stop_id, "arrival prediction recorded"),
            Err(err) => warn!(error = %err, bus_id, stop_id, "failed to record arrival prediction"),
        }

        info!(bus_id, stop_id, distance_km, eta_minutes, "computed bus ETA");

        Ok(EtaReport {
            prediction,
            bus_location: bus.location,
            stop_location: stop.location,
            average_speed_kmh: bus.average_speed_kmh,
        })
    }

    pub async fn list_approaching(
        &self,
        stop_id: i64,
        filter: ArrivalFilter,
    ) -> Result<StopArrivals, PredictionError> {
        let stop = self
            .clients
            .fetch_stop(stop_id)
            .await
            .ok_or(PredictionError::StopNotFound(stop_id))?;

        // One bulk roster call; if it fails the whole listing fails.
        let buses = self
            .clients
            .fetch_bus_roster()
            .await
            .ok_or(PredictionError::RosterUnavailable)?;

        let listing = collect_arrivals(&stop, buses, &filter);

        info!(
            stop_id,
            total = listing.total_arrivals,
            "ranked approaching buses"
        );

        Ok(listing)
    }
}
