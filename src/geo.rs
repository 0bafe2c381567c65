use serde::{Deserialize, Serialize};

/// ETA reported when a bus has no usable speed (stalled or unknown).
pub const STALLED_ETA_MINUTES: i64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    // (0, 0) is the bus service's placeholder for "no GPS fix yet".
    pub fn is_unfixed(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

// Calculate haversine distance between two GPS coordinates (returns km)
pub fn haversine_distance_km(a: GeoCoordinate, b: GeoCoordinate) -> f64 {
    let r = 6371.0; // Earth radius in km
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    r * c
}

/// Translate distance and average speed into whole minutes, rounding down.
/// A zero speed yields the 999-minute sentinel instead of dividing by zero.
pub fn estimate_eta_minutes(distance_km: f64, average_speed_kmh: f64) -> i64 {
    if average_speed_kmh <= 0.0 {
        return STALLED_ETA_MINUTES;
    }
    (distance_km / average_speed_kmh * 60.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stasiun Bandung and BEC, the two ends of the seeded corridor.
    const STASIUN_BANDUNG: GeoCoordinate = GeoCoordinate {
        latitude: -6.9147,
        longitude: 107.6015,
    };
    const BEC: GeoCoordinate = GeoCoordinate {
        latitude: -6.9130,
        longitude: 107.6067,
    };

    #[test]
    fn distance_is_symmetric() {
        let d1 = haversine_distance_km(STASIUN_BANDUNG, BEC);
        let d2 = haversine_distance_km(BEC, STASIUN_BANDUNG);
        assert_eq!(d1, d2);
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance_km(BEC, BEC), 0.0);
    }

    #[test]
    fn known_city_pair_distance() {
        let d = haversine_distance_km(STASIUN_BANDUNG, BEC);
        assert!((d - 0.6).abs() < 0.02, "got {d} km");
    }

    #[test]
    fn zero_distance_means_zero_eta() {
        assert_eq!(estimate_eta_minutes(0.0, 40.0), 0);
    }

    #[test]
    fn zero_speed_returns_sentinel() {
        assert_eq!(estimate_eta_minutes(0.0, 0.0), STALLED_ETA_MINUTES);
        assert_eq!(estimate_eta_minutes(12.5, 0.0), STALLED_ETA_MINUTES);
    }

    #[test]
    fn eta_rounds_down_to_whole_minutes() {
        // 5 km at 40 km/h is 7.5 minutes
        assert_eq!(estimate_eta_minutes(5.0, 40.0), 7);
    }

    #[test]
    fn eta_is_monotonic_in_distance() {
        let mut last = 0;
        for d in [0.0, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0] {
            let eta = estimate_eta_minutes(d, 30.0);
            assert!(eta >= last);
            last = eta;
        }
    }

    #[test]
    fn origin_sentinel_detection() {
        assert!(GeoCoordinate::new(0.0, 0.0).is_unfixed());
        assert!(!GeoCoordinate::new(0.0, 107.6).is_unfixed());
        assert!(!BEC.is_unfixed());
    }
}
