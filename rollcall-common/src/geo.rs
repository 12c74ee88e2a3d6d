//! Campus geofence
//!
//! Great-circle distance via the Haversine formula and a circular
//! allowed-region test around a fixed campus centre.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mean Earth radius used for all distance calculations
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the Earth's surface in decimal degrees
///
/// Both components are finite; construct through [`Coordinate::new`] when the
/// values come from outside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Returns None unless both components are finite
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite() && longitude.is_finite() {
            Some(Self { latitude, longitude })
        } else {
            None
        }
    }

    /// "lat, lon" rounded to five decimal places
    pub fn to_address(&self) -> String {
        format!("{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two coordinates in kilometres
///
/// Symmetric, zero for coincident points, and finite for antipodal points.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] near antipodes
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// True iff `point` lies within `radius_km` of `center`
pub fn is_within_campus(point: &Coordinate, center: &Coordinate, radius_km: f64) -> bool {
    haversine_km(point, center) <= radius_km
}

/// Circular allowed region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFence {
    pub center: Coordinate,
    pub radius_km: f64,
}

impl GeoFence {
    pub fn new(center: Coordinate, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    /// Distance from the fence centre in kilometres
    pub fn distance_km(&self, point: &Coordinate) -> f64 {
        haversine_km(point, &self.center)
    }

    /// Evaluate a point against the fence, returning the verdict and distance
    pub fn evaluate(&self, point: &Coordinate) -> (bool, f64) {
        let distance = self.distance_km(point);
        let inside = distance <= self.radius_km;
        debug!(
            "Geofence check: {:.3} km from campus (max {} km) -> {}",
            distance, self.radius_km, inside
        );
        (inside, distance)
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        self.evaluate(point).0
    }
}
