//! Great-circle distance and bounding boxes

use crate::listing::GeoPoint;

/// Mean Earth radius in meters (IUGG)
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Haversine distance between two points, in meters
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Round a distance to centimeters for output
pub fn round_centimeters(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

/// Latitude/longitude rectangle enclosing a search circle.
///
/// Used only as a coarse storage prefilter; exact filtering is done with
/// [`haversine_meters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    /// `None` when the circle touches a pole or crosses the antimeridian
    pub longitude_range: Option<(f64, f64)>,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_meters: f64) -> Self {
        let dlat = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
        let min_latitude = (center.latitude - dlat).max(-90.0);
        let max_latitude = (center.latitude + dlat).min(90.0);

        let longitude_range = if min_latitude <= -90.0 || max_latitude >= 90.0 {
            None
        } else {
            // widest point of the circle is at the latitude closest to a pole
            let widest = min_latitude.abs().max(max_latitude.abs()).to_radians();
            let dlon = (radius_meters / (EARTH_RADIUS_METERS * widest.cos())).to_degrees();
            let (min_lon, max_lon) = (center.longitude - dlon, center.longitude + dlon);
            if min_lon < -180.0 || max_lon > 180.0 {
                None
            } else {
                Some((min_lon, max_lon))
            }
        };

        Self {
            min_latitude,
            max_latitude,
            longitude_range,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        if point.latitude < self.min_latitude || point.latitude > self.max_latitude {
            return false;
        }
        match self.longitude_range {
            Some((min, max)) => point.longitude >= min && point.longitude <= max,
            None => true,
        }
    }
}
