//! Great-circle distance between GPS coordinates.

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two (latitude, longitude) pairs
/// given in degrees. Non-finite inputs propagate as NaN; callers validate
/// coordinates before use.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine_distance_m(51.5074, -0.1278, 51.5074, -0.1278), 0.0);
        assert_eq!(haversine_distance_m(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn symmetric() {
        let d1 = haversine_distance_m(40.7128, -74.0060, 34.0522, -118.2437);
        let d2 = haversine_distance_m(34.0522, -118.2437, 40.7128, -74.0060);
        assert_eq!(d1, d2);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        // One degree of arc on a 6,371 km sphere is about 111.19 km.
        let d = haversine_distance_m(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn short_distances_are_accurate() {
        // ~100 m north of the equator origin.
        let d = haversine_distance_m(0.0, 0.0, 0.0009, 0.0);
        assert!((d - 100.0).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn nan_input_propagates() {
        assert!(haversine_distance_m(f64::NAN, 0.0, 0.0, 0.0).is_nan());
    }
}
