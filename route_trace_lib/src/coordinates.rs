use geo_types::Point;

/// Map position, `x` is longitude and `y` is latitude.
pub type Coordinates = Point<f64>;

pub fn coordinates(lng: f64, lat: f64) -> Coordinates {
    Point::new(lng, lat)
}

/// Human readable stand-in used whenever no address could be resolved.
pub fn format_coordinates(coordinates: &Coordinates) -> String {
    format!("Lat: {:.4}, Lng: {:.4}", coordinates.y(), coordinates.x())
}

#[test]
fn test_format_coordinates() {
    let point = coordinates(-46.63333, -23.55052);
    assert_eq!(format_coordinates(&point), "Lat: -23.5505, Lng: -46.6333");
}
