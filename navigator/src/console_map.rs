use route_trace_lib::{coordinates::format_coordinates, stop::Stop};
use route_trace_session::notifier::MapCollaborator;

/// Stands in for the map view, printing what a real map would draw.
pub struct ConsoleMap;

impl MapCollaborator for ConsoleMap {
    fn reset(&self) {
        println!("[map] cleared");
    }

    fn draw_route(&self, stops: &[Stop]) {
        let line = stops.iter()
            .map(|stop| format!("{}. {} ({})", stop.order, stop.name, format_coordinates(&stop.coordinates)))
            .collect::<Vec<_>>()
            .join(" -> ");
        println!("[map] route: {line}");
    }
}
