pub const COMPLETED_ROUTES_TABLE_NAME: &str = "CompletedRoutes";
pub const ROUTE_ID: &str = "route_id";
pub const COMPLETED_AT: &str = "completed_at";
pub const ROUTE_TYPE: &str = "route_type";
pub const TOTAL_STOPS: &str = "total_stops";
pub const COMPLETED_STOPS: &str = "completed_stops";
pub const TOTAL_DISTANCE: &str = "total_distance_meters";
pub const ESTIMATED_CREDITS: &str = "estimated_credits";
// Full summary, bincode encoded
pub const SUMMARY: &str = "summary";
