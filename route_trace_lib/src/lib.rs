pub mod coordinates;
pub mod navigation_data;
pub mod route_summary;
pub mod stop;
