pub mod cost_estimator;
pub mod gemini;
pub mod geocoding;
pub mod place_parser;
pub mod places;
pub mod popular;
pub mod route_assembly;
pub mod routing;
pub mod saved_routes;
pub mod suggestions;
