pub mod coordinates;
pub mod cost;
pub mod place;
pub mod route;
pub mod saved_route;

pub use coordinates::{Coordinates, RegionBounds};
pub use cost::{CostEstimate, CostRequest};
pub use place::{
    BandKind, BandedPlaces, Confidence, DistanceBand, GeocodeResult, GeocodeSource, Place,
    PlaceSuggestions, SuggestionMode, TripBands,
};
pub use route::{
    BoundingBox, FallbackReason, ProviderGeometry, ProviderRoute, Route, RouteGeometry,
    RouteRequest,
};
pub use saved_route::{RouteData, RouteIdRequest, SavedPlace, SavedRoute};
