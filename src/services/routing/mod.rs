//! Road routing providers. Each returns its geometry in native form; route
//! assembly normalizes it.

mod google;
mod osrm;

pub use google::GoogleDirectionsClient;
pub use osrm::{GeometryFormat, OsrmClient};

use crate::error::ProviderError;
use crate::models::{Coordinates, ProviderRoute};
use async_trait::async_trait;

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Driving route through `points` in order (origin first, destination last).
    async fn route(&self, points: &[Coordinates]) -> Result<ProviderRoute, ProviderError>;

    fn name(&self) -> &'static str;
}
