use crate::db::SavedRouteRepository;
use crate::error::{AppError, Result};
use crate::models::saved_route::{
    RouteSummary, SaveRouteRequest, SavedRouteDetail, UpdateRouteRequest,
};
use crate::models::{RouteData, RouteIdRequest, SavedPlace, SavedRoute};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const UNKNOWN_ORIGIN: &str = "Unknown origin";
const UNKNOWN_DESTINATION: &str = "Unknown destination";

/// Save, list, fetch and update routes on top of a repository.
pub struct SavedRouteService {
    repository: Arc<dyn SavedRouteRepository>,
}

impl SavedRouteService {
    pub fn new(repository: Arc<dyn SavedRouteRepository>) -> Self {
        SavedRouteService { repository }
    }

    pub fn repository(&self) -> &Arc<dyn SavedRouteRepository> {
        &self.repository
    }

    /// Store a route and return its id. `"x"` asks for a fresh global id.
    pub async fn save(&self, request: &SaveRouteRequest) -> Result<i64> {
        let data = RouteData::new(
            request.origin.trim(),
            request.destination.trim(),
            request.selected_places.clone(),
        )
        .map_err(AppError::InvalidRequest)?;

        let email = request.email.trim();
        let route_data = data.encode();

        let id = match request.id {
            RouteIdRequest::Explicit(id) => {
                self.repository
                    .insert(email, &SavedRoute { id, route_data })
                    .await?;
                id
            }
            RouteIdRequest::Auto => self.insert_with_fresh_id(email, route_data).await?,
        };

        tracing::info!(route_id = id, "Saved route {} -> {}", data.origin, data.destination);
        Ok(id)
    }

    /// Id -> origin/destination for every route the user owns.
    pub async fn list(&self, email: &str) -> Result<BTreeMap<i64, RouteSummary>> {
        let routes = self.repository.find_by_user(email.trim()).await?;
        if routes.is_empty() {
            return Err(AppError::NotFound("No routes found for this user".to_string()));
        }

        Ok(routes
            .into_iter()
            .map(|route| {
                let summary = match RouteData::decode(&route.route_data) {
                    Some(data) => RouteSummary {
                        origin: data.origin,
                        destination: data.destination,
                    },
                    None => {
                        tracing::warn!(route_id = route.id, "Stored route data is unreadable");
                        RouteSummary {
                            origin: UNKNOWN_ORIGIN.to_string(),
                            destination: UNKNOWN_DESTINATION.to_string(),
                        }
                    }
                };
                (route.id, summary)
            })
            .collect())
    }

    /// Full route with every place marked as checked.
    pub async fn get(&self, email: &str, id: i64) -> Result<SavedRouteDetail> {
        let route = self
            .repository
            .find_by_user_and_id(email.trim(), id)
            .await?
            .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;

        let data = RouteData::decode(&route.route_data).ok_or_else(|| {
            AppError::Internal(format!("route {} has unreadable data", route.id))
        })?;

        Ok(SavedRouteDetail {
            id: route.id,
            origin: data.origin,
            destination: data.destination,
            places: data
                .places
                .into_iter()
                .map(|place| SavedPlace {
                    checked: Some(true),
                    ..place
                })
                .collect(),
        })
    }

    /// Re-encode an existing route. Missing origin/destination keep the stored values.
    pub async fn update(&self, request: &UpdateRouteRequest) -> Result<()> {
        let email = request.email.trim();
        let existing = self
            .repository
            .find_by_user_and_id(email, request.route_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;
        let stored = RouteData::decode(&existing.route_data);

        let origin = request
            .origin
            .clone()
            .or_else(|| stored.as_ref().map(|d| d.origin.clone()))
            .unwrap_or_default();
        let destination = request
            .destination
            .clone()
            .or_else(|| stored.as_ref().map(|d| d.destination.clone()))
            .unwrap_or_default();

        let data = RouteData::new(origin.trim(), destination.trim(), request.places.clone())
            .map_err(AppError::InvalidRequest)?;

        let updated = self
            .repository
            .update(
                email,
                &SavedRoute {
                    id: request.route_id,
                    route_data: data.encode(),
                },
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound("Route not found".to_string()));
        }

        tracing::info!(route_id = request.route_id, "Updated saved route");
        Ok(())
    }

    /// Global max + 1, or the Unix time in seconds when the scan fails.
    /// Global max + 1, allocated by the repository together with the insert.
    /// When that statement fails at the database, the Unix timestamp is used.
    async fn insert_with_fresh_id(&self, email: &str, route_data: String) -> Result<i64> {
        match self.repository.insert_next(email, &route_data).await {
            Ok(id) => Ok(id),
            Err(AppError::Database(e)) => {
                tracing::warn!("Could not allocate route id, using timestamp: {}", e);
                let id = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(1);
                self.repository
                    .insert(email, &SavedRoute { id, route_data })
                    .await?;
                Ok(id)
            }
            Err(e) => Err(e),
        }
    }
}
