use crate::error::{AppError, Result};
use crate::models::saved_route::{
    validate_email, ListRoutesRequest, RouteSummary, SaveRouteRequest, SavedRouteDetail,
    UpdateRouteRequest,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct RouteListResponse {
    pub success: bool,
    pub routes: BTreeMap<i64, RouteSummary>,
}

/// POST /saved
/// All routes saved by a user, keyed by id
pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ListRoutesRequest>,
) -> Result<Json<RouteListResponse>> {
    validate_email(&request.email).map_err(AppError::InvalidRequest)?;

    let routes = state.saved_routes.list(&request.email).await?;
    tracing::info!("Listed {} saved routes", routes.len());

    Ok(Json(RouteListResponse {
        success: true,
        routes,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRouteResponse {
    pub success: bool,
    pub route_id: i64,
}

/// POST /saved/save
pub async fn save_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveRouteRequest>,
) -> Result<Json<SaveRouteResponse>> {
    request.validate().map_err(AppError::InvalidRequest)?;

    let route_id = state.saved_routes.save(&request).await?;

    Ok(Json(SaveRouteResponse {
        success: true,
        route_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct SavedRouteResponse {
    pub success: bool,
    #[serde(flatten)]
    pub route: SavedRouteDetail,
}

/// GET /saved/{email}/{route_id}
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path((email, route_id)): Path<(String, String)>,
) -> Result<Json<SavedRouteResponse>> {
    validate_email(&email).map_err(AppError::InvalidRequest)?;
    let route_id: i64 = route_id
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("invalid route id: {}", route_id)))?;

    let route = state.saved_routes.get(&email, route_id).await?;

    Ok(Json(SavedRouteResponse {
        success: true,
        route,
    }))
}

#[derive(Debug, Serialize)]
pub struct UpdateRouteResponse {
    pub success: bool,
    pub message: String,
}

/// POST /saved/update
pub async fn update_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateRouteRequest>,
) -> Result<Json<UpdateRouteResponse>> {
    validate_email(&request.email).map_err(AppError::InvalidRequest)?;

    state.saved_routes.update(&request).await?;

    Ok(Json(UpdateRouteResponse {
        success: true,
        message: "Route updated successfully".to_string(),
    }))
}
