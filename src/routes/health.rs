use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /debug/health - Check if services are working
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut status = json!({
        "success": true,
        "status": "ok",
        "checks": {}
    });

    // Saved-route store
    let repository = state.saved_routes.repository();
    if repository.health_check().await {
        status["checks"]["database"] = json!({"backend": repository.backend_name(), "status": "ok"});
    } else {
        status["checks"]["database"] =
            json!({"backend": repository.backend_name(), "status": "error"});
        status["status"] = json!("error");
    }

    // Suggestion cache; degraded caching doesn't fail the service
    let stats = state.cache.get_stats().await;
    status["checks"]["cache"] = json!({
        "backend": state.cache.backend_name(),
        "healthy": state.cache.health_check().await,
        "hits": stats.hits,
        "misses": stats.misses,
        "hitRate": stats.hit_rate,
    });

    status["checks"]["routing"] = json!(state.route_assembler.provider_name());
    status["checks"]["places"] = json!(if state.places.is_some() {
        "configured"
    } else {
        "not configured"
    });

    Json(status)
}
