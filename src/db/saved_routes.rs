use crate::error::{AppError, Result};
use crate::models::SavedRoute;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

// Advisory lock serializing automatic id allocation.
const ROUTE_ID_LOCK_KEY: i64 = 0x5257_4944;

/// Per-user saved routes. `(user, id)` is unique.
#[async_trait]
pub trait SavedRouteRepository: Send + Sync {
    /// All of a user's routes, ordered by id.
    async fn find_by_user(&self, user: &str) -> Result<Vec<SavedRoute>>;

    async fn find_by_user_and_id(&self, user: &str, id: i64) -> Result<Option<SavedRoute>>;

    /// Fails with [`AppError::DuplicateRoute`] when the id is taken.
    async fn insert(&self, user: &str, route: &SavedRoute) -> Result<()>;

    /// Store under the global max id + 1, picked atomically with the insert
    /// so concurrent saves never draw the same id. Returns the new id.
    async fn insert_next(&self, user: &str, route_data: &str) -> Result<i64>;

    /// Replace a route's data. Returns false when it does not exist.
    async fn update(&self, user: &str, route: &SavedRoute) -> Result<bool>;

    /// Largest id across all users.
    async fn max_id(&self) -> Result<Option<i64>>;

    async fn health_check(&self) -> bool;

    fn backend_name(&self) -> &'static str;
}

#[derive(sqlx::FromRow)]
struct SavedRouteRow {
    route_id: i64,
    route_data: String,
}

impl From<SavedRouteRow> for SavedRoute {
    fn from(row: SavedRouteRow) -> Self {
        SavedRoute {
            id: row.route_id,
            route_data: row.route_data,
        }
    }
}

pub struct PgSavedRouteRepository {
    pool: sqlx::PgPool,
}

impl PgSavedRouteRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedRouteRepository for PgSavedRouteRepository {
    async fn find_by_user(&self, user: &str) -> Result<Vec<SavedRoute>> {
        let rows = sqlx::query_as::<_, SavedRouteRow>(
            "SELECT route_id, route_data FROM saved_routes
             WHERE user_email = $1
             ORDER BY route_id",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SavedRoute::from).collect())
    }

    async fn find_by_user_and_id(&self, user: &str, id: i64) -> Result<Option<SavedRoute>> {
        let row = sqlx::query_as::<_, SavedRouteRow>(
            "SELECT route_id, route_data FROM saved_routes
             WHERE user_email = $1 AND route_id = $2",
        )
        .bind(user)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SavedRoute::from))
    }

    async fn insert(&self, user: &str, route: &SavedRoute) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO saved_routes (user_email, route_id, route_data)
             VALUES ($1, $2, $3)",
        )
        .bind(user)
        .bind(route.id)
        .bind(&route.route_data)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateRoute {
                    user: user.to_string(),
                    id: route.id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_next(&self, user: &str, route_data: &str) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ROUTE_ID_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO saved_routes (user_email, route_id, route_data)
             SELECT $1, COALESCE(MAX(route_id), 0) + 1, $2 FROM saved_routes
             RETURNING route_id",
        )
        .bind(user)
        .bind(route_data)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn update(&self, user: &str, route: &SavedRoute) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE saved_routes
             SET route_data = $3, updated_at = NOW()
             WHERE user_email = $1 AND route_id = $2",
        )
        .bind(user)
        .bind(route.id)
        .bind(&route.route_data)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn max_id(&self) -> Result<Option<i64>> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(route_id) FROM saved_routes")
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct InMemorySavedRouteRepository {
    routes: RwLock<BTreeMap<(String, i64), String>>,
}

impl InMemorySavedRouteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SavedRouteRepository for InMemorySavedRouteRepository {
    async fn find_by_user(&self, user: &str) -> Result<Vec<SavedRoute>> {
        let routes = self.routes.read().await;
        Ok(routes
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|((_, id), data)| SavedRoute {
                id: *id,
                route_data: data.clone(),
            })
            .collect())
    }

    async fn find_by_user_and_id(&self, user: &str, id: i64) -> Result<Option<SavedRoute>> {
        let routes = self.routes.read().await;
        Ok(routes
            .get(&(user.to_string(), id))
            .map(|data| SavedRoute {
                id,
                route_data: data.clone(),
            }))
    }

    async fn insert(&self, user: &str, route: &SavedRoute) -> Result<()> {
        let mut routes = self.routes.write().await;
        let key = (user.to_string(), route.id);
        if routes.contains_key(&key) {
            return Err(AppError::DuplicateRoute {
                user: user.to_string(),
                id: route.id,
            });
        }
        routes.insert(key, route.route_data.clone());
        Ok(())
    }

    async fn insert_next(&self, user: &str, route_data: &str) -> Result<i64> {
        let mut routes = self.routes.write().await;
        let id = routes.keys().map(|(_, id)| *id).max().unwrap_or(0) + 1;
        routes.insert((user.to_string(), id), route_data.to_string());
        Ok(id)
    }

    async fn update(&self, user: &str, route: &SavedRoute) -> Result<bool> {
        let mut routes = self.routes.write().await;
        match routes.get_mut(&(user.to_string(), route.id)) {
            Some(data) => {
                *data = route.route_data.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn max_id(&self) -> Result<Option<i64>> {
        let routes = self.routes.read().await;
        Ok(routes.keys().map(|(_, id)| *id).max())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
