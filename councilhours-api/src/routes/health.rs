/// Health check endpoint
///
/// Always answers 200; `status` is `degraded` when the database is unreachable.

use crate::app::AppState;
use axum::{extract::State, Json};
use councilhours_shared::db::{migrations, pool};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,

    pub version: String,

    pub database: String,

    /// Latest applied migration, when the database answered
    pub schema_version: Option<i64>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let schema_version = if connected {
        match migrations::get_migration_status(&state.db).await {
            Ok(status) => status.latest_version,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read migration status");
                None
            }
        }
    } else {
        None
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        schema_version,
    })
}
