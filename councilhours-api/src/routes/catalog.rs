use axum::Json;
use councilhours_shared::catalog::{self, CatalogSection};

/// `GET /v1/catalog`: sections and labels in form order
pub async fn get_catalog() -> Json<Vec<CatalogSection>> {
    Json(catalog::describe())
}
