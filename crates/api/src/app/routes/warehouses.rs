use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use salesboard_catalog::NewWarehouse;
use salesboard_core::WarehouseId;
use salesboard_inventory::TransferRequest;

use crate::app::dto::{self, ListResponse};
use crate::app::errors;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_warehouse).get(list_warehouses))
        .route("/transfer", post(transfer_stock))
        .route(
            "/:id",
            get(get_warehouse).put(update_warehouse).delete(delete_warehouse),
        )
        .route("/:id/inventory", get(get_inventory).patch(update_inventory))
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewWarehouse>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.catalog.create_warehouse(body).await {
        Ok(warehouse) => (StatusCode::CREATED, Json(warehouse)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /api/warehouses
///
/// Each warehouse carries `productsCount`, computed from the ledger at read time.
pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger.warehouse_summaries().await {
        Ok(items) => (StatusCode::OK, Json(ListResponse::from(items))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id = match parse_id::<WarehouseId>(&id, "warehouseId") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.ledger.warehouse_summary(warehouse_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<NewWarehouse>, JsonRejection>,
) -> axum::response::Response {
    let warehouse_id = match parse_id::<WarehouseId>(&id, "warehouseId") {
        Ok(id) => id,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.catalog.update_warehouse(warehouse_id, body).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// DELETE /api/warehouses/:id
///
/// Removes the warehouse's ledger rows with it. Orders keep their lines.
pub async fn delete_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id = match parse_id::<WarehouseId>(&id, "warehouseId") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.catalog.delete_warehouse(warehouse_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let warehouse_id = match parse_id::<WarehouseId>(&id, "warehouseId") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.ledger.inventory_for_warehouse(warehouse_id).await {
        Ok(lines) => (StatusCode::OK, Json(ListResponse::from(lines))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// PATCH /api/warehouses/:id/inventory
///
/// Sets absolute quantities. A single bad item rejects the whole request.
pub async fn update_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateInventoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let warehouse_id = match parse_id::<WarehouseId>(&id, "warehouseId") {
        Ok(id) => id,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .inventory
        .upsert_inventory(body.into_upsert(warehouse_id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /api/warehouses/transfer
pub async fn transfer_stock(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.transfers.transfer_stock(body).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
