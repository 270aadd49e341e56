use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, AppJson, InventoryHandlerState};
use crate::services::{
    validation::{ItemName, Quantity},
    StockReceipt,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddStockRequest {
    /// One to eight latin letters
    #[schema(example = "APPLE")]
    pub name: String,
    /// Units to add, defaults to 1
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 5)]
    pub amount: Option<Value>,
}

/// Creates the router for stock endpoints
pub fn stock_routes<S>() -> Router<S>
where
    S: InventoryHandlerState,
{
    Router::new()
        .route(
            "/",
            get(list_stock::<S>)
                .post(add_stock::<S>)
                .delete(delete_all::<S>),
        )
        .route("/:name", get(get_stock::<S>))
}

/// Add units of an item to stock
#[utoipa::path(
    post,
    path = "/v1/stocks",
    request_body = AddStockRequest,
    responses(
        (status = 201, description = "Stock added", body = StockReceipt,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid name or amount", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stocks"
)]
pub async fn add_stock<S>(
    State(state): State<S>,
    AppJson(payload): AppJson<AddStockRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let name = ItemName::parse(&payload.name)?;
    let amount = Quantity::from_json(payload.amount.as_ref())?;

    let receipt = state.inventory_service().add_stock(name, amount).await?;
    info!(name = %receipt.name, amount = receipt.amount, "Stock added via API");
    Ok(created_response(receipt))
}

/// Current amount of one item
#[utoipa::path(
    get,
    path = "/v1/stocks/{name}",
    params(
        ("name" = String, Path, description = "Item name, matched case-sensitively")
    ),
    responses(
        (status = 200, description = "Amount on hand, 0 for unknown items",
            body = BTreeMap<String, i32>, example = json!({"APPLE": 3})),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stocks"
)]
pub async fn get_stock<S>(
    State(state): State<S>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let amount = state.inventory_service().get_stock(&name).await?;
    Ok(success_response(BTreeMap::from([(name, amount)])))
}

/// Every item and its amount
#[utoipa::path(
    get,
    path = "/v1/stocks",
    responses(
        (status = 200, description = "Amounts keyed by item name",
            body = BTreeMap<String, i32>, example = json!({"APPLE": 3, "PEAR": 1})),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stocks"
)]
pub async fn list_stock<S>(State(state): State<S>) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let stock = state.inventory_service().list_stock().await?;
    Ok(success_response(stock))
}

/// Delete every item and every sales record
#[utoipa::path(
    delete,
    path = "/v1/stocks",
    responses(
        (status = 200, description = "Everything deleted, empty body"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stocks"
)]
pub async fn delete_all<S>(State(state): State<S>) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    state.inventory_service().delete_all().await?;
    info!("All stock and sales deleted via API");
    Ok(StatusCode::OK)
}
