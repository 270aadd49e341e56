use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, AppJson, InventoryHandlerState};
use crate::services::{
    validation::{revenue_json, Price, Quantity},
    SaleCommand, SaleReceipt,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SellItemRequest {
    #[schema(example = "APPLE")]
    pub name: String,
    /// Units to sell, defaults to 1
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 2)]
    pub amount: Option<Value>,
    /// Unit price; when given, revenue is booked
    #[serde(default)]
    #[schema(value_type = Option<f64>, example = 3)]
    pub price: Option<Value>,
}

/// Creates the router for sales endpoints
pub fn sales_routes<S>() -> Router<S>
where
    S: InventoryHandlerState,
{
    Router::new()
        .route("/", get(total_sales::<S>).post(sell_item::<S>))
        .route("/:name", get(item_sales::<S>))
}

/// Sell units of an item
#[utoipa::path(
    post,
    path = "/v1/sales",
    request_body = SellItemRequest,
    responses(
        (status = 201, description = "Sale recorded", body = SaleReceipt,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid amount, invalid price or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Priced sale of an unknown item", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn sell_item<S>(
    State(state): State<S>,
    AppJson(payload): AppJson<SellItemRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let command = SaleCommand {
        amount: Quantity::from_json(payload.amount.as_ref())?,
        price: Price::from_json(payload.price),
        name: payload.name,
    };

    let receipt = state.inventory_service().sell_item(command).await?;
    info!(name = %receipt.name, amount = receipt.amount, "Sale recorded via API");
    Ok(created_response(receipt))
}

/// Revenue over all items
#[utoipa::path(
    get,
    path = "/v1/sales",
    responses(
        (status = 200, description = "Total revenue", body = BTreeMap<String, f64>, example = json!({"sales": 6})),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn total_sales<S>(State(state): State<S>) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let total = state.inventory_service().total_sales().await?;
    Ok(success_response(json!({ "sales": revenue_json(total) })))
}

/// Revenue of one item
#[utoipa::path(
    get,
    path = "/v1/sales/{name}",
    params(
        ("name" = String, Path, description = "Item name, matched case-sensitively")
    ),
    responses(
        (status = 200, description = "Revenue of the item, 0 when it has none",
            body = BTreeMap<String, f64>, example = json!({"APPLE": 6})),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn item_sales<S>(
    State(state): State<S>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let total = state.inventory_service().item_sales(&name).await?;
    let mut body = Map::new();
    body.insert(name, revenue_json(total));
    Ok(success_response(Value::Object(body)))
}
