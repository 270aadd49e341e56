use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory & Sales API",
        version = "1.0.0",
        description = r#"
# Inventory & Sales API

Tracks stock of named items and the revenue booked when they are sold.

## Items

Item names are one to eight latin letters and are case-sensitive:
`APPLE` and `apple` are different items. Adding stock under an existing
name increases its amount.

## Sales

A sale without a price only moves stock. A sale with a price also adds
`price × amount` to the item's revenue. Revenue figures are integers when
they are whole numbers.

## Error Handling

Every failure is a JSON body with the HTTP status category and a message:

```json
{
  "error": "Bad Request",
  "message": "Insufficient stock: not enough stock available for APPLE",
  "request_id": "0b7c2f0e-4a43-4c57-9d76-2a1c4c3f11aa",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development")
    ),
    tags(
        (name = "stocks", description = "Stock of named items"),
        (name = "sales", description = "Sales and revenue")
    ),
    paths(
        // Stocks
        crate::handlers::stocks::add_stock,
        crate::handlers::stocks::get_stock,
        crate::handlers::stocks::list_stock,
        crate::handlers::stocks::delete_all,

        // Sales
        crate::handlers::sales::sell_item,
        crate::handlers::sales::total_sales,
        crate::handlers::sales::item_sales,
    ),
    components(
        schemas(
            crate::handlers::stocks::AddStockRequest,
            crate::handlers::sales::SellItemRequest,
            crate::services::StockReceipt,
            crate::services::SaleReceipt,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
