use metrics::{counter, histogram};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DbBackend, EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    entities::{item, sales, Item, Sales},
    errors::ServiceError,
    services::{
        locks::ItemLocks,
        validation::{ItemName, Price, Quantity},
    },
};

/// Stock added by a single request
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StockReceipt {
    #[schema(example = "APPLE")]
    pub name: String,
    /// Units added by this request, not the new total
    #[schema(example = 5)]
    pub amount: i32,
}

/// A completed sale
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SaleReceipt {
    #[schema(example = "APPLE")]
    pub name: String,
    #[schema(example = 2)]
    pub amount: i32,
    /// Unit price, echoed as sent
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>, example = 3)]
    pub price: Option<Value>,
}

/// Input to [`InventoryService::sell_item`]
#[derive(Debug, Clone)]
pub struct SaleCommand {
    /// Looked up as-is; sales do not validate the name format
    pub name: String,
    pub amount: Quantity,
    pub price: Option<Price>,
}

/// Stock keeping and revenue accounting over the `items` and `sales` tables
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    locks: ItemLocks,
}

impl InventoryService {
    /// SQLite admits one write transaction at a time, so there every
    /// mutation is serialized rather than only those on the same item.
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let locks = match db.get_database_backend() {
            DbBackend::Sqlite => ItemLocks::single_writer(),
            _ => ItemLocks::new(),
        };
        Self { db, locks }
    }

    /// Adds units to an item, creating it on first sight
    #[instrument(skip(self), fields(name = %name, amount = amount.get()))]
    pub async fn add_stock(
        &self,
        name: ItemName,
        amount: Quantity,
    ) -> Result<StockReceipt, ServiceError> {
        let start = Instant::now();
        let _guard = self.locks.lock_item(name.as_str()).await;

        let txn = self.db.begin().await?;
        match find_item(&txn, name.as_str()).await? {
            Some(existing) => {
                let total = existing.amount.checked_add(amount.get()).ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "stock of {} would exceed {}",
                        name,
                        i32::MAX
                    ))
                })?;
                let mut active: item::ActiveModel = existing.into();
                active.amount = Set(total);
                active.update(&txn).await?;
                debug!(total, "Incremented existing item");
            }
            None => {
                item::ActiveModel {
                    name: Set(name.as_str().to_string()),
                    amount: Set(amount.get()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                debug!("Created new item");
            }
        }
        txn.commit().await?;

        counter!("inventory.stock.added", 1);
        histogram!("inventory.stock.add_duration", start.elapsed());
        info!("Stock added");

        Ok(StockReceipt {
            name: name.into_inner(),
            amount: amount.get(),
        })
    }

    /// Current amount of an item; zero for names never stocked
    #[instrument(skip(self))]
    pub async fn get_stock(&self, name: &str) -> Result<i32, ServiceError> {
        Ok(find_item(&*self.db, name)
            .await?
            .map(|item| item.amount)
            .unwrap_or(0))
    }

    /// Every known item and its amount, ordered by name
    #[instrument(skip(self))]
    pub async fn list_stock(&self) -> Result<BTreeMap<String, i32>, ServiceError> {
        let items = Item::find().all(&*self.db).await?;
        debug!(count = items.len(), "Listed stock");
        Ok(items
            .into_iter()
            .map(|item| (item.name, item.amount))
            .collect())
    }

    /// Sells units of an item, booking revenue when a price is given
    #[instrument(skip(self), fields(name = %sale.name, amount = sale.amount.get()))]
    pub async fn sell_item(&self, sale: SaleCommand) -> Result<SaleReceipt, ServiceError> {
        let start = Instant::now();
        let _guard = self.locks.lock_item(&sale.name).await;
        let requested = sale.amount.get();

        let txn = self.db.begin().await?;
        let Some(existing) = find_item(&txn, &sale.name).await? else {
            counter!("inventory.sales.rejected", 1);
            return Err(match sale.price {
                Some(_) => ServiceError::NotFound(sale.name),
                None => ServiceError::InsufficientStock(format!(
                    "{} is not in stock",
                    sale.name
                )),
            });
        };

        let unit_price = match &sale.price {
            Some(price) => match price.unit_value().and_then(|value| {
                check_revenue(value * f64::from(requested)).map(|_| value)
            }) {
                Ok(value) => Some(value),
                Err(e) => {
                    counter!("inventory.sales.rejected", 1);
                    return Err(e);
                }
            },
            None => None,
        };

        if existing.amount < requested {
            warn!(
                on_hand = existing.amount,
                requested, "Sale rejected for insufficient stock"
            );
            counter!("inventory.sales.rejected", 1);
            return Err(ServiceError::InsufficientStock(format!(
                "not enough stock available for {}: {} on hand, {} requested",
                sale.name, existing.amount, requested
            )));
        }

        let item_id = existing.id;
        let remaining = existing.amount - requested;
        let mut active: item::ActiveModel = existing.into();
        active.amount = Set(remaining);
        active.update(&txn).await?;

        if let Some(unit_price) = unit_price {
            let revenue = unit_price * f64::from(requested);
            book_revenue(&txn, item_id, revenue).await?;
            debug!(revenue, "Booked revenue");
        }
        txn.commit().await?;

        counter!("inventory.sales.completed", 1);
        histogram!("inventory.sales.duration", start.elapsed());
        info!(remaining, "Sale completed");

        Ok(SaleReceipt {
            name: sale.name,
            amount: requested,
            price: sale.price.map(|p| p.as_json().clone()),
        })
    }

    /// Revenue summed over every item
    #[instrument(skip(self))]
    pub async fn total_sales(&self) -> Result<f64, ServiceError> {
        let total = Sales::find()
            .select_only()
            .column_as(Expr::col(sales::Column::Sales).sum(), "total")
            .into_tuple::<Option<f64>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or(0.0);
        Ok(total)
    }

    /// Revenue booked for one item; zero when it has none
    #[instrument(skip(self))]
    pub async fn item_sales(&self, name: &str) -> Result<f64, ServiceError> {
        let Some(existing) = find_item(&*self.db, name).await? else {
            return Ok(0.0);
        };
        Ok(find_sales(&*self.db, existing.id)
            .await?
            .map(|row| row.sales)
            .unwrap_or(0.0))
    }

    /// Removes every sales row and then every item
    #[instrument(skip(self))]
    pub async fn delete_all(&self) -> Result<(), ServiceError> {
        let _guard = self.locks.lock_all().await;

        let txn = self.db.begin().await?;
        let sales_removed = Sales::delete_many().exec(&txn).await?.rows_affected;
        let items_removed = Item::delete_many().exec(&txn).await?.rows_affected;
        txn.commit().await?;

        counter!("inventory.wipes", 1);
        info!(sales_removed, items_removed, "Inventory wiped");
        Ok(())
    }
}

/// Looks an item up by exact, case-sensitive name.
///
/// The SQL filter narrows candidates; the byte comparison decides, since some
/// collations compare names case-insensitively.
async fn find_item<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<Option<item::Model>, ServiceError> {
    let candidates = Item::find()
        .filter(item::Column::Name.eq(name))
        .all(conn)
        .await?;
    Ok(candidates.into_iter().find(|candidate| candidate.name == name))
}

fn check_revenue(revenue: f64) -> Result<f64, ServiceError> {
    if revenue.is_finite() {
        Ok(revenue)
    } else {
        Err(ServiceError::InvalidPrice(
            "revenue exceeds the representable range".to_string(),
        ))
    }
}

async fn find_sales<C: ConnectionTrait>(
    conn: &C,
    item_id: i32,
) -> Result<Option<sales::Model>, ServiceError> {
    Ok(Sales::find()
        .filter(sales::Column::ItemId.eq(item_id))
        .one(conn)
        .await?)
}

async fn book_revenue<C: ConnectionTrait>(
    conn: &C,
    item_id: i32,
    revenue: f64,
) -> Result<(), ServiceError> {
    match find_sales(conn, item_id).await? {
        Some(row) => {
            let total = check_revenue(row.sales + revenue)?;
            let mut active: sales::ActiveModel = row.into();
            active.sales = Set(total);
            active.update(conn).await?;
        }
        None => {
            sales::ActiveModel {
                item_id: Set(item_id),
                sales: Set(revenue),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;
    use serde_json::json;

    async fn service() -> InventoryService {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = establish_connection_with_config(&config).await.unwrap();
        run_migrations(&db).await.unwrap();
        InventoryService::new(Arc::new(db))
    }

    fn name(raw: &str) -> ItemName {
        ItemName::parse(raw).unwrap()
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn sale(raw: &str, n: i64, price: Option<Value>) -> SaleCommand {
        SaleCommand {
            name: raw.to_string(),
            amount: qty(n),
            price: Price::from_json(price),
        }
    }

    #[tokio::test]
    async fn adding_twice_accumulates() {
        let svc = service().await;
        let receipt = svc.add_stock(name("APPLE"), qty(5)).await.unwrap();
        assert_eq!(receipt.amount, 5);
        svc.add_stock(name("APPLE"), qty(3)).await.unwrap();

        assert_eq!(svc.get_stock("APPLE").await.unwrap(), 8);
        assert_eq!(svc.list_stock().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_item_has_zero_stock_and_sales() {
        let svc = service().await;
        assert_eq!(svc.get_stock("NOPE").await.unwrap(), 0);
        assert_eq!(svc.item_sales("NOPE").await.unwrap(), 0.0);
        assert_eq!(svc.total_sales().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let svc = service().await;
        svc.add_stock(name("APPLE"), qty(2)).await.unwrap();
        svc.add_stock(name("apple"), qty(7)).await.unwrap();

        let stock = svc.list_stock().await.unwrap();
        assert_eq!(stock.get("APPLE"), Some(&2));
        assert_eq!(stock.get("apple"), Some(&7));
    }

    #[tokio::test]
    async fn priced_sale_books_revenue_and_accumulates() {
        let svc = service().await;
        svc.add_stock(name("APPLE"), qty(5)).await.unwrap();

        let receipt = svc.sell_item(sale("APPLE", 2, Some(json!(3)))).await.unwrap();
        assert_eq!(receipt.price, Some(json!(3)));
        svc.sell_item(sale("APPLE", 1, Some(json!(1.5)))).await.unwrap();

        assert_eq!(svc.get_stock("APPLE").await.unwrap(), 2);
        assert_eq!(svc.item_sales("APPLE").await.unwrap(), 7.5);
        assert_eq!(svc.total_sales().await.unwrap(), 7.5);
    }

    #[tokio::test]
    async fn unpriced_sale_only_moves_stock() {
        let svc = service().await;
        svc.add_stock(name("PEAR"), qty(4)).await.unwrap();
        let receipt = svc.sell_item(sale("PEAR", 4, None)).await.unwrap();

        assert_eq!(receipt.price, None);
        assert_eq!(svc.get_stock("PEAR").await.unwrap(), 0);
        assert_eq!(svc.item_sales("PEAR").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn missing_item_error_depends_on_price() {
        let svc = service().await;
        assert_matches!(
            svc.sell_item(sale("GHOST", 1, None)).await,
            Err(ServiceError::InsufficientStock(_))
        );
        assert_matches!(
            svc.sell_item(sale("GHOST", 1, Some(json!(-1)))).await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn invalid_price_is_checked_before_stock() {
        let svc = service().await;
        svc.add_stock(name("APPLE"), qty(1)).await.unwrap();

        assert_matches!(
            svc.sell_item(sale("APPLE", 10, Some(json!(0)))).await,
            Err(ServiceError::InvalidPrice(_))
        );
        assert_matches!(
            svc.sell_item(sale("APPLE", 10, Some(json!(2)))).await,
            Err(ServiceError::InsufficientStock(_))
        );
        assert_eq!(svc.get_stock("APPLE").await.unwrap(), 1);
        assert_eq!(svc.total_sales().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn overflowing_revenue_is_rejected() {
        let svc = service().await;
        svc.add_stock(name("APPLE"), qty(4)).await.unwrap();

        assert_matches!(
            svc.sell_item(sale("APPLE", 2, Some(json!(1e308)))).await,
            Err(ServiceError::InvalidPrice(_))
        );
        assert_eq!(svc.get_stock("APPLE").await.unwrap(), 4);

        svc.sell_item(sale("APPLE", 1, Some(json!(1.5e308)))).await.unwrap();
        assert_matches!(
            svc.sell_item(sale("APPLE", 1, Some(json!(1.5e308)))).await,
            Err(ServiceError::InvalidPrice(_))
        );
        assert_eq!(svc.get_stock("APPLE").await.unwrap(), 3);
        assert_eq!(svc.total_sales().await.unwrap(), 1.5e308);
    }

    #[tokio::test]
    async fn delete_all_empties_both_tables() {
        let svc = service().await;
        svc.add_stock(name("APPLE"), qty(5)).await.unwrap();
        svc.sell_item(sale("APPLE", 1, Some(json!(2)))).await.unwrap();

        svc.delete_all().await.unwrap();

        assert!(svc.list_stock().await.unwrap().is_empty());
        assert_eq!(svc.total_sales().await.unwrap(), 0.0);
    }
}
