use crate::{
    db_types::{NewProduct, Product, ReservationQueueEntry, StockItem, StockSummary},
    traits::StorageError,
};

/// Read access to the product catalogue and the stock pool, plus the small amount of seeding that admin tooling needs.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StorageError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorageError>;

    /// Returns `false` if the product does not exist.
    async fn set_product_active(&self, product_id: i64, active: bool) -> Result<bool, StorageError>;

    /// Adds new `ready` stock items for the product. Codes must be globally unique.
    async fn add_stock(&self, product_id: i64, codes: &[String]) -> Result<Vec<StockItem>, StorageError>;

    async fn fetch_stock_items(&self, product_id: i64) -> Result<Vec<StockItem>, StorageError>;

    async fn stock_summary(&self, product_id: i64) -> Result<StockSummary, StorageError>;

    async fn fetch_queue_entries(&self, order_id: i64) -> Result<Vec<ReservationQueueEntry>, StorageError>;
}
