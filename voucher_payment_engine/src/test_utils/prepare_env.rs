use std::path::Path;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{NewProduct, Product, Rupiah},
    traits::InventoryManagement,
    SqliteDatabase,
};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/vpg_test_store_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    db.pool().close().await;
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        trace!("Could not drop database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Creates a product with `count` stock items whose codes are `{prefix}-0`, `{prefix}-1`, …
pub async fn seed_product(db: &SqliteDatabase, prefix: &str, price: i64, count: usize) -> Product {
    let product = db.insert_product(NewProduct::new(format!("{prefix} voucher"), Rupiah::from(price))).await.unwrap();
    let codes = (0..count).map(|i| format!("{prefix}-{i}")).collect::<Vec<String>>();
    db.add_stock(product.id, &codes).await.unwrap();
    product
}
