use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockroom_backend::config::{self, AppConfig};
use stockroom_backend::domain::{CustomerService, InventoryService, OrderService};
use stockroom_backend::storage::Storage;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = config::resolve_config_path(
        std::env::args().nth(1),
        std::env::var(config::CONFIG_PATH_ENV).ok(),
    );
    let config = AppConfig::load(&config_path)?;
    let storage = Storage::new(&config);
    info!("Using {} storage ({})", storage.kind(), storage.kind().backend_kind());

    // Opening once bootstraps the tables and proves the store is reachable
    storage
        .session(|_| Ok::<_, stockroom_backend::StorageError>(()))
        .context("Storage is unavailable")?;

    let mut customers = CustomerService::new(storage.clone());
    customers.load()?;
    let mut inventory = InventoryService::new(storage.clone());
    inventory.load()?;
    let mut orders = OrderService::new(storage);
    orders.load()?;

    info!(
        "{} customers, {} inventory items, {} orders",
        customers.records().len(),
        inventory.records().len(),
        orders.orders().len()
    );
    Ok(())
}
