//! Orders with their lines, and order placement against the inventory.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use shared::{Customer, Item, Order, OrderLine, Record, Table};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::identifier::next_record_identifier;
use super::ordering::{search_records, sort_records};
use crate::storage::connection::{decode_rows, encode_records};
use crate::storage::{Storage, StorageBackend, StorageResult};

/// Date format of orders placed by the system
pub const ORDER_DATE_FORMAT: &str = "%d/%m/%Y";

pub fn format_order_date(date: NaiveDate) -> String {
    date.format(ORDER_DATE_FORMAT).to_string()
}

/// Requested quantity of one inventory item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub item_id: i64,
    pub quantity: i64,
}

pub struct OrderService {
    storage: Storage,
    orders: Vec<Order>,
}

impl OrderService {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            orders: Vec::new(),
        }
    }

    /// Read orders and their lines through one handle and join them
    pub fn load(&mut self) -> Result<()> {
        let (order_rows, line_rows) = self
            .storage
            .session(|backend| -> StorageResult<_> {
                let orders = backend.read_all(Table::Orders)?;
                let lines = backend.read_all(Table::OrdersItem)?;
                Ok((orders, lines))
            })
            .context("Failed to load orders")?;

        let orders: Vec<Order> = decode_rows(&order_rows).context("Failed to read Orders")?;
        let lines: Vec<OrderLine> = decode_rows(&line_rows).context("Failed to read OrdersItem")?;

        self.orders = orders
            .into_iter()
            .map(|order| order.with_lines(lines.iter().cloned()))
            .collect();

        let orphans = lines
            .iter()
            .filter(|line| !self.orders.iter().any(|order| order.id == line.order_id))
            .count();
        if orphans > 0 {
            warn!("{} order lines belong to no known order", orphans);
        }

        debug!("Loaded {} orders with {} lines", self.orders.len(), lines.len());
        Ok(())
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, id: i64) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    pub fn next_id(&self) -> i64 {
        next_record_identifier(&self.orders)
    }

    /// Place a new order dated `date` for `customer_id`.
    ///
    /// Every requested item must exist with enough stock. The order and its
    /// lines are inserted and the inventory is saved with the stock taken off,
    /// all through one handle.
    pub fn place_order(
        &mut self,
        customer_id: i64,
        requests: &[LineRequest],
        date: NaiveDate,
    ) -> Result<Order> {
        if let Some(request) = requests.iter().find(|request| request.quantity <= 0) {
            bail!(
                "Quantity for item {} must be positive, got {}",
                request.item_id,
                request.quantity
            );
        }

        let order_id = self.next_id();
        let mut order = Order::new(order_id, format_order_date(date), customer_id);
        order.lines = merge_requests(order_id, requests);
        if !order.is_complete() {
            bail!("An order needs a known customer and at least one item");
        }

        self.storage
            .session(|backend| -> Result<()> {
                let stored: Vec<Order> = decode_rows(&backend.read_all(Table::Orders)?)?;
                if stored.iter().any(|existing| existing.id == order_id) {
                    bail!("Order {} is already stored; reload before placing orders", order_id);
                }

                let customers: Vec<Customer> = decode_rows(&backend.read_all(Table::Customers)?)?;
                if !customers.iter().any(|customer| customer.id == customer_id) {
                    bail!("Unknown customer {}", customer_id);
                }

                let mut inventory: Vec<Item> = decode_rows(&backend.read_all(Table::Inventory)?)?;
                take_stock(&mut inventory, &order.lines)?;

                backend.insert_one(Table::Orders, &order.attributes())?;
                for line in &order.lines {
                    backend.insert_one(Table::OrdersItem, &line.attributes())?;
                }
                backend.replace_all(Table::Inventory, &encode_records(&inventory))?;
                Ok(())
            })
            .with_context(|| format!("Failed to place order {}", order_id))?;

        info!(
            "Placed order {} for customer {} with {} lines",
            order.id,
            customer_id,
            order.lines.len()
        );
        self.orders.push(order.clone());
        Ok(order)
    }

    /// Place an order dated today
    pub fn place_order_today(
        &mut self,
        customer_id: i64,
        requests: &[LineRequest],
    ) -> Result<Order> {
        let today = chrono::Local::now().date_naive();
        self.place_order(customer_id, requests, today)
    }

    /// Remove an order and its lines; returns whether it existed
    pub fn delete_order(&mut self, id: i64) -> Result<bool> {
        if self.get(id).is_none() {
            debug!("No order {} to delete", id);
            return Ok(false);
        }

        self.storage
            .session(|backend| {
                backend.delete_one(Table::Orders, id)?;
                backend.delete_one(Table::OrdersItem, id)
            })
            .with_context(|| format!("Failed to delete order {}", id))?;

        self.orders.retain(|order| order.id != id);
        info!("Deleted order {}", id);
        Ok(true)
    }

    /// Net value of an order at current inventory prices
    pub fn net_total(&self, id: i64) -> Result<f64> {
        let order = self.get(id).ok_or_else(|| anyhow!("Unknown order {}", id))?;
        let inventory = self
            .storage
            .read_records::<Item>()
            .context("Failed to load inventory")?;
        Ok(order.net_total(&inventory))
    }

    pub fn sorted_by(&self, column: usize) -> Result<Vec<Order>> {
        Ok(sort_records(&self.orders, column)?)
    }

    pub fn search(&self, column: usize, query: &str) -> Result<Vec<Order>> {
        Ok(search_records(&self.orders, column, query)?)
    }
}

/// One line per distinct item, quantities summed, in first-requested order
fn merge_requests(order_id: i64, requests: &[LineRequest]) -> Vec<OrderLine> {
    let mut lines: Vec<OrderLine> = Vec::new();
    for request in requests {
        match lines.iter_mut().find(|line| line.item_id == request.item_id) {
            Some(line) => line.quantity += request.quantity,
            None => lines.push(OrderLine {
                order_id,
                item_id: request.item_id,
                quantity: request.quantity,
            }),
        }
    }
    lines
}

/// Decrement stock for each line, failing without changes if any item is short
fn take_stock(inventory: &mut [Item], lines: &[OrderLine]) -> Result<()> {
    let mut positions = HashMap::new();
    for line in lines {
        let position = inventory
            .iter()
            .position(|item| item.id == line.item_id)
            .ok_or_else(|| anyhow!("Unknown item {}", line.item_id))?;
        let item = &inventory[position];
        if item.stock < line.quantity {
            bail!(
                "Not enough stock of item {} ({}): {} requested, {} available",
                item.id,
                item.name,
                line.quantity,
                item.stock
            );
        }
        positions.insert(position, line.quantity);
    }

    for (position, quantity) in positions {
        inventory[position].stock -= quantity;
    }
    Ok(())
}
