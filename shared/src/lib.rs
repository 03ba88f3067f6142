use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A single raw cell exchanged with a storage backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
}

/// A raw field tuple in the table's column order
pub type Row = Vec<Value>;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Real(value) => write!(f, "{:.2}", value),
            Value::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Text,
    Real,
}

impl ColumnType {
    /// SQL type name used when creating the table
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Text => "text",
            ColumnType::Real => "real",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

const fn column(name: &'static str, kind: ColumnType) -> Column {
    Column { name, kind }
}

const CUSTOMER_COLUMNS: [Column; 5] = [
    column("CustomerID", ColumnType::Integer),
    column("Firstname", ColumnType::Text),
    column("Surname", ColumnType::Text),
    column("Contact", ColumnType::Text),
    column("Address", ColumnType::Text),
];

const INVENTORY_COLUMNS: [Column; 6] = [
    column("ItemID", ColumnType::Integer),
    column("Brand", ColumnType::Text),
    column("Type", ColumnType::Text),
    column("Name", ColumnType::Text),
    column("Price", ColumnType::Real),
    column("Stock", ColumnType::Integer),
];

const ORDER_COLUMNS: [Column; 3] = [
    column("OrderID", ColumnType::Integer),
    column("Date", ColumnType::Text),
    column("CustomerID", ColumnType::Integer),
];

const ORDER_LINE_COLUMNS: [Column; 3] = [
    column("OrderID", ColumnType::Integer),
    column("ItemID", ColumnType::Integer),
    column("Quantity", ColumnType::Integer),
];

/// Logical tables known to every storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Customers,
    Inventory,
    Orders,
    OrdersItem,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Orders,
        Table::OrdersItem,
        Table::Inventory,
        Table::Customers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Customers => "Customers",
            Table::Inventory => "Inventory",
            Table::Orders => "Orders",
            Table::OrdersItem => "OrdersItem",
        }
    }

    /// Fixed column list, identifier first
    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::Customers => &CUSTOMER_COLUMNS,
            Table::Inventory => &INVENTORY_COLUMNS,
            Table::Orders => &ORDER_COLUMNS,
            Table::OrdersItem => &ORDER_LINE_COLUMNS,
        }
    }

    /// Column used by delete-by-identifier
    pub fn key_column(&self) -> &'static Column {
        &self.columns()[0]
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|table| table.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RecordError::UnknownTable(s.to_string()))
    }
}

/// Errors raised while building records from raw values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("{table}.{column}: cannot read '{value}' as {expected}")]
    TypeMismatch {
        table: Table,
        column: &'static str,
        value: String,
        expected: ColumnType,
    },
    #[error("{table}: expected {expected} fields, found {found}")]
    FieldCount {
        table: Table,
        expected: usize,
        found: usize,
    },
    #[error("{table} has no column at position {index}")]
    UnknownColumn { table: Table, index: usize },
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("{table}: identifier {id} is not a positive integer")]
    InvalidIdentifier { table: Table, id: i64 },
    #[error("{table}: key {key} appears more than once")]
    DuplicateKey { table: Table, key: String },
}

impl RecordError {
    /// Key parts are joined with `/`, e.g. `1/2` for an order line
    pub fn duplicate_key(table: Table, key: &[i64]) -> Self {
        let key = key.iter().map(i64::to_string).collect::<Vec<_>>().join("/");
        RecordError::DuplicateKey { table, key }
    }
}

/// Typed view over a raw row of one table
///
/// Coercion follows the column's declared type:
/// - integer columns take integers or text holding a base-10 integer
/// - real columns take integers, reals or text holding a number
/// - text columns take anything, using its display form
pub struct RowReader<'a> {
    table: Table,
    row: &'a [Value],
}

impl<'a> RowReader<'a> {
    pub fn new(table: Table, row: &'a [Value]) -> Result<Self, RecordError> {
        let expected = table.columns().len();
        if row.len() != expected {
            return Err(RecordError::FieldCount {
                table,
                expected,
                found: row.len(),
            });
        }
        Ok(Self { table, row })
    }

    fn mismatch(&self, index: usize) -> RecordError {
        let column = self.table.columns()[index];
        RecordError::TypeMismatch {
            table: self.table,
            column: column.name,
            value: self.row[index].to_string(),
            expected: column.kind,
        }
    }

    /// A key or reference column: an integer greater than zero
    pub fn identifier(&self, index: usize) -> Result<i64, RecordError> {
        let value = self.integer(index)?;
        if value > 0 {
            Ok(value)
        } else {
            Err(self.mismatch(index))
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64, RecordError> {
        match &self.row[index] {
            Value::Integer(value) => Ok(*value),
            Value::Text(text) => text.trim().parse().map_err(|_| self.mismatch(index)),
            Value::Real(_) => Err(self.mismatch(index)),
        }
    }

    pub fn real(&self, index: usize) -> Result<f64, RecordError> {
        let value = match &self.row[index] {
            Value::Integer(value) => *value as f64,
            Value::Real(value) => *value,
            Value::Text(text) => text.trim().parse().map_err(|_| self.mismatch(index))?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(self.mismatch(index))
        }
    }

    pub fn text(&self, index: usize) -> String {
        match &self.row[index] {
            Value::Text(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// A typed, self-validating entry of one logical table
pub trait Record: Sized + Clone {
    const TABLE: Table;

    /// Build the record from a raw row, rejecting it whole on any bad field
    fn from_row(row: &[Value]) -> Result<Self, RecordError>;

    /// Fixed-order attribute tuple used for storage, comparison and display
    fn attributes(&self) -> Row;

    fn id(&self) -> i64;

    /// Identifiers that must be unique together within the table
    fn key(&self) -> Vec<i64> {
        vec![self.id()]
    }
}

/// Check that every record has positive identifiers and no two share a key
pub fn validate_keys<R: Record>(records: &[R]) -> Result<(), RecordError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        let key = record.key();
        if let Some(id) = key.iter().copied().find(|id| *id <= 0) {
            return Err(RecordError::InvalidIdentifier { table: R::TABLE, id });
        }
        if !seen.insert(key) {
            return Err(RecordError::duplicate_key(R::TABLE, &record.key()));
        }
    }
    Ok(())
}

/// Round a monetary amount to two decimals
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub firstname: String,
    pub surname: String,
    pub contact: String,
    pub address: String,
}

impl Record for Customer {
    const TABLE: Table = Table::Customers;

    fn from_row(row: &[Value]) -> Result<Self, RecordError> {
        let reader = RowReader::new(Self::TABLE, row)?;
        Ok(Self {
            id: reader.identifier(0)?,
            firstname: reader.text(1),
            surname: reader.text(2),
            contact: reader.text(3),
            address: reader.text(4),
        })
    }

    fn attributes(&self) -> Row {
        vec![
            Value::Integer(self.id),
            Value::Text(self.firstname.clone()),
            Value::Text(self.surname.clone()),
            Value::Text(self.contact.clone()),
            Value::Text(self.address.clone()),
        ]
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Inventory item; price is kept as entered and rounded on export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub brand: String,
    pub kind: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

impl Record for Item {
    const TABLE: Table = Table::Inventory;

    fn from_row(row: &[Value]) -> Result<Self, RecordError> {
        let reader = RowReader::new(Self::TABLE, row)?;
        Ok(Self {
            id: reader.identifier(0)?,
            brand: reader.text(1),
            kind: reader.text(2),
            name: reader.text(3),
            price: reader.real(4)?,
            stock: reader.integer(5)?,
        })
    }

    fn attributes(&self) -> Row {
        vec![
            Value::Integer(self.id),
            Value::Text(self.brand.clone()),
            Value::Text(self.kind.clone()),
            Value::Text(self.name.clone()),
            Value::Real(round_money(self.price)),
            Value::Integer(self.stock),
        ]
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// One line of an order: a quantity of one inventory item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: i64,
    pub item_id: i64,
    pub quantity: i64,
}

impl Record for OrderLine {
    const TABLE: Table = Table::OrdersItem;

    fn from_row(row: &[Value]) -> Result<Self, RecordError> {
        let reader = RowReader::new(Self::TABLE, row)?;
        Ok(Self {
            order_id: reader.identifier(0)?,
            item_id: reader.identifier(1)?,
            quantity: reader.integer(2)?,
        })
    }

    fn attributes(&self) -> Row {
        vec![
            Value::Integer(self.order_id),
            Value::Integer(self.item_id),
            Value::Integer(self.quantity),
        ]
    }

    /// Lines are identified by their item within the owning order
    fn id(&self) -> i64 {
        self.item_id
    }

    fn key(&self) -> Vec<i64> {
        vec![self.order_id, self.item_id]
    }
}

/// Customer order; its lines live in the OrdersItem table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Order date as entered, `DD/MM/YYYY` for orders placed by the system
    pub date: String,
    pub customer_id: i64,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn new(id: i64, date: impl Into<String>, customer_id: i64) -> Self {
        Self {
            id,
            date: date.into(),
            customer_id,
            lines: Vec::new(),
        }
    }

    /// Attach the lines belonging to this order, ignoring any for other orders
    pub fn with_lines(mut self, lines: impl IntoIterator<Item = OrderLine>) -> Self {
        let id = self.id;
        self.lines
            .extend(lines.into_iter().filter(|line| line.order_id == id));
        self
    }

    /// An order can be stored once it has a date, a customer and at least one line
    pub fn is_complete(&self) -> bool {
        self.id > 0
            && !self.date.trim().is_empty()
            && self.customer_id > 0
            && !self.lines.is_empty()
    }

    /// Sum of price times quantity over the lines, rounded to two decimals at each step.
    /// Lines whose item is missing from `inventory` contribute nothing.
    pub fn net_total(&self, inventory: &[Item]) -> f64 {
        self.lines.iter().fold(0.0, |net, line| {
            match inventory.iter().find(|item| item.id == line.item_id) {
                Some(item) => round_money(net + round_money(item.price * line.quantity as f64)),
                None => net,
            }
        })
    }
}

impl Record for Order {
    const TABLE: Table = Table::Orders;

    fn from_row(row: &[Value]) -> Result<Self, RecordError> {
        let reader = RowReader::new(Self::TABLE, row)?;
        Ok(Self {
            id: reader.identifier(0)?,
            date: reader.text(1),
            customer_id: reader.identifier(2)?,
            lines: Vec::new(),
        })
    }

    fn attributes(&self) -> Row {
        vec![
            Value::Integer(self.id),
            Value::Text(self.date.clone()),
            Value::Integer(self.customer_id),
        ]
    }

    fn id(&self) -> i64 {
        self.id
    }
}
