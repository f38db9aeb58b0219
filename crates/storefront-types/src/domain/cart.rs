use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money::line_total;

/// Who a cart belongs to. Resolved once at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    User(Uuid),
    Guest(String),
}

impl CartOwner {
    pub fn kind(&self) -> &'static str {
        match self {
            CartOwner::User(_) => "user",
            CartOwner::Guest(_) => "guest",
        }
    }

    pub fn key(&self) -> String {
        match self {
            CartOwner::User(id) => id.to_string(),
            CartOwner::Guest(id) => id.clone(),
        }
    }

    pub fn from_parts(kind: &str, key: &str) -> anyhow::Result<Self> {
        match kind {
            "user" => Ok(CartOwner::User(Uuid::parse_str(key)?)),
            "guest" => Ok(CartOwner::Guest(key.to_string())),
            other => anyhow::bail!("unknown cart owner kind {other}"),
        }
    }
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.key())
    }
}

/// Identity of a line within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl LineKey {
    pub fn new(product_id: Uuid, size: Option<String>, color: Option<String>) -> Self {
        Self {
            product_id,
            size,
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub image_ref: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl CartLine {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.size.clone(), self.color.clone())
    }

    pub fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    pub fn total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("product not found in cart")]
    LineNotFound,
}

/// A shopping cart. `total_price` is always derived from `lines` and is
/// recomputed after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "CartSnapshot")]
pub struct Cart {
    pub id: Uuid,
    pub owner: CartOwner,
    lines: Vec<CartLine>,
    total_price: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CartSnapshot {
    id: Uuid,
    owner: CartOwner,
    #[serde(default)]
    lines: Vec<CartLine>,
    #[serde(default)]
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartSnapshot> for Cart {
    fn from(s: CartSnapshot) -> Self {
        Cart::restore(s.id, s.owner, s.lines, s.version, s.created_at, s.updated_at)
    }
}

impl Cart {
    pub fn new(owner: CartOwner) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            lines: Vec::new(),
            total_price: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a cart from storage; the total is recomputed, never loaded.
    pub fn restore(
        id: Uuid,
        owner: CartOwner,
        lines: Vec<CartLine>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut cart = Self {
            id,
            owner,
            lines,
            total_price: Decimal::ZERO,
            version,
            created_at,
            updated_at,
        };
        cart.total_price = cart.sum_lines();
        cart
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn find_line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(key))
    }

    /// Adds a line, summing quantities when the (product, size, color)
    /// tuple is already present.
    pub fn add_line(&mut self, line: CartLine) -> Result<(), CartError> {
        if line.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        self.push_or_increment(line);
        self.touch();
        Ok(())
    }

    /// Overwrites a line's quantity; zero or less removes the line.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: i64) -> Result<(), CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.matches(key))
            .ok_or(CartError::LineNotFound)?;
        if quantity <= 0 {
            self.lines.remove(idx);
        } else {
            self.lines[idx].quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        self.touch();
        Ok(())
    }

    pub fn remove_line(&mut self, key: &LineKey) -> Result<CartLine, CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.matches(key))
            .ok_or(CartError::LineNotFound)?;
        let removed = self.lines.remove(idx);
        self.touch();
        Ok(removed)
    }

    /// Folds another cart's lines into this one.
    pub fn absorb(&mut self, lines: impl IntoIterator<Item = CartLine>) {
        for line in lines {
            self.push_or_increment(line);
        }
        self.touch();
    }

    pub fn reassign(&mut self, owner: CartOwner) {
        self.owner = owner;
        self.updated_at = Utc::now();
    }

    fn push_or_increment(&mut self, line: CartLine) {
        match self.lines.iter_mut().find(|l| l.matches(&line.key())) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.lines.push(line),
        }
    }

    fn sum_lines(&self) -> Decimal {
        self.lines.iter().map(CartLine::total).sum()
    }

    fn touch(&mut self) {
        self.total_price = self.sum_lines();
        self.updated_at = Utc::now();
    }
}
