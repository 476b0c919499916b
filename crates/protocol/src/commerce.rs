//! Typed commerce inputs
//!
//! These are the shapes the surrounding application hands to the emitter.
//! They are deliberately flat copies of the application models so that the
//! ingestion pipeline never depends on the ORM layer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A completed (or refunded) order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub email: String,
    /// Order total in `currency`
    pub total: f64,
    /// ISO 4217 code (e.g., "USD")
    pub currency: String,
    pub items: Vec<OrderItem>,
    pub status: String,
    pub org_id: String,
}

/// A line item within an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    /// Unit price
    pub price: f64,
}

/// A catalog product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub price: f64,
    pub category: String,
    pub org_id: String,
}

/// A registered user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub org_id: String,
    /// Creation time as supplied by the application (opaque string)
    pub created_at: String,
}

/// A storefront page view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageView {
    pub url: String,
    pub title: String,
    pub referrer: String,
    pub user_id: String,
    pub session_id: String,
    pub org_id: String,
    pub ip: String,
    pub user_agent: String,
    pub language: String,
    pub screen: String,
}

impl Order {
    /// Sum of item quantities
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Line items as JSON objects, in order
    pub fn item_values(&self) -> Vec<Value> {
        self.items.iter().map(OrderItem::to_value).collect()
    }
}

impl OrderItem {
    /// JSON object form used in event properties
    pub fn to_value(&self) -> Value {
        json!({
            "product_id": self.product_id,
            "product_name": self.product_name,
            "sku": self.sku,
            "quantity": self.quantity,
            "price": self.price,
        })
    }
}

impl PageView {
    /// Identifier to attribute the view to: the user, or the session when anonymous
    pub fn distinct_id(&self) -> &str {
        if self.user_id.is_empty() {
            &self.session_id
        } else {
            &self.user_id
        }
    }
}
