use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::CartLine;
use crate::domain::checkout::{Checkout, PaymentDetails, PaymentStatus, ShippingAddress};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Processing" => Some(OrderStatus::Processing),
            "Shipped" => Some(OrderStatus::Shipped),
            "Delivered" => Some(OrderStatus::Delivered),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub checkout_id: Uuid,
    pub order_items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Copies a paid checkout into a new order.
    pub fn from_checkout(checkout: &Checkout) -> anyhow::Result<Self> {
        if !checkout.is_paid {
            anyhow::bail!("checkout {} is not paid", checkout.id);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: checkout.user_id,
            checkout_id: checkout.id,
            order_items: checkout.checkout_items.clone(),
            shipping_address: checkout.shipping_address.clone(),
            payment_method: checkout.payment_method.clone(),
            total_price: checkout.total_price,
            is_paid: true,
            paid_at: checkout.paid_at,
            is_delivered: false,
            delivered_at: None,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Paid,
            payment_details: checkout.payment_details.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_status(&mut self, status: OrderStatus) {
        let now = Utc::now();
        self.status = status;
        if status == OrderStatus::Delivered {
            self.is_delivered = true;
            self.delivered_at = Some(now);
        }
        self.updated_at = now;
    }
}
