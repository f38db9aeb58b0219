use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::CartLine;
use crate::domain::money::to_minor_units;
use crate::domain::phone;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("shipping address {field} is required");
            }
        }
        if !phone::is_valid(&self.phone) {
            anyhow::bail!("{} is not a valid phone number", self.phone);
        }
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Initiated,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "initiated" => Some(PaymentStatus::Initiated),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Lifecycle position derived from the stored flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Created,
    PaymentInitiated,
    Failed,
    Paid,
    Finalized,
}

/// What the gateway reported when the payment was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub pidx: String,
    pub transaction_id: Option<String>,
    pub gateway_status: String,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub checkout_items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub pidx: Option<String>,
    pub is_finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkout {
    /// Snapshots `items` into a new unpaid checkout. A caller-supplied total
    /// must agree with the items.
    pub fn new(
        user_id: Uuid,
        checkout_items: Vec<CartLine>,
        shipping_address: ShippingAddress,
        payment_method: String,
        claimed_total: Option<Decimal>,
    ) -> anyhow::Result<Self> {
        if checkout_items.is_empty() {
            anyhow::bail!("no items in checkout");
        }
        for it in &checkout_items {
            if it.quantity == 0 {
                anyhow::bail!("item quantity must be > 0");
            }
            if it.unit_price.is_sign_negative() {
                anyhow::bail!("item price must not be negative");
            }
        }
        if payment_method.trim().is_empty() {
            anyhow::bail!("payment_method is required");
        }
        shipping_address.validate()?;

        let total: Decimal = checkout_items.iter().map(CartLine::total).sum();
        if let Some(claimed) = claimed_total {
            if claimed != total {
                anyhow::bail!("total_price {claimed} does not match items total {total}");
            }
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            checkout_items,
            shipping_address,
            payment_method,
            total_price: total,
            is_paid: false,
            paid_at: None,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            pidx: None,
            is_finalized: false,
            finalized_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn state(&self) -> CheckoutState {
        if self.is_finalized {
            CheckoutState::Finalized
        } else if self.is_paid {
            CheckoutState::Paid
        } else if self.payment_status == PaymentStatus::Failed {
            CheckoutState::Failed
        } else if self.pidx.is_some() {
            CheckoutState::PaymentInitiated
        } else {
            CheckoutState::Created
        }
    }

    pub fn amount_minor(&self) -> anyhow::Result<i64> {
        to_minor_units(self.total_price)
            .ok_or_else(|| anyhow::anyhow!("total {} out of range", self.total_price))
    }

    pub fn record_payment_initiated(&mut self, pidx: String) {
        self.pidx = Some(pidx);
        self.payment_status = PaymentStatus::Initiated;
        self.updated_at = Utc::now();
    }

    /// No-op when already paid so a repeated confirmation keeps the first
    /// `paid_at`.
    pub fn record_paid(&mut self, details: PaymentDetails, at: DateTime<Utc>) {
        if self.is_paid {
            return;
        }
        self.is_paid = true;
        self.paid_at = Some(at);
        self.payment_status = PaymentStatus::Paid;
        self.payment_details = Some(details);
        self.updated_at = at;
    }

    pub fn record_failed(&mut self, details: PaymentDetails) {
        if self.is_paid {
            return;
        }
        self.payment_status = PaymentStatus::Failed;
        self.payment_details = Some(details);
        self.updated_at = Utc::now();
    }

    pub fn record_finalized(&mut self, at: DateTime<Utc>) {
        self.is_finalized = true;
        self.finalized_at = Some(at);
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "Thamel Marg 12".into(),
            city: "Kathmandu".into(),
            postal_code: "44600".into(),
            country: "Nepal".into(),
            first_name: "Sita".into(),
            last_name: "Rai".into(),
            phone: "9841234567".into(),
        }
    }

    fn items() -> Vec<CartLine> {
        vec![
            CartLine {
                product_id: Uuid::new_v4(),
                name: "A".into(),
                image_ref: "a.png".into(),
                unit_price: Decimal::from(500),
                quantity: 2,
                size: None,
                color: None,
            },
            CartLine {
                product_id: Uuid::new_v4(),
                name: "B".into(),
                image_ref: "b.png".into(),
                unit_price: Decimal::from(1000),
                quantity: 1,
                size: None,
                color: None,
            },
        ]
    }

    #[test]
    fn new_checkout_computes_total_and_starts_created() {
        let c = Checkout::new(Uuid::new_v4(), items(), address(), "khalti".into(), None).unwrap();
        assert_eq!(c.total_price, Decimal::from(2000));
        assert_eq!(c.amount_minor().unwrap(), 200_000);
        assert_eq!(c.state(), CheckoutState::Created);
        assert!(!c.is_paid);
        assert_eq!(c.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn validation_errors() {
        let user = Uuid::new_v4();
        assert!(Checkout::new(user, vec![], address(), "khalti".into(), None).is_err());

        let mut no_city = address();
        no_city.city = "  ".into();
        assert!(Checkout::new(user, items(), no_city, "khalti".into(), None).is_err());

        let mut bad_phone = address();
        bad_phone.phone = "12-34".into();
        assert!(Checkout::new(user, items(), bad_phone, "khalti".into(), None).is_err());

        let mismatch = Checkout::new(
            user,
            items(),
            address(),
            "khalti".into(),
            Some(Decimal::from(1)),
        );
        assert!(mismatch.is_err());
    }

    #[test]
    fn state_follows_payment_flags() {
        let mut c =
            Checkout::new(Uuid::new_v4(), items(), address(), "khalti".into(), None).unwrap();
        c.record_payment_initiated("pidx-1".into());
        assert_eq!(c.state(), CheckoutState::PaymentInitiated);

        let details = PaymentDetails {
            pidx: "pidx-1".into(),
            transaction_id: Some("tx".into()),
            gateway_status: "Completed".into(),
            amount_minor: 200_000,
        };
        let at = Utc::now();
        c.record_paid(details.clone(), at);
        assert_eq!(c.state(), CheckoutState::Paid);

        c.record_paid(details.clone(), at + chrono::Duration::seconds(5));
        assert_eq!(c.paid_at, Some(at));

        c.record_failed(details);
        assert_eq!(c.payment_status, PaymentStatus::Paid);

        c.record_finalized(Utc::now());
        assert_eq!(c.state(), CheckoutState::Finalized);
    }
}
