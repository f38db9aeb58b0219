use crate::errors::AppError;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_types::domain::cart::{CartLine, CartOwner};
use storefront_types::domain::checkout::{Checkout, PaymentDetails, ShippingAddress};
use storefront_types::domain::order::Order;
use storefront_types::domain::phone;
use storefront_types::ports::checkout_repository::FinalizeOutcome;
use storefront_types::ports::payment_gateway::{
    CustomerInfo, GatewayStatus, PaymentGateway, PaymentLookup, PaymentRequest, PaymentSession,
};
use storefront_types::ports::Store;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCheckout {
    /// When absent the caller's cart is snapshotted.
    #[serde(default)]
    pub checkout_items: Option<Vec<CartLine>>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub checkout: Checkout,
    pub paid: bool,
    pub gateway_status: String,
}

/// Where the payer lands after the gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success { order_id: Uuid },
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub pidx: Option<String>,
    pub purchase_order_id: Option<String>,
}

pub struct CheckoutService<R: Store, G: PaymentGateway> {
    repo: Arc<R>,
    gateway: Arc<G>,
}

impl<R: Store, G: PaymentGateway> CheckoutService<R, G> {
    pub fn new(repo: Arc<R>, gateway: Arc<G>) -> Self {
        Self { repo, gateway }
    }

    pub async fn create_checkout(&self, user_id: Uuid, req: NewCheckout) -> Result<Checkout, AppError> {
        let items = match req.checkout_items {
            Some(items) => items,
            None => self
                .repo
                .find_cart(&CartOwner::User(user_id))
                .await?
                .map(|cart| cart.lines().to_vec())
                .unwrap_or_default(),
        };
        let checkout = Checkout::new(
            user_id,
            items,
            req.shipping_address,
            req.payment_method,
            req.total_price,
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let checkout = self.repo.create_checkout(checkout).await?;
        tracing::info!(
            checkout_id = %checkout.id,
            %user_id,
            total = %checkout.total_price,
            "checkout created"
        );
        Ok(checkout)
    }

    /// Checkouts of other users are reported as missing.
    pub async fn get_checkout(&self, user_id: Uuid, id: Uuid) -> Result<Checkout, AppError> {
        match self.repo.get_checkout(id).await? {
            Some(c) if c.user_id == user_id => Ok(c),
            _ => Err(AppError::NotFound(format!("checkout {}", id))),
        }
    }

    pub async fn initiate_payment(&self, user_id: Uuid, id: Uuid) -> Result<PaymentSession, AppError> {
        let checkout = self.get_checkout(user_id, id).await?;
        if checkout.is_paid {
            return Err(AppError::Conflict("checkout is already paid".into()));
        }
        let customer = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
        let phone = phone::normalize(&checkout.shipping_address.phone)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let amount = checkout.amount_minor()?;

        let request = PaymentRequest {
            amount,
            purchase_order_id: checkout.id.to_string(),
            purchase_order_name: format!("Order {}", checkout.id),
            customer_info: CustomerInfo {
                name: checkout.shipping_address.full_name(),
                email: customer.email,
                phone,
            },
        };
        let session = self.gateway.initiate(request).await.map_err(|e| {
            tracing::warn!(checkout_id = %checkout.id, error = %e, "payment initiation failed");
            AppError::from(e)
        })?;

        self.repo
            .record_payment_initiated(checkout.id, &session.pidx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("checkout {}", checkout.id)))?;
        tracing::info!(checkout_id = %checkout.id, amount, pidx = %session.pidx, "payment initiated");
        Ok(session)
    }

    /// Asks the gateway for the authoritative state of `pidx` and records it.
    pub async fn confirm_payment(&self, pidx: &str) -> Result<PaymentConfirmation, AppError> {
        let checkout = self
            .repo
            .find_checkout_by_pidx(pidx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no checkout for pidx {}", pidx)))?;
        let lookup = self.gateway.lookup(pidx).await.map_err(|e| {
            tracing::warn!(checkout_id = %checkout.id, error = %e, "payment lookup failed");
            AppError::from(e)
        })?;
        self.apply_lookup(checkout, lookup).await
    }

    /// Client-driven confirmation; only the checkout's owner may ask.
    pub async fn verify_payment(&self, user_id: Uuid, pidx: &str) -> Result<PaymentConfirmation, AppError> {
        match self.repo.find_checkout_by_pidx(pidx).await? {
            Some(c) if c.user_id == user_id => self.confirm_payment(pidx).await,
            _ => Err(AppError::NotFound(format!("no checkout for pidx {}", pidx))),
        }
    }

    pub async fn finalize(&self, user_id: Uuid, id: Uuid) -> Result<Order, AppError> {
        let checkout = self.get_checkout(user_id, id).await?;
        match self.finalize_paid(&checkout).await? {
            FinalizeOutcome::Finalized(order) => Ok(order),
            FinalizeOutcome::AlreadyFinalized => {
                Err(AppError::Conflict("checkout already finalized".into()))
            }
            FinalizeOutcome::NotPaid => Err(AppError::Conflict("checkout is not paid".into())),
            FinalizeOutcome::NotFound => Err(AppError::NotFound(format!("checkout {}", id))),
        }
    }

    /// Gateway return leg: confirm, finalize (reusing an existing order) and
    /// report where to send the payer. Never fails; problems become `Failed`.
    pub async fn handle_callback(&self, params: CallbackParams) -> CallbackOutcome {
        let Some(pidx) = params.pidx.filter(|p| !p.is_empty()) else {
            return CallbackOutcome::Failed;
        };
        let confirmation = match self.confirm_payment(&pidx).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(%pidx, error = %e, "callback confirmation failed");
                return CallbackOutcome::Failed;
            }
        };
        if !confirmation.paid {
            return CallbackOutcome::Failed;
        }
        let checkout = confirmation.checkout;
        if let Some(claimed) = params.purchase_order_id.as_deref() {
            if claimed != checkout.id.to_string() {
                tracing::warn!(%pidx, claimed, "callback purchase order does not match checkout");
                return CallbackOutcome::Failed;
            }
        }

        let order = match self.finalize_paid(&checkout).await {
            Ok(FinalizeOutcome::Finalized(order)) => Some(order),
            Ok(FinalizeOutcome::AlreadyFinalized) => {
                match self.repo.find_order_by_checkout(checkout.id).await {
                    Ok(order) => order,
                    Err(e) => {
                        tracing::error!(checkout_id = %checkout.id, error = %e, "callback order lookup failed");
                        None
                    }
                }
            }
            Ok(_) => None,
            Err(e) => {
                tracing::error!(checkout_id = %checkout.id, error = %e, "callback finalize failed");
                None
            }
        };
        match order {
            Some(order) => CallbackOutcome::Success { order_id: order.id },
            None => CallbackOutcome::Failed,
        }
    }

    async fn apply_lookup(
        &self,
        checkout: Checkout,
        lookup: PaymentLookup,
    ) -> Result<PaymentConfirmation, AppError> {
        let gateway_status = lookup.status.as_str().to_string();
        let details = PaymentDetails {
            pidx: lookup.pidx.clone(),
            transaction_id: lookup.transaction_id.clone(),
            gateway_status: gateway_status.clone(),
            amount_minor: lookup.total_amount,
        };
        let checkout_id = checkout.id;
        let missing = move || AppError::NotFound(format!("checkout {}", checkout_id));

        let (checkout, paid) = match lookup.status {
            GatewayStatus::Completed => {
                let expected = checkout.amount_minor()?;
                if lookup.total_amount != expected {
                    tracing::warn!(
                        checkout_id = %checkout.id,
                        expected,
                        reported = lookup.total_amount,
                        "gateway amount mismatch"
                    );
                    let updated = self
                        .repo
                        .record_payment_failed(checkout.id, details)
                        .await?
                        .ok_or_else(missing)?;
                    let paid = updated.is_paid;
                    (updated, paid)
                } else {
                    let updated = self
                        .repo
                        .record_payment_completed(checkout.id, details, Utc::now())
                        .await?
                        .ok_or_else(missing)?;
                    tracing::info!(checkout_id = %updated.id, pidx = %lookup.pidx, "payment confirmed");
                    (updated, true)
                }
            }
            ref status if status.is_terminal_failure() => {
                let updated = self
                    .repo
                    .record_payment_failed(checkout.id, details)
                    .await?
                    .ok_or_else(missing)?;
                tracing::info!(checkout_id = %updated.id, status = %gateway_status, "payment failed");
                let paid = updated.is_paid;
                (updated, paid)
            }
            _ => {
                let paid = checkout.is_paid;
                (checkout, paid)
            }
        };
        Ok(PaymentConfirmation {
            checkout,
            paid,
            gateway_status,
        })
    }

    async fn finalize_paid(&self, checkout: &Checkout) -> Result<FinalizeOutcome, AppError> {
        if checkout.is_finalized {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }
        if !checkout.is_paid {
            return Ok(FinalizeOutcome::NotPaid);
        }
        let order = Order::from_checkout(checkout).map_err(|e| AppError::Conflict(e.to_string()))?;
        let outcome = self
            .repo
            .finalize_checkout(checkout.id, order, Utc::now())
            .await?;
        if let FinalizeOutcome::Finalized(order) = &outcome {
            tracing::info!(
                checkout_id = %checkout.id,
                order_id = %order.id,
                "checkout finalized"
            );
        }
        Ok(outcome)
    }
}
