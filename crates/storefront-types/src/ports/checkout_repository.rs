use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::RepoError;
use crate::domain::checkout::{Checkout, PaymentDetails};
use crate::domain::order::Order;

/// Result of the atomic finalize step.
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    Finalized(Order),
    AlreadyFinalized,
    NotPaid,
    NotFound,
}

#[async_trait]
pub trait CheckoutRepository: Send + Sync + 'static {
    async fn create_checkout(&self, checkout: Checkout) -> Result<Checkout, RepoError>;
    async fn get_checkout(&self, id: Uuid) -> Result<Option<Checkout>, RepoError>;
    async fn find_checkout_by_pidx(&self, pidx: &str) -> Result<Option<Checkout>, RepoError>;

    /// Stores the gateway handle. Leaves paid checkouts untouched and
    /// returns them as-is.
    async fn record_payment_initiated(
        &self,
        id: Uuid,
        pidx: &str,
    ) -> Result<Option<Checkout>, RepoError>;

    /// Marks paid once; later calls return the already-paid checkout.
    async fn record_payment_completed(
        &self,
        id: Uuid,
        details: PaymentDetails,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Checkout>, RepoError>;

    async fn record_payment_failed(
        &self,
        id: Uuid,
        details: PaymentDetails,
    ) -> Result<Option<Checkout>, RepoError>;

    /// Flips `is_finalized` only when the checkout is paid and not yet
    /// finalized, and in that case inserts `order` and deletes the user's
    /// cart in the same unit of work.
    async fn finalize_checkout(
        &self,
        id: Uuid,
        order: Order,
        finalized_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, RepoError>;
}
