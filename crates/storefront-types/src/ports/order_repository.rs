use async_trait::async_trait;
use uuid::Uuid;

use super::RepoError;
use crate::domain::order::{Order, OrderStatus};

/// Orders are only ever inserted by `CheckoutRepository::finalize_checkout`.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError>;
    async fn find_order_by_checkout(&self, checkout_id: Uuid) -> Result<Option<Order>, RepoError>;
    /// Newest first.
    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError>;
    /// Newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, RepoError>;
    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError>;
}
