use crate::auth::AuthUser;
use crate::errors::AppError;
use std::sync::Arc;
use storefront_types::domain::order::{Order, OrderStatus};
use storefront_types::ports::order_repository::OrderRepository;
use uuid::Uuid;

pub struct OrderService<R: OrderRepository> {
    repo: Arc<R>,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn my_orders(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_orders_for_user(user_id).await?)
    }

    /// Orders are visible to their owner and to admins only.
    pub async fn get_order(&self, viewer: &AuthUser, id: Uuid) -> Result<Order, AppError> {
        match self.repo.get_order(id).await? {
            Some(o) if o.user_id == viewer.id || viewer.is_admin() => Ok(o),
            _ => Err(AppError::NotFound(format!("order {}", id))),
        }
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_orders().await?)
    }

    pub async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, AppError> {
        let order = self
            .repo
            .update_order_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;
        tracing::info!(order_id = %id, status = ?status, "order status updated");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use storefront_repo::memory::InMemoryRepo;
    use storefront_types::domain::cart::CartLine;
    use storefront_types::domain::checkout::{Checkout, PaymentDetails, ShippingAddress};
    use storefront_types::domain::user::Role;
    use storefront_types::ports::checkout_repository::{CheckoutRepository, FinalizeOutcome};

    async fn placed_order(repo: &InMemoryRepo, user_id: Uuid) -> Order {
        let checkout = Checkout::new(
            user_id,
            vec![CartLine {
                product_id: Uuid::new_v4(),
                name: "Cap".into(),
                image_ref: String::new(),
                unit_price: Decimal::new(25, 0),
                quantity: 1,
                size: None,
                color: None,
            }],
            ShippingAddress {
                address: "New Road".into(),
                city: "Pokhara".into(),
                postal_code: "33700".into(),
                country: "Nepal".into(),
                first_name: "Hari".into(),
                last_name: "KC".into(),
                phone: "9801234567".into(),
            },
            "Khalti".into(),
            None,
        )
        .unwrap();
        let id = checkout.id;
        repo.create_checkout(checkout).await.unwrap();
        let details = PaymentDetails {
            pidx: "p".into(),
            transaction_id: None,
            gateway_status: "Completed".into(),
            amount_minor: 2500,
        };
        let paid = repo
            .record_payment_completed(id, details, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let order = Order::from_checkout(&paid).unwrap();
        match repo.finalize_checkout(id, order, Utc::now()).await.unwrap() {
            FinalizeOutcome::Finalized(o) => o,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn owner_and_admin_see_order_others_do_not() {
        let repo = Arc::new(InMemoryRepo::new());
        let svc = OrderService::new(repo.clone());
        let owner = Uuid::new_v4();
        let order = placed_order(&repo, owner).await;

        let as_owner = AuthUser { id: owner, role: Role::Customer };
        let as_admin = AuthUser { id: Uuid::new_v4(), role: Role::Admin };
        let stranger = AuthUser { id: Uuid::new_v4(), role: Role::Customer };

        assert_eq!(svc.get_order(&as_owner, order.id).await.unwrap().id, order.id);
        assert!(svc.get_order(&as_admin, order.id).await.is_ok());
        assert!(matches!(
            svc.get_order(&stranger, order.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(svc.my_orders(owner).await.unwrap().len(), 1);
        assert!(svc.my_orders(stranger.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_status_marks_delivery() {
        let repo = Arc::new(InMemoryRepo::new());
        let svc = OrderService::new(repo.clone());
        let order = placed_order(&repo, Uuid::new_v4()).await;
        assert_eq!(order.status, OrderStatus::Processing);

        let shipped = svc.update_status(order.id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(!shipped.is_delivered);

        let delivered = svc.update_status(order.id, OrderStatus::Delivered).await.unwrap();
        assert!(delivered.is_delivered);
        assert!(delivered.delivered_at.is_some());
        assert_eq!(svc.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn not_found_paths() {
        let repo = Arc::new(InMemoryRepo::new());
        let svc = OrderService::new(repo);
        let updated = svc
            .update_status(Uuid::new_v4(), OrderStatus::Shipped)
            .await;
        assert!(matches!(updated, Err(AppError::NotFound(_))));
    }
}
