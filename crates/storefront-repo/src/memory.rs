use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use storefront_types::domain::cart::{Cart, CartOwner};
use storefront_types::domain::checkout::{Checkout, PaymentDetails};
use storefront_types::domain::order::{Order, OrderStatus};
use storefront_types::domain::product::Product;
use storefront_types::domain::user::{normalize_email, User};
use storefront_types::ports::cart_repository::CartRepository;
use storefront_types::ports::checkout_repository::{CheckoutRepository, FinalizeOutcome};
use storefront_types::ports::order_repository::OrderRepository;
use storefront_types::ports::product_repository::ProductRepository;
use storefront_types::ports::user_repository::UserRepository;
use storefront_types::ports::RepoError;
use uuid::Uuid;

/// DashMap-backed store. Per-key atomicity comes from the shard lock held by
/// `get_mut`/`entry`; never hold two guards on the same map at once.
#[derive(Clone, Default)]
pub struct InMemoryRepo {
    carts: Arc<DashMap<CartOwner, Cart>>,
    checkouts: Arc<DashMap<Uuid, Checkout>>,
    orders: Arc<DashMap<Uuid, Order>>,
    products: Arc<DashMap<Uuid, Product>>,
    users: Arc<DashMap<Uuid, User>>,
    emails: Arc<DashMap<String, Uuid>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn compare_and_save(&self, mut cart: Cart) -> Result<Cart, RepoError> {
        let mut stored = self
            .carts
            .get_mut(&cart.owner)
            .ok_or_else(|| RepoError::Conflict(format!("cart for {} vanished", cart.owner)))?;
        if stored.id != cart.id || stored.version != cart.version {
            return Err(RepoError::Conflict(format!(
                "cart {} changed concurrently",
                cart.id
            )));
        }
        cart.version += 1;
        *stored = cart.clone();
        Ok(cart)
    }

    /// Puts back a cart taken out by a multi-key write that did not go
    /// through. If the owner started a new cart in the meantime, the lines
    /// are folded into it instead of overwriting it.
    fn restore(&self, cart: Cart) {
        match self.carts.entry(cart.owner.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(cart);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                current.absorb(cart.lines().iter().cloned());
                current.version += 1;
            }
        }
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl CartRepository for InMemoryRepo {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<Cart>, RepoError> {
        Ok(self.carts.get(owner).map(|r| r.clone()))
    }

    async fn insert_cart(&self, cart: Cart) -> Result<Cart, RepoError> {
        match self.carts.entry(cart.owner.clone()) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "{} already has a cart",
                cart.owner
            ))),
            Entry::Vacant(slot) => {
                slot.insert(cart.clone());
                Ok(cart)
            }
        }
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, RepoError> {
        self.compare_and_save(cart)
    }

    async fn save_merged_cart(&self, cart: Cart, absorbed: &Cart) -> Result<Cart, RepoError> {
        let taken = self.carts.remove_if(&absorbed.owner, |_, stored| {
            stored.id == absorbed.id && stored.version == absorbed.version
        });
        let Some((_, guest)) = taken else {
            return Err(RepoError::Conflict(format!(
                "cart {} changed concurrently",
                absorbed.id
            )));
        };
        self.compare_and_save(cart).inspect_err(|_| self.restore(guest))
    }

    async fn reassign_cart(&self, from: &CartOwner, to: CartOwner) -> Result<Option<Cart>, RepoError> {
        if self.carts.contains_key(&to) {
            return Err(RepoError::Conflict("target owner already has a cart".into()));
        }
        let Some((_, original)) = self.carts.remove(from) else {
            return Ok(None);
        };
        let mut moved = original.clone();
        moved.reassign(to.clone());
        moved.version += 1;

        let placed = match self.carts.entry(to) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(moved.clone());
                Some(moved)
            }
        };
        match placed {
            Some(cart) => Ok(Some(cart)),
            None => {
                self.restore(original);
                Err(RepoError::Conflict("target owner already has a cart".into()))
            }
        }
    }

    async fn delete_cart(&self, owner: &CartOwner) -> Result<bool, RepoError> {
        Ok(self.carts.remove(owner).is_some())
    }
}

#[async_trait]
impl CheckoutRepository for InMemoryRepo {
    async fn create_checkout(&self, checkout: Checkout) -> Result<Checkout, RepoError> {
        self.checkouts.insert(checkout.id, checkout.clone());
        Ok(checkout)
    }

    async fn get_checkout(&self, id: Uuid) -> Result<Option<Checkout>, RepoError> {
        Ok(self.checkouts.get(&id).map(|r| r.clone()))
    }

    async fn find_checkout_by_pidx(&self, pidx: &str) -> Result<Option<Checkout>, RepoError> {
        Ok(self
            .checkouts
            .iter()
            .find(|kv| kv.value().pidx.as_deref() == Some(pidx))
            .map(|kv| kv.value().clone()))
    }

    async fn record_payment_initiated(
        &self,
        id: Uuid,
        pidx: &str,
    ) -> Result<Option<Checkout>, RepoError> {
        if let Some(mut c) = self.checkouts.get_mut(&id) {
            if !c.is_paid {
                c.record_payment_initiated(pidx.to_string());
            }
            return Ok(Some(c.clone()));
        }
        Ok(None)
    }

    async fn record_payment_completed(
        &self,
        id: Uuid,
        details: PaymentDetails,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Checkout>, RepoError> {
        if let Some(mut c) = self.checkouts.get_mut(&id) {
            c.record_paid(details, paid_at);
            return Ok(Some(c.clone()));
        }
        Ok(None)
    }

    async fn record_payment_failed(
        &self,
        id: Uuid,
        details: PaymentDetails,
    ) -> Result<Option<Checkout>, RepoError> {
        if let Some(mut c) = self.checkouts.get_mut(&id) {
            c.record_failed(details);
            return Ok(Some(c.clone()));
        }
        Ok(None)
    }

    async fn finalize_checkout(
        &self,
        id: Uuid,
        order: Order,
        finalized_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, RepoError> {
        // The checkout's shard lock is held across the whole step, so two
        // finalizers for the same checkout are serialized here.
        let Some(mut checkout) = self.checkouts.get_mut(&id) else {
            return Ok(FinalizeOutcome::NotFound);
        };
        if checkout.is_finalized {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }
        if !checkout.is_paid {
            return Ok(FinalizeOutcome::NotPaid);
        }
        self.orders.insert(order.id, order.clone());
        checkout.record_finalized(finalized_at);
        self.carts.remove(&CartOwner::User(checkout.user_id));
        Ok(FinalizeOutcome::Finalized(order))
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.get(&id).map(|r| r.clone()))
    }

    async fn find_order_by_checkout(&self, checkout_id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self
            .orders
            .iter()
            .find(|kv| kv.value().checkout_id == checkout_id)
            .map(|kv| kv.value().clone()))
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError> {
        Ok(newest_first(
            self.orders
                .iter()
                .filter(|kv| kv.value().user_id == user_id)
                .map(|kv| kv.value().clone())
                .collect(),
        ))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepoError> {
        Ok(newest_first(
            self.orders.iter().map(|kv| kv.value().clone()).collect(),
        ))
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        if let Some(mut v) = self.orders.get_mut(&id) {
            v.update_status(status);
            return Ok(Some(v.clone()));
        }
        Ok(None)
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepo {
    async fn create_product(&self, product: Product) -> Result<Product, RepoError> {
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        Ok(self.products.get(&id).map(|r| r.clone()))
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        let mut list: Vec<Product> = self.products.iter().map(|kv| kv.value().clone()).collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn update_product(&self, product: Product) -> Result<Option<Product>, RepoError> {
        if let Some(mut v) = self.products.get_mut(&product.id) {
            *v = product.clone();
            return Ok(Some(product));
        }
        Ok(None)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.products.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepo {
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        match self.emails.entry(normalize_email(&user.email)) {
            Entry::Occupied(_) => Err(RepoError::Conflict("email already exists".into())),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let Some(id) = self.emails.get(&normalize_email(email)).map(|r| *r) else {
            return Ok(None);
        };
        self.get_user(id).await
    }
}
