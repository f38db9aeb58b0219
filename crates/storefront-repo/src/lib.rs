#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use chrono::{DateTime, Utc};
use storefront_types::domain::cart::{Cart, CartOwner};
use storefront_types::domain::checkout::{Checkout, PaymentDetails};
use storefront_types::domain::order::{Order, OrderStatus};
use storefront_types::domain::product::Product;
use storefront_types::domain::user::User;
use storefront_types::ports::cart_repository::CartRepository;
use storefront_types::ports::checkout_repository::{CheckoutRepository, FinalizeOutcome};
use storefront_types::ports::order_repository::OrderRepository;
use storefront_types::ports::product_repository::ProductRepository;
use storefront_types::ports::user_repository::UserRepository;
use storefront_types::ports::RepoError;
use uuid::Uuid;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// The storage adapter chosen at startup.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    /// `sqlite://...` URLs open SQLite; `memory` (or no URL in a memory-only
    /// build) gives the in-memory store.
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            #[cfg(feature = "memory")]
            None | Some("memory") => Ok(Repo::Memory(memory::InMemoryRepo::new())),
            #[cfg(all(feature = "sqlite", not(feature = "memory")))]
            None => Ok(Repo::Sqlite(
                sqlite::SqliteRepo::new("sqlite://storefront.db").await?,
            )),
            #[cfg(feature = "sqlite")]
            Some(url) if url.starts_with("sqlite:") => {
                Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?))
            }
            Some(other) => anyhow::bail!("unsupported DATABASE_URL {other}"),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory(r) => r.$method($($arg),*).await,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(r) => r.$method($($arg),*).await,
        }
    };
}

#[async_trait::async_trait]
impl CartRepository for Repo {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<Cart>, RepoError> {
        dispatch!(self, find_cart(owner))
    }

    async fn insert_cart(&self, cart: Cart) -> Result<Cart, RepoError> {
        dispatch!(self, insert_cart(cart))
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, RepoError> {
        dispatch!(self, save_cart(cart))
    }

    async fn save_merged_cart(&self, cart: Cart, absorbed: &Cart) -> Result<Cart, RepoError> {
        dispatch!(self, save_merged_cart(cart, absorbed))
    }

    async fn reassign_cart(&self, from: &CartOwner, to: CartOwner) -> Result<Option<Cart>, RepoError> {
        dispatch!(self, reassign_cart(from, to))
    }

    async fn delete_cart(&self, owner: &CartOwner) -> Result<bool, RepoError> {
        dispatch!(self, delete_cart(owner))
    }
}

#[async_trait::async_trait]
impl CheckoutRepository for Repo {
    async fn create_checkout(&self, checkout: Checkout) -> Result<Checkout, RepoError> {
        dispatch!(self, create_checkout(checkout))
    }

    async fn get_checkout(&self, id: Uuid) -> Result<Option<Checkout>, RepoError> {
        dispatch!(self, get_checkout(id))
    }

    async fn find_checkout_by_pidx(&self, pidx: &str) -> Result<Option<Checkout>, RepoError> {
        dispatch!(self, find_checkout_by_pidx(pidx))
    }

    async fn record_payment_initiated(
        &self,
        id: Uuid,
        pidx: &str,
    ) -> Result<Option<Checkout>, RepoError> {
        dispatch!(self, record_payment_initiated(id, pidx))
    }

    async fn record_payment_completed(
        &self,
        id: Uuid,
        details: PaymentDetails,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<Checkout>, RepoError> {
        dispatch!(self, record_payment_completed(id, details, paid_at))
    }

    async fn record_payment_failed(
        &self,
        id: Uuid,
        details: PaymentDetails,
    ) -> Result<Option<Checkout>, RepoError> {
        dispatch!(self, record_payment_failed(id, details))
    }

    async fn finalize_checkout(
        &self,
        id: Uuid,
        order: Order,
        finalized_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, RepoError> {
        dispatch!(self, finalize_checkout(id, order, finalized_at))
    }
}

#[async_trait::async_trait]
impl OrderRepository for Repo {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        dispatch!(self, get_order(id))
    }

    async fn find_order_by_checkout(&self, checkout_id: Uuid) -> Result<Option<Order>, RepoError> {
        dispatch!(self, find_order_by_checkout(checkout_id))
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, list_orders_for_user(user_id))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, list_orders())
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        dispatch!(self, update_order_status(id, status))
    }
}

#[async_trait::async_trait]
impl ProductRepository for Repo {
    async fn create_product(&self, product: Product) -> Result<Product, RepoError> {
        dispatch!(self, create_product(product))
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        dispatch!(self, get_product(id))
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        dispatch!(self, list_products())
    }

    async fn update_product(&self, product: Product) -> Result<Option<Product>, RepoError> {
        dispatch!(self, update_product(product))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, RepoError> {
        dispatch!(self, delete_product(id))
    }
}

#[async_trait::async_trait]
impl UserRepository for Repo {
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        dispatch!(self, create_user(user))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        dispatch!(self, get_user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        dispatch!(self, find_user_by_email(email))
    }
}
