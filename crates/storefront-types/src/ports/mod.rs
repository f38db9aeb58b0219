pub mod cart_repository;
pub mod checkout_repository;
pub mod order_repository;
pub mod payment_gateway;
pub mod product_repository;
pub mod user_repository;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    /// A conditional write lost a race (stale version, duplicate key).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Everything the application services need from storage.
pub trait Store:
    cart_repository::CartRepository
    + checkout_repository::CheckoutRepository
    + order_repository::OrderRepository
    + product_repository::ProductRepository
    + user_repository::UserRepository
{
}

impl<T> Store for T where
    T: cart_repository::CartRepository
        + checkout_repository::CheckoutRepository
        + order_repository::OrderRepository
        + product_repository::ProductRepository
        + user_repository::UserRepository
{
}
