use async_trait::async_trait;

use super::RepoError;
use crate::domain::cart::{Cart, CartOwner};

#[async_trait]
pub trait CartRepository: Send + Sync + 'static {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<Cart>, RepoError>;

    /// Inserts a new cart. `Conflict` when the owner already has one.
    async fn insert_cart(&self, cart: Cart) -> Result<Cart, RepoError>;

    /// Writes `cart` only if the stored version still equals `cart.version`;
    /// returns the cart with its bumped version. `Conflict` otherwise.
    async fn save_cart(&self, cart: Cart) -> Result<Cart, RepoError>;

    /// Saves the merged user cart and deletes the absorbed guest cart as one
    /// unit. Both carts follow the `save_cart` version rule: if either
    /// changed since it was read, nothing is written and `Conflict` is
    /// returned.
    async fn save_merged_cart(&self, cart: Cart, absorbed: &Cart) -> Result<Cart, RepoError>;

    /// Moves a cart to a new owner. `Conflict` when `to` already owns a cart;
    /// `None` when `from` has no cart.
    async fn reassign_cart(&self, from: &CartOwner, to: CartOwner) -> Result<Option<Cart>, RepoError>;

    async fn delete_cart(&self, owner: &CartOwner) -> Result<bool, RepoError>;
}
