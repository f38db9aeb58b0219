use crate::errors::AppError;
use std::sync::Arc;
use storefront_types::domain::cart::{Cart, CartError, CartLine, CartOwner, LineKey};
use storefront_types::ports::cart_repository::CartRepository;
use storefront_types::ports::product_repository::ProductRepository;
use storefront_types::ports::RepoError;
use uuid::Uuid;

/// Attempts per read-modify-write before a version conflict is surfaced.
const MAX_CART_RETRIES: usize = 5;

#[derive(Debug, Clone)]
pub struct AddItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

pub struct CartService<R> {
    repo: Arc<R>,
}

impl<R> CartService<R>
where
    R: CartRepository + ProductRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Missing carts are reported as an empty, unsaved cart.
    pub async fn get_cart(&self, owner: &CartOwner) -> Result<Cart, AppError> {
        Ok(self
            .repo
            .find_cart(owner)
            .await?
            .unwrap_or_else(|| Cart::new(owner.clone())))
    }

    pub async fn add_item(&self, owner: &CartOwner, item: AddItem) -> Result<Cart, AppError> {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity.into());
        }
        let product = self
            .repo
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", item.product_id)))?;
        let line = CartLine {
            product_id: product.id,
            image_ref: product.primary_image(),
            name: product.name,
            unit_price: product.price,
            quantity: item.quantity,
            size: item.size,
            color: item.color,
        };
        self.mutate(owner, true, |cart| cart.add_line(line.clone()))
            .await
    }

    /// A quantity of zero or less removes the line.
    pub async fn set_quantity(
        &self,
        owner: &CartOwner,
        key: LineKey,
        quantity: i64,
    ) -> Result<Cart, AppError> {
        self.mutate(owner, false, |cart| cart.set_quantity(&key, quantity))
            .await
    }

    pub async fn remove_item(&self, owner: &CartOwner, key: LineKey) -> Result<Cart, AppError> {
        self.mutate(owner, false, |cart| cart.remove_line(&key).map(|_| ()))
            .await
    }

    /// Folds the guest cart into the user's cart. The guest cart is gone
    /// afterwards unless it was empty, which leaves both carts untouched.
    pub async fn merge(&self, guest_id: &str, user_id: Uuid) -> Result<Cart, AppError> {
        let guest = CartOwner::Guest(guest_id.to_string());
        let user = CartOwner::User(user_id);

        for attempt in 1..=MAX_CART_RETRIES {
            let Some(guest_cart) = self.repo.find_cart(&guest).await? else {
                return Err(AppError::NotFound("guest cart not found".into()));
            };
            let user_cart = self.repo.find_cart(&user).await?;
            if guest_cart.is_empty() {
                return Ok(user_cart.unwrap_or_else(|| Cart::new(user)));
            }

            let result = match user_cart {
                None => match self.repo.reassign_cart(&guest, user.clone()).await {
                    Ok(Some(cart)) => Ok(cart),
                    Ok(None) => continue,
                    Err(e) => Err(e),
                },
                Some(mut cart) => {
                    cart.absorb(guest_cart.lines().iter().cloned());
                    self.repo.save_merged_cart(cart, &guest_cart).await
                }
            };
            match result {
                Ok(cart) => {
                    tracing::info!(%guest, %user, items = cart.item_count(), "guest cart merged");
                    return Ok(cart);
                }
                Err(RepoError::Conflict(reason)) => {
                    tracing::debug!(%guest, attempt, %reason, "cart merge conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::Conflict("cart is being modified, try again".into()))
    }

    async fn mutate<F>(&self, owner: &CartOwner, create: bool, apply: F) -> Result<Cart, AppError>
    where
        F: Fn(&mut Cart) -> Result<(), CartError> + Send + Sync,
    {
        for attempt in 1..=MAX_CART_RETRIES {
            let result = match self.repo.find_cart(owner).await? {
                Some(mut cart) => {
                    apply(&mut cart)?;
                    self.repo.save_cart(cart).await
                }
                None if create => {
                    let mut cart = Cart::new(owner.clone());
                    apply(&mut cart)?;
                    self.repo.insert_cart(cart).await
                }
                None => return Err(AppError::NotFound("cart not found".into())),
            };
            match result {
                Err(RepoError::Conflict(reason)) => {
                    tracing::debug!(%owner, attempt, %reason, "cart write conflict, retrying");
                }
                other => return other.map_err(AppError::from),
            }
        }
        Err(AppError::Conflict("cart is being modified, try again".into()))
    }
}
