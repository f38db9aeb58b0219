use crate::errors::AppError;
use std::sync::Arc;
use storefront_types::domain::product::{Product, ProductInput};
use storefront_types::ports::product_repository::ProductRepository;
use uuid::Uuid;

pub struct ProductService<R: ProductRepository> {
    repo: Arc<R>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_products().await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        self.repo
            .get_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", id)))
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, AppError> {
        let product = Product::new(input).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let product = self.repo.create_product(product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: Uuid, input: ProductInput) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;
        product
            .apply(input)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        self.repo
            .update_product(product)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", id)))
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), AppError> {
        if self.repo.delete_product(id).await? {
            tracing::info!(product_id = %id, "product deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("product {}", id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn input(name: &str, price: i64) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: String::new(),
            price: Decimal::new(price, 0),
            images: vec!["https://img.example.com/tee.png".into()],
            sizes: vec!["M".into()],
            colors: vec![],
            category: "Tops".into(),
            brand: String::new(),
            count_in_stock: 3,
        }
    }

    #[tokio::test]
    async fn create_update_delete() {
        let repo = Arc::new(storefront_repo::memory::InMemoryRepo::new());
        let svc = ProductService::new(repo);

        let p = svc.create_product(input("Tee", 500)).await.unwrap();
        let updated = svc.update_product(p.id, input("Tee v2", 650)).await.unwrap();
        assert_eq!(updated.name, "Tee v2");
        assert_eq!(updated.price, Decimal::new(650, 0));
        assert_eq!(svc.list_products().await.unwrap().len(), 1);

        svc.delete_product(p.id).await.unwrap();
        assert!(matches!(
            svc.get_product(p.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_product(p.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn validation_errors_propagate() {
        let repo = Arc::new(storefront_repo::memory::InMemoryRepo::new());
        let svc = ProductService::new(repo);
        let res = svc.create_product(input("", 500)).await;
        assert!(matches!(res, Err(AppError::BadRequest(_))));
    }
}
