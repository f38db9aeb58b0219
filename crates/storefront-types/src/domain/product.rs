use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fields an admin supplies when creating or replacing a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub count_in_stock: u32,
}

impl ProductInput {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("name empty");
        }
        if self.price.is_sign_negative() {
            anyhow::bail!("price must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub category: String,
    pub brand: String,
    pub count_in_stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(input: ProductInput) -> anyhow::Result<Self> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            images: input.images,
            sizes: input.sizes,
            colors: input.colors,
            category: input.category,
            brand: input.brand,
            count_in_stock: input.count_in_stock,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, input: ProductInput) -> anyhow::Result<()> {
        input.validate()?;
        self.name = input.name;
        self.description = input.description;
        self.price = input.price;
        self.images = input.images;
        self.sizes = input.sizes;
        self.colors = input.colors;
        self.category = input.category;
        self.brand = input.brand;
        self.count_in_stock = input.count_in_stock;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Image shown on cart lines; empty when the product has none.
    pub fn primary_image(&self) -> String {
        self.images.first().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Hoodie".into(),
            description: "Warm".into(),
            price: Decimal::from(2500),
            images: vec!["front.png".into(), "back.png".into()],
            sizes: vec!["M".into()],
            colors: vec!["grey".into()],
            category: "Top Wear".into(),
            brand: "Yak".into(),
            count_in_stock: 4,
        }
    }

    #[test]
    fn new_product_uses_first_image() {
        let p = Product::new(input()).unwrap();
        assert_eq!(p.primary_image(), "front.png");
        let mut bare = input();
        bare.images.clear();
        assert_eq!(Product::new(bare).unwrap().primary_image(), "");
    }

    #[test]
    fn rejects_blank_name_and_negative_price() {
        let mut blank = input();
        blank.name = " ".into();
        assert!(Product::new(blank).is_err());
        let mut negative = input();
        negative.price = Decimal::from(-1);
        assert!(Product::new(negative).is_err());
    }
}
