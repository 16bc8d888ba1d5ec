use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost_price: Decimal,
    pub category_id: Option<i64>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub stock: i32,
    pub is_active: bool,
    pub sales_count: i64,
}

/// Admin input for a new product. New products start active with no sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost_price: Decimal,
    pub category_id: i64,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub stock: i32,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if self.price.is_sign_negative() || self.cost_price.is_sign_negative() {
            return Err(CatalogError::NegativeAmount);
        }
        if self.stock < 0 {
            return Err(CatalogError::NegativeStock);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub is_active: bool,
}

/// Editable category fields, used for both create and full edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListItem {
    #[serde(flatten)]
    pub category: Category,
    pub active_products: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("name is required")]
    EmptyName,
    #[error("price and cost price must not be negative")]
    NegativeAmount,
    #[error("stock must not be negative")]
    NegativeStock,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewProduct {
        NewProduct {
            name: "Green tea".to_string(),
            description: None,
            price: Decimal::new(450, 2),
            cost_price: Decimal::new(200, 2),
            category_id: 1,
            brand: None,
            image_url: None,
            stock: 12,
        }
    }

    #[test]
    fn well_formed_product_passes() {
        assert_eq!(draft().validate(), Ok(()));
    }

    #[test]
    fn product_rules_are_enforced() {
        let mut product = draft();
        product.name = "  ".to_string();
        assert_eq!(product.validate(), Err(CatalogError::EmptyName));

        let mut product = draft();
        product.cost_price = Decimal::new(-1, 0);
        assert_eq!(product.validate(), Err(CatalogError::NegativeAmount));

        let mut product = draft();
        product.stock = -3;
        assert_eq!(product.validate(), Err(CatalogError::NegativeStock));
    }

    #[test]
    fn category_needs_a_name() {
        let category = CategoryDraft {
            name: String::new(),
            description: Some("hot drinks".to_string()),
            emoji: Some("☕".to_string()),
        };
        assert_eq!(category.validate(), Err(CatalogError::EmptyName));
    }
}
