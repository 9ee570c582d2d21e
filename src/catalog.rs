use std::fmt;
use std::sync::Arc;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(id) => write!(f, "{}", id),
            ProductId::Text(id) => f.write_str(id),
        }
    }
}

/// Unit price. Deserializes from a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Price(pub f64);

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Number(f64),
            Text(String),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Number(value) => Ok(Price(value)),
            Helper::Text(value) => match value.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => Ok(Price(parsed)),
                _ => Err(serde::de::Error::custom(format!("invalid price `{}`", value))),
            },
        }
    }
}

/// Two decimals at most, trailing zeros dropped: `120`, `89.5`, `19.99`.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = format!("{:.2}", self.0);
        let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
        f.write_str(trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The name shown for a product: `title` when present and non-empty,
/// otherwise `name`, otherwise the empty string.
pub fn display_name(product: &Product) -> &str {
    match product.title.as_deref() {
        Some(title) if !title.is_empty() => title,
        _ => product.name.as_deref().unwrap_or(""),
    }
}

#[cfg(test)]
impl Product {
    pub fn new(id: i64) -> Self {
        Self {
            id: ProductId::Number(id),
            title: None,
            name: None,
            image: None,
            price: None,
            brand: None,
            description: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(Price(price));
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

impl Product {
    pub fn display_name(&self) -> &str {
        display_name(self)
    }

    pub fn price_label(&self, currency: &str) -> String {
        match self.price {
            Some(price) => format!("{} {}", price, currency),
            None => "-".to_string(),
        }
    }

    pub fn image_label(&self) -> &str {
        match self.image.as_deref() {
            Some(image) if !image.trim().is_empty() => image,
            _ => "no image",
        }
    }
}

/// Immutable, ordered snapshot of the product catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Arc<[Product]>,
    revision: u64,
}

impl Catalog {
    pub fn new(products: Vec<Product>, revision: u64) -> Self {
        Self {
            products: products.into(),
            revision,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products().iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Changes whenever the owning store publishes a new snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::empty()
    }
}
