use crate::domain::ports::CatalogSource;
use crate::domain::product::{Product, ProductId};
use crate::error::{Result, ShopError};
use crate::interfaces::csv::product_reader::ProductReader;
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// The embedded product catalog.
///
/// Readers share a `RwLock`; a stock decrement holds the write lock for the
/// whole check-and-update, so concurrent decrements of one product cannot both
/// pass the stock check. When a backing file is attached, the catalog is
/// written back to it after every decrement.
#[derive(Clone, Default)]
pub struct ProductCatalog {
    products: Arc<RwLock<Vec<Product>>>,
    backing_file: Option<PathBuf>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Arc::new(RwLock::new(products)),
            backing_file: None,
        }
    }

    /// Loads a JSON array of products.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let products: Vec<Product> = serde_json::from_reader(std::io::BufReader::new(file))?;
        info!(count = products.len(), path = %path.as_ref().display(), "Loaded catalog");
        Ok(Self::new(products))
    }

    /// Loads a CSV product sheet. Rows that fail to parse abort the load.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let products = ProductReader::new(file)
            .products()
            .collect::<Result<Vec<_>>>()?;
        info!(count = products.len(), path = %path.as_ref().display(), "Imported catalog");
        Ok(Self::new(products))
    }

    /// Picks the loader from the file extension (`.csv`, otherwise JSON).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let is_csv = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            Self::from_csv_file(path)
        } else {
            Self::from_json_file(path)
        }
    }

    /// Writes the catalog as JSON to `path` after each stock change.
    pub fn persist_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.backing_file = Some(path.into());
        self
    }

    async fn write_back(&self, products: &[Product]) -> Result<()> {
        if let Some(path) = &self.backing_file {
            let bytes = serde_json::to_vec_pretty(products)?;
            tokio::fs::write(path, bytes).await?;
            debug!(path = %path.display(), "Catalog written back");
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for ProductCatalog {
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|product| &product.id == id).cloned())
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Product>> {
        let category = category.to_lowercase();
        let products = self.products.read().await;
        Ok(products
            .iter()
            .filter(|product| product.category.to_lowercase() == category)
            .cloned()
            .collect())
    }

    async fn search(&self, text: &str) -> Result<Vec<Product>> {
        let needle = text.to_lowercase();
        let products = self.products.read().await;
        Ok(products
            .iter()
            .filter(|product| product.matches(&needle))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let products = self.products.read().await;
        let mut categories: Vec<String> = Vec::new();
        for product in products.iter() {
            if !categories.contains(&product.category) {
                categories.push(product.category.clone());
            }
        }
        Ok(categories)
    }

    async fn featured(&self) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| p.featured).cloned().collect())
    }

    async fn all(&self) -> Result<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<u32> {
        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|product| &product.id == id)
            .ok_or_else(|| ShopError::ProductNotFound(id.clone()))?;
        if quantity > product.stock {
            return Err(ShopError::InsufficientStock {
                product: id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        let remaining = product.stock;
        // The in-memory level is authoritative; a failed write-back is only logged.
        if let Err(e) = self.write_back(&products).await {
            error!(product = %id, remaining, error = %e, "Catalog write-back failed");
        }
        Ok(remaining)
    }
}
