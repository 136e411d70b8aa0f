use super::intent::IntentId;
use super::product::{Money, Product, ProductId};
use super::user::ChatId;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

/// A value kept in a [`KeyValueStore`], carrying an optimistic-concurrency
/// version.
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Display + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

/// Keyed record storage.
///
/// `put` only succeeds when the record's version equals the stored version
/// (0 for an absent key); the stored copy then carries the next version and
/// is returned.
#[async_trait]
pub trait KeyValueStore<R: Record>: Send + Sync {
    async fn get(&self, key: &R::Key) -> Result<Option<R>>;
    async fn put(&self, record: R) -> Result<R>;
    async fn delete(&self, key: &R::Key) -> Result<Option<R>>;
    async fn values(&self) -> Result<Vec<R>>;
}

pub type StoreRef<R> = Arc<dyn KeyValueStore<R>>;

/// Read-mostly product lookup; the single source of truth for price and stock.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>>;
    async fn get_by_category(&self, category: &str) -> Result<Vec<Product>>;
    async fn search(&self, text: &str) -> Result<Vec<Product>>;
    async fn list_categories(&self) -> Result<Vec<String>>;
    async fn featured(&self) -> Result<Vec<Product>>;
    async fn all(&self) -> Result<Vec<Product>>;
    /// Atomically takes `quantity` units out of stock and returns what is left.
    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<u32>;
}

pub type CatalogRef = Arc<dyn CatalogSource>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub label: String,
    pub amount: Money,
}

/// Everything the gateway needs to present a payable invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub chat: ChatId,
    pub title: String,
    pub description: String,
    pub correlation_token: IntentId,
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
}

impl Invoice {
    pub fn total(&self) -> Money {
        self.lines.iter().map(|line| line.amount).sum()
    }
}

/// External payment provider. Timeouts are the implementation's concern.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn issue_invoice(&self, invoice: &Invoice) -> Result<()>;
}

pub type GatewayRef = Arc<dyn PaymentGateway>;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type ClockRef = Arc<dyn Clock>;
