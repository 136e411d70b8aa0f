#![allow(dead_code)]

use chatshop::application::cart::CartStore;
use chatshop::application::checkout::{CheckoutCoordinator, InvoiceSettings};
use chatshop::application::ledger::PaymentLedger;
use chatshop::application::storefront::Storefront;
use chatshop::domain::cart::Cart;
use chatshop::domain::intent::PaymentIntent;
use chatshop::domain::ports::{CatalogRef, CatalogSource};
use chatshop::domain::product::{Money, Product, ProductId};
use chatshop::infrastructure::catalog::ProductCatalog;
use chatshop::infrastructure::clock::ManualClock;
use chatshop::infrastructure::gateway::SimulatedGateway;
use chatshop::infrastructure::in_memory::InMemoryStore;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

pub fn product(id: &str, name: &str, price: u64, stock: u32) -> Product {
    Product {
        id: ProductId::from(id),
        name: name.to_string(),
        description: String::new(),
        price: Money::new(price),
        stock,
        category: "General".to_string(),
        featured: false,
        image: None,
    }
}

/// A fully wired shop over in-memory stores, a manual clock and the
/// simulated gateway.
pub struct Shop {
    pub catalog: ProductCatalog,
    pub clock: Arc<ManualClock>,
    pub gateway: SimulatedGateway,
    pub carts: Arc<CartStore>,
    pub ledger: Arc<PaymentLedger>,
    pub coordinator: Arc<CheckoutCoordinator>,
    pub storefront: Storefront,
}

impl Shop {
    pub fn new(products: Vec<Product>) -> Self {
        Self::build(products, false)
    }

    pub fn restoring(products: Vec<Product>) -> Self {
        Self::build(products, true)
    }

    fn build(products: Vec<Product>, restore_cart_on_expiry: bool) -> Self {
        let catalog = ProductCatalog::new(products);
        let catalog_ref: CatalogRef = Arc::new(catalog.clone());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let gateway = SimulatedGateway::new();

        let carts = Arc::new(CartStore::new(
            Arc::new(InMemoryStore::<Cart>::new()),
            catalog_ref.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(PaymentLedger::new(
            Arc::new(InMemoryStore::<PaymentIntent>::new()),
            catalog_ref.clone(),
            clock.clone(),
        ));
        let coordinator = Arc::new(
            CheckoutCoordinator::new(
                carts.clone(),
                ledger.clone(),
                catalog_ref.clone(),
                Arc::new(gateway.clone()),
                InvoiceSettings {
                    shop_name: "Test Shop".to_string(),
                    currency: "XTR".to_string(),
                },
            )
            .restore_cart_on_expiry(restore_cart_on_expiry),
        );
        let storefront = Storefront::new(coordinator.clone(), catalog_ref, "XTR");

        Self {
            catalog,
            clock,
            gateway,
            carts,
            ledger,
            coordinator,
            storefront,
        }
    }

    pub async fn stock_of(&self, id: &str) -> u32 {
        self.catalog
            .get_by_id(&ProductId::from(id))
            .await
            .unwrap()
            .map(|product| product.stock)
            .unwrap_or_default()
    }
}
