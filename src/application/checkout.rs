use super::cart::CartStore;
use super::ledger::PaymentLedger;
use super::locks::KeyedLocks;
use crate::domain::cart::CartItem;
use crate::domain::intent::{IntentId, LineSnapshot, PaymentIntent};
use crate::domain::ports::{CatalogRef, GatewayRef, Invoice, InvoiceLine};
use crate::domain::product::Money;
use crate::domain::user::{ChatId, UserId};
use crate::error::{Result, ShopError};
use chrono::TimeDelta;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of checking a cart against live stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartValidation {
    pub is_valid: bool,
    /// One plain-language message per dropped or clamped item.
    pub errors: Vec<String>,
    /// What is actually purchasable; the cart now holds exactly these items.
    pub items: Vec<CartItem>,
}

/// Fixed invoice presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSettings {
    pub shop_name: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub token: IntentId,
    pub total: Money,
    pub lines: Vec<LineSnapshot>,
}

/// Turns a cart into a Pending payment intent and an issued invoice.
///
/// Checkouts for one user run one at a time. The gateway round trip happens
/// with no cart or ledger lock held.
pub struct CheckoutCoordinator {
    carts: Arc<CartStore>,
    ledger: Arc<PaymentLedger>,
    catalog: CatalogRef,
    gateway: GatewayRef,
    settings: InvoiceSettings,
    restore_cart_on_expiry: bool,
    lanes: KeyedLocks<UserId>,
}

impl CheckoutCoordinator {
    pub fn new(
        carts: Arc<CartStore>,
        ledger: Arc<PaymentLedger>,
        catalog: CatalogRef,
        gateway: GatewayRef,
        settings: InvoiceSettings,
    ) -> Self {
        Self {
            carts,
            ledger,
            catalog,
            gateway,
            settings,
            restore_cart_on_expiry: false,
            lanes: KeyedLocks::new(),
        }
    }

    /// Whether expired intents give their lines back to the owner's cart.
    pub fn restore_cart_on_expiry(mut self, restore: bool) -> Self {
        self.restore_cart_on_expiry = restore;
        self
    }

    pub fn carts(&self) -> &Arc<CartStore> {
        &self.carts
    }

    pub fn ledger(&self) -> &Arc<PaymentLedger> {
        &self.ledger
    }

    /// Checks every item against the catalog and rewrites the cart to the
    /// purchasable subset.
    ///
    /// Unknown products are dropped. Items above stock are clamped to the
    /// stock level, or dropped when nothing is left.
    pub async fn validate_cart(&self, user: UserId) -> Result<CartValidation> {
        Ok(self.validate_and_snapshot(user).await?.0)
    }

    async fn validate_and_snapshot(
        &self,
        user: UserId,
    ) -> Result<(CartValidation, Vec<LineSnapshot>)> {
        let mut session = self.carts.open(user).await?;
        let mut errors = Vec::new();
        let mut items = Vec::new();
        let mut lines = Vec::new();

        for item in session.cart().items() {
            let Some(product) = self.catalog.get_by_id(&item.product_id).await? else {
                errors.push(format!("Product {} no longer exists", item.product_id));
                continue;
            };
            let quantity = if product.is_available(item.quantity) {
                item.quantity
            } else {
                errors.push(format!(
                    "{} is low on stock, only {} left",
                    product.name, product.stock
                ));
                product.stock
            };
            if quantity == 0 {
                continue;
            }
            items.push(item.with_quantity(quantity));
            lines.push(LineSnapshot {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity,
            });
        }

        if items.as_slice() != session.cart().items() {
            info!(%user, adjustments = errors.len(), "Cart adjusted to available stock");
            session.cart_mut().replace_items(items.clone());
            session.save().await?;
        }

        let validation = CartValidation {
            is_valid: errors.is_empty(),
            errors,
            items,
        };
        Ok((validation, lines))
    }

    /// Validates the cart, records a Pending intent and asks the gateway to
    /// issue the invoice.
    ///
    /// If validation had to adjust anything the checkout stops with
    /// [`ShopError::Validation`] so the buyer sees the adjusted cart first.
    /// A gateway failure deletes the intent and leaves the cart as it was.
    /// On success the invoiced quantities leave the cart.
    pub async fn checkout(&self, user: UserId, chat: ChatId) -> Result<CheckoutReceipt> {
        let _lane = self.lanes.lock(&user).await;

        let (validation, lines) = self.validate_and_snapshot(user).await?;
        if lines.is_empty() {
            return Err(if validation.errors.is_empty() {
                ShopError::EmptyCart
            } else {
                ShopError::Validation {
                    errors: validation.errors,
                }
            });
        }
        if !validation.is_valid {
            return Err(ShopError::Validation {
                errors: validation.errors,
            });
        }

        let intent = self.ledger.open(user, chat, lines).await?;
        let invoice = self.invoice_for(&intent);

        if let Err(e) = self.gateway.issue_invoice(&invoice).await {
            warn!(%user, token = %intent.id, error = %e, "Invoice issuance failed, rolling back");
            self.ledger.discard(&intent.id).await?;
            return Err(match e {
                ShopError::Gateway(_) => e,
                other => ShopError::Gateway(other.to_string()),
            });
        }

        if let Err(e) = self.carts.deduct(user, intent.lines()).await {
            error!(%user, token = %intent.id, error = %e, "Invoice issued but cart was not cleared");
        }
        info!(%user, token = %intent.id, total = %intent.total(), "Checkout invoiced");

        Ok(CheckoutReceipt {
            token: intent.id.clone(),
            total: intent.total(),
            lines: intent.lines().to_vec(),
        })
    }

    fn invoice_for(&self, intent: &PaymentIntent) -> Invoice {
        let count = intent.lines().len();
        Invoice {
            chat: intent.chat,
            title: format!("{} order", self.settings.shop_name),
            description: format!(
                "Your order contains {count} {}",
                if count == 1 { "item" } else { "items" }
            ),
            correlation_token: intent.id.clone(),
            currency: self.settings.currency.clone(),
            lines: intent
                .lines()
                .iter()
                .map(|line| InvoiceLine {
                    label: format!("{} x {}", line.name, line.quantity),
                    amount: line.subtotal(),
                })
                .collect(),
        }
    }

    /// Expires abandoned intents and, if configured, hands their lines back
    /// to the owners' carts. Returns the number of intents reclaimed.
    pub async fn reclaim_expired(&self, max_age: TimeDelta) -> Result<usize> {
        let expired = self.ledger.sweep(max_age).await?;
        if self.restore_cart_on_expiry {
            for intent in &expired {
                match self.carts.restore(intent.user, intent.lines()).await {
                    Ok(_) => {
                        info!(user = %intent.user, token = %intent.id, "Expired checkout returned to cart")
                    }
                    Err(e) => {
                        error!(user = %intent.user, token = %intent.id, error = %e, "Could not return expired checkout to cart")
                    }
                }
            }
        }
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::Cart;
    use crate::domain::ports::KeyValueStore;
    use crate::domain::product::{Product, ProductId};
    use crate::infrastructure::catalog::ProductCatalog;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::gateway::SimulatedGateway;
    use crate::infrastructure::in_memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Cart storage that refuses writes for one user once switched on.
    struct RefusingCarts {
        inner: InMemoryStore<Cart>,
        refused: UserId,
        refusing: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore<Cart> for RefusingCarts {
        async fn get(&self, key: &UserId) -> Result<Option<Cart>> {
            self.inner.get(key).await
        }

        async fn put(&self, record: Cart) -> Result<Cart> {
            if self.refusing.load(Ordering::SeqCst) && record.user == self.refused {
                return Err(std::io::Error::other("cart storage unavailable").into());
            }
            self.inner.put(record).await
        }

        async fn delete(&self, key: &UserId) -> Result<Option<Cart>> {
            self.inner.delete(key).await
        }

        async fn values(&self) -> Result<Vec<Cart>> {
            self.inner.values().await
        }
    }

    #[tokio::test]
    async fn test_failed_restore_does_not_stop_the_others() {
        let catalog: CatalogRef = Arc::new(ProductCatalog::new(vec![Product {
            id: "a".into(),
            name: "Anise".to_string(),
            description: String::new(),
            price: Money::new(10),
            stock: 50,
            category: "Spices".to_string(),
            featured: false,
            image: None,
        }]));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(RefusingCarts {
            inner: InMemoryStore::new(),
            refused: UserId(1),
            refusing: AtomicBool::new(false),
        });
        let carts = Arc::new(CartStore::new(store.clone(), catalog.clone(), clock.clone()));
        let ledger = Arc::new(PaymentLedger::new(
            Arc::new(InMemoryStore::<PaymentIntent>::new()),
            catalog.clone(),
            clock.clone(),
        ));
        let coordinator = CheckoutCoordinator::new(
            carts.clone(),
            ledger.clone(),
            catalog,
            Arc::new(SimulatedGateway::new()),
            InvoiceSettings {
                shop_name: "Test".to_string(),
                currency: "XTR".to_string(),
            },
        )
        .restore_cart_on_expiry(true);

        for user in [UserId(1), UserId(2)] {
            carts.add_item(user, ProductId::from("a"), 2).await.unwrap();
            coordinator.checkout(user, ChatId(user.0)).await.unwrap();
        }
        store.refusing.store(true, Ordering::SeqCst);

        assert_eq!(coordinator.reclaim_expired(TimeDelta::zero()).await.unwrap(), 2);
        assert_eq!(ledger.summary().await.unwrap().expired, 2);
        assert!(carts.is_empty(UserId(1)).await.unwrap());
        assert_eq!(carts.item_count(UserId(2)).await.unwrap(), 2);
    }
}
