use super::locks::KeyedLocks;
use crate::domain::cart::Cart;
use crate::domain::intent::LineSnapshot;
use crate::domain::ports::{CatalogRef, ClockRef, StoreRef};
use crate::domain::product::{Money, Product, ProductId};
use crate::domain::user::UserId;
use crate::error::Result;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// A cart line priced against the catalog at the time of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub subtotal: Money,
}

impl CartLine {
    pub fn in_stock(&self) -> bool {
        self.product.is_available(self.quantity)
    }
}

/// A freshly computed view of a cart. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub user: UserId,
    pub lines: Vec<CartLine>,
    /// Items whose product is no longer in the catalog.
    pub missing: Vec<ProductId>,
    pub total: Money,
    pub item_count: u64,
}

impl CartSummary {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.missing.is_empty()
    }
}

/// What a relative quantity change did to a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    NotInCart,
    Removed,
    Updated(u32),
    /// Refused; the cart is unchanged.
    ExceedsStock { available: u32 },
}

/// Exclusive access to one user's cart until dropped or saved.
pub struct CartSession<'a> {
    store: &'a CartStore,
    cart: Cart,
    _guard: OwnedMutexGuard<()>,
}

impl CartSession<'_> {
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// Persists the cart; the per-user lock is released afterwards.
    pub async fn save(self) -> Result<Cart> {
        self.store.carts.put(self.cart).await
    }
}

/// Owner of every user's cart.
///
/// All mutations of one user's cart go through a per-user lock; different
/// users never contend. Totals are recomputed from the catalog on every
/// request.
pub struct CartStore {
    carts: StoreRef<Cart>,
    catalog: CatalogRef,
    clock: ClockRef,
    locks: KeyedLocks<UserId>,
}

impl CartStore {
    pub fn new(carts: StoreRef<Cart>, catalog: CatalogRef, clock: ClockRef) -> Self {
        Self {
            carts,
            catalog,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    /// Locks and loads the user's cart, creating it on first access.
    pub async fn open(&self, user: UserId) -> Result<CartSession<'_>> {
        let guard = self.locks.lock(&user).await;
        let cart = match self.carts.get(&user).await? {
            Some(cart) => cart,
            None => {
                debug!(%user, "Creating cart");
                self.carts.put(Cart::new(user, self.clock.now())).await?
            }
        };
        Ok(CartSession {
            store: self,
            cart,
            _guard: guard,
        })
    }

    pub async fn cart(&self, user: UserId) -> Result<Cart> {
        Ok(self.open(user).await?.cart)
    }

    pub async fn add_item(&self, user: UserId, product_id: ProductId, quantity: u32) -> Result<Cart> {
        let mut session = self.open(user).await?;
        let now = self.clock.now();
        session.cart_mut().add(product_id, quantity, now)?;
        session.save().await
    }

    pub async fn remove_item(&self, user: UserId, product_id: &ProductId) -> Result<bool> {
        let mut session = self.open(user).await?;
        let removed = session.cart_mut().remove(product_id);
        if removed {
            session.save().await?;
        }
        Ok(removed)
    }

    /// A quantity of zero or less removes the item.
    pub async fn set_quantity(
        &self,
        user: UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<bool> {
        let mut session = self.open(user).await?;
        let changed = session.cart_mut().set_quantity(product_id, quantity);
        if changed {
            session.save().await?;
        }
        Ok(changed)
    }

    /// Moves the quantity of `product` by `delta` under the user's lock. A
    /// result of zero or less removes the line; more than the product's stock
    /// is refused.
    pub async fn adjust_quantity(
        &self,
        user: UserId,
        product: &Product,
        delta: i64,
    ) -> Result<QuantityChange> {
        let mut session = self.open(user).await?;
        let Some(current) = session.cart().quantity_of(&product.id) else {
            return Ok(QuantityChange::NotInCart);
        };
        let wanted = i64::from(current).saturating_add(delta);
        if wanted > i64::from(product.stock) {
            return Ok(QuantityChange::ExceedsStock {
                available: product.stock,
            });
        }
        session.cart_mut().set_quantity(&product.id, wanted);
        session.save().await?;
        Ok(match u32::try_from(wanted) {
            Ok(quantity) if quantity > 0 => QuantityChange::Updated(quantity),
            _ => QuantityChange::Removed,
        })
    }

    pub async fn clear(&self, user: UserId) -> Result<()> {
        let mut session = self.open(user).await?;
        session.cart_mut().clear();
        session.save().await?;
        Ok(())
    }

    pub async fn item_count(&self, user: UserId) -> Result<u64> {
        Ok(self.cart(user).await?.item_count())
    }

    pub async fn is_empty(&self, user: UserId) -> Result<bool> {
        Ok(self.cart(user).await?.is_empty())
    }

    /// Removes quantities that went into an issued invoice.
    pub async fn deduct(&self, user: UserId, lines: &[LineSnapshot]) -> Result<Cart> {
        let mut session = self.open(user).await?;
        session.cart_mut().deduct(lines);
        session.save().await
    }

    /// Puts the lines of an abandoned checkout back into the cart.
    pub async fn restore(&self, user: UserId, lines: &[LineSnapshot]) -> Result<Cart> {
        let mut session = self.open(user).await?;
        let now = self.clock.now();
        for line in lines {
            session
                .cart_mut()
                .add(line.product_id.clone(), line.quantity, now)?;
        }
        session.save().await
    }

    /// Prices every line against the current catalog.
    pub async fn summarize(&self, user: UserId) -> Result<CartSummary> {
        let cart = self.cart(user).await?;
        let mut lines = Vec::with_capacity(cart.items().len());
        let mut missing = Vec::new();
        for item in cart.items() {
            match self.catalog.get_by_id(&item.product_id).await? {
                Some(product) => lines.push(CartLine {
                    subtotal: product.price.times(item.quantity),
                    product,
                    quantity: item.quantity,
                }),
                None => missing.push(item.product_id.clone()),
            }
        }
        Ok(CartSummary {
            user,
            total: lines.iter().map(|line| line.subtotal).sum(),
            item_count: cart.item_count(),
            lines,
            missing,
        })
    }
}
