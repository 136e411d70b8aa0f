use super::intent::LineSnapshot;
use super::ports::Record;
use super::product::ProductId;
use super::user::UserId;
use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One desired product and how many units of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    /// Always greater than zero while the item is in a cart.
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

/// A user's shopping cart.
///
/// Holds at most one item per product id and never an item with a zero
/// quantity. The cart carries no total: prices live in the catalog and are
/// read fresh whenever a total is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user: UserId,
    items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    version: u64,
}

impl Cart {
    pub fn new(user: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user,
            items: Vec::new(),
            created_at: now,
            version: 0,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| &item.product_id == product_id)
            .map(|item| item.quantity)
    }

    /// Adds `quantity` units, merging into an existing line for the product.
    pub fn add(&mut self, product_id: ProductId, quantity: u32, now: DateTime<Utc>) -> Result<()> {
        if quantity == 0 {
            return Err(ShopError::InvalidQuantity);
        }
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id,
                quantity,
                added_at: now,
            }),
        }
        Ok(())
    }

    /// Returns whether an item was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        self.items.len() != before
    }

    /// Sets the quantity of an existing line; zero or below removes it.
    ///
    /// Products not already in the cart are left alone. Returns whether the
    /// cart changed.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self
            .items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
        {
            Some(item) if item.quantity != quantity => {
                item.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Replaces the contents with an adjusted item list, dropping zero lines
    /// and folding duplicates.
    pub fn replace_items(&mut self, items: Vec<CartItem>) {
        self.items.clear();
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            match self
                .items
                .iter_mut()
                .find(|existing| existing.product_id == item.product_id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity)
                }
                None => self.items.push(item),
            }
        }
    }

    /// Takes checked-out quantities back out of the cart.
    ///
    /// Units added after the snapshot was taken stay in the cart.
    pub fn deduct(&mut self, lines: &[LineSnapshot]) {
        for line in lines {
            if let Some(item) = self
                .items
                .iter_mut()
                .find(|item| item.product_id == line.product_id)
            {
                item.quantity = item.quantity.saturating_sub(line.quantity);
            }
        }
        self.items.retain(|item| item.quantity > 0);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Record for Cart {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.user
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::Money;

    fn cart() -> Cart {
        Cart::new(UserId(7), Utc::now())
    }

    #[test]
    fn test_add_merges_quantity() {
        let mut cart = cart();
        cart.add("a".into(), 1, Utc::now()).unwrap();
        cart.add("b".into(), 2, Utc::now()).unwrap();
        cart.add("a".into(), 3, Utc::now()).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.quantity_of(&"a".into()), Some(4));
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let mut cart = cart();
        assert!(matches!(
            cart.add("a".into(), 0, Utc::now()),
            Err(ShopError::InvalidQuantity)
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_non_positive_removes() {
        let mut cart = cart();
        cart.add("a".into(), 2, Utc::now()).unwrap();
        assert!(cart.set_quantity(&"a".into(), 5));
        assert_eq!(cart.quantity_of(&"a".into()), Some(5));

        assert!(cart.set_quantity(&"a".into(), -1));
        assert!(cart.is_empty());

        // Unknown product is a no-op
        assert!(!cart.set_quantity(&"zzz".into(), 3));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_replace_items_folds_duplicates_and_zeroes() {
        let mut cart = cart();
        let now = Utc::now();
        let item = |id: &str, quantity| CartItem {
            product_id: id.into(),
            quantity,
            added_at: now,
        };
        cart.replace_items(vec![item("a", 1), item("b", 0), item("a", 2)]);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(&"a".into()), Some(3));
    }

    #[test]
    fn test_deduct_keeps_units_added_later() {
        let mut cart = cart();
        cart.add("a".into(), 2, Utc::now()).unwrap();
        cart.add("b".into(), 1, Utc::now()).unwrap();
        let lines = vec![LineSnapshot {
            product_id: "a".into(),
            name: "A".to_string(),
            unit_price: Money::new(10),
            quantity: 2,
        }];
        cart.add("a".into(), 1, Utc::now()).unwrap();

        cart.deduct(&lines);
        assert_eq!(cart.quantity_of(&"a".into()), Some(1));
        assert_eq!(cart.quantity_of(&"b".into()), Some(1));
    }

    #[test]
    fn test_clear() {
        let mut cart = cart();
        cart.add("a".into(), 2, Utc::now()).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }
}
