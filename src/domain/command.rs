use super::intent::IntentId;
use super::product::{Money, ProductId};
use crate::error::ShopError;
use std::str::FromStr;

/// A user action, decoded once from the transport's callback data.
///
/// The wire form is `<action>[:<arg>...]`, e.g. `add_cart:p1` or
/// `quantity:p1:-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MainMenu,
    BackToShop,
    AllProducts,
    Featured,
    Category(String),
    Product(ProductId),
    Search(String),
    AddToCart(ProductId),
    ViewCart,
    CartItem(ProductId),
    RemoveItem(ProductId),
    Quantity { product: ProductId, delta: i64 },
    Checkout,
    ClearCart,
}

impl FromStr for Command {
    type Err = ShopError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || ShopError::UnknownAction(data.to_string());
        let mut parts = data.trim().splitn(3, ':');
        let action = parts.next().unwrap_or_default();
        let first = parts.next().filter(|arg| !arg.is_empty());
        let second = parts.next();
        let product = |arg: Option<&str>| arg.map(ProductId::from).ok_or_else(unknown);

        let command = match action {
            "main_menu" => Command::MainMenu,
            "back_to_shop" => Command::BackToShop,
            "all_products" => Command::AllProducts,
            "featured" => Command::Featured,
            "cart_view" => Command::ViewCart,
            "checkout" => Command::Checkout,
            "clear_cart" => Command::ClearCart,
            "category" => Command::Category(first.ok_or_else(unknown)?.to_string()),
            "search" => Command::Search(first.ok_or_else(unknown)?.to_string()),
            "product" => Command::Product(product(first)?),
            "add_cart" => Command::AddToCart(product(first)?),
            "cart_item" => Command::CartItem(product(first)?),
            "remove_item" => Command::RemoveItem(product(first)?),
            "quantity" => Command::Quantity {
                product: product(first)?,
                delta: second
                    .and_then(|delta| delta.trim_start_matches('+').parse().ok())
                    .ok_or_else(unknown)?,
            },
            _ => return Err(unknown()),
        };
        Ok(command)
    }
}

/// Asynchronous callbacks from the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The buyer pressed pay; the gateway asks whether to proceed.
    PreCheckout { token: IntentId },
    /// Funds were captured.
    Payment {
        token: IntentId,
        charge_id: String,
        amount: Money,
    },
}
