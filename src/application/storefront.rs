use super::cart::{CartLine, CartSummary, QuantityChange};
use super::checkout::{CheckoutCoordinator, CheckoutReceipt};
use super::ledger::{Authorization, CommitOutcome};
use crate::domain::command::{Command, GatewayEvent};
use crate::domain::ports::CatalogRef;
use crate::domain::product::{Product, ProductId};
use crate::domain::user::{ChatId, UserId};
use crate::error::{Result, ShopError};
use std::sync::Arc;
use tracing::{error, warn};

/// How the transport should acknowledge the triggering event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Silent,
    Toast(String),
    Alert(String),
}

/// What the transport should render. Layout is the transport's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    None,
    Menu { featured: Vec<Product> },
    Categories(Vec<String>),
    Products { title: String, products: Vec<Product> },
    ProductDetail(Product),
    Cart(CartSummary),
    CartItem(CartLine),
    Invoiced(CheckoutReceipt),
    Notice(String),
}

/// Everything a handled command produced, returned in one piece so the
/// transport can acknowledge after the work is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub reply: Reply,
    pub ack: Ack,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Self {
            reply,
            ack: Ack::Silent,
        }
    }

    fn alert(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::None,
            ack: Ack::Alert(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayReply {
    PreCheckout {
        ok: bool,
        error_message: Option<String>,
    },
    /// `notify` is the message for the buyer, if one should be sent.
    Payment { notify: Option<(ChatId, String)> },
}

/// Maps decoded user actions and gateway callbacks onto the services.
pub struct Storefront {
    coordinator: Arc<CheckoutCoordinator>,
    catalog: CatalogRef,
    currency: String,
}

impl Storefront {
    pub fn new(coordinator: Arc<CheckoutCoordinator>, catalog: CatalogRef, currency: impl Into<String>) -> Self {
        Self {
            coordinator,
            catalog,
            currency: currency.into(),
        }
    }

    pub fn coordinator(&self) -> &Arc<CheckoutCoordinator> {
        &self.coordinator
    }

    /// Runs a command to completion. Failures become an alert for the user.
    pub async fn handle(&self, user: UserId, chat: ChatId, command: Command) -> Outcome {
        match self.dispatch(user, chat, &command).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%user, ?command, error = %e, "Command failed");
                Outcome::alert(e.user_message())
            }
        }
    }

    async fn dispatch(&self, user: UserId, chat: ChatId, command: &Command) -> Result<Outcome> {
        let carts = self.coordinator.carts();
        let outcome = match command {
            Command::MainMenu => Outcome::reply(Reply::Menu {
                featured: self.catalog.featured().await?,
            }),
            Command::BackToShop => Outcome::reply(Reply::Categories(self.catalog.list_categories().await?)),
            Command::AllProducts => self.products("All products", self.catalog.all().await?),
            Command::Featured => self.products("Featured", self.catalog.featured().await?),
            Command::Category(category) => {
                self.products(category, self.catalog.get_by_category(category).await?)
            }
            Command::Search(text) => {
                let found = self.catalog.search(text).await?;
                if found.is_empty() {
                    Outcome::reply(Reply::Notice(format!("No products match \"{text}\".")))
                } else {
                    self.products(&format!("Results for \"{text}\""), found)
                }
            }
            Command::Product(id) => match self.catalog.get_by_id(id).await? {
                Some(product) => Outcome::reply(Reply::ProductDetail(product)),
                None => Outcome::reply(Reply::Notice("Product not found.".to_string())),
            },
            Command::AddToCart(id) => self.add_to_cart(user, id).await?,
            Command::ViewCart => Outcome::reply(Reply::Cart(carts.summarize(user).await?)),
            Command::CartItem(id) => self.cart_item(user, id).await?,
            Command::RemoveItem(id) => {
                carts.remove_item(user, id).await?;
                Outcome::reply(Reply::Cart(carts.summarize(user).await?))
            }
            Command::Quantity { product, delta } => {
                self.change_quantity(user, product, *delta).await?
            }
            Command::ClearCart => {
                carts.clear(user).await?;
                Outcome::reply(Reply::Cart(carts.summarize(user).await?))
            }
            Command::Checkout => match self.coordinator.checkout(user, chat).await {
                Ok(receipt) => Outcome::reply(Reply::Invoiced(receipt)),
                Err(e @ (ShopError::Validation { .. } | ShopError::EmptyCart)) => {
                    Outcome::reply(Reply::Notice(e.user_message()))
                }
                Err(e) => return Err(e),
            },
        };
        Ok(outcome)
    }

    fn products(&self, title: &str, products: Vec<Product>) -> Outcome {
        Outcome::reply(Reply::Products {
            title: title.to_string(),
            products,
        })
    }

    async fn add_to_cart(&self, user: UserId, id: &ProductId) -> Result<Outcome> {
        let Some(product) = self.catalog.get_by_id(id).await? else {
            return Ok(Outcome::alert("Product not found."));
        };
        if product.stock == 0 {
            return Ok(Outcome::alert(format!("{} is sold out.", product.name)));
        }
        let cart = self
            .coordinator
            .carts()
            .add_item(user, product.id.clone(), 1)
            .await?;
        Ok(Outcome {
            reply: Reply::Notice(format!(
                "{} added to your cart. Items in cart: {}",
                product.name,
                cart.item_count()
            )),
            ack: Ack::Toast("Added to cart".to_string()),
        })
    }

    async fn cart_item(&self, user: UserId, id: &ProductId) -> Result<Outcome> {
        let summary = self.coordinator.carts().summarize(user).await?;
        Ok(
            match summary.lines.into_iter().find(|line| &line.product.id == id) {
                Some(line) => Outcome::reply(Reply::CartItem(line)),
                None => Outcome::reply(Reply::Notice("Product not found.".to_string())),
            },
        )
    }

    async fn change_quantity(&self, user: UserId, id: &ProductId, delta: i64) -> Result<Outcome> {
        let carts = self.coordinator.carts();
        let Some(product) = self.catalog.get_by_id(id).await? else {
            return Ok(Outcome::reply(Reply::Cart(carts.summarize(user).await?)));
        };
        match carts.adjust_quantity(user, &product, delta).await? {
            QuantityChange::Updated(_) => self.cart_item(user, id).await,
            QuantityChange::ExceedsStock { available } => Ok(Outcome::alert(format!(
                "Not enough stock, only {available} left."
            ))),
            QuantityChange::NotInCart | QuantityChange::Removed => {
                Ok(Outcome::reply(Reply::Cart(carts.summarize(user).await?)))
            }
        }
    }

    /// Answers a gateway callback.
    pub async fn on_gateway_event(&self, event: GatewayEvent) -> GatewayReply {
        let ledger = self.coordinator.ledger();
        match event {
            GatewayEvent::PreCheckout { token } => match ledger.authorize(&token).await {
                Ok(Authorization::Accepted { .. }) => GatewayReply::PreCheckout {
                    ok: true,
                    error_message: None,
                },
                Ok(Authorization::Rejected(_)) => GatewayReply::PreCheckout {
                    ok: false,
                    error_message: Some("Order expired or not found.".to_string()),
                },
                Err(e) => {
                    error!(%token, error = %e, "Pre-checkout check failed");
                    GatewayReply::PreCheckout {
                        ok: false,
                        error_message: Some("Payment verification failed, please try again.".to_string()),
                    }
                }
            },
            GatewayEvent::Payment {
                token,
                charge_id,
                amount,
            } => match ledger.capture(&token, &charge_id, amount).await {
                Ok(CommitOutcome::Committed { intent, .. }) => GatewayReply::Payment {
                    notify: Some((
                        intent.chat,
                        format!(
                            "Payment received! Amount: {} {}. Products: {}. Transaction id: {}. Thank you for your order!",
                            intent.total(),
                            self.currency,
                            intent.lines().len(),
                            charge_id
                        ),
                    )),
                },
                Ok(CommitOutcome::AlreadyCommitted(_)) => GatewayReply::Payment { notify: None },
                Err(e) => {
                    let chat = match ledger.get(&token).await {
                        Ok(intent) => intent.map(|intent| intent.chat),
                        Err(_) => None,
                    };
                    GatewayReply::Payment {
                        notify: chat.map(|chat| (chat, e.user_message())),
                    }
                }
            },
        }
    }
}
