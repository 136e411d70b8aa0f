use crate::domain::intent::{IntentId, IntentStatus};
use crate::domain::product::ProductId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        requested: u32,
        available: u32,
    },
    #[error("Quantity must be positive")]
    InvalidQuantity,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Cart validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },
    #[error("Invoice issuance failed: {0}")]
    Gateway(String),
    #[error("Payment {token} requires manual reconciliation: {reason}")]
    Reconciliation { token: IntentId, reason: String },
    #[error("Invalid transition for {token}: {from:?} -> {to:?}")]
    InvalidTransition {
        token: IntentId,
        from: IntentStatus,
        to: IntentStatus,
    },
    #[error("Version conflict on {key}: expected {expected}, found {found}")]
    Conflict {
        key: String,
        expected: u64,
        found: u64,
    },
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShopError {
    /// Plain-language text safe to show to a buyer.
    ///
    /// Only the payment correlation token is ever echoed back, so support can
    /// trace a reconciliation case.
    pub fn user_message(&self) -> String {
        match self {
            ShopError::ProductNotFound(_) => "This product is no longer available.".to_string(),
            ShopError::InsufficientStock { available, .. } => {
                format!("Not enough stock, only {available} left.")
            }
            ShopError::InvalidQuantity => "Please choose a quantity of at least one.".to_string(),
            ShopError::EmptyCart => "Your cart is empty.".to_string(),
            ShopError::Validation { errors } => {
                format!("Some items in your cart changed:\n{}", errors.join("\n"))
            }
            ShopError::Gateway(_) => {
                "We could not create your invoice. Your cart is unchanged, please try again."
                    .to_string()
            }
            ShopError::Reconciliation { token, .. } => format!(
                "Something went wrong while confirming your payment. Please contact support with payment id {token}."
            ),
            ShopError::UnknownAction(_) => "Unknown action.".to_string(),
            _ => "Something went wrong, please try again.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
