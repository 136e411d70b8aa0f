use crate::application::checkout::InvoiceSettings;
use clap::Args;
use std::time::Duration;

/// Runtime settings. Every field can come from the environment (or a `.env`
/// file) as well as the command line.
#[derive(Debug, Clone, Args)]
pub struct ShopConfig {
    /// Shop name shown in invoice titles
    #[arg(long, env = "SHOP_NAME", default_value = "Chat Shop")]
    pub shop_name: String,

    /// Currency code sent with every invoice
    #[arg(long, env = "SHOP_CURRENCY", default_value = "XTR")]
    pub currency: String,

    /// Minutes a Pending intent may wait for payment before it is expired
    #[arg(
        long,
        env = "PENDING_TTL_MINUTES",
        default_value_t = 30,
        value_parser = clap::value_parser!(i64).range(0..)
    )]
    pub pending_ttl_minutes: i64,

    /// Seconds between background expiry sweeps
    #[arg(long, env = "REAP_INTERVAL_SECS", default_value_t = 60)]
    pub reap_interval_secs: u64,

    /// Give the lines of an expired intent back to the buyer's cart
    #[arg(
        long,
        env = "RESTORE_CART_ON_EXPIRY",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub restore_cart_on_expiry: bool,
}

impl ShopConfig {
    pub fn invoice_settings(&self) -> InvoiceSettings {
        InvoiceSettings {
            shop_name: self.shop_name.clone(),
            currency: self.currency.clone(),
        }
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            shop_name: "Chat Shop".to_string(),
            currency: "XTR".to_string(),
            pending_ttl_minutes: 30,
            reap_interval_secs: 60,
            restore_cart_on_expiry: true,
        }
    }
}
