use crate::domain::intent::IntentId;
use crate::domain::ports::{Invoice, PaymentGateway};
use crate::domain::user::ChatId;
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// An in-process stand-in for the payment provider.
///
/// Accepts every invoice and keeps it, so a scripted session or a test can
/// later "pay" it. Can be switched into a failing mode to exercise rollback.
#[derive(Clone, Default)]
pub struct SimulatedGateway {
    issued: Arc<RwLock<Vec<Invoice>>>,
    failing: Arc<AtomicBool>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn issued(&self) -> Vec<Invoice> {
        self.issued.read().await.clone()
    }

    /// Most recent invoice delivered to `chat`.
    pub async fn latest_for(&self, chat: ChatId) -> Option<Invoice> {
        let issued = self.issued.read().await;
        issued.iter().rev().find(|invoice| invoice.chat == chat).cloned()
    }

    pub async fn find(&self, token: &IntentId) -> Option<Invoice> {
        let issued = self.issued.read().await;
        issued
            .iter()
            .find(|invoice| &invoice.correlation_token == token)
            .cloned()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn issue_invoice(&self, invoice: &Invoice) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShopError::Gateway("provider unavailable".to_string()));
        }
        info!(
            chat = %invoice.chat,
            token = %invoice.correlation_token,
            total = %invoice.total(),
            currency = %invoice.currency,
            "Invoice issued"
        );
        self.issued.write().await.push(invoice.clone());
        Ok(())
    }
}
