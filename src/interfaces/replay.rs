use super::csv::event_reader::{ScriptedEvent, SessionEvent};
use crate::application::storefront::{Ack, GatewayReply, Reply, Storefront};
use crate::domain::command::GatewayEvent;
use crate::domain::intent::max_age;
use crate::infrastructure::gateway::SimulatedGateway;
use crate::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Plays a scripted session through the storefront, standing in for both
/// the chat transport and the payment provider.
pub struct SessionReplay {
    storefront: Arc<Storefront>,
    gateway: SimulatedGateway,
}

impl SessionReplay {
    pub fn new(storefront: Arc<Storefront>, gateway: SimulatedGateway) -> Self {
        Self {
            storefront,
            gateway,
        }
    }

    pub async fn apply(&self, scripted: ScriptedEvent) -> Result<()> {
        let ScriptedEvent { user, chat, event } = scripted;
        match event {
            SessionEvent::Command(command) => {
                let outcome = self.storefront.handle(user, chat, command).await;
                match &outcome.ack {
                    Ack::Alert(message) => warn!(%user, message = %message, "Alert"),
                    Ack::Toast(message) => info!(%user, message = %message, "Toast"),
                    Ack::Silent => {}
                }
                if let Reply::Notice(message) = &outcome.reply {
                    info!(%user, message = %message, "Notice");
                }
            }
            SessionEvent::PreCheckout => {
                let Some(invoice) = self.gateway.latest_for(chat).await else {
                    warn!(%chat, "No invoice to check");
                    return Ok(());
                };
                let reply = self
                    .storefront
                    .on_gateway_event(GatewayEvent::PreCheckout {
                        token: invoice.correlation_token,
                    })
                    .await;
                info!(%chat, ?reply, "Pre-checkout answered");
            }
            SessionEvent::Pay { amount } => {
                let Some(invoice) = self.gateway.latest_for(chat).await else {
                    warn!(%chat, "No invoice to pay");
                    return Ok(());
                };
                let token = invoice.correlation_token.clone();
                let precheck = self
                    .storefront
                    .on_gateway_event(GatewayEvent::PreCheckout {
                        token: token.clone(),
                    })
                    .await;
                if !matches!(precheck, GatewayReply::PreCheckout { ok: true, .. }) {
                    // The provider would normally stop here; capture anyway to
                    // exercise late-capture reconciliation.
                    warn!(%token, "Capturing despite a rejected pre-checkout");
                }
                let reply = self
                    .storefront
                    .on_gateway_event(GatewayEvent::Payment {
                        charge_id: format!("ch_{token}"),
                        amount: amount.unwrap_or_else(|| invoice.total()),
                        token,
                    })
                    .await;
                if let GatewayReply::Payment {
                    notify: Some((chat, message)),
                } = reply
                {
                    info!(%chat, message = %message, "Buyer notified");
                }
            }
            SessionEvent::Reap { max_age_minutes } => {
                let count = self
                    .storefront
                    .coordinator()
                    .reclaim_expired(max_age(max_age_minutes))
                    .await?;
                info!(count, "On-demand sweep");
            }
        }
        Ok(())
    }
}
