use super::locks::KeyedLocks;
use crate::domain::intent::{IntentId, IntentStatus, LineSnapshot, PaymentIntent, max_age};
use crate::domain::ports::{CatalogRef, ClockRef, StoreRef};
use crate::domain::product::{Money, ProductId};
use crate::domain::user::{ChatId, UserId};
use crate::error::{Result, ShopError};
use chrono::TimeDelta;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unknown,
    NotPending(IntentStatus),
}

/// Answer to the gateway's pre-capture check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Accepted { total: Money },
    Rejected(RejectReason),
}

impl Authorization {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Authorization::Accepted { .. })
    }
}

/// A snapshot line whose stock could not be taken after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub quantity: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// This call moved the intent to Committed and took the stock.
    Committed {
        intent: PaymentIntent,
        shortfalls: Vec<StockShortfall>,
    },
    /// A repeated callback; nothing changed.
    AlreadyCommitted(PaymentIntent),
}

impl CommitOutcome {
    pub fn intent(&self) -> &PaymentIntent {
        match self {
            CommitOutcome::Committed { intent, .. } | CommitOutcome::AlreadyCommitted(intent) => {
                intent
            }
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, CommitOutcome::AlreadyCommitted(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    pub pending: usize,
    pub committed: usize,
    pub expired: usize,
    pub failed: usize,
}

/// Owner of every payment intent.
///
/// Each transition happens under the intent's own lock and re-reads the
/// current status first, so a capture and an expiry sweep racing on the same
/// token resolve to exactly one terminal state. The store's version check
/// backs this up for writers outside this process.
pub struct PaymentLedger {
    intents: StoreRef<PaymentIntent>,
    catalog: CatalogRef,
    clock: ClockRef,
    locks: KeyedLocks<IntentId>,
    sequence: AtomicU64,
}

impl PaymentLedger {
    pub fn new(intents: StoreRef<PaymentIntent>, catalog: CatalogRef, clock: ClockRef) -> Self {
        Self {
            intents,
            catalog,
            clock,
            locks: KeyedLocks::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Records a new Pending intent for the given snapshot.
    pub async fn open(
        &self,
        user: UserId,
        chat: ChatId,
        lines: Vec<LineSnapshot>,
    ) -> Result<PaymentIntent> {
        let now = self.clock.now();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = IntentId::derive(user, now, sequence);
        let intent = PaymentIntent::new(id, user, chat, lines, now)?;
        self.intents.put(intent).await
    }

    /// Rolls back an intent whose invoice never reached the buyer.
    pub async fn discard(&self, token: &IntentId) -> Result<()> {
        let _guard = self.locks.lock(token).await;
        match self.intents.get(token).await? {
            Some(intent) if intent.status() == IntentStatus::Pending => {
                self.intents.delete(token).await?;
            }
            Some(intent) => {
                warn!(%token, status = intent.status().as_str(), "Refusing to discard settled intent");
            }
            None => {}
        }
        Ok(())
    }

    pub async fn get(&self, token: &IntentId) -> Result<Option<PaymentIntent>> {
        self.intents.get(token).await
    }

    /// Read-only: accepts only a known, still Pending intent.
    pub async fn authorize(&self, token: &IntentId) -> Result<Authorization> {
        let authorization = match self.intents.get(token).await? {
            None => Authorization::Rejected(RejectReason::Unknown),
            Some(intent) if intent.status() == IntentStatus::Pending => Authorization::Accepted {
                total: intent.total(),
            },
            Some(intent) => Authorization::Rejected(RejectReason::NotPending(intent.status())),
        };
        if !authorization.is_accepted() {
            info!(%token, ?authorization, "Pre-checkout rejected");
        }
        Ok(authorization)
    }

    /// Settles a Pending intent and takes its stock.
    ///
    /// Repeating the call for a Committed intent is a no-op. An unknown,
    /// Expired or Failed token is a [`ShopError::Reconciliation`]: money was
    /// taken with no live reservation behind it.
    pub async fn commit(&self, token: &IntentId, charge_id: &str) -> Result<CommitOutcome> {
        let _guard = self.locks.lock(token).await;
        self.commit_locked(token, charge_id).await
    }

    /// Gateway capture callback: like [`commit`](Self::commit), but the
    /// captured amount must match the snapshot total. A mismatch fails the
    /// intent without touching stock.
    pub async fn capture(
        &self,
        token: &IntentId,
        charge_id: &str,
        amount: Money,
    ) -> Result<CommitOutcome> {
        let _guard = self.locks.lock(token).await;
        if let Some(mut intent) = self.intents.get(token).await?
            && intent.status() == IntentStatus::Pending
            && intent.total() != amount
        {
            let total = intent.total();
            intent.fail()?;
            self.intents.put(intent).await?;
            error!(%token, charge_id, %amount, %total, "Captured amount does not match intent total");
            return Err(ShopError::Reconciliation {
                token: token.clone(),
                reason: format!("captured {amount} but intent total is {total}"),
            });
        }
        self.commit_locked(token, charge_id).await
    }

    async fn commit_locked(&self, token: &IntentId, charge_id: &str) -> Result<CommitOutcome> {
        let Some(mut intent) = self.intents.get(token).await? else {
            error!(%token, charge_id, "Payment captured for unknown intent");
            return Err(ShopError::Reconciliation {
                token: token.clone(),
                reason: "no payment intent for token".to_string(),
            });
        };

        match intent.status() {
            IntentStatus::Committed => {
                if let Some(settlement) = intent.settlement()
                    && settlement.charge_id != charge_id
                {
                    warn!(%token, first = %settlement.charge_id, repeated = charge_id, "Repeated commit with a different charge id");
                }
                info!(%token, "Duplicate commit ignored");
                Ok(CommitOutcome::AlreadyCommitted(intent))
            }
            status @ (IntentStatus::Expired | IntentStatus::Failed) => {
                error!(%token, charge_id, status = status.as_str(), "Payment captured for a closed intent");
                Err(ShopError::Reconciliation {
                    token: token.clone(),
                    reason: format!("payment intent is {}", status.as_str()),
                })
            }
            IntentStatus::Pending => {
                intent.commit(charge_id, self.clock.now())?;
                let intent = self.intents.put(intent).await?;
                let shortfalls = self.take_stock(&intent).await;
                info!(%token, user = %intent.user, total = %intent.total(), "Payment committed");
                Ok(CommitOutcome::Committed { intent, shortfalls })
            }
        }
    }

    /// Decrements stock for every line. A line that cannot be taken is
    /// reported as a shortfall; the remaining lines are still processed.
    async fn take_stock(&self, intent: &PaymentIntent) -> Vec<StockShortfall> {
        let mut shortfalls = Vec::new();
        for line in intent.lines() {
            match self
                .catalog
                .decrement_stock(&line.product_id, line.quantity)
                .await
            {
                Ok(remaining) => {
                    info!(product = %line.product_id, quantity = line.quantity, remaining, "Stock taken");
                }
                Err(e) => {
                    error!(token = %intent.id, product = %line.product_id, quantity = line.quantity, error = %e, "Paid line could not be fulfilled from stock");
                    shortfalls.push(StockShortfall {
                        product_id: line.product_id.clone(),
                        quantity: line.quantity,
                        reason: e.to_string(),
                    });
                }
            }
        }
        shortfalls
    }

    /// Moves every Pending intent older than `max_age_minutes` to Expired
    /// and returns how many were reclaimed.
    pub async fn expire(&self, max_age_minutes: i64) -> Result<usize> {
        Ok(self.sweep(max_age(max_age_minutes)).await?.len())
    }

    /// Like [`expire`](Self::expire), returning the reclaimed intents.
    ///
    /// Each candidate is re-read under its lock; anything no longer Pending
    /// at that point is left alone.
    pub async fn sweep(&self, max_age: TimeDelta) -> Result<Vec<PaymentIntent>> {
        let now = self.clock.now();
        let is_stale = |intent: &PaymentIntent| {
            intent.status() == IntentStatus::Pending && intent.age(now) >= max_age
        };

        let candidates: Vec<IntentId> = self
            .intents
            .values()
            .await?
            .into_iter()
            .filter(|intent| is_stale(intent))
            .map(|intent| intent.id)
            .collect();

        let mut reclaimed = Vec::new();
        for token in candidates {
            let _guard = self.locks.lock(&token).await;
            if let Some(mut intent) = self.intents.get(&token).await?
                && is_stale(&intent)
            {
                intent.expire()?;
                reclaimed.push(self.intents.put(intent).await?);
            }
        }

        if !reclaimed.is_empty() {
            info!(count = reclaimed.len(), "Expired abandoned payment intents");
        }
        Ok(reclaimed)
    }

    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.summary().await?.pending)
    }

    pub async fn summary(&self) -> Result<LedgerSummary> {
        let mut summary = LedgerSummary::default();
        for intent in self.intents.values().await? {
            match intent.status() {
                IntentStatus::Pending => summary.pending += 1,
                IntentStatus::Committed => summary.committed += 1,
                IntentStatus::Expired => summary.expired += 1,
                IntentStatus::Failed => summary.failed += 1,
            }
        }
        Ok(summary)
    }

    /// All intents, oldest first.
    pub async fn intents(&self) -> Result<Vec<PaymentIntent>> {
        let mut intents = self.intents.values().await?;
        intents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(intents)
    }
}
