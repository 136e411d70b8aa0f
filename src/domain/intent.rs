use super::ports::Record;
use super::product::{Money, ProductId};
use super::user::{ChatId, UserId};
use crate::error::{Result, ShopError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation token linking an issued invoice to its intent.
///
/// Derived from the owning user and creation time so support staff can trace
/// it; a per-ledger sequence number keeps tokens unique within one
/// millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    pub fn derive(user: UserId, at: DateTime<Utc>, sequence: u64) -> Self {
        Self(format!("pay_{}_{}_{}", at.timestamp_millis(), user, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IntentId {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for IntentId {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Committed,
    Expired,
    Failed,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IntentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Committed => "committed",
            IntentStatus::Expired => "expired",
            IntentStatus::Failed => "failed",
        }
    }
}

/// Price and quantity of one product, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineSnapshot {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// External proof of a captured payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub charge_id: String,
    pub committed_at: DateTime<Utc>,
}

/// One checkout attempt, tracked from invoice issuance to settlement or lapse.
///
/// Lines and total are private and set only by [`PaymentIntent::new`], so the
/// total always equals the sum of the line subtotals and neither changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: IntentId,
    pub user: UserId,
    pub chat: ChatId,
    lines: Vec<LineSnapshot>,
    total: Money,
    status: IntentStatus,
    pub created_at: DateTime<Utc>,
    settlement: Option<Settlement>,
    version: u64,
}

impl PaymentIntent {
    pub fn new(
        id: IntentId,
        user: UserId,
        chat: ChatId,
        lines: Vec<LineSnapshot>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if lines.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        if lines.iter().any(|line| line.quantity == 0) {
            return Err(ShopError::InvalidQuantity);
        }
        let total = lines.iter().map(LineSnapshot::subtotal).sum();
        Ok(Self {
            id,
            user,
            chat,
            lines,
            total,
            status: IntentStatus::Pending,
            created_at,
            settlement: None,
            version: 0,
        })
    }

    pub fn lines(&self) -> &[LineSnapshot] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> IntentStatus {
        self.status
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.created_at
    }

    /// Pending -> Committed, recording the external charge reference.
    pub fn commit(&mut self, charge_id: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(IntentStatus::Committed)?;
        self.settlement = Some(Settlement {
            charge_id: charge_id.into(),
            committed_at: now,
        });
        Ok(())
    }

    /// Pending -> Expired.
    pub fn expire(&mut self) -> Result<()> {
        self.transition(IntentStatus::Expired)
    }

    /// Pending -> Failed.
    pub fn fail(&mut self) -> Result<()> {
        self.transition(IntentStatus::Failed)
    }

    fn transition(&mut self, to: IntentStatus) -> Result<()> {
        if self.status != IntentStatus::Pending || to == IntentStatus::Pending {
            return Err(ShopError::InvalidTransition {
                token: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// An age threshold in minutes. Values beyond what `TimeDelta` can hold
/// saturate instead of overflowing.
pub fn max_age(minutes: i64) -> TimeDelta {
    TimeDelta::try_minutes(minutes).unwrap_or(if minutes < 0 {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

impl Record for PaymentIntent {
    type Key = IntentId;

    fn key(&self) -> IntentId {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
