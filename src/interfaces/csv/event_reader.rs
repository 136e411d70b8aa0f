use crate::domain::command::Command;
use crate::domain::product::Money;
use crate::domain::user::{ChatId, UserId};
use crate::error::{Result, ShopError};
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

/// One step of a scripted chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user action, in callback-data form.
    Command(Command),
    /// The gateway asks whether the chat's latest invoice may be paid.
    PreCheckout,
    /// The buyer pays the chat's latest invoice; `amount` overrides the
    /// invoiced total.
    Pay { amount: Option<Money> },
    /// On-demand expiry sweep.
    Reap { max_age_minutes: i64 },
}

impl FromStr for SessionEvent {
    type Err = ShopError;

    fn from_str(action: &str) -> Result<Self> {
        let action = action.trim();
        let invalid = || ShopError::UnknownAction(action.to_string());
        match action.split_once(':') {
            None if action == "pre_checkout" => Ok(SessionEvent::PreCheckout),
            None if action == "pay" => Ok(SessionEvent::Pay { amount: None }),
            Some(("pay", amount)) => Ok(SessionEvent::Pay {
                amount: Some(Money::new(amount.parse().map_err(|_| invalid())?)),
            }),
            Some(("reap", minutes)) => Ok(SessionEvent::Reap {
                max_age_minutes: minutes.parse().map_err(|_| invalid())?,
            }),
            _ => action.parse().map(SessionEvent::Command),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    user: i64,
    chat: i64,
    action: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedEvent {
    pub user: UserId,
    pub chat: ChatId,
    pub event: SessionEvent,
}

/// Reads a session script with the header `user,chat,action`.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn events(self) -> impl Iterator<Item = Result<ScriptedEvent>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| -> Result<ScriptedEvent> {
                let record = result?;
                Ok(ScriptedEvent {
                    user: UserId(record.user),
                    chat: ChatId(record.chat),
                    event: record.action.parse::<SessionEvent>()?,
                })
            })
    }
}
