use crate::domain::intent::PaymentIntent;
use crate::domain::product::{Money, Product};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct StockRow<'a> {
    product: &'a str,
    name: &'a str,
    stock: u32,
}

#[derive(Serialize)]
struct IntentRow<'a> {
    intent: &'a str,
    user: i64,
    total: Money,
    status: &'static str,
    charge: Option<&'a str>,
}

/// Writes the end-of-session tables as CSV.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// `product,name,stock`, one row per catalog entry.
    pub fn write_stock(&mut self, products: &[Product]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(&mut self.writer);
        for product in products {
            csv.serialize(StockRow {
                product: product.id.as_str(),
                name: &product.name,
                stock: product.stock,
            })?;
        }
        csv.flush()?;
        Ok(())
    }

    /// `intent,user,total,status,charge`, one row per payment intent.
    pub fn write_intents(&mut self, intents: &[PaymentIntent]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(&mut self.writer);
        for intent in intents {
            csv.serialize(IntentRow {
                intent: intent.id.as_str(),
                user: intent.user.0,
                total: intent.total(),
                status: intent.status().as_str(),
                charge: intent.settlement().map(|s| s.charge_id.as_str()),
            })?;
        }
        csv.flush()?;
        Ok(())
    }
}
