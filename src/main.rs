use chatshop::application::cart::CartStore;
use chatshop::application::checkout::CheckoutCoordinator;
use chatshop::application::ledger::PaymentLedger;
use chatshop::application::reaper::ExpiryReaper;
use chatshop::application::storefront::Storefront;
use chatshop::config::ShopConfig;
use chatshop::domain::cart::Cart;
use chatshop::domain::intent::PaymentIntent;
use chatshop::domain::ports::{CatalogRef, ClockRef, GatewayRef, StoreRef};
use chatshop::infrastructure::catalog::ProductCatalog;
use chatshop::infrastructure::clock::SystemClock;
use chatshop::infrastructure::gateway::SimulatedGateway;
use chatshop::infrastructure::in_memory::InMemoryStore;
use chatshop::interfaces::csv::event_reader::EventReader;
use chatshop::interfaces::csv::report_writer::ReportWriter;
use chatshop::interfaces::replay::SessionReplay;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Product catalog, JSON array or CSV sheet
    catalog: PathBuf,

    /// Session script CSV with the header `user,chat,action`
    events: PathBuf,

    /// Write the catalog back as JSON to this path after every stock change
    #[arg(long)]
    persist_stock: Option<PathBuf>,

    #[command(flatten)]
    config: ShopConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let mut catalog = ProductCatalog::load(&cli.catalog).into_diagnostic()?;
    if let Some(path) = cli.persist_stock {
        catalog = catalog.persist_to(path);
    }
    let catalog: CatalogRef = Arc::new(catalog);
    let clock: ClockRef = Arc::new(SystemClock);
    let gateway = SimulatedGateway::new();

    let carts: StoreRef<Cart> = Arc::new(InMemoryStore::<Cart>::new());
    let intents: StoreRef<PaymentIntent> = Arc::new(InMemoryStore::<PaymentIntent>::new());
    let cart_store = Arc::new(CartStore::new(carts, catalog.clone(), clock.clone()));
    let ledger = Arc::new(PaymentLedger::new(intents, catalog.clone(), clock));
    let gateway_ref: GatewayRef = Arc::new(gateway.clone());

    let coordinator = Arc::new(
        CheckoutCoordinator::new(
            cart_store,
            ledger.clone(),
            catalog.clone(),
            gateway_ref,
            config.invoice_settings(),
        )
        .restore_cart_on_expiry(config.restore_cart_on_expiry),
    );
    let storefront = Arc::new(Storefront::new(
        coordinator.clone(),
        catalog.clone(),
        config.currency.clone(),
    ));

    let reaper = ExpiryReaper::new(
        coordinator,
        config.pending_ttl_minutes,
        config.reap_interval(),
    )
    .spawn();

    // Replay the session
    let file = File::open(&cli.events).into_diagnostic()?;
    let replay = SessionReplay::new(storefront, gateway);
    for event in EventReader::new(file).events() {
        match event {
            Ok(event) => {
                if let Err(e) = replay.apply(event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    reaper.stop().await;

    let summary = ledger.summary().await.into_diagnostic()?;
    info!(?summary, "Session finished");

    // Output final state
    let products = catalog.all().await.into_diagnostic()?;
    let intents = ledger.intents().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    ReportWriter::new(&mut out)
        .write_stock(&products)
        .into_diagnostic()?;
    writeln!(out).into_diagnostic()?;
    ReportWriter::new(&mut out)
        .write_intents(&intents)
        .into_diagnostic()?;

    Ok(())
}
