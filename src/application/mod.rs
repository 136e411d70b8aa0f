//! Application layer: the services that own carts and payment intents, and
//! the checkout flow between them.
//!
//! `CartStore` and `PaymentLedger` each serialize work per key (user or
//! correlation token) with `KeyedLocks`, so unrelated users never wait on each
//! other. `CheckoutCoordinator` is the only component that touches both.

pub mod cart;
pub mod checkout;
pub mod ledger;
pub mod locks;
pub mod reaper;
pub mod storefront;
