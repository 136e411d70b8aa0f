//! Domain types and the ports the application layer is written against.

pub mod cart;
pub mod command;
pub mod intent;
pub mod ports;
pub mod product;
pub mod user;
