//! Adapters implementing the domain ports for a single in-memory process.

pub mod catalog;
pub mod clock;
pub mod gateway;
pub mod in_memory;
