//! Boundaries to the outside: CSV ingestion and output, and the scripted
//! session replay used by the binary.

pub mod csv;
pub mod replay;
