//! stockcore
//!
//! Multi-tenant inventory stock tracking core: a hierarchical
//! warehouse/location model, lot- and serial-tracked items, a stock balance
//! ledger fed by directional stock movements, and unit-of-measure
//! conversion.
//!
//! This crate is a library-level contract. It does not expose a wire
//! protocol and does not ship a database engine: persistence is consumed
//! through the [`store::InventoryStore`] trait, and every call is scoped by
//! an explicit tenant/stage [`entities::Partition`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use entities::Partition;
pub use errors::{ServiceError, ServiceResult};
pub use services::InventoryServices;
