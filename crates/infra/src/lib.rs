//! Infrastructure layer: event stores, the ledger service, the contract host
//! surface, and configuration.

pub mod config;
pub mod contract;
pub mod event_store;
pub mod service;

pub use config::{ConfigError, GuestbookConfig, StoreBackend};
pub use contract::{CallContext, Contract, ContractError};
pub use service::{LedgerService, ServiceError};
