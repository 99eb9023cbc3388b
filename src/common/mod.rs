//! Common types and utilities shared by replicas and the front-end

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{
    Config, FanOutMode, FrontendConfig, RegistryEntry, ReplicaConfig, DEFAULT_INITIAL_BALANCE,
};
pub use error::{Error, FaultBody, FaultKind, Result};
pub use types::{Account, Ack, Tag, Value, ACK};
pub use utils::{encode_email, parse_registry_entry, validate_email};
