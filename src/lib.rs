//! # minipoints
//!
//! A points-balance service replicated across a fixed set of replicas:
//! - Each replica keeps every account in memory, one exclusive section per account
//! - A front-end reads all replicas and adopts the highest-tagged value
//! - Updates are written to every replica and succeed only if all acknowledge
//! - HTTP/JSON between front-end and replicas, HTTP for the public API
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Front-end                 │
//! │  read all → max tag → write all (N/N)   │
//! └───────────┬─────────────────────────────┘
//!             │ HTTP/JSON
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ Points1    │   │ Points2    │   │ Points3      │
//! │ (accounts) │   │ (accounts) │   │ (accounts)   │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the replicas
//! ```bash
//! minipoints-replica serve --name Points1 --bind 0.0.0.0:6001
//! minipoints-replica serve --name Points2 --bind 0.0.0.0:6002
//! minipoints-replica serve --name Points3 --bind 0.0.0.0:6003
//! ```
//!
//! ### Start the front-end
//! ```bash
//! minipoints-front serve \
//!   --bind 0.0.0.0:8080 \
//!   --replicas 3 \
//!   --registry Points1=http://localhost:6001,Points2=http://localhost:6002,Points3=http://localhost:6003
//! ```
//!
//! ### Use the CLI
//! ```bash
//! minipoints activate alice@example.com
//! minipoints add alice@example.com 50
//! minipoints spend alice@example.com 20
//! minipoints balance alice@example.com
//! minipoints ping hello
//! ```

pub mod common;
pub mod frontend;
pub mod replica;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use frontend::{FrontEnd, QuorumCoordinator, WriteOutcome};
pub use replica::{AccountStore, ReplicaServer};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
