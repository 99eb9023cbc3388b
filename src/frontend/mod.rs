//! Front-end coordinating reads and writes across the replica set
//!
//! The front-end is responsible for:
//! - Resolving logical replica names to endpoints
//! - Read phase: picking the freshest value across all replicas
//! - Write phase: pushing the new value to all replicas (write-all)
//! - Control-plane fan-out (ping, clear, init)

pub mod client;
pub mod http;
pub mod naming;
pub mod quorum;
pub mod server;

pub use client::{HttpConnector, LocalConnector, ReplicaClient, ReplicaConnector};
pub use naming::{Endpoint, NameResolver, ReplicaHandle, StaticResolver};
pub use quorum::{QuorumCoordinator, UpdatePhase, WriteOutcome};
pub use server::FrontEnd;
