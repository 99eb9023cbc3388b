//! Replica process
//!
//! Each replica holds a full copy of the account map and acts on every RPC
//! on its own. There is no cross-replica coordination here:
//! - `store`: balances, tags and the per-account exclusive section
//! - `http`: the RPC surface the front-end talks to
//! - `server`: process wrapper owning the store

pub mod http;
pub mod server;
pub mod store;

pub use server::ReplicaServer;
pub use store::AccountStore;
