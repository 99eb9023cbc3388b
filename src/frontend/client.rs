//! Clients for one replica
//!
//! A [`ReplicaConnector`] hands out one [`ReplicaClient`] per (operation,
//! replica) pair. [`HttpConnector`] talks to remote replicas over their RPC
//! surface; [`LocalConnector`] calls in-process stores directly, which is what
//! embedded setups and tests use.

use crate::common::{encode_email, Ack, Error, FaultBody, Result, Value};
use crate::frontend::naming::Endpoint;
use crate::replica::http::{activate_user, ping_reply, InitRequest, PingRequest, PingResponse};
use crate::replica::store::AccountStore;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Operations the front-end invokes on a single replica.
pub trait ReplicaClient: Send + Sync {
    /// Balance and tag. Fails with `InvalidEmail`.
    fn read(&self, email: &str) -> impl Future<Output = Result<Value>> + Send;

    /// Unconditional overwrite. Fails with `InvalidEmail`, `InvalidPoints`
    /// or `NotEnoughBalance`.
    fn write(&self, email: &str, value: Value) -> impl Future<Output = Result<Ack>> + Send;

    /// Fails with `InvalidEmail` or `EmailAlreadyExists`.
    fn activate(&self, email: &str) -> impl Future<Output = Result<Ack>> + Send;

    fn ctrl_ping(&self, message: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn ctrl_clear(&self) -> impl Future<Output = Result<()>> + Send;

    /// Fails with `BadInit`.
    fn ctrl_init(&self, initial_balance: i64) -> impl Future<Output = Result<()>> + Send;
}

/// Builds a client for a resolved endpoint.
pub trait ReplicaConnector: Send + Sync {
    type Client: ReplicaClient;

    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Client>;
}

// === HTTP ===

/// Connector sharing one HTTP connection pool across all replicas.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { http })
    }
}

impl ReplicaConnector for HttpConnector {
    type Client = HttpReplicaClient;

    fn connect(&self, endpoint: &Endpoint) -> Result<HttpReplicaClient> {
        Ok(HttpReplicaClient {
            http: self.http.clone(),
            base: endpoint.as_str().to_string(),
        })
    }
}

pub struct HttpReplicaClient {
    http: reqwest::Client,
    base: String,
}

impl HttpReplicaClient {
    fn account_url(&self, email: &str) -> String {
        format!("{}/accounts/{}", self.base, encode_email(email))
    }

    fn ctrl_url(&self, op: &str) -> String {
        format!("{}/ctrl/{}", self.base, op)
    }
}

/// Decode a successful body, or rebuild the replica's typed fault.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let resp = check(resp).await?;
    Ok(resp.json::<T>().await?)
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match resp.json::<FaultBody>().await {
        Ok(body) => Err(Error::from_fault_body(body)),
        Err(_) => Err(Error::Http(format!("replica answered {}", status))),
    }
}

impl ReplicaClient for HttpReplicaClient {
    async fn read(&self, email: &str) -> Result<Value> {
        let resp = self.http.get(self.account_url(email)).send().await?;
        decode(resp).await
    }

    async fn write(&self, email: &str, value: Value) -> Result<Ack> {
        let resp = self
            .http
            .put(self.account_url(email))
            .json(&value)
            .send()
            .await?;
        decode(resp).await
    }

    async fn activate(&self, email: &str) -> Result<Ack> {
        let resp = self.http.post(self.account_url(email)).send().await?;
        decode(resp).await
    }

    async fn ctrl_ping(&self, message: &str) -> Result<Option<String>> {
        let resp = self
            .http
            .post(self.ctrl_url("ping"))
            .json(&PingRequest {
                message: message.to_string(),
            })
            .send()
            .await?;
        let body: PingResponse = decode(resp).await?;
        Ok(body.message)
    }

    async fn ctrl_clear(&self) -> Result<()> {
        let resp = self.http.post(self.ctrl_url("clear")).send().await?;
        check(resp).await?;
        Ok(())
    }

    async fn ctrl_init(&self, initial_balance: i64) -> Result<()> {
        let resp = self
            .http
            .post(self.ctrl_url("init"))
            .json(&InitRequest { initial_balance })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

// === In-process ===

#[derive(Clone)]
struct LocalReplica {
    name: String,
    store: Arc<AccountStore>,
}

/// Connector for replicas living in the same process.
///
/// Endpoints that were never attached, or were detached, behave like
/// unreachable hosts.
#[derive(Clone, Default)]
pub struct LocalConnector {
    replicas: Arc<RwLock<HashMap<Endpoint, LocalReplica>>>,
}

impl LocalConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, endpoint: Endpoint, name: &str, store: Arc<AccountStore>) {
        self.replicas.write().insert(
            endpoint,
            LocalReplica {
                name: name.to_string(),
                store,
            },
        );
    }

    /// Take a replica offline. Returns its store so it can be re-attached.
    pub fn detach(&self, endpoint: &Endpoint) -> Option<Arc<AccountStore>> {
        self.replicas.write().remove(endpoint).map(|r| r.store)
    }
}

impl ReplicaConnector for LocalConnector {
    type Client = LocalReplicaClient;

    fn connect(&self, endpoint: &Endpoint) -> Result<LocalReplicaClient> {
        let replica = self
            .replicas
            .read()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| Error::ConnectionFailed(format!("{} is unreachable", endpoint)))?;
        Ok(LocalReplicaClient { replica })
    }
}

pub struct LocalReplicaClient {
    replica: LocalReplica,
}

impl ReplicaClient for LocalReplicaClient {
    async fn read(&self, email: &str) -> Result<Value> {
        self.replica.store.get_balance(email)
    }

    async fn write(&self, email: &str, value: Value) -> Result<Ack> {
        self.replica.store.write(email, value)?;
        Ok(Ack::ok())
    }

    async fn activate(&self, email: &str) -> Result<Ack> {
        activate_user(&self.replica.store, email)
    }

    async fn ctrl_ping(&self, message: &str) -> Result<Option<String>> {
        Ok(Some(ping_reply(&self.replica.name, message)))
    }

    async fn ctrl_clear(&self) -> Result<()> {
        self.replica.store.reset();
        Ok(())
    }

    async fn ctrl_init(&self, initial_balance: i64) -> Result<()> {
        self.replica.store.set_initial_balance(initial_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Tag;

    fn email() -> String {
        format!("{}@{}", "zoe", "example.com")
    }

    #[tokio::test]
    async fn test_local_client_round_trip() {
        let connector = LocalConnector::new();
        let endpoint = Endpoint::new("local://points1");
        connector.attach(endpoint.clone(), "Points1", Arc::new(AccountStore::new()));

        let client = connector.connect(&endpoint).unwrap();
        client.activate(&email()).await.unwrap();
        assert!(matches!(
            client.activate(&email()).await,
            Err(Error::EmailAlreadyExists(_))
        ));

        let ack = client
            .write(&email(), Value::new(60, Tag::new(2)))
            .await
            .unwrap();
        assert!(ack.is_success());
        assert_eq!(
            client.read(&email()).await.unwrap(),
            Value::new(60, Tag::new(2))
        );
        assert_eq!(
            client.ctrl_ping("hi").await.unwrap().as_deref(),
            Some("Hello hi from Points1")
        );
    }

    #[tokio::test]
    async fn test_detached_replica_is_unreachable() {
        let connector = LocalConnector::new();
        let endpoint = Endpoint::new("local://points1");
        connector.attach(endpoint.clone(), "Points1", Arc::new(AccountStore::new()));
        assert!(connector.detach(&endpoint).is_some());

        match connector.connect(&endpoint) {
            Err(e) => assert!(e.is_unreachable()),
            Ok(_) => panic!("detached replica must not connect"),
        }
    }

    #[tokio::test]
    async fn test_local_ctrl_init_rejects_negative() {
        let connector = LocalConnector::new();
        let endpoint = Endpoint::new("local://points1");
        connector.attach(endpoint.clone(), "Points1", Arc::new(AccountStore::new()));
        let client = connector.connect(&endpoint).unwrap();
        assert!(matches!(
            client.ctrl_init(-10).await,
            Err(Error::BadInit(-10))
        ));
    }
}
