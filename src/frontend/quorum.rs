//! Write-all quorum coordinator
//!
//! Every logical operation is fanned out to the full replica set, in name
//! order:
//! - reads adopt the value with the strictly highest tag sequence, the first
//!   replica contacted wins on ties;
//! - updates read, compute the new balance and a tag one sequence ahead,
//!   then write that value everywhere;
//! - an update is committed only if every replica acknowledged it.
//!
//! Account faults (`InvalidEmail`, `InvalidPoints`, `NotEnoughBalance`, ...)
//! abort at once and reach the caller unchanged. An unreachable replica during
//! the read phase aborts with [`Error::Coordination`]; during the write phase
//! it only withholds its acknowledgement. Writes already applied elsewhere are
//! never rolled back, and two front-ends updating the same account at the same
//! time can lose one of the updates.

use crate::common::{validate_email, Ack, Error, FanOutMode, FrontendConfig, Result, Value};
use crate::frontend::client::{ReplicaClient, ReplicaConnector};
use crate::frontend::naming::{NameResolver, ReplicaHandle};
use futures_util::future::join_all;
use std::future::Future;

/// Stages of one account update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    Reading,
    Reconciling,
    Writing,
    Committed,
    Aborted,
}

impl std::fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdatePhase::Idle => write!(f, "idle"),
            UpdatePhase::Reading => write!(f, "reading"),
            UpdatePhase::Reconciling => write!(f, "reconciling"),
            UpdatePhase::Writing => write!(f, "writing"),
            UpdatePhase::Committed => write!(f, "committed"),
            UpdatePhase::Aborted => write!(f, "aborted"),
        }
    }
}

/// Result of a balance update that got as far as the write phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// All replicas acknowledged `value`
    Committed(Value),
    /// Fewer than all replicas acknowledged; some may hold `value` anyway
    Incomplete {
        value: Value,
        acknowledged: usize,
        replicas: usize,
    },
}

impl WriteOutcome {
    /// Balance reported for an update that did not reach every replica
    pub const FAILED: i64 = -1;

    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed(_))
    }

    /// New balance if committed
    pub fn balance(&self) -> Option<i64> {
        match self {
            WriteOutcome::Committed(value) => Some(value.balance),
            WriteOutcome::Incomplete { .. } => None,
        }
    }

    /// New balance, or [`WriteOutcome::FAILED`]
    pub fn balance_or_failed(&self) -> i64 {
        self.balance().unwrap_or(Self::FAILED)
    }
}

#[derive(Debug, Clone, Copy)]
enum Adjustment {
    Add(i64),
    Spend(i64),
}

impl Adjustment {
    fn points(&self) -> i64 {
        match self {
            Adjustment::Add(p) | Adjustment::Spend(p) => *p,
        }
    }

    fn apply(&self, current: &Value) -> Result<i64> {
        match *self {
            Adjustment::Add(points) => current.balance.checked_add(points).ok_or_else(|| {
                Error::InvalidPoints(format!("adding {} overflows the balance", points))
            }),
            Adjustment::Spend(points) => {
                let balance = current.balance - points;
                if balance < 0 {
                    return Err(Error::NotEnoughBalance {
                        balance: current.balance,
                        requested: points,
                    });
                }
                Ok(balance)
            }
        }
    }
}

/// Front-end over replicas `names[0] .. names[N-1]`.
pub struct QuorumCoordinator<R, C> {
    resolver: R,
    connector: C,
    names: Vec<String>,
    mode: FanOutMode,
}

impl<R: NameResolver, C: ReplicaConnector> QuorumCoordinator<R, C> {
    pub fn new(resolver: R, connector: C, names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one replica is required".into(),
            ));
        }
        Ok(Self {
            resolver,
            connector,
            names,
            mode: FanOutMode::Sequential,
        })
    }

    pub fn from_config(config: &FrontendConfig, resolver: R, connector: C) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(resolver, connector, config.replica_names())?.with_fan_out(config.fan_out))
    }

    pub fn with_fan_out(mut self, mode: FanOutMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of replicas (N)
    pub fn replicas(&self) -> usize {
        self.names.len()
    }

    pub fn replica_names(&self) -> &[String] {
        &self.names
    }

    pub fn fan_out_mode(&self) -> FanOutMode {
        self.mode
    }

    // === Data plane ===

    /// Read every replica and return the freshest value.
    pub async fn read_latest(&self, email: &str) -> Result<Value> {
        validate_email(email)?;
        let replies = self
            .fan_out(move |client| async move { client.read(email).await }, |_| true)
            .await;

        let mut latest: Option<Value> = None;
        for (name, reply) in replies {
            let value = reply.map_err(|e| infrastructure(name, "read", e))?;
            tracing::debug!("{} has {} at {} for {}", name, value.balance, value.tag, email);
            if latest.map_or(true, |best| value.tag.is_newer_than(&best.tag)) {
                latest = Some(value);
            }
        }

        latest.ok_or_else(|| Error::Coordination(format!("no replica answered for {}", email)))
    }

    /// Freshest balance of an account
    pub async fn points_balance(&self, email: &str) -> Result<i64> {
        Ok(self.read_latest(email).await?.balance)
    }

    pub async fn add_points(&self, email: &str, points: i64) -> Result<WriteOutcome> {
        self.update(email, Adjustment::Add(points)).await
    }

    pub async fn spend_points(&self, email: &str, points: i64) -> Result<WriteOutcome> {
        self.update(email, Adjustment::Spend(points)).await
    }

    /// Activate the account on every replica; the first fault wins.
    pub async fn activate_user(&self, email: &str) -> Result<()> {
        validate_email(email)?;
        let replies = self
            .fan_out(move |client| async move { client.activate(email).await }, |_| true)
            .await;
        for (name, reply) in replies {
            reply.map_err(|e| infrastructure(name, "activate", e))?;
        }
        tracing::info!("Activated {} on {} replicas", email, self.replicas());
        Ok(())
    }

    async fn update(&self, email: &str, adjustment: Adjustment) -> Result<WriteOutcome> {
        let mut phase = UpdatePhase::Idle;
        let result = self.run_update(email, adjustment, &mut phase).await;
        match &result {
            Ok(WriteOutcome::Committed(value)) => {
                advance(email, &mut phase, UpdatePhase::Committed);
                tracing::info!("{} committed {} at {}", email, value.balance, value.tag);
            }
            Ok(WriteOutcome::Incomplete {
                acknowledged,
                replicas,
                ..
            }) => {
                advance(email, &mut phase, UpdatePhase::Aborted);
                tracing::warn!(
                    "{} update reached only {}/{} replicas",
                    email,
                    acknowledged,
                    replicas
                );
            }
            Err(e) => {
                let failed_in = phase;
                advance(email, &mut phase, UpdatePhase::Aborted);
                tracing::warn!("{} update aborted while {}: {}", email, failed_in, e);
            }
        }
        result
    }

    async fn run_update(
        &self,
        email: &str,
        adjustment: Adjustment,
        phase: &mut UpdatePhase,
    ) -> Result<WriteOutcome> {
        if adjustment.points() <= 0 {
            return Err(Error::InvalidPoints(format!(
                "points must be positive, got {}",
                adjustment.points()
            )));
        }

        advance(email, phase, UpdatePhase::Reading);
        let current = self.read_latest(email).await?;

        advance(email, phase, UpdatePhase::Reconciling);
        let tag = current.tag.next().ok_or_else(|| {
            Error::Coordination(format!(
                "tag sequence of {} is exhausted at {}",
                email, current.tag
            ))
        })?;
        let value = Value::new(adjustment.apply(&current)?, tag);

        advance(email, phase, UpdatePhase::Writing);
        let acknowledged = self.write_all(email, value).await?;

        let replicas = self.replicas();
        if acknowledged == replicas {
            Ok(WriteOutcome::Committed(value))
        } else {
            Ok(WriteOutcome::Incomplete {
                value,
                acknowledged,
                replicas,
            })
        }
    }

    /// Write `value` to every replica and count acknowledgements.
    async fn write_all(&self, email: &str, value: Value) -> Result<usize> {
        let replies = self
            .fan_out(
                move |client| async move { client.write(email, value).await },
                Error::is_fault,
            )
            .await;

        let mut acknowledged = 0;
        for (name, reply) in replies {
            match reply {
                Ok(ack) if ack.is_success() => acknowledged += 1,
                Ok(Ack { status }) => {
                    tracing::warn!("{} answered '{}' to write of {}", name, status, email)
                }
                Err(e) if e.is_fault() => return Err(e),
                Err(e) if e.is_unreachable() => {
                    tracing::warn!("{} unreachable for write of {}: {}", name, email, e)
                }
                Err(e) => tracing::warn!("write of {} to {} failed: {}", email, name, e),
            }
        }
        Ok(acknowledged)
    }

    // === Control plane ===

    /// Ping every replica and return the non-empty answers in name order,
    /// separated by newlines rather than run together.
    pub async fn ctrl_ping(&self, message: &str) -> Result<String> {
        let replies = self
            .fan_out(
                move |client| async move { client.ctrl_ping(message).await },
                |_| true,
            )
            .await;

        let mut answers = Vec::with_capacity(replies.len());
        for (name, reply) in replies {
            if let Some(answer) = reply.map_err(|e| infrastructure(name, "ping", e))? {
                if !answer.is_empty() {
                    answers.push(answer);
                }
            }
        }
        Ok(answers.join("\n"))
    }

    pub async fn ctrl_clear(&self) -> Result<()> {
        let replies = self
            .fan_out(|client| async move { client.ctrl_clear().await }, |_| true)
            .await;
        for (name, reply) in replies {
            reply.map_err(|e| infrastructure(name, "clear", e))?;
        }
        tracing::info!("Cleared {} replicas", self.replicas());
        Ok(())
    }

    pub async fn ctrl_init(&self, initial_balance: i64) -> Result<()> {
        let replies = self
            .fan_out(
                move |client| async move { client.ctrl_init(initial_balance).await },
                |_| true,
            )
            .await;
        for (name, reply) in replies {
            reply.map_err(|e| infrastructure(name, "init", e))?;
        }
        tracing::info!(
            "Initial balance {} set on {} replicas",
            initial_balance,
            self.replicas()
        );
        Ok(())
    }

    // === Fan-out ===

    fn resolve(&self, name: &str) -> Result<ReplicaHandle> {
        let endpoint = self.resolver.lookup(name)?;
        Ok(ReplicaHandle {
            name: name.to_string(),
            endpoint,
        })
    }

    async fn call<T, F, Fut>(&self, name: &str, op: &F) -> Result<T>
    where
        F: Fn(C::Client) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let handle = self.resolve(name)?;
        let client = self.connector.connect(&handle.endpoint)?;
        tracing::trace!("calling {} at {}", handle.name, handle.endpoint);
        op(client).await
    }

    /// Run `op` against the replicas and return the replies in name order.
    ///
    /// Sequential mode stops after the first error for which `halt` holds;
    /// parallel mode always contacts everyone.
    async fn fan_out<T, F, Fut>(&self, op: F, halt: fn(&Error) -> bool) -> Vec<(&str, Result<T>)>
    where
        F: Fn(C::Client) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.mode {
            FanOutMode::Sequential => {
                let mut replies = Vec::with_capacity(self.names.len());
                for name in &self.names {
                    let reply = self.call(name, &op).await;
                    let stop = matches!(&reply, Err(e) if halt(e));
                    replies.push((name.as_str(), reply));
                    if stop {
                        break;
                    }
                }
                replies
            }
            FanOutMode::Parallel => {
                let op = &op;
                join_all(
                    self.names
                        .iter()
                        .map(move |name| async move { (name.as_str(), self.call(name, op).await) }),
                )
                .await
            }
        }
    }
}

fn advance(email: &str, phase: &mut UpdatePhase, next: UpdatePhase) {
    tracing::debug!("{}: {} -> {}", email, phase, next);
    *phase = next;
}

/// Faults pass through; anything else means the replica set is not usable.
fn infrastructure(name: &str, op: &str, e: Error) -> Error {
    if e.is_fault() {
        e
    } else {
        Error::Coordination(format!("{} on {} failed: {}", op, name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Tag;

    #[test]
    fn test_adjustment_apply() {
        let current = Value::new(150, Tag::new(1));
        assert_eq!(Adjustment::Add(50).apply(&current).unwrap(), 200);
        assert_eq!(Adjustment::Spend(150).apply(&current).unwrap(), 0);
        match Adjustment::Spend(200).apply(&current) {
            Err(Error::NotEnoughBalance { balance, requested }) => {
                assert_eq!((balance, requested), (150, 200));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            Adjustment::Add(i64::MAX).apply(&current),
            Err(Error::InvalidPoints(_))
        ));
    }

    #[test]
    fn test_write_outcome_sentinel() {
        let value = Value::new(10, Tag::new(3));
        assert_eq!(WriteOutcome::Committed(value).balance_or_failed(), 10);
        let partial = WriteOutcome::Incomplete {
            value,
            acknowledged: 2,
            replicas: 3,
        };
        assert!(!partial.is_committed());
        assert_eq!(partial.balance_or_failed(), WriteOutcome::FAILED);
    }

    #[test]
    fn test_infrastructure_mapping() {
        let fault = infrastructure("Points1", "read", Error::InvalidEmail("x".into()));
        assert!(matches!(fault, Error::InvalidEmail(_)));
        let down = infrastructure(
            "Points2",
            "read",
            Error::ConnectionFailed("refused".into()),
        );
        assert!(matches!(down, Error::Coordination(msg) if msg.contains("Points2")));
    }
}
