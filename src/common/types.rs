//! Versioned values exchanged between the front-end and the replicas

use serde::{Deserialize, Serialize};

/// Marker a replica returns when it applied a write.
pub const ACK: &str = "ACK";

/// Version stamp attached to every stored balance.
///
/// Only `seq` takes part in ordering. `cid` is always 0: a single front-end
/// issues every write, so there is nothing to break ties between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub seq: u64,
    pub cid: u32,
}

impl Tag {
    pub const ZERO: Tag = Tag { seq: 0, cid: 0 };

    pub fn new(seq: u64) -> Self {
        Self { seq, cid: 0 }
    }

    /// Tag for the write that follows a read of `self`, `None` once the
    /// sequence is exhausted.
    pub fn next(&self) -> Option<Self> {
        self.seq.checked_add(1).map(Self::new)
    }

    /// Strictly newer than `other`? Equal sequences are not newer.
    pub fn is_newer_than(&self, other: &Tag) -> bool {
        self.seq > other.seq
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{},{}}}", self.seq, self.cid)
    }
}

/// Balance plus the tag of the write that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub balance: i64,
    pub tag: Tag,
}

impl Value {
    pub fn new(balance: i64, tag: Tag) -> Self {
        Self { balance, tag }
    }
}

/// A points account held by one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub balance: i64,
    pub tag: Tag,
}

impl Account {
    pub fn new(email: impl Into<String>, balance: i64) -> Self {
        Self {
            email: email.into(),
            balance,
            tag: Tag::ZERO,
        }
    }

    pub fn value(&self) -> Value {
        Value::new(self.balance, self.tag)
    }
}

/// Write acknowledgement as returned by a replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            status: ACK.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ACK
    }
}
