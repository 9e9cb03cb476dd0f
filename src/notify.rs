//! Publish/subscribe notification chain.
//!
//! A chain holds an ordered list of entries; each entry is either a
//! wildcard entry (matches every publication) or a keyed entry (matches
//! publications whose key compares equal). Publishing walks the chain in
//! order and invokes every matching subscriber's callback.

use std::fmt;

const MAX_CHAIN_NAME: usize = 65;
const MAX_KEY_SIZE: usize = 128;

#[derive(Debug)]
pub enum ChainError {
    NameTooLong { max: usize },
    KeyTooLong { max: usize },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::NameTooLong { max } => {
                write!(f, "chain name exceeds {max} bytes")
            }
            ChainError::KeyTooLong { max } => {
                write!(f, "subscription key exceeds {max} bytes")
            }
        }
    }
}

impl std::error::Error for ChainError {}

/// Operation code carried on every publication, mirroring the
/// `add` / `mod` / `del` distinction used by table-backed subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Unknown,
    Sub,
    Add,
    Mod,
    Del,
}

/// A single publication delivered to matching subscribers.
#[derive(Debug, Clone)]
pub struct Publication {
    pub key: Vec<u8>,
    pub op: Operation,
    pub payload: Option<Vec<u8>>,
}

impl Publication {
    pub fn new(key: impl Into<Vec<u8>>, op: Operation) -> Self {
        Self {
            key: key.into(),
            op,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }
}

pub type SubscriberCallback = Box<dyn Fn(&Publication) + Send + 'static>;

enum Key {
    Wildcard,
    Exact(Vec<u8>),
}

struct Entry {
    key: Key,
    callback: SubscriberCallback,
}

/// An ordered list of subscribers, invoked in registration order on every
/// matching publish.
pub struct Chain {
    name: String,
    entries: Vec<Entry>,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Result<Self, ChainError> {
        let name = name.into();
        if name.len() >= MAX_CHAIN_NAME {
            return Err(ChainError::NameTooLong {
                max: MAX_CHAIN_NAME,
            });
        }
        Ok(Self {
            name,
            entries: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe to every publication on this chain regardless of key.
    pub fn subscribe_wildcard(&mut self, callback: SubscriberCallback) {
        self.entries.push(Entry {
            key: Key::Wildcard,
            callback,
        });
    }

    /// Subscribe to publications whose key compares equal to `key`.
    pub fn subscribe_keyed(
        &mut self,
        key: impl Into<Vec<u8>>,
        callback: SubscriberCallback,
    ) -> Result<(), ChainError> {
        let key = key.into();
        if key.len() > MAX_KEY_SIZE {
            return Err(ChainError::KeyTooLong { max: MAX_KEY_SIZE });
        }
        self.entries.push(Entry {
            key: Key::Exact(key),
            callback,
        });
        Ok(())
    }

    /// Deliver `publication` to every matching subscriber, in registration
    /// order.
    ///
    /// A keyed entry is compared against the publication's key only when
    /// the two are the same length, in which case they must be
    /// byte-for-byte equal. When the lengths differ, the entry falls back
    /// to wildcard behavior and fires unconditionally — preserved verbatim
    /// from the original chain walk, which only reaches its byte comparison
    /// once the stored and incoming key sizes match and otherwise takes the
    /// no-key branch. This looks like a bug but callers depend on it, so
    /// it is kept rather than tightened.
    pub fn publish(&self, publication: &Publication) {
        for entry in &self.entries {
            let matches = match &entry.key {
                Key::Wildcard => true,
                Key::Exact(key) => key.len() != publication.key.len() || *key == publication.key,
            };
            if matches {
                (entry.callback)(publication);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.entries.len()
    }
}
