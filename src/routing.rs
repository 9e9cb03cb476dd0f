//! Toy routing table used as a demo data source driving a notification
//! chain.
//!
//! Mutation always publishes `Mod` to the whole chain — never `Add`, even
//! for a brand-new record. `Add` is instead delivered once, directly, to a
//! subscriber that registers onto an entry that already exists in the
//! table, live record or placeholder alike: a catch-up notice rather than
//! a broadcast event. This looks asymmetric but is exactly what the
//! original publisher/subscriber pairing relies on, so it's kept rather
//! than "fixed".

use crate::notify::{Chain, ChainError, Operation, Publication, SubscriberCallback};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub dest_ip: String,
    pub mask: u8,
}

impl RouteKey {
    pub fn new(dest_ip: impl Into<String>, mask: u8) -> Self {
        Self {
            dest_ip: dest_ip.into(),
            mask,
        }
    }

    fn wire(&self) -> Vec<u8> {
        format!("{}/{}", self.dest_ip, self.mask).into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub key: RouteKey,
    pub gateway_ip: String,
    pub out_interface: String,
}

#[derive(Debug)]
pub enum RoutingError {
    NotFound,
    Chain(ChainError),
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::NotFound => write!(f, "no routing entry for the given key"),
            RoutingError::Chain(e) => write!(f, "notification chain error: {e}"),
        }
    }
}

impl std::error::Error for RoutingError {}

impl From<ChainError> for RoutingError {
    fn from(e: ChainError) -> Self {
        RoutingError::Chain(e)
    }
}

struct Entry {
    record: Option<RouteRecord>,
    chain: Chain,
}

/// An in-memory routing table that publishes Mod/Del notifications per
/// entry as it's mutated, and Add as a one-shot catch-up to late
/// subscribers.
pub struct RoutingTable {
    entries: HashMap<RouteKey, Entry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn entry_or_placeholder(&mut self, key: &RouteKey) -> Result<&mut Entry, RoutingError> {
        if !self.entries.contains_key(key) {
            let chain = Chain::new(format!("rt:{}/{}", key.dest_ip, key.mask))?;
            self.entries.insert(
                key.clone(),
                Entry {
                    record: None,
                    chain,
                },
            );
        }
        Ok(self.entries.get_mut(key).expect("just inserted"))
    }

    /// Create or update the record at `key`. Always publishes `Mod` to the
    /// whole chain, whether the record is brand new or already existed —
    /// creation is never itself an event subscribers see as `Add`.
    pub fn add_or_update(
        &mut self,
        key: RouteKey,
        gateway_ip: impl Into<String>,
        out_interface: impl Into<String>,
    ) -> Result<(), RoutingError> {
        let gateway_ip = gateway_ip.into();
        let out_interface = out_interface.into();

        let entry = self.entry_or_placeholder(&key)?;
        entry.record = Some(RouteRecord {
            key: key.clone(),
            gateway_ip,
            out_interface,
        });
        entry
            .chain
            .publish(&Publication::new(key.wire(), Operation::Mod));
        Ok(())
    }

    /// Delete an entry, publishing `Del` to its subscribers first.
    pub fn delete(&mut self, key: &RouteKey) -> Result<(), RoutingError> {
        let entry = self.entries.get_mut(key).ok_or(RoutingError::NotFound)?;
        if entry.record.is_none() {
            return Err(RoutingError::NotFound);
        }
        entry
            .chain
            .publish(&Publication::new(key.wire(), Operation::Del));
        self.entries.remove(key);
        Ok(())
    }

    pub fn lookup(&self, key: &RouteKey) -> Option<&RouteRecord> {
        self.entries.get(key).and_then(|e| e.record.as_ref())
    }

    /// Register a callback for updates to `key`.
    ///
    /// If no entry — not even a placeholder — exists yet at this key, one is
    /// created to hold the subscription and nothing fires. If an entry
    /// already exists, whether it holds a live record or is itself just a
    /// placeholder left by an earlier subscriber, the new subscriber is
    /// sent one `Add` immediately as a catch-up: the entry is new to this
    /// subscriber even if it isn't new to the table.
    pub fn register_for_notification(
        &mut self,
        key: RouteKey,
        callback: SubscriberCallback,
    ) -> Result<(), RoutingError> {
        let already_existed = self.entries.contains_key(&key);
        let entry = self.entry_or_placeholder(&key)?;
        if already_existed {
            callback(&Publication::new(key.wire(), Operation::Add));
        }
        entry.chain.subscribe_wildcard(callback);
        Ok(())
    }

    /// Textual snapshot of every live (non-placeholder) record and its
    /// subscriber count, for diagnostics only — never consulted by any
    /// operation above.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for entry in self.entries.values() {
            let Some(record) = &entry.record else {
                continue;
            };
            out.push_str(&format!(
                "{:<20} {:<4} {:<20} {} (subscribers: {})\n",
                record.key.dest_ip,
                record.key.mask,
                record.gateway_ip,
                record.out_interface,
                entry.chain.subscriber_count(),
            ));
        }
        out
    }

    /// Iterate every live record's key, tolerating deletion of the current
    /// key from within `f` (mirrors a safe-iteration macro,
    /// which snapshots the next pointer before invoking the body).
    pub fn for_each(&mut self, mut f: impl FnMut(&mut Self, &RouteKey)) {
        let keys: Vec<RouteKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.record.is_some())
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            if self.entries.contains_key(&key) {
                f(self, &key);
            }
        }
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn placeholder_subscriber_sees_mod_not_add_on_first_create() {
        let mut table = RoutingTable::new();
        let key = RouteKey::new("10.0.0.0", 24);
        let ops = Arc::new(Mutex::new(Vec::new()));
        let ops2 = ops.clone();
        table
            .register_for_notification(
                key.clone(),
                Box::new(move |p| ops2.lock().unwrap().push(p.op)),
            )
            .unwrap();
        assert!(ops.lock().unwrap().is_empty());

        table.add_or_update(key.clone(), "10.0.0.1", "eth0").unwrap();
        table.add_or_update(key.clone(), "10.0.0.2", "eth1").unwrap();

        assert_eq!(*ops.lock().unwrap(), vec![Operation::Mod, Operation::Mod]);
        assert_eq!(table.lookup(&key).unwrap().gateway_ip, "10.0.0.2");
    }

    #[test]
    fn late_subscriber_gets_one_shot_add_then_mod_on_next_update() {
        let mut table = RoutingTable::new();
        let key = RouteKey::new("10.0.0.0", 24);
        table.add_or_update(key.clone(), "10.0.0.1", "eth0").unwrap();

        let ops = Arc::new(Mutex::new(Vec::new()));
        let ops2 = ops.clone();
        table
            .register_for_notification(
                key.clone(),
                Box::new(move |p| ops2.lock().unwrap().push(p.op)),
            )
            .unwrap();
        assert_eq!(*ops.lock().unwrap(), vec![Operation::Add]);

        table.add_or_update(key, "10.0.0.2", "eth1").unwrap();
        assert_eq!(*ops.lock().unwrap(), vec![Operation::Add, Operation::Mod]);
    }

    #[test]
    fn second_subscriber_against_a_placeholder_gets_add_too() {
        let mut table = RoutingTable::new();
        let key = RouteKey::new("192.168.1.1", 32);

        // First subscriber creates the placeholder; sees nothing yet.
        table
            .register_for_notification(key.clone(), Box::new(|_| {}))
            .unwrap();

        // Second subscriber arrives while the entry is still a placeholder
        // (no payload has ever been set). It should get a catch-up Add
        // immediately, same as if the record were live.
        let ops = Arc::new(Mutex::new(Vec::new()));
        let ops2 = ops.clone();
        table
            .register_for_notification(
                key,
                Box::new(move |p| ops2.lock().unwrap().push(p.op)),
            )
            .unwrap();
        assert_eq!(*ops.lock().unwrap(), vec![Operation::Add]);
    }

    #[test]
    fn delete_publishes_del_and_removes_entry() {
        let mut table = RoutingTable::new();
        let key = RouteKey::new("10.0.0.0", 24);
        table.add_or_update(key.clone(), "10.0.0.1", "eth0").unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        table
            .register_for_notification(
                key.clone(),
                Box::new(move |p| {
                    assert_eq!(p.op, Operation::Del);
                    fired2.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        table.delete(&key).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(table.lookup(&key).is_none());
    }

    #[test]
    fn for_each_tolerates_deleting_current_entry() {
        let mut table = RoutingTable::new();
        let a = RouteKey::new("10.0.0.0", 24);
        let b = RouteKey::new("10.0.1.0", 24);
        table.add_or_update(a.clone(), "gw", "eth0").unwrap();
        table.add_or_update(b.clone(), "gw", "eth1").unwrap();

        let visited = Arc::new(Mutex::new(Vec::new()));
        let visited2 = visited.clone();
        table.for_each(move |tbl, key| {
            visited2.lock().unwrap().push(key.clone());
            let _ = tbl.delete(key);
        });

        assert_eq!(visited.lock().unwrap().len(), 2);
        assert!(table.lookup(&a).is_none());
        assert!(table.lookup(&b).is_none());
    }

    #[test]
    fn delete_missing_entry_errors() {
        let mut table = RoutingTable::new();
        let key = RouteKey::new("10.0.0.0", 24);
        assert!(matches!(table.delete(&key), Err(RoutingError::NotFound)));
    }

    #[test]
    fn dump_lists_live_records_only() {
        let mut table = RoutingTable::new();
        table
            .add_or_update(RouteKey::new("10.0.0.0", 24), "10.0.0.1", "eth0")
            .unwrap();
        table
            .register_for_notification(RouteKey::new("10.0.1.0", 24), Box::new(|_| {}))
            .unwrap();

        let report = table.dump();
        assert!(report.contains("10.0.0.0"));
        assert!(!report.contains("10.0.1.0"));
    }
}
