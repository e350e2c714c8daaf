//! Shared coordination store.
//!
//! One process-scoped key/value store, shared by every subsystem through
//! [`Client`] views. Keys are hierarchical path strings joined by `/`. Each
//! key carries access-control metadata: the set of clients registered against
//! it and their declared access mode. The single-threaded tick model plus
//! these declaration checks substitute for locking; there are no mutexes
//! because only one node executes at a time.

mod activity;
mod client;
mod value;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub use activity::{ActivityKind, ActivityRecord};
pub use client::Client;
pub use value::Value;

use activity::ActivityStream;

use crate::{AccessError, KeyError};

/// Separator for hierarchical key paths.
pub const SEPARATOR: char = '/';

/// Declared intent of a client against a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    Read,
    Write,
    /// Write access that locks out every other writer on the key.
    ExclusiveWrite,
}

/// Identity of a registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Shared-ownership handle to the store, passed to every client.
pub type BlackboardHandle = Rc<RefCell<Blackboard>>;

#[derive(Debug, Default)]
struct KeyMetadata {
    read: HashSet<ClientId>,
    write: HashSet<ClientId>,
    exclusive: Option<ClientId>,
}

impl KeyMetadata {
    fn allows_read(&self, client: ClientId) -> bool {
        // WRITE and EXCLUSIVE_WRITE imply read access.
        self.read.contains(&client)
            || self.write.contains(&client)
            || self.exclusive == Some(client)
    }

    fn allows_write(&self, client: ClientId) -> bool {
        match self.exclusive {
            Some(owner) => owner == client,
            None => self.write.contains(&client),
        }
    }
}

/// The process-wide store.
///
/// Constructed behind a [`BlackboardHandle`]; direct use is possible but the
/// normal route is a [`Client`] bound to a namespace.
#[derive(Debug, Default)]
pub struct Blackboard {
    storage: HashMap<String, Value>,
    metadata: HashMap<String, KeyMetadata>,
    client_names: HashMap<ClientId, String>,
    activity: Option<ActivityStream>,
    next_client_id: u64,
    sequence: u64,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already wrapped for shared ownership.
    pub fn new_shared() -> BlackboardHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Register a named client and hand back its identity.
    pub fn register_client(&mut self, name: &str) -> ClientId {
        let id = ClientId(self.next_client_id);
        self.next_client_id += 1;
        self.client_names.insert(id, name.to_string());
        id
    }

    /// Declare a client's intent against a key.
    ///
    /// Fails when the requested mode conflicts with an existing
    /// `EXCLUSIVE_WRITE` grant held by a different client, or when exclusive
    /// access is requested while other writers exist.
    pub fn register_key(
        &mut self,
        client: ClientId,
        key: &str,
        access: Access,
    ) -> Result<(), AccessError> {
        let meta = self.metadata.entry(key.to_string()).or_default();
        match access {
            Access::Read => {
                meta.read.insert(client);
            }
            Access::Write => {
                if let Some(owner) = meta.exclusive
                    && owner != client
                {
                    return Err(AccessError::ExclusiveOwnerExists {
                        key: key.to_string(),
                        owner: self.client_names.get(&owner).cloned().unwrap_or_default(),
                    });
                }
                meta.write.insert(client);
            }
            Access::ExclusiveWrite => {
                if let Some(owner) = meta.exclusive
                    && owner != client
                {
                    return Err(AccessError::ExclusiveOwnerExists {
                        key: key.to_string(),
                        owner: self.client_names.get(&owner).cloned().unwrap_or_default(),
                    });
                }
                if meta.write.iter().any(|writer| *writer != client) {
                    return Err(AccessError::WritersExist {
                        key: key.to_string(),
                    });
                }
                meta.exclusive = Some(client);
            }
        }
        Ok(())
    }

    /// Read a key, optionally resolving a dotted attribute path on the value.
    pub fn get(
        &mut self,
        client: ClientId,
        key: &str,
        attribute: Option<&str>,
    ) -> Result<Value, KeyError> {
        let display = qualified_display(key, attribute);
        if !self
            .metadata
            .get(key)
            .is_some_and(|meta| meta.allows_read(client))
        {
            self.record(client, &display, ActivityKind::AccessDenied);
            return Err(KeyError::ReadDenied {
                key: display,
                client: self.client_name(client),
            });
        }
        let value = self
            .storage
            .get(key)
            .ok_or_else(|| KeyError::Missing {
                key: key.to_string(),
            })?
            .clone();
        let resolved = match attribute {
            None => value,
            Some(path) => value
                .lookup(path)
                .cloned()
                .ok_or_else(|| KeyError::AttributeNotFound {
                    key: key.to_string(),
                    attribute: path.to_string(),
                })?,
        };
        self.record(
            client,
            &display,
            ActivityKind::Read {
                value: resolved.clone(),
            },
        );
        Ok(resolved)
    }

    /// Store a value under a key, optionally at a dotted attribute path.
    ///
    /// Returns `Ok(false)` without touching the slot when `overwrite` is
    /// `false` and a value is already present; this is the idempotent
    /// initialization path, not an error.
    pub fn set(
        &mut self,
        client: ClientId,
        key: &str,
        attribute: Option<&str>,
        value: Value,
        overwrite: bool,
    ) -> Result<bool, AccessError> {
        let display = qualified_display(key, attribute);
        if !self
            .metadata
            .get(key)
            .is_some_and(|meta| meta.allows_write(client))
        {
            self.record(client, &display, ActivityKind::AccessDenied);
            return Err(AccessError::WriteDenied {
                key: display,
                client: self.client_name(client),
            });
        }
        match attribute {
            None => {
                if !overwrite && self.storage.contains_key(key) {
                    let current = self.storage[key].clone();
                    self.record(client, &display, ActivityKind::NoOverwrite { current });
                    return Ok(false);
                }
                let previous = self.storage.insert(key.to_string(), value.clone());
                self.record(
                    client,
                    &display,
                    ActivityKind::Write {
                        previous,
                        current: value,
                    },
                );
                Ok(true)
            }
            Some(path) => {
                // Check occupancy before touching storage: an attribute write
                // must not destroy an existing value it is refusing to
                // overwrite, including a scalar standing where the path needs
                // a map.
                if !overwrite
                    && let Some(existing) = self.storage.get(key)
                    && nested_write_blocked(existing, path)
                {
                    let current = existing
                        .lookup(path)
                        .cloned()
                        .unwrap_or_else(|| existing.clone());
                    self.record(client, &display, ActivityKind::NoOverwrite { current });
                    return Ok(false);
                }
                let slot = nested_slot(
                    self.storage
                        .entry(key.to_string())
                        .or_insert_with(|| Value::Map(Default::default())),
                    path,
                );
                let occupied = slot.1;
                let previous = if occupied { Some(slot.0.clone()) } else { None };
                *slot.0 = value.clone();
                self.record(
                    client,
                    &display,
                    ActivityKind::Write {
                        previous,
                        current: value,
                    },
                );
                Ok(true)
            }
        }
    }

    /// Remove a key. Returns whether it was present; absence is not an error.
    pub fn unset(&mut self, client: ClientId, key: &str) -> Result<bool, AccessError> {
        if !self
            .metadata
            .get(key)
            .is_some_and(|meta| meta.allows_write(client))
        {
            self.record(client, key, ActivityKind::AccessDenied);
            return Err(AccessError::WriteDenied {
                key: key.to_string(),
                client: self.client_name(client),
            });
        }
        let previous = self.storage.remove(key);
        let was_present = previous.is_some();
        self.record(client, key, ActivityKind::Unset { previous });
        Ok(was_present)
    }

    /// Start recording get/set/unset operations into a bounded ring buffer.
    pub fn enable_activity_stream(&mut self, max_size: usize) {
        self.activity = Some(ActivityStream::new(max_size));
    }

    /// Stop recording and drop anything already recorded.
    pub fn disable_activity_stream(&mut self) {
        self.activity = None;
    }

    /// Whether operations are currently being recorded.
    pub fn activity_stream_enabled(&self) -> bool {
        self.activity.is_some()
    }

    /// Iterate the recorded activity, oldest first.
    ///
    /// Yields nothing while recording is disabled; check
    /// [`activity_stream_enabled`](Self::activity_stream_enabled) to tell an
    /// idle stream from a disabled one.
    pub fn activity_stream(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.activity.iter().flat_map(|stream| stream.iter())
    }

    /// Whether a key currently holds a value. Bypasses access checks; meant
    /// for diagnostics and tests, not node logic.
    pub fn contains(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }

    fn client_name(&self, client: ClientId) -> String {
        self.client_names.get(&client).cloned().unwrap_or_default()
    }

    fn record(&mut self, client: ClientId, key: &str, kind: ActivityKind) {
        let Some(stream) = self.activity.as_mut() else {
            return;
        };
        self.sequence += 1;
        let record = ActivityRecord {
            sequence: self.sequence,
            client: self
                .client_names
                .get(&client)
                .cloned()
                .unwrap_or_default(),
            key: key.to_string(),
            kind,
        };
        stream.push(record);
    }
}

fn qualified_display(key: &str, attribute: Option<&str>) -> String {
    match attribute {
        None => key.to_string(),
        Some(path) => format!("{key}.{path}"),
    }
}

/// Whether writing at `path` would overwrite an existing value: either the
/// full path resolves to one, or a non-map value sits somewhere along it and
/// would have to be destroyed to make room for intermediate maps.
fn nested_write_blocked(root: &Value, path: &str) -> bool {
    let mut cursor = root;
    for segment in path.split('.') {
        match cursor {
            Value::Map(entries) => match entries.get(segment) {
                Some(next) => cursor = next,
                None => return false,
            },
            _ => return true,
        }
    }
    true
}

/// Walk (and create) map entries down a dotted path, returning the final slot
/// and whether it already held a value. Non-map intermediates are replaced.
fn nested_slot<'a>(root: &'a mut Value, path: &str) -> (&'a mut Value, bool) {
    let mut segments = path.split('.').peekable();
    let mut cursor = root;
    loop {
        let segment = segments.next().expect("path has at least one segment");
        if !matches!(cursor, Value::Map(_)) {
            *cursor = Value::Map(Default::default());
        }
        let Value::Map(entries) = cursor else {
            unreachable!()
        };
        if segments.peek().is_none() {
            let occupied = entries.contains_key(segment);
            let slot = entries
                .entry(segment.to_string())
                .or_insert(Value::Bool(false));
            return (slot, occupied);
        }
        cursor = entries
            .entry(segment.to_string())
            .or_insert_with(|| Value::Map(Default::default()));
    }
}
