//! Bounded activity log for blackboard operations.

use std::collections::VecDeque;

use super::value::Value;

/// What a client did to a key.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivityKind {
    Read {
        value: Value,
    },
    Write {
        previous: Option<Value>,
        current: Value,
    },
    Unset {
        previous: Option<Value>,
    },
    /// A write was requested with `overwrite = false` against an occupied slot.
    NoOverwrite {
        current: Value,
    },
    /// A read or write was rejected by the access-control metadata.
    AccessDenied,
}

/// One entry in the activity stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivityRecord {
    /// Monotonic sequence number, the timestamp-equivalent for ordering.
    pub sequence: u64,
    /// Name of the client that performed the operation.
    pub client: String,
    /// Fully-qualified key, including any nested attribute suffix.
    pub key: String,
    pub kind: ActivityKind,
}

/// Ring buffer of [`ActivityRecord`]s; oldest entries are dropped once the
/// configured capacity is reached.
#[derive(Debug, Default)]
pub(crate) struct ActivityStream {
    records: VecDeque<ActivityRecord>,
    max_size: usize,
}

impl ActivityStream {
    pub(crate) fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    pub(crate) fn push(&mut self, record: ActivityRecord) {
        if self.max_size == 0 {
            return;
        }
        if self.records.len() == self.max_size {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence: u64) -> ActivityRecord {
        ActivityRecord {
            sequence,
            client: "tester".to_string(),
            key: "/k".to_string(),
            kind: ActivityKind::Unset { previous: None },
        }
    }

    #[test]
    fn drops_oldest_beyond_capacity() {
        let mut stream = ActivityStream::new(2);
        stream.push(record(0));
        stream.push(record(1));
        stream.push(record(2));
        let sequences: Vec<u64> = stream.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }
}
