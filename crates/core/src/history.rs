//! Caller-owned record of past interactions.
//!
//! The server never holds one of these. Clients keep it alongside their
//! own storage and serialize it as JSON.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::AnalysisRequest;
use crate::result::AnalysisResult;

/// Entries kept before the oldest is evicted
pub const HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: u64,
    pub recorded_at: DateTime<Utc>,
    pub request: AnalysisRequest,
    pub result: AnalysisResult,
}

/// Bounded interaction list, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "StoredHistory")]
pub struct InteractionHistory {
    next_id: u64,
    entries: VecDeque<HistoryEntry>,
}

/// Serialized form, re-bounded on load since it may have been edited
#[derive(Deserialize)]
struct StoredHistory {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

impl From<StoredHistory> for InteractionHistory {
    fn from(stored: StoredHistory) -> Self {
        let mut entries = stored.entries;
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.dedup_by_key(|e| e.id);
        entries.truncate(HISTORY_CAPACITY);

        let highest = entries.first().map_or(0, |e| e.id);
        Self {
            next_id: stored.next_id.max(highest),
            entries: entries.into(),
        }
    }
}

impl InteractionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interaction and return its id. Ids keep increasing after
    /// evictions, so an id is never reused. Returns `None` once the id space
    /// is used up; nothing is recorded then.
    pub fn push(&mut self, request: AnalysisRequest, result: AnalysisResult) -> Option<u64> {
        self.push_at(request, result, Utc::now())
    }

    pub fn push_at(
        &mut self,
        request: AnalysisRequest,
        result: AnalysisResult,
        recorded_at: DateTime<Utc>,
    ) -> Option<u64> {
        let id = self.next_id.checked_add(1)?;
        self.next_id = id;
        self.entries.push_front(HistoryEntry {
            id,
            recorded_at,
            request,
            result,
        });
        self.entries.truncate(HISTORY_CAPACITY);
        Some(id)
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn remove(&mut self, id: u64) -> Option<HistoryEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(index)
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
