//! History store: in-flight submissions keyed by caller-visible locator.
//!
//! The facade reserves a locator before sending the submitting command and
//! confirms it with the returned gid; the watcher removes the entry when the
//! download reaches a terminal state, so callers never track submissions
//! themselves.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ariabridge_core::{ClientError, ClientResult, Gid};
use chrono::{DateTime, Utc};

/// Last command result recorded for a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Gid returned by the submitting command; `None` while it is in flight.
    pub gid: Option<Gid>,
    /// When the submission was recorded.
    pub submitted_at: DateTime<Utc>,
}

/// Locator → last command result.
///
/// INVARIANT: at most one entry per locator. Terminal handling removes the
/// entry, and a fresh submission for the same locator is rejected until then.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Mutex<HashMap<String, HistoryEntry>>,
}

impl HistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, HistoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, locator: String, gid: Option<Gid>) -> ClientResult<()> {
        let mut entries = self.entries();
        if entries.contains_key(&locator) {
            return Err(ClientError::duplicate_locator(locator));
        }
        entries.insert(
            locator,
            HistoryEntry {
                gid,
                submitted_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Record a submission whose gid is already known.
    ///
    /// Fails with `DuplicateLocator` if the locator already has an entry.
    pub fn add(&self, locator: impl Into<String>, gid: Gid) -> ClientResult<()> {
        self.insert(locator.into(), Some(gid))
    }

    /// Claim `locator` before its submitting command is sent.
    ///
    /// The check and the insert happen under one lock, so of two concurrent
    /// submissions of one locator exactly one gets through.
    pub fn reserve(&self, locator: impl Into<String>) -> ClientResult<()> {
        self.insert(locator.into(), None)
    }

    /// Fill a reservation with the gid the command returned.
    ///
    /// Returns false if there is no open reservation for `locator`.
    pub fn confirm(&self, locator: &str, gid: Gid) -> bool {
        match self.entries().get_mut(locator) {
            Some(entry) if entry.gid.is_none() => {
                entry.gid = Some(gid);
                true
            }
            _ => false,
        }
    }

    /// Drop a reservation whose command failed. Confirmed entries are kept.
    pub fn release(&self, locator: &str) -> bool {
        let mut entries = self.entries();
        if entries.get(locator).is_some_and(|entry| entry.gid.is_none()) {
            entries.remove(locator);
            true
        } else {
            false
        }
    }

    /// Remove the entry for `locator`. Removing an absent locator is a no-op.
    pub fn remove(&self, locator: &str) -> Option<HistoryEntry> {
        self.entries().remove(locator)
    }

    /// Remove the entry only while it still belongs to `gid`.
    ///
    /// Terminal cleanup uses this so a late notification for an old download
    /// never deletes the entry of a fresher submission of the same locator.
    pub fn remove_if(&self, locator: &str, gid: &Gid) -> bool {
        let mut entries = self.entries();
        if entries
            .get(locator)
            .is_some_and(|entry| entry.gid.as_ref() == Some(gid))
        {
            entries.remove(locator);
            true
        } else {
            false
        }
    }

    /// Look up the entry for `locator`.
    pub fn get(&self, locator: &str) -> Option<HistoryEntry> {
        self.entries().get(locator).cloned()
    }

    /// Whether `locator` has an in-flight submission.
    pub fn contains(&self, locator: &str) -> bool {
        self.entries().contains_key(locator)
    }

    /// Number of in-flight submissions.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether there are no in-flight submissions.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// All locators, sorted.
    pub fn locators(&self) -> Vec<String> {
        let mut locators: Vec<String> = self.entries().keys().cloned().collect();
        locators.sort();
        locators
    }
}
