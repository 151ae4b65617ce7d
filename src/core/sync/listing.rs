use std::fmt::Debug;

use crate::models::{Project, ProjectId, Task, TaskId};

/// Records that are listed from the store and individually confirmed.
pub(crate) trait Keyed: Clone {
    type Key: Clone + PartialEq + Debug;

    fn key(&self) -> &Self::Key;
}

impl Keyed for Project {
    type Key = ProjectId;

    fn key(&self) -> &ProjectId {
        &self.id
    }
}

impl Keyed for Task {
    type Key = TaskId;

    fn key(&self) -> &TaskId {
        &self.id
    }
}

/// Where confirmed additions go when replayed onto a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insert {
    Front,
    Back,
}

/// Generation and in-flight bookkeeping for one listed collection.
///
/// Only the listing answering the latest request may land. A listing's snapshot
/// can predate changes confirmed while it was in flight, so those are replayed
/// onto it when it lands.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Listing<T: Keyed> {
    request: u64,
    in_flight: bool,
    added: Vec<T>,
    deleted: Vec<T::Key>,
}

impl<T: Keyed> Default for Listing<T> {
    fn default() -> Self {
        Self {
            request: 0,
            in_flight: false,
            added: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T: Keyed> Listing<T> {
    pub(crate) fn request(&self) -> u64 {
        self.request
    }

    /// Starts a new listing request and returns its generation.
    pub(crate) fn issue(&mut self) -> u64 {
        self.request += 1;
        self.in_flight = true;
        self.added.clear();
        self.deleted.clear();
        self.request
    }

    pub(crate) fn is_current(&self, request: u64) -> bool {
        self.in_flight && request == self.request
    }

    /// Forgets the pending request. The generation keeps counting so nothing
    /// issued before can match afterwards.
    pub(crate) fn abandon(&mut self) {
        self.in_flight = false;
        self.added.clear();
        self.deleted.clear();
    }

    pub(crate) fn confirm_added(&mut self, item: &T) {
        if self.in_flight {
            self.deleted.retain(|key| key != item.key());
            self.added.push(item.clone());
        }
    }

    pub(crate) fn confirm_deleted(&mut self, key: &T::Key) {
        if self.in_flight {
            self.added.retain(|item| item.key() != key);
            self.deleted.push(key.clone());
        }
    }

    /// Folds the pending confirmations into `items` and closes the request.
    pub(crate) fn land(&mut self, mut items: Vec<T>, insert: Insert) -> Vec<T> {
        items.retain(|item| !self.deleted.contains(item.key()));
        for item in self.added.drain(..) {
            if items.iter().any(|listed| listed.key() == item.key()) {
                continue;
            }
            match insert {
                Insert::Front => items.insert(0, item),
                Insert::Back => items.push(item),
            }
        }
        self.abandon();
        items
    }
}
