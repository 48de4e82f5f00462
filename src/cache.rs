//! Per-conclusion proof cache with explicit invalidation and listener
//! fan-out.
//!
//! Each tracked conclusion owns a cache entry that moves through
//! `STALE -> COMPUTING -> FRESH` and back to `STALE` on invalidation. All
//! state transitions and listener-list mutations for one conclusion happen
//! under that entry's lock, so concurrent [ProofCache::get_proof] callers
//! observe at most one recomputation: the first claims `COMPUTING`, late
//! arrivals block on the entry condvar until a result (or failure) is
//! published. Distinct conclusions never contend with each other.
//!
//! ## Synchronization Points
//!
//! - **Entry map**: guarded briefly while looking up or creating an entry
//! - **Entry state**: held across transitions, never across the slow
//!   fetch-and-prune path
//! - **Entry condvar**: parks late arrivals during an in-flight computation
//! - **Listener list**: snapshotted before fan-out so a slow listener delays
//!   only the fan-out loop

use parking_lot::{Condvar, Mutex, RwLock};
use std::{collections::BTreeMap, sync::Arc};

use crate::{
    error::LogosError,
    event::ChangeEvent,
    proof::{prune, PrunedProof, RootStatedPolicy},
    source::{ProofSource, StatedProvider},
    statement::{Statement, StatementKey},
};

/// Observer of invalidation events for one tracked conclusion.
///
/// Fired when a subsequent [ProofCache::get_proof] call would return a
/// different result. A listener returning `Err` is logged and deregistered;
/// fan-out continues with the remaining listeners in registration order.
pub trait ProofChangeListener: Send + Sync {
    fn proof_changed(&self) -> Result<(), LogosError>;
}

/// Handle for deregistering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Externally observable entry state, mainly for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Stale,
    Computing,
    Fresh,
}

enum EntryState {
    Stale,
    Computing,
    Fresh {
        proof: Arc<PrunedProof>,
        stated_version: u64,
    },
}

struct EntryInner {
    state: EntryState,
    /// Bumped by every invalidation; a computation that started under an
    /// older epoch publishes STALE instead of FRESH.
    epoch: u64,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn ProofChangeListener>)>,
}

struct CacheEntry {
    statement: Statement,
    inner: Mutex<EntryInner>,
    published: Condvar,
    listeners: Mutex<ListenerTable>,
}

impl CacheEntry {
    fn new(statement: Statement) -> Self {
        CacheEntry {
            statement,
            inner: Mutex::new(EntryInner {
                state: EntryState::Stale,
                epoch: 0,
            }),
            published: Condvar::new(),
            listeners: Mutex::new(ListenerTable::default()),
        }
    }
}

/// Cache of pruned proofs keyed by conclusion, backed by one active
/// reasoning source and one stated-fact provider.
pub struct ProofCache {
    source: RwLock<Arc<dyn ProofSource>>,
    stated: Arc<dyn StatedProvider>,
    root_policy: RootStatedPolicy,
    entries: Mutex<BTreeMap<StatementKey, Arc<CacheEntry>>>,
}

impl ProofCache {
    pub fn new(
        source: Arc<dyn ProofSource>,
        stated: Arc<dyn StatedProvider>,
        root_policy: RootStatedPolicy,
    ) -> Self {
        ProofCache {
            source: RwLock::new(source),
            stated,
            root_policy,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// The currently active reasoning source.
    pub fn source(&self) -> Arc<dyn ProofSource> {
        self.source.read().clone()
    }

    /// Switch the active reasoning source. Every cached proof was produced
    /// by the previous source, so all entries go stale and listeners fire.
    pub fn set_source(&self, source: Arc<dyn ProofSource>) {
        tracing::debug!(source = source.name(), "switching reasoning source");
        *self.source.write() = source;
        self.invalidate_all();
    }

    /// The cached proof for `statement`, recomputing it first when the entry
    /// is stale. "No derivation found" is a well-formed NOT_DERIVABLE-rooted
    /// proof, never an error; errors are reserved for unsupported conclusion
    /// kinds and transient source failures. A failed recomputation leaves
    /// the entry stale, so a later call retries from scratch.
    pub fn get_proof(&self, statement: &Statement) -> Result<Arc<PrunedProof>, LogosError> {
        let entry = self.entry(statement);
        let epoch_at_start;
        {
            let mut inner = entry.inner.lock();
            loop {
                match &inner.state {
                    EntryState::Fresh {
                        proof,
                        stated_version,
                    } => {
                        if *stated_version == self.stated.stated().version() {
                            return Ok(proof.clone());
                        }
                        // The fact base moved on without an invalidation
                        // reaching us yet; treat as stale.
                        inner.state = EntryState::Stale;
                    }
                    EntryState::Computing => {
                        // A waiter woken into Stale claims the recompute
                        // itself on the next pass; that is its one retry.
                        entry.published.wait(&mut inner);
                        continue;
                    }
                    EntryState::Stale => {}
                }
                break;
            }
            inner.state = EntryState::Computing;
            epoch_at_start = inner.epoch;
        }
        let result = self.recompute(&entry.statement);
        let mut inner = entry.inner.lock();
        match result {
            Ok((proof, stated_version)) => {
                let proof = Arc::new(proof);
                if inner.epoch == epoch_at_start {
                    inner.state = EntryState::Fresh {
                        proof: proof.clone(),
                        stated_version,
                    };
                } else {
                    // Invalidated while computing: hand the snapshot to this
                    // caller but leave the entry stale so the next read
                    // recomputes.
                    tracing::debug!(
                        conclusion = %entry.statement.key(),
                        "discarding proof outdated during computation"
                    );
                    inner.state = EntryState::Stale;
                }
                entry.published.notify_all();
                Ok(proof)
            }
            Err(err) => {
                inner.state = EntryState::Stale;
                entry.published.notify_all();
                Err(err)
            }
        }
    }

    fn recompute(&self, statement: &Statement) -> Result<(PrunedProof, u64), LogosError> {
        let source = self.source();
        let stated = self.stated.stated();
        let version = stated.version();
        tracing::debug!(
            conclusion = %statement.key(),
            source = source.name(),
            stated_version = version,
            "recomputing proof"
        );
        let proof = match source.prove(statement)? {
            Some(graph) => match graph.lookup(&statement.key()) {
                Some(root) => prune(&graph, root, &stated, self.root_policy),
                None => {
                    tracing::warn!(
                        conclusion = %statement.key(),
                        source = source.name(),
                        "source returned a graph without the requested root"
                    );
                    PrunedProof::not_derivable(statement.clone())
                }
            },
            None => PrunedProof::not_derivable(statement.clone()),
        };
        Ok((proof, version))
    }

    /// Drop the cached proof for `key` and notify its listeners. Returns
    /// `false` when there was nothing fresh to drop, so one staleness
    /// episode never produces duplicate notifications.
    pub fn invalidate(&self, key: &StatementKey) -> bool {
        let Some(entry) = self.entries.lock().get(key).cloned() else {
            return false;
        };
        {
            let mut inner = entry.inner.lock();
            inner.epoch += 1;
            match inner.state {
                EntryState::Fresh { .. } => {
                    inner.state = EntryState::Stale;
                }
                // An in-flight computation observes the epoch bump and
                // publishes stale; nothing fresh was dropped here.
                EntryState::Computing => return false,
                EntryState::Stale => return false,
            }
        }
        tracing::debug!(conclusion = %key, "proof invalidated");
        self.notify(&entry);
        true
    }

    pub fn invalidate_all(&self) {
        let keys: Vec<StatementKey> = self.entries.lock().keys().copied().collect();
        for key in keys {
            self.invalidate(&key);
        }
    }

    /// Route an invalidation trigger to the affected entries.
    pub fn handle_event(&self, event: &ChangeEvent) {
        match event {
            ChangeEvent::ProofChanged(key) => {
                self.invalidate(key);
            }
            ChangeEvent::StatedChanged | ChangeEvent::SourceSwitched(_) => {
                self.invalidate_all();
            }
        }
    }

    /// Register an invalidation observer for `statement`, creating the
    /// (stale) tracking entry when this conclusion was not yet tracked.
    pub fn add_listener(
        &self,
        statement: &Statement,
        listener: Arc<dyn ProofChangeListener>,
    ) -> ListenerId {
        let entry = self.entry(statement);
        let mut listeners = entry.listeners.lock();
        listeners.next_id += 1;
        let id = ListenerId(listeners.next_id);
        listeners.entries.push((id, listener));
        id
    }

    /// Returns `false` when no such listener was registered.
    pub fn remove_listener(&self, key: &StatementKey, id: ListenerId) -> bool {
        let Some(entry) = self.entries.lock().get(key).cloned() else {
            return false;
        };
        let mut listeners = entry.listeners.lock();
        let before = listeners.entries.len();
        listeners.entries.retain(|(listener_id, _)| *listener_id != id);
        listeners.entries.len() != before
    }

    /// Current entry state, or `None` for an untracked conclusion.
    pub fn state(&self, key: &StatementKey) -> Option<CacheState> {
        let entry = self.entries.lock().get(key).cloned()?;
        let inner = entry.inner.lock();
        Some(match inner.state {
            EntryState::Stale => CacheState::Stale,
            EntryState::Computing => CacheState::Computing,
            EntryState::Fresh { .. } => CacheState::Fresh,
        })
    }

    fn entry(&self, statement: &Statement) -> Arc<CacheEntry> {
        let mut entries = self.entries.lock();
        entries
            .entry(statement.key())
            .or_insert_with(|| Arc::new(CacheEntry::new(statement.clone())))
            .clone()
    }

    /// Fan out to a snapshot of the listener list. A failing listener is
    /// logged and deregistered without aborting notification of the rest.
    fn notify(&self, entry: &CacheEntry) {
        let snapshot: Vec<(ListenerId, Arc<dyn ProofChangeListener>)> =
            entry.listeners.lock().entries.clone();
        let mut failed = Vec::new();
        for (id, listener) in snapshot {
            if let Err(err) = listener.proof_changed() {
                tracing::warn!(
                    conclusion = %entry.statement.key(),
                    "Removing listener due to failure: {err}"
                );
                failed.push(id);
            }
        }
        if !failed.is_empty() {
            entry
                .listeners
                .lock()
                .entries
                .retain(|(id, _)| !failed.contains(id));
        }
    }
}
