//! Collaborator interfaces the core consumes: reasoning sources that produce
//! raw proof graphs and providers of the stated fact set.
//!
//! Both are capability traits implemented by variant types selected at
//! configuration time; the cache depends only on the trait objects. Change
//! notification is channel-based: a collaborator accepts
//! [ChangeSink] handles and broadcasts a [ChangeEvent] whenever previously
//! returned results may have gone stale, from whatever thread observed the
//! change. Closed sinks are pruned on the next broadcast.
//!
//! [TableProofSource] and [TableStatedProvider] are in-memory
//! implementations used by tests and by embedders that assemble proof graphs
//! directly.

use parking_lot::{Mutex, RwLock};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    error::LogosError,
    event::ChangeEvent,
    proof::ProofGraph,
    statement::{StatedSet, Statement, StatementKey},
};

/// Where collaborators deliver change events; the receiving half normally
/// belongs to a [crate::watch::ChangeDispatcher].
pub type ChangeSink = UnboundedSender<ChangeEvent>;

/// An external system able to produce raw proof graphs.
pub trait ProofSource: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this source can reason about this kind of conclusion at all.
    /// Distinct from "supports but found nothing": a supported conclusion
    /// with no proof yields `Ok(None)` from [ProofSource::prove].
    fn supports(&self, statement: &Statement) -> bool;

    /// Fetch the raw proof graph rooted at `statement`. `Ok(None)` means the
    /// source found no proof; `Err(UnsupportedConclusion)` means it cannot
    /// reason about this conclusion kind; `Err(SourceUnavailable)` is a
    /// transient fetch failure. May block the calling thread.
    fn prove(&self, statement: &Statement) -> Result<Option<ProofGraph>, LogosError>;

    /// Register a sink invoked (with [ChangeEvent::ProofChanged]) when a
    /// previously returned proof may have become stale.
    fn subscribe(&self, sink: ChangeSink);
}

/// Supplier of the current stated fact set.
pub trait StatedProvider: Send + Sync {
    /// A fresh snapshot of the stated set; called on every recomputation
    /// since the underlying fact base can change between requests.
    fn stated(&self) -> StatedSet;

    /// Display-only: the locations (e.g. containing documents) where a fact
    /// matching `key` occurs. Never consulted by the pruner.
    fn occurrences(&self, key: &StatementKey) -> Vec<String>;

    /// Register a sink invoked (with [ChangeEvent::StatedChanged]) on any
    /// edit to the underlying fact base.
    fn subscribe(&self, sink: ChangeSink);
}

/// Ordered registry of the reasoning sources known to the host, with lookup
/// of the ones able to explain a given conclusion. Selection of the active
/// source stays with the caller; feed the chosen source to
/// [crate::cache::ProofCache::set_source].
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<Vec<Arc<dyn ProofSource>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        SourceRegistry::default()
    }

    pub fn register(&self, source: Arc<dyn ProofSource>) {
        self.sources.write().push(source);
    }

    pub fn sources(&self) -> Vec<Arc<dyn ProofSource>> {
        self.sources.read().clone()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn ProofSource>> {
        self.sources
            .read()
            .iter()
            .find(|source| source.name() == name)
            .cloned()
    }

    /// The registered sources that can explain `statement`, in registration
    /// order.
    pub fn supporting(&self, statement: &Statement) -> Vec<Arc<dyn ProofSource>> {
        self.sources
            .read()
            .iter()
            .filter(|source| source.supports(statement))
            .cloned()
            .collect()
    }
}

fn broadcast(subscribers: &Mutex<Vec<ChangeSink>>, event: ChangeEvent) {
    let mut sinks = subscribers.lock();
    sinks.retain(|sink| match sink.send(event.clone()) {
        Ok(()) => true,
        Err(_) => {
            tracing::debug!(%event, "dropping closed change sink");
            false
        }
    });
}

/// In-memory [ProofSource] backed by a table of prebuilt proof graphs.
pub struct TableProofSource {
    name: String,
    proofs: Mutex<BTreeMap<StatementKey, ProofGraph>>,
    /// Conclusions the source claims to understand even though it has no
    /// proof for them (the "supports but found nothing" case).
    supported: Mutex<BTreeSet<StatementKey>>,
    /// Remaining number of prove() calls to fail with SourceUnavailable.
    fail_next: Mutex<u32>,
    subscribers: Mutex<Vec<ChangeSink>>,
}

impl TableProofSource {
    pub fn new<S: Into<String>>(name: S) -> Self {
        TableProofSource {
            name: name.into(),
            proofs: Mutex::new(BTreeMap::new()),
            supported: Mutex::new(BTreeSet::new()),
            fail_next: Mutex::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Install the proof graph for the conclusion `root`. Replacing an
    /// existing graph does not broadcast; call
    /// [TableProofSource::fire_proof_changed] when consumers should notice.
    pub fn insert(&self, root: &Statement, graph: ProofGraph) {
        self.proofs.lock().insert(root.key(), graph);
        self.supported.lock().insert(root.key());
    }

    pub fn declare_supported(&self, statement: &Statement) {
        self.supported.lock().insert(statement.key());
    }

    pub fn remove(&self, key: &StatementKey) {
        self.proofs.lock().remove(key);
    }

    /// Make the next `calls` prove() invocations fail transiently.
    pub fn fail_next(&self, calls: u32) {
        *self.fail_next.lock() = calls;
    }

    /// Signal that a previously returned proof may no longer be up to date.
    pub fn fire_proof_changed(&self, key: StatementKey) {
        broadcast(&self.subscribers, ChangeEvent::ProofChanged(key));
    }
}

impl ProofSource for TableProofSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, statement: &Statement) -> bool {
        self.supported.lock().contains(&statement.key())
    }

    fn prove(&self, statement: &Statement) -> Result<Option<ProofGraph>, LogosError> {
        {
            let mut fail_next = self.fail_next.lock();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(LogosError::SourceUnavailable(format!(
                    "{} is offline",
                    self.name
                )));
            }
        }
        if !self.supports(statement) {
            return Err(LogosError::UnsupportedConclusion(statement.text.clone()));
        }
        Ok(self.proofs.lock().get(&statement.key()).cloned())
    }

    fn subscribe(&self, sink: ChangeSink) {
        self.subscribers.lock().push(sink);
    }
}

/// In-memory [StatedProvider] over a mutable fact set.
#[derive(Default)]
pub struct TableStatedProvider {
    stated: Mutex<StatedSet>,
    occurrences: Mutex<BTreeMap<StatementKey, Vec<String>>>,
    subscribers: Mutex<Vec<ChangeSink>>,
}

impl TableStatedProvider {
    pub fn new() -> Self {
        TableStatedProvider::default()
    }

    /// Assert `statement` as a fact occurring in `location`. Broadcasts
    /// [ChangeEvent::StatedChanged] when the fact set actually changed.
    pub fn assert_fact(&self, statement: &Statement, location: &str) {
        let key = statement.key();
        let changed = self.stated.lock().insert(key);
        let mut occurrences = self.occurrences.lock();
        let locations = occurrences.entry(key).or_default();
        if !locations.iter().any(|known| known == location) {
            locations.push(location.to_string());
        }
        drop(occurrences);
        if changed {
            broadcast(&self.subscribers, ChangeEvent::StatedChanged);
        }
    }

    pub fn retract_fact(&self, key: &StatementKey) {
        let changed = self.stated.lock().remove(key);
        self.occurrences.lock().remove(key);
        if changed {
            broadcast(&self.subscribers, ChangeEvent::StatedChanged);
        }
    }
}

impl StatedProvider for TableStatedProvider {
    fn stated(&self) -> StatedSet {
        self.stated.lock().clone()
    }

    fn occurrences(&self, key: &StatementKey) -> Vec<String> {
        self.occurrences
            .lock()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn subscribe(&self, sink: ChangeSink) {
        self.subscribers.lock().push(sink);
    }
}
