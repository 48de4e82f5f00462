//! Proof cache and change protocol integration tests.
//!
//! These cover the per-conclusion state machine (STALE -> COMPUTING ->
//! FRESH), single-flight recomputation under concurrency, listener
//! isolation, and the deferred invalidation dispatch path.

mod common;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use logos_core::{
    cache::{CacheState, ListenerId, ProofCache, ProofChangeListener},
    error::LogosError,
    event::ChangeEvent,
    proof::{ProofGraph, RootStatedPolicy},
    source::{ProofSource, TableProofSource, TableStatedProvider},
    statement::Statement,
    watch::ChangeDispatcher,
};

struct CountingListener {
    fired: AtomicUsize,
}

impl CountingListener {
    fn new() -> Arc<Self> {
        Arc::new(CountingListener {
            fired: AtomicUsize::new(0),
        })
    }

    fn count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl ProofChangeListener for CountingListener {
    fn proof_changed(&self) -> Result<(), LogosError> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records its label in a shared log; fails when told to.
struct RecordingListener {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    fail: bool,
}

impl ProofChangeListener for RecordingListener {
    fn proof_changed(&self) -> Result<(), LogosError> {
        self.log.lock().push(self.label);
        if self.fail {
            Err(LogosError::Listener(format!("{} broke", self.label)))
        } else {
            Ok(())
        }
    }
}

fn wait_for<F: Fn() -> bool>(what: &str, pred: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !pred() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn fresh_results_are_cached_until_invalidated() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = ProofCache::new(source, stated, RootStatedPolicy::default());

    assert_eq!(cache.state(&conclusion.key()), None);
    let first = cache.get_proof(&conclusion).unwrap();
    assert!(first.is_derivable());
    assert_eq!(cache.state(&conclusion.key()), Some(CacheState::Fresh));

    // FRESH reads return the cached object.
    let second = cache.get_proof(&conclusion).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert!(cache.invalidate(&conclusion.key()));
    assert_eq!(cache.state(&conclusion.key()), Some(CacheState::Stale));

    // The next read never returns the previous result object.
    let third = cache.get_proof(&conclusion).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(*first, *third, "unchanged inputs recompute structurally equal proofs");
}

#[test]
fn no_derivation_is_a_proof_not_an_error() {
    let source = Arc::new(TableProofSource::new("test-source"));
    let unexplained = Statement::new("Unexplained");
    source.declare_supported(&unexplained);
    let cache = ProofCache::new(
        source,
        Arc::new(TableStatedProvider::new()),
        RootStatedPolicy::default(),
    );

    let proof = cache.get_proof(&unexplained).unwrap();
    assert!(!proof.is_derivable());
    assert_eq!(cache.state(&unexplained.key()), Some(CacheState::Fresh));
}

#[test]
fn unsupported_conclusion_is_a_typed_failure() {
    let source = Arc::new(TableProofSource::new("test-source"));
    let cache = ProofCache::new(
        source,
        Arc::new(TableStatedProvider::new()),
        RootStatedPolicy::default(),
    );

    let alien = Statement::new("NotMyDepartment");
    match cache.get_proof(&alien) {
        Err(LogosError::UnsupportedConclusion(_)) => {}
        other => panic!("expected UnsupportedConclusion, got {other:?}"),
    }
    assert_eq!(cache.state(&alien.key()), Some(CacheState::Stale));
}

#[test]
fn transient_failure_leaves_entry_retryable() {
    let (source, stated, conclusion) = common::chain_setup();
    source.fail_next(1);
    let cache = ProofCache::new(source, stated, RootStatedPolicy::default());

    match cache.get_proof(&conclusion) {
        Err(LogosError::SourceUnavailable(_)) => {}
        other => panic!("expected SourceUnavailable, got {other:?}"),
    }
    // No partial FRESH state was published; retrying from scratch works.
    assert_eq!(cache.state(&conclusion.key()), Some(CacheState::Stale));
    assert!(cache.get_proof(&conclusion).unwrap().is_derivable());
}

#[test]
fn invalidation_notifies_at_most_once_per_staleness_episode() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = ProofCache::new(source, stated, RootStatedPolicy::default());
    let listener = CountingListener::new();
    cache.add_listener(&conclusion, listener.clone());

    // Nothing fresh yet: invalidation is a no-op.
    assert!(!cache.invalidate(&conclusion.key()));
    assert_eq!(listener.count(), 0);

    cache.get_proof(&conclusion).unwrap();
    assert!(cache.invalidate(&conclusion.key()));
    assert!(!cache.invalidate(&conclusion.key()));
    assert_eq!(listener.count(), 1);

    cache.get_proof(&conclusion).unwrap();
    assert!(cache.invalidate(&conclusion.key()));
    assert_eq!(listener.count(), 2);
}

#[test]
fn failing_listener_is_isolated_and_removed() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = ProofCache::new(source, stated, RootStatedPolicy::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    for (label, fail) in [("first", false), ("broken", true), ("last", false)] {
        cache.add_listener(
            &conclusion,
            Arc::new(RecordingListener {
                label,
                log: log.clone(),
                fail,
            }),
        );
    }

    cache.get_proof(&conclusion).unwrap();
    cache.invalidate(&conclusion.key());
    // Fan-out ran in registration order and survived the failure.
    assert_eq!(*log.lock(), vec!["first", "broken", "last"]);

    cache.get_proof(&conclusion).unwrap();
    cache.invalidate(&conclusion.key());
    // The failing listener was deregistered after the first episode.
    assert_eq!(*log.lock(), vec!["first", "broken", "last", "first", "last"]);
}

#[test]
fn remove_listener_by_id() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = ProofCache::new(source, stated, RootStatedPolicy::default());
    let listener = CountingListener::new();
    let id: ListenerId = cache.add_listener(&conclusion, listener.clone());

    assert!(cache.remove_listener(&conclusion.key(), id));
    assert!(!cache.remove_listener(&conclusion.key(), id));

    cache.get_proof(&conclusion).unwrap();
    cache.invalidate(&conclusion.key());
    assert_eq!(listener.count(), 0);
}

/// Source that counts prove() calls and blocks long enough for concurrent
/// callers to pile up on the same entry.
struct SlowSource {
    inner: TableProofSource,
    calls: AtomicUsize,
    delay: Duration,
}

impl ProofSource for SlowSource {
    fn name(&self) -> &str {
        "slow-source"
    }

    fn supports(&self, statement: &Statement) -> bool {
        self.inner.supports(statement)
    }

    fn prove(&self, statement: &Statement) -> Result<Option<ProofGraph>, LogosError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.prove(statement)
    }

    fn subscribe(&self, sink: logos_core::source::ChangeSink) {
        self.inner.subscribe(sink);
    }
}

#[test]
fn concurrent_readers_observe_one_recomputation() {
    let conclusion = Statement::new("A");
    let inner = TableProofSource::new("slow-source");
    inner.insert(&conclusion, common::chain_graph());
    let source = Arc::new(SlowSource {
        inner,
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(150),
    });
    let stated = Arc::new(TableStatedProvider::new());
    stated.assert_fact(&Statement::new("C"), "ontology.toml");
    let cache = Arc::new(ProofCache::new(
        source.clone(),
        stated,
        RootStatedPolicy::default(),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let conclusion = conclusion.clone();
        handles.push(thread::spawn(move || cache.get_proof(&conclusion).unwrap()));
    }
    let proofs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(
        source.calls.load(Ordering::SeqCst),
        1,
        "late arrivals must block on the in-flight computation"
    );
    for proof in &proofs[1..] {
        assert!(Arc::ptr_eq(&proofs[0], proof));
    }
}

#[test]
fn stated_set_version_mismatch_forces_recompute() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = ProofCache::new(source, stated.clone(), RootStatedPolicy::default());

    let before = cache.get_proof(&conclusion).unwrap();
    // B becomes stated without any invalidation event reaching the cache.
    stated.assert_fact(&Statement::new("B"), "ontology.toml");

    let after = cache.get_proof(&conclusion).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    // The new proof trusts B directly and no longer descends to C.
    let b_id = after.root().grounds.inferences()[0].premises[0];
    assert!(after.node(b_id).grounds.is_stated());
    assert_eq!(after.len(), 2);
}

#[test]
fn switching_sources_invalidates_everything() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = ProofCache::new(source, stated.clone(), RootStatedPolicy::default());
    let listener = CountingListener::new();
    cache.add_listener(&conclusion, listener.clone());

    let before = cache.get_proof(&conclusion).unwrap();
    assert_eq!(before.len(), 3);

    // The replacement source only knows a direct proof from C.
    let replacement = Arc::new(TableProofSource::new("direct-source"));
    let mut builder = logos_core::proof::ProofGraphBuilder::new();
    let a = builder.node(conclusion.clone());
    let c = builder.node(Statement::new("C"));
    builder.inference(a, "direct", [c]);
    replacement.insert(&conclusion, builder.build());

    cache.set_source(replacement);
    assert_eq!(listener.count(), 1);
    assert_eq!(cache.state(&conclusion.key()), Some(CacheState::Stale));

    let after = cache.get_proof(&conclusion).unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(cache.source().name(), "direct-source");
}

#[test]
fn dispatcher_applies_source_and_stated_events() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = Arc::new(ProofCache::new(
        source.clone(),
        stated.clone(),
        RootStatedPolicy::default(),
    ));
    let listener = CountingListener::new();
    cache.add_listener(&conclusion, listener.clone());
    let dispatcher =
        ChangeDispatcher::spawn_subscribed(cache.clone(), source.as_ref(), stated.as_ref())
            .unwrap();

    cache.get_proof(&conclusion).unwrap();

    // The source reports one conclusion stale.
    source.fire_proof_changed(conclusion.key());
    wait_for("proof-changed invalidation", || {
        cache.state(&conclusion.key()) == Some(CacheState::Stale)
    });
    assert_eq!(listener.count(), 1);

    // A fact edit invalidates through the same queue.
    cache.get_proof(&conclusion).unwrap();
    stated.assert_fact(&Statement::new("Z"), "ontology.toml");
    wait_for("stated-changed invalidation", || {
        cache.state(&conclusion.key()) == Some(CacheState::Stale)
    });
    assert_eq!(listener.count(), 2);

    dispatcher.shutdown();
}

#[test]
fn direct_events_reach_the_cache_through_the_dispatcher() {
    let (source, stated, conclusion) = common::chain_setup();
    let cache = Arc::new(ProofCache::new(source, stated, RootStatedPolicy::default()));
    let dispatcher = ChangeDispatcher::spawn(cache.clone()).unwrap();

    cache.get_proof(&conclusion).unwrap();
    dispatcher
        .send(ChangeEvent::ProofChanged(conclusion.key()))
        .unwrap();
    wait_for("direct event invalidation", || {
        cache.state(&conclusion.key()) == Some(CacheState::Stale)
    });
    dispatcher.shutdown();
}

#[test]
fn occurrences_are_display_metadata() {
    let stated = TableStatedProvider::new();
    let fact = Statement::new("C");
    stated.assert_fact(&fact, "ontology.toml");
    stated.assert_fact(&fact, "imports/base.toml");
    stated.assert_fact(&fact, "ontology.toml");

    use logos_core::source::StatedProvider;
    assert_eq!(
        stated.occurrences(&fact.key()),
        vec!["ontology.toml", "imports/base.toml"]
    );
    assert!(stated.occurrences(&Statement::new("missing").key()).is_empty());
}
