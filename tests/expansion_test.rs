//! Bounded expansion cursor integration tests.

mod common;

use logos_core::{
    cursor::{ExpansionCursor, ExpansionLimits},
    proof::{prune, PrunedProof, RootStatedPolicy},
    statement::{StatedSet, Statement},
};

fn wide_proof(width: usize) -> PrunedProof {
    let (graph, leaves) = common::wide_graph("Goal", width);
    let stated: StatedSet = leaves.iter().collect();
    let root = graph.lookup(&Statement::new("Goal").key()).unwrap();
    prune(&graph, root, &stated, RootStatedPolicy::default())
}

fn deep_proof(depth: usize) -> PrunedProof {
    let (graph, leaf) = common::deep_graph("Goal", depth);
    let stated: StatedSet = [&leaf].into_iter().collect();
    let root = graph.lookup(&Statement::new("Goal").key()).unwrap();
    prune(&graph, root, &stated, RootStatedPolicy::default())
}

/// Ten surviving alternatives under a per-conclusion limit of five: the
/// first page shows exactly five in original order and signals truncation,
/// the second page resumes with the remaining five.
#[test]
fn truncation_pages_in_original_order() {
    let proof = wide_proof(10);
    let mut cursor = ExpansionCursor::new(
        &proof,
        ExpansionLimits {
            per_conclusion_limit: 5,
            expansion_step_limit: 300,
        },
    );

    let first = cursor.inferences(proof.root_id());
    assert_eq!(first.count, 10);
    assert_eq!(first.start, 0);
    assert!(first.truncated);
    let rules: Vec<&str> = first
        .inferences
        .iter()
        .map(|(_, inference)| inference.rule.as_str())
        .collect();
    assert_eq!(rules, vec!["alt-0", "alt-1", "alt-2", "alt-3", "alt-4"]);

    let second = cursor.inferences(proof.root_id());
    assert_eq!(second.start, 5);
    assert!(!second.truncated);
    let rules: Vec<&str> = second
        .inferences
        .iter()
        .map(|(_, inference)| inference.rule.as_str())
        .collect();
    assert_eq!(rules, vec!["alt-5", "alt-6", "alt-7", "alt-8", "alt-9"]);

    // Fully served: further pages are empty, never wrap around.
    let third = cursor.inferences(proof.root_id());
    assert_eq!(third.start, 10);
    assert!(third.inferences.is_empty());
    assert!(!third.truncated);
}

#[test]
fn restart_forgets_served_pages() {
    let proof = wide_proof(6);
    let mut cursor = ExpansionCursor::new(
        &proof,
        ExpansionLimits {
            per_conclusion_limit: 4,
            expansion_step_limit: 300,
        },
    );
    assert_eq!(cursor.inferences(proof.root_id()).start, 0);
    assert_eq!(cursor.inferences(proof.root_id()).start, 4);
    cursor.restart();
    assert_eq!(cursor.inferences(proof.root_id()).start, 0);
}

/// A chain of ten inferences under a step limit of three takes four expand
/// steps; only the step limit (never the chain depth) bounds one call.
#[test]
fn expand_is_bounded_by_step_limit() {
    let proof = deep_proof(10);
    let mut cursor = ExpansionCursor::new(
        &proof,
        ExpansionLimits {
            per_conclusion_limit: 5,
            expansion_step_limit: 3,
        },
    );

    let mut total = 0;
    let mut steps = Vec::new();
    loop {
        let report = cursor.expand(proof.root_id());
        total += report.inferences_exposed;
        steps.push(report.inferences_exposed);
        if !report.exhausted {
            break;
        }
        assert!(report.inferences_exposed <= 3);
    }
    assert_eq!(total, 10);
    assert_eq!(steps, vec![3, 3, 3, 1]);
}

#[test]
fn expand_within_budget_reports_not_exhausted() {
    let proof = deep_proof(4);
    let mut cursor = ExpansionCursor::new(&proof, ExpansionLimits::default());
    let report = cursor.expand(proof.root_id());
    assert_eq!(report.inferences_exposed, 4);
    assert!(!report.exhausted);
    assert_eq!(report.unfolded.len(), 4);

    // Everything already unfolded: a second step is a no-op.
    let again = cursor.expand(proof.root_id());
    assert_eq!(again.inferences_exposed, 0);
    assert!(!again.exhausted);
}

/// Expansion serves at most one page per conclusion per step; the remaining
/// alternatives stay behind the per-conclusion truncation signal.
#[test]
fn expand_serves_one_page_per_conclusion() {
    let proof = wide_proof(7);
    let mut cursor = ExpansionCursor::new(
        &proof,
        ExpansionLimits {
            per_conclusion_limit: 5,
            expansion_step_limit: 100,
        },
    );
    let first = cursor.expand(proof.root_id());
    assert_eq!(first.inferences_exposed, 5);
    let second = cursor.expand(proof.root_id());
    assert_eq!(second.inferences_exposed, 2);
    let third = cursor.expand(proof.root_id());
    assert_eq!(third.inferences_exposed, 0);
}

#[test]
fn cursor_over_leaf_proofs_is_empty() {
    let stated = PrunedProof::stated_leaf(Statement::new("Axiom"));
    let mut cursor = ExpansionCursor::new(&stated, ExpansionLimits::default());
    let page = cursor.inferences(stated.root_id());
    assert_eq!(page.count, 0);
    assert!(!page.truncated);
    assert!(page.inferences.is_empty());

    let marker = PrunedProof::not_derivable(Statement::new("Unexplained"));
    let mut cursor = ExpansionCursor::new(&marker, ExpansionLimits::default());
    let report = cursor.expand(marker.root_id());
    assert_eq!(report.inferences_exposed, 0);
    assert!(!report.exhausted);
}

/// Two cursors over the same proof observe identical pages: resumption
/// order is deterministic and caller-observable.
#[test]
fn paging_is_deterministic() {
    let proof = wide_proof(9);
    let limits = ExpansionLimits {
        per_conclusion_limit: 4,
        expansion_step_limit: 300,
    };
    let mut left = ExpansionCursor::new(&proof, limits);
    let mut right = ExpansionCursor::new(&proof, limits);
    for _ in 0..3 {
        let a = left.inferences(proof.root_id());
        let b = right.inferences(proof.root_id());
        assert_eq!(a, b);
    }
}
