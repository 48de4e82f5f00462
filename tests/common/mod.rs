//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use logos_core::{
    proof::{ProofGraph, ProofGraphBuilder},
    source::{TableProofSource, TableStatedProvider},
    statement::Statement,
};

/// A <- B <- C, with C intended to be stated.
pub fn chain_graph() -> ProofGraph {
    let mut builder = ProofGraphBuilder::new();
    let a = builder.node(Statement::new("A"));
    let b = builder.node(Statement::new("B"));
    let c = builder.node(Statement::new("C"));
    builder.inference(a, "r1", [b]);
    builder.inference(b, "r2", [c]);
    builder.build()
}

/// One conclusion justified by `width` alternative inferences, each from its
/// own stated leaf `L{i}`.
pub fn wide_graph(root_text: &str, width: usize) -> (ProofGraph, Vec<Statement>) {
    let mut builder = ProofGraphBuilder::new();
    let root = builder.node(Statement::new(root_text));
    let mut leaves = Vec::with_capacity(width);
    for i in 0..width {
        let leaf_statement = Statement::new(format!("L{i}"));
        let leaf = builder.node(leaf_statement.clone());
        builder.inference(root, &format!("alt-{i}"), [leaf]);
        leaves.push(leaf_statement);
    }
    (builder.build(), leaves)
}

/// A linear chain `root <- N1 <- ... <- N{depth}` ending in a stated leaf.
pub fn deep_graph(root_text: &str, depth: usize) -> (ProofGraph, Statement) {
    let mut builder = ProofGraphBuilder::new();
    let mut current = builder.node(Statement::new(root_text));
    for i in 1..=depth {
        let next = builder.node(Statement::new(format!("N{i}")));
        builder.inference(current, &format!("step-{i}"), [next]);
        current = next;
    }
    let leaf = Statement::new(format!("N{depth}"));
    (builder.build(), leaf)
}

/// Source and provider preloaded with [chain_graph] and stated fact C.
pub fn chain_setup() -> (Arc<TableProofSource>, Arc<TableStatedProvider>, Statement) {
    let conclusion = Statement::new("A");
    let source = Arc::new(TableProofSource::new("test-source"));
    source.insert(&conclusion, chain_graph());
    let stated = Arc::new(TableStatedProvider::new());
    stated.assert_fact(&Statement::new("C"), "ontology.toml");
    (source, stated, conclusion)
}
