//! Proof graph model and derivability pruning.
//!
//! This module provides the core proof infrastructure: the raw graph arena a
//! reasoning source produces and the pruning transform that turns it into a
//! finite, acyclic, displayable proof.
//!
//! # Module Organization
//!
//! - [`graph`]: Raw proof graph data structures (ProofGraph, ProofNode, Inference)
//! - [`prune`]: The derivability pruner and its PrunedProof output
//!
//! # Public API
//!
//! The module re-exports all public types:
//!
//! ```rust
//! use logos_core::proof::{prune, ProofGraphBuilder, PrunedProof, RootStatedPolicy};
//! ```

mod graph;
mod prune;


pub use graph::{Inference, NodeId, ProofGraph, ProofGraphBuilder, ProofNode};
pub use prune::{
    prune, Grounds, PrunedInference, PrunedNode, PrunedNodeId, PrunedProof, RootStatedPolicy,
};
