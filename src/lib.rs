//! # logos-core
//!
//! A Rust library for turning raw proof graphs into finite, browsable,
//! cache-consistent explanations of entailed conclusions.
//!
//! The name "logos" comes from the Greek λόγος - reason, account, explanation.
//!
//! ## Overview
//!
//! An external reasoning source knows *that* a conclusion follows from a set
//! of stated facts and can produce a **proof graph** saying why: each
//! conclusion is justified by zero or more inferences, each inference
//! consumes premise conclusions justified the same way. The raw graph may
//! contain cycles (mutually-derived conclusions), redundant alternatives,
//! and sub-structure shared by many parents, so it cannot be shown to a user
//! as-is. logos-core prunes it to a finite, acyclic, fully grounded proof,
//! caches the result per conclusion, exposes it through a bounded expansion
//! cursor, and keeps everything consistent as the fact set or the reasoning
//! source changes.
//!
//! ### Key Features
//!
//! - **Derivability pruning**: cycle elimination and dead-branch removal with
//!   memoized sharing, deterministic output order
//! - **Stated-fact precedence**: conclusions present in the fact base render
//!   as trusted leaves regardless of available inferences
//! - **Bounded browsing**: per-conclusion paging plus step-limited expansion,
//!   so no interaction materializes an unbounded subtree
//! - **Explicit invalidation**: per-conclusion cache entries with an
//!   at-most-once change notification per staleness episode
//! - **Deferred dispatch**: change events decouple the reporting subsystem's
//!   critical section from invalidation and listener fan-out
//! - **Pluggable sources**: capability traits for reasoning sources and
//!   stated-fact providers, selected at configuration time
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use logos_core::{
//!     cache::ProofCache,
//!     cursor::{ExpansionCursor, ExpansionLimits},
//!     proof::{ProofGraphBuilder, RootStatedPolicy},
//!     source::{TableProofSource, TableStatedProvider},
//!     statement::Statement,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A small proof graph: A follows from B, B follows from the stated
//!     // fact C.
//!     let a = Statement::new("A");
//!     let mut builder = ProofGraphBuilder::new();
//!     let a_node = builder.node(a.clone());
//!     let b_node = builder.node(Statement::new("B"));
//!     let c_node = builder.node(Statement::new("C"));
//!     builder.inference(a_node, "rule-1", [b_node]);
//!     builder.inference(b_node, "rule-2", [c_node]);
//!
//!     let source = Arc::new(TableProofSource::new("demo"));
//!     source.insert(&a, builder.build());
//!
//!     let stated = Arc::new(TableStatedProvider::new());
//!     stated.assert_fact(&Statement::new("C"), "ontology.toml");
//!
//!     let cache = ProofCache::new(source, stated, RootStatedPolicy::default());
//!     let proof = cache.get_proof(&a)?;
//!     assert!(proof.is_derivable());
//!
//!     // Browse it one bounded page at a time.
//!     let mut cursor = ExpansionCursor::new(&proof, ExpansionLimits::default());
//!     let page = cursor.inferences(proof.root_id());
//!     assert_eq!(page.count, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Pruning
//!
//! [`proof::prune`] resolves each conclusion at most once per distinct cycle
//! context: a per-call memo table shares sub-results, an on-path set turns
//! cyclic occurrences into dead branches, and an inference survives only if
//! every premise is derivable. The output is guaranteed acyclic and
//! grounded; "no explanation" is a well-formed marker proof, never an error.
//!
//! ### Cache & Change Protocol
//!
//! [`cache::ProofCache`] tracks each conclusion through
//! `STALE -> COMPUTING -> FRESH` under a per-entry lock, so concurrent
//! readers observe at most one recomputation between invalidations. Stated
//! set edits, source-reported proof changes, and source switches all arrive
//! as [`event::ChangeEvent`]s, usually through a
//! [`watch::ChangeDispatcher`] so the reporting subsystem never runs
//! fan-out itself.
//!
//! ## Module Guide
//!
//! Start with [`proof`] for the graph model and the pruner, then
//! [`cache::ProofCache`] for cached access and [`cursor::ExpansionCursor`]
//! for bounded browsing. [`source`] documents the collaborator contracts and
//! [`config`] the persisted preference surface.

pub mod cache;
pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod proof;
pub mod source;
pub mod statement;
pub mod watch;

pub use error::*;
