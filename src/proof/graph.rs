//! Raw proof graph data structures, as supplied by a reasoning source.
//!
//! The graph is an arena: [ProofGraph] owns every [ProofNode] in a flat
//! vector and inferences refer to premises by [NodeId]. A key index keeps one
//! node per conclusion, so a conclusion reached along different derivation
//! paths is the same node (DAG sharing) and cyclic derivations are
//! representable without ownership cycles.
//!
//! Raw graphs are read-only once built. The pruner never mutates them; it
//! produces new [crate::proof::PrunedProof] structures instead.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use crate::statement::{Statement, StatementKey};

/// Arena index of a [ProofNode] within its [ProofGraph].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A justification step: applying `rule` to the ordered `premises` derives
/// the conclusion of the owning [ProofNode]. Premise order is meaningful for
/// display (numbered premises) and is preserved through pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    pub rule: String,
    pub premises: Vec<NodeId>,
}

/// One conclusion together with the ordered inferences that justify it. Zero
/// inferences means the reasoning source had nothing further to offer for
/// this conclusion; whether that makes it trustworthy is decided by the
/// stated set during pruning, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofNode {
    pub statement: Statement,
    pub inferences: Vec<Inference>,
}

impl ProofNode {
    pub fn is_leaf(&self) -> bool {
        self.inferences.is_empty()
    }
}

/// A possibly cyclic, possibly exponentially-shared proof graph rooted at
/// some conclusion of interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProofGraph {
    nodes: Vec<ProofNode>,
    index: BTreeMap<StatementKey, NodeId>,
}

impl ProofGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics on an id that does not belong to this graph; ids are only
    /// produced by [ProofGraphBuilder] for this arena.
    pub fn node(&self, id: NodeId) -> &ProofNode {
        &self.nodes[id.0]
    }

    pub fn lookup(&self, key: &StatementKey) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ProofNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

/// Incremental [ProofGraph] construction for reasoning sources and tests.
///
/// `node` deduplicates by [StatementKey], so declaring the same conclusion
/// twice returns the original id (first-seen annotations win). Inferences are
/// appended in call order, which is the order the pruner and the expansion
/// cursor preserve.
#[derive(Debug, Default)]
pub struct ProofGraphBuilder {
    graph: ProofGraph,
}

impl ProofGraphBuilder {
    pub fn new() -> Self {
        ProofGraphBuilder::default()
    }

    pub fn node(&mut self, statement: Statement) -> NodeId {
        let key = statement.key();
        if let Some(existing) = self.graph.index.get(&key) {
            return *existing;
        }
        let id = NodeId(self.graph.nodes.len());
        self.graph.nodes.push(ProofNode {
            statement,
            inferences: Vec::new(),
        });
        self.graph.index.insert(key, id);
        id
    }

    pub fn inference<I>(&mut self, conclusion: NodeId, rule: &str, premises: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.graph.nodes[conclusion.0].inferences.push(Inference {
            rule: rule.to_string(),
            premises: premises.into_iter().collect(),
        });
    }

    pub fn build(self) -> ProofGraph {
        self.graph
    }
}
