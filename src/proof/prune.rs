//! Derivability pruning: the transform from a raw, possibly cyclic proof
//! graph to the finite acyclic proof that is actually shown to a user.
//!
//! [prune] works in two passes. A worklist saturation pass first computes
//! the set of derivable conclusions (stated, or concluded by an inference
//! whose premises are all derivable) in time proportional to the total
//! premise count. A depth-first rebuild pass then walks the raw graph with a
//! per-call memo table keyed by [StatementKey] (shared sub-structure is
//! rebuilt once) and an on-path set: a conclusion encountered while it is
//! still being resolved is a cycle occurrence and fails that occurrence
//! only, since the same conclusion may resolve through a different inference
//! once its open caller has committed. An inference survives iff every
//! premise resolves; a rebuilt node keeps its survivors in original order.
//!
//! Underivability established by saturation is global and memoized up
//! front; a derivable node whose inferences were all cycle-blocked in the
//! current context is deliberately not memoized, so it can be re-expanded
//! under a different cycle context.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt::{Display, Formatter},
};

use petgraph::{algo::is_cyclic_directed, graph::DiGraph};

use crate::{
    error::LogosError,
    proof::graph::{NodeId, ProofGraph, ProofNode},
    statement::{StatedSet, Statement, StatementKey},
};

/// Arena index of a [PrunedNode] within its [PrunedProof].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PrunedNodeId(pub(crate) usize);

impl Display for PrunedNodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A surviving inference: all premises resolved to derivable nodes. Premise
/// order matches the raw inference it was rebuilt from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrunedInference {
    pub rule: String,
    pub premises: Vec<PrunedNodeId>,
}

/// Why a pruned node is trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Grounds {
    /// Present in the stated set; rendered as a trusted leaf even when the
    /// raw graph offered further inferences.
    Stated,
    /// At least one inference survived pruning, listed in original order.
    Derived(Vec<PrunedInference>),
    /// No grounding exists. Only ever the lone root marker of a proof whose
    /// conclusion could not be explained; callers render it as "no
    /// explanation available", never as an empty valid proof.
    NotDerivable,
}

impl Grounds {
    pub fn inferences(&self) -> &[PrunedInference] {
        match self {
            Grounds::Derived(inferences) => inferences,
            Grounds::Stated | Grounds::NotDerivable => &[],
        }
    }

    pub fn is_stated(&self) -> bool {
        matches!(self, Grounds::Stated)
    }

    pub fn is_derivable(&self) -> bool {
        !matches!(self, Grounds::NotDerivable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrunedNode {
    pub statement: Statement,
    pub grounds: Grounds,
}

/// The finite, acyclic, fully grounded proof produced for display.
///
/// Owns its nodes in an arena; sub-results shared between non-overlapping
/// positions point at the same [PrunedNodeId]. The raw graph the proof was
/// computed from is not referenced and may be discarded by its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrunedProof {
    nodes: Vec<PrunedNode>,
    root: PrunedNodeId,
}

impl PrunedProof {
    /// A proof consisting of a single trusted stated leaf.
    pub fn stated_leaf(statement: Statement) -> Self {
        PrunedProof {
            nodes: vec![PrunedNode {
                statement,
                grounds: Grounds::Stated,
            }],
            root: PrunedNodeId(0),
        }
    }

    /// The "no explanation available" marker proof.
    pub fn not_derivable(statement: Statement) -> Self {
        PrunedProof {
            nodes: vec![PrunedNode {
                statement,
                grounds: Grounds::NotDerivable,
            }],
            root: PrunedNodeId(0),
        }
    }

    pub fn root_id(&self) -> PrunedNodeId {
        self.root
    }

    pub fn root(&self) -> &PrunedNode {
        &self.nodes[self.root.0]
    }

    /// Panics on an id from a different proof; ids are only produced for
    /// this arena.
    pub fn node(&self, id: PrunedNodeId) -> &PrunedNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (PrunedNodeId, &PrunedNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (PrunedNodeId(i), n))
    }

    /// `false` exactly when this proof is the NOT_DERIVABLE marker.
    pub fn is_derivable(&self) -> bool {
        self.root().grounds.is_derivable()
    }

    /// Verifies the structural invariants every pruned proof must satisfy:
    /// no node reachable from itself through inference premises, every
    /// premise id in-arena and derivable, NOT_DERIVABLE nowhere but a lone
    /// root marker, and every arena node reachable from the root.
    ///
    /// Violations are programming errors in the pruner, not runtime
    /// conditions; [prune] checks this in debug builds after every call.
    pub fn built_in_test(&self) -> Result<(), LogosError> {
        if self.nodes.is_empty() {
            return Err(LogosError::Custom("pruned proof has no nodes".to_string()));
        }
        let mut graph = DiGraph::<(), ()>::new();
        let indices: Vec<_> = self.nodes.iter().map(|_| graph.add_node(())).collect();
        let mut reachable = BTreeSet::from([self.root.0]);
        let mut frontier = VecDeque::from([self.root.0]);
        while let Some(current) = frontier.pop_front() {
            for inference in self.nodes[current].grounds.inferences() {
                for premise in &inference.premises {
                    let premise_node = self.nodes.get(premise.0).ok_or_else(|| {
                        LogosError::Custom(format!(
                            "inference premise {premise} is not in the proof arena"
                        ))
                    })?;
                    if !premise_node.grounds.is_derivable() {
                        return Err(LogosError::Custom(format!(
                            "inference premise {premise} resolves to a non-derivable node"
                        )));
                    }
                    graph.add_edge(indices[current], indices[premise.0], ());
                    if reachable.insert(premise.0) {
                        frontier.push_back(premise.0);
                    }
                }
            }
        }
        if is_cyclic_directed(&graph) {
            return Err(LogosError::Custom(
                "pruned proof contains a premise cycle".to_string(),
            ));
        }
        for (id, node) in self.nodes() {
            if matches!(node.grounds, Grounds::NotDerivable)
                && (self.nodes.len() != 1 || id != self.root)
            {
                return Err(LogosError::Custom(format!(
                    "NOT_DERIVABLE node {id} exposed outside the lone root marker"
                )));
            }
            if !reachable.contains(&id.0) {
                return Err(LogosError::Custom(format!(
                    "node {id} is not reachable from the proof root"
                )));
            }
        }
        Ok(())
    }

    pub fn display_contents(&self) -> String {
        let mut out = String::new();
        let mut seen = BTreeSet::new();
        self.display_node(self.root, 0, &mut seen, &mut out);
        out
    }

    fn display_node(
        &self,
        id: PrunedNodeId,
        depth: usize,
        seen: &mut BTreeSet<PrunedNodeId>,
        out: &mut String,
    ) {
        let node = self.node(id);
        let pad = "  ".repeat(depth);
        let marker = match &node.grounds {
            Grounds::Stated => " [stated]",
            Grounds::NotDerivable => " [not derivable]",
            Grounds::Derived(_) => "",
        };
        if !seen.insert(id) {
            out.push_str(&format!("{pad}{}{} (see above)\n", node.statement, marker));
            return;
        }
        out.push_str(&format!("{pad}{}{}\n", node.statement, marker));
        for inference in node.grounds.inferences() {
            out.push_str(&format!("{pad}- by {}:\n", inference.rule));
            for premise in &inference.premises {
                self.display_node(*premise, depth + 1, seen, out);
            }
        }
    }
}

impl Display for PrunedProof {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_contents())
    }
}

/// How to render a root conclusion that is itself a stated fact.
///
/// The pruner never treats the root as stated while resolving it, so asking
/// to explain an already-stated fact can still surface a real derivation;
/// this policy decides what the caller sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootStatedPolicy {
    /// Render the root as a trivially-justified stated leaf without
    /// consulting the reasoning source's inferences.
    StatedLeaf,
    /// Prefer a surviving derivation; fall back to the stated leaf when none
    /// survives. A stated root is never rendered as NOT_DERIVABLE.
    #[default]
    Derive,
}

/// Least fixpoint of "stated, or concluded by an inference whose premises
/// are all derivable", computed with per-inference missing-premise counters
/// and a worklist, so the cost is linear in the total premise count rather
/// than in the number of raw derivation paths.
fn saturate_derivable(graph: &ProofGraph, stated: &StatedSet) -> BTreeSet<StatementKey> {
    let mut missing: Vec<Vec<usize>> = Vec::with_capacity(graph.len());
    let mut dependents: BTreeMap<StatementKey, Vec<(NodeId, usize)>> = BTreeMap::new();
    let mut derivable = BTreeSet::new();
    let mut queue = VecDeque::new();

    for (id, node) in graph.nodes() {
        let key = node.statement.key();
        if stated.contains(&key) && derivable.insert(key) {
            queue.push_back(key);
        }
        let counters = node
            .inferences
            .iter()
            .enumerate()
            .map(|(index, inference)| {
                for premise in &inference.premises {
                    let premise_key = graph.node(*premise).statement.key();
                    if !stated.contains(&premise_key) {
                        dependents.entry(premise_key).or_default().push((id, index));
                    }
                }
                inference
                    .premises
                    .iter()
                    .filter(|premise| !stated.contains(&graph.node(**premise).statement.key()))
                    .count()
            })
            .collect::<Vec<usize>>();
        missing.push(counters);
    }
    // Inferences satisfied from the start (zero premises, or all stated).
    for (id, node) in graph.nodes() {
        let key = node.statement.key();
        if missing[id.0].iter().any(|count| *count == 0) && derivable.insert(key) {
            queue.push_back(key);
        }
    }
    while let Some(key) = queue.pop_front() {
        let Some(waiting) = dependents.remove(&key) else {
            continue;
        };
        for (node_id, inference_index) in waiting {
            let counter = &mut missing[node_id.0][inference_index];
            *counter -= 1;
            if *counter == 0 {
                let conclusion = graph.node(node_id).statement.key();
                if derivable.insert(conclusion) {
                    queue.push_back(conclusion);
                }
            }
        }
    }
    derivable
}

struct PruneCtx<'g> {
    graph: &'g ProofGraph,
    stated: &'g StatedSet,
    derivable: BTreeSet<StatementKey>,
    /// Rebuilt sub-results, shared across occurrences.
    memo: BTreeMap<StatementKey, PrunedNodeId>,
    on_path: BTreeSet<StatementKey>,
    nodes: Vec<PrunedNode>,
}

impl<'g> PruneCtx<'g> {
    fn new(graph: &'g ProofGraph, stated: &'g StatedSet) -> Self {
        PruneCtx {
            graph,
            stated,
            derivable: saturate_derivable(graph, stated),
            memo: BTreeMap::new(),
            on_path: BTreeSet::new(),
            nodes: Vec::new(),
        }
    }

    fn push(&mut self, statement: Statement, grounds: Grounds) -> PrunedNodeId {
        let id = PrunedNodeId(self.nodes.len());
        self.nodes.push(PrunedNode { statement, grounds });
        id
    }

    /// Resolve one occurrence of a conclusion. `None` means underivable, or
    /// derivable but cycle-blocked at this position; the caller drops the
    /// inference that needed it.
    fn visit(&mut self, id: NodeId) -> Option<PrunedNodeId> {
        let node = self.graph.node(id);
        let key = node.statement.key();
        // Stated status takes priority over any available inference.
        if self.stated.contains(&key) {
            if let Some(leaf) = self.memo.get(&key) {
                return Some(*leaf);
            }
            let leaf = self.push(node.statement.clone(), Grounds::Stated);
            self.memo.insert(key, leaf);
            return Some(leaf);
        }
        if !self.derivable.contains(&key) {
            return None;
        }
        if let Some(rebuilt) = self.memo.get(&key) {
            return Some(*rebuilt);
        }
        if self.on_path.contains(&key) {
            // Cycle occurrence: fails here only. The conclusion is derivable
            // and may rebuild through a different inference of a still-open
            // caller, so nothing is memoized.
            return None;
        }
        self.on_path.insert(key);
        let survivors = self.resolve_inferences(node);
        self.on_path.remove(&key);
        if survivors.is_empty() {
            // Derivable, but every witnessing inference was blocked by the
            // current path; leave unmemoized for other cycle contexts.
            return None;
        }
        let rebuilt = self.push(node.statement.clone(), Grounds::Derived(survivors));
        self.memo.insert(key, rebuilt);
        Some(rebuilt)
    }

    fn resolve_inferences(&mut self, node: &ProofNode) -> Vec<PrunedInference> {
        let mut survivors = Vec::new();
        for inference in &node.inferences {
            let mut premises = Vec::with_capacity(inference.premises.len());
            let mut dead = false;
            for premise in &inference.premises {
                match self.visit(*premise) {
                    Some(rebuilt) => premises.push(rebuilt),
                    None => {
                        dead = true;
                        break;
                    }
                }
            }
            if !dead {
                // Rebuilt with resolved premises, original order intact. An
                // inference with zero premises lands here vacuously.
                survivors.push(PrunedInference {
                    rule: inference.rule.clone(),
                    premises,
                });
            }
        }
        survivors
    }

    /// Step 1 of the visit is skipped for the root: its stated status is the
    /// caller's [RootStatedPolicy] decision, not the pruner's. Premise
    /// occurrences of the same conclusion deeper in the graph are still
    /// treated as stated.
    fn visit_root(&mut self, root: NodeId) -> Option<PrunedNodeId> {
        let node = self.graph.node(root);
        let key = node.statement.key();
        self.on_path.insert(key);
        let survivors = self.resolve_inferences(node);
        self.on_path.remove(&key);
        if survivors.is_empty() {
            return None;
        }
        Some(self.push(node.statement.clone(), Grounds::Derived(survivors)))
    }
}

/// Prune the raw graph rooted at `root` down to the derivable proof for that
/// conclusion. Deterministic given equal inputs; the raw graph is never
/// mutated.
pub fn prune(
    graph: &ProofGraph,
    root: NodeId,
    stated: &StatedSet,
    policy: RootStatedPolicy,
) -> PrunedProof {
    let root_node = graph.node(root);
    let root_stated = stated.contains(&root_node.statement.key());
    let proof = if root_stated && policy == RootStatedPolicy::StatedLeaf {
        PrunedProof::stated_leaf(root_node.statement.clone())
    } else {
        let mut ctx = PruneCtx::new(graph, stated);
        match ctx.visit_root(root) {
            Some(rebuilt) => compact(ctx.nodes, rebuilt),
            None if root_stated => PrunedProof::stated_leaf(root_node.statement.clone()),
            None => PrunedProof::not_derivable(root_node.statement.clone()),
        }
    };
    tracing::debug!(
        conclusion = %root_node.statement,
        raw_nodes = graph.len(),
        pruned_nodes = proof.len(),
        derivable = proof.is_derivable(),
        "pruned proof graph"
    );
    if cfg!(debug_assertions) {
        if let Err(err) = proof.built_in_test() {
            panic!("pruned proof failed its built in test: {err}");
        }
    }
    proof
}

/// Drop arena entries that exploration created but no surviving inference
/// references (stated leaves of dead inferences, abandoned sub-results).
/// Ids are reassigned in breadth-first discovery order from the root, which
/// keeps the output deterministic and sharing intact.
fn compact(nodes: Vec<PrunedNode>, root: PrunedNodeId) -> PrunedProof {
    let mut remap = BTreeMap::from([(root.0, 0usize)]);
    let mut order = vec![root.0];
    let mut frontier = VecDeque::from([root.0]);
    while let Some(current) = frontier.pop_front() {
        for inference in nodes[current].grounds.inferences() {
            for premise in &inference.premises {
                if !remap.contains_key(&premise.0) {
                    remap.insert(premise.0, order.len());
                    order.push(premise.0);
                    frontier.push_back(premise.0);
                }
            }
        }
    }
    let compacted = order
        .iter()
        .map(|old| {
            let node = &nodes[*old];
            let grounds = match &node.grounds {
                Grounds::Derived(inferences) => Grounds::Derived(
                    inferences
                        .iter()
                        .map(|inference| PrunedInference {
                            rule: inference.rule.clone(),
                            premises: inference
                                .premises
                                .iter()
                                .map(|p| PrunedNodeId(remap[&p.0]))
                                .collect(),
                        })
                        .collect(),
                ),
                other => other.clone(),
            };
            PrunedNode {
                statement: node.statement.clone(),
                grounds,
            }
        })
        .collect();
    PrunedProof {
        nodes: compacted,
        root: PrunedNodeId(0),
    }
}
