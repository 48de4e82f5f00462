//! Bounded, resumable browsing of a [PrunedProof].
//!
//! A pruned proof can be deep and wide even after cycle elimination, so
//! consumers never walk it wholesale. [ExpansionCursor] meters the walk with
//! two caller-supplied limits: how many alternative inferences one
//! conclusion exposes per page, and how many inferences one user-triggered
//! expand step may unfold across the subtree before requiring another
//! explicit step. Results page in stable pruner order and repeated calls
//! resume where the previous page stopped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    config::{DEFAULT_INFERENCES_PER_CONCLUSION_LIMIT, DEFAULT_RECURSIVE_EXPANSION_LIMIT},
    proof::{PrunedInference, PrunedNodeId, PrunedProof},
};

/// Caller-supplied expansion configuration, normally sourced from
/// [crate::config::ExplanationPreferences].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionLimits {
    /// Max alternative inferences exposed at once for one conclusion.
    pub per_conclusion_limit: usize,
    /// Max inferences unfolded across the subtree in one [ExpansionCursor::expand] call.
    pub expansion_step_limit: usize,
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        ExpansionLimits {
            per_conclusion_limit: DEFAULT_INFERENCES_PER_CONCLUSION_LIMIT,
            expansion_step_limit: DEFAULT_RECURSIVE_EXPANSION_LIMIT,
        }
    }
}

/// One page of alternative inferences for a single conclusion.
#[derive(Debug, Clone, PartialEq)]
pub struct InferencePage<'p> {
    /// Total surviving inferences at this conclusion.
    pub count: usize,
    /// Offset of the first inference in this page.
    pub start: usize,
    /// `true` when inferences beyond this page remain unserved; the next
    /// [ExpansionCursor::inferences] call for the same conclusion resumes
    /// there rather than restarting.
    pub truncated: bool,
    /// `(original index, inference)` pairs in pruner order.
    pub inferences: Vec<(usize, &'p PrunedInference)>,
}

/// Outcome of one bounded expand step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandReport {
    /// Conclusions that had a page of inferences served this step, in
    /// breadth-first premise order.
    pub unfolded: Vec<PrunedNodeId>,
    /// Inferences exposed this step, summed over `unfolded`.
    pub inferences_exposed: usize,
    /// `true` when the step limit stopped the walk with work remaining.
    pub exhausted: bool,
}

#[derive(Debug)]
pub struct ExpansionCursor<'p> {
    proof: &'p PrunedProof,
    limits: ExpansionLimits,
    /// Per conclusion: how many of its inferences have been served so far.
    served: BTreeMap<PrunedNodeId, usize>,
}

impl<'p> ExpansionCursor<'p> {
    pub fn new(proof: &'p PrunedProof, limits: ExpansionLimits) -> Self {
        ExpansionCursor {
            proof,
            limits,
            served: BTreeMap::new(),
        }
    }

    pub fn proof(&self) -> &'p PrunedProof {
        self.proof
    }

    pub fn limits(&self) -> ExpansionLimits {
        self.limits
    }

    /// Forget all served pages; the next calls start from the first page
    /// again.
    pub fn restart(&mut self) {
        self.served.clear();
    }

    /// How many inferences of `id` have been served so far.
    pub fn served(&self, id: PrunedNodeId) -> usize {
        self.served.get(&id).copied().unwrap_or(0)
    }

    /// The next page of alternative inferences for one conclusion. Stated
    /// and marker leaves page as empty and never truncate.
    pub fn inferences(&mut self, id: PrunedNodeId) -> InferencePage<'p> {
        let all = self.proof.node(id).grounds.inferences();
        let start = self.served(id);
        let end = all.len().min(start.saturating_add(self.limits.per_conclusion_limit));
        let inferences = all[start..end]
            .iter()
            .enumerate()
            .map(|(offset, inference)| (start + offset, inference))
            .collect();
        self.served.insert(id, end);
        InferencePage {
            count: all.len(),
            start,
            truncated: end < all.len(),
            inferences,
        }
    }

    /// Unfold the subtree under `id` breadth-first, serving at most one page
    /// per conclusion encountered and at most
    /// [ExpansionLimits::expansion_step_limit] inferences overall. A page
    /// that would overrun the remaining budget is left unserved and the step
    /// reports `exhausted`; premises of previously served inferences are
    /// still traversed so a later step picks up where this one stopped.
    pub fn expand(&mut self, id: PrunedNodeId) -> ExpandReport {
        let budget = self.limits.expansion_step_limit;
        let mut unfolded = Vec::new();
        let mut exposed = 0usize;
        let mut exhausted = false;
        let mut visited = BTreeSet::from([id]);
        let mut frontier = VecDeque::from([id]);
        while let Some(current) = frontier.pop_front() {
            let pending = self.pending(current);
            if pending > 0 {
                let page = pending.min(self.limits.per_conclusion_limit);
                if exposed + page > budget {
                    exhausted = true;
                    break;
                }
                self.inferences(current);
                unfolded.push(current);
                exposed += page;
            }
            // Every premise of every inference served so far (this step or
            // earlier) stays on the frontier, in premise order.
            let node = self.proof.node(current);
            for inference in &node.grounds.inferences()[..self.served(current)] {
                for premise in &inference.premises {
                    if visited.insert(*premise) {
                        frontier.push_back(*premise);
                    }
                }
            }
        }
        ExpandReport {
            unfolded,
            inferences_exposed: exposed,
            exhausted,
        }
    }

    fn pending(&self, id: PrunedNodeId) -> usize {
        self.proof
            .node(id)
            .grounds
            .inferences()
            .len()
            .saturating_sub(self.served(id))
    }
}
