use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::statement::StatementKey;

/// Triggers that make a cached proof stale.
///
/// Events are produced inside whatever subsystem observed the change (an
/// ontology editor, a reasoning source) and drained by a
/// [crate::watch::ChangeDispatcher], so the producer's critical section never
/// runs cache invalidation or listener fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// The stated fact set was edited. Every cached proof may cite stated
    /// facts, so all entries go stale.
    StatedChanged,
    /// The active reasoning source reports that a previously returned proof
    /// for this conclusion may no longer be up to date.
    ProofChanged(StatementKey),
    /// A different reasoning source became active; carries its name.
    SourceSwitched(String),
}

impl ChangeEvent {
    /// The single conclusion this event targets, or `None` for events that
    /// invalidate every tracked conclusion.
    pub fn conclusion(&self) -> Option<&StatementKey> {
        match self {
            ChangeEvent::ProofChanged(key) => Some(key),
            ChangeEvent::StatedChanged | ChangeEvent::SourceSwitched(_) => None,
        }
    }
}

impl Display for ChangeEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ChangeEvent::StatedChanged => write!(f, "StatedChanged"),
            ChangeEvent::ProofChanged(_) => write!(f, "ProofChanged"),
            ChangeEvent::SourceSwitched(name) => write!(f, "SourceSwitched({name})"),
        }
    }
}
