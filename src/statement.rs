/// [crate::statement] contains the value types shared by every layer of the
/// crate: the [Statement] being explained or used as a premise, its
/// annotation-insensitive [StatementKey], and the [StatedSet] of axioms the
/// pruner trusts without further justification.
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
};
use toml::value::Table;
use uuid::Uuid;

use crate::error::LogosError;

/// Namespace for content-derived statement keys. Keys are v5 UUIDs of the
/// canonical statement text within this namespace, so equal text always maps
/// to an equal key no matter which process produced it.
pub const STATEMENT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6c, 0x6f, 0x67, 0x6f, 0x73, 0x00, 0x50, 0x8b, 0xb2, 0x4d, 0x1f, 0x3a, 0x9e, 0x41, 0xc7, 0x05,
]);

/// Identity of a conclusion for derivability purposes.
///
/// Two syntactically annotated variants of the same statement compare equal
/// under their keys even though the full [Statement] values differ. This is
/// the comparison mode used by the pruner, the stated set, and the proof
/// cache; full `Statement` equality (text plus annotations) is only relevant
/// to display layers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StatementKey(Uuid);

impl StatementKey {
    pub fn from_text(text: &str) -> Self {
        StatementKey(Uuid::new_v5(&STATEMENT_NAMESPACE, text.trim().as_bytes()))
    }

    pub fn nil() -> Self {
        StatementKey(Uuid::nil())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for StatementKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0.hyphenated().encode_lower(&mut Uuid::encode_buffer())
        )
    }
}

impl FromStr for StatementKey {
    type Err = LogosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StatementKey(Uuid::try_parse(s)?))
    }
}

/// A logical statement, opaque to this crate. `text` is the canonical form
/// that determines identity; `annotations` carries display metadata (source
/// positions, rendering hints, user labels) that never participates in
/// derivability decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    #[serde(default, skip_serializing_if = "Table::is_empty")]
    pub annotations: Table,
}

impl Statement {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Statement {
            text: text.into(),
            annotations: Table::default(),
        }
    }

    pub fn with_annotation<S: Into<String>, V: Into<toml::Value>>(mut self, key: S, value: V) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// The annotation-insensitive identity of this statement.
    pub fn key(&self) -> StatementKey {
        StatementKey::from_text(&self.text)
    }

    /// Stated-fact comparison mode: equal modulo annotations.
    pub fn matches_stated(&self, other: &Statement) -> bool {
        self.key() == other.key()
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// The set of conclusions treated as axioms for one pruning pass, compared
/// under [StatementKey] identity. Every edit bumps `version`, which cached
/// proofs record so a stale stated set can be detected without diffing.
///
/// Not owned by the core: a [crate::source::StatedProvider] supplies a fresh
/// copy on each recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatedSet {
    keys: BTreeSet<StatementKey>,
    version: u64,
}

impl StatedSet {
    pub fn new() -> Self {
        StatedSet::default()
    }

    pub fn contains(&self, key: &StatementKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns `true` when the set changed. Changes bump the version.
    pub fn insert(&mut self, key: StatementKey) -> bool {
        let changed = self.keys.insert(key);
        if changed {
            self.version += 1;
        }
        changed
    }

    /// Returns `true` when the set changed. Changes bump the version.
    pub fn remove(&mut self, key: &StatementKey) -> bool {
        let changed = self.keys.remove(key);
        if changed {
            self.version += 1;
        }
        changed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatementKey> {
        self.keys.iter()
    }
}

impl FromIterator<StatementKey> for StatedSet {
    fn from_iter<I: IntoIterator<Item = StatementKey>>(iter: I) -> Self {
        StatedSet {
            keys: BTreeSet::from_iter(iter),
            version: 0,
        }
    }
}

impl<'a> FromIterator<&'a Statement> for StatedSet {
    fn from_iter<I: IntoIterator<Item = &'a Statement>>(iter: I) -> Self {
        StatedSet::from_iter(iter.into_iter().map(Statement::key))
    }
}
