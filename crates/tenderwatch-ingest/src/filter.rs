//! Order filter (filter.json)
//!
//! Five named regex pattern sets drop uninteresting orders from a batch:
//! `All` is matched against the order name, OKDP, OKPD and organisation
//! name; the other sets are matched against their own field only.
//!
//! Pattern sets read from disk are repaired before use: invalid and
//! duplicate patterns are removed and reported.

use crate::order::Order;
use crate::store::write_atomic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Error Types
// ============================================================================

/// Problem with one pattern of a set
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Invalid pattern #{index} '{pattern}': {reason}")]
    Invalid {
        index: usize,
        pattern: String,
        reason: String,
    },

    #[error("Duplicate pattern #{index} '{pattern}'")]
    Duplicate { index: usize, pattern: String },
}

impl PatternError {
    pub fn index(&self) -> usize {
        match self {
            PatternError::Invalid { index, .. } | PatternError::Duplicate { index, .. } => *index,
        }
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pattern set {set}: {source}")]
    Pattern {
        set: PatternSetName,
        #[source]
        source: PatternError,
    },
}

// ============================================================================
// Pattern Sets
// ============================================================================

/// Ordered list of textual regex patterns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternSet(Vec<String>);

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(patterns.into_iter().map(Into::into).collect())
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, pattern: impl Into<String>) {
        self.0.push(pattern.into());
    }

    /// Report the first problem in the set
    ///
    /// Patterns are checked in order. For each one the compile check comes
    /// first, then a scan for another copy of it; a duplicate is reported
    /// at the index of the copy.
    pub fn verify(&self) -> Result<(), PatternError> {
        for (i, pattern) in self.0.iter().enumerate() {
            if let Err(e) = Regex::new(pattern) {
                return Err(PatternError::Invalid {
                    index: i,
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
            if let Some(j) = self
                .0
                .iter()
                .enumerate()
                .position(|(j, other)| j != i && other == pattern)
            {
                return Err(PatternError::Duplicate {
                    index: j,
                    pattern: pattern.clone(),
                });
            }
        }
        Ok(())
    }

    /// Remove offending patterns until the set verifies; returns what was
    /// removed
    pub fn clear(&mut self) -> Vec<PatternError> {
        let mut removed = Vec::new();
        while let Err(issue) = self.verify() {
            self.0.remove(issue.index());
            removed.push(issue);
        }
        removed
    }

    pub fn compile(&self) -> Result<CompiledPatternSet, PatternError> {
        self.verify()?;
        self.0
            .iter()
            .enumerate()
            .map(|(index, pattern)| {
                Regex::new(pattern).map_err(|e| PatternError::Invalid {
                    index,
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(CompiledPatternSet)
    }
}

/// Compiled matchers, positionally matching their PatternSet
#[derive(Debug, Clone, Default)]
pub struct CompiledPatternSet(Vec<Regex>);

impl CompiledPatternSet {
    pub fn is_match(&self, text: &str) -> bool {
        self.0.iter().any(|re| re.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Name of a pattern set, as used for the filter file keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSetName {
    All,
    OrderName,
    Okdp,
    Okpd,
    OrganisationName,
}

impl PatternSetName {
    pub const ALL: [PatternSetName; 5] = [
        PatternSetName::All,
        PatternSetName::OrderName,
        PatternSetName::Okdp,
        PatternSetName::Okpd,
        PatternSetName::OrganisationName,
    ];
}

impl fmt::Display for PatternSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatternSetName::All => "All",
            PatternSetName::OrderName => "OrderName",
            PatternSetName::Okdp => "OKDP",
            PatternSetName::Okpd => "OKPD",
            PatternSetName::OrganisationName => "OrganisationName",
        })
    }
}

// ============================================================================
// Filter Definitions (file format)
// ============================================================================

/// The pattern sets as stored in the filter file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefinitions {
    #[serde(rename = "All", default)]
    pub all: PatternSet,

    #[serde(rename = "OrderName", default)]
    pub order_name: PatternSet,

    #[serde(rename = "OKDP", default)]
    pub okdp: PatternSet,

    #[serde(rename = "OKPD", default)]
    pub okpd: PatternSet,

    #[serde(rename = "OrganisationName", default)]
    pub organisation_name: PatternSet,
}

impl FilterDefinitions {
    /// Load definitions as written; a missing or empty file gives empty sets
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No filter file, filtering disabled");
                return Ok(Self::default());
            },
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Write definitions atomically through a temporary file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FilterError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(path, content)?;
        Ok(())
    }

    pub fn set(&self, name: PatternSetName) -> &PatternSet {
        match name {
            PatternSetName::All => &self.all,
            PatternSetName::OrderName => &self.order_name,
            PatternSetName::Okdp => &self.okdp,
            PatternSetName::Okpd => &self.okpd,
            PatternSetName::OrganisationName => &self.organisation_name,
        }
    }

    pub fn set_mut(&mut self, name: PatternSetName) -> &mut PatternSet {
        match name {
            PatternSetName::All => &mut self.all,
            PatternSetName::OrderName => &mut self.order_name,
            PatternSetName::Okdp => &mut self.okdp,
            PatternSetName::Okpd => &mut self.okpd,
            PatternSetName::OrganisationName => &mut self.organisation_name,
        }
    }

    /// First problem of every set that has one
    pub fn verify(&self) -> Vec<(PatternSetName, PatternError)> {
        PatternSetName::ALL
            .iter()
            .filter_map(|&name| self.set(name).verify().err().map(|e| (name, e)))
            .collect()
    }

    /// Repair every set, returning the removed patterns
    pub fn clear(&mut self) -> Vec<(PatternSetName, PatternError)> {
        PatternSetName::ALL
            .iter()
            .flat_map(|&name| {
                self.set_mut(name)
                    .clear()
                    .into_iter()
                    .map(move |issue| (name, issue))
            })
            .collect()
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Compiled filter ready to run over order batches
#[derive(Debug, Clone, Default)]
pub struct Filter {
    all: CompiledPatternSet,
    order_name: CompiledPatternSet,
    okdp: CompiledPatternSet,
    okpd: CompiledPatternSet,
    organisation_name: CompiledPatternSet,
}

impl Filter {
    /// Compile definitions; sets must already verify
    pub fn compile(definitions: &FilterDefinitions) -> Result<Self, FilterError> {
        let compile = |name: PatternSetName| {
            definitions
                .set(name)
                .compile()
                .map_err(|source| FilterError::Pattern { set: name, source })
        };

        Ok(Self {
            all: compile(PatternSetName::All)?,
            order_name: compile(PatternSetName::OrderName)?,
            okdp: compile(PatternSetName::Okdp)?,
            okpd: compile(PatternSetName::Okpd)?,
            organisation_name: compile(PatternSetName::OrganisationName)?,
        })
    }

    /// Load, repair and compile the filter file
    ///
    /// Patterns removed by the repair are logged; a missing file gives a
    /// filter that keeps everything.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let path = path.as_ref();
        let mut definitions = FilterDefinitions::load(path)?;
        for (set, issue) in definitions.clear() {
            warn!(file = %path.display(), set = %set, "Removed pattern: {}", issue);
        }

        let filter = Self::compile(&definitions)?;
        info!(file = %path.display(), patterns = filter.pattern_count(), "Filter loaded");
        Ok(filter)
    }

    pub fn pattern_count(&self) -> usize {
        self.all.len()
            + self.order_name.len()
            + self.okdp.len()
            + self.okpd.len()
            + self.organisation_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count() == 0
    }

    /// Drop matching orders; returns the survivors in their original order
    /// and the fraction of the batch that was removed
    pub fn execute(&self, orders: Vec<Order>) -> (Vec<Order>, f32) {
        let total = orders.len();
        if total == 0 {
            return (orders, 0.0);
        }

        let kept: Vec<Order> = orders
            .into_iter()
            .filter(|order| {
                !(self.all.is_match(&order.order_name)
                    || self.all.is_match(&order.okdp)
                    || self.all.is_match(&order.okpd)
                    || self.all.is_match(&order.organisation_name))
            })
            .filter(|order| !self.order_name.is_match(&order.order_name))
            .filter(|order| !self.okdp.is_match(&order.okdp))
            .filter(|order| !self.okpd.is_match(&order.okpd))
            .filter(|order| !self.organisation_name.is_match(&order.organisation_name))
            .collect();

        let removed = 1.0 - kept.len() as f32 / total as f32;
        debug!(total, kept = kept.len(), "Filter applied");
        (kept, removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verify_clean_set() {
        assert_eq!(PatternSet::new(["бумаг", "^ООО"]).verify(), Ok(()));
        assert_eq!(PatternSet::default().verify(), Ok(()));
    }

    #[test]
    fn test_verify_reports_later_duplicate() {
        let err = PatternSet::new(["a", "b", "a"]).verify().unwrap_err();
        assert_eq!(
            err,
            PatternError::Duplicate {
                index: 2,
                pattern: "a".to_string()
            }
        );
    }

    #[test]
    fn test_verify_checks_compile_before_duplicates() {
        let err = PatternSet::new(["(", "("]).verify().unwrap_err();
        assert!(matches!(err, PatternError::Invalid { index: 0, .. }));
    }

    #[test]
    fn test_clear_removes_duplicates_and_invalid() {
        let mut set = PatternSet::new(["foo", "foo", "[invalid"]);
        let removed = set.clear();
        assert_eq!(set, PatternSet::new(["foo"]));
        assert_eq!(removed.len(), 2);
        assert!(matches!(removed[0], PatternError::Duplicate { index: 1, .. }));
        assert!(matches!(removed[1], PatternError::Invalid { index: 1, .. }));
    }

    #[test]
    fn test_compile_rejects_unrepaired_set() {
        assert!(PatternSet::new(["x", "x"]).compile().is_err());
        assert_eq!(PatternSet::new(["x", "y"]).compile().unwrap().len(), 2);
    }

    #[test]
    fn test_definitions_missing_keys_default_empty() {
        let defs: FilterDefinitions = serde_json::from_str(r#"{"OKDP": ["^21"]}"#).unwrap();
        assert_eq!(defs.okdp, PatternSet::new(["^21"]));
        assert!(defs.all.is_empty());
        assert!(defs.organisation_name.is_empty());
    }

    #[test]
    fn test_definitions_serialize_file_keys() {
        let json = serde_json::to_value(FilterDefinitions::default()).unwrap();
        for name in PatternSetName::ALL {
            assert!(json.get(name.to_string()).is_some(), "missing key {}", name);
        }
    }

    #[test]
    fn test_load_missing_file_filters_nothing() {
        let dir = TempDir::new().unwrap();
        let filter = Filter::load(dir.path().join("filter.json")).unwrap();
        assert!(filter.is_empty());
        let (kept, removed) = filter.execute(Vec::new());
        assert!(kept.is_empty());
        assert_eq!(removed, 0.0);
    }

    #[test]
    fn test_load_repairs_patterns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filter.json");
        std::fs::write(&path, r#"{"All": ["foo", "foo", "[invalid"], "OKPD": ["^17"]}"#).unwrap();

        let filter = Filter::load(&path).unwrap();
        assert_eq!(filter.pattern_count(), 2);
    }

    #[test]
    fn test_save_and_load_definitions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filter.json");
        let mut defs = FilterDefinitions::default();
        defs.order_name.push("ремонт");

        defs.save(&path).unwrap();
        assert_eq!(FilterDefinitions::load(&path).unwrap(), defs);
        assert!(!dir.path().join("filter.json.tmp").exists());
    }

    #[test]
    fn test_definitions_verify_lists_each_broken_set() {
        let defs = FilterDefinitions {
            all: PatternSet::new(["a", "a"]),
            okpd: PatternSet::new(["("]),
            ..Default::default()
        };
        let issues = defs.verify();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].0, PatternSetName::All);
        assert_eq!(issues[1].0, PatternSetName::Okpd);
    }
}
