// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Concept keys and the concept set accumulated during extraction

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// A short canonical phrase naming one unit of knowledge.
///
/// Concepts are trimmed on construction and compared byte-for-byte; two
/// phrases that differ only in surrounding whitespace are the same concept.
/// Deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Concept(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("concept name is blank")]
pub struct BlankConcept;

impl Concept {
    /// Create a concept from raw text, returning `None` if nothing remains
    /// after trimming.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Concept {
    type Error = BlankConcept;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Concept::new(raw).ok_or(BlankConcept)
    }
}

impl From<Concept> for String {
    fn from(concept: Concept) -> Self {
        concept.0
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Concept {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Concept {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Set of unique concepts collected across extraction batches.
///
/// Iteration is always lexicographic so that anything built from the set
/// (prompts, logs) is reproducible regardless of the order batches finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSet {
    concepts: BTreeSet<Concept>,
}

impl ConceptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw phrase. Returns `true` if it was new.
    pub fn insert(&mut self, raw: impl AsRef<str>) -> bool {
        match Concept::new(raw) {
            Some(concept) => self.concepts.insert(concept),
            None => false,
        }
    }

    /// Union another set into this one, returning how many were new.
    pub fn union_with(&mut self, other: ConceptSet) -> usize {
        let before = self.concepts.len();
        self.concepts.extend(other.concepts);
        self.concepts.len() - before
    }

    pub fn contains(&self, concept: &str) -> bool {
        self.concepts.contains(concept)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Iterate in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.iter()
    }

    pub fn into_sorted_vec(self) -> Vec<Concept> {
        self.concepts.into_iter().collect()
    }
}

impl FromIterator<Concept> for ConceptSet {
    fn from_iter<I: IntoIterator<Item = Concept>>(iter: I) -> Self {
        Self {
            concepts: iter.into_iter().collect(),
        }
    }
}

impl Extend<Concept> for ConceptSet {
    fn extend<I: IntoIterator<Item = Concept>>(&mut self, iter: I) {
        self.concepts.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_trims_and_rejects_blank() {
        assert_eq!(Concept::new("  Energy \n").unwrap().as_str(), "Energy");
        assert!(Concept::new("   ").is_none());
        assert!(Concept::new("").is_none());
    }

    #[test]
    fn test_deserialize_trims_and_rejects_blank() {
        let concept: Concept = serde_json::from_str("\" Mass \"").unwrap();
        assert_eq!(concept.as_str(), "Mass");
        assert!(serde_json::from_str::<Concept>("\"  \"").is_err());
        assert_eq!(serde_json::to_string(&concept).unwrap(), "\"Mass\"");
    }

    #[test]
    fn test_concept_set_dedupes_after_trimming() {
        let mut set = ConceptSet::new();
        assert!(set.insert("Work"));
        assert!(!set.insert("  Work  "));
        assert!(!set.insert(""));
        // Case differs, so this is a different concept
        assert!(set.insert("work"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_concept_set_iterates_sorted() {
        let mut set = ConceptSet::new();
        for raw in ["Power", "Energy", "Work"] {
            set.insert(raw);
        }
        let names: Vec<&str> = set.iter().map(Concept::as_str).collect();
        assert_eq!(names, vec!["Energy", "Power", "Work"]);
    }

    #[test]
    fn test_union_counts_new_members() {
        let mut a: ConceptSet = ["Mass", "Force"].iter().filter_map(Concept::new).collect();
        let b: ConceptSet = ["Force", "Acceleration"]
            .iter()
            .filter_map(Concept::new)
            .collect();
        assert_eq!(a.union_with(b), 1);
        assert_eq!(a.len(), 3);
    }
}
