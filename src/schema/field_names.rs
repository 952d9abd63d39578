//! Header validation: every header cell must be usable as a column identifier.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FieldNameProblem, LoadError, LoadResult};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}_]+$").expect("hardcoded regex pattern"));

/// Identifier rules imposed by a destination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNameRules {
    /// Longest accepted name, in characters.
    pub max_length: usize,
    /// Whether `Place` and `place` are different columns in the store.
    pub case_sensitive: bool,
}

impl Default for FieldNameRules {
    fn default() -> Self {
        Self {
            max_length: 63,
            case_sensitive: true,
        }
    }
}

impl FieldNameRules {
    fn is_valid(&self, name: &str) -> bool {
        !name.is_empty()
            && !name.starts_with('_')
            && name.chars().count() <= self.max_length
            && IDENTIFIER.is_match(name)
            && !name.chars().all(char::is_numeric)
    }

    fn collision_key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }
}

/// A header whose names all passed [`validate_header`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedHeader {
    names: Vec<String>,
}

impl ValidatedHeader {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Checks every header cell, failing on the first invalid or duplicate name.
pub fn validate_header(header: &[String], rules: &FieldNameRules) -> LoadResult<ValidatedHeader> {
    let mut seen: HashSet<String> = HashSet::with_capacity(header.len());
    for name in header {
        if !rules.is_valid(name) {
            return Err(LoadError::FieldName {
                name: name.clone(),
                problem: FieldNameProblem::Invalid,
            });
        }
        if !seen.insert(rules.collision_key(name)) {
            return Err(LoadError::FieldName {
                name: name.clone(),
                problem: FieldNameProblem::Duplicate,
            });
        }
    }
    Ok(ValidatedHeader {
        names: header.to_vec(),
    })
}
