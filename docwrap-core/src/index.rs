//! Validation and translation of secondary index requests.
//!
//! The engine owns index storage and decides when to use an index during query
//! execution. This module only checks names and turns a path list into an
//! [`IndexSpec`].

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::attribute_path,
};

/// The generic index-naming keyword; index names may not equal it, ignoring case.
pub const RESERVED_INDEX_KEYWORD: &str = "index";

/// One indexed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexItem {
    pub path: String,
}

/// A named, ordered index definition, one item per path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub items: Vec<IndexItem>,
}

impl IndexSpec {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.path.as_str())
    }
}

/// Validates index names and builds index specifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexManager;

impl IndexManager {
    /// Checks that `name` can be used as an index name.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIndexName`] if the name is empty or equals
    /// [`RESERVED_INDEX_KEYWORD`] case-insensitively.
    pub fn validate_name(name: &str) -> DocumentStoreResult<()> {
        if name.trim().is_empty() {
            return Err(DocumentStoreError::InvalidIndexName(
                "index name must not be empty".to_string(),
            ));
        }

        if name.eq_ignore_ascii_case(RESERVED_INDEX_KEYWORD) {
            return Err(DocumentStoreError::InvalidIndexName(format!(
                "`{name}` is reserved"
            )));
        }

        Ok(())
    }

    /// Validates `name` and builds a spec with one item per path.
    ///
    /// Bare attribute names are qualified with `attributes.`, so `["name"]` indexes
    /// `attributes.name` inside every stored record.
    pub fn prepare<I, P>(name: &str, paths: I) -> DocumentStoreResult<IndexSpec>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self::validate_name(name)?;

        Ok(IndexSpec {
            name: name.to_string(),
            items: paths
                .into_iter()
                .map(|path| IndexItem { path: attribute_path(path.as_ref()) })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keyword_rejected_case_insensitively() {
        for name in ["index", "Index", "INDEX", "iNdEx"] {
            let err = IndexManager::prepare(name, ["type", "name"]).unwrap_err();
            assert!(matches!(err, DocumentStoreError::InvalidIndexName(_)), "{name}");
        }
    }

    #[test]
    fn test_names_containing_keyword_allowed() {
        let spec = IndexManager::prepare("TestIndex", ["type", "name"]).unwrap();

        assert_eq!(spec.name, "TestIndex");
        assert_eq!(spec.paths().collect::<Vec<_>>(), ["attributes.type", "attributes.name"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(IndexManager::prepare("  ", ["name"]).is_err());
    }

    #[test]
    fn test_qualified_paths_untouched() {
        let spec = IndexManager::prepare("ByName", ["attributes.name"]).unwrap();
        assert_eq!(spec.items, vec![IndexItem { path: "attributes.name".into() }]);
    }
}
