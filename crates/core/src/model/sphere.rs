use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SphereError {
    #[error("unknown sphere key: {key}")]
    UnknownSphere { key: String },

    #[error("sphere catalog cannot be empty")]
    EmptyCatalog,

    #[error("too many focus spheres: {len} (at most 2)")]
    TooManyFocusSpheres { len: usize },

    #[error("duplicate focus sphere: {key}")]
    DuplicateFocusSphere { key: String },
}

//
// ─── SPHERE KEY ───────────────────────────────────────────────────────────────
//

/// Validated identifier of a life sphere.
///
/// Keys are only constructed through a [`SphereCatalog`], so an unknown key
/// coming off the wire is rejected at the boundary instead of being carried
/// around as a loose string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SphereKey(String);

impl SphereKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SphereKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SphereKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//
// ─── SPHERE CATALOG ───────────────────────────────────────────────────────────
//

/// The sphere keys the product knows about.
const DEFAULT_SPHERE_KEYS: [&str; 6] = [
    "health",
    "relationships",
    "money",
    "energy",
    "career",
    "other",
];

/// The authoritative set of sphere identifiers.
///
/// Built once, either from the compiled-in default list or from the sphere
/// inventory fetched from the backend, and used to validate every sphere key
/// crossing into the domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SphereCatalog {
    keys: BTreeSet<String>,
}

impl SphereCatalog {
    /// Catalog of the built-in sphere keys.
    #[must_use]
    pub fn default_catalog() -> Self {
        Self {
            keys: DEFAULT_SPHERE_KEYS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Build a catalog from a fetched sphere inventory.
    ///
    /// Keys are trimmed; duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns `SphereError::EmptyCatalog` if no non-empty keys remain.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, SphereError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: BTreeSet<String> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(SphereError::EmptyCatalog);
        }
        Ok(Self { keys })
    }

    /// Validate a raw key against the catalog.
    ///
    /// # Errors
    ///
    /// Returns `SphereError::UnknownSphere` if the key is not in the catalog.
    pub fn key(&self, raw: &str) -> Result<SphereKey, SphereError> {
        let trimmed = raw.trim();
        if self.keys.contains(trimmed) {
            Ok(SphereKey(trimmed.to_string()))
        } else {
            Err(SphereError::UnknownSphere {
                key: raw.to_string(),
            })
        }
    }

    #[must_use]
    pub fn contains(&self, raw: &str) -> bool {
        self.keys.contains(raw.trim())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for SphereCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

//
// ─── FOCUS SPHERES ────────────────────────────────────────────────────────────
//

/// The ordered set of spheres the user is actively working on.
///
/// Holds at most two entries; index 0 is the primary sphere. An empty set is
/// a tolerated misconfiguration: the flow then requests questions without a
/// sphere filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FocusSpheres {
    spheres: Vec<SphereKey>,
}

impl FocusSpheres {
    /// Create a focus set from already-validated keys.
    ///
    /// # Errors
    ///
    /// Returns `SphereError::TooManyFocusSpheres` for more than two entries
    /// and `SphereError::DuplicateFocusSphere` for repeated keys.
    pub fn new(spheres: Vec<SphereKey>) -> Result<Self, SphereError> {
        if spheres.len() > 2 {
            return Err(SphereError::TooManyFocusSpheres {
                len: spheres.len(),
            });
        }
        if spheres.len() == 2 && spheres[0] == spheres[1] {
            return Err(SphereError::DuplicateFocusSphere {
                key: spheres[0].to_string(),
            });
        }
        Ok(Self { spheres })
    }

    /// An empty focus set (degraded mode: no sphere filter).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// True when two spheres are configured and skip/not-understood actions
    /// can advance to the second one.
    #[must_use]
    pub fn is_pair(&self) -> bool {
        self.spheres.len() == 2
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SphereKey> {
        self.spheres.get(index)
    }

    #[must_use]
    pub fn primary(&self) -> Option<&SphereKey> {
        self.spheres.first()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SphereKey] {
        &self.spheres
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_accepts_known_keys() {
        let catalog = SphereCatalog::default_catalog();
        let key = catalog.key("career").unwrap();
        assert_eq!(key.as_str(), "career");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let catalog = SphereCatalog::default_catalog();
        let err = catalog.key("astrology").unwrap_err();
        assert!(matches!(err, SphereError::UnknownSphere { .. }));
    }

    #[test]
    fn key_is_trimmed_before_lookup() {
        let catalog = SphereCatalog::default_catalog();
        let key = catalog.key(" money ").unwrap();
        assert_eq!(key.as_str(), "money");
    }

    #[test]
    fn catalog_from_fetched_keys() {
        let catalog = SphereCatalog::from_keys(["health", "focus"]).unwrap();
        assert!(catalog.contains("focus"));
        assert!(!catalog.contains("career"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let err = SphereCatalog::from_keys(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, SphereError::EmptyCatalog));
    }

    #[test]
    fn focus_set_caps_at_two() {
        let catalog = SphereCatalog::default_catalog();
        let keys = vec![
            catalog.key("health").unwrap(),
            catalog.key("money").unwrap(),
            catalog.key("career").unwrap(),
        ];
        let err = FocusSpheres::new(keys).unwrap_err();
        assert!(matches!(err, SphereError::TooManyFocusSpheres { len: 3 }));
    }

    #[test]
    fn focus_set_rejects_duplicates() {
        let catalog = SphereCatalog::default_catalog();
        let keys = vec![catalog.key("health").unwrap(), catalog.key("health").unwrap()];
        let err = FocusSpheres::new(keys).unwrap_err();
        assert!(matches!(err, SphereError::DuplicateFocusSphere { .. }));
    }

    #[test]
    fn empty_focus_set_is_allowed() {
        let focus = FocusSpheres::none();
        assert!(focus.is_empty());
        assert!(focus.primary().is_none());
    }

    #[test]
    fn order_is_preserved() {
        let catalog = SphereCatalog::default_catalog();
        let focus = FocusSpheres::new(vec![
            catalog.key("career").unwrap(),
            catalog.key("money").unwrap(),
        ])
        .unwrap();
        assert_eq!(focus.primary().unwrap().as_str(), "career");
        assert_eq!(focus.get(1).unwrap().as_str(), "money");
        assert!(focus.is_pair());
    }
}
