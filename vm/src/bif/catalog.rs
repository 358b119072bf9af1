use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use super::{FunctionSet, split_version};

/// Outcome of looking a set identifier up in the catalog.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Arc<FunctionSet>),
    /// The name is known, but only in versions older than requested.
    TooOld { available: String },
    Missing,
}

struct CatalogImpl {
    sets: Vec<Arc<FunctionSet>>,
}

impl CatalogImpl {
    fn register(&mut self, set: FunctionSet) -> Arc<FunctionSet> {
        let set = Arc::new(set);
        match self.sets.iter_mut().find(|s| s.id == set.id) {
            Some(slot) => *slot = set.clone(),
            None => self.sets.push(set.clone()),
        }
        set
    }

    fn find(&self, id: &str) -> Lookup {
        let (name, version) = split_version(id);
        let mut newest: Option<&Arc<FunctionSet>> = None;
        for set in self.sets.iter().filter(|s| s.name() == name) {
            if version <= set.version() {
                return Lookup::Found(set.clone());
            }
            if newest.is_none_or(|n| n.version() < set.version()) {
                newest = Some(set);
            }
        }
        match newest {
            Some(set) => Lookup::TooOld {
                available: set.id.clone(),
            },
            None => Lookup::Missing,
        }
    }
}

/// Registry of the function sets this VM provides, shared by every table
/// linked against it. Hosts may add sets while images are loaded; tables
/// pick them up through [`BifTable::resolve_pending`](super::BifTable::resolve_pending).
#[derive(Clone)]
pub struct FunctionSetCatalog(Arc<RwLock<CatalogImpl>>);

impl FunctionSetCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(CatalogImpl { sets: Vec::new() })))
    }

    /// A catalog holding the sets built into this VM.
    pub fn with_defaults() -> Self {
        let catalog = Self::new();
        for set in default_sets() {
            catalog.register(set);
        }
        catalog
    }

    /// Adds `set`, replacing any set with the same identifier.
    pub fn register(&self, set: FunctionSet) -> Arc<FunctionSet> {
        debug!("registering function set {} ({} functions)", set.id, set.funcs.len());
        self.0.write().register(set)
    }

    /// Looks up a possibly versioned identifier. A set matches when its
    /// name is equal and its version is at least the requested one.
    pub fn find(&self, id: &str) -> Lookup {
        self.0.read().find(id)
    }

    pub fn sets(&self) -> Vec<Arc<FunctionSet>> {
        self.0.read().sets.clone()
    }

    pub fn len(&self) -> usize {
        self.0.read().sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().sets.is_empty()
    }
}

impl Default for FunctionSetCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl core::fmt::Debug for FunctionSetCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let ids: Vec<String> = self.0.read().sets.iter().map(|s| s.id.clone()).collect();
        f.debug_tuple("FunctionSetCatalog").field(&ids).finish()
    }
}

pub fn default_sets() -> Vec<FunctionSet> {
    vec![super::t3::function_set(), super::tads_gen::function_set()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bif::BifDesc;

    fn set(id: &str) -> FunctionSet {
        FunctionSet::new(id, vec![])
    }

    #[test]
    fn defaults_are_registered() {
        let c = FunctionSetCatalog::with_defaults();
        assert_eq!(c.len(), 2);
        assert!(matches!(c.find("t3vm/010006"), Lookup::Found(_)));
        assert!(matches!(c.find("tads-gen/030008"), Lookup::Found(_)));
        assert!(matches!(c.find("tads-gen"), Lookup::Found(_)));
    }

    #[test]
    fn older_request_matches_newer_set() {
        let c = FunctionSetCatalog::new();
        c.register(set("demo/010005"));
        match c.find("demo/010002") {
            Lookup::Found(s) => assert_eq!(s.id, "demo/010005"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn newer_request_is_too_old() {
        let c = FunctionSetCatalog::new();
        c.register(set("demo/010002"));
        c.register(set("demo/010004"));
        match c.find("demo/010009") {
            Lookup::TooOld { available } => assert_eq!(available, "demo/010004"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn names_match_exactly() {
        let c = FunctionSetCatalog::new();
        c.register(set("demo/010000"));
        assert!(matches!(c.find("dem/010000"), Lookup::Missing));
        assert!(matches!(c.find("demo-x/010000"), Lookup::Missing));
    }

    #[test]
    fn register_replaces_same_id() {
        let c = FunctionSetCatalog::new();
        c.register(set("demo/010000"));
        c.register(FunctionSet::new("demo/010000", vec![BifDesc::unavailable("f", 0, 0, false)]));
        assert_eq!(c.len(), 1);
        match c.find("demo") {
            Lookup::Found(s) => assert_eq!(s.funcs.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clones_share_state() {
        let a = FunctionSetCatalog::new();
        let b = a.clone();
        a.register(set("late/010000"));
        assert!(matches!(b.find("late/010000"), Lookup::Found(_)));
    }
}
