use std::sync::Arc;

use log::{debug, warn};
use t3_object::Value;

use super::{BifContext, BifDesc, FunctionSet, FunctionSetCatalog, Lookup, is_valid_set_id, split_version};
use crate::config::LinkMode;
use crate::error::VmError;

/// Slots added per reallocation when an image declares sets one at a time.
const GROWTH_INCREMENT: usize = 5;

/// Per-image function set table.
///
/// Slot `i` holds the set the image declared at index `i`, or `None` while
/// that set is unresolved. `names` keeps every declared identifier, resolved
/// or not, so calls into an unresolved set can still name it.
pub struct BifTable {
    catalog: FunctionSetCatalog,
    mode: LinkMode,
    table: Vec<Option<Arc<FunctionSet>>>,
    names: Vec<String>,
    alloc: usize,
}

impl BifTable {
    pub fn new(catalog: FunctionSetCatalog, mode: LinkMode, initial_capacity: usize) -> Self {
        Self {
            catalog,
            mode,
            table: Vec::with_capacity(initial_capacity),
            names: Vec::with_capacity(initial_capacity),
            alloc: initial_capacity,
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.table.len()
    }

    /// Reserved slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.alloc
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    pub fn catalog(&self) -> &FunctionSetCatalog {
        &self.catalog
    }

    /// Detaches every linked set and forgets all entries. The reserved
    /// capacity is kept for the next image.
    pub fn clear(&mut self) {
        for (idx, entry) in self.table.iter().enumerate() {
            if let Some(set) = entry {
                if let Some(detach) = set.detach {
                    detach(set, idx as u16);
                }
            }
        }
        debug!("cleared function set table ({} entries)", self.table.len());
        self.table.clear();
        self.names.clear();
    }

    /// Makes room for `entries` slots. When the reserve runs out it grows by
    /// `increment`, or straight to `entries` if that is still too small.
    pub fn ensure_space(&mut self, entries: usize, increment: usize) {
        if entries < self.alloc {
            return;
        }
        self.alloc = (self.alloc + increment).max(entries);
        self.table.reserve(self.alloc - self.table.len());
        self.names.reserve(self.alloc - self.names.len());
    }

    /// Links the next declared set.
    ///
    /// An identifier whose name matches a catalog set that is older than
    /// requested fails in every mode. An unknown identifier fails in
    /// [`LinkMode::Strict`]; in [`LinkMode::Late`] it leaves an unresolved
    /// slot and the failure is deferred to the first call.
    pub fn add_entry(&mut self, set_id: &str) -> Result<u16, VmError> {
        if !is_valid_set_id(set_id) {
            return Err(VmError::InvalidFuncSetId { id: set_id.to_string() });
        }
        // Set indices are u16 in the image, so the table holds at most 65536.
        let idx = u16::try_from(self.table.len()).map_err(|_| VmError::TooManyFuncSets(self.table.len()))?;
        self.ensure_space(self.count() + 1, GROWTH_INCREMENT);

        match self.catalog.find(set_id) {
            Lookup::Found(set) => Ok(self.push_resolved(idx, set_id, set)),
            Lookup::TooOld { available } => Err(VmError::FuncSetTooOld {
                requested: set_id.to_string(),
                available,
            }),
            Lookup::Missing => self.add_entry_unresolved(idx, set_id),
        }
    }

    fn push_resolved(&mut self, idx: u16, set_id: &str, set: Arc<FunctionSet>) -> u16 {
        debug!("linked function set {set_id} at index {idx} as {}", set.id);
        if let Some(attach) = set.attach {
            attach(&set, idx);
        }
        self.table.push(Some(set));
        self.names.push(set_id.to_string());
        idx
    }

    fn add_entry_unresolved(&mut self, idx: u16, set_id: &str) -> Result<u16, VmError> {
        match self.mode {
            LinkMode::Strict => Err(VmError::UnknownFuncSet { name: set_id.to_string() }),
            LinkMode::Late => {
                warn!("function set {set_id} is not available; calls into index {idx} will fail");
                self.table.push(None);
                self.names.push(set_id.to_string());
                Ok(idx)
            }
        }
    }

    /// Retries every unresolved slot against the catalog. Returns how many
    /// slots became resolved.
    pub fn resolve_pending(&mut self) -> usize {
        let mut resolved = 0;
        for idx in 0..self.table.len() {
            if self.table[idx].is_some() {
                continue;
            }
            if let Lookup::Found(set) = self.catalog.find(&self.names[idx]) {
                debug!("late-linked function set {} at index {idx}", self.names[idx]);
                if let Some(attach) = set.attach {
                    attach(&set, idx as u16);
                }
                self.table[idx] = Some(set);
                resolved += 1;
            }
        }
        resolved
    }

    /// Invokes intrinsic `func_idx` of set `set_idx` with `argc` arguments
    /// on the stack. Argument counts are checked by the intrinsic itself.
    pub fn call_func(&self, ctx: &mut BifContext<'_>, set_idx: u16, func_idx: u16, argc: u32) -> Result<(), VmError> {
        let set = match self.table.get(set_idx as usize) {
            Some(Some(set)) => set,
            Some(None) => {
                return Err(VmError::UnknownFuncSet {
                    name: self.names[set_idx as usize].clone(),
                });
            }
            None => {
                return Err(VmError::UnknownFuncSet {
                    name: format!("#{set_idx}"),
                });
            }
        };

        let func = set.get(func_idx).and_then(|d| d.func).ok_or_else(|| VmError::UnavailIntrinsic {
            set: self.names[set_idx as usize].clone(),
            index: func_idx,
        })?;
        func(ctx, argc)
    }

    /// Descriptor of a callable intrinsic. Never fails loudly: out-of-range
    /// indices, unresolved sets and unavailable slots all give `None`.
    pub fn get_desc(&self, set_idx: u16, func_idx: u16) -> Option<&BifDesc> {
        self.get_entry(set_idx)?
            .get(func_idx)
            .filter(|d| d.is_available())
    }

    /// Whether `(set_idx, func_idx)` names a callable intrinsic.
    pub fn validate_entry(&self, set_idx: u16, func_idx: u16) -> bool {
        self.get_desc(set_idx, func_idx).is_some()
    }

    pub fn get_entry(&self, set_idx: u16) -> Option<&FunctionSet> {
        self.table.get(set_idx as usize)?.as_deref()
    }

    /// The linked set matching `id`. A set linked in an older version than
    /// requested counts as absent.
    pub fn get_entry_by_name(&self, id: &str) -> Option<(u16, &FunctionSet)> {
        let (name, version) = split_version(id);
        let idx = self
            .names
            .iter()
            .position(|n| split_version(n).0 == name)?;
        if version > split_version(&self.names[idx]).1 {
            return None;
        }
        self.get_entry(idx as u16).map(|set| (idx as u16, set))
    }

    /// Identifier the image declared at `set_idx`.
    pub fn set_name(&self, set_idx: u16) -> Option<&str> {
        self.names.get(set_idx as usize).map(String::as_str)
    }

    pub fn is_resolved(&self, set_idx: u16) -> bool {
        self.get_entry(set_idx).is_some()
    }

    /// Function pointer value for an intrinsic.
    pub fn bifptr(set_idx: u16, func_idx: u16) -> Value {
        Value::BifPtr { set_idx, func_idx }
    }
}

impl core::fmt::Debug for BifTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BifTable")
            .field("mode", &self.mode)
            .field("names", &self.names)
            .field("resolved", &self.table.iter().map(Option::is_some).collect::<Vec<_>>())
            .finish()
    }
}
