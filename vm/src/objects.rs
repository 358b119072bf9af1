//! Minimal object store: the object-system surface call resolution needs.

use std::collections::HashMap;

use log::debug;
use t3_bytecode::reader::try_read_u32;
use t3_object::{CodeAddr, ObjectId, StringFactory, Value};

/// Length of the owner-id prefix stored ahead of a dynamic function's header.
pub const DYNFUNC_PREFIX_LEN: usize = 4;

/// Object system hooks consulted while resolving calls.
pub trait ObjectTable {
    /// The value calls on `id` are forwarded to, if the object is invokable.
    fn get_invoker(&self, id: ObjectId) -> Option<Value>;

    /// Method header bytes owned by an object, starting at `addr`.
    fn code_at(&self, addr: CodeAddr) -> Option<&[u8]>;

    /// Owner of the dynamic function whose header starts at `addr`.
    fn dynfunc_from_prefix(&self, addr: CodeAddr) -> Option<ObjectId>;
}

#[derive(Debug, Clone)]
pub enum Object {
    Plain,
    /// Forwards calls to `invoker`.
    Invokable { invoker: Value },
    /// A function compiled at run time.
    ///
    /// `code` is the owner-id prefix followed by a method image.
    DynamicFunc { code: Box<[u8]> },
    Str(String),
}

/// Owns every object created during a session, keyed by id.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectId, Object>,
    next_id: u32,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> ObjectId {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = ObjectId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn insert(&mut self, obj: Object) -> ObjectId {
        let id = self.alloc_id();
        self.objects.insert(id, obj);
        id
    }

    pub fn new_plain(&mut self) -> ObjectId {
        self.insert(Object::Plain)
    }

    pub fn new_invokable(&mut self, invoker: Value) -> ObjectId {
        self.insert(Object::Invokable { invoker })
    }

    /// Re-targets an invokable object.
    pub fn set_invoker(&mut self, id: ObjectId, invoker: Value) -> bool {
        match self.objects.get_mut(&id) {
            Some(Object::Invokable { invoker: slot }) => {
                *slot = invoker;
                true
            }
            _ => false,
        }
    }

    /// Stores a method image as a dynamic function and returns its id.
    pub fn new_dynamic_func(&mut self, method: &[u8]) -> ObjectId {
        let id = self.alloc_id();
        let mut code = Vec::with_capacity(DYNFUNC_PREFIX_LEN + method.len());
        code.extend_from_slice(&id.0.to_le_bytes());
        code.extend_from_slice(method);
        debug!("dynamic function {:?}: {} byte method", id, method.len());
        self.objects.insert(id, Object::DynamicFunc { code: code.into_boxed_slice() });
        id
    }

    /// Header bytes of a dynamic function.
    pub fn dynamic_func_code(&self, id: ObjectId) -> Option<&[u8]> {
        match self.objects.get(&id)? {
            Object::DynamicFunc { code } => code.get(DYNFUNC_PREFIX_LEN..),
            _ => None,
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn string(&self, id: ObjectId) -> Option<&str> {
        match self.objects.get(&id)? {
            Object::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The dynamic function whose code region holds `addr`, with the byte
    /// offset of `addr` inside that region.
    fn dynfunc_containing(&self, addr: CodeAddr) -> Option<(ObjectId, &[u8], usize)> {
        self.objects.iter().find_map(|(&id, obj)| match obj {
            Object::DynamicFunc { code } => addr.offset_in(code).map(|at| (id, &code[..], at)),
            _ => None,
        })
    }
}

impl ObjectTable for ObjectStore {
    fn get_invoker(&self, id: ObjectId) -> Option<Value> {
        match self.objects.get(&id)? {
            Object::Invokable { invoker } => Some(*invoker),
            _ => None,
        }
    }

    fn code_at(&self, addr: CodeAddr) -> Option<&[u8]> {
        let (_, code, at) = self.dynfunc_containing(addr)?;
        if at < DYNFUNC_PREFIX_LEN {
            return None;
        }
        Some(&code[at..])
    }

    /// Reads the owner id stored just ahead of `addr` and accepts it only if
    /// that object really owns the header at `addr`.
    fn dynfunc_from_prefix(&self, addr: CodeAddr) -> Option<ObjectId> {
        let (_, code, at) = self.dynfunc_containing(addr)?;
        let prefix = at.checked_sub(DYNFUNC_PREFIX_LEN)?;
        let id = ObjectId(try_read_u32(code, prefix)?);
        if !id.is_valid() {
            return None;
        }
        let owned = self.dynamic_func_code(id)?;
        (CodeAddr::of(owned) == addr).then_some(id)
    }
}

impl StringFactory for ObjectStore {
    fn create_string(&mut self, bytes: &[u8]) -> ObjectId {
        self.insert(Object::Str(String::from_utf8_lossy(bytes).into_owned()))
    }
}
