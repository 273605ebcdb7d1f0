// SPDX-License-Identifier: BSD-3-Clause
//! Context-sensitive elements.
//!
//! Contexts, context-sensitive objects, pointers, call sites and methods are
//! interned here, so that structurally equal elements share one handle.

use std::fmt::Display;

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::handle::{handle, Interner};
use crate::heap::ObjId;
use crate::ir::{FieldId, MethodId, StmtRef, VarId};

handle!(ContextId);
handle!(
    /// An object in a heap context
    CsObjId
);
handle!(PointerId);
handle!(CsCallSiteId);
handle!(CsMethodId);

impl ContextId {
    pub const EMPTY: ContextId = ContextId(0);
}

/// Nodes of the pointer flow graph.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pointer {
    Var(ContextId, VarId),
    InstanceField(CsObjId, FieldId),
    StaticField(FieldId),
    /// All elements of an array object
    ArrayIndex(CsObjId),
}

/// A variable in a context, together with its pointer.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct CsVar {
    pub pointer: PointerId,
    pub context: ContextId,
    pub var: VarId,
}

#[derive(Debug)]
pub struct CSManager {
    contexts: Interner<Context>,
    objs: Interner<(ContextId, ObjId)>,
    pointers: Interner<Pointer>,
    call_sites: Interner<(ContextId, StmtRef)>,
    methods: Interner<(ContextId, MethodId)>,
    var_pointers: FxHashMap<VarId, Vec<PointerId>>,
}

impl Default for CSManager {
    fn default() -> Self {
        let mut contexts = Interner::default();
        contexts.intern(Context::empty());
        CSManager {
            contexts,
            objs: Interner::default(),
            pointers: Interner::default(),
            call_sites: Interner::default(),
            methods: Interner::default(),
            var_pointers: FxHashMap::default(),
        }
    }
}

impl CSManager {
    pub fn get_context(&mut self, ctx: Context) -> ContextId {
        ContextId(self.contexts.intern(ctx).0)
    }

    #[inline]
    pub fn context(&self, id: ContextId) -> &Context {
        self.contexts.get(id.0)
    }

    pub fn get_cs_obj(&mut self, ctx: ContextId, obj: ObjId) -> CsObjId {
        CsObjId(self.objs.intern((ctx, obj)).0)
    }

    #[inline]
    pub fn cs_obj(&self, id: CsObjId) -> (ContextId, ObjId) {
        *self.objs.get(id.0)
    }

    #[inline]
    pub fn obj(&self, id: CsObjId) -> ObjId {
        self.objs.get(id.0).1
    }

    fn get_pointer(&mut self, p: Pointer) -> PointerId {
        let (i, new) = self.pointers.intern(p);
        let id = PointerId(i);
        if new {
            if let Pointer::Var(_, var) = p {
                self.var_pointers.entry(var).or_default().push(id);
            }
        }
        id
    }

    pub fn get_cs_var(&mut self, ctx: ContextId, var: VarId) -> CsVar {
        CsVar {
            pointer: self.get_pointer(Pointer::Var(ctx, var)),
            context: ctx,
            var,
        }
    }

    pub fn get_instance_field(&mut self, base: CsObjId, field: FieldId) -> PointerId {
        self.get_pointer(Pointer::InstanceField(base, field))
    }

    pub fn get_static_field(&mut self, field: FieldId) -> PointerId {
        self.get_pointer(Pointer::StaticField(field))
    }

    pub fn get_array_index(&mut self, array: CsObjId) -> PointerId {
        self.get_pointer(Pointer::ArrayIndex(array))
    }

    #[inline]
    pub fn pointer(&self, id: PointerId) -> Pointer {
        *self.pointers.get(id.0)
    }

    /// An already interned pointer, without creating it.
    pub fn lookup_pointer(&self, p: Pointer) -> Option<PointerId> {
        self.pointers.lookup(&p).map(PointerId)
    }

    /// Pointers of `var` in all contexts it was seen in.
    pub fn var_pointers(&self, var: VarId) -> &[PointerId] {
        self.var_pointers.get(&var).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pointers(&self) -> impl Iterator<Item = (PointerId, Pointer)> + '_ {
        self.pointers.iter().map(|(i, p)| (PointerId(i), *p))
    }

    pub fn get_cs_call_site(&mut self, ctx: ContextId, site: StmtRef) -> CsCallSiteId {
        CsCallSiteId(self.call_sites.intern((ctx, site)).0)
    }

    #[inline]
    pub fn cs_call_site(&self, id: CsCallSiteId) -> (ContextId, StmtRef) {
        *self.call_sites.get(id.0)
    }

    pub fn get_cs_method(&mut self, ctx: ContextId, method: MethodId) -> CsMethodId {
        CsMethodId(self.methods.intern((ctx, method)).0)
    }

    #[inline]
    pub fn cs_method(&self, id: CsMethodId) -> (ContextId, MethodId) {
        *self.methods.get(id.0)
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn cs_obj_count(&self) -> usize {
        self.objs.len()
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn cs_method_count(&self) -> usize {
        self.methods.len()
    }
}

impl Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pointer::Var(c, v) => write!(f, "c{}:v{}", c.0, v.index()),
            Pointer::InstanceField(o, fld) => write!(f, "cso{}.f{}", o.0, fld.index()),
            Pointer::StaticField(fld) => write!(f, "f{}", fld.index()),
            Pointer::ArrayIndex(o) => write!(f, "cso{}[*]", o.0),
        }
    }
}
