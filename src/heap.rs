// SPDX-License-Identifier: BSD-3-Clause
//! Abstract objects.
//!
//! Every object has a stable [`ObjId`]; equal allocation sites, constants and
//! mock descriptors always map to the same object.

use std::fmt::Display;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::analysis::reflection::UJMethod;
use crate::handle::handle;
use crate::ir::{FieldId, MethodId, Program, StmtRef};
use crate::name::{self, Name};

handle!(
    /// An abstract object
    ObjId
);

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConstValue {
    String(Name),
    Class(Name),
}

impl Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::String(s) => write!(f, "\"{s}\""),
            ConstValue::Class(c) => write!(f, "{c}.class"),
        }
    }
}

/// What a mock object stands for.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum MockDesc {
    /// `Method`, `Constructor` and `Field` objects
    ReflectionMetaObj,
    /// Objects created by reflective instantiation
    ReflectiveObj,
    /// A constant-length array, remembering its length
    ArrayLength,
    /// The `Method[]` returned by `getMethods()`
    MethodsArray,
    /// The `String[]` passed to an entry method
    MainArgs,
    /// Elements of [`MockDesc::MainArgs`]
    MainArgsElem,
}

impl Display for MockDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockDesc::ReflectionMetaObj => write!(f, "ReflectionMetaObj"),
            MockDesc::ReflectiveObj => write!(f, "ReflectiveObj"),
            MockDesc::ArrayLength => write!(f, "ArrayLength"),
            MockDesc::MethodsArray => write!(f, "MethodsArray"),
            MockDesc::MainArgs => write!(f, "MainArgs"),
            MockDesc::MainArgsElem => write!(f, "MainArgsElem"),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum MockValue {
    Empty,
    Int(i64),
    /// A partially known method
    Method(UJMethod),
    /// A known method or constructor
    Member(MethodId),
    Field(FieldId),
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockObj {
    pub desc: MockDesc,
    pub value: MockValue,
    pub anchor: Option<StmtRef>,
    pub ty: Name,
}

#[derive(Clone, Debug)]
pub struct MergedObj {
    pub ty: Name,
    pub desc: String,
    pub represented: FxHashSet<ObjId>,
}

#[derive(Clone, Debug)]
pub enum Obj {
    New { site: StmtRef, ty: Name },
    Constant { ty: Name, value: ConstValue },
    Merged(MergedObj),
    Mock(MockObj),
}

impl Obj {
    pub fn ty(&self) -> &Name {
        // No `_` pattern to ensure this is updated if the type changes
        match self {
            Obj::New { ty, .. } => ty,
            Obj::Constant { ty, .. } => ty,
            Obj::Merged(m) => &m.ty,
            Obj::Mock(m) => &m.ty,
        }
    }
}

impl Display for Obj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Obj::New { site, ty } => write!(f, "new {ty}@{site}"),
            Obj::Constant { value, .. } => write!(f, "{value}"),
            Obj::Merged(m) => write!(f, "{}", m.desc),
            Obj::Mock(m) => {
                write!(f, "{}[", m.desc)?;
                match &m.value {
                    MockValue::Empty => {}
                    MockValue::Int(i) => write!(f, "{i}")?,
                    MockValue::Method(uj) => write!(f, "{uj}")?,
                    MockValue::Member(id) => write!(f, "method#{}", id.index())?,
                    MockValue::Field(id) => write!(f, "field#{}", id.index())?,
                }
                if let Some(a) = m.anchor {
                    write!(f, "@{a}")?;
                }
                write!(f, "]: {}", m.ty)
            }
        }
    }
}

/// Which kinds of objects are represented by one object per type instead of
/// one per allocation site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergePolicy {
    pub string_objects: bool,
    /// `StringBuilder` and `StringBuffer`
    pub string_builders: bool,
    /// Subtypes of `Throwable`
    pub exception_objects: bool,
    pub string_constants: bool,
}

#[derive(Debug)]
pub struct HeapModel {
    policy: MergePolicy,
    objs: Vec<Obj>,
    sites: FxHashMap<StmtRef, ObjId>,
    constants: FxHashMap<(Name, ConstValue), ObjId>,
    mocks: FxHashMap<MockObj, ObjId>,
    merged: FxHashMap<Name, ObjId>,
    merged_string_constants: Option<ObjId>,
}

impl HeapModel {
    pub fn new(policy: MergePolicy) -> Self {
        HeapModel {
            policy,
            objs: Vec::new(),
            sites: FxHashMap::default(),
            constants: FxHashMap::default(),
            mocks: FxHashMap::default(),
            merged: FxHashMap::default(),
            merged_string_constants: None,
        }
    }

    fn alloc(&mut self, obj: Obj) -> ObjId {
        let id = ObjId::from_index(self.objs.len());
        trace!("new object {}", obj);
        self.objs.push(obj);
        id
    }

    fn merge_into(&mut self, merged: ObjId, member: ObjId) {
        if let Obj::Merged(m) = &mut self.objs[merged.index()] {
            m.represented.insert(member);
        }
    }

    fn merged_for(&mut self, ty: &Name) -> ObjId {
        if let Some(&id) = self.merged.get(ty) {
            return id;
        }
        let id = self.alloc(Obj::Merged(MergedObj {
            ty: ty.clone(),
            desc: format!("<Merged {ty}>"),
            represented: FxHashSet::default(),
        }));
        self.merged.insert(ty.clone(), id);
        id
    }

    fn should_merge(&self, ty: &Name, program: &Program) -> bool {
        (self.policy.string_objects && *ty == name::STRING)
            || (self.policy.string_builders
                && (*ty == name::STRING_BUILDER || *ty == name::STRING_BUFFER))
            || (self.policy.exception_objects && program.is_subtype(name::THROWABLE, ty.as_str()))
    }

    /// The object allocated at `site`.
    pub fn get_obj(&mut self, site: StmtRef, ty: &Name, program: &Program) -> ObjId {
        if let Some(&obj) = self.sites.get(&site) {
            return obj;
        }
        let new = self.alloc(Obj::New {
            site,
            ty: ty.clone(),
        });
        let obj = if self.should_merge(ty, program) {
            let merged = self.merged_for(ty);
            self.merge_into(merged, new);
            merged
        } else {
            new
        };
        self.sites.insert(site, obj);
        obj
    }

    pub fn get_constant_obj(&mut self, ty: Name, value: ConstValue) -> ObjId {
        let key = (ty, value);
        let obj = match self.constants.get(&key) {
            Some(&obj) => obj,
            None => {
                let obj = self.alloc(Obj::Constant {
                    ty: key.0.clone(),
                    value: key.1.clone(),
                });
                self.constants.insert(key.clone(), obj);
                obj
            }
        };
        if self.policy.string_constants && key.0 == name::STRING {
            let merged = match self.merged_string_constants {
                Some(m) => m,
                None => {
                    let m = self.alloc(Obj::Merged(MergedObj {
                        ty: Name::from(name::STRING),
                        desc: "<Merged string constants>".to_string(),
                        represented: FxHashSet::default(),
                    }));
                    self.merged_string_constants = Some(m);
                    m
                }
            };
            self.merge_into(merged, obj);
            return merged;
        }
        obj
    }

    pub fn string_constant(&mut self, s: &Name) -> ObjId {
        self.get_constant_obj(Name::from(name::STRING), ConstValue::String(s.clone()))
    }

    pub fn class_constant(&mut self, class: &Name) -> ObjId {
        self.get_constant_obj(Name::from(name::CLASS), ConstValue::Class(class.clone()))
    }

    pub fn get_mock_obj(
        &mut self,
        desc: MockDesc,
        value: MockValue,
        anchor: Option<StmtRef>,
        ty: Name,
    ) -> ObjId {
        let key = MockObj {
            desc,
            value,
            anchor,
            ty,
        };
        if let Some(&obj) = self.mocks.get(&key) {
            return obj;
        }
        let obj = self.alloc(Obj::Mock(key.clone()));
        self.mocks.insert(key, obj);
        obj
    }

    /// The array passed to entry methods as `String[] args`.
    pub fn main_args(&mut self) -> ObjId {
        self.get_mock_obj(
            MockDesc::MainArgs,
            MockValue::Empty,
            None,
            Name::from(name::STRING).array_of(),
        )
    }

    pub fn main_args_elem(&mut self) -> ObjId {
        self.get_mock_obj(
            MockDesc::MainArgsElem,
            MockValue::Empty,
            None,
            Name::from(name::STRING),
        )
    }

    #[inline]
    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.index()]
    }

    #[inline]
    pub fn type_of(&self, id: ObjId) -> &Name {
        self.objs[id.index()].ty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }

    pub fn objs(&self) -> impl Iterator<Item = (ObjId, &Obj)> {
        self.objs
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjId::from_index(i), o))
    }

    /// The value of a string constant object.
    pub fn string_value(&self, id: ObjId) -> Option<&Name> {
        match self.obj(id) {
            Obj::Constant {
                value: ConstValue::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }

    /// The type denoted by a class literal object.
    pub fn class_value(&self, id: ObjId) -> Option<&Name> {
        match self.obj(id) {
            Obj::Constant {
                value: ConstValue::Class(c),
                ..
            } => Some(c),
            _ => None,
        }
    }

    pub fn mock(&self, id: ObjId) -> Option<&MockObj> {
        match self.obj(id) {
            Obj::Mock(m) => Some(m),
            _ => None,
        }
    }

    pub fn uj_method(&self, id: ObjId) -> Option<&UJMethod> {
        match self.mock(id) {
            Some(MockObj {
                value: MockValue::Method(uj),
                ..
            }) => Some(uj),
            _ => None,
        }
    }

    /// Objects a merged object stands for.
    pub fn represented(&self, id: ObjId) -> Option<&FxHashSet<ObjId>> {
        match self.obj(id) {
            Obj::Merged(m) => Some(&m.represented),
            _ => None,
        }
    }

    /// The type whose code created `id`, used by type-sensitive contexts.
    pub fn container_type(&self, id: ObjId, program: &Program) -> Name {
        let site = match self.obj(id) {
            Obj::New { site, .. } => Some(*site),
            Obj::Mock(m) => m.anchor,
            Obj::Constant { .. } | Obj::Merged(_) => None,
        };
        match site {
            Some(site) => {
                let class = program.method(site.method).class;
                program.class(class).name.clone()
            }
            None => self.type_of(id).clone(),
        }
    }
}
