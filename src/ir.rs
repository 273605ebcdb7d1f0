// SPDX-License-Identifier: BSD-3-Clause
//! Intermediate representation of the analysed program.
//!
//! A [`Program`] is a set of arenas (classes, methods, fields, variables)
//! addressed by small handles, plus the class hierarchy computed from them.

use std::fmt::Display;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace_span};

pub mod error;
pub mod json;
mod prelude;
pub mod signature;
pub mod stmt;

pub use error::Error;
pub use signature::{FieldRef, MethodRef, SignaturePatterns, Subsig};
pub use stmt::{Invoke, InvokeKind, Literal, Stmt, StmtRef};

use crate::handle::{handle, Interner};
use crate::hierarchy::ClassHierarchy;
use crate::name::{self, Name};
use json::{ClassDef, InvokeKindDef, LiteralDef, MethodDef, ProgramDef, StmtDef};

handle!(ClassId);
handle!(MethodId);
handle!(FieldId);
handle!(VarId);
handle!(SubsigId);

#[derive(Clone, Debug)]
pub struct Class {
    pub id: ClassId,
    pub name: Name,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    /// Referenced by the program but never declared
    pub is_phantom: bool,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
    pub clinit: Option<MethodId>,
}

#[derive(Clone, Debug)]
pub struct Method {
    pub id: MethodId,
    pub class: ClassId,
    pub name: Name,
    pub params: Vec<Name>,
    pub ret: Name,
    pub subsig: SubsigId,
    /// `<C: R name(P1,P2)>`
    pub signature: Name,
    pub is_static: bool,
    pub is_abstract: bool,
    pub body: Option<Body>,
}

impl Method {
    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == name::INIT
    }

    #[inline]
    pub fn is_clinit(&self) -> bool {
        self.name == name::CLINIT
    }

    pub fn this_var(&self) -> Option<VarId> {
        self.body.as_ref().and_then(|b| b.this)
    }

    pub fn param_vars(&self) -> &[VarId] {
        self.body.as_ref().map(|b| b.params.as_slice()).unwrap_or(&[])
    }

    pub fn return_vars(&self) -> &[VarId] {
        self.body.as_ref().map(|b| b.returns.as_slice()).unwrap_or(&[])
    }

    pub fn stmts(&self) -> &[Stmt] {
        self.body.as_ref().map(|b| b.stmts.as_slice()).unwrap_or(&[])
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.signature)
    }
}

#[derive(Clone, Debug)]
pub struct Body {
    pub this: Option<VarId>,
    pub params: Vec<VarId>,
    pub vars: Vec<VarId>,
    pub stmts: Vec<Stmt>,
    /// Variables returned by `return` statements
    pub returns: Vec<VarId>,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub id: FieldId,
    pub class: ClassId,
    pub name: Name,
    pub ty: Name,
    pub is_static: bool,
}

#[derive(Clone, Debug)]
pub struct Var {
    pub id: VarId,
    pub method: MethodId,
    pub name: Name,
    pub ty: Name,
    /// Set when the only definition of the variable is a literal
    pub constant: Option<Literal>,
}

/// Statements in which a variable is the base (or receiver).
#[derive(Clone, Debug, Default)]
pub struct VarUses {
    /// `lhs = var.field`
    pub loads: Vec<(VarId, FieldId)>,
    /// `var.field = rhs`
    pub stores: Vec<(FieldId, VarId)>,
    /// `lhs = var[_]`
    pub array_loads: Vec<VarId>,
    /// `var[_] = rhs`
    pub array_stores: Vec<VarId>,
    /// Non-static invocations with `var` as receiver
    pub invokes: Vec<StmtRef>,
}

#[derive(Debug)]
pub struct Program {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    vars: Vec<Var>,
    uses: Vec<VarUses>,
    class_index: FxHashMap<Name, ClassId>,
    subsigs: Interner<Subsig>,
    entries: Vec<MethodId>,
    hierarchy: ClassHierarchy,
}

fn is_class_type(ty: &str) -> bool {
    name::is_reference(ty) && name::element_type(ty).is_none()
}

impl Program {
    pub fn new(def: &ProgramDef) -> Result<Self, Error> {
        let span = trace_span!("load");
        let _span = span.enter();

        let mut b = Builder::default();
        let prelude = prelude::classes();
        let declared: FxHashSet<&str> = def.classes.iter().map(|c| c.name.as_str()).collect();
        let defs: Vec<&ClassDef> = def
            .classes
            .iter()
            .chain(prelude.iter().filter(|c| !declared.contains(c.name.as_str())))
            .collect();

        for c in &defs {
            b.declare_class(c)?;
        }
        for (i, c) in defs.iter().enumerate() {
            b.link_class(ClassId::from_index(i), c)?;
        }
        b.check_acyclic()?;
        let mut with_bodies = Vec::new();
        for (i, c) in defs.iter().enumerate() {
            for m in &c.methods {
                let id = b.add_method(ClassId::from_index(i), m)?;
                if let Some(stmts) = &m.body {
                    with_bodies.push((id, m, stmts));
                }
            }
        }
        for (id, m, stmts) in with_bodies {
            let body = b.lower_body(id, m, stmts)?;
            b.methods[id.index()].body = Some(body);
        }

        let hierarchy = ClassHierarchy::new(&b.classes, &b.methods);
        let mut program = Program {
            uses: vec![VarUses::default(); b.vars.len()],
            classes: b.classes,
            methods: b.methods,
            fields: b.fields,
            vars: b.vars,
            class_index: b.class_index,
            subsigs: b.subsigs,
            entries: Vec::new(),
            hierarchy,
        };
        program.index_vars();
        program.entries = program.find_entries(&def.entries)?;
        debug!(
            classes = program.classes.len(),
            methods = program.methods.len(),
            vars = program.vars.len(),
            "loaded program"
        );
        Ok(program)
    }

    fn index_vars(&mut self) {
        let mut defs: FxHashMap<VarId, (usize, Option<Literal>)> = FxHashMap::default();
        for m in &self.methods {
            let Some(body) = &m.body else { continue };
            for v in body.this.iter().chain(body.params.iter()) {
                defs.insert(*v, (1, None));
            }
            for (i, stmt) in body.stmts.iter().enumerate() {
                if let Some(v) = stmt.def() {
                    let e = defs.entry(v).or_insert((0, None));
                    e.0 += 1;
                    e.1 = match stmt {
                        Stmt::Literal { value, .. } => Some(value.clone()),
                        _ => None,
                    };
                }
                let site = StmtRef::new(m.id, i);
                match stmt {
                    Stmt::Load { lhs, base, field } => {
                        self.uses[base.index()].loads.push((*lhs, *field))
                    }
                    Stmt::Store { base, field, rhs } => {
                        self.uses[base.index()].stores.push((*field, *rhs))
                    }
                    Stmt::LoadArray { lhs, base, .. } => {
                        self.uses[base.index()].array_loads.push(*lhs)
                    }
                    Stmt::StoreArray { base, rhs, .. } => {
                        self.uses[base.index()].array_stores.push(*rhs)
                    }
                    Stmt::Invoke(Invoke {
                        kind,
                        base: Some(base),
                        ..
                    }) if *kind != InvokeKind::Static => {
                        self.uses[base.index()].invokes.push(site)
                    }
                    _ => {}
                }
            }
        }
        for (v, (count, literal)) in defs {
            if count == 1 {
                self.vars[v.index()].constant = literal;
            }
        }
    }

    fn find_entries(&self, sigs: &[String]) -> Result<Vec<MethodId>, Error> {
        if sigs.is_empty() {
            return Ok(self
                .methods
                .iter()
                .filter(|m| {
                    m.is_static
                        && m.body.is_some()
                        && m.name == "main"
                        && m.params.len() == 1
                        && m.params[0] == "java.lang.String[]"
                })
                .map(|m| m.id)
                .collect());
        }
        let mut entries = Vec::with_capacity(sigs.len());
        for sig in sigs {
            let mref = MethodRef::parse(sig)?;
            let method = self
                .class_by_name(mref.class.as_str())
                .zip(self.subsig_id(&mref.subsig()))
                .and_then(|(c, s)| self.hierarchy.declared(c, s))
                .ok_or_else(|| Error(format!("No such entry method: {sig}")))?;
            entries.push(method);
        }
        Ok(entries)
    }

    /// Replaces the entry methods with every method with a body whose
    /// signature matches one of `patterns`.
    pub fn set_entries_matching(&mut self, patterns: &SignaturePatterns) -> Result<(), Error> {
        let entries: Vec<MethodId> = self
            .methods
            .iter()
            .filter(|m| m.body.is_some() && patterns.matches(m.signature.as_str()))
            .map(|m| m.id)
            .collect();
        if entries.is_empty() {
            return Err(Error("No method matches the entry patterns".to_string()));
        }
        self.entries = entries;
        Ok(())
    }

    #[inline]
    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    #[inline]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    #[inline]
    pub fn uses(&self, var: VarId) -> &VarUses {
        &self.uses[var.index()]
    }

    #[inline]
    pub fn entries(&self) -> &[MethodId] {
        &self.entries
    }

    #[inline]
    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    #[inline]
    pub fn subsig(&self, id: SubsigId) -> &Subsig {
        self.subsigs.get(id.0)
    }

    pub fn subsig_id(&self, subsig: &Subsig) -> Option<SubsigId> {
        self.subsigs.lookup(subsig).map(SubsigId)
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    pub fn stmt(&self, site: StmtRef) -> Option<&Stmt> {
        self.method(site.method).stmts().get(site.index as usize)
    }

    pub fn invoke(&self, site: StmtRef) -> Option<&Invoke> {
        self.stmt(site).and_then(Stmt::as_invoke)
    }

    /// `class` followed by its superclasses, nearest first.
    pub fn superclasses(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(class), move |c| self.classes[c.index()].superclass)
    }

    /// Methods named `name` declared in `class`.
    pub fn declared_methods<'a>(
        &'a self,
        class: ClassId,
        name: &'a str,
    ) -> impl Iterator<Item = MethodId> + 'a {
        self.classes[class.index()]
            .methods
            .iter()
            .copied()
            .filter(move |m| self.methods[m.index()].name == name)
    }

    /// Looks `name` up as a field of `class` or one of its superclasses.
    pub fn field_by_name(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.superclasses(class).find_map(|c| {
            self.classes[c.index()]
                .fields
                .iter()
                .copied()
                .find(|f| self.fields[f.index()].name == name)
        })
    }

    /// Whether a value of type `sub` may be stored in a location of type
    /// `sup`.
    pub fn is_subtype(&self, sup: &str, sub: &str) -> bool {
        if sup == sub {
            return true;
        }
        if name::is_primitive(sup) || name::is_primitive(sub) {
            return false;
        }
        if sup == name::OBJECT {
            return true;
        }
        match (name::element_type(sup), name::element_type(sub)) {
            (Some(sup_elem), Some(sub_elem)) => {
                if name::is_primitive(sup_elem) || name::is_primitive(sub_elem) {
                    sup_elem == sub_elem
                } else {
                    self.is_subtype(sup_elem, sub_elem)
                }
            }
            (None, Some(_)) => sup == name::CLONEABLE || sup == name::SERIALIZABLE,
            (Some(_), None) => false,
            (None, None) => match (self.class_by_name(sup), self.class_by_name(sub)) {
                (Some(p), Some(c)) => self.hierarchy.is_subclass(c, p),
                _ => false,
            },
        }
    }

    /// Virtual dispatch of `subsig` on an object of type `ty`.
    pub fn dispatch(&self, ty: &str, subsig: SubsigId) -> Option<MethodId> {
        let class = if name::element_type(ty).is_some() {
            self.class_by_name(name::OBJECT)?
        } else {
            self.class_by_name(ty)?
        };
        self.hierarchy.dispatch(class, subsig)
    }

    /// Static resolution of an invocation target, as for `static` and
    /// `special` invocations.
    pub fn resolve_method(&self, invoke: &Invoke) -> Option<MethodId> {
        let class = if name::element_type(invoke.method.class.as_str()).is_some() {
            self.class_by_name(name::OBJECT)?
        } else {
            self.class_by_name(invoke.method.class.as_str())?
        };
        if let Some(m) = self
            .superclasses(class)
            .find_map(|c| self.hierarchy.declared(c, invoke.subsig))
        {
            return Some(m);
        }
        self.hierarchy
            .supertypes(class)
            .filter(|i| self.classes[i.index()].is_interface)
            .filter_map(|i| self.hierarchy.declared(i, invoke.subsig))
            .min()
    }

    /// `<C: R m(..)>/name`
    pub fn describe_var(&self, var: VarId) -> String {
        let v = self.var(var);
        format!("{}/{}", self.method(v.method), v.name)
    }
}

#[derive(Default)]
struct Builder {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    vars: Vec<Var>,
    class_index: FxHashMap<Name, ClassId>,
    subsigs: Interner<Subsig>,
}

impl Builder {
    fn new_class(&mut self, name: &str, phantom: bool) -> ClassId {
        let id = ClassId::from_index(self.classes.len());
        let name = Name::from(name);
        self.class_index.insert(name.clone(), id);
        self.classes.push(Class {
            id,
            name,
            superclass: None,
            interfaces: Vec::new(),
            is_interface: false,
            is_abstract: false,
            is_phantom: phantom,
            methods: Vec::new(),
            fields: Vec::new(),
            clinit: None,
        });
        id
    }

    fn declare_class(&mut self, def: &ClassDef) -> Result<ClassId, Error> {
        if !is_class_type(&def.name) {
            return Err(Error(format!("Not a class name: {}", def.name)));
        }
        if self.class_index.contains_key(def.name.as_str()) {
            return Err(Error(format!("Duplicate class {}", def.name)));
        }
        let id = self.new_class(&def.name, false);
        let c = &mut self.classes[id.index()];
        c.is_interface = def.interface;
        c.is_abstract = def.is_abstract || def.interface;
        Ok(id)
    }

    /// The class called `name`, created as a phantom subclass of `Object`
    /// when the program never declares it.
    fn class_named(&mut self, name: &str) -> ClassId {
        if let Some(&id) = self.class_index.get(name) {
            return id;
        }
        let id = self.new_class(name, true);
        self.classes[id.index()].superclass = self.class_index.get(name::OBJECT).copied();
        debug!("phantom class {}", name);
        id
    }

    fn link_class(&mut self, id: ClassId, def: &ClassDef) -> Result<(), Error> {
        let superclass = match &def.superclass {
            Some(s) if is_class_type(s) => Some(self.class_named(s)),
            Some(s) => return Err(Error(format!("Bad superclass {} of {}", s, def.name))),
            None if def.name == name::OBJECT || def.interface => None,
            None => Some(self.class_named(name::OBJECT)),
        };
        let interfaces: Vec<ClassId> = def.interfaces.iter().map(|i| self.class_named(i)).collect();
        let c = &mut self.classes[id.index()];
        c.superclass = superclass;
        c.interfaces = interfaces;
        for f in &def.fields {
            if self.classes[id.index()]
                .fields
                .iter()
                .any(|g| self.fields[g.index()].name == f.name.as_str())
            {
                return Err(Error(format!("Duplicate field {}.{}", def.name, f.name)));
            }
            self.add_field(id, &f.name, &f.ty, f.is_static);
        }
        Ok(())
    }

    fn check_acyclic(&self) -> Result<(), Error> {
        for c in &self.classes {
            let mut steps = 0;
            let mut cur = c.superclass;
            while let Some(s) = cur {
                steps += 1;
                if steps > self.classes.len() {
                    return Err(Error(format!("Cyclic superclass chain at {}", c.name)));
                }
                cur = self.classes[s.index()].superclass;
            }
        }
        Ok(())
    }

    fn add_field(&mut self, class: ClassId, name: &str, ty: &str, is_static: bool) -> FieldId {
        let id = FieldId::from_index(self.fields.len());
        self.fields.push(Field {
            id,
            class,
            name: Name::from(name),
            ty: Name::from(ty),
            is_static,
        });
        self.classes[class.index()].fields.push(id);
        id
    }

    fn subsig(&mut self, name: &Name, params: &[Name]) -> SubsigId {
        SubsigId(
            self.subsigs
                .intern(Subsig {
                    name: name.clone(),
                    params: params.to_vec(),
                })
                .0,
        )
    }

    fn add_method(&mut self, class: ClassId, def: &MethodDef) -> Result<MethodId, Error> {
        let id = MethodId::from_index(self.methods.len());
        let name = Name::from(def.name.as_str());
        let params: Vec<Name> = def.params.iter().map(|p| Name::from(p.as_str())).collect();
        let ret = Name::from(def.ret.as_str());
        let subsig = self.subsig(&name, &params);
        let class_name = self.classes[class.index()].name.clone();
        let signature = Name::from(
            MethodRef {
                class: class_name.clone(),
                ret: ret.clone(),
                name: name.clone(),
                params: params.clone(),
            }
            .to_string(),
        );
        if self.classes[class.index()]
            .methods
            .iter()
            .any(|m| self.methods[m.index()].subsig == subsig)
        {
            return Err(Error(format!("Duplicate method {signature}")));
        }
        if def.is_abstract && def.body.is_some() {
            return Err(Error(format!("Abstract method {signature} has a body")));
        }
        let is_clinit = name == name::CLINIT && params.is_empty();
        self.methods.push(Method {
            id,
            class,
            name,
            params,
            ret,
            subsig,
            signature,
            is_static: def.is_static || is_clinit,
            is_abstract: def.is_abstract,
            body: None,
        });
        let c = &mut self.classes[class.index()];
        c.methods.push(id);
        if is_clinit {
            c.clinit = Some(id);
        }
        Ok(id)
    }

    fn add_var(&mut self, method: MethodId, name: &str, ty: &str) -> VarId {
        let id = VarId::from_index(self.vars.len());
        self.vars.push(Var {
            id,
            method,
            name: Name::from(name),
            ty: Name::from(ty),
            constant: None,
        });
        id
    }

    /// Resolves a field reference, adding a phantom field to the referenced
    /// class when no class on its superclass chain declares it.
    fn field_of(&mut self, fref: &FieldRef, is_static: bool) -> FieldId {
        let class = self.class_named(fref.class.as_str());
        let mut cur = Some(class);
        while let Some(c) = cur {
            let found = self.classes[c.index()]
                .fields
                .iter()
                .copied()
                .find(|f| self.fields[f.index()].name == fref.name);
            if let Some(f) = found {
                return f;
            }
            cur = self.classes[c.index()].superclass;
        }
        debug!("phantom field {}", fref);
        self.add_field(class, fref.name.as_str(), fref.ty.as_str(), is_static)
    }

    fn lower_body(
        &mut self,
        method: MethodId,
        def: &MethodDef,
        stmts: &[StmtDef],
    ) -> Result<Body, Error> {
        let m = &self.methods[method.index()];
        let signature = m.signature.clone();
        let is_static = m.is_static;
        let params = m.params.clone();
        let class_name = self.classes[m.class.index()].name.clone();
        if def.param_names.len() != params.len() {
            return Err(Error(format!(
                "{signature} names {} parameters but has {}",
                def.param_names.len(),
                params.len()
            )));
        }

        let mut locals: FxHashMap<String, VarId> = FxHashMap::default();
        let mut all = Vec::new();
        let mut declare = |b: &mut Builder, name: &str, ty: &str| -> Result<VarId, Error> {
            if locals.contains_key(name) {
                return Err(Error(format!("Variable {name} declared twice in {signature}")));
            }
            let v = b.add_var(method, name, ty);
            locals.insert(name.to_string(), v);
            all.push(v);
            Ok(v)
        };
        let this = if is_static {
            None
        } else {
            Some(declare(self, "this", class_name.as_str())?)
        };
        let mut param_vars = Vec::with_capacity(params.len());
        for (n, ty) in def.param_names.iter().zip(params.iter()) {
            param_vars.push(declare(self, n, ty.as_str())?);
        }
        for (n, ty) in &def.vars {
            declare(self, n, ty)?;
        }
        drop(declare);

        let var = |n: &str| -> Result<VarId, Error> {
            locals
                .get(n)
                .copied()
                .ok_or_else(|| Error(format!("Unknown variable {n} in {signature}")))
        };
        let opt_var = |n: &Option<String>| -> Result<Option<VarId>, Error> {
            n.as_deref().map(var).transpose()
        };

        let mut lowered = Vec::with_capacity(stmts.len());
        let mut returns = Vec::new();
        for s in stmts {
            let stmt = match s {
                StmtDef::New { lhs, ty } => {
                    if !is_class_type(ty) {
                        return Err(Error(format!("`new` of non-class type {ty} in {signature}")));
                    }
                    self.class_named(ty);
                    Stmt::New {
                        lhs: var(lhs)?,
                        ty: Name::from(ty.as_str()),
                    }
                }
                StmtDef::NewArray { lhs, ty, length } => {
                    if name::element_type(ty).is_none() {
                        return Err(Error(format!("`new-array` of non-array type {ty} in {signature}")));
                    }
                    Stmt::NewArray {
                        lhs: var(lhs)?,
                        ty: Name::from(ty.as_str()),
                        length: opt_var(length)?,
                    }
                }
                StmtDef::Const { lhs, value } => {
                    let value = match value {
                        LiteralDef::Null => Literal::Null,
                        LiteralDef::Int(i) => Literal::Int(*i),
                        LiteralDef::String(s) => Literal::String(Name::from(s.as_str())),
                        LiteralDef::Class(c) => {
                            if is_class_type(c) {
                                self.class_named(c);
                            }
                            Literal::Class(Name::from(c.as_str()))
                        }
                    };
                    Stmt::Literal {
                        lhs: var(lhs)?,
                        value,
                    }
                }
                StmtDef::Copy { lhs, rhs } => Stmt::Copy {
                    lhs: var(lhs)?,
                    rhs: var(rhs)?,
                },
                StmtDef::Cast { lhs, rhs, ty } => Stmt::Cast {
                    lhs: var(lhs)?,
                    rhs: var(rhs)?,
                    ty: Name::from(ty.as_str()),
                },
                StmtDef::Load { lhs, base, field } => Stmt::Load {
                    lhs: var(lhs)?,
                    base: var(base)?,
                    field: self.field_of(&FieldRef::parse(field)?, false),
                },
                StmtDef::Store { base, field, rhs } => Stmt::Store {
                    base: var(base)?,
                    field: self.field_of(&FieldRef::parse(field)?, false),
                    rhs: var(rhs)?,
                },
                StmtDef::LoadStatic { lhs, field } => Stmt::LoadStatic {
                    lhs: var(lhs)?,
                    field: self.field_of(&FieldRef::parse(field)?, true),
                },
                StmtDef::StoreStatic { field, rhs } => Stmt::StoreStatic {
                    field: self.field_of(&FieldRef::parse(field)?, true),
                    rhs: var(rhs)?,
                },
                StmtDef::LoadArray { lhs, base, index } => Stmt::LoadArray {
                    lhs: var(lhs)?,
                    base: var(base)?,
                    index: opt_var(index)?,
                },
                StmtDef::StoreArray { base, index, rhs } => Stmt::StoreArray {
                    base: var(base)?,
                    index: opt_var(index)?,
                    rhs: var(rhs)?,
                },
                StmtDef::Invoke {
                    kind,
                    method: sig,
                    base,
                    args,
                    result,
                } => {
                    let mref = MethodRef::parse(sig)?;
                    if mref.params.len() != args.len() {
                        return Err(Error(format!(
                            "Call to {sig} with {} arguments in {signature}",
                            args.len()
                        )));
                    }
                    let kind = match kind {
                        InvokeKindDef::Static => InvokeKind::Static,
                        InvokeKindDef::Special => InvokeKind::Special,
                        InvokeKindDef::Virtual => InvokeKind::Virtual,
                        InvokeKindDef::Interface => InvokeKind::Interface,
                    };
                    let base = opt_var(base)?;
                    if (kind == InvokeKind::Static) != base.is_none() {
                        return Err(Error(format!(
                            "Call to {sig} in {signature}: only non-static calls have a receiver"
                        )));
                    }
                    if is_class_type(mref.class.as_str()) {
                        self.class_named(mref.class.as_str());
                    }
                    let subsig = self.subsig(&mref.name, &mref.params);
                    Stmt::Invoke(Invoke {
                        kind,
                        method: mref,
                        subsig,
                        base,
                        args: args.iter().map(|a| var(a.as_str())).collect::<Result<_, _>>()?,
                        result: opt_var(result)?,
                    })
                }
                StmtDef::Return { value } => {
                    let value = opt_var(value)?;
                    if let Some(v) = value {
                        if !returns.contains(&v) {
                            returns.push(v);
                        }
                    }
                    Stmt::Return { value }
                }
            };
            lowered.push(stmt);
        }
        Ok(Body {
            this,
            params: param_vars,
            vars: all,
            stmts: lowered,
            returns,
        })
    }
}
