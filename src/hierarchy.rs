// SPDX-License-Identifier: BSD-3-Clause
//! Subtyping and virtual dispatch tables.

use ascent::ascent_run;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace_span};

use crate::ir::{Class, ClassId, Method, MethodId, SubsigId};

#[derive(Debug)]
pub struct ClassHierarchy {
    /// All supertypes of each class, including itself and its interfaces
    supertypes: Vec<FxHashSet<ClassId>>,
    /// All subtypes of each class, including itself, in ascending order
    subtypes: Vec<Vec<ClassId>>,
    declared: FxHashMap<(ClassId, SubsigId), MethodId>,
    dispatch: FxHashMap<(ClassId, SubsigId), MethodId>,
}

impl ClassHierarchy {
    pub fn new(classes: &[Class], methods: &[Method]) -> Self {
        let span = trace_span!("hierarchy");
        let _span = span.enter();

        let outs = ascent_run! {
            relation class(ClassId);
            relation interface(ClassId);
            relation superclass(ClassId, ClassId);
            relation implements(ClassId, ClassId);

            class(c.id) <-- for c in classes.iter();
            interface(c.id) <-- for c in classes.iter(), if c.is_interface;
            superclass(c.id, s) <-- for c in classes.iter(), for s in c.superclass.iter().copied();
            implements(c.id, i) <-- for c in classes.iter(), for i in c.interfaces.iter().copied();

            relation subtype(ClassId, ClassId);
            subtype(c, c) <-- class(c);
            subtype(c, s) <-- subtype(c, p), superclass(p, s);
            subtype(c, s) <-- subtype(c, p), implements(p, s);

            relation declares(ClassId, SubsigId);
            declares(m.class, m.subsig) <-- for m in methods.iter();

            relation concrete(ClassId, SubsigId, MethodId);
            concrete(m.class, m.subsig, m.id) <-- for m in methods.iter(), if !m.is_abstract;

            relation class_dispatch(ClassId, SubsigId, MethodId);
            class_dispatch(c, s, m) <-- concrete(c, s, m);
            class_dispatch(c, s, m) <--
              superclass(c, p),
              class_dispatch(p, s, m),
              !declares(c, s);

            // Default methods of interfaces
            relation default_dispatch(ClassId, SubsigId, MethodId);
            default_dispatch(c, s, m) <--
              subtype(c, i),
              if c != i,
              interface(i),
              concrete(i, s, m),
              !class_dispatch(c, s, _);
        };

        let n = classes.len();
        let mut supertypes = vec![FxHashSet::default(); n];
        let mut subtypes = vec![Vec::new(); n];
        for (c, s) in outs.subtype {
            supertypes[c.index()].insert(s);
            subtypes[s.index()].push(c);
        }
        for subs in &mut subtypes {
            subs.sort_unstable();
        }

        let declared = methods.iter().map(|m| ((m.class, m.subsig), m.id)).collect();
        let mut dispatch: FxHashMap<(ClassId, SubsigId), MethodId> =
            outs.class_dispatch.into_iter().map(|(c, s, m)| ((c, s), m)).collect();
        for (c, s, m) in outs.default_dispatch {
            let e = dispatch.entry((c, s)).or_insert(m);
            if m < *e {
                *e = m;
            }
        }
        debug!(dispatch = dispatch.len(), "built class hierarchy");

        ClassHierarchy {
            supertypes,
            subtypes,
            declared,
            dispatch,
        }
    }

    #[inline]
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        self.supertypes[sub.index()].contains(&sup)
    }

    pub fn supertypes(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        self.supertypes[class.index()].iter().copied()
    }

    /// `class` and all its (transitive) subclasses and implementors.
    pub fn subtypes(&self, class: ClassId) -> &[ClassId] {
        &self.subtypes[class.index()]
    }

    /// The method with subsignature `subsig` declared in `class` itself.
    pub fn declared(&self, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
        self.declared.get(&(class, subsig)).copied()
    }

    /// The concrete method invoked for `subsig` on an instance of `class`.
    pub fn dispatch(&self, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
        self.dispatch.get(&(class, subsig)).copied()
    }
}
