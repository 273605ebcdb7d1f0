// SPDX-License-Identifier: BSD-3-Clause
use std::fmt::Display;

use crate::name::Name;

/// A method that is only partially known.
///
/// Each component is `None` when unknown. Values are never updated in place;
/// inference builds more specific descriptors with the `with_*` methods.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct UJMethod {
    declaring_class: Option<Name>,
    return_type: Option<Name>,
    name: Option<Name>,
    parameters: Option<Vec<Name>>,
    /// Taken from the array returned by `getMethods()`: stands for every
    /// method of the declaring class instead of being inferred further.
    in_methods: bool,
}

impl UJMethod {
    pub fn new(
        declaring_class: Option<Name>,
        return_type: Option<Name>,
        name: Option<Name>,
        parameters: Option<Vec<Name>>,
    ) -> Self {
        UJMethod {
            declaring_class,
            return_type,
            name,
            parameters,
            in_methods: false,
        }
    }

    pub fn declaring_class(&self) -> Option<&Name> {
        self.declaring_class.as_ref()
    }

    pub fn return_type(&self) -> Option<&Name> {
        self.return_type.as_ref()
    }

    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    pub fn parameters(&self) -> Option<&[Name]> {
        self.parameters.as_deref()
    }

    #[inline]
    pub fn in_methods(&self) -> bool {
        self.in_methods
    }

    pub fn with_in_methods(&self) -> Self {
        UJMethod {
            in_methods: true,
            ..self.clone()
        }
    }

    pub fn with_declaring_class(&self, class: Name) -> Self {
        UJMethod {
            declaring_class: Some(class),
            ..self.clone()
        }
    }

    pub fn with_signature(&self, return_type: Option<Name>, parameters: Vec<Name>) -> Self {
        UJMethod {
            return_type: self.return_type.clone().or(return_type),
            parameters: Some(parameters),
            ..self.clone()
        }
    }

    /// Neither the name nor the parameters are known.
    pub fn is_subsignature_unknown(&self) -> bool {
        self.name.is_none() && self.parameters.is_none()
    }

    /// Everything but the return type is known.
    pub fn is_known(&self) -> bool {
        self.declaring_class.is_some() && self.name.is_some() && self.parameters.is_some()
    }

    /// Enough is known to look up target methods in the declaring class.
    pub fn is_resolvable(&self) -> bool {
        self.declaring_class.is_some() && (self.parameters.is_some() || self.in_methods)
    }
}

impl Display for UJMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn or_unknown(n: Option<&Name>) -> &str {
            n.map(Name::as_str).unwrap_or("?")
        }
        write!(
            f,
            "<{}: {} {}(",
            or_unknown(self.declaring_class()),
            or_unknown(self.return_type()),
            or_unknown(self.name())
        )?;
        match self.parameters() {
            Some(ps) => {
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{p}")?;
                }
            }
            None => write!(f, "?")?,
        }
        write!(f, ")>")?;
        if self.in_methods {
            write!(f, "*")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Option<Name> {
        Some(Name::from(s))
    }

    #[test]
    fn predicates() {
        let unknown = UJMethod::new(None, None, None, None);
        assert!(unknown.is_subsignature_unknown());
        assert!(!unknown.is_known());
        assert!(!unknown.is_resolvable());

        let named = UJMethod::new(None, None, n("print3"), None);
        assert!(!named.is_subsignature_unknown());

        let sig = named.with_signature(None, vec![Name::from("java.lang.String")]);
        assert!(!sig.is_known());
        let known = sig.with_declaring_class(Name::from("A"));
        assert!(known.is_known());
        assert!(known.is_resolvable());
        assert_eq!(known.to_string(), "<A: ? print3(java.lang.String)>");

        let all = UJMethod::new(n("A"), None, None, None).with_in_methods();
        assert!(!all.is_known());
        assert!(all.is_resolvable());
        assert_eq!(all.to_string(), "<A: ? ?(?)>*");
    }

    #[test]
    fn refinement_keeps_known_parts() {
        let m = UJMethod::new(None, n("int"), n("f"), None);
        let refined = m
            .with_signature(n("long"), vec![])
            .with_declaring_class(Name::from("B"));
        assert_eq!(refined.return_type(), n("int").as_ref());
        assert_eq!(refined.name(), n("f").as_ref());
        assert_eq!(refined.parameters(), Some(&[][..]));
        // The original value is untouched
        assert_eq!(m.declaring_class(), None);
    }
}
