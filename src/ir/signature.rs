// SPDX-License-Identifier: BSD-3-Clause
use std::fmt::Display;
use std::sync::OnceLock;

use regex::{Regex, RegexSet};

use super::error::Error;
use crate::name::Name;

fn method_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^<([^:<>\s]+): (\S+) ([^\s(]+)\(([^)]*)\)>$").expect("method signature regex")
    })
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<([^:<>\s]+): (\S+) ([^\s>]+)>$").expect("field signature regex"))
}

/// Name and parameter types, the part of a method signature used for
/// dispatch.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Subsig {
    pub name: Name,
    pub params: Vec<Name>,
}

/// Symbolic reference to a method, `<C: R name(P1,P2)>`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct MethodRef {
    pub class: Name,
    pub ret: Name,
    pub name: Name,
    pub params: Vec<Name>,
}

impl MethodRef {
    pub fn parse(s: &str) -> Result<Self, Error> {
        let caps = method_regex()
            .captures(s.trim())
            .ok_or_else(|| Error(format!("Bad method signature: {s}")))?;
        let params = caps[4]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Name::from)
            .collect();
        Ok(MethodRef {
            class: Name::from(&caps[1]),
            ret: Name::from(&caps[2]),
            name: Name::from(&caps[3]),
            params,
        })
    }

    pub fn subsig(&self) -> Subsig {
        Subsig {
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }
}

pub(crate) fn format_method(
    f: &mut std::fmt::Formatter<'_>,
    class: &str,
    ret: &str,
    name: &str,
    params: &[Name],
) -> std::fmt::Result {
    write!(f, "<{class}: {ret} {name}(")?;
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{p}")?;
    }
    write!(f, ")>")
}

impl Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        format_method(f, self.class.as_str(), self.ret.as_str(), self.name.as_str(), &self.params)
    }
}

/// Symbolic reference to a field, `<C: T name>`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FieldRef {
    pub class: Name,
    pub ty: Name,
    pub name: Name,
}

impl FieldRef {
    pub fn parse(s: &str) -> Result<Self, Error> {
        let caps = field_regex()
            .captures(s.trim())
            .ok_or_else(|| Error(format!("Bad field signature: {s}")))?;
        Ok(FieldRef {
            class: Name::from(&caps[1]),
            ty: Name::from(&caps[2]),
            name: Name::from(&caps[3]),
        })
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}: {} {}>", self.class, self.ty, self.name)
    }
}

/// A set of regular expressions over method signatures, used to pick entry
/// methods.
#[derive(Debug)]
pub struct SignaturePatterns {
    set: RegexSet,
}

impl SignaturePatterns {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(SignaturePatterns {
            set: RegexSet::new(patterns)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn matches(&self, signature: &str) -> bool {
        self.set.is_match(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method() {
        let m = MethodRef::parse("<A: void print3(java.lang.String,java.lang.String)>").unwrap();
        assert_eq!(m.class, "A");
        assert_eq!(m.ret, "void");
        assert_eq!(m.name, "print3");
        assert_eq!(m.params, vec![Name::from("java.lang.String"); 2]);
        assert_eq!(m.to_string(), "<A: void print3(java.lang.String,java.lang.String)>");

        let init = MethodRef::parse("<java.lang.Object: void <init>()>").unwrap();
        assert_eq!(init.name, "<init>");
        assert!(init.params.is_empty());

        assert!(MethodRef::parse("A.print3").is_err());
    }

    #[test]
    fn field() {
        let f = FieldRef::parse("<A: B[] f>").unwrap();
        assert_eq!(f.class, "A");
        assert_eq!(f.ty, "B[]");
        assert_eq!(f.name, "f");
        assert!(FieldRef::parse("<A: f>").is_err());
    }

    #[test]
    fn patterns() {
        let p = SignaturePatterns::new(["main\\(", "^<Test: "]).unwrap();
        assert!(p.matches("<Main: void main(java.lang.String[])>"));
        assert!(p.matches("<Test: void run()>"));
        assert!(!p.matches("<Other: void run()>"));
    }
}
