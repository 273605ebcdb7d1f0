// SPDX-License-Identifier: BSD-3-Clause
use std::fmt::Display;

use triomphe::Arc;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const CLASS_LOADER: &str = "java.lang.ClassLoader";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const STRING_BUILDER: &str = "java.lang.StringBuilder";
pub const STRING_BUFFER: &str = "java.lang.StringBuffer";
pub const CLONEABLE: &str = "java.lang.Cloneable";
pub const SERIALIZABLE: &str = "java.io.Serializable";
pub const METHOD: &str = "java.lang.reflect.Method";
pub const CONSTRUCTOR: &str = "java.lang.reflect.Constructor";
pub const FIELD: &str = "java.lang.reflect.Field";
pub const ARRAY: &str = "java.lang.reflect.Array";

/// Type of class literals whose class could not be determined.
pub const UNKNOWN_CLASS: &str = "$unknown";

pub const INIT: &str = "<init>";
pub const CLINIT: &str = "<clinit>";
pub const VOID: &str = "void";

const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double", VOID,
];

/// An immutable, cheaply clonable name of a class, type, method, field or
/// variable.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name(Arc<String>);

impl Name {
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn array_of(&self) -> Name {
        Name::from(format!("{}[]", self.0))
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(Arc::new(s.to_string()))
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(Arc::new(s))
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_str() == *other
    }
}

impl std::borrow::Borrow<str> for Name {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn is_primitive(ty: &str) -> bool {
    PRIMITIVES.contains(&ty)
}

/// Types whose values may be objects: classes, interfaces and arrays.
pub fn is_reference(ty: &str) -> bool {
    !is_primitive(ty)
}

pub fn element_type(ty: &str) -> Option<&str> {
    ty.strip_suffix("[]")
}
