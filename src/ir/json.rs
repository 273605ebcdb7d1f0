// SPDX-License-Identifier: BSD-3-Clause
//! Serialized form of programs, as read from disk.
//!
//! Names are plain strings here; [`super::Program::new`] checks them and
//! resolves them to handles. Method and field references use the signature
//! syntax `<C: R name(P1,P2)>` and `<C: T name>`.

use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProgramDef {
    /// Signatures of entry methods. When empty, every `static void
    /// main(java.lang.String[])` is an entry.
    #[serde(default)]
    pub entries: Vec<String>,
    pub classes: Vec<ClassDef>,
}

#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassDef {
    pub name: String,
    #[serde(default, rename = "super")]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub interface: bool,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

fn void() -> String {
    crate::name::VOID.to_string()
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MethodDef {
    pub name: String,
    /// Parameter types
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "void")]
    pub ret: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Names of the parameter variables, one per parameter type
    #[serde(default)]
    pub param_names: Vec<String>,
    /// Types of the other local variables. `this` is implicit.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Missing for abstract and library (phantom) methods
    #[serde(default)]
    pub body: Option<Vec<StmtDef>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvokeKindDef {
    Static,
    Special,
    Virtual,
    Interface,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiteralDef {
    Null,
    Int(i64),
    String(String),
    Class(String),
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum StmtDef {
    New {
        lhs: String,
        #[serde(rename = "type")]
        ty: String,
    },
    NewArray {
        lhs: String,
        /// Array type, e.g. `java.lang.Object[]`
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        length: Option<String>,
    },
    Const {
        lhs: String,
        value: LiteralDef,
    },
    Copy {
        lhs: String,
        rhs: String,
    },
    Cast {
        lhs: String,
        rhs: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Load {
        lhs: String,
        base: String,
        field: String,
    },
    Store {
        base: String,
        field: String,
        rhs: String,
    },
    LoadStatic {
        lhs: String,
        field: String,
    },
    StoreStatic {
        field: String,
        rhs: String,
    },
    LoadArray {
        lhs: String,
        base: String,
        #[serde(default)]
        index: Option<String>,
    },
    StoreArray {
        base: String,
        #[serde(default)]
        index: Option<String>,
        rhs: String,
    },
    Invoke {
        kind: InvokeKindDef,
        method: String,
        #[serde(default)]
        base: Option<String>,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        result: Option<String>,
    },
    Return {
        #[serde(default)]
        value: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        let def: ProgramDef = serde_json::from_str(
            r#"{
              "classes": [{
                "name": "Main",
                "methods": [{
                  "name": "main",
                  "static": true,
                  "params": ["java.lang.String[]"],
                  "param-names": ["args"],
                  "vars": {"s": "java.lang.String", "c": "java.lang.Class"},
                  "body": [
                    {"op": "const", "lhs": "s", "value": {"string": "A"}},
                    {"op": "invoke", "kind": "static",
                     "method": "<java.lang.Class: java.lang.Class forName(java.lang.String)>",
                     "args": ["s"], "result": "c"},
                    {"op": "return"}
                  ]
                }]
              }]
            }"#,
        )
        .unwrap();
        let main = &def.classes[0].methods[0];
        assert!(main.is_static);
        assert_eq!(main.ret, "void");
        let body = main.body.as_ref().unwrap();
        assert!(matches!(
            &body[0],
            StmtDef::Const { value: LiteralDef::String(s), .. } if s == "A"
        ));
        assert!(matches!(
            &body[1],
            StmtDef::Invoke { kind: InvokeKindDef::Static, base: None, .. }
        ));
        assert!(matches!(&body[2], StmtDef::Return { value: None }));
    }
}
