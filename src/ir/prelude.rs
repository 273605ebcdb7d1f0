// SPDX-License-Identifier: BSD-3-Clause
//! Library classes every program may refer to without declaring them.
//!
//! Their methods have no bodies; the analysis gives them meaning through
//! plugins (e.g. reflection) or not at all.

use super::json::{ClassDef, MethodDef};
use crate::name;

fn method(name: &str, params: &[&str], ret: &str, is_static: bool) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        ret: ret.to_string(),
        is_static,
        is_abstract: false,
        param_names: Vec::new(),
        vars: Default::default(),
        body: None,
    }
}

fn class(name: &str, superclass: Option<&str>, methods: Vec<MethodDef>) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        superclass: superclass.map(str::to_string),
        methods,
        ..ClassDef::default()
    }
}

fn interface(name: &str) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        interface: true,
        ..ClassDef::default()
    }
}

fn constructor(params: &[&str]) -> MethodDef {
    let mut m = method(name::INIT, params, name::VOID, false);
    // Constructors of library classes do nothing observable to the analysis
    m.body = Some(Vec::new());
    m
}

pub(crate) fn classes() -> Vec<ClassDef> {
    let obj = Some(name::OBJECT);
    let str_ty = name::STRING;
    let class_arr = "java.lang.Class[]";
    let obj_arr = "java.lang.Object[]";
    vec![
        class(name::OBJECT, None, vec![constructor(&[])]),
        interface(name::CLONEABLE),
        interface(name::SERIALIZABLE),
        class(
            name::STRING,
            obj,
            vec![constructor(&[]), method(name::INIT, &[str_ty], name::VOID, false)],
        ),
        class(name::STRING_BUILDER, obj, vec![constructor(&[])]),
        class(name::STRING_BUFFER, obj, vec![constructor(&[])]),
        class("java.lang.Integer", obj, vec![]),
        class(name::THROWABLE, obj, vec![constructor(&[])]),
        class("java.lang.Exception", Some(name::THROWABLE), vec![constructor(&[])]),
        class(
            "java.lang.RuntimeException",
            Some("java.lang.Exception"),
            vec![constructor(&[])],
        ),
        class(name::CLASS_LOADER, obj, vec![]),
        class(
            name::CLASS,
            obj,
            vec![
                method("forName", &[str_ty], name::CLASS, true),
                method(
                    "forName",
                    &[str_ty, "boolean", name::CLASS_LOADER],
                    name::CLASS,
                    true,
                ),
                method("newInstance", &[], name::OBJECT, false),
                method("getMethod", &[str_ty, class_arr], name::METHOD, false),
                method("getMethods", &[], "java.lang.reflect.Method[]", false),
                method("getDeclaredMethod", &[str_ty, class_arr], name::METHOD, false),
                method("getConstructor", &[class_arr], name::CONSTRUCTOR, false),
                method("getDeclaredConstructor", &[class_arr], name::CONSTRUCTOR, false),
                method("getField", &[str_ty], name::FIELD, false),
                method("getDeclaredField", &[str_ty], name::FIELD, false),
            ],
        ),
        class(
            name::METHOD,
            obj,
            vec![method("invoke", &[name::OBJECT, obj_arr], name::OBJECT, false)],
        ),
        class(
            name::CONSTRUCTOR,
            obj,
            vec![method("newInstance", &[obj_arr], name::OBJECT, false)],
        ),
        class(
            name::FIELD,
            obj,
            vec![
                method("get", &[name::OBJECT], name::OBJECT, false),
                method("set", &[name::OBJECT, name::OBJECT], name::VOID, false),
            ],
        ),
        class(
            name::ARRAY,
            obj,
            vec![method("newInstance", &[name::CLASS, "int"], name::OBJECT, true)],
        ),
    ]
}
