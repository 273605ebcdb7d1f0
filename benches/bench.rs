// SPDX-License-Identifier: BSD-3-Clause
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use yapoo::{analysis, Options, Program, ProgramDef};

// ------------------------------------------------------------------
// Helpers

fn load(program: &str, dir: &str) -> Program {
    let path = format!("tests/{}/{}", dir, program);
    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{path}: {e}"));
    let def: ProgramDef = serde_json::from_str(&text).unwrap();
    Program::new(&def).unwrap()
}

fn invoke(kind: &str, method: &str, base: Option<&str>, args: &[&str], result: Option<&str>) -> Value {
    let mut stmt = json!({"op": "invoke", "kind": kind, "method": method, "args": args});
    if let Some(base) = base {
        stmt["base"] = json!(base);
    }
    if let Some(result) = result {
        stmt["result"] = json!(result);
    }
    stmt
}

/// `n` subclasses of `Base`, each overriding `step`, which wraps its
/// argument in a fresh `Cell`. `main` allocates one of each, chains them
/// through virtual calls, and looks half of them up reflectively.
fn synthetic(n: usize) -> Program {
    let step = || {
        let body = json!([
            {"op": "new", "lhs": "c", "type": "Cell"},
            invoke("special", "<Cell: void <init>()>", Some("c"), &[], None),
            {"op": "store", "base": "c", "field": "<Cell: java.lang.Object val>", "rhs": "o"},
            {"op": "store", "base": "this", "field": "<Base: Cell last>", "rhs": "c"},
            {"op": "return", "value": "c"}
        ]);
        json!({
            "name": "step",
            "params": ["java.lang.Object"],
            "param-names": ["o"],
            "ret": "java.lang.Object",
            "vars": {"c": "Cell"},
            "body": body
        })
    };
    let mut classes = vec![
        json!({
            "name": "Cell",
            "fields": [{"name": "val", "type": "java.lang.Object"}],
            "methods": [{"name": "<init>", "body": [{"op": "return"}]}]
        }),
        json!({
            "name": "Base",
            "fields": [{"name": "last", "type": "Cell"}],
            "methods": [{"name": "<init>", "body": [{"op": "return"}]}, step()]
        }),
    ];
    let mut vars = serde_json::Map::new();
    let mut body = Vec::new();
    vars.insert("x".into(), json!("java.lang.Object"));
    vars.insert("types".into(), json!("java.lang.Class[]"));
    vars.insert("name".into(), json!("java.lang.String"));
    vars.insert("len".into(), json!("int"));
    vars.insert("i0".into(), json!("int"));
    vars.insert("arr".into(), json!("java.lang.Object[]"));
    body.push(json!({"op": "new", "lhs": "x", "type": "java.lang.Object"}));
    body.push(json!({"op": "const", "lhs": "types", "value": "null"}));
    body.push(json!({"op": "const", "lhs": "name", "value": {"string": "step"}}));
    body.push(json!({"op": "const", "lhs": "len", "value": {"int": 1}}));
    body.push(json!({"op": "const", "lhs": "i0", "value": {"int": 0}}));
    body.push(json!({"op": "new-array", "lhs": "arr", "type": "java.lang.Object[]", "length": "len"}));
    body.push(json!({"op": "store-array", "base": "arr", "index": "i0", "rhs": "x"}));
    for i in 0..n {
        let class = format!("C{i}");
        classes.push(json!({
            "name": class,
            "super": "Base",
            "methods": [{"name": "<init>", "body": [{"op": "return"}]}, step()]
        }));
        let (b, y, s, c, m) = (
            format!("b{i}"),
            format!("y{i}"),
            format!("s{i}"),
            format!("c{i}"),
            format!("m{i}"),
        );
        vars.insert(b.clone(), json!("Base"));
        vars.insert(y.clone(), json!("java.lang.Object"));
        body.push(json!({"op": "new", "lhs": b, "type": class}));
        body.push(invoke("special", &format!("<{class}: void <init>()>"), Some(b.as_str()), &[], None));
        body.push(invoke(
            "virtual",
            "<Base: java.lang.Object step(java.lang.Object)>",
            Some(b.as_str()),
            &["x"],
            Some(y.as_str()),
        ));
        body.push(json!({"op": "copy", "lhs": "x", "rhs": y}));
        if i % 2 == 0 {
            vars.insert(s.clone(), json!("java.lang.String"));
            vars.insert(c.clone(), json!("java.lang.Class"));
            vars.insert(m.clone(), json!("java.lang.reflect.Method"));
            body.push(json!({"op": "const", "lhs": s, "value": {"string": class}}));
            body.push(invoke(
                "static",
                "<java.lang.Class: java.lang.Class forName(java.lang.String)>",
                None,
                &[s.as_str()],
                Some(c.as_str()),
            ));
            body.push(invoke(
                "virtual",
                "<java.lang.Class: java.lang.reflect.Method getMethod(java.lang.String,java.lang.Class[])>",
                Some(c.as_str()),
                &["name", "types"],
                Some(m.as_str()),
            ));
            body.push(invoke(
                "virtual",
                "<java.lang.reflect.Method: java.lang.Object invoke(java.lang.Object,java.lang.Object[])>",
                Some(m.as_str()),
                &[b.as_str(), "arr"],
                None,
            ));
        }
    }
    body.push(json!({"op": "return"}));
    classes.push(json!({
        "name": "Main",
        "methods": [{
            "name": "main",
            "static": true,
            "params": ["java.lang.String[]"],
            "param-names": ["args"],
            "vars": vars,
            "body": body
        }]
    }));
    let def: ProgramDef = serde_json::from_value(json!({"classes": classes})).unwrap();
    Program::new(&def).unwrap()
}

fn opts(context: &str) -> Options {
    Options {
        context: context.to_string(),
        ..Options::default()
    }
}

// ------------------------------------------------------------------

pub fn synthetic_ci(c: &mut Criterion) {
    let p = synthetic(200);
    let opts = opts("ci");
    c.bench_function("analysis(synthetic-200, ci)", |b| {
        b.iter(|| analysis(black_box(&p), &opts))
    });
}

pub fn synthetic_2_obj(c: &mut Criterion) {
    let p = synthetic(200);
    let opts = opts("2-obj");
    c.bench_function("analysis(synthetic-200, 2-obj)", |b| {
        b.iter(|| analysis(black_box(&p), &opts))
    });
}

pub fn synthetic_1_call(c: &mut Criterion) {
    let p = synthetic(200);
    let opts = opts("1-call");
    c.bench_function("analysis(synthetic-200, 1-call)", |b| {
        b.iter(|| analysis(black_box(&p), &opts))
    });
}

pub fn unknown_name(c: &mut Criterion) {
    let p = load("unknown-name.json", "reflection");
    let opts = opts("2-type");
    c.bench_function("analysis(unknown-name, 2-type)", |b| {
        b.iter(|| analysis(black_box(&p), &opts))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = synthetic_ci, synthetic_2_obj, synthetic_1_call, unknown_name
}
criterion_main!(benches);
