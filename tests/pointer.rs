// SPDX-License-Identifier: BSD-3-Clause
// To debug or develop a test, try `eprintln!("{}", serde_json::to_string_pretty(&out.report()).unwrap())`

use yapoo::assertions::{self, Failure};
use yapoo::ir::{MethodId, VarId};
use yapoo::{analysis, Options, PointerAnalysis, Program, ProgramDef};

// ------------------------------------------------------------------
// Helpers

fn load(program: &str, dir: &str) -> Program {
    let path = format!("tests/{}/{}", dir, program);
    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{path}: {e}"));
    let def: ProgramDef = serde_json::from_str(&text).unwrap();
    Program::new(&def).unwrap()
}

fn method(p: &Program, sig: &str) -> MethodId {
    p.methods()
        .iter()
        .find(|m| m.signature == sig)
        .unwrap_or_else(|| panic!("no method {sig}"))
        .id
}

fn var(p: &Program, method_sig: &str, name: &str) -> VarId {
    let m = method(p, method_sig);
    p.vars()
        .iter()
        .find(|v| v.method == m && v.name == name)
        .unwrap_or_else(|| panic!("no var {name}"))
        .id
}

const MAIN: &str = "<Main: void main(java.lang.String[])>";

fn run<'p>(program: &'p Program, context: &str) -> (PointerAnalysis<'p>, Vec<Failure>) {
    let opts = Options {
        context: context.to_string(),
        metrics: true,
        ..Options::default()
    };
    let out = analysis(program, &opts).unwrap();
    let failures = assertions::check(&out);
    (out, failures)
}

/// All assertions must hold.
fn check<'p>(program: &'p Program, context: &str) -> PointerAnalysis<'p> {
    let (out, failures) = run(program, context);
    assert!(failures.is_empty(), "{context}: {failures:#?}");
    out
}

/// Names of the failing assertions.
fn failing(program: &Program, context: &str) -> Vec<String> {
    let (_, failures) = run(program, context);
    failures.iter().map(|f| f.assertion.to_string()).collect()
}

fn sound(program: &str) -> Program {
    load(program, "pointer/soundness")
}

fn precise(program: &str) -> Program {
    load(program, "pointer/precision")
}

// ------------------------------------------------------------------

#[test]
fn arrays_ci() {
    let p = sound("arrays.json");
    let _out = check(&p, "ci");
}

#[test]
fn arrays_1_call() {
    let p = sound("arrays.json");
    let _out = check(&p, "1-call");
}

#[test]
fn arrays_2_obj() {
    let p = sound("arrays.json");
    let _out = check(&p, "2-obj");
}

#[test]
fn arrays_1_type() {
    let p = sound("arrays.json");
    let _out = check(&p, "1-type");
}

#[test]
fn dispatch_ci() {
    let p = sound("dispatch.json");
    let out = check(&p, "ci");
    assert!(out.is_reachable(method(&p, "<Config: void <clinit>()>")));
    assert!(!out.is_reachable(method(&p, "<Slow: java.lang.Object run()>")));
    let m = out.metrics().unwrap();
    assert_eq!(m.unresolved_call_sites, 0);
    assert_eq!(m.poly_call_sites, 0);
}

#[test]
fn dispatch_1_call() {
    let p = sound("dispatch.json");
    let _out = check(&p, "1-call");
}

#[test]
fn dispatch_2_obj() {
    let p = sound("dispatch.json");
    let _out = check(&p, "2-obj");
}

#[test]
fn dispatch_1_type() {
    let p = sound("dispatch.json");
    let _out = check(&p, "1-type");
}

#[test]
fn fields_ci() {
    let p = sound("fields.json");
    let out = check(&p, "ci");
    // Both boxes share `set` and `get`
    assert_eq!(out.var_points_to(var(&p, MAIN, "r1")).len(), 2);
}

#[test]
fn fields_1_call() {
    let p = sound("fields.json");
    let out = check(&p, "1-call");
    assert_eq!(out.var_points_to(var(&p, MAIN, "r1")).len(), 1);
}

#[test]
fn fields_1_obj() {
    let p = sound("fields.json");
    let out = check(&p, "1-obj");
    assert_eq!(out.var_points_to(var(&p, MAIN, "r1")).len(), 1);
}

#[test]
fn fields_2_type() {
    let p = sound("fields.json");
    let _out = check(&p, "2-type:1");
}

#[test]
fn casts_ci() {
    let p = sound("casts.json");
    let out = check(&p, "ci");
    // Each cast of `y` into `x` lets its own type through
    assert_eq!(out.var_points_to(var(&p, MAIN, "x")).len(), 2);
    assert_eq!(out.var_points_to(var(&p, MAIN, "z")).len(), 1);
}

#[test]
fn casts_2_obj() {
    let p = sound("casts.json");
    let _out = check(&p, "2-obj");
}

#[test]
fn boxes_imprecise() {
    let p = precise("boxes.json");
    assert_eq!(failing(&p, "ci"), vec!["assert_disjoint", "assert_disjoint"]);
    // Both boxes are allocated in `Main`
    assert_eq!(failing(&p, "1-type"), vec!["assert_disjoint", "assert_disjoint"]);
}

#[test]
fn boxes_1_call() {
    let p = precise("boxes.json");
    let _out = check(&p, "1-call");
}

#[test]
fn boxes_1_obj() {
    let p = precise("boxes.json");
    let _out = check(&p, "1-obj");
}

#[test]
fn call_site_imprecise() {
    let p = precise("call-site.json");
    assert_eq!(failing(&p, "ci"), vec!["assert_disjoint"]);
    // Static calls keep the context of the caller
    assert_eq!(failing(&p, "1-obj"), vec!["assert_disjoint"]);
}

#[test]
fn call_site_1_call() {
    let p = precise("call-site.json");
    let out = check(&p, "1-call");
    let ci = check_report(&p);
    assert!(out.metrics().unwrap().var_points_to_size < ci);
}

fn check_report(p: &Program) -> usize {
    let (out, _) = run(p, "ci");
    let report = out.report();
    assert_eq!(report.context, "ci");
    assert!(report.reachable.iter().any(|m| m == MAIN));
    out.metrics().unwrap().var_points_to_size
}

#[test]
fn entry_patterns() {
    let mut p = sound("fields.json");
    let patterns = yapoo::SignaturePatterns::new(["^<Box: java.lang.Object get"]).unwrap();
    p.set_entries_matching(&patterns).unwrap();
    let out = analysis(&p, &Options::default()).unwrap();
    assert_eq!(out.reachable_methods(), &[method(&p, "<Box: java.lang.Object get()>")]);
}
