// SPDX-License-Identifier: BSD-3-Clause
// To debug or develop a test, try `eprintln!("{}", serde_json::to_string_pretty(&out.report()).unwrap())`

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use yapoo::analysis::callgraph::CallKind;
use yapoo::assertions::{self, Failure};
use yapoo::element::{CsObjId, CsVar, PointerId};
use yapoo::heap::{MockDesc, Obj};
use yapoo::ir::{MethodId, Stmt, StmtRef, VarId};
use yapoo::pts::PointsToSet;
use yapoo::{analysis, analysis_with, Error, Options, Plugin, PointerAnalysis, Program, ProgramDef, Solver};

// ------------------------------------------------------------------
// Helpers

fn load(program: &str) -> Program {
    let path = format!("tests/reflection/{}", program);
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

/// The first invocation of a method called `callee` in `method_sig`.
fn site(p: &Program, method_sig: &str, callee: &str) -> StmtRef {
    let m = method(p, method_sig);
    p.method(m)
        .stmts()
        .iter()
        .position(|s| matches!(s, Stmt::Invoke(i) if i.method.name == callee))
        .map(|i| StmtRef::new(m, i))
        .unwrap_or_else(|| panic!("no call to {callee}"))
}

const MAIN: &str = "<Main: void main(java.lang.String[])>";

fn opts(context: &str) -> Options {
    Options {
        context: context.to_string(),
        metrics: true,
        ..Options::default()
    }
}

fn run<'p>(program: &'p Program, context: &str) -> (PointerAnalysis<'p>, Vec<Failure>) {
    let out = analysis(program, &opts(context)).unwrap();
    let failures = assertions::check(&out);
    (out, failures)
}

/// All assertions must hold.
fn check<'p>(program: &'p Program, context: &str) -> PointerAnalysis<'p> {
    let (out, failures) = run(program, context);
    assert!(failures.is_empty(), "{context}: {failures:#?}");
    out
}

/// Targets of the reflective calls at `site`, leaving out the library
/// method modelling the call.
fn reflective_callees(out: &PointerAnalysis<'_>, site: StmtRef) -> BTreeSet<MethodId> {
    out.call_edges()
        .into_iter()
        .filter(|&(s, _, kind)| s == site && kind == CallKind::Reflective)
        .map(|(_, m, _)| m)
        .collect()
}

fn types(out: &PointerAnalysis<'_>, var: VarId) -> Vec<String> {
    out.var_points_to(var)
        .into_iter()
        .map(|o| out.heap().type_of(o).to_string())
        .collect()
}

fn strings(out: &PointerAnalysis<'_>, var: VarId) -> Vec<String> {
    out.var_points_to(var)
        .into_iter()
        .map(|o| out.obj_string(o))
        .collect()
}

fn meta_objs(out: &PointerAnalysis<'_>) -> usize {
    out.heap()
        .objs()
        .filter(|(_, o)| matches!(o, Obj::Mock(m) if m.desc == MockDesc::ReflectionMetaObj))
        .count()
}

// ------------------------------------------------------------------
// Recorder

#[derive(Debug, Default)]
struct Log {
    new_methods: Vec<MethodId>,
    seen: FxHashSet<(PointerId, CsObjId)>,
    events: usize,
    violations: Vec<String>,
}

struct Recorder(Rc<RefCell<Log>>);

impl Plugin for Recorder {
    fn on_new_method(&mut self, _solver: &mut Solver<'_>, method: MethodId) -> Result<(), Error> {
        self.0.borrow_mut().new_methods.push(method);
        Ok(())
    }

    fn on_new_points_to_set(
        &mut self,
        solver: &mut Solver<'_>,
        var: CsVar,
        diff: &PointsToSet,
    ) -> Result<(), Error> {
        let mut log = self.0.borrow_mut();
        log.events += 1;
        if diff.is_empty() {
            log.violations.push(format!("empty diff for {var:?}"));
        }
        for o in diff.iter() {
            if !solver.var_points_to(var.context, var.var).contains(o) {
                log.violations.push(format!("{o:?} not merged into {var:?}"));
            }
            if !log.seen.insert((var.pointer, o)) {
                log.violations.push(format!("{o:?} reported twice for {var:?}"));
            }
        }
        Ok(())
    }
}

fn recorded<'p>(program: &'p Program, context: &str) -> (PointerAnalysis<'p>, Log) {
    let log = Rc::new(RefCell::new(Log::default()));
    let out = analysis_with(
        program,
        &opts(context),
        vec![Box::new(Recorder(Rc::clone(&log)))],
    )
    .unwrap();
    let log = log.take();
    (out, log)
}

// ------------------------------------------------------------------

#[test]
fn super_basic_ci() {
    let p = load("super-basic.json");
    let out = check(&p, "ci");
    let invoke = site(&p, MAIN, "invoke");
    let print3 = method(&p, "<A: void print3(java.lang.String,java.lang.String)>");
    assert_eq!(reflective_callees(&out, invoke), BTreeSet::from([print3]));
    assert!(out.callees(invoke).contains(&print3));
    assert_eq!(strings(&out, var(&p, MAIN, "c")), vec!["A.class"]);
}

#[test]
fn super_basic_1_call() {
    let p = load("super-basic.json");
    let _out = check(&p, "1-call");
}

#[test]
fn super_basic_2_obj() {
    let p = load("super-basic.json");
    let _out = check(&p, "2-obj");
}

#[test]
fn super_basic_1_type() {
    let p = load("super-basic.json");
    let _out = check(&p, "1-type");
}

#[test]
fn super_basic_without_reflection() {
    let p = load("super-basic.json");
    let opts = Options {
        reflection: false,
        ..Options::default()
    };
    let out = analysis(&p, &opts).unwrap();
    let failing: Vec<String> = assertions::check(&out)
        .iter()
        .map(|f| f.assertion.to_string())
        .collect();
    // Assertions about variables of unreachable methods are not checked
    assert_eq!(failing, vec!["assert_reachable"]);
    assert!(reflective_callees(&out, site(&p, MAIN, "invoke")).is_empty());
}

#[test]
fn interface_parameter() {
    let p = load("interface-param.json");
    let out = check(&p, "ci");
    let run = method(&p, "<A: void run(Task)>");
    assert!(out.is_reachable(run));
    assert_eq!(
        reflective_callees(&out, site(&p, MAIN, "invoke")),
        BTreeSet::from([run])
    );
    assert_eq!(types(&out, var(&p, "<A: void run(Task)>", "t")), vec!["Job"]);
}

#[test]
fn interface_parameter_1_obj() {
    let p = load("interface-param.json");
    let _out = check(&p, "1-obj");
}

#[test]
fn negative_argument_length() {
    let p = load("negative-length.json");
    let err = analysis(&p, &opts("ci")).map(|_| ()).unwrap_err();
    assert!(matches!(err, Error::Invariant(_)), "{err}");
}

#[test]
fn unknown_name() {
    let p = load("unknown-name.json");
    let out = check(&p, "ci");
    let callees = reflective_callees(&out, site(&p, MAIN, "invoke"));
    assert_eq!(
        callees,
        BTreeSet::from([
            method(&p, "<A: void foo(java.lang.String)>"),
            method(&p, "<A: void baz(java.lang.Object)>"),
        ])
    );
    assert_eq!(strings(&out, var(&p, MAIN, "c")), vec!["$unknown.class"]);
}

#[test]
fn unknown_name_1_call() {
    let p = load("unknown-name.json");
    let _out = check(&p, "1-call");
}

#[test]
fn for_name() {
    let p = load("for-name.json");
    let (out, log) = recorded(&p, "ci");
    assert!(assertions::check(&out).is_empty());
    assert_eq!(strings(&out, var(&p, MAIN, "c1")), vec!["B.class"]);
    assert_eq!(strings(&out, var(&p, MAIN, "c4")), vec!["$unknown.class"]);
    let clinit = method(&p, "<B: void <clinit>()>");
    assert!(out.is_reachable(clinit));
    assert_eq!(log.new_methods.iter().filter(|&&m| m == clinit).count(), 1);
    assert!(log.violations.is_empty(), "{:#?}", log.violations);
}

#[test]
fn get_methods() {
    let p = load("get-methods.json");
    let out = check(&p, "ci");
    assert_eq!(
        reflective_callees(&out, site(&p, MAIN, "invoke")),
        BTreeSet::from([method(&p, "<A: void run()>")])
    );
    assert_eq!(types(&out, var(&p, MAIN, "ms")), vec!["java.lang.reflect.Method[]"]);
}

#[test]
fn new_instance() {
    let p = load("new-instance.json");
    let out = check(&p, "ci");
    assert_eq!(types(&out, var(&p, MAIN, "x")), vec!["A"]);
    assert_eq!(types(&out, var(&p, MAIN, "z")), vec!["A"]);
    assert_eq!(types(&out, var(&p, MAIN, "arr")), vec!["A[]"]);
    let init = method(&p, "<A: void <init>()>");
    assert_eq!(
        reflective_callees(&out, site(&p, MAIN, "newInstance")),
        BTreeSet::from([init])
    );
}

#[test]
fn new_instance_2_obj() {
    let p = load("new-instance.json");
    let _out = check(&p, "2-obj");
}

#[test]
fn fields() {
    let p = load("fields.json");
    let _out = check(&p, "ci");
}

#[test]
fn fields_1_obj() {
    let p = load("fields.json");
    let _out = check(&p, "1-obj");
}

#[test]
fn static_by_cast() {
    let p = load("static-by-cast.json");
    let out = check(&p, "ci");
    assert_eq!(
        reflective_callees(&out, site(&p, MAIN, "invoke")),
        BTreeSet::from([method(&p, "<Factory: B make(java.lang.String)>")])
    );
    assert_eq!(types(&out, var(&p, MAIN, "b")), vec!["B"]);
}

#[test]
fn lookup_collapses_contexts() {
    let p = load("lookup-helper.json");
    let ci = check(&p, "ci");
    let cs = check(&p, "1-call");
    // One descriptor for the call site, shared by both calling contexts
    assert_eq!(meta_objs(&ci), 1);
    assert_eq!(meta_objs(&cs), 1);
    assert_eq!(
        strings(&cs, var(&p, MAIN, "m1")),
        strings(&cs, var(&p, MAIN, "m2"))
    );
}

#[test]
fn points_to_sets_grow() {
    for program in ["super-basic.json", "unknown-name.json", "static-by-cast.json"] {
        let p = load(program);
        let (_out, log) = recorded(&p, "1-call");
        assert!(log.events > 0, "{program}");
        assert!(log.violations.is_empty(), "{program}: {:#?}", log.violations);
    }
}

#[test]
fn context_sensitivity_keeps_callgraph() {
    let p = load("unknown-name.json");
    let ci = check(&p, "ci");
    let cs = check(&p, "1-call");
    assert_eq!(ci.call_edges(), cs.call_edges());
    assert_eq!(ci.reachable_methods().len(), cs.reachable_methods().len());
}
