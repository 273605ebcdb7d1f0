// SPDX-License-Identifier: BSD-3-Clause
use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use tracing::warn;
use tracing_flame::FlameLayer;
use tracing_subscriber::{fmt, prelude::*};

use yapoo::{assertions, Options, Program, ProgramDef, Report, SignaturePatterns};

mod cli;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn setup_global_subscriber() -> Result<impl Drop> {
    let filter_layer = tracing::level_filters::LevelFilter::TRACE;
    let fmt_layer = fmt::Layer::default();
    let (flame_layer, guard) =
        FlameLayer::with_file("./tracing.folded").context("Couldn't create tracing.folded")?;
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(flame_layer)
        .init();
    Ok(guard)
}

fn setup_warnings() {
    tracing_subscriber::registry()
        .with(tracing::level_filters::LevelFilter::WARN)
        .with(fmt::Layer::default().with_writer(io::stderr))
        .init();
}

fn options(args: &cli::Args) -> Result<Options> {
    let mut opts = match &args.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Couldn't read options at {}", path.display()))?;
            serde_json::from_str(&text).context("Couldn't deserialize options")?
        }
        None => Options::default(),
    };
    if let Some(context) = &args.context {
        opts.context = context.clone();
    }
    if args.no_reflection {
        opts.reflection = false;
    }
    opts.debug |= args.debug;
    opts.metrics |= args.metrics;
    Ok(opts)
}

fn print_section(stdout: &mut impl Write, name: &str, lines: &[String]) -> io::Result<()> {
    writeln!(stdout, "{name}")?;
    writeln!(stdout, "{}", "-".repeat(name.len()))?;
    for l in lines {
        writeln!(stdout, "{l}")?;
    }
    writeln!(stdout)
}

fn print_report(report: &Report) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    print_section(&mut stdout, "reachable", &report.reachable)?;
    let edges: Vec<String> = report
        .call_edges
        .iter()
        .map(|e| format!("{} {} --> {} [{}]", e.site, e.caller, e.callee, e.kind))
        .collect();
    print_section(&mut stdout, "call_edges", &edges)?;
    let pts: Vec<String> = report
        .var_points_to
        .iter()
        .flat_map(|(var, objs)| objs.iter().map(move |o| format!("{var} --> {o}")))
        .collect();
    print_section(&mut stdout, "var_points_to", &pts)
}

fn print_metrics(report: &Report) -> io::Result<()> {
    let Some(m) = &report.metrics else {
        return Ok(());
    };
    let lines = vec![
        format!("callgraph size: {}", m.callgraph_size),
        format!("reachable methods: {}", m.reachable_methods),
        format!("polymorphic call sites: {}", m.poly_call_sites),
        format!("unresolved call sites: {}", m.unresolved_call_sites),
        format!("casts that may fail: {}", m.may_fail_casts),
        format!("points-to size: {}", m.var_points_to_size),
    ];
    print_section(&mut io::stdout().lock(), "metrics", &lines)
}

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = cli::Args::parse();

    let _guard = if args.tracing {
        Some(setup_global_subscriber()?)
    } else {
        setup_warnings();
        None
    };

    let opts = options(&args)?;
    let text = std::fs::read_to_string(&args.program)
        .with_context(|| format!("Couldn't read program at {}", args.program.display()))?;
    let def: ProgramDef = serde_json::from_str(&text).context("Couldn't deserialize program")?;
    let mut program = Program::new(&def).context("Malformed program")?;
    if !args.entry.is_empty() {
        let patterns = SignaturePatterns::new(&args.entry).context("Bad entry pattern")?;
        program.set_entries_matching(&patterns)?;
    }

    let out = yapoo::analysis(&program, &opts).context("Analysis failed")?;
    let report = out.report();

    if args.json {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        if !args.quiet {
            print_report(&report)?;
        }
        if opts.metrics {
            print_metrics(&report)?;
        }
    }

    if args.check != cli::Check::None {
        let failures = assertions::check(&out);
        for f in &failures {
            warn!("Assertion failed: {f}");
        }
        if args.check == cli::Check::Strict && !failures.is_empty() {
            return Err(anyhow!("{} assertions failed", failures.len()));
        }
    }

    Ok(())
}
