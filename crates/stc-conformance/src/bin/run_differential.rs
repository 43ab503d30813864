#![forbid(unsafe_code)]

use stc_conformance::{HarnessConfig, run_all_core_suites};

fn main() {
    if let Err(err) = run() {
        eprintln!("run_differential failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut cfg = HarnessConfig::default_paths();
    // pin the seed up front so the report and the failure lines agree
    let seed = cfg.resolved_seed();
    cfg.seed = Some(seed);

    let suites = run_all_core_suites(&cfg)?;
    let mut failed = false;
    for suite in &suites {
        println!(
            "{}: cases={} passed={} failed={}",
            suite.suite,
            suite.case_count,
            suite.pass_count,
            suite.case_count.saturating_sub(suite.pass_count)
        );
        for failure in &suite.failures {
            eprintln!("  {failure}");
        }
        failed |= !suite.all_passed();
    }

    println!("seed=0x{seed:016X}");
    println!(
        "wrote {}",
        cfg.report_root.join("differential_report.json").display()
    );
    if failed {
        return Err("search and brute-force scan disagree".to_string());
    }
    Ok(())
}
