//! `pipegen test`: simulate an operator against its exact model.
//!
//! Builds the test cases (standard cases first, then random or exhaustive
//! ones), runs them through the cycle-accurate simulator, and reports every
//! mismatch as a V001 diagnostic. A failing case does not stop the run.

use pipegen_testbench::{TestBench, TestPlan};

use crate::pipeline::{config_path, generate, load_with_overrides, render_diagnostics, Generated};
use crate::{GlobalArgs, ReportFormat, TestArgs};

/// Runs the `pipegen test` command. Returns exit code 0 if every case
/// passed, 1 otherwise.
pub fn run(args: &TestArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let path = config_path(global)?;
    let config = load_with_overrides(path.as_deref(), &args.params)?;
    let Some(Generated { config, ctx, model }) = generate(config, global, args.format)? else {
        return Ok(1);
    };

    let mut plan = TestPlan::from_config(&config);
    if let Some(n) = args.random_tests {
        plan.random_tests = n;
    }
    let text = !global.quiet && args.format == ReportFormat::Text;
    if text {
        eprintln!("   Testing {}", model.operator().name);
    }

    let bench = TestBench::generate(model.as_ref(), &plan, ctx.sink())?;
    let report = bench.simulate(ctx.sink())?;
    render_diagnostics(ctx.sink(), global, args.format);

    if text {
        if report.passed() {
            eprintln!("   Result: {} case(s) passed", report.cases);
        } else {
            eprintln!(
                "   Result: {} of {} case(s) failed",
                report.failed_cases(),
                report.cases
            );
        }
    }
    Ok(if report.passed() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    fn args(params: &[&str]) -> TestArgs {
        TestArgs {
            params: params.iter().map(|s| s.to_string()).collect(),
            random_tests: Some(50),
            format: ReportFormat::Text,
        }
    }

    #[test]
    fn generated_operators_pass() {
        for params in [
            ["name=IntAdder", "win=20", "seed=3"].as_slice(),
            ["name=FPMult", "we=5", "wf=10"].as_slice(),
            ["name=LZOCShifterSticky", "win=16", "wout=10", "count=one"].as_slice(),
        ] {
            assert_eq!(run(&args(params), &global(None)).unwrap(), 0, "{params:?}");
        }
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let absent = std::env::temp_dir().join("pipegen-absent").join("pipegen.toml");
        let global = global(Some(absent.to_string_lossy().into_owned()));
        assert!(run(&args(&["name=IntAdder", "win=8"]), &global).is_err());
    }
}
