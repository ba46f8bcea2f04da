//! `pipegen gen`: write the VHDL of an operator.
//!
//! Builds the operator named by the configuration, emits every entity of
//! the design children first, prints the content hash of the text and the
//! entity tree with pipeline depths, and optionally writes the testbench.

use std::path::Path;

use pipegen_common::ContentHash;
use pipegen_testbench::{TestBench, TestPlan};
use pipegen_vhdl::emit_design;

use crate::pipeline::{config_path, generate, load_with_overrides, render_diagnostics, Generated};
use crate::{GenArgs, GlobalArgs, ReportFormat};

/// Runs the `pipegen gen` command. Returns exit code 1 if generation
/// reported errors.
pub fn run(args: &GenArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let path = config_path(global)?;
    let config = load_with_overrides(path.as_deref(), &args.params)?;
    let Some(Generated { config, ctx, model }) = generate(config, global, ReportFormat::Text)? else {
        return Ok(1);
    };
    let top = model.operator();

    let vhdl = emit_design(&ctx.design_order(top));
    let output = args.output.as_deref().unwrap_or(&config.output.vhdl);
    std::fs::write(output, &vhdl)?;

    if !global.quiet {
        eprintln!("   Generated {} ({})", output, ContentHash::from_text(&vhdl));
        eprint!("{}", ctx.final_report(top));
    }

    if args.testbench {
        let plan = TestPlan::from_config(&config);
        let bench = TestBench::generate(model.as_ref(), &plan, ctx.sink())?;
        bench.write_files(
            Path::new(&config.output.testbench),
            Path::new(&config.output.test_input),
        )?;
        if !global.quiet {
            eprintln!(
                "   Testbench {} ({} test cases)",
                config.output.testbench,
                bench.tests().len()
            );
        }
    }

    let failed = ctx.sink().has_errors();
    render_diagnostics(ctx.sink(), global, ReportFormat::Text);
    Ok(i32::from(failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn global(dir: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(dir.to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn writes_design_and_bench() {
        let tmp = TempDir::new().unwrap();
        let out = |name: &str| tmp.path().join(name).to_string_lossy().into_owned();
        fs::write(
            tmp.path().join("pipegen.toml"),
            format!(
                "[operator]\nname = \"IntAdder\"\nwin = 12\n\n[test]\nrandom_tests = 5\nbench = \"file\"\n\n\
                 [output]\nvhdl = \"{}\"\ntestbench = \"{}\"\ntest_input = \"{}\"\n",
                out("add.vhdl"),
                out("add_tb.vhdl"),
                out("test.input"),
            ),
        )
        .unwrap();
        let args = GenArgs {
            params: Vec::new(),
            output: None,
            testbench: true,
        };
        assert_eq!(run(&args, &global(tmp.path())).unwrap(), 0);

        let design = fs::read_to_string(out("add.vhdl")).unwrap();
        assert!(design.contains("entity IntAdder_12"));
        assert!(fs::read_to_string(out("add_tb.vhdl")).unwrap().contains("IntAdder_12"));
        assert!(fs::read_to_string(out("test.input")).unwrap().lines().count() >= 5);
    }

    #[test]
    fn output_flag_wins_and_generation_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("pipegen.toml"),
            "[operator]\nname = \"FPAdd\"\nwe = 5\nwf = 10\n",
        )
        .unwrap();
        let mut texts = Vec::new();
        for name in ["a.vhdl", "b.vhdl"] {
            let output = tmp.path().join(name);
            let args = GenArgs {
                params: Vec::new(),
                output: Some(output.to_string_lossy().into_owned()),
                testbench: false,
            };
            assert_eq!(run(&args, &global(tmp.path())).unwrap(), 0);
            texts.push(fs::read_to_string(&output).unwrap());
        }
        assert_eq!(
            ContentHash::from_text(&texts[0]),
            ContentHash::from_text(&texts[1])
        );
        assert!(texts[0].contains("entity FPAdd_5_10"));
    }
}
