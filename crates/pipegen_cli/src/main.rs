//! pipegen CLI: the command-line interface of the operator generator.
//!
//! Provides `pipegen gen` to write the VHDL of an operator (and optionally
//! its testbench), `pipegen test` to run the operator's test cases through
//! the cycle-accurate simulator, and `pipegen list` to show the operators
//! that can be generated.

#![warn(missing_docs)]

mod generate;
mod list;
mod pipeline;
mod test;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// pipegen: a generator of pipelined arithmetic operators.
#[derive(Parser, Debug)]
#[command(name = "pipegen", version, about = "Pipelined arithmetic operator generator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also print scheduling notes.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `pipegen.toml` file, or to the directory holding one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the VHDL of an operator.
    Gen(GenArgs),
    /// Simulate an operator against its exact model.
    Test(TestArgs),
    /// List the operators that can be generated.
    List,
}

/// Arguments for the `pipegen gen` subcommand.
#[derive(Parser, Debug)]
pub struct GenArgs {
    /// Parameters overriding the configuration file (e.g., `name=FPAdd we=8 wf=23`).
    pub params: Vec<String>,

    /// Output path for the VHDL design (default: `[output] vhdl`).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also write the VHDL testbench and, for file-based benches, its stimulus file.
    #[arg(long)]
    pub testbench: bool,
}

/// Arguments for the `pipegen test` subcommand.
#[derive(Parser, Debug)]
pub struct TestArgs {
    /// Parameters overriding the configuration file.
    pub params: Vec<String>,

    /// Number of random test cases (overrides `[test] random_tests`).
    #[arg(short = 'n', long)]
    pub random_tests: Option<u32>,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from the environment.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// One JSON object per diagnostic.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print notes as well as warnings and errors.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a configuration file or directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => color_from_env(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Gen(ref args) => generate::run(args, &global),
        Command::Test(ref args) => test::run(args, &global),
        Command::List => list::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Colors unless `NO_COLOR` is set or there is no `TERM`.
fn color_from_env() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::env::var("TERM").is_ok_and(|t| t != "dumb")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_gen_with_params() {
        let cli = Cli::parse_from(["pipegen", "gen", "name=FPAdd", "we=8", "wf=23"]);
        match cli.command {
            Command::Gen(ref args) => {
                assert_eq!(args.params, vec!["name=FPAdd", "we=8", "wf=23"]);
                assert!(args.output.is_none());
                assert!(!args.testbench);
            }
            _ => panic!("expected Gen command"),
        }
    }

    #[test]
    fn parse_gen_output_and_testbench() {
        let cli = Cli::parse_from(["pipegen", "gen", "-o", "add.vhdl", "--testbench"]);
        match cli.command {
            Command::Gen(ref args) => {
                assert_eq!(args.output.as_deref(), Some("add.vhdl"));
                assert!(args.testbench);
                assert!(args.params.is_empty());
            }
            _ => panic!("expected Gen command"),
        }
    }

    #[test]
    fn parse_test_defaults() {
        let cli = Cli::parse_from(["pipegen", "test"]);
        match cli.command {
            Command::Test(ref args) => {
                assert!(args.random_tests.is_none());
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Test command"),
        }
    }

    #[test]
    fn parse_test_with_args() {
        let cli = Cli::parse_from([
            "pipegen", "test", "name=IntAdder", "win=32", "-n", "500", "--format", "json",
        ]);
        match cli.command {
            Command::Test(ref args) => {
                assert_eq!(args.params, vec!["name=IntAdder", "win=32"]);
                assert_eq!(args.random_tests, Some(500));
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Test command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["pipegen", "--quiet", "--color", "never", "list"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["pipegen", "--config", "/tmp/pipegen.toml", "gen"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/pipegen.toml"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["pipegen", "test", "--verbose", "--color", "always"]);
        assert!(cli.verbose);
        assert_eq!(cli.color, ColorChoice::Always);
    }
}
