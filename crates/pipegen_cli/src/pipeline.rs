//! Shared plumbing for the subcommands: configuration lookup, operator
//! construction, and diagnostic rendering.

use std::path::{Path, PathBuf};

use pipegen_config::{load_config_file, resolve_config, GeneratorConfig, ResolvedConfig, CONFIG_FILE_NAME};
use pipegen_core::{ArithmeticOperator, GenerationContext};
use pipegen_diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticRenderer, DiagnosticSink, JsonRenderer, Severity,
    TerminalRenderer,
};
use pipegen_ops::{build_operator, target_for};

use crate::{GlobalArgs, ReportFormat};

/// A generated operator with the context that owns its sub-components.
pub struct Generated {
    /// The resolved configuration it was built from.
    pub config: ResolvedConfig,
    /// Registry of every operator in the design, and the diagnostic sink.
    pub ctx: GenerationContext,
    /// The top-level operator with its exact model.
    pub model: Box<dyn ArithmeticOperator>,
}

/// Returns the configuration file to read, if any.
///
/// An explicit `--config` may name the file or its directory and must
/// exist; otherwise `pipegen.toml` in the current directory is used when
/// present.
pub fn config_path(global: &GlobalArgs) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    match global.config {
        Some(ref config) => {
            let p = PathBuf::from(config);
            if p.is_dir() {
                Ok(Some(p.join(CONFIG_FILE_NAME)))
            } else {
                Ok(Some(p))
            }
        }
        None => {
            let p = std::env::current_dir()?.join(CONFIG_FILE_NAME);
            Ok(p.is_file().then_some(p))
        }
    }
}

/// Loads the configuration file (when there is one) and applies the
/// `key=value` parameters given on the command line.
pub fn load_with_overrides(
    path: Option<&Path>,
    params: &[String],
) -> Result<ResolvedConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => GeneratorConfig::default(),
    };
    config.apply_overrides(params.iter().map(String::as_str))?;
    Ok(resolve_config(&config)?)
}

/// Builds the operator a resolved configuration names.
///
/// A rejected parameter (E002) or a generator failure (E001) is rendered as
/// a diagnostic and yields `None`.
pub fn generate(
    config: ResolvedConfig,
    global: &GlobalArgs,
    format: ReportFormat,
) -> Result<Option<Generated>, Box<dyn std::error::Error>> {
    let target = target_for(&config)?;
    let mut ctx = GenerationContext::new();
    match build_operator(&mut ctx, target.as_ref(), &config) {
        Ok(model) => Ok(Some(Generated { config, ctx, model })),
        Err(e) => {
            let diag = if e.is_configuration() {
                Diagnostic::error(DiagnosticCode::INVALID_CONFIG, e.to_string())
                    .with_help("`pipegen list` shows each operator's parameters")
            } else {
                Diagnostic::error(DiagnosticCode::GENERATION_FAILED, e.to_string())
            };
            ctx.sink().emit(diag.for_operator(&config.operator.name));
            render_diagnostics(ctx.sink(), global, format);
            Ok(None)
        }
    }
}

/// Prints the diagnostics collected in `sink` to stderr.
///
/// Notes are only shown with `--verbose`; warnings and errors always are,
/// even with `--quiet`.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs, format: ReportFormat) {
    let diagnostics = sink.take_all();
    let shown = diagnostics
        .iter()
        .filter(|d| global.verbose || d.severity >= Severity::Warning);
    match format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(global.color);
            for diag in shown {
                eprint!("{}", renderer.render(diag));
            }
        }
        ReportFormat::Json => {
            for diag in shown {
                print!("{}", JsonRenderer.render(diag));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn global(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: config.map(|p| p.to_string_lossy().into_owned()),
        }
    }

    fn params(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_directory_resolves_to_file() {
        let tmp = TempDir::new().unwrap();
        let path = config_path(&global(Some(tmp.path()))).unwrap();
        assert_eq!(path, Some(tmp.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn command_line_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&file, "[operator]\nname = \"FPAdd\"\nwe = 8\nwf = 23\n").unwrap();
        let config = load_with_overrides(Some(&file), &params(&["wf=10", "we=5"])).unwrap();
        assert_eq!(config.operator.name, "FPAdd");
        assert_eq!(config.exponent_width, Some(5));
        assert_eq!(config.mantissa_width, Some(10));
    }

    #[test]
    fn parameters_alone_are_enough() {
        let config = load_with_overrides(None, &params(&["name=IntAdder", "win=24"])).unwrap();
        let generated = generate(config, &global(None), ReportFormat::Text)
            .unwrap()
            .unwrap();
        assert!(generated.model.operator().name.starts_with("IntAdder"));
    }

    #[test]
    fn missing_name_is_an_error() {
        assert!(load_with_overrides(None, &params(&["we=8"])).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("absent.toml");
        assert!(load_with_overrides(Some(&file), &[]).is_err());
    }

    #[test]
    fn bad_parameter_is_reported_not_raised() {
        let config =
            load_with_overrides(None, &params(&["name=FPAdd", "we=1", "wf=10"])).unwrap();
        let generated = generate(config, &global(None), ReportFormat::Text).unwrap();
        assert!(generated.is_none());
    }
}
