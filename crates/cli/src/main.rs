mod interview;
mod render;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use stepwise_core::{CompileError, Model, ParametersCollection, StepKind};
use stepwise_eval::{EngineConfig, ExecuteRequest, Executor};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Stepwise rule-script toolchain.
#[derive(Parser)]
#[command(name = "stepwise", version, about = "Stepwise rule-script toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log engine steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a rule script and report errors with their positions
    Validate {
        /// Path to the rule script
        script: PathBuf,
    },

    /// Execute a rule script against known answers
    Execute {
        /// Path to the rule script
        script: PathBuf,
        /// Path to an answers JSON file (object or parameter array)
        #[arg(long)]
        answers: Option<PathBuf>,
    },

    /// Print the empty content template for a rule script
    Template {
        /// Path to the rule script
        script: PathBuf,
    },

    /// Answer a rule script question by question on stdin
    Interview {
        /// Path to the rule script
        script: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Validate { script } => {
            cmd_validate(&script, cli.output, cli.quiet);
        }
        Commands::Execute { script, answers } => {
            cmd_execute(&script, answers.as_deref(), config, cli.output, cli.quiet);
        }
        Commands::Template { script } => {
            cmd_template(&script, cli.output, cli.quiet);
        }
        Commands::Interview { script } => {
            let text = read_script(&script, cli.output, cli.quiet);
            if let Err(msg) = interview::run(&text, config) {
                report_error(&msg, cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Engine configuration from `--config`, or defaults when no file is named.
fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
    toml::from_str(&text).map_err(|e| format!("error parsing config '{}': {}", path.display(), e))
}

fn read_script(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn compile_or_exit(path: &Path, text: &str, output: OutputFormat, quiet: bool) -> Model {
    match stepwise_core::compile(text) {
        Ok(model) => model,
        Err(e) => {
            report_compile_error(path, &e, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_validate(path: &Path, output: OutputFormat, quiet: bool) {
    let text = read_script(path, output, quiet);
    let model = compile_or_exit(path, &text, output, quiet);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => {
            let questions = model.questions().count();
            println!(
                "OK: {} steps, {} questions, {} constants",
                model.steps.len(),
                questions,
                model.constants.len()
            );
            for step in &model.steps {
                let detail = match &step.kind {
                    StepKind::Question { parameters, .. } => parameters
                        .iter()
                        .map(|p| format!("{}: {}", p.name, p.question_type))
                        .collect::<Vec<_>>()
                        .join(", "),
                    StepKind::Derivation {
                        name, value_type, ..
                    } => format!("{}: {}", name, value_type),
                    StepKind::Gate { condition, .. } => condition.text.clone(),
                };
                println!("  {:<24} {:<10} {}", step.id, step.kind.name(), detail);
            }
        }
        OutputFormat::Json => {
            let steps: Vec<_> = model
                .steps
                .iter()
                .map(|s| serde_json::json!({"id": s.id, "kind": s.kind.name()}))
                .collect();
            let json = serde_json::json!({"valid": true, "steps": steps});
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
}

fn cmd_execute(
    path: &Path,
    answers_path: Option<&Path>,
    config: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let text = read_script(path, output, quiet);
    let parameters = match answers_path {
        Some(p) => match read_answers(p) {
            Ok(params) => params,
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        },
        None => ParametersCollection::new(),
    };

    let executor = Executor::new(config);
    let result = match executor.execute(&ExecuteRequest::new(text, parameters)) {
        Ok(r) => r,
        Err(stepwise_eval::ExecutionError::Compile(e)) => {
            report_compile_error(path, &e, output, quiet);
            process::exit(1);
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Text => print!("{}", render::result_text(&result)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&result)
                .unwrap_or_else(|e| format!("serialization error: {}", e))
        ),
    }
}

fn read_answers(path: &Path) -> Result<ParametersCollection, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading answers '{}': {}", path.display(), e))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("error: invalid JSON in {}: {}", path.display(), e))?;
    ParametersCollection::from_json(&raw)
        .map_err(|e| format!("error: invalid answers in {}: {}", path.display(), e))
}

fn cmd_template(path: &Path, output: OutputFormat, quiet: bool) {
    let text = read_script(path, output, quiet);
    let model = compile_or_exit(path, &text, output, quiet);
    match output {
        OutputFormat::Text => match model.content_template() {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => {
                report_error(&format!("serialization error: {}", e), output, quiet);
                process::exit(1);
            }
        },
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&model.content_skeleton())
                .unwrap_or_else(|e| format!("serialization error: {}", e))
        ),
    }
}

fn report_compile_error(path: &Path, e: &CompileError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!(
                    "{}:{}:{}: {}: {}",
                    path.display(),
                    e.debug_info.start.line,
                    e.debug_info.start.column,
                    e.kind,
                    e.message
                );
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
