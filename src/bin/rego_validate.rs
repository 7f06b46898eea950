//! `rego-validate`: the CLI front end for the `rego-lang` library.
//!
//! Loads a policy and an input/data document, evaluates either a named rule
//! (`allow` by default) or an ad hoc `--query` expression, and reports the
//! result as text or JSON with OPA-style exit codes.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rego_lang::{ErrorMode, Policy};
use rego_ast::value::Value;
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "rego-validate", author, version, about = "Evaluate a Rego policy against an input document")]
struct Cli {
    /// Path to the Rego policy source file.
    #[arg(long)]
    policy: PathBuf,

    /// Path to the input/data document (YAML or JSON, by extension).
    #[arg(long)]
    config: PathBuf,

    /// An ad hoc query expression to evaluate instead of the `allow` rule.
    #[arg(long)]
    query: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log compile/evaluate timing to standard error.
    #[arg(long)]
    profile: bool,
}

#[derive(Serialize)]
struct Report {
    success: bool,
    result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn load_document(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&contents).with_context(|| format!("invalid YAML in {}", path.display()))
        }
        _ => serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display())),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(run(&cli));
}

/// Returns the process exit code: `0` allow/success, `1` deny/undefined, `2`
/// operational error (missing file, bad config, parse/compile failure).
fn run(cli: &Cli) -> i32 {
    let policy_source = match std::fs::read_to_string(&cli.policy) {
        Ok(source) => source,
        Err(err) => return report_operational_error(cli.format, format!("could not read policy file: {err}")),
    };

    let input = match load_document(&cli.config) {
        Ok(value) => value,
        Err(err) => return report_operational_error(cli.format, format!("{err:#}")),
    };

    let compile_started = Instant::now();
    let policy = match Policy::compile(&policy_source) {
        Ok(policy) => policy,
        Err(err) => return report_operational_error(cli.format, format!("compile error: {err}")),
    };
    if cli.profile {
        tracing::info!(elapsed = ?compile_started.elapsed(), "compiled policy");
    }

    let eval_started = Instant::now();
    let data = Value::object(indexmap::IndexMap::new());
    let outcome = match &cli.query {
        Some(query) => policy.query(query, data, input, ErrorMode::Lenient),
        None => policy.evaluate_rule("allow", data, input, ErrorMode::Lenient),
    };
    if cli.profile {
        tracing::info!(elapsed = ?eval_started.elapsed(), "evaluated policy");
    }

    match outcome {
        Ok(Some(value)) => {
            let success = value.is_truthy();
            print_report(cli.format, success, value, None);
            if success { 0 } else { 1 }
        }
        Ok(None) => {
            print_report(cli.format, false, Value::Null, None);
            1
        }
        Err(err) => report_operational_error(cli.format, format!("evaluation error: {err}")),
    }
}

fn report_operational_error(format: OutputFormat, message: String) -> i32 {
    print_report(format, false, Value::Null, Some(message));
    2
}

fn print_report(format: OutputFormat, success: bool, result: Value, error: Option<String>) {
    match format {
        OutputFormat::Json => {
            let report = Report { success, result, error };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("failed to serialize report: {err}"),
            }
        }
        OutputFormat::Text => {
            if let Some(message) = error {
                eprintln!("{}: {message}", "error".red().bold());
            } else if success {
                println!("{} {result}", "allow".green().bold());
            } else {
                println!("{} {result}", "deny".red().bold());
            }
        }
    }
}
