//! Trawl command line: run and validate declarative pipeline files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use trawl_engine::{Context, Engine, HttpFetcher, Pipeline, PipelineBundle, parse_pipeline_file};
use trawl_util::parse_key_value;

#[derive(Parser)]
#[command(name = "trawl", about = "Declarative pipeline runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a pipeline file and print the final context as JSON.
    Run {
        /// Pipeline file (YAML or JSON, single pipeline or bundle).
        file: PathBuf,

        /// Pipeline name to run when the file is a bundle.
        #[arg(long)]
        pipeline: Option<String>,

        /// Seed a context entry as key=value; the value is parsed as JSON
        /// when possible. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// JSON file seeding the initial context.
        #[arg(long, value_name = "FILE")]
        context_file: Option<PathBuf>,

        /// JSON file used as the root document for query actions.
        #[arg(long, value_name = "FILE")]
        document: Option<PathBuf>,
    },

    /// Parse and validate a pipeline file without executing it.
    Validate {
        /// Pipeline file (YAML or JSON, single pipeline or bundle).
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            file,
            pipeline,
            set,
            context_file,
            document,
        } => run(&file, pipeline.as_deref(), &set, context_file.as_deref(), document.as_deref()),
        Command::Validate { file } => validate(&file),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run(
    file: &Path,
    name: Option<&str>,
    set: &[String],
    context_file: Option<&Path>,
    document: Option<&Path>,
) -> Result<()> {
    let bundle = parse_pipeline_file(file)?;
    let pipeline = select_pipeline(&bundle, name)?;

    let mut context = seed_context(context_file, set)?;

    let mut engine = Engine::new().with_fetcher(HttpFetcher::new()?);
    if let Some(path) = document {
        engine = engine.with_document(read_json(path)?);
    }

    let report = engine.execute(pipeline, &mut context)?;
    if !report.is_clean() {
        eprintln!("{} diagnostic(s) reported; see the log output", report.diagnostics.len());
    }

    println!("{}", serde_json::to_string_pretty(context.as_map())?);
    Ok(())
}

fn validate(file: &Path) -> Result<()> {
    let bundle = parse_pipeline_file(file)?;
    for (name, pipeline) in &bundle.pipelines {
        println!("{name}: {} action(s)", pipeline.actions.len());
    }
    Ok(())
}

fn select_pipeline<'b>(bundle: &'b PipelineBundle, name: Option<&str>) -> Result<&'b Pipeline> {
    match name {
        Some(name) => bundle
            .pipelines
            .get(name)
            .with_context(|| format!("no pipeline named '{name}' in this file")),
        None => {
            if bundle.pipelines.len() == 1 {
                Ok(bundle.pipelines.values().next().expect("single entry"))
            } else {
                let names: Vec<&str> = bundle.pipelines.keys().map(String::as_str).collect();
                bail!("file contains several pipelines; pick one with --pipeline ({})", names.join(", "))
            }
        }
    }
}

fn seed_context(context_file: Option<&Path>, set: &[String]) -> Result<Context> {
    let mut context = match context_file {
        Some(path) => {
            let value = read_json(path)?;
            let Value::Object(map) = value else {
                bail!("context file {} must hold a JSON object", path.display());
            };
            Context::from(map)
        }
        None => Context::new(),
    };

    for entry in set {
        let (key, value) = parse_key_value(entry)?;
        context.set(key, value);
    }
    Ok(context)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {} as JSON", path.display()))
}
