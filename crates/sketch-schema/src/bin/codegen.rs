use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use sketch_schema::bundle::SchemaBundle;
use sketch_schema::cli::CodegenArgs;
use sketch_schema::codegen::CodeGenerator;
use sketch_schema::compiler::compile;
use sketch_schema::config::CodegenConfig;
use sketch_schema::graph::SchemaGraph;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = CodegenArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SKETCH_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args
        .config
        .as_deref()
        .map(CodegenConfig::load)
        .transpose()?;

    let input = args
        .input
        .or_else(|| config.as_ref().map(|c| c.schemas.clone()))
        .ok_or_else(|| miette!("no schema directory given (use -i or a config file)"))?;
    let output = args
        .output
        .or_else(|| config.as_ref().map(|c| c.output.clone()))
        .ok_or_else(|| miette!("no output file given (use -o or a config file)"))?;
    let catalog_path = args
        .catalog
        .or_else(|| config.as_ref().and_then(|c| c.catalog.clone()));

    tracing::info!(input = %input.display(), "loading schema bundle");
    let bundle = SchemaBundle::load_from_dir(&input)?;
    tracing::info!(documents = bundle.len(), "loaded schema bundle");

    let graph = SchemaGraph::load(&bundle)?;
    let catalog = compile(&graph)?;
    tracing::info!(types = catalog.len(), "compiled type catalog");

    if let Some(path) = &catalog_path {
        let json = serde_json::to_string_pretty(&catalog).into_diagnostic()?;
        std::fs::write(path, json).into_diagnostic()?;
        tracing::info!(path = %path.display(), "wrote catalog");
    }

    let mut codegen = CodeGenerator::new(&catalog);
    if let Some(runtime) = config.as_ref().and_then(|c| c.runtime_crate.as_deref()) {
        codegen = codegen.with_runtime_crate(runtime)?;
    }
    codegen.write_to(&output)?;

    Ok(())
}
