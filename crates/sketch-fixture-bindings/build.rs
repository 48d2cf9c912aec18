use sketch_schema::bundle::SchemaBundle;
use sketch_schema::codegen::CodeGenerator;
use sketch_schema::compiler::compile;
use sketch_schema::graph::SchemaGraph;
use std::env;
use std::error::Error;
use std::path::PathBuf;

const FIXTURES: &str = "../sketch-schema/tests/fixtures/bundle";

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed={}", FIXTURES);

    let bundle = SchemaBundle::load_from_dir(FIXTURES)?;
    let catalog = compile(&SchemaGraph::load(&bundle)?)?;

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    CodeGenerator::new(&catalog).write_to(&out_dir.join("bindings.rs"))?;

    Ok(())
}
