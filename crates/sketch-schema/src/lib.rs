//! # JSON Schema compilation and Rust binding generation for the Sketch file format
//!
//! The pipeline has three stages, each with its own module:
//!
//! 1. [`graph`] parses a [`bundle::SchemaBundle`] into an arena of schema
//!    nodes and resolves every `$ref`.
//! 2. [`compiler`] merges composition, names every type and produces a
//!    [`catalog::TypeCatalog`].
//! 3. [`codegen`] renders the catalog as Rust source, one type per entry.
//!
//! The catalog can also be used directly at runtime through [`binding::Bindings`],
//! which decodes and encodes JSON documents without any generated code.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p sketch-schema --bin sketch-codegen -- \
//!     -i ./schemas \
//!     -o ./src/generated.rs
//! ```
//!
//! Settings can also come from a KDL file passed with `-c`, see [`config`].
//!
//! ## Modules
//!
//! - [`bundle`] - In-memory set of schema documents
//! - [`graph`] - Schema node arena and reference resolution
//! - [`compiler`] - Type resolution and catalog construction
//! - [`catalog`] - The compiled type catalog
//! - [`binding`] - Catalog-driven encode/decode of JSON documents
//! - [`codegen`] - Rust code generation from the catalog

pub mod binding;
pub mod bundle;
pub mod catalog;
pub mod cli;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;

pub use binding::{Binding, Bindings, Data};
pub use catalog::TypeCatalog;
pub use error::{Result, SchemaError};
