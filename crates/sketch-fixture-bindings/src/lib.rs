//! Rust bindings emitted by `sketch-codegen` for the fixture schema bundle
//!
//! The source is regenerated by the build script on every fixture change, so
//! this crate failing to build means the emitter produced invalid Rust.

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
