//! metagen core library.
//!
//! Resolves per-field `#[meta("...")]` directives into method specifications and renders
//! them as Rust source. Used by the `metagen` binary, by `metagen-build` from build scripts
//! and by the `Meta` derive.

pub mod config;
pub mod directive;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod naming;
pub mod registry;
pub mod render;
pub mod types;

pub use engine::{Synthesis, synthesize};
pub use errors::{MetagenError, Warning};
pub use registry::{MethodRegistry, MethodSpec, SynthesisKind};
pub use types::{FieldDescriptor, FieldShape, SourceUnit, TargetContext, TypeDescriptor};
