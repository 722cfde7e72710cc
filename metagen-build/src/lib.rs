//! Build-time generator for `*_meta.rs` method files.
//!
//! This crate scans your source files for structs with `#[meta("...")]` field tags
//! and writes the requested methods to a sibling file next to each tagged source.
//!
//! # Example
//!
//! In your `build.rs`:
//!
//! ```ignore
//! fn main() {
//!     metagen_build::generate_meta()
//!         .scan_path("src/")
//!         .run()
//!         .expect("Failed to generate meta files");
//!
//!     println!("cargo:rerun-if-changed=src/");
//! }
//! ```
//!
//! Then declare the generated file as a child module of the tagged one:
//!
//! ```ignore
//! // src/models.rs
//! #[path = "models_meta.rs"]
//! mod models_meta;
//! ```

mod generator;

pub use generator::MetaGenerator;

/// Create a new generator with default settings.
///
/// # Example
///
/// ```ignore
/// metagen_build::generate_meta()
///     .scan_path("src/models/")
///     .suffix("_gen")
///     .run()
///     .expect("Failed to generate meta files");
/// ```
pub fn generate_meta() -> MetaGenerator {
    MetaGenerator::new()
}
