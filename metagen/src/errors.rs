use serde::Serialize;
use thiserror::Error;

/// Hard failures. Any of these aborts the file being processed.
#[derive(Debug, Error)]
pub enum MetagenError {
    /// The source file is not valid Rust.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: syn::Error,
    },

    /// A tagged field has a type no directive can work with.
    #[error("unsupported type `{ty}` on field {type_name}.{field}")]
    UnsupportedField { type_name: String, field: String, ty: String },

    /// A `#[meta]` attribute that is neither `#[meta("...")]` nor `#[meta = "..."]`.
    #[error("malformed #[meta] attribute on {type_name}.{field}: {message}")]
    Attribute {
        type_name: String,
        field: String,
        message: String,
    },

    /// Two methods with the same name would be emitted for one type.
    #[error("duplicate method `{rendered}` on {type_name} (from {method})")]
    DuplicateMethod {
        type_name: String,
        method: String,
        rendered: String,
    },

    /// Two fields of a constructor map to the same parameter name.
    #[error("constructor of {type_name} takes `{parameter}` twice (field {field})")]
    DuplicateParameter {
        type_name: String,
        field: String,
        parameter: String,
    },

    /// A stored type or identifier could not be turned back into tokens.
    #[error("cannot render {what}: {source}")]
    Render {
        what: String,
        #[source]
        source: syn::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions. The offending directive or flag is skipped and processing continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("unknown directive '{directive}' on {type_name}.{field}")]
    UnknownDirective {
        type_name: String,
        field: String,
        directive: String,
    },

    #[error("'{directive}' not valid for field {type_name}.{field} - must be a {expected}")]
    IncompatibleShape {
        type_name: String,
        field: String,
        directive: String,
        expected: String,
    },

    #[error("'{directive}' on {type_name}.{field} requires a {option}")]
    MissingOption {
        type_name: String,
        field: String,
        directive: String,
        option: String,
    },

    #[error("unknown flag '{flag}' for '{directive}' on {type_name}.{field}")]
    UnknownFlag {
        type_name: String,
        field: String,
        directive: String,
        flag: String,
    },

    #[error("skipping {type_name}: {reason}")]
    SkippedType { type_name: String, reason: String },
}

pub type Result<T, E = MetagenError> = std::result::Result<T, E>;
