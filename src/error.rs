//! Error types for reading and slicing sampler output.

use thiserror::Error;

/// Everything that can go wrong while parsing, building or slicing chains.
#[derive(Error, Debug)]
pub enum Error {
    /// A header token does not follow the `name` / `name.i1.i2` convention.
    #[error("Invalid variable name format: {0}")]
    InvalidFormat(String),

    /// The indices of one variable are not a column-major enumeration.
    #[error("Malformed indices: {0}")]
    MalformedIndices(String),

    /// The header as a whole cannot be turned into a schema.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// Chains that must share a schema do not.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Matrix or container dimensions disagree with the schema.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// No variable with this name exists in the schema.
    #[error("Unknown variable `{0}`")]
    UnknownVariable(String),

    /// A data row has a different number of fields than the header.
    #[error("Line {line}: expected {expected} fields, found {found}")]
    RowWidthMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A data field is not a floating point number.
    #[error("Line {line}: cannot parse `{field}` as a number: {source}")]
    NumberFormatError {
        line: usize,
        field: String,
        source: std::num::ParseFloatError,
    },

    /// An iteration range reaches past the post-warmup draws.
    #[error("Iterations {start}..{end} out of bounds for {len} post-warmup iterations")]
    IterationOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    /// ndarray refused a shape.
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing error
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
