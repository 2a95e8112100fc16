/*!
# Streaming reader for sampler CSV output

The expected input is a header line of comma-separated variable names
(`lp__,mu.1,mu.2,...`) followed by one comma-separated row of numbers per
iteration. Lines whose first non-blank character is the comment marker are
ignored anywhere in the stream, as are blank lines.
*/

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use crate::chain::{Chain, Thinning};
use crate::error::{Error, Result};
use crate::schema::IndexSchema;

/// Marker that starts a comment line in sampler output.
pub const DEFAULT_COMMENT_MARKER: char = '#';

/// Headers with fewer fields than this are rejected outright.
const MIN_HEADER_FIELDS: usize = 2;

/**
Options for turning a stream into a [`Chain`].

# Examples

```rust
use mcmc_chains::io::ChainReader;

let input = "# comment\nlp__,theta.1,theta.2\n-1.5,0.1,0.2\n-1.2,0.3,0.4\n";
let chain = ChainReader::new().set_warmup(1).read(input.as_bytes())?;
assert_eq!(chain.n_rows(), 2);
assert_eq!(chain.n_iterations(), 1);
assert!(chain.is_ordered());
# Ok::<(), mcmc_chains::Error>(())
```
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReader {
    comment_marker: char,
    warmup: usize,
    thinning: Thinning,
}

impl Default for ChainReader {
    fn default() -> Self {
        Self {
            comment_marker: DEFAULT_COMMENT_MARKER,
            warmup: 0,
            thinning: Thinning::Unknown,
        }
    }
}

impl ChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_comment_marker(mut self, marker: char) -> Self {
        self.comment_marker = marker;
        self
    }

    /// Number of leading rows to mark as warmup on the resulting chain.
    pub fn set_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn set_thinning(mut self, thinning: Thinning) -> Self {
        self.thinning = thinning;
        self
    }

    fn is_skipped(&self, line: &str) -> bool {
        let line = line.trim_start();
        line.is_empty() || line.starts_with(self.comment_marker)
    }

    /**
    Reads a whole chain from `reader`.

    # Errors

    - [`Error::MalformedHeader`] if there is no header or it has fewer than two
      fields, and any header error of [`IndexSchema::from_header`].
    - [`Error::RowWidthMismatch`] if a row has a different field count than
      the header.
    - [`Error::NumberFormatError`] if a field is not a number.
    - [`Error::DimensionMismatch`] if the configured warmup exceeds the rows.
    - [`Error::Io`] if reading fails.
    */
    pub fn read<R: BufRead>(&self, reader: R) -> Result<Chain> {
        let mut lines = reader.lines().enumerate();

        let mut header = None;
        for (i, line) in lines.by_ref() {
            let line = line?;
            if self.is_skipped(&line) {
                log::trace!("skipping line {} before header", i + 1);
                continue;
            }
            header = Some(line);
            break;
        }
        let header =
            header.ok_or_else(|| Error::MalformedHeader("No header line found.".to_string()))?;

        let tokens: Vec<&str> = header.split(',').map(str::trim).collect();
        if tokens.len() < MIN_HEADER_FIELDS {
            return Err(Error::MalformedHeader(
                "Fewer than 2 fields in line.".to_string(),
            ));
        }
        let schema = IndexSchema::from_header(&tokens)?;
        let width = tokens.len();
        log::debug!(
            "parsed header with {} variables in {} columns",
            schema.len(),
            width
        );

        let mut buffer: Vec<f64> = Vec::new();
        let mut n_rows = 0;
        for (i, line) in lines {
            let line = line?;
            if self.is_skipped(&line) {
                continue;
            }
            let line_no = i + 1;

            let found = line.split(',').count();
            if found != width {
                return Err(Error::RowWidthMismatch {
                    line: line_no,
                    expected: width,
                    found,
                });
            }
            for field in line.split(',').map(str::trim) {
                let value = field
                    .parse::<f64>()
                    .map_err(|source| Error::NumberFormatError {
                        line: line_no,
                        field: field.to_string(),
                        source,
                    })?;
                buffer.push(value);
            }
            n_rows += 1;
        }

        log::debug!("read {n_rows} rows");
        let samples = Array2::from_shape_vec((n_rows, width), buffer)?;
        Ok(Chain::new(schema, samples)?
            .with_warmup(self.warmup)?
            .with_thinning(self.thinning)
            .with_ordered(true))
    }

    /// Opens `path` and reads it with [`ChainReader::read`].
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<Chain> {
        let path = path.as_ref();
        log::info!("reading chain from {}", path.display());
        self.read(BufReader::new(File::open(path)?))
    }
}

/**
Reads a chain with the default options: `#` comments, no warmup, unknown
thinning.

# Examples

```rust
use mcmc_chains::io::read_chain;
use ndarray::arr2;

let chain = read_chain("a,b\n1,2\n".as_bytes())?;
assert_eq!(chain.schema().header(), vec!["a", "b"]);
assert_eq!(chain.sample_matrix(false), arr2(&[[1.0, 2.0]]));
# Ok::<(), mcmc_chains::Error>(())
```
*/
pub fn read_chain<R: BufRead>(reader: R) -> Result<Chain> {
    ChainReader::default().read(reader)
}

/// Reads the chain stored at `path` with the default options.
pub fn read_chain_file<P: AsRef<Path>>(path: P) -> Result<Chain> {
    ChainReader::default().read_path(path)
}
