//! Parsing of single header tokens such as `lp__`, `mu` or `theta.2.3`.

use crate::error::{Error, Result};

/// A header token split into its variable name and (1-based) index tuple.
///
/// Scalars have an empty `index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedName {
    pub name: String,
    pub index: Vec<usize>,
}

impl ParsedName {
    pub fn new(name: impl Into<String>, index: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.index.is_empty()
    }
}

/**
Parses one header token into a variable name and its index tuple.

The name is everything up to the first `.`; a trailing `__` (as in `lp__` or
`stepsize__`) is part of the name. Each remaining dot-separated piece must be a
strictly positive integer.

# Errors

Returns [`Error::InvalidFormat`] for an empty token, an empty name, a trailing
dot, or an index that is not a positive integer.

# Examples

```rust
use mcmc_chains::names::parse_variable_name;

let parsed = parse_variable_name("kappa.1.3")?;
assert_eq!(parsed.name, "kappa");
assert_eq!(parsed.index, vec![1, 3]);

let scalar = parse_variable_name("stepsize__")?;
assert!(scalar.is_scalar());

assert!(parse_variable_name("b.12.").is_err());
# Ok::<(), mcmc_chains::Error>(())
```
*/
pub fn parse_variable_name(token: &str) -> Result<ParsedName> {
    if token.is_empty() {
        return Err(Error::InvalidFormat("empty variable name".into()));
    }

    let mut parts = token.split('.');
    // `split` always yields at least one piece.
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        return Err(Error::InvalidFormat(format!(
            "`{token}` does not start with a name"
        )));
    }

    let index = parts
        .map(|part| parse_index(token, part))
        .collect::<Result<Vec<usize>>>()?;

    Ok(ParsedName::new(name, index))
}

fn parse_index(token: &str, part: &str) -> Result<usize> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidFormat(format!(
            "`{token}`: index `{part}` is not a positive integer"
        )));
    }
    match part.parse::<usize>() {
        Ok(i) if i > 0 => Ok(i),
        _ => Err(Error::InvalidFormat(format!(
            "`{token}`: index `{part}` is not a positive integer"
        ))),
    }
}
