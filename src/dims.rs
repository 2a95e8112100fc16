//! Shape inference for array variables from their flattened header entries.
//!
//! Sampler output flattens an array `theta[2, 3]` into the columns
//! `theta.1.1, theta.2.1, theta.1.2, ...`, i.e. in column-major order with the
//! first index varying fastest. This module recovers the extents and checks
//! that the columns really enumerate the array in that order.

use crate::error::{Error, Result};
use crate::names::ParsedName;
use crate::schema::Shape;

/// Column-major odometer over a fixed shape, starting at all ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMajorCounter {
    dims: Vec<usize>,
    current: Vec<usize>,
}

impl ColumnMajorCounter {
    pub fn new(dims: Vec<usize>) -> Self {
        let current = vec![1; dims.len()];
        Self { dims, current }
    }

    /// The index tuple the counter currently points at.
    pub fn current(&self) -> &[usize] {
        &self.current
    }

    /// Advances to the next tuple. Returns `false` once the counter wraps
    /// around past the last element.
    pub fn increment(&mut self) -> bool {
        for (c, &d) in self.current.iter_mut().zip(&self.dims) {
            if *c < d {
                *c += 1;
                return true;
            }
            *c = 1;
        }
        false
    }
}

/**
Collapses the contiguous run of entries starting at position `start` into one
array variable.

The run is every entry from `start` onwards that shares the name of
`pairs[start]`. Returns the variable name, its inferred [`Shape`] and the
position just past the run, so the caller can continue from there.

# Errors

Returns [`Error::MalformedIndices`] if `start` is out of range, if the run does
not begin at the all-ones index, if index lengths differ within the run, or if
the indices are not exactly the column-major enumeration of the inferred shape.

# Examples

```rust
use mcmc_chains::dims::collapse_dimensions;
use mcmc_chains::names::ParsedName;
use mcmc_chains::schema::Shape;

let pairs = vec![
    ParsedName::new("a", vec![1, 1]),
    ParsedName::new("a", vec![2, 1]),
    ParsedName::new("a", vec![1, 2]),
    ParsedName::new("a", vec![2, 2]),
];
let (name, shape, next) = collapse_dimensions(&pairs, 0)?;
assert_eq!(name, "a");
assert_eq!(shape, Shape::Array(vec![2, 2]));
assert_eq!(next, 4);

// Starting in the middle of the run is rejected.
assert!(collapse_dimensions(&pairs, 1).is_err());
# Ok::<(), mcmc_chains::Error>(())
```
*/
pub fn collapse_dimensions(pairs: &[ParsedName], start: usize) -> Result<(String, Shape, usize)> {
    let first = pairs.get(start).ok_or_else(|| {
        Error::MalformedIndices(format!(
            "start position {start} is past the end of {} entries",
            pairs.len()
        ))
    })?;
    let name = &first.name;
    let n_dims = first.index.len();

    if n_dims == 0 {
        return Err(Error::MalformedIndices(format!(
            "`{name}` has no indices and cannot be collapsed"
        )));
    }
    if first.index.iter().any(|&i| i != 1) {
        return Err(Error::MalformedIndices(format!(
            "`{name}` starts at index {:?} instead of all ones",
            first.index
        )));
    }

    let run = &pairs[start..];
    let len = run.iter().take_while(|p| &p.name == name).count();
    let run = &run[..len];

    let mut dims = vec![1; n_dims];
    for p in run {
        if p.index.len() != n_dims {
            return Err(Error::MalformedIndices(format!(
                "`{name}` mixes {} and {} indices",
                n_dims,
                p.index.len()
            )));
        }
        for (d, &i) in dims.iter_mut().zip(&p.index) {
            *d = (*d).max(i);
        }
    }

    let expected = checked_product(&dims).ok_or_else(|| {
        Error::MalformedIndices(format!("`{name}` has indices spanning {dims:?}, too many entries"))
    })?;
    if expected != len {
        return Err(Error::MalformedIndices(format!(
            "`{name}` has {len} entries but its indices span {dims:?} ({expected} entries)"
        )));
    }

    let mut counter = ColumnMajorCounter::new(dims.clone());
    for (k, p) in run.iter().enumerate() {
        if p.index != counter.current() {
            return Err(Error::MalformedIndices(format!(
                "`{name}`: entry {} has index {:?}, expected {:?} (column-major order)",
                k + 1,
                p.index,
                counter.current()
            )));
        }
        counter.increment();
    }

    Ok((name.clone(), Shape::Array(dims), start + len))
}

/// Number of elements of an array with extents `dims`, or `None` on overflow.
pub(crate) fn checked_product(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}
