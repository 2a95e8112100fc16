//! A single sampler run: draws laid out by an [`IndexSchema`], plus warmup,
//! thinning and ordering metadata.

use std::num::NonZeroUsize;
use std::ops::{Bound, Range, RangeBounds};

use ndarray::{concatenate, s, Array2, ArrayView2, ArrayViewD, Axis};

use crate::error::{Error, Result};
use crate::schema::{block_view, IndexSchema, Record};

/// Interval between retained draws in the original run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Thinning {
    #[default]
    Unknown,
    Interval(NonZeroUsize),
}

/**
The draws of one chain.

Rows are iterations and columns follow the schema. The first `warmup` rows are
warmup iterations; every accessor except [`Chain::sample_matrix`] with
`include_warmup = true` skips them.

# Examples

```rust
use mcmc_chains::chain::Chain;
use mcmc_chains::schema::{IndexSchema, Shape};
use ndarray::arr2;

let schema = IndexSchema::new([("a", Shape::Scalar), ("b", Shape::Array(vec![2]))])?;
let samples = arr2(&[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
let chain = Chain::new(schema, samples)?.with_warmup(1)?;

assert_eq!(chain.n_iterations(), 2);
assert_eq!(chain.sample_matrix(false).nrows(), 2);
assert_eq!(chain.sample_matrix(true).nrows(), 3);

let b: Vec<Vec<f64>> = chain
    .slice_variable(.., "b")?
    .map(|v| v.iter().copied().collect())
    .collect();
assert_eq!(b, vec![vec![2.0, 3.0], vec![5.0, 6.0]]);
# Ok::<(), mcmc_chains::Error>(())
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    schema: IndexSchema,
    samples: Array2<f64>,
    warmup: usize,
    thinning: Thinning,
    is_ordered: bool,
}

impl Chain {
    /// Pairs a schema with a matrix of draws. The chain starts with no warmup,
    /// unknown thinning and is not marked as ordered.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if the matrix does not have one column per
    /// schema column.
    pub fn new(schema: IndexSchema, samples: Array2<f64>) -> Result<Self> {
        if samples.ncols() != schema.width() {
            return Err(Error::DimensionMismatch(format!(
                "sample matrix has {} columns, schema has {}",
                samples.ncols(),
                schema.width()
            )));
        }
        let samples = if samples.is_standard_layout() {
            samples
        } else {
            samples.as_standard_layout().into_owned()
        };
        Ok(Self {
            schema,
            samples,
            warmup: 0,
            thinning: Thinning::Unknown,
            is_ordered: false,
        })
    }

    /// Marks the first `warmup` rows as warmup.
    pub fn with_warmup(mut self, warmup: usize) -> Result<Self> {
        if warmup > self.samples.nrows() {
            return Err(Error::DimensionMismatch(format!(
                "warmup of {warmup} exceeds the {} rows of the chain",
                self.samples.nrows()
            )));
        }
        self.warmup = warmup;
        Ok(self)
    }

    pub fn with_thinning(mut self, thinning: Thinning) -> Self {
        self.thinning = thinning;
        self
    }

    /// Sets whether rows are in the order the sampler produced them.
    pub fn with_ordered(mut self, is_ordered: bool) -> Self {
        self.is_ordered = is_ordered;
        self
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn thinning(&self) -> Thinning {
        self.thinning
    }

    pub fn is_ordered(&self) -> bool {
        self.is_ordered
    }

    /// Number of rows, warmup included.
    pub fn n_rows(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of post-warmup iterations.
    pub fn n_iterations(&self) -> usize {
        self.samples.nrows() - self.warmup
    }

    /// The draws as a matrix, optionally including the warmup rows.
    pub fn sample_matrix(&self, include_warmup: bool) -> ArrayView2<'_, f64> {
        let start = if include_warmup { 0 } else { self.warmup };
        self.samples.slice(s![start.., ..])
    }

    /// All post-warmup draws of one variable, with a leading iterations axis.
    pub fn variable(&self, name: &str) -> Result<ArrayViewD<'_, f64>> {
        self.schema.view(self.sample_matrix(false), name)
    }

    /// Lazily yields one [`Record`] per post-warmup iteration in `range`.
    ///
    /// The iterator can be cloned to restart from the same position.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Result<Draws<'_>> {
        let Range { start, end } = resolve_range(range, self.n_iterations())?;
        Ok(Draws {
            schema: &self.schema,
            rows: self.sample_matrix(false),
            next: start,
            end,
        })
    }

    /// Lazily yields the value of variable `name` for each post-warmup
    /// iteration in `range`, shaped as the variable.
    pub fn slice_variable<R: RangeBounds<usize>>(
        &self,
        range: R,
        name: &str,
    ) -> Result<VariableDraws<'_>> {
        let columns = self.schema.column_range(name)?;
        let shape = self
            .schema
            .shape(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        let Range { start, end } = resolve_range(range, self.n_iterations())?;
        Ok(VariableDraws {
            draws: block_view(self.sample_matrix(false), columns.start, shape),
            next: start,
            end,
        })
    }

    /**
    Stacks the post-warmup draws of several chains with identical schemas.

    The result has no warmup and is not marked as ordered. Its thinning is the
    common thinning of all inputs, or [`Thinning::Unknown`] if they disagree.

    # Errors

    [`Error::SchemaMismatch`] if no chains are given or their schemas differ.
    */
    pub fn concat<'c, I>(chains: I) -> Result<Chain>
    where
        I: IntoIterator<Item = &'c Chain>,
    {
        let chains: Vec<&Chain> = chains.into_iter().collect();
        let first = chains
            .first()
            .ok_or_else(|| Error::SchemaMismatch("no chains to concatenate".to_string()))?;

        if let Some(i) = chains.iter().position(|c| c.schema != first.schema) {
            return Err(Error::SchemaMismatch(format!(
                "chain {i} has a different schema than chain 0"
            )));
        }

        let views: Vec<ArrayView2<f64>> = chains.iter().map(|c| c.sample_matrix(false)).collect();
        let samples = concatenate(Axis(0), &views)?;

        let thinning = if chains.iter().all(|c| c.thinning == first.thinning) {
            first.thinning
        } else {
            Thinning::Unknown
        };

        Ok(Chain {
            schema: first.schema.clone(),
            samples,
            warmup: 0,
            thinning,
            is_ordered: false,
        })
    }
}

fn resolve_range<R: RangeBounds<usize>>(range: R, len: usize) -> Result<Range<usize>> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    if start > end || end > len {
        return Err(Error::IterationOutOfBounds { start, end, len });
    }
    Ok(start..end)
}

/// Iterator over [`Record`]s of consecutive iterations. See [`Chain::slice`].
#[derive(Debug, Clone)]
pub struct Draws<'a> {
    schema: &'a IndexSchema,
    rows: ArrayView2<'a, f64>,
    next: usize,
    end: usize,
}

impl<'a> Iterator for Draws<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let row = self.rows.index_axis_move(Axis(0), self.next);
        self.next += 1;
        Some(self.schema.split_row(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Draws<'_> {}

/// Iterator over one variable's value in consecutive iterations. See
/// [`Chain::slice_variable`].
#[derive(Debug, Clone)]
pub struct VariableDraws<'a> {
    /// The variable's post-warmup draws, iterations first.
    draws: ArrayViewD<'a, f64>,
    next: usize,
    end: usize,
}

impl<'a> Iterator for VariableDraws<'a> {
    type Item = ArrayViewD<'a, f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let draw = self.draws.clone().index_axis_move(Axis(0), self.next);
        self.next += 1;
        Some(draw)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for VariableDraws<'_> {}
