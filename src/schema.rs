/*!
# Index schema: the layout of named variables across flat columns

An [`IndexSchema`] maps each variable name, in header order, to its [`Shape`].
Scalars take one column; an array of shape `(d1, ..., dk)` takes
`d1 * ... * dk` consecutive columns in column-major order. The schema turns
column indices into labels and turns rows or matrices of draws back into
arrays of the right shape, without copying.
*/

use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;
use ndarray::{
    ArrayView, ArrayView1, ArrayView2, ArrayViewD, Axis, Dimension, Ix2, IxDyn, ShapeBuilder, Slice,
};

use crate::dims::{checked_product, collapse_dimensions, ColumnMajorCounter};
use crate::error::{Error, Result};
use crate::names::{parse_variable_name, ParsedName};

/// The shape of one variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    /// Extents per dimension, each at least one.
    Array(Vec<usize>),
}

impl Shape {
    /// Extents per dimension; empty for scalars.
    pub fn dims(&self) -> &[usize] {
        match self {
            Shape::Scalar => &[],
            Shape::Array(dims) => dims,
        }
    }

    /// Number of columns the variable occupies, saturating at `usize::MAX`.
    pub fn n_columns(&self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Array(dims) => checked_product(dims).unwrap_or(usize::MAX),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Shape::Scalar)
    }
}

/// Name and 1-based index of a single column, e.g. `theta.2.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: String,
    pub index: Vec<usize>,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for i in &self.index {
            write!(f, ".{i}")?;
        }
        Ok(())
    }
}

/// One draw with every variable viewed in its own shape, in schema order.
pub type Record<'a> = IndexMap<&'a str, ArrayViewD<'a, f64>>;

/// Ordered mapping from variable name to [`Shape`].
#[derive(Debug, Clone)]
pub struct IndexSchema {
    variables: IndexMap<String, Shape>,
    /// Column offset of each variable, plus the total width at the end.
    offsets: Vec<usize>,
}

impl IndexSchema {
    /**
    Builds a schema from `(name, shape)` pairs in column order.

    # Errors

    Returns [`Error::MalformedHeader`] on a duplicate name, on an array shape
    with no dimensions or a zero extent, or if the columns do not fit in a
    `usize`.

    # Examples

    ```rust
    use mcmc_chains::schema::{IndexSchema, Shape};

    let schema = IndexSchema::new([
        ("lp__", Shape::Scalar),
        ("theta", Shape::Array(vec![2, 3])),
    ])?;
    assert_eq!(schema.width(), 7);
    assert_eq!(schema.column_range("theta")?, 1..7);
    # Ok::<(), mcmc_chains::Error>(())
    ```
    */
    pub fn new<N, I>(variables: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Shape)>,
    {
        let mut map = IndexMap::new();
        for (name, shape) in variables {
            let name = name.into();
            if let Shape::Array(dims) = &shape {
                if dims.is_empty() || dims.contains(&0) || checked_product(dims).is_none() {
                    return Err(Error::MalformedHeader(format!(
                        "`{name}` has invalid array shape {dims:?}"
                    )));
                }
            }
            if map.contains_key(&name) {
                return Err(Error::MalformedHeader(format!(
                    "`{name}` is defined more than once"
                )));
            }
            map.insert(name, shape);
        }
        Self::from_map(map)
    }

    fn from_map(variables: IndexMap<String, Shape>) -> Result<Self> {
        let mut offsets = Vec::with_capacity(variables.len() + 1);
        let mut acc: usize = 0;
        offsets.push(acc);
        for (name, shape) in &variables {
            acc = acc.checked_add(shape.n_columns()).ok_or_else(|| {
                Error::MalformedHeader(format!("columns overflow at variable `{name}`"))
            })?;
            offsets.push(acc);
        }
        Ok(Self { variables, offsets })
    }

    /**
    Assembles a schema from the parsed tokens of a header line.

    Consecutive tokens with the same name form one variable. A lone token
    without indices is a scalar; every other run is collapsed into an array
    shape with [`collapse_dimensions`].

    # Errors

    Returns [`Error::MalformedHeader`] if a variable reappears after another
    one, if a scalar name is repeated, or if a run of indices is not a
    column-major enumeration.
    */
    pub fn from_parsed(parsed: &[ParsedName]) -> Result<Self> {
        let mut variables: IndexMap<String, Shape> = IndexMap::new();
        let mut pos = 0;
        while pos < parsed.len() {
            let entry = &parsed[pos];
            if variables.contains_key(&entry.name) {
                return Err(Error::MalformedHeader(format!(
                    "`{}` appears again at column {} after other variables",
                    entry.name,
                    pos + 1
                )));
            }
            if entry.is_scalar() {
                if parsed.get(pos + 1).is_some_and(|p| p.name == entry.name) {
                    return Err(Error::MalformedHeader(format!(
                        "scalar `{}` appears more than once",
                        entry.name
                    )));
                }
                variables.insert(entry.name.clone(), Shape::Scalar);
                pos += 1;
            } else {
                let (name, shape, next) = collapse_dimensions(parsed, pos)
                    .map_err(|e| Error::MalformedHeader(e.to_string()))?;
                variables.insert(name, shape);
                pos = next;
            }
        }
        Self::from_map(variables)
    }

    /// Parses raw header tokens and assembles them with [`IndexSchema::from_parsed`].
    pub fn from_header<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let parsed = tokens
            .iter()
            .map(|t| parse_variable_name(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_parsed(&parsed)
    }

    /// Total number of columns.
    pub fn width(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Shape)> + '_ {
        self.variables.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.variables.get(name)
    }

    /// One label per column, in column order.
    pub fn labels(&self) -> Vec<Label> {
        let mut labels = Vec::with_capacity(self.width());
        for (name, shape) in &self.variables {
            match shape {
                Shape::Scalar => labels.push(Label {
                    name: name.clone(),
                    index: Vec::new(),
                }),
                Shape::Array(dims) => {
                    let mut counter = ColumnMajorCounter::new(dims.clone());
                    loop {
                        labels.push(Label {
                            name: name.clone(),
                            index: counter.current().to_vec(),
                        });
                        if !counter.increment() {
                            break;
                        }
                    }
                }
            }
        }
        labels
    }

    /// The labels rendered the way the sampler writes its header line.
    pub fn header(&self) -> Vec<String> {
        self.labels().iter().map(Label::to_string).collect()
    }

    /// Half-open range of columns holding `name`.
    pub fn column_range(&self, name: &str) -> Result<Range<usize>> {
        let (offset, shape) = self.block(name)?;
        Ok(offset..offset + shape.n_columns())
    }

    fn block(&self, name: &str) -> Result<(usize, &Shape)> {
        self.variables
            .get_full(name)
            .map(|(i, _, shape)| (self.offsets[i], shape))
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }

    /**
    Views variable `name` inside a row (1-D) or a matrix of draws (2-D).

    The container's last axis must have length [`IndexSchema::width`]; any
    memory layout is accepted. A scalar yields a 0-d view for a row and one
    value per iteration for a matrix; an array yields its shape, preceded by
    the iterations axis for a matrix. Elements are laid out column-major, as in
    the header.

    # Examples

    ```rust
    use mcmc_chains::schema::{IndexSchema, Shape};
    use ndarray::{arr1, arr2};

    let schema = IndexSchema::new([("a", Shape::Scalar), ("b", Shape::Array(vec![2, 2]))])?;
    let row = arr1(&[0.0, 1.0, 2.0, 3.0, 4.0]);
    let b = schema.view(row.view(), "b")?;
    assert_eq!(b.shape(), &[2, 2]);
    // b.2.1 is the third column.
    assert_eq!(b[[1, 0]], 2.0);

    let matrix = arr2(&[[0.0, 1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0, 9.0]]);
    let b = schema.view(matrix.view(), "b")?;
    assert_eq!(b.shape(), &[2, 2, 2]);
    assert_eq!(b[[1, 0, 1]], 8.0);
    # Ok::<(), mcmc_chains::Error>(())
    ```
    */
    pub fn view<'a, D: Dimension>(
        &self,
        container: ArrayView<'a, f64, D>,
        name: &str,
    ) -> Result<ArrayViewD<'a, f64>> {
        let (offset, shape) = self.block(name)?;
        let (matrix, is_row) = self.as_matrix(container)?;
        let view = block_view(matrix, offset, shape);
        Ok(if is_row {
            view.index_axis_move(Axis(0), 0)
        } else {
            view
        })
    }

    /// Views every variable of a single row.
    pub fn record<'a>(&'a self, row: ArrayView1<'a, f64>) -> Result<Record<'a>> {
        self.as_matrix(row)?;
        Ok(self.split_row(row))
    }

    /// Views every variable of every row of `matrix`, one [`Record`] per row.
    pub fn view_all<'a>(&'a self, matrix: ArrayView2<'a, f64>) -> Result<Vec<Record<'a>>> {
        self.as_matrix(matrix)?;
        Ok((0..matrix.nrows())
            .map(|i| self.split_row(matrix.index_axis_move(Axis(0), i)))
            .collect())
    }

    /// Record of a row whose length is already known to be the schema width.
    pub(crate) fn split_row<'a>(&'a self, row: ArrayView1<'a, f64>) -> Record<'a> {
        let matrix = row.insert_axis(Axis(0));
        self.variables
            .iter()
            .zip(&self.offsets)
            .map(|((name, shape), &offset)| {
                let view = block_view(matrix, offset, shape).index_axis_move(Axis(0), 0);
                (name.as_str(), view)
            })
            .collect()
    }

    /// The container as a matrix of draws, and whether it was a single row.
    fn as_matrix<'a, D: Dimension>(
        &self,
        container: ArrayView<'a, f64, D>,
    ) -> Result<(ArrayView2<'a, f64>, bool)> {
        let width = self.width();
        let is_row = match *container.shape() {
            [w] if w == width => true,
            [_, w] if w == width => false,
            ref other => {
                return Err(Error::DimensionMismatch(format!(
                    "expected a row of {width} values or a matrix with {width} columns, got shape {other:?}"
                )))
            }
        };
        let mut matrix = container.into_dyn();
        if is_row {
            matrix.insert_axis_inplace(Axis(0));
        }
        Ok((matrix.into_dimensionality::<Ix2>()?, is_row))
    }
}

/**
View of the columns `offset..offset + shape.n_columns()` of every row of
`matrix`, each row's block split column-major into `shape`.

The block must lie within the columns of `matrix`. The result shares memory
with `matrix` whatever its strides.
*/
pub(crate) fn block_view<'a>(
    matrix: ArrayView2<'a, f64>,
    offset: usize,
    shape: &Shape,
) -> ArrayViewD<'a, f64> {
    let mut block = matrix;
    block.slice_axis_inplace(Axis(1), Slice::from(offset..offset + shape.n_columns()));

    let reversed_rows = block.stride_of(Axis(0)) < 0;
    if reversed_rows {
        block.invert_axis(Axis(0));
    }
    let reversed_columns = block.stride_of(Axis(1)) < 0;
    if reversed_columns {
        block.invert_axis(Axis(1));
    }

    let mut dims = Vec::with_capacity(shape.dims().len() + 1);
    dims.push(block.nrows());
    dims.extend_from_slice(shape.dims());
    // An empty view never moves along its axes, so zero strides are fine.
    let mut strides = vec![0; dims.len()];
    if block.nrows() > 0 {
        strides[0] = block.stride_of(Axis(0)).unsigned_abs();
        let mut stride = block.stride_of(Axis(1)).unsigned_abs();
        for (s, &d) in strides[1..].iter_mut().zip(shape.dims()) {
            *s = stride;
            stride *= d;
        }
    }

    // SAFETY: the strides are non-negative and address exactly the elements of
    // `block`: the leading axis keeps the row stride, and the inner axes split
    // the block's columns (d1 * ... * dk of them) in column-major order. The
    // elements are borrowed from `matrix` for `'a`.
    let mut view = unsafe {
        ArrayView::from_shape_ptr(IxDyn(&dims).strides(IxDyn(&strides)), block.as_ptr())
    };

    if reversed_rows {
        view.invert_axis(Axis(0));
    }
    if reversed_columns {
        // Reversing the flat block reverses every axis of its column-major split.
        for axis in 1..view.ndim() {
            view.invert_axis(Axis(axis));
        }
    }
    view
}

impl PartialEq for IndexSchema {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap equality ignores order.
        self.variables.len() == other.variables.len()
            && self.variables.iter().eq(other.variables.iter())
    }
}

impl Eq for IndexSchema {}

impl Default for IndexSchema {
    fn default() -> Self {
        Self {
            variables: IndexMap::new(),
            offsets: vec![0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, s, Array2};

    fn example_schema() -> IndexSchema {
        IndexSchema::new([
            ("lp__", Shape::Scalar),
            ("mu", Shape::Array(vec![3])),
            ("kappa", Shape::Array(vec![2, 2])),
            ("sigma", Shape::Scalar),
        ])
        .expect("Expected schema to be valid")
    }

    #[test]
    fn test_width_and_ranges() {
        let schema = example_schema();
        assert_eq!(schema.width(), 9);
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.column_range("lp__").unwrap(), 0..1);
        assert_eq!(schema.column_range("mu").unwrap(), 1..4);
        assert_eq!(schema.column_range("kappa").unwrap(), 4..8);
        assert_eq!(schema.column_range("sigma").unwrap(), 8..9);
        assert!(matches!(
            schema.column_range("tau"),
            Err(Error::UnknownVariable(name)) if name == "tau"
        ));
    }

    #[test]
    fn test_labels() {
        let schema = example_schema();
        let header = schema.header();
        assert_eq!(
            header,
            vec![
                "lp__", "mu.1", "mu.2", "mu.3", "kappa.1.1", "kappa.2.1", "kappa.1.2",
                "kappa.2.2", "sigma"
            ]
        );
        let labels = schema.labels();
        assert_eq!(labels.len(), schema.width());
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }

    #[test]
    fn test_from_header() {
        let schema = IndexSchema::from_header(&[
            "lp__",
            "mu.1",
            "mu.2",
            "mu.3",
            "kappa.1.1",
            "kappa.2.1",
            "kappa.1.2",
            "kappa.2.2",
            "sigma",
        ])
        .unwrap();
        assert_eq!(schema, example_schema());
    }

    #[test]
    fn test_from_header_rejects_interrupted_variable() {
        let result = IndexSchema::from_header(&["a.1", "b", "a.2"]);
        assert!(matches!(result, Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_from_header_rejects_repeated_scalar() {
        assert!(matches!(
            IndexSchema::from_header(&["a", "a"]),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            IndexSchema::from_header(&["a", "b", "a"]),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            IndexSchema::from_header(&["a", "a.1"]),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_from_header_rejects_bad_indices() {
        assert!(matches!(
            IndexSchema::from_header(&["a.1.1", "a.1.2", "a.2.1", "a.2.2"]),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            IndexSchema::from_header(&["a.2"]),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            IndexSchema::from_header(&["a.1", "a."]),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_new_rejects_duplicates_and_empty_extents() {
        assert!(IndexSchema::new([("a", Shape::Scalar), ("a", Shape::Scalar)]).is_err());
        assert!(IndexSchema::new([("a", Shape::Array(vec![]))]).is_err());
        assert!(IndexSchema::new([("a", Shape::Array(vec![2, 0]))]).is_err());
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let ab = IndexSchema::new([("a", Shape::Scalar), ("b", Shape::Scalar)]).unwrap();
        let ba = IndexSchema::new([("b", Shape::Scalar), ("a", Shape::Scalar)]).unwrap();
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());
        let a2 = IndexSchema::new([("a", Shape::Array(vec![1])), ("b", Shape::Scalar)]).unwrap();
        assert_ne!(ab, a2);
    }

    #[test]
    fn test_view_row() {
        let schema = example_schema();
        let row = arr1(&[-1.0, 1.0, 2.0, 3.0, 11.0, 21.0, 12.0, 22.0, 0.5]);

        let lp = schema.view(row.view(), "lp__").unwrap();
        assert_eq!(lp.ndim(), 0);
        assert_eq!(lp.iter().copied().collect::<Vec<_>>(), vec![-1.0]);

        let mu = schema.view(row.view(), "mu").unwrap();
        assert_eq!(mu.shape(), &[3]);
        assert_eq!(mu.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);

        let kappa = schema.view(row.view(), "kappa").unwrap();
        assert_eq!(kappa.shape(), &[2, 2]);
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(kappa[[i, j]], ((i + 1) * 10 + j + 1) as f64);
            }
        }

        assert!(matches!(
            schema.view(row.view(), "nope"),
            Err(Error::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_view_matrix_matches_column_range() {
        let schema = example_schema();
        let matrix = Array2::from_shape_fn((4, 9), |(i, j)| (100 * i + j) as f64);

        for name in ["lp__", "mu", "kappa", "sigma"] {
            let range = schema.column_range(name).unwrap();
            let view = schema.view(matrix.view(), name).unwrap();
            assert_eq!(view.shape()[0], 4);
            let shape = schema.shape(name).unwrap();
            assert_eq!(view.len(), 4 * shape.n_columns());
            for (i, draw) in view.outer_iter().enumerate() {
                // Column-major flattening of the draw must equal the literal columns.
                let flat: Vec<f64> = draw.t().iter().copied().collect();
                let expected: Vec<f64> = matrix
                    .row(i)
                    .slice(ndarray::s![range.clone()])
                    .to_vec();
                assert_eq!(flat, expected, "variable {}", name);
            }
        }
    }

    #[test]
    fn test_view_rejects_wrong_width() {
        let schema = example_schema();
        let row = arr1(&[1.0, 2.0]);
        assert!(matches!(
            schema.view(row.view(), "mu"),
            Err(Error::DimensionMismatch(_))
        ));
        let matrix = Array2::<f64>::zeros((2, 8));
        assert!(matches!(
            schema.view(matrix.view(), "mu"),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_view_empty_matrix() {
        let schema = example_schema();
        let matrix = Array2::<f64>::zeros((0, 9));
        let kappa = schema.view(matrix.view(), "kappa").unwrap();
        assert_eq!(kappa.shape(), &[0, 2, 2]);
        assert_eq!(schema.view(matrix.view(), "mu").unwrap().shape(), &[0, 3]);
        assert_eq!(schema.view(matrix.view(), "lp__").unwrap().shape(), &[0]);
        assert!(schema.view_all(matrix.view()).unwrap().is_empty());
    }

    #[test]
    fn test_view_any_layout() {
        let schema = example_schema();
        let standard = Array2::from_shape_fn((4, 9), |(i, j)| (100 * i + j) as f64);
        let mut fortran = Array2::zeros((4, 9).f());
        fortran.assign(&standard);
        let every_other = standard.slice(s![..;2, ..]);
        let backwards = standard.slice(s![..;-1, ..]);
        let flipped = standard.slice(s![.., ..;-1]);
        let flipped_copy = flipped.to_owned();

        for name in ["lp__", "mu", "kappa", "sigma"] {
            let expected = schema.view(standard.view(), name).unwrap();
            assert_eq!(schema.view(fortran.view(), name).unwrap(), expected);
            assert_eq!(
                schema.view(every_other, name).unwrap(),
                expected.slice_axis(Axis(0), Slice::new(0, None, 2))
            );
            assert_eq!(
                schema.view(backwards, name).unwrap(),
                expected.slice_axis(Axis(0), Slice::new(0, None, -1))
            );
            assert_eq!(
                schema.view(flipped, name).unwrap(),
                schema.view(flipped_copy.view(), name).unwrap()
            );
            assert_eq!(
                schema.view(fortran.row(1), name).unwrap(),
                schema.view(standard.row(1), name).unwrap()
            );
        }
        assert_eq!(
            schema.view_all(fortran.view()).unwrap(),
            schema.view_all(standard.view()).unwrap()
        );
    }

    #[test]
    fn test_huge_extents_are_rejected() {
        assert!(matches!(
            IndexSchema::from_header(&["a.1.1", "a.4294967296.4294967296"]),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            IndexSchema::new([("a", Shape::Array(vec![usize::MAX, 2]))]),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            IndexSchema::new([("a", Shape::Array(vec![usize::MAX])), ("b", Shape::Scalar)]),
            Err(Error::MalformedHeader(_))
        ));
        assert_eq!(Shape::Array(vec![usize::MAX, 2]).n_columns(), usize::MAX);
    }

    #[test]
    fn test_view_all() {
        let schema = IndexSchema::new([("a", Shape::Scalar), ("b", Shape::Array(vec![2]))]).unwrap();
        let matrix = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let records = schema.view_all(matrix.view()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["a"].ndim(), 0);
        assert_eq!(records[1]["a"].sum(), 4.0);
        assert_eq!(
            records[1]["b"].iter().copied().collect::<Vec<_>>(),
            vec![5.0, 6.0]
        );
        assert_eq!(records[0].keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
