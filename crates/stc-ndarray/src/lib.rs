#![forbid(unsafe_code)]

//! Dense array layout used by the staircase search.
//!
//! Arrays are stored flat with axis 0 varying fastest: element `(i_0, .., i_{D-1})`
//! lives at `Σ i_k * stride_k`, where `stride_k` is the product of the sizes of
//! every lower-ranked axis.

pub const SHAPE_REASON_CODES: [&str; 6] = [
    "shape_size_overflow",
    "shape_element_count_mismatch",
    "shape_axis_out_of_bounds",
    "shape_rank_mismatch",
    "shape_region_inverted",
    "shape_region_out_of_bounds",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Overflow,
    IncompatibleElementCount { expected: usize, actual: usize },
    AxisOutOfBounds { axis: usize, ndim: usize },
    RankMismatch { expected: usize, actual: usize },
    InvertedRegion { axis: usize, start: usize, end: usize },
    RegionOutOfBounds { axis: usize, end: usize, size: usize },
}

impl ShapeError {
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Overflow => "shape_size_overflow",
            Self::IncompatibleElementCount { .. } => "shape_element_count_mismatch",
            Self::AxisOutOfBounds { .. } => "shape_axis_out_of_bounds",
            Self::RankMismatch { .. } => "shape_rank_mismatch",
            Self::InvertedRegion { .. } => "shape_region_inverted",
            Self::RegionOutOfBounds { .. } => "shape_region_out_of_bounds",
        }
    }
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overflow => write!(f, "size arithmetic overflow"),
            Self::IncompatibleElementCount { expected, actual } => {
                write!(f, "element count mismatch expected={expected} actual={actual}")
            }
            Self::AxisOutOfBounds { axis, ndim } => {
                write!(f, "axis {axis} is out of bounds for array of dimension {ndim}")
            }
            Self::RankMismatch { expected, actual } => {
                write!(f, "rank mismatch expected={expected} actual={actual}")
            }
            Self::InvertedRegion { axis, start, end } => {
                write!(f, "region start {start} exceeds end {end} on axis {axis}")
            }
            Self::RegionOutOfBounds { axis, end, size } => {
                write!(f, "region end {end} exceeds size {size} on axis {axis}")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

pub fn element_count(sizes: &[usize]) -> Result<usize, ShapeError> {
    sizes.iter().try_fold(1usize, |acc, &dim| {
        acc.checked_mul(dim).ok_or(ShapeError::Overflow)
    })
}

/// Element strides with axis 0 fastest.
pub fn contiguous_strides(sizes: &[usize]) -> Result<Vec<usize>, ShapeError> {
    let mut strides = Vec::with_capacity(sizes.len());
    let mut stride = 1usize;
    for &dim in sizes {
        strides.push(stride);
        stride = stride.checked_mul(dim).ok_or(ShapeError::Overflow)?;
    }
    Ok(strides)
}

/// Same as [`contiguous_strides`] for sizes already known to describe an
/// allocated buffer, where the product cannot overflow.
#[must_use]
pub fn dense_strides(sizes: &[usize]) -> Vec<usize> {
    let mut stride = 1usize;
    sizes
        .iter()
        .map(|&dim| {
            let current = stride;
            stride = stride.saturating_mul(dim);
            current
        })
        .collect()
}

pub fn validate_axis(axis: usize, ndim: usize) -> Result<(), ShapeError> {
    if axis >= ndim {
        return Err(ShapeError::AxisOutOfBounds { axis, ndim });
    }
    Ok(())
}

/// Checks that `len` matches the element count of `sizes`.
pub fn validate_len(sizes: &[usize], len: usize) -> Result<usize, ShapeError> {
    let expected = element_count(sizes)?;
    if expected != len {
        return Err(ShapeError::IncompatibleElementCount {
            expected,
            actual: len,
        });
    }
    Ok(expected)
}

#[must_use]
pub fn ravel_index(coord: &[usize], strides: &[usize]) -> usize {
    debug_assert_eq!(coord.len(), strides.len());
    coord
        .iter()
        .zip(strides)
        .map(|(&idx, &stride)| idx * stride)
        .sum()
}

#[must_use]
pub fn unravel_index(mut flat: usize, sizes: &[usize]) -> Vec<usize> {
    let mut coord = Vec::with_capacity(sizes.len());
    for &dim in sizes {
        if dim == 0 {
            coord.push(0);
            continue;
        }
        coord.push(flat % dim);
        flat /= dim;
    }
    coord
}

/// Half-open hyper-rectangle `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    start: Vec<usize>,
    end: Vec<usize>,
}

impl Region {
    pub fn new(start: Vec<usize>, end: Vec<usize>) -> Result<Self, ShapeError> {
        if start.len() != end.len() {
            return Err(ShapeError::RankMismatch {
                expected: start.len(),
                actual: end.len(),
            });
        }
        for (axis, (&s, &e)) in start.iter().zip(&end).enumerate() {
            if s > e {
                return Err(ShapeError::InvertedRegion {
                    axis,
                    start: s,
                    end: e,
                });
            }
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn full(sizes: &[usize]) -> Self {
        Self {
            start: vec![0; sizes.len()],
            end: sizes.to_vec(),
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.start.len()
    }

    #[must_use]
    pub fn start(&self) -> &[usize] {
        &self.start
    }

    #[must_use]
    pub fn end(&self) -> &[usize] {
        &self.end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.iter().zip(&self.end).any(|(&s, &e)| s == e)
    }

    #[must_use]
    pub fn elem_count(&self) -> usize {
        self.start
            .iter()
            .zip(&self.end)
            .map(|(&s, &e)| e - s)
            .product()
    }

    /// Floor midpoint on every axis.
    #[must_use]
    pub fn midpoint(&self) -> Vec<usize> {
        self.start
            .iter()
            .zip(&self.end)
            .map(|(&s, &e)| s + (e - s) / 2)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, coord: &[usize]) -> bool {
        coord.len() == self.rank()
            && coord
                .iter()
                .zip(self.start.iter().zip(&self.end))
                .all(|(&c, (&s, &e))| s <= c && c < e)
    }

    /// Checks that the region lies inside an array of the given sizes.
    pub fn validate_within(&self, sizes: &[usize]) -> Result<(), ShapeError> {
        if sizes.len() != self.rank() {
            return Err(ShapeError::RankMismatch {
                expected: sizes.len(),
                actual: self.rank(),
            });
        }
        for (axis, (&end, &size)) in self.end.iter().zip(sizes).enumerate() {
            if end > size {
                return Err(ShapeError::RegionOutOfBounds { axis, end, size });
            }
        }
        Ok(())
    }

    pub fn set_start(&mut self, axis: usize, value: usize) {
        debug_assert!(value <= self.end[axis]);
        self.start[axis] = value;
    }

    pub fn set_end(&mut self, axis: usize, value: usize) {
        debug_assert!(self.start[axis] <= value);
        self.end[axis] = value;
    }
}

/// Flat owned array with an x-fastest size vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseArray<T> {
    sizes: Vec<usize>,
    strides: Vec<usize>,
    values: Vec<T>,
}

impl<T> DenseArray<T> {
    pub fn new(sizes: Vec<usize>, values: Vec<T>) -> Result<Self, ShapeError> {
        validate_len(&sizes, values.len())?;
        let strides = contiguous_strides(&sizes)?;
        Ok(Self {
            sizes,
            strides,
            values,
        })
    }

    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.sizes.len()
    }

    #[must_use]
    pub fn full_region(&self) -> Region {
        Region::full(&self.sizes)
    }

    #[must_use]
    pub fn get(&self, coord: &[usize]) -> Option<&T> {
        if coord.len() != self.sizes.len() || coord.iter().zip(&self.sizes).any(|(&c, &s)| c >= s)
        {
            return None;
        }
        self.values.get(ravel_index(coord, &self.strides))
    }

    /// Re-adopts a replacement buffer produced by an out-of-place operation.
    pub fn replace(&mut self, sizes: Vec<usize>, values: Vec<T>) -> Result<(), ShapeError> {
        validate_len(&sizes, values.len())?;
        self.strides = contiguous_strides(&sizes)?;
        self.sizes = sizes;
        self.values = values;
        Ok(())
    }
}
