#![forbid(unsafe_code)]

//! Axis permutation and per-axis line sorting.
//!
//! Sorting is implemented once, as a sort of the contiguous lines along axis 0.
//! Any other axis is first swapped into position 0 with [`transpose_axes`], sorted,
//! and swapped back. A pairwise swap is its own inverse, so the round trip restores
//! the original layout.

use stc_ndarray::{
    DenseArray, ShapeError, contiguous_strides, dense_strides, validate_axis, validate_len,
};

/// Returns a copy of `values` with axes `axis_a` and `axis_b` swapped, together
/// with the swapped size vector.
pub fn transpose_axes<T: Copy>(
    values: &[T],
    sizes: &[usize],
    axis_a: usize,
    axis_b: usize,
) -> Result<(Vec<T>, Vec<usize>), ShapeError> {
    let ndim = sizes.len();
    validate_axis(axis_a, ndim)?;
    validate_axis(axis_b, ndim)?;
    let count = validate_len(sizes, values.len())?;

    let mut out_sizes = sizes.to_vec();
    out_sizes.swap(axis_a, axis_b);
    if axis_a == axis_b || count == 0 {
        return Ok((values.to_vec(), out_sizes));
    }

    // Source axis k lands on output axis perm(k), so its step in the output is
    // the output stride of the swapped axis.
    let mut steps = contiguous_strides(&out_sizes)?;
    steps.swap(axis_a, axis_b);

    let mut out = values.to_vec();
    let mut coord = vec![0usize; ndim];
    let mut dst = 0usize;
    for (flat, &value) in values.iter().enumerate() {
        out[dst] = value;
        if flat + 1 == count {
            break;
        }
        // odometer over the source coordinate, axis 0 fastest
        for axis in 0..ndim {
            coord[axis] += 1;
            dst += steps[axis];
            if coord[axis] < sizes[axis] {
                break;
            }
            coord[axis] = 0;
            dst -= steps[axis] * sizes[axis];
        }
    }

    Ok((out, out_sizes))
}

/// Sorts every line along `axis` independently and returns the replacement buffer.
///
/// Ordering along the other axes is not preserved. Axes of length 0 or 1 are a
/// no-op.
pub fn axis_sort<T: Ord + Copy>(
    values: &[T],
    sizes: &[usize],
    axis: usize,
) -> Result<Vec<T>, ShapeError> {
    validate_axis(axis, sizes.len())?;
    let count = validate_len(sizes, values.len())?;
    let line = sizes[axis];
    if line <= 1 || count == 0 {
        return Ok(values.to_vec());
    }

    if axis == 0 {
        let mut out = values.to_vec();
        sort_lines(&mut out, line);
        return Ok(out);
    }

    let (mut swapped, swapped_sizes) = transpose_axes(values, sizes, 0, axis)?;
    sort_lines(&mut swapped, line);
    let (out, _) = transpose_axes(&swapped, &swapped_sizes, 0, axis)?;
    Ok(out)
}

/// Applies [`axis_sort`] once per axis in ascending order, establishing the
/// staircase invariant.
pub fn sort_all_axes<T: Ord + Copy>(values: &[T], sizes: &[usize]) -> Result<Vec<T>, ShapeError> {
    validate_len(sizes, values.len())?;
    let mut out = values.to_vec();
    for axis in 0..sizes.len() {
        out = axis_sort(&out, sizes, axis)?;
    }
    Ok(out)
}

fn sort_lines<T: Ord>(values: &mut [T], line: usize) {
    for chunk in values.chunks_exact_mut(line) {
        chunk.sort_unstable();
    }
}

pub fn transpose_array<T: Copy>(
    array: &DenseArray<T>,
    axis_a: usize,
    axis_b: usize,
) -> Result<DenseArray<T>, ShapeError> {
    let (values, sizes) = transpose_axes(array.values(), array.sizes(), axis_a, axis_b)?;
    DenseArray::new(sizes, values)
}

pub fn sort_array_axis<T: Ord + Copy>(
    array: &mut DenseArray<T>,
    axis: usize,
) -> Result<(), ShapeError> {
    let sorted = axis_sort(array.values(), array.sizes(), axis)?;
    let sizes = array.sizes().to_vec();
    array.replace(sizes, sorted)
}

pub fn sort_array_all_axes<T: Ord + Copy>(array: &mut DenseArray<T>) -> Result<(), ShapeError> {
    for axis in 0..array.ndim() {
        sort_array_axis(array, axis)?;
    }
    Ok(())
}

/// First adjacent pair found out of order along some axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaircaseViolation {
    pub axis: usize,
    pub flat_index: usize,
}

/// Scans every adjacent pair along every axis.
///
/// Returns the first pair whose value decreases as the coordinate increases, or
/// `None` when the staircase invariant holds.
pub fn find_staircase_violation<T: Ord>(
    values: &[T],
    sizes: &[usize],
) -> Result<Option<StaircaseViolation>, ShapeError> {
    validate_len(sizes, values.len())?;
    let strides = dense_strides(sizes);
    for (axis, (&size, &stride)) in sizes.iter().zip(&strides).enumerate() {
        if size <= 1 {
            continue;
        }
        for (flat, value) in values.iter().enumerate() {
            let coord = (flat / stride) % size;
            if coord + 1 < size && *value > values[flat + stride] {
                return Ok(Some(StaircaseViolation {
                    axis,
                    flat_index: flat,
                }));
            }
        }
    }
    Ok(None)
}

pub fn is_staircase<T: Ord>(values: &[T], sizes: &[usize]) -> bool {
    matches!(find_staircase_violation(values, sizes), Ok(None))
}
