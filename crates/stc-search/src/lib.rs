#![forbid(unsafe_code)]

//! Membership search over arrays sorted independently along every axis.
//!
//! When every axis is sorted (the staircase invariant), comparing the key with the
//! element at the midpoint `m` of a region rules out one hyper-octant:
//!
//! - `element < key`: every point dominated by `m` from below holds a value
//!   `<= element`, so the block `start..=m` on every axis is discarded.
//! - `element > key`: every point dominating `m` holds a value `>= element`, so the
//!   block `m..end` on every axis is discarded.
//!
//! The remainder is split into one sub-region per axis. For the lower case,
//! sub-region `k` starts past `m` on axis `k` and stays at or before `m` on every
//! axis below `k`; the upper case mirrors this. The sub-regions are disjoint and
//! cover the remainder exactly once. In two dimensions this is "right, then below"
//! and "left, then above".
//!
//! A single midpoint comparison cannot pick one branch the way binary search does,
//! because the per-axis orders do not add up to a total order. Worst-case cost on
//! adversarial data is far from logarithmic.

use stc_ndarray::{DenseArray, Region, dense_strides, ravel_index};

/// Result of a search together with its cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOutcome {
    pub found: bool,
    /// Number of elements compared against the key.
    pub probes: usize,
    /// Largest number of regions waiting on the work-list at once.
    pub peak_pending: usize,
}

/// Returns whether `key` occurs inside `region`.
///
/// `values`/`sizes` must satisfy the staircase invariant over the whole array and
/// `region` must lie inside `sizes`. Both are checked only in debug builds.
#[must_use]
pub fn search<T: Ord>(values: &[T], sizes: &[usize], region: &Region, key: &T) -> bool {
    search_with_stats(values, sizes, region, key).found
}

/// Full-array search.
#[must_use]
pub fn contains<T: Ord>(array: &DenseArray<T>, key: &T) -> bool {
    search(array.values(), array.sizes(), &array.full_region(), key)
}

/// [`search`], also reporting how many elements were probed.
///
/// Sub-regions are visited depth first in ascending axis order, the same order a
/// recursive implementation would use, so probe counts are deterministic.
#[must_use]
pub fn search_with_stats<T: Ord>(
    values: &[T],
    sizes: &[usize],
    region: &Region,
    key: &T,
) -> SearchOutcome {
    debug_assert!(stc_ndarray::validate_len(sizes, values.len()).is_ok());
    debug_assert!(region.validate_within(sizes).is_ok());

    let strides = dense_strides(sizes);
    let mut outcome = SearchOutcome::default();
    let mut pending = vec![region.clone()];

    while let Some(current) = pending.pop() {
        if current.is_empty() {
            continue;
        }

        let mid = current.midpoint();
        let element = &values[ravel_index(&mid, &strides)];
        outcome.probes += 1;

        match element.cmp(key) {
            std::cmp::Ordering::Equal => {
                outcome.found = true;
                return outcome;
            }
            // pushed in reverse so axis 0 is popped first
            std::cmp::Ordering::Less => {
                for axis in (0..current.rank()).rev() {
                    pending.push(beyond_lower_block(&current, &mid, axis));
                }
            }
            std::cmp::Ordering::Greater => {
                for axis in (0..current.rank()).rev() {
                    pending.push(before_upper_block(&current, &mid, axis));
                }
            }
        }
        outcome.peak_pending = outcome.peak_pending.max(pending.len());
    }

    outcome
}

/// Sub-region `axis` of the complement of `start..=mid`.
fn beyond_lower_block(region: &Region, mid: &[usize], axis: usize) -> Region {
    let mut sub = region.clone();
    sub.set_start(axis, mid[axis] + 1);
    for lower in 0..axis {
        sub.set_end(lower, mid[lower] + 1);
    }
    sub
}

/// Sub-region `axis` of the complement of `mid..end`.
fn before_upper_block(region: &Region, mid: &[usize], axis: usize) -> Region {
    let mut sub = region.clone();
    sub.set_end(axis, mid[axis]);
    for lower in 0..axis {
        sub.set_start(lower, mid[lower]);
    }
    sub
}

#[cfg(test)]
mod tests {
    use super::{
        SearchOutcome, before_upper_block, beyond_lower_block, contains, search,
        search_with_stats,
    };
    use stc_ndarray::{DenseArray, Region};

    fn brute_force(values: &[i64], key: i64) -> bool {
        values.iter().any(|&value| value == key)
    }

    #[test]
    fn one_dimensional_scenarios() {
        let values = [1i64, 3, 3, 7, 9];
        let region = Region::full(&[5]);
        assert!(search(&values, &[5], &region, &7));
        assert!(!search(&values, &[5], &region, &4));
        for key in -2..12 {
            assert_eq!(
                search(&values, &[5], &region, &key),
                brute_force(&values, key),
                "key={key}"
            );
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "validate_len")]
    fn overflowing_sizes_fail_the_length_check() {
        let sizes = [usize::MAX, 2];
        let _ = search(&[1i64, 2], &sizes, &Region::full(&sizes), &1);
    }

    #[test]
    fn empty_array_never_matches() {
        let empty: [i64; 0] = [];
        for key in [-1i64, 0, 1, i64::MAX] {
            assert!(!search(&empty, &[0], &Region::full(&[0]), &key));
            assert!(!search(&empty, &[3, 0], &Region::full(&[3, 0]), &key));
        }
    }

    #[test]
    fn two_dimensional_scenario() {
        // [[1, 2, 4], [3, 5, 6]] with size_x = 3, size_y = 2
        let array = DenseArray::new(vec![3, 2], vec![1i64, 2, 4, 3, 5, 6]).expect("array");
        assert!(contains(&array, &5));
        assert!(!contains(&array, &8));
        for key in 0..8 {
            assert_eq!(contains(&array, &key), brute_force(array.values(), key));
        }
    }

    #[test]
    fn three_dimensional_cube_scenario() {
        let cube = DenseArray::new(vec![2, 2, 2], vec![0i64, 2, 3, 5, 4, 6, 7, 10]).expect("cube");
        assert_eq!(cube.get(&[0, 0, 0]), Some(&0));
        assert_eq!(cube.get(&[1, 1, 1]), Some(&10));
        assert!(contains(&cube, &10));
        assert!(!contains(&cube, &11));
        for key in -1..12 {
            assert_eq!(contains(&cube, &key), brute_force(cube.values(), key));
        }
    }

    #[test]
    fn empty_region_is_false_for_every_key() {
        let values = [1i64, 2, 3, 4];
        let region = Region::new(vec![1, 0], vec![1, 2]).expect("region");
        for key in 0..6 {
            let outcome = search_with_stats(&values, &[2, 2], &region, &key);
            assert_eq!(outcome, SearchOutcome::default());
        }
    }

    #[test]
    fn sub_region_search_ignores_outside_values() {
        // [[1, 2, 4], [3, 5, 6]]: restrict to the first row
        let values = [1i64, 2, 4, 3, 5, 6];
        let row = Region::new(vec![0, 0], vec![3, 1]).expect("region");
        assert!(search(&values, &[3, 2], &row, &4));
        assert!(!search(&values, &[3, 2], &row, &5));
    }

    #[test]
    fn lower_decomposition_partitions_the_complement() {
        let region = Region::new(vec![0, 0, 0], vec![4, 5, 3]).expect("region");
        let mid = region.midpoint();
        let subs: Vec<_> = (0..3)
            .map(|axis| beyond_lower_block(&region, &mid, axis))
            .collect();
        for x in 0..4 {
            for y in 0..5 {
                for z in 0..3 {
                    let point = [x, y, z];
                    let dominated = point.iter().zip(&mid).all(|(&p, &m)| p <= m);
                    let hits = subs.iter().filter(|sub| sub.contains(&point)).count();
                    assert_eq!(hits, usize::from(!dominated), "point={point:?}");
                }
            }
        }
    }

    #[test]
    fn upper_decomposition_partitions_the_complement() {
        let region = Region::new(vec![1, 0, 2], vec![6, 4, 5]).expect("region");
        let mid = region.midpoint();
        let subs: Vec<_> = (0..3)
            .map(|axis| before_upper_block(&region, &mid, axis))
            .collect();
        for x in 1..6 {
            for y in 0..4 {
                for z in 2..5 {
                    let point = [x, y, z];
                    let dominating = point.iter().zip(&mid).all(|(&p, &m)| p >= m);
                    let hits = subs.iter().filter(|sub| sub.contains(&point)).count();
                    assert_eq!(hits, usize::from(!dominating), "point={point:?}");
                }
            }
        }
    }

    #[test]
    fn two_dimensional_split_matches_right_then_below() {
        let region = Region::new(vec![0, 0], vec![5, 4]).expect("region");
        let mid = region.midpoint();
        assert_eq!(mid, vec![2, 2]);
        let right = beyond_lower_block(&region, &mid, 0);
        let below = beyond_lower_block(&region, &mid, 1);
        assert_eq!((right.start(), right.end()), (&[3, 0][..], &[5, 4][..]));
        assert_eq!((below.start(), below.end()), (&[0, 3][..], &[3, 4][..]));

        let left = before_upper_block(&region, &mid, 0);
        let above = before_upper_block(&region, &mid, 1);
        assert_eq!((left.start(), left.end()), (&[0, 0][..], &[2, 4][..]));
        assert_eq!((above.start(), above.end()), (&[2, 0][..], &[5, 2][..]));
    }

    #[test]
    fn repeated_searches_are_deterministic() {
        let values: Vec<i64> = (0..64).map(|idx| idx / 3).collect();
        let region = Region::full(&[8, 8]);
        let sorted = {
            let mut grid = values.clone();
            grid.sort_unstable();
            grid
        };
        for key in [0i64, 7, 13, 21, 99] {
            let first = search_with_stats(&sorted, &[8, 8], &region, &key);
            let second = search_with_stats(&sorted, &[8, 8], &region, &key);
            assert_eq!(first, second, "key={key}");
        }
    }

    #[test]
    fn probe_count_of_a_direct_hit_is_one() {
        let values = [1i64, 3, 3, 7, 9];
        let outcome = search_with_stats(&values, &[5], &Region::full(&[5]), &3);
        assert!(outcome.found);
        assert_eq!(outcome.probes, 1);
        assert_eq!(outcome.peak_pending, 0);
    }
}
