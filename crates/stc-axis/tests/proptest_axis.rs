//! Property tests for axis transpose and per-axis sorting.

use proptest::prelude::*;
use stc_axis::{axis_sort, is_staircase, sort_all_axes, transpose_axes};

fn arb_array(max_ndim: usize, max_size: usize) -> impl Strategy<Value = (Vec<usize>, Vec<i64>)> {
    proptest::collection::vec(0..=max_size, 1..=max_ndim).prop_flat_map(|sizes| {
        let count = sizes.iter().product::<usize>();
        (
            Just(sizes),
            proptest::collection::vec(-50i64..50, count..=count),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn transpose_twice_restores_layout(
        (sizes, values) in arb_array(4, 5),
        a in 0usize..4,
        b in 0usize..4,
    ) {
        let a = a % sizes.len();
        let b = b % sizes.len();
        let (once, once_sizes) = transpose_axes(&values, &sizes, a, b).unwrap();
        let (twice, twice_sizes) = transpose_axes(&once, &once_sizes, a, b).unwrap();
        prop_assert_eq!(twice, values);
        prop_assert_eq!(twice_sizes, sizes);
    }

    #[test]
    fn sorted_axis_lines_are_non_decreasing((sizes, values) in arb_array(3, 6), axis in 0usize..3) {
        let axis = axis % sizes.len();
        let sorted = axis_sort(&values, &sizes, axis).unwrap();
        let (swapped, swapped_sizes) = transpose_axes(&sorted, &sizes, 0, axis).unwrap();
        let line = swapped_sizes[0];
        if line > 0 {
            for chunk in swapped.chunks(line) {
                prop_assert!(chunk.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn sorting_all_axes_yields_staircase((sizes, values) in arb_array(4, 5)) {
        let sorted = sort_all_axes(&values, &sizes).unwrap();
        prop_assert!(is_staircase(&sorted, &sizes));

        let mut lhs = sorted;
        let mut rhs = values;
        lhs.sort_unstable();
        rhs.sort_unstable();
        prop_assert_eq!(lhs, rhs);
    }
}
