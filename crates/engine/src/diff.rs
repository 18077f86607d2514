//! Line-based change estimate.

/// Approximate number of changed lines between `before` and `after`.
///
/// The absolute difference in line count plus the number of differing lines
/// at shared indices. An insertion near the top therefore counts every
/// shifted line; this is not an edit distance.
pub fn count_changes(before: &str, after: &str) -> usize {
    if before == after {
        return 0;
    }
    let before_lines: Vec<&str> = before.split('\n').collect();
    let after_lines: Vec<&str> = after.split('\n').collect();

    let shared_differences = before_lines
        .iter()
        .zip(&after_lines)
        .filter(|(b, a)| b != a)
        .count();

    before_lines.len().abs_diff(after_lines.len()) + shared_differences
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("a\nb", "a\nb", 0)]
    #[case("<div>&quot;hi&quot;</div>", "<div>\"hi\"</div>", 1)]
    #[case("a\nb", "a\nb\nc", 1)]
    #[case("a\nb\nc", "x\nb", 2)]
    #[case("a", "b\na", 2)]
    fn counts_line_changes(#[case] before: &str, #[case] after: &str, #[case] expected: usize) {
        assert_eq!(count_changes(before, after), expected);
    }

    proptest! {
        #[test]
        fn differing_line_counts_always_register(
            lines in prop::collection::vec("[a-z]{0,8}", 1..10),
            extra in 1usize..5
        ) {
            let before = lines.join("\n");
            let mut longer = lines.clone();
            longer.extend(std::iter::repeat(String::from("x")).take(extra));
            let after = longer.join("\n");
            prop_assert!(count_changes(&before, &after) >= extra);
            prop_assert_eq!(count_changes(&before, &before), 0);
        }
    }
}
