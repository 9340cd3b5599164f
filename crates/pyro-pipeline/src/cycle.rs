//! Cyclic stepping over a fixed, ordered set of values.

/// Return the element after `current` in `values`, wrapping to the start.
///
/// If `current` is not in `values` (or `values` is empty) the `fallback` is
/// returned instead.
pub fn cycle_next<T: PartialEq + Copy>(values: &[T], current: &T, fallback: T) -> T {
    match values.iter().position(|v| v == current) {
        Some(idx) => values[(idx + 1) % values.len()],
        None => fallback,
    }
}
