//! Generic chunking for paginated listings.

/// Split `items` into groups of `per_page`, mapping each element through
/// `transform`. Groups keep the original order; the last group holds the
/// remainder.
///
/// A non-positive `per_page` yields zero groups. Callers that mean "no
/// pagination" must build the single all-elements group themselves — see
/// [`single_group`].
pub fn paginate_transform<T, U, F>(items: &[T], per_page: i64, mut transform: F) -> Vec<Vec<U>>
where
    F: FnMut(&T) -> U,
{
    if per_page <= 0 {
        return Vec::new();
    }

    items
        .chunks(per_page as usize)
        .map(|chunk| chunk.iter().map(&mut transform).collect())
        .collect()
}

/// The "no pagination" case: one group containing every element.
///
/// Distinct from `paginate_transform` with `per_page <= 0`, which yields no
/// groups at all.
pub fn single_group<T, U, F>(items: &[T], transform: F) -> Vec<Vec<U>>
where
    F: FnMut(&T) -> U,
{
    vec![items.iter().map(transform).collect()]
}
