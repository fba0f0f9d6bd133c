/// Returns the index of the highest score.
///
/// Ties resolve to the first index holding the maximum. NaN ranks above every
/// number, so the first NaN score wins if there is one.
///
/// # Panics
///
/// Panics if `scores` is empty.
pub fn arg_max(scores: &[f32]) -> usize {
    assert!(!scores.is_empty(), "arg_max of an empty score vector");

    if let Some(i) = scores.iter().position(|score| score.is_nan()) {
        return i;
    }

    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    best
}
