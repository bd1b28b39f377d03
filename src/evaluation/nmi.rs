use std::collections::HashMap;

use crate::error::{EvalError, EvalResult};

/// Normalized mutual information between two labelings.
///
/// Uses the arithmetic mean of the two entropies as normaliser. Two
/// single-class labelings count as identical (1.0); a single-class labeling
/// against any other scores 0.0.
pub fn normalized_mutual_information(left: &[usize], right: &[usize]) -> EvalResult<f64> {
    if left.len() != right.len() {
        return Err(EvalError::ShapeMismatch(format!(
            "label vectors cover {} and {} nodes",
            left.len(),
            right.len()
        )));
    }
    if left.is_empty() {
        return Err(EvalError::ShapeMismatch(
            "label vectors are empty".to_string(),
        ));
    }

    let n = left.len() as f64;
    let left_counts = counts(left.iter().copied());
    let right_counts = counts(right.iter().copied());
    if left_counts.len() == 1 && right_counts.len() == 1 {
        return Ok(1.0);
    }

    let joint = counts(left.iter().copied().zip(right.iter().copied()));
    let mutual_information: f64 = joint
        .iter()
        .map(|((a, b), &count)| {
            let p_ab = count as f64 / n;
            let p_a = left_counts[a] as f64 / n;
            let p_b = right_counts[b] as f64 / n;
            p_ab * (p_ab / (p_a * p_b)).ln()
        })
        .sum();

    let normaliser = (entropy(&left_counts, n) + entropy(&right_counts, n)) / 2.0;
    if normaliser <= f64::EPSILON {
        return Ok(0.0);
    }
    Ok((mutual_information / normaliser).clamp(0.0, 1.0))
}

fn counts<T, I>(values: I) -> HashMap<T, usize>
where
    T: std::hash::Hash + Eq,
    I: Iterator<Item = T>,
{
    let mut freq = HashMap::new();
    for value in values {
        *freq.entry(value).or_insert(0usize) += 1;
    }
    freq
}

fn entropy<T>(counts: &HashMap<T, usize>, n: f64) -> f64 {
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_labelings_score_one() {
        let labels = [0, 0, 1, 1, 2, 2];
        let score = normalized_mutual_information(&labels, &labels).expect("nmi");
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn relabeling_does_not_change_score() {
        let a = [0, 0, 1, 1, 1, 2];
        let b = [2, 2, 0, 0, 0, 1];
        let c = [0, 1, 1, 0, 2, 2];
        let direct = normalized_mutual_information(&a, &c).expect("nmi");
        let relabeled = normalized_mutual_information(&b, &c).expect("nmi");
        assert!((direct - relabeled).abs() < 1e-12);
        assert!((normalized_mutual_information(&a, &b).expect("nmi") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn score_is_symmetric() {
        let a = [0, 0, 0, 1, 1, 2, 2, 2];
        let b = [1, 1, 0, 0, 0, 0, 2, 2];
        let ab = normalized_mutual_information(&a, &b).expect("nmi");
        let ba = normalized_mutual_information(&b, &a).expect("nmi");
        assert!((ab - ba).abs() < 1e-12);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn independent_labelings_score_zero() {
        let a = [0, 0, 1, 1];
        let b = [0, 1, 0, 1];
        let score = normalized_mutual_information(&a, &b).expect("nmi");
        assert!(score.abs() < 1e-12);
    }

    #[test]
    fn single_cluster_conventions() {
        assert_eq!(
            normalized_mutual_information(&[0, 0, 0], &[4, 4, 4]).expect("nmi"),
            1.0
        );
        assert_eq!(
            normalized_mutual_information(&[0, 0, 0], &[0, 1, 1]).expect("nmi"),
            0.0
        );
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(matches!(
            normalized_mutual_information(&[0, 1], &[0, 1, 1]),
            Err(EvalError::ShapeMismatch(_))
        ));
        assert!(normalized_mutual_information(&[], &[]).is_err());
    }
}
