//! Train/test splitting.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Number of training samples for `len` items at `train_ratio`.
///
/// Rounds half to even, so 0.9 x 5 = 4.5 gives 4 and 0.9 x 15 = 13.5 gives 14.
pub fn train_size(len: usize, train_ratio: f64) -> usize {
    let ratio = if train_ratio.is_finite() {
        train_ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((ratio * len as f64).round_ties_even() as usize).min(len)
}

/// Randomly permute `0..len` and cut it into (train, test).
///
/// With a seed the permutation is reproducible; without one it is drawn from the OS.
pub fn split_indices(len: usize, train_ratio: f64, seed: Option<u64>) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..len).collect();
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    order.shuffle(&mut rng);
    let test = order.split_off(train_size(len, train_ratio));
    (order, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_frames_split_nine_one() {
        let (train, test) = split_indices(10, 0.9, Some(3));
        assert_eq!((train.len(), test.len()), (9, 1));
        let mut all: Vec<_> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(train_size(5, 0.9), 4);
        assert_eq!(train_size(15, 0.9), 14);
        assert_eq!(train_size(1, 0.5), 0);
        assert_eq!(train_size(3, 0.5), 2);
    }

    #[test]
    fn seeded_split_is_reproducible() {
        assert_eq!(split_indices(50, 0.8, Some(9)), split_indices(50, 0.8, Some(9)));
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(split_indices(0, 0.9, Some(1)), (vec![], vec![]));
        assert_eq!(train_size(10, 1.5), 10);
        assert_eq!(train_size(10, f64::NAN), 0);
    }
}
