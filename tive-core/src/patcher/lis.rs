//! Longest increasing subsequence.

/// Positions of a longest strictly increasing subsequence of `sources`.
///
/// `None` entries take no part. Runs patience sorting with a binary search
/// over pile tails and a predecessor array, so the cost is O(n log n).
/// When several subsequences share the maximum length the one built from
/// the earliest compatible predecessors is returned.
///
/// ```
/// use tive_core::patcher::longest_increasing_subsequence;
///
/// let lis = longest_increasing_subsequence(&[Some(0), Some(2), Some(1), Some(3)]);
/// assert_eq!(lis.len(), 3);
/// ```
pub fn longest_increasing_subsequence(sources: &[Option<usize>]) -> Vec<usize> {
    let mut predecessor: Vec<Option<usize>> = vec![None; sources.len()];
    // tails[k] is the position whose value ends the best run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let value_at = |position: usize| sources[position].unwrap_or(usize::MAX);

    for (position, source) in sources.iter().enumerate() {
        let Some(value) = *source else {
            continue;
        };
        let pile = tails.partition_point(|&tail| value_at(tail) < value);
        if pile > 0 {
            predecessor[position] = Some(tails[pile - 1]);
        }
        if pile == tails.len() {
            tails.push(position);
        } else {
            tails[pile] = position;
        }
    }

    let mut sequence = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        sequence.push(position);
        cursor = predecessor[position];
    }
    sequence.reverse();
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn values(sources: &[Option<usize>], lis: &[usize]) -> Vec<usize> {
        lis.iter().filter_map(|&p| sources[p]).collect()
    }

    /// Quadratic reference length.
    fn reference_len(sources: &[Option<usize>]) -> usize {
        let mut best = vec![0usize; sources.len()];
        for i in 0..sources.len() {
            let Some(vi) = sources[i] else { continue };
            best[i] = 1;
            for j in 0..i {
                if let Some(vj) = sources[j] {
                    if vj < vi {
                        best[i] = best[i].max(best[j] + 1);
                    }
                }
            }
        }
        best.into_iter().max().unwrap_or(0)
    }

    #[test]
    fn empty_and_all_new() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert!(longest_increasing_subsequence(&[None, None]).is_empty());
    }

    #[test]
    fn sorted_input_is_entirely_stable() {
        let sources = [Some(0), Some(1), Some(2)];
        assert_eq!(longest_increasing_subsequence(&sources), vec![0, 1, 2]);
    }

    #[test]
    fn single_swap_leaves_one_out() {
        let sources = [Some(0), Some(2), Some(1), Some(3)];
        let lis = longest_increasing_subsequence(&sources);
        assert_eq!(lis.len(), 3);
        assert_eq!(lis[0], 0);
        assert_eq!(lis[2], 3);
    }

    #[test]
    fn new_entries_are_skipped() {
        let sources = [None, Some(1), None, Some(0), Some(2)];
        let lis = longest_increasing_subsequence(&sources);
        assert_eq!(values(&sources, &lis), vec![1, 2]);
        assert!(lis.iter().all(|&p| sources[p].is_some()));
    }

    #[test]
    fn reversed_input_keeps_one() {
        let sources = [Some(3), Some(2), Some(1), Some(0)];
        assert_eq!(longest_increasing_subsequence(&sources).len(), 1);
    }

    #[test]
    fn equal_values_are_not_increasing() {
        let sources = [Some(1), Some(1), Some(1)];
        assert_eq!(longest_increasing_subsequence(&sources).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_subsequence_is_strictly_increasing_and_maximal(
            sources in prop::collection::vec(prop::option::of(0usize..50), 0..40)
        ) {
            let lis = longest_increasing_subsequence(&sources);

            prop_assert!(lis.windows(2).all(|w| w[0] < w[1]));
            let picked = values(&sources, &lis);
            prop_assert_eq!(picked.len(), lis.len());
            prop_assert!(picked.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(lis.len(), reference_len(&sources));
        }
    }
}
