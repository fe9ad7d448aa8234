/*!
Tabulation of elections with the Schulze method.

The method takes the pairwise tally of an election, keeps the direct
defeats, computes for every ordered pair of candidates the strength of the
strongest beatpath between them, and ranks the candidates by comparing
these strengths in both directions.

```
use schulze_voting::*;

let tally = PairwiseTally::from_rows(&[
    vec![0, 20, 26, 30, 22],
    vec![25, 0, 16, 33, 18],
    vec![19, 29, 0, 17, 24],
    vec![15, 12, 28, 0, 14],
    vec![23, 27, 21, 31, 0],
])?;

let mut p = build_defeat_matrix(&tally);
compute_strongest_paths(&mut p);
let ranking = extract_ranking(&p);

assert_eq!(ranking.tiers, vec![vec![4], vec![0], vec![2], vec![1], vec![3]]);
# Ok::<(), SchulzeError>(())
```
*/
pub mod builder;
mod config;
pub mod manual;

use log::{debug, info, warn};
use snafu::ensure;

use std::collections::HashMap;

pub use crate::config::*;
use crate::config::{check_unique_names, CandidateCountMismatchSnafu};

/// Builds the direct defeat strengths from a tally, counting winning votes.
///
/// `p[i][j]` is `d[i][j]` when `i` wins head-to-head against `j` and `0`
/// otherwise, including ties. The diagonal is always `0`.
pub fn build_defeat_matrix(tally: &PairwiseTally) -> StrengthMatrix {
    build_defeat_matrix_with(tally, DefeatMeasure::WinningVotes)
}

/// Same as [`build_defeat_matrix`], with a choice of defeat strength.
pub fn build_defeat_matrix_with(tally: &PairwiseTally, measure: DefeatMeasure) -> StrengthMatrix {
    let c = tally.num_candidates();
    let mut p = StrengthMatrix::zeros(c);
    for i in 0..c {
        for j in 0..c {
            if i == j {
                continue;
            }
            let (d_ij, d_ji) = (tally.get(i, j), tally.get(j, i));
            if d_ij > d_ji {
                let strength = match measure {
                    DefeatMeasure::WinningVotes => d_ij,
                    DefeatMeasure::Margin => d_ij - d_ji,
                };
                p.set(i, j, strength);
            }
        }
    }
    p
}

/// Turns direct defeat strengths into strongest beatpath strengths, in place.
///
/// This is a widest-path variant of Floyd–Warshall:
/// `p[j][k] = max(p[j][k], min(p[j][i], p[i][k]))`.
///
/// The intermediate candidate `i` must be the outermost loop. After the
/// iteration for `i` completes, `p[j][k]` is the strongest path from `j` to
/// `k` that only goes through candidates `0..=i`; iterations for later
/// candidates read those values. Any other loop order returns a matrix that
/// looks plausible and is wrong.
///
/// Running it on an already closed matrix leaves the matrix unchanged.
pub fn compute_strongest_paths(p: &mut StrengthMatrix) {
    let c = p.num_candidates();
    for i in 0..c {
        for j in 0..c {
            if j == i {
                continue;
            }
            let p_ji = p.get(j, i);
            if p_ji == 0 {
                // min(0, _) can never improve a path.
                continue;
            }
            for k in 0..c {
                if k == i || k == j {
                    continue;
                }
                let through_i = p_ji.min(p.get(i, k));
                if through_i > p.get(j, k) {
                    p.set(j, k, through_i);
                }
            }
        }
    }
}

/// Convenience: defeat matrix and closure in one step.
pub fn strongest_paths(tally: &PairwiseTally) -> StrengthMatrix {
    let mut p = build_defeat_matrix(tally);
    compute_strongest_paths(&mut p);
    p
}

/// Derives the beats relation and the strongest-to-weakest tiers from a
/// closed matrix.
///
/// Tiers are built by repeatedly taking every remaining candidate that no
/// remaining candidate beats. The relation is acyclic for any closed matrix,
/// so every step removes at least one candidate.
pub fn extract_ranking(p: &StrengthMatrix) -> SchulzeRanking {
    let c = p.num_candidates();
    let mut cells = vec![false; c * c];
    for i in 0..c {
        for j in 0..c {
            cells[i * c + j] = i != j && p.get(i, j) > p.get(j, i);
        }
    }
    let beats = BeatsRelation { size: c, cells };

    let mut remaining: Vec<usize> = (0..c).collect();
    let mut tiers: Vec<Vec<usize>> = Vec::new();
    while !remaining.is_empty() {
        let tier: Vec<usize> = remaining
            .iter()
            .cloned()
            .filter(|&j| !remaining.iter().any(|&i| beats.beats(i, j)))
            .collect();
        if tier.is_empty() {
            // Only reachable if the matrix was not closed.
            warn!(
                "extract_ranking: cycle among candidates {:?}, grouping them together",
                remaining
            );
            tiers.push(remaining);
            break;
        }
        remaining.retain(|cid| !tier.contains(cid));
        tiers.push(tier);
    }
    debug!("extract_ranking: tiers: {:?}", tiers);

    SchulzeRanking { beats, tiers }
}

/// Flattens the tiers of a ranking into one order, from strongest to weakest.
///
/// This is a policy layer on top of the Schulze method: candidates inside a
/// tier are ordered according to `tiebreak`. With
/// [`TieBreakMode::Unresolved`], an order is only returned if there are no
/// ties.
///
/// `candidates` holds the candidate names used by the random mode. Missing
/// names fall back to the candidate index.
pub fn total_order(
    ranking: &SchulzeRanking,
    tiebreak: TieBreakMode,
    candidates: Option<&[String]>,
) -> Option<Vec<usize>> {
    let mut res: Vec<usize> = Vec::with_capacity(ranking.beats.num_candidates());
    for tier in ranking.tiers.iter() {
        if tier.len() == 1 {
            res.extend(tier);
            continue;
        }
        match tiebreak {
            TieBreakMode::Unresolved => {
                debug!("total_order: unresolved tie between {:?}", tier);
                return None;
            }
            TieBreakMode::UseCandidateOrder => {
                let mut sorted = tier.clone();
                sorted.sort_unstable();
                res.extend(sorted);
            }
            TieBreakMode::Random(seed) => {
                let with_names: Vec<(usize, String)> = tier
                    .iter()
                    .map(|&cid| {
                        let name = candidates
                            .and_then(|names| names.get(cid))
                            .cloned()
                            .unwrap_or_else(|| cid.to_string());
                        (cid, name)
                    })
                    .collect();
                let permuted = candidate_permutation_crypto(&with_names, seed);
                debug!(
                    "total_order: tie between {:?} resolved with seed {}: {:?}",
                    tier, seed, permuted
                );
                res.extend(permuted);
            }
        }
    }
    Some(res)
}

/// Runs the whole method on a tally.
///
/// Arguments:
/// * `tally` the pairwise tally of the election
/// * `rules` the defeat measure and the tie-break policy
/// * `candidates` optional names, only used for logging and by the random
/// tie-break. If provided, there must be one distinct name per candidate.
pub fn run_schulze(
    tally: &PairwiseTally,
    rules: &SchulzeRules,
    candidates: Option<&[String]>,
) -> Result<SchulzeResult, SchulzeError> {
    let c = tally.num_candidates();
    info!("Processing tally with {} candidates, rules: {:?}", c, rules);
    if let Some(names) = candidates {
        ensure!(
            names.len() == c,
            CandidateCountMismatchSnafu {
                names: names.len(),
                tally: c
            }
        );
        check_unique_names(names)?;
    }
    let name_of = |cid: usize| -> String {
        candidates
            .and_then(|names| names.get(cid))
            .cloned()
            .unwrap_or_else(|| cid.to_string())
    };

    let defeats = build_defeat_matrix_with(tally, rules.defeat_measure);
    debug!("run_schulze: defeats: {:?}", defeats.rows());

    let mut strongest = defeats.clone();
    compute_strongest_paths(&mut strongest);
    debug!("run_schulze: strongest paths: {:?}", strongest.rows());

    let ranking = extract_ranking(&strongest);
    for (idx, tier) in ranking.tiers.iter().enumerate() {
        let names: Vec<String> = tier.iter().map(|&cid| name_of(cid)).collect();
        info!("Rank {}: {}", idx + 1, names.join(", "));
    }

    let order = total_order(&ranking, rules.tiebreak_mode, candidates);
    if order.is_none() {
        info!("Ties remain after ranking, no total order produced");
    }

    Ok(SchulzeResult {
        defeats,
        strongest_paths: strongest,
        ranking,
        order,
    })
}

/// Generates a "random" permutation of the candidates. Random in this context means hard to guess in advance.
/// This uses a cryptographic hash that is resilient to collisions.
fn candidate_permutation_crypto(candidates: &[(usize, String)], seed: u32) -> Vec<usize> {
    let digests: HashMap<usize, String> = candidates
        .iter()
        .map(|(cid, name)| (*cid, sha256::digest(format!("{:08}{}", seed, name))))
        .collect();
    let mut res: Vec<usize> = candidates.iter().map(|(cid, _)| *cid).collect();
    // The index breaks the (astronomically unlikely) digest collisions.
    res.sort_by(|a, b| digests[a].cmp(&digests[b]).then(a.cmp(b)));
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn canonical_tally() -> PairwiseTally {
        PairwiseTally::from_rows(&[
            vec![0, 20, 26, 30, 22],
            vec![25, 0, 16, 33, 18],
            vec![19, 29, 0, 17, 24],
            vec![15, 12, 28, 0, 14],
            vec![23, 27, 21, 31, 0],
        ])
        .unwrap()
    }

    fn names(s: &[&str]) -> Vec<String> {
        s.iter().map(|x| x.to_string()).collect()
    }

    /// The strongest path by exhaustive enumeration of simple paths.
    fn brute_force_widest(p0: &StrengthMatrix, from: usize, to: usize) -> u64 {
        fn explore(
            p0: &StrengthMatrix,
            node: usize,
            to: usize,
            bottleneck: u64,
            visited: &mut Vec<bool>,
        ) -> u64 {
            let mut best = 0;
            for next in 0..p0.num_candidates() {
                if visited[next] || p0.get(node, next) == 0 {
                    continue;
                }
                let b = bottleneck.min(p0.get(node, next));
                if next == to {
                    best = best.max(b);
                } else {
                    visited[next] = true;
                    best = best.max(explore(p0, next, to, b, visited));
                    visited[next] = false;
                }
            }
            best
        }
        if from == to {
            return 0;
        }
        let mut visited = vec![false; p0.num_candidates()];
        visited[from] = true;
        explore(p0, from, to, u64::MAX, &mut visited)
    }

    fn has_cycle(rel: &BeatsRelation) -> bool {
        // Kahn's algorithm: the relation is acyclic iff every node gets removed.
        let c = rel.num_candidates();
        let mut indegree: Vec<usize> = (0..c)
            .map(|j| (0..c).filter(|&i| rel.beats(i, j)).count())
            .collect();
        let mut stack: Vec<usize> = (0..c).filter(|&j| indegree[j] == 0).collect();
        let mut removed = 0;
        while let Some(i) = stack.pop() {
            removed += 1;
            for j in 0..c {
                if rel.beats(i, j) {
                    indegree[j] -= 1;
                    if indegree[j] == 0 {
                        stack.push(j);
                    }
                }
            }
        }
        removed != c
    }

    #[test]
    fn canonical_defeat_matrix() {
        let p = build_defeat_matrix(&canonical_tally());
        assert_eq!(
            p.rows(),
            vec![
                vec![0, 0, 26, 30, 0],
                vec![25, 0, 0, 33, 0],
                vec![0, 29, 0, 0, 24],
                vec![0, 0, 28, 0, 0],
                vec![23, 27, 0, 31, 0],
            ]
        );
    }

    #[test]
    fn canonical_strongest_paths() {
        let p = strongest_paths(&canonical_tally());
        assert_eq!(
            p.rows(),
            vec![
                vec![0, 28, 28, 30, 24],
                vec![25, 0, 28, 33, 24],
                vec![25, 29, 0, 29, 24],
                vec![25, 28, 28, 0, 24],
                vec![25, 28, 28, 31, 0],
            ]
        );
    }

    #[test]
    fn canonical_ranking() {
        init();
        let res = run_schulze(
            &canonical_tally(),
            &SchulzeRules::DEFAULT_RULES,
            Some(names(&["A", "B", "C", "D", "E"]).as_slice()),
        )
        .unwrap();
        assert_eq!(res.order, Some(vec![4, 0, 2, 1, 3]));
        assert_eq!(res.ranking.winners(), vec![4]);
        assert!(res.ranking.is_strict());
        let beats = &res.ranking.beats;
        for j in [0, 1, 2, 3] {
            assert!(beats.beats(4, j));
        }
        assert!(beats.beats(0, 2) && beats.beats(0, 1) && beats.beats(0, 3));
        assert!(beats.beats(2, 1) && beats.beats(2, 3));
        assert!(beats.beats(1, 3));
        assert_eq!(beats.pairs().len(), 10);
    }

    #[test]
    fn margins_give_the_same_canonical_order() {
        let rules = SchulzeRules {
            defeat_measure: DefeatMeasure::Margin,
            ..SchulzeRules::DEFAULT_RULES
        };
        let res = run_schulze(&canonical_tally(), &rules, None).unwrap();
        assert_eq!(res.defeats.get(1, 3), 21);
        assert_eq!(res.strongest_paths.get(4, 0), 5);
        assert_eq!(res.order, Some(vec![4, 0, 2, 1, 3]));
    }

    #[test]
    fn diagonal_stays_zero() {
        let tally = PairwiseTally::from_rows(&[
            vec![9, 6, 2],
            vec![4, 9, 7],
            vec![8, 3, 9],
        ])
        .unwrap();
        let p = strongest_paths(&tally);
        for i in 0..3 {
            assert_eq!(p.get(i, i), 0);
        }
    }

    #[test]
    fn closure_is_idempotent() {
        let p = strongest_paths(&canonical_tally());
        let mut again = p.clone();
        compute_strongest_paths(&mut again);
        assert_eq!(again, p);
    }

    #[test]
    fn closure_matches_exhaustive_search() {
        let p0 = build_defeat_matrix(&canonical_tally());
        let mut p = p0.clone();
        compute_strongest_paths(&mut p);
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(p.get(i, j), brute_force_widest(&p0, i, j), "({}, {})", i, j);
            }
        }
    }

    #[test]
    fn ties_give_no_direct_defeat() {
        let tally = PairwiseTally::from_rows(&[vec![0, 5], vec![5, 0]]).unwrap();
        let p = build_defeat_matrix(&tally);
        assert_eq!(p.get(0, 1), 0);
        assert_eq!(p.get(1, 0), 0);

        let res = run_schulze(&tally, &SchulzeRules::DEFAULT_RULES, None).unwrap();
        assert!(res.ranking.beats.pairs().is_empty());
        assert_eq!(res.ranking.tiers, vec![vec![0, 1]]);
        assert_eq!(res.ranking.winners(), vec![0, 1]);
        assert_eq!(res.order, None);
    }

    #[test]
    fn single_candidate() {
        let tally = PairwiseTally::from_rows(&[vec![0]]).unwrap();
        let res = run_schulze(&tally, &SchulzeRules::DEFAULT_RULES, None).unwrap();
        assert!(res.ranking.beats.pairs().is_empty());
        assert_eq!(res.ranking.tiers, vec![vec![0]]);
        assert_eq!(res.order, Some(vec![0]));
    }

    #[test]
    fn names_must_match_the_tally() {
        let err = run_schulze(
            &canonical_tally(),
            &SchulzeRules::DEFAULT_RULES,
            Some(names(&["A", "B"]).as_slice()),
        )
        .unwrap_err();
        assert_eq!(err, SchulzeError::CandidateCountMismatch { names: 2, tally: 5 });
    }

    #[test]
    fn names_must_be_distinct() {
        let tally =
            PairwiseTally::from_rows(&[vec![0, 0, 0], vec![1, 0, 1], vec![1, 0, 0]]).unwrap();
        let err = run_schulze(
            &tally,
            &SchulzeRules::DEFAULT_RULES,
            Some(names(&["A", "B", "A"]).as_slice()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchulzeError::DuplicateCandidate {
                name: "A".to_string()
            }
        );
    }

    #[test]
    fn condorcet_cycle_is_resolved_by_beatpaths() {
        // A>B 6:4, B>C 7:3, C>A 8:2. The weakest link of the cycle is A>B.
        let tally = PairwiseTally::from_rows(&[
            vec![0, 6, 2],
            vec![4, 0, 7],
            vec![8, 3, 0],
        ])
        .unwrap();
        let res = run_schulze(&tally, &SchulzeRules::DEFAULT_RULES, None).unwrap();
        assert_eq!(res.order, Some(vec![1, 2, 0]));
    }

    #[test]
    fn tiebreak_policies() {
        // Candidates 1 and 2 are tied below 0; 3 is last.
        let tally = PairwiseTally::from_rows(&[
            vec![0, 6, 6, 6],
            vec![4, 0, 5, 6],
            vec![4, 5, 0, 6],
            vec![4, 4, 4, 0],
        ])
        .unwrap();
        let ranking = extract_ranking(&strongest_paths(&tally));
        assert_eq!(ranking.tiers, vec![vec![0], vec![1, 2], vec![3]]);
        assert!(!ranking.is_strict());

        assert_eq!(total_order(&ranking, TieBreakMode::Unresolved, None), None);
        assert_eq!(
            total_order(&ranking, TieBreakMode::UseCandidateOrder, None),
            Some(vec![0, 1, 2, 3])
        );

        let cands = names(&["Anna", "Bob", "Clara", "Dan"]);
        let random =
            total_order(&ranking, TieBreakMode::Random(42), Some(cands.as_slice())).unwrap();
        assert_eq!(random.len(), 4);
        assert_eq!(random[0], 0);
        assert_eq!(random[3], 3);
        let mut middle = random[1..3].to_vec();
        middle.sort_unstable();
        assert_eq!(middle, vec![1, 2]);
        // Same seed, same permutation.
        assert_eq!(
            total_order(&ranking, TieBreakMode::Random(42), Some(cands.as_slice())),
            Some(random)
        );
    }

    fn arb_tally() -> impl Strategy<Value = PairwiseTally> {
        (1usize..7).prop_flat_map(|c| {
            proptest::collection::vec(proptest::collection::vec(0u64..20, c), c)
                .prop_map(|rows| PairwiseTally::from_counts(rows).unwrap())
        })
    }

    proptest! {
        #[test]
        fn closure_is_widest_path(tally in arb_tally()) {
            let p0 = build_defeat_matrix(&tally);
            let mut p = p0.clone();
            compute_strongest_paths(&mut p);
            let c = tally.num_candidates();
            for i in 0..c {
                prop_assert_eq!(p.get(i, i), 0);
                for j in 0..c {
                    prop_assert_eq!(p.get(i, j), brute_force_widest(&p0, i, j));
                }
            }
            let mut again = p.clone();
            compute_strongest_paths(&mut again);
            prop_assert_eq!(again, p);
        }

        #[test]
        fn beats_relation_is_acyclic(tally in arb_tally()) {
            let ranking = extract_ranking(&strongest_paths(&tally));
            prop_assert!(!has_cycle(&ranking.beats));
            let placed: usize = ranking.tiers.iter().map(|t| t.len()).sum();
            prop_assert_eq!(placed, tally.num_candidates());
            // Every candidate in an earlier tier is never beaten by one in a later tier.
            for (idx, tier) in ranking.tiers.iter().enumerate() {
                for later in ranking.tiers[idx + 1..].iter() {
                    for &a in tier {
                        for &b in later {
                            prop_assert!(!ranking.beats.beats(b, a));
                        }
                    }
                }
            }
        }

        #[test]
        fn tied_tallies_have_symmetric_defeats(tally in arb_tally()) {
            let p = build_defeat_matrix(&tally);
            let c = tally.num_candidates();
            for i in 0..c {
                for j in 0..c {
                    if tally.get(i, j) == tally.get(j, i) {
                        prop_assert_eq!(p.get(i, j), 0);
                        prop_assert_eq!(p.get(j, i), 0);
                    }
                }
            }
        }
    }
}
