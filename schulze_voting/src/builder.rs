use log::{debug, warn};
use snafu::OptionExt;

use std::collections::HashMap;

use crate::config::{check_unique_names, OverflowSnafu, UnknownCandidateSnafu};
pub use crate::config::*;

/// A builder for turning ranked ballots into a pairwise tally.
///
/// Each ballot is a list of ranks, from most to least preferred. A rank may
/// hold several candidates, who are then tied on that ballot. Candidates that
/// do not appear on a ballot are ranked below all the ones that do.
///
/// ```
/// pub use schulze_voting::builder::Builder;
/// pub use schulze_voting::SchulzeRules;
/// # use schulze_voting::SchulzeError;
///
/// let mut builder = Builder::new(&SchulzeRules::DEFAULT_RULES)?
///     .candidates(&["Anna".to_string(), "Bob".to_string(), "Clara".to_string()])?;
///
/// builder.add_vote_simple(&["Anna".to_string(), "Clara".to_string()])?;
/// builder.add_vote(&[vec!["Bob".to_string(), "Clara".to_string()]], 2)?;
///
/// let (names, tally) = builder.build()?;
/// assert_eq!(names.len(), 3);
/// assert_eq!(tally.get(0, 1), 1);
/// assert_eq!(tally.get(1, 0), 2);
/// assert_eq!(tally.get(1, 2), 0);
///
/// # Ok::<(), SchulzeError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: SchulzeRules,
    pub(crate) _candidates: Option<Vec<String>>,
    pub(crate) _votes: Vec<Vote>,
}

/// A ballot: ranks from most to least preferred, and how many voters cast it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Vote {
    pub ranks: Vec<Vec<String>>,
    pub count: u64,
}

impl Builder {
    pub fn new(rules: &SchulzeRules) -> Result<Builder, SchulzeError> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: None,
            _votes: Vec::new(),
        })
    }

    /// Declares the candidates, in index order.
    ///
    /// Without a declaration, candidates are registered in the order in which
    /// they first appear on the ballots. With one, any other name is an error.
    /// A name may only be declared once.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, SchulzeError> {
        check_unique_names(cands)?;
        Ok(Builder {
            _rules: self._rules,
            _candidates: Some(cands.to_vec()),
            _votes: Vec::new(),
        })
    }

    /// Adds a ballot with one candidate per rank.
    pub fn add_vote_simple(&mut self, candidates: &[String]) -> Result<(), SchulzeError> {
        let ranks: Vec<Vec<String>> = candidates.iter().map(|c| vec![c.clone()]).collect();
        self.add_vote(&ranks, 1)
    }

    /// Adds a vote, with a potential weight attached to it.
    ///
    /// ranks: the choices made by the voter, in order. Blank names are ignored,
    /// and a candidate repeated on the ballot keeps its first rank.
    pub fn add_vote(&mut self, ranks: &[Vec<String>], count: u64) -> Result<(), SchulzeError> {
        if let Some(declared) = self._candidates.as_deref() {
            for name in ranks.iter().flatten().filter(|n| !n.is_empty()) {
                if !declared.contains(name) {
                    return UnknownCandidateSnafu { name: name.clone() }.fail();
                }
            }
        }
        self.add_vote_2(&Vote {
            ranks: ranks.to_vec(),
            count,
        })
    }

    pub fn add_vote_2(&mut self, vote: &Vote) -> Result<(), SchulzeError> {
        self._votes.push(vote.clone());
        Ok(())
    }

    /// Accumulates all the ballots into a tally.
    ///
    /// Returns the candidate names in index order together with the tally.
    pub fn build(&self) -> Result<(Vec<String>, PairwiseTally), SchulzeError> {
        let mut names: Vec<String> = self._candidates.clone().unwrap_or_default();
        let mut index: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.clone(), idx))
            .collect();
        if self._candidates.is_none() {
            for name in self._votes.iter().flat_map(|v| v.ranks.iter().flatten()) {
                if !name.is_empty() && !index.contains_key(name) {
                    index.insert(name.clone(), names.len());
                    names.push(name.clone());
                }
            }
        }
        let c = names.len();
        debug!(
            "build: {} ballots, candidates: {:?}, rules: {:?}",
            self._votes.len(),
            names,
            self._rules
        );

        let mut counts: Vec<Vec<u64>> = vec![vec![0; c]; c];
        for vote in self._votes.iter() {
            if vote.count == 0 {
                warn!("build: skipping ballot with a count of zero: {:?}", vote.ranks);
                continue;
            }
            // Unranked candidates share the rank after the last one.
            let mut rank_of: Vec<usize> = vec![usize::MAX; c];
            for (rank, group) in vote.ranks.iter().enumerate() {
                for name in group.iter().filter(|n| !n.is_empty()) {
                    let cid = *index
                        .get(name)
                        .context(UnknownCandidateSnafu { name: name.clone() })?;
                    if rank_of[cid] == usize::MAX {
                        rank_of[cid] = rank;
                    }
                }
            }
            for i in 0..c {
                for j in 0..c {
                    if rank_of[i] < rank_of[j] {
                        counts[i][j] = counts[i][j]
                            .checked_add(vote.count)
                            .context(OverflowSnafu { row: i, column: j })?;
                    }
                }
            }
        }

        let tally = PairwiseTally::from_counts(counts)?;
        Ok((names, tally))
    }
}
