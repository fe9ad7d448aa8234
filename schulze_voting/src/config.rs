// ********* Input data structures ***********

use snafu::{ensure, Snafu};

use std::collections::HashSet;

/// The pairwise tally of an election: `get(i, j)` is the number of voters who
/// rank candidate `i` strictly above candidate `j`.
///
/// Candidates are plain indices in `0..num_candidates()`. The diagonal is
/// present to keep the matrix square, but nothing downstream reads it.
///
/// A tally is validated when it is constructed and cannot be modified
/// afterwards.
///
/// ```
/// use schulze_voting::PairwiseTally;
/// # use schulze_voting::SchulzeError;
///
/// let tally = PairwiseTally::from_rows(&[vec![0, 3], vec![2, 0]])?;
/// assert_eq!(tally.num_candidates(), 2);
/// assert_eq!(tally.get(0, 1), 3);
///
/// assert!(PairwiseTally::from_rows(&[vec![0, -1], vec![2, 0]]).is_err());
/// # Ok::<(), SchulzeError>(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct PairwiseTally {
    size: usize,
    // Row-major, size * size entries.
    counts: Vec<u64>,
}

impl PairwiseTally {
    /// Builds a tally from signed rows, rejecting negative entries.
    ///
    /// This is the entry point for data coming from outside the program
    /// (JSON, CSV), where a negative count is an input mistake that should be
    /// reported with its position.
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<PairwiseTally, SchulzeError> {
        check_shape(rows.iter().map(|r| r.len()), rows.len())?;
        let mut counts: Vec<u64> = Vec::with_capacity(rows.len() * rows.len());
        for (row, values) in rows.iter().enumerate() {
            for (column, &value) in values.iter().enumerate() {
                ensure!(value >= 0, NegativeEntrySnafu { row, column, value });
                counts.push(value as u64);
            }
        }
        Ok(PairwiseTally {
            size: rows.len(),
            counts,
        })
    }

    /// Builds a tally from unsigned rows.
    pub fn from_counts(rows: Vec<Vec<u64>>) -> Result<PairwiseTally, SchulzeError> {
        check_shape(rows.iter().map(|r| r.len()), rows.len())?;
        Ok(PairwiseTally {
            size: rows.len(),
            counts: rows.into_iter().flatten().collect(),
        })
    }

    pub fn num_candidates(&self) -> usize {
        self.size
    }

    /// Number of voters preferring candidate `i` over candidate `j`.
    ///
    /// Panics if either index is out of range.
    pub fn get(&self, i: usize, j: usize) -> u64 {
        assert!(i < self.size && j < self.size, "candidate out of range");
        self.counts[i * self.size + j]
    }

    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.counts.chunks(self.size).map(|r| r.to_vec()).collect()
    }
}

fn check_shape(
    row_lengths: impl Iterator<Item = usize>,
    expected: usize,
) -> Result<(), SchulzeError> {
    ensure!(expected >= 1, EmptyTallySnafu {});
    for (row, found) in row_lengths.enumerate() {
        ensure!(
            found == expected,
            NotSquareSnafu {
                row,
                found,
                expected
            }
        );
    }
    Ok(())
}

/// Candidate names must identify a single candidate.
pub(crate) fn check_unique_names(names: &[String]) -> Result<(), SchulzeError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for name in names.iter() {
        ensure!(
            seen.insert(name.as_str()),
            DuplicateCandidateSnafu { name: name.clone() }
        );
    }
    Ok(())
}

// ******** Output data structures *********

/// A square matrix of defeat strengths.
///
/// Before [`crate::compute_strongest_paths`] runs, `get(i, j)` is the strength of the
/// direct defeat of `j` by `i` (zero when `i` does not win head-to-head).
/// Afterwards, it is the strength of the strongest beatpath from `i` to `j`.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct StrengthMatrix {
    pub(crate) size: usize,
    pub(crate) cells: Vec<u64>,
}

impl StrengthMatrix {
    pub(crate) fn zeros(size: usize) -> StrengthMatrix {
        StrengthMatrix {
            size,
            cells: vec![0; size * size],
        }
    }

    pub fn num_candidates(&self) -> usize {
        self.size
    }

    /// Panics if either index is out of range.
    pub fn get(&self, i: usize, j: usize) -> u64 {
        assert!(i < self.size && j < self.size, "candidate out of range");
        self.cells[i * self.size + j]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, value: u64) {
        self.cells[i * self.size + j] = value;
    }

    pub fn rows(&self) -> Vec<Vec<u64>> {
        if self.size == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.size).map(|r| r.to_vec()).collect()
    }
}

/// The Schulze relation between candidates: `i` beats `j` when the strongest
/// path from `i` to `j` is strictly stronger than the one from `j` to `i`.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct BeatsRelation {
    pub(crate) size: usize,
    pub(crate) cells: Vec<bool>,
}

impl BeatsRelation {
    pub fn num_candidates(&self) -> usize {
        self.size
    }

    pub fn beats(&self, i: usize, j: usize) -> bool {
        i < self.size && j < self.size && self.cells[i * self.size + j]
    }

    /// All the pairs `(winner, loser)`, in index order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut res = Vec::new();
        for i in 0..self.size {
            for j in 0..self.size {
                if self.beats(i, j) {
                    res.push((i, j));
                }
            }
        }
        res
    }

    /// Number of candidates beaten by `i`.
    pub fn wins(&self, i: usize) -> usize {
        (0..self.size).filter(|&j| self.beats(i, j)).count()
    }
}

/// The outcome of ranking extraction.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SchulzeRanking {
    /// The authoritative output of the method.
    pub beats: BeatsRelation,
    /// Candidates from strongest to weakest. Candidates in the same tier
    /// neither beat nor are beaten by each other; each tier is sorted by index.
    pub tiers: Vec<Vec<usize>>,
}

impl SchulzeRanking {
    /// The candidates that are beaten by nobody (the first tier).
    pub fn winners(&self) -> Vec<usize> {
        self.tiers.first().cloned().unwrap_or_default()
    }

    /// True when no two candidates share a tier.
    pub fn is_strict(&self) -> bool {
        self.tiers.iter().all(|t| t.len() == 1)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SchulzeResult {
    /// Direct defeat strengths, before the closure.
    pub defeats: StrengthMatrix,
    /// Strongest beatpath strengths.
    pub strongest_paths: StrengthMatrix,
    pub ranking: SchulzeRanking,
    /// The strongest-to-weakest order after applying the tie-break policy.
    /// `None` when ties remain and the policy leaves them unresolved.
    pub order: Option<Vec<usize>>,
}

/// The two families of failures.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ErrorKind {
    /// The input is malformed. Detected before any computation starts.
    InvalidInput,
    /// The input is well formed but a value does not fit in the counters.
    Computation,
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SchulzeError {
    #[snafu(display("the tally must contain at least one candidate"))]
    EmptyTally {},

    #[snafu(display("the tally is not square: row {row} has {found} entries, expected {expected}"))]
    NotSquare {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[snafu(display("negative count {value} at row {row}, column {column}"))]
    NegativeEntry { row: usize, column: usize, value: i64 },

    #[snafu(display("{names} candidate names were given for a tally of {tally} candidates"))]
    CandidateCountMismatch { names: usize, tally: usize },

    #[snafu(display("candidate {name:?} was not declared"))]
    UnknownCandidate { name: String },

    #[snafu(display("candidate {name:?} is listed more than once"))]
    DuplicateCandidate { name: String },

    #[snafu(display("count overflow at row {row}, column {column}"))]
    Overflow { row: usize, column: usize },
}

impl SchulzeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchulzeError::Overflow { .. } => ErrorKind::Computation,
            _ => ErrorKind::InvalidInput,
        }
    }
}

// ********* Configuration **********

/// How a direct pairwise win is turned into a defeat strength.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum DefeatMeasure {
    /// The number of voters supporting the win.
    #[default]
    WinningVotes,
    /// The difference between the supporters of the win and of the loss.
    Margin,
}

/// What to do with candidates that neither beat nor are beaten by each other.
///
/// The Schulze method itself does not order such candidates. Every mode
/// other than `Unresolved` is a policy decision made by the caller.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum TieBreakMode {
    /// Leave ties in place; no total order is produced when one exists.
    #[default]
    Unresolved,
    /// Tied candidates are ordered by their index.
    UseCandidateOrder,
    /// Tied candidates are ordered by a hash of the seed and their name.
    Random(u32),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SchulzeRules {
    pub defeat_measure: DefeatMeasure,
    pub tiebreak_mode: TieBreakMode,
}

impl SchulzeRules {
    pub const DEFAULT_RULES: SchulzeRules = SchulzeRules {
        defeat_measure: DefeatMeasure::WinningVotes,
        tiebreak_mode: TieBreakMode::Unresolved,
    };
}

impl Default for SchulzeRules {
    fn default() -> Self {
        SchulzeRules::DEFAULT_RULES
    }
}
