/*!

This is the long-form manual for `schulze_voting` and `beatpath`.

## The method

Given the pairwise tally `d` of an election (`d[i][j]` is the number of voters
who rank `i` above `j`), the Schulze method:

1. keeps the direct defeats: `p[i][j] = d[i][j]` if `d[i][j] > d[j][i]`, `0` otherwise;
2. computes the strongest beatpath between every pair of candidates. The
strength of a path is its weakest defeat, and the strongest beatpath is
the path with the largest such strength;
3. says that `i` beats `j` when the strongest beatpath from `i` to `j` is
stronger than the one from `j` to `i`.

This relation never contains a cycle. Candidates that neither beat nor are
beaten by each other are tied: the library places them in the same tier and
does not order them unless a tie-break policy is requested.

## Tie-break policies

* `unresolved` (default): ties are reported, no total order is produced.
* `useCandidateOrder`: tied candidates follow the order of declaration.
* `random`: tied candidates are ordered by the SHA-256 hash of the seed
 (`randomSeed`) and of their name. The outcome is reproducible for a given
 seed but hard to guess in advance.

## Input formats

The following formats are supported by `beatpath`:
* `csv` ranked ballots, one ballot per row
* `tally_csv` a pairwise tally in CSV
* `tally_json` a pairwise tally in JSON

### csv

Each column (in order) is a rank. The name of the rank in the header is not significant.

```text
id,count,choice 1,choice 2,choice 3
id1,20,A,B,C
id2,15,B,A=C,
```

Several candidates separated by `=` (the `tieDelimiter`) share a rank. Empty
cells are skipped, and candidates missing from a ballot rank below all the others.

### tally_csv

The first row holds the candidate names, followed by the matrix:

```text
A,B,C
0,6,2
4,0,7
8,3,0
```

### tally_json

An array of rows: `[[0, 6, 2], [4, 0, 7], [8, 3, 0]]`. Candidate names come from
`--candidates`, or default to the indices.

## Configuration

The `--config` flag accepts a JSON description of the election:

```json
{
  "outputSettings": { "contestName": "Board election", "contestDate": "2022-10-21" },
  "candidates": [{ "name": "Anna", "code": "A" }, { "name": "Bob" }, { "name": "Clara" }],
  "rules": { "tiebreakMode": "useCandidateOrder", "defeatMeasure": "winningVotes" },
  "cvrFileSources": [
    { "provider": "csv", "filePath": "ballots.csv", "firstVoteColumnIndex": 3, "countColumnIndex": 2 }
  ]
}
```

Instead of `cvrFileSources`, a `tally` field can hold the matrix directly.
File paths are relative to the directory of the configuration file.

Options for candidates:
 - `name` (string): must be unique.
 - `code` (string, optional): a short form that csv ballots may use instead of the name.

Options for FileSource:
 - `provider` (string): `csv` or `tally_csv`.
 - `filePath` (string)
 - `firstVoteColumnIndex` (string or number, optional, default 1): the first
 column holding a rank. Indices start at 1.
 - `firstVoteRowIndex` (string or number, optional, default 2): the first row
 holding a ballot. Indices start at 1.
 - `countColumnIndex` (string or number, optional): the location of the column that
 indicates the counts. If not provided, every ballot is counted once.
 - `tieDelimiter` (string, optional, default `=`)

Options for rules:
 - `tiebreakMode`: `unresolved`, `useCandidateOrder` or `random`
 - `randomSeed` (string, required by `random`)
 - `defeatMeasure` (optional): `winningVotes` (default) or `margin`

 */
