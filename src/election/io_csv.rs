// Primitives for reading CSV files.

use std::io::Read;

use crate::election::*;

/// Reads ranked ballots, one per row.
pub fn read_csv_ranking<R: Read>(rdr: R, cfs: &FileSource) -> ElectionResult<Vec<ParsedBallot>> {
    let choices_start_col = cfs.first_vote_column_index()?;
    let first_row = cfs.first_vote_row_index()?;
    let count_idx_o = cfs.count_column_index_int()?;
    let delimiter = cfs.tie_delimiter();

    let mut res: Vec<ParsedBallot> = Vec::new();
    let records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr)
        .into_records();

    for (idx, line_r) in records.enumerate().skip(first_row) {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_ranking: lineno: {:?} row: {:?}", lineno, line);

        let count: u64 = if let Some(count_idx) = count_idx_o {
            let cell = line
                .get(count_idx)
                .context(CsvLineTooShortSnafu { lineno })?
                .trim();
            cell.parse::<u64>().ok().context(CsvCountSnafu {
                lineno,
                value: cell.to_string(),
            })?
        } else {
            1
        };

        let choices: Vec<Vec<String>> = line
            .iter()
            .enumerate()
            .skip(choices_start_col)
            .filter(|(col, _)| Some(*col) != count_idx_o)
            .map(|(_, cell)| {
                cell.split(delimiter.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .collect();

        res.push(ParsedBallot {
            lineno,
            count,
            choices,
        });
    }
    Ok(res)
}

/// Reads a pairwise tally: a header row with the candidate names, then one row
/// per candidate.
pub fn read_csv_tally<R: Read>(rdr: R) -> ElectionResult<(Vec<String>, Vec<Vec<i64>>)> {
    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr)
        .into_records();

    let header = records
        .next()
        .context(CsvEmptySnafu {})?
        .context(CsvLineParseSnafu {})?;
    let names: Vec<String> = header.iter().map(|s| s.trim().to_string()).collect();
    debug!("read_csv_tally: candidates: {:?}", names);

    let mut rows: Vec<Vec<i64>> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {})?;
        let mut row: Vec<i64> = Vec::new();
        for (column, cell) in line.iter().enumerate() {
            let cell = cell.trim();
            let value = cell.parse::<i64>().ok().context(CsvTallyEntrySnafu {
                lineno,
                column: column + 1,
                value: cell.to_string(),
            })?;
            row.push(value);
        }
        rows.push(row);
    }
    Ok((names, rows))
}
