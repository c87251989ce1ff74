// Primitives for reading CSV files.

use std::fs::File;

use crate::sim::{io_common::make_default_id, *};

/// Ballots stored one per row in a CSV file.
pub struct CsvBallots {
    path: String,
    settings: BallotSourceSettings,
    candidates: Vec<String>,
}

impl CsvBallots {
    /// If `candidates` is empty, the candidates are the labels found in the file.
    pub fn new(path: String, settings: BallotSourceSettings, candidates: Vec<String>) -> CsvBallots {
        CsvBallots {
            path,
            settings,
            candidates,
        }
    }
}

impl BallotSource for CsvBallots {
    fn read_ballots(&mut self) -> SimResult<BallotTable> {
        info!("Attempting to read rank file {:?}", self.path);
        let parsed_ballots = read_csv_ranking(&self.path, &self.settings)?;
        validate_ballots(&parsed_ballots, Some(self.candidates.as_slice()))
    }
}

pub fn read_csv_ranking(path: &str, cfs: &BallotSourceSettings) -> SimResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(path);

    let id_idx_o = cfs.id_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, first_row) = get_records(path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + first_row;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let id = if let Some(id_idx) = id_idx_o {
            line.get(id_idx)
                .context(CsvLineToShortSnafu { lineno })?
                .to_string()
        } else {
            default_id(lineno)
        };

        let choices: Vec<String> = line
            .iter()
            .skip(choices_start_col)
            .map(|s| s.trim().to_string())
            .collect();
        debug!("read_csv_ranking: lineno: {:?} row: {:?}", lineno, &choices);

        res.push(ParsedBallot {
            id: Some(id),
            choices,
        });
    }
    Ok(res)
}

fn get_records(
    path: &str,
    cfs: &BallotSourceSettings,
) -> SimResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    // The index starts at 1 to respect most conventions in the excel world
    for _ in 1..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_tmp(name: &str, contents: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("rcvsim-{}-{}", std::process::id(), name));
        fs::write(&p, contents).unwrap();
        p
    }

    fn settings(js: JSValue) -> BallotSourceSettings {
        serde_json::from_value(js).unwrap()
    }

    #[test]
    fn reads_ids_and_choices() {
        let p = write_tmp(
            "ids.csv",
            "id,choice 1,choice 2,choice 3\nv1,A,B,\nv2,C,,\nv3, B ,A,C\n",
        );
        let cfs = settings(json!({
            "provider": "csv",
            "firstVoteColumnIndex": 2,
            "firstVoteRowIndex": 2,
            "idColumnIndex": 1
        }));
        let ballots = read_csv_ranking(p.to_str().unwrap(), &cfs).unwrap();
        assert_eq!(ballots.len(), 3);
        assert_eq!(ballots[0].id, Some("v1".to_string()));
        assert_eq!(ballots[2].choices, vec!["B", "A", "C"]);

        let mut source = CsvBallots::new(p.to_str().unwrap().to_string(), cfs, vec![]);
        let table = source.read_ballots().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.row(1), Some(vec![Some("C"), None, None]));
        let res = run_tabulation(&table, &TabulationRules::with_winners(1)).unwrap();
        assert_eq!(res.winners, vec!["A".to_string()]);
    }

    #[test]
    fn ragged_rows_get_default_ids() {
        let p = write_tmp("ragged.csv", "A,B\nB\nC,A,B,\n");
        let cfs = settings(json!({"provider": "csv"}));
        let ballots = read_csv_ranking(p.to_str().unwrap(), &cfs).unwrap();
        assert_eq!(ballots[1].choices, vec!["B"]);
        assert!(ballots[0].id.as_ref().unwrap().ends_with("ragged.csv-00000001"));

        let mut source = CsvBallots::new(
            p.to_str().unwrap().to_string(),
            cfs,
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
        );
        assert_eq!(source.read_ballots().unwrap().len(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let cfs = settings(json!({"provider": "csv"}));
        let res = read_csv_ranking("/nonexistent/ballots.csv", &cfs);
        assert!(matches!(res, Err(SimError::CsvOpen { .. })));
    }
}
