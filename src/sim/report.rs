// Console output of a simulation.

use crate::sim::challenges::BallotAnnotation;
use crate::sim::*;

pub fn log_line(msg: &str) {
    info!("{}", msg);
    println!("\n{}\n", msg);
}

/// 10000 -> "10,000"
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut res = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            res.push(',');
        }
        res.push(c);
    }
    res
}

/// One tab-separated line per ballot. Ballot ids are the 1-based positions
/// in the table.
pub fn format_ballots(table: &BallotTable, annotations: &[BallotAnnotation]) -> String {
    let mut header: Vec<String> = vec!["Ballot_ID".to_string()];
    header.extend((1..=table.num_candidates()).map(|idx| format!("Choice_{}", idx)));
    header.push("Is_Challenged".to_string());
    header.push("Is_Resolved".to_string());

    let mut lines: Vec<String> = vec![header.join("\t")];
    for (idx, row) in table.rows().enumerate() {
        let annotation = annotations.get(idx).copied().unwrap_or_default();
        let mut cells: Vec<String> = vec![(idx + 1).to_string()];
        cells.extend(row.iter().map(|c| c.unwrap_or("").to_string()));
        cells.push(annotation.is_challenged.to_string());
        cells.push(
            annotation
                .is_resolved
                .map(|r| r.to_string())
                .unwrap_or_default(),
        );
        lines.push(cells.join("\t"));
    }
    let mut res = lines.join("\n");
    res.push('\n');
    res
}

/// The rounds in counting order, first round first.
pub fn format_rounds(result: &ElectionResult) -> String {
    let mut res = String::new();
    for round in result.rounds.iter() {
        res.push_str(&format!("Iteration {}\n", round.round));
        for (name, count) in round.tally.iter() {
            res.push_str(&format!("\t{}\t{}\n", name, count));
        }
    }
    res
}
