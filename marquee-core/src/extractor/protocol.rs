use serde::Deserialize;

use crate::types::Candidate;

#[derive(Debug, Deserialize)]
struct MarkerRecord {
    title: String,
}

/// Classification of one line of extractor stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Candidate(Candidate),
    /// Carried the marker but not a usable record.
    Malformed(String),
    Diagnostic,
}

pub fn parse_output_line(line: &str, marker: &str) -> OutputLine {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(payload) = line.strip_prefix(marker) else {
        return OutputLine::Diagnostic;
    };

    match serde_json::from_str::<MarkerRecord>(payload) {
        Ok(record) if !record.title.trim().is_empty() => {
            OutputLine::Candidate(Candidate::new(record.title.trim()))
        }
        Ok(_) => OutputLine::Malformed("empty title".to_string()),
        Err(err) => OutputLine::Malformed(err.to_string()),
    }
}
