//! Admin views over stored submissions: search and CSV export

use std::io::Write;

use csv::WriterBuilder;

use crate::core::sink::Submission;

/// Column headers of the CSV export
pub const CSV_HEADERS: [&str; 4] = ["ID", "Step", "Data", "Created At"];

/// Case-insensitive match against id, step number and the JSON-encoded data
pub fn matches_search(submission: &Submission, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    submission.id.to_string().to_lowercase().contains(&query)
        || submission.step.to_string().contains(&query)
        || serde_json::Value::Object(submission.data.clone())
            .to_string()
            .to_lowercase()
            .contains(&query)
}

/// Keep submissions matching the query, preserving order
pub fn filter(submissions: Vec<Submission>, query: Option<&str>) -> Vec<Submission> {
    match query {
        Some(q) => submissions
            .into_iter()
            .filter(|s| matches_search(s, q))
            .collect(),
        None => submissions,
    }
}

/// Write submissions as CSV, one row per record, data as a JSON string
pub fn write_csv<W: Write>(submissions: &[Submission], out: W) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(CSV_HEADERS)?;

    for s in submissions {
        writer.write_record([
            s.id.to_string(),
            s.step.to_string(),
            serde_json::Value::Object(s.data.clone()).to_string(),
            s.created_at.to_rfc3339(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
