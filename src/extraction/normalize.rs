//! Validation boundary for raw vision-model output.
//!
//! Rows that cannot be repaired are dropped and logged; rows that can are
//! kept with a warning. Only a batch with no surviving rows is an error.

use serde_json::{Map, Value};

use super::record::{DroppedRow, ExtractionRecord, Normalized, RecordOrigin};
use crate::error::ScoreError;
use crate::scoring::entry::{clamp_score, validate_team_name, MAX_TEAM_NAME_CHARS};

/// Controls how strictly rows are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub origin: RecordOrigin,
    /// Drop rows without a team. When false the team is left empty for
    /// the identity resolver.
    pub require_team: bool,
}

impl NormalizeOptions {
    pub fn new(origin: RecordOrigin, require_team: bool) -> Self {
        Self {
            origin,
            require_team,
        }
    }
}

/// Cleans a raw batch into canonical records.
///
/// Only the first row flagged `isCurrentPlayer` keeps the flag.
pub fn normalize(raw: &[Value], options: NormalizeOptions) -> Result<Normalized, ScoreError> {
    if raw.is_empty() {
        return Err(ScoreError::ExtractionFormat(
            "the extraction contained no rows".to_string(),
        ));
    }

    let mut out = Normalized::default();
    let mut current_seen = false;

    for (index, row) in raw.iter().enumerate() {
        match normalize_row(row, options) {
            Ok((mut record, warning)) => {
                if let Some(warning) = warning {
                    log::warn!("Extraction row {}: {}", index, warning);
                    out.warnings.push(format!("row {}: {}", index, warning));
                }
                if record.is_current_player {
                    if current_seen {
                        record.is_current_player = false;
                        let warning = format!(
                            "row {}: '{}' also marked as current player, keeping the first",
                            index, record.name
                        );
                        log::warn!("Extraction {}", warning);
                        out.warnings.push(warning);
                    } else {
                        current_seen = true;
                    }
                }
                out.records.push(record);
            }
            Err(reason) => {
                log::warn!("Dropping extraction row {}: {}", index, reason);
                out.dropped.push(DroppedRow { index, reason });
            }
        }
    }

    if out.records.is_empty() {
        return Err(ScoreError::ExtractionFormat(format!(
            "all {} rows were rejected (first: {})",
            raw.len(),
            out.dropped
                .first()
                .map(|d| d.reason.as_str())
                .unwrap_or("unknown")
        )));
    }

    log::debug!(
        "Normalized {} rows ({} dropped, {} warnings)",
        out.records.len(),
        out.dropped.len(),
        out.warnings.len()
    );
    Ok(out)
}

/// Returns the cleaned record plus an optional repair warning, or the
/// reason the row is rejected.
fn normalize_row(
    row: &Value,
    options: NormalizeOptions,
) -> Result<(ExtractionRecord, Option<String>), String> {
    let obj = row
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", type_name(row)))?;

    let name = read_text(obj, "name")?.ok_or_else(|| "missing or empty name".to_string())?;

    let team = match read_text(obj, "team")? {
        Some(team) => clean_team(&team, options.origin)?,
        None if options.require_team => return Err("missing or empty team".to_string()),
        None => String::new(),
    };

    let score_value = obj.get("score").or_else(|| obj.get("totalScore"));
    let (score, warning) = read_score(score_value);

    let mut record = ExtractionRecord::new(name, team, score);
    if let Some(rank) = obj.get("rank").and_then(read_rank) {
        record = record.with_rank(rank);
    }
    record.is_current_player = obj.get("isCurrentPlayer").is_some_and(read_flag);

    Ok((record, warning))
}

/// Reads a trimmed, non-empty string field. Absent, null and blank all read
/// as `None`; any other non-string type rejects the row.
fn read_text(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(format!("{} is {}, not a string", field, type_name(other))),
    }
}

fn clean_team(team: &str, origin: RecordOrigin) -> Result<String, String> {
    match origin {
        RecordOrigin::Vision => Ok(team.chars().take(MAX_TEAM_NAME_CHARS).collect()),
        RecordOrigin::Manual => validate_team_name(team).map_err(|e| e.to_string()),
    }
}

/// Coerces a score into the ledger range. Unusable values become 0.
fn read_score(value: Option<&Value>) -> (i64, Option<String>) {
    let parsed = match value {
        None | Some(Value::Null) => return (0, None),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        }),
        Some(Value::String(s)) => {
            let digits: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            digits.parse::<i64>().ok()
        }
        Some(_) => None,
    };

    match parsed {
        Some(score) => {
            let clamped = clamp_score(score);
            let warning = (clamped != score)
                .then(|| format!("score {} out of range, clamped to {}", score, clamped));
            (clamped, warning)
        }
        None => (0, value.map(|v| format!("score {} is not a number, using 0", v))),
    }
}

fn read_rank(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
