//! Positional record rows shared with the record store
//!
//! The record store is sheet-like: every row is a flat list of text cells in
//! a fixed positional layout. These types are the only place that layout is
//! encoded; everything else works with the typed structs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Cell count of a survey row: timestamp, participant id, q1..q6, calib1..calib4
pub const SURVEY_ROW_WIDTH: usize = 12;

/// Cell count of a transcript row
pub const TRANSCRIPT_ROW_WIDTH: usize = 8;

/// Number of screening questions
pub const SCREENING_ANSWERS: usize = 6;

/// Number of calibration-check questions
pub const CALIBRATION_ANSWERS: usize = 4;

/// One survey row per participant.
///
/// Appended as an all-blank stub when the participant id is minted, then
/// overwritten in place as the screening and calibration steps complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
    pub timestamp: DateTime<Utc>,
    pub participant_id: String,
    pub screening: [String; SCREENING_ANSWERS],
    pub calibration: [String; CALIBRATION_ANSWERS],
}

impl SurveyRow {
    /// Placeholder row written at id-generation time
    pub fn stub(participant_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            participant_id: participant_id.to_string(),
            screening: Default::default(),
            calibration: Default::default(),
        }
    }

    /// A row is complete once every answer cell is non-blank.
    pub fn is_complete(&self) -> bool {
        self.screening.iter().all(|a| !a.trim().is_empty())
            && self.calibration.iter().all(|a| !a.trim().is_empty())
    }

    /// Flatten to the positional cell layout
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(SURVEY_ROW_WIDTH);
        cells.push(format_timestamp(&self.timestamp));
        cells.push(self.participant_id.clone());
        cells.extend(self.screening.iter().cloned());
        cells.extend(self.calibration.iter().cloned());
        cells
    }

    /// Parse from the positional cell layout
    pub fn from_cells(cells: &[String]) -> Result<Self> {
        if cells.len() != SURVEY_ROW_WIDTH {
            return Err(Error::Store(format!(
                "survey row has {} cells, expected {}",
                cells.len(),
                SURVEY_ROW_WIDTH
            )));
        }
        let mut screening: [String; SCREENING_ANSWERS] = Default::default();
        screening.clone_from_slice(&cells[2..8]);
        let mut calibration: [String; CALIBRATION_ANSWERS] = Default::default();
        calibration.clone_from_slice(&cells[8..12]);
        Ok(Self {
            timestamp: parse_timestamp(&cells[0])?,
            participant_id: cells[1].clone(),
            screening,
            calibration,
        })
    }
}

/// One transcript row per completed item. Append-only, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub timestamp: DateTime<Utc>,
    pub participant_id: String,
    pub item_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub first_response: String,
    pub second_response: String,
}

impl TranscriptRow {
    /// Flatten to the positional cell layout
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            format_timestamp(&self.timestamp),
            self.participant_id.clone(),
            self.item_id.clone(),
            format_timestamp(&self.start_time),
            format_timestamp(&self.end_time),
            format!("{:.3}", self.duration_seconds),
            self.first_response.clone(),
            self.second_response.clone(),
        ]
    }

    /// Parse from the positional cell layout
    pub fn from_cells(cells: &[String]) -> Result<Self> {
        if cells.len() != TRANSCRIPT_ROW_WIDTH {
            return Err(Error::Store(format!(
                "transcript row has {} cells, expected {}",
                cells.len(),
                TRANSCRIPT_ROW_WIDTH
            )));
        }
        let duration_seconds: f64 = cells[5]
            .trim()
            .parse()
            .map_err(|e| Error::Store(format!("bad duration cell {:?}: {}", cells[5], e)))?;
        Ok(Self {
            timestamp: parse_timestamp(&cells[0])?,
            participant_id: cells[1].clone(),
            item_id: cells[2].clone(),
            start_time: parse_timestamp(&cells[3])?,
            end_time: parse_timestamp(&cells[4])?,
            duration_seconds,
            first_response: cells[6].clone(),
            second_response: cells[7].clone(),
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(cell: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(cell.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Store(format!("bad timestamp cell {:?}: {}", cell, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_survey() -> SurveyRow {
        let mut row = SurveyRow::stub("p1", Utc::now());
        row.screening = std::array::from_fn(|i| format!("q{}", i + 1));
        row.calibration = std::array::from_fn(|i| format!("c{}", i + 1));
        row
    }

    #[test]
    fn stub_is_incomplete() {
        let row = SurveyRow::stub("p1", Utc::now());
        assert!(!row.is_complete());
    }

    #[test]
    fn whitespace_answer_does_not_complete() {
        let mut row = filled_survey();
        row.calibration[2] = "   ".to_string();
        assert!(!row.is_complete());
    }

    #[test]
    fn survey_cells_round_trip() {
        let row = filled_survey();
        let cells = row.to_cells();
        assert_eq!(cells.len(), SURVEY_ROW_WIDTH);
        let parsed = SurveyRow::from_cells(&cells).unwrap();
        assert_eq!(parsed.participant_id, "p1");
        assert_eq!(parsed.screening, row.screening);
        assert!(parsed.is_complete());
    }

    #[test]
    fn short_survey_row_rejected() {
        let cells = vec!["2026-01-01T00:00:00Z".to_string(); 5];
        assert!(SurveyRow::from_cells(&cells).is_err());
    }

    #[test]
    fn transcript_cells_round_trip() {
        let now = Utc::now();
        let row = TranscriptRow {
            timestamp: now,
            participant_id: "p1".to_string(),
            item_id: "sentence/g0/a.wav".to_string(),
            start_time: now,
            end_time: now + chrono::Duration::seconds(42),
            duration_seconds: 42.0,
            first_response: "first".to_string(),
            second_response: "second".to_string(),
        };
        let cells = row.to_cells();
        assert_eq!(cells.len(), TRANSCRIPT_ROW_WIDTH);
        let parsed = TranscriptRow::from_cells(&cells).unwrap();
        assert_eq!(parsed.item_id, row.item_id);
        assert_eq!(parsed.duration_seconds, 42.0);
    }
}
