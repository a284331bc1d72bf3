//! Resume resolver policy tests
//!
//! The resolver reconstructs a participant's position purely from persisted
//! rows, tolerating arbitrary record order from the store.

use chrono::Utc;
use listenlab_common::records::{SurveyRow, TranscriptRow};
use listenlab_common::Error;
use listenlab_study::assignment;
use listenlab_study::flow::{FIXED_STEPS, SCREENING_STEP};
use listenlab_study::resume::ResumeResolver;

mod helpers;
use helpers::roomy_catalog;

fn complete_survey(participant_id: &str) -> SurveyRow {
    let mut row = SurveyRow::stub(participant_id, Utc::now());
    row.screening = std::array::from_fn(|i| format!("q{}", i + 1));
    row.calibration = std::array::from_fn(|i| format!("c{}", i + 1));
    row
}

fn transcript_for(participant_id: &str, item_id: &str) -> TranscriptRow {
    let now = Utc::now();
    TranscriptRow {
        timestamp: now,
        participant_id: participant_id.to_string(),
        item_id: item_id.to_string(),
        start_time: now,
        end_time: now,
        duration_seconds: 10.0,
        first_response: "heard something".to_string(),
        second_response: "fairly sure".to_string(),
    }
}

#[test]
fn no_records_means_unknown_participant() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);
    let err = resolver.resolve("ghost", None, &[]).unwrap_err();
    assert!(matches!(err, Error::UnknownParticipant(_)));
}

#[test]
fn incomplete_survey_resumes_at_screening_regardless_of_transcripts() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);

    let mut row = complete_survey("p1");
    row.calibration[1] = String::new();

    let assigned = assignment::build("p1", &catalog.sentences, &catalog.words).unwrap();
    let transcripts = vec![transcript_for("p1", &assigned[0].id)];

    let step = resolver.resolve("p1", Some(&row), &transcripts).unwrap();
    assert_eq!(step, SCREENING_STEP);
}

#[test]
fn complete_survey_without_transcripts_resumes_at_first_item() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);
    let row = complete_survey("p1");
    let step = resolver.resolve("p1", Some(&row), &[]).unwrap();
    assert_eq!(step, FIXED_STEPS);
}

#[test]
fn partial_transcripts_resume_at_first_uncovered_item() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);
    let row = complete_survey("p1");
    let assigned = assignment::build("p1", &catalog.sentences, &catalog.words).unwrap();

    // First 7 items completed, rows handed back in scrambled order
    let mut transcripts: Vec<TranscriptRow> = assigned[..7]
        .iter()
        .map(|item| transcript_for("p1", &item.id))
        .collect();
    transcripts.reverse();
    transcripts.swap(0, 3);

    let step = resolver.resolve("p1", Some(&row), &transcripts).unwrap();
    assert_eq!(step, FIXED_STEPS + 7);
}

#[test]
fn other_participants_rows_are_ignored() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);
    let row = complete_survey("p1");

    let other_assigned = assignment::build("p2", &catalog.sentences, &catalog.words).unwrap();
    let transcripts: Vec<TranscriptRow> = other_assigned[..5]
        .iter()
        .map(|item| transcript_for("p2", &item.id))
        .collect();

    let step = resolver.resolve("p1", Some(&row), &transcripts).unwrap();
    assert_eq!(step, FIXED_STEPS);
}

#[test]
fn full_coverage_resumes_at_thank_you() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);
    let row = complete_survey("p1");
    let assigned = assignment::build("p1", &catalog.sentences, &catalog.words).unwrap();

    let transcripts: Vec<TranscriptRow> = assigned
        .iter()
        .map(|item| transcript_for("p1", &item.id))
        .collect();

    let step = resolver.resolve("p1", Some(&row), &transcripts).unwrap();
    assert_eq!(step, FIXED_STEPS + assigned.len());
}

#[test]
fn resolution_is_idempotent() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);
    let row = complete_survey("p1");
    let assigned = assignment::build("p1", &catalog.sentences, &catalog.words).unwrap();
    let transcripts: Vec<TranscriptRow> = assigned[..12]
        .iter()
        .map(|item| transcript_for("p1", &item.id))
        .collect();

    let first = resolver.resolve("p1", Some(&row), &transcripts).unwrap();
    let second = resolver.resolve("p1", Some(&row), &transcripts).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, FIXED_STEPS + 12);
}

#[test]
fn transcripts_without_survey_row_still_redo_screening() {
    let catalog = roomy_catalog();
    let resolver = ResumeResolver::new(&catalog);
    let assigned = assignment::build("p1", &catalog.sentences, &catalog.words).unwrap();
    let transcripts = vec![transcript_for("p1", &assigned[0].id)];

    let step = resolver.resolve("p1", None, &transcripts).unwrap();
    assert_eq!(step, SCREENING_STEP);
}
