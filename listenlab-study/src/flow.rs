//! Session flow: ordered step list and per-session state
//!
//! A session walks a fixed step list forward, one confirmation at a time:
//! intro, screening, calibration instructions, calibration, task
//! instructions, one step per assigned item, then the closing step. The list
//! is rebuilt from the deterministic assignment on every (re)entry, so only
//! the position and per-item timing need to live in session state.

use chrono::{DateTime, Utc};
use listenlab_common::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::content::Item;

/// Index of the screening step within the step list
pub const SCREENING_STEP: usize = 1;

/// Index of the calibration step within the step list
pub const CALIBRATION_STEP: usize = 3;

/// Fixed steps preceding the first item step
pub const FIXED_STEPS: usize = 5;

/// One logical step of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Intro,
    Screening,
    CalibrationInstructions,
    Calibration,
    TaskInstructions,
    Item {
        /// 1-based position within the assignment
        ordinal: usize,
        item: Item,
    },
    ThankYou,
}

impl Step {
    pub fn is_item(&self) -> bool {
        matches!(self, Step::Item { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::ThankYou)
    }
}

/// Per-session, process-local state.
///
/// Holds only what cannot be rederived: the current position, which item
/// steps have been revealed, and their start timestamps. Everything else is
/// reconstructed from the record store by the resume resolver.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub participant_id: String,
    pub current_step: usize,
    /// Start timestamp per item step index, written once on first reveal
    pub item_started_at: HashMap<usize, DateTime<Utc>>,
    /// Item step indices whose audio has been revealed
    pub revealed: HashSet<usize>,
}

impl SessionState {
    /// Fresh session positioned at the first step
    pub fn new(participant_id: &str) -> Self {
        Self::at_step(participant_id, 0)
    }

    /// Resumed session positioned at a resolved step index
    pub fn at_step(participant_id: &str, step_index: usize) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            current_step: step_index,
            item_started_at: HashMap::new(),
            revealed: HashSet::new(),
        }
    }
}

/// The ordered step list for one participant.
///
/// Stable for the life of the session because the assignment is a pure
/// function of the participant id.
#[derive(Debug, Clone)]
pub struct SessionFlow {
    steps: Vec<Step>,
}

impl SessionFlow {
    /// Build the step list from an assignment
    pub fn new(assignment: Vec<Item>) -> Self {
        let mut steps = Vec::with_capacity(FIXED_STEPS + assignment.len() + 1);
        steps.push(Step::Intro);
        steps.push(Step::Screening);
        steps.push(Step::CalibrationInstructions);
        steps.push(Step::Calibration);
        steps.push(Step::TaskInstructions);
        steps.extend(
            assignment
                .into_iter()
                .enumerate()
                .map(|(i, item)| Step::Item { ordinal: i + 1, item }),
        );
        steps.push(Step::ThankYou);
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the closing step
    pub fn thank_you_step(&self) -> usize {
        self.steps.len() - 1
    }

    /// Step at the session's current position
    pub fn current<'a>(&'a self, state: &SessionState) -> Result<&'a Step> {
        self.steps.get(state.current_step).ok_or_else(|| {
            Error::Internal(format!(
                "session position {} outside step list of length {}",
                state.current_step,
                self.steps.len()
            ))
        })
    }

    /// Advance exactly one step forward. The index never decreases and never
    /// moves past the closing step.
    pub fn advance<'a>(&'a self, state: &mut SessionState) -> Result<&'a Step> {
        let current = self.current(state)?;
        if current.is_terminal() {
            return Err(Error::Validation(
                "session is already complete".to_string(),
            ));
        }
        state.current_step += 1;
        self.current(state)
    }

    /// Record the reveal of the current item step, returning its start
    /// timestamp. Idempotent: re-entering a revealed step keeps the original
    /// timestamp.
    pub fn record_item_reveal(
        &self,
        state: &mut SessionState,
        step_index: usize,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.expect_item_step(state, step_index)?;
        state.revealed.insert(step_index);
        let started = *state.item_started_at.entry(step_index).or_insert(now);
        Ok(started)
    }

    /// Check that `step_index` is the current step and an item step
    pub fn expect_item_step<'a>(
        &'a self,
        state: &SessionState,
        step_index: usize,
    ) -> Result<&'a Item> {
        if step_index != state.current_step {
            return Err(Error::Validation(format!(
                "step {} is not the current step ({})",
                step_index, state.current_step
            )));
        }
        match self.current(state)? {
            Step::Item { item, .. } => Ok(item),
            other => Err(Error::Validation(format!(
                "step {} is not an item step ({:?})",
                step_index, other
            ))),
        }
    }
}

/// Reject blank free-text responses; both answers are required verbatim
/// before an item step may complete.
pub fn validate_item_responses(first: &str, second: &str) -> Result<()> {
    if first.trim().is_empty() {
        return Err(Error::Validation(
            "first response must not be empty".to_string(),
        ));
    }
    if second.trim().is_empty() {
        return Err(Error::Validation(
            "second response must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ItemKind;

    fn item(n: usize) -> Item {
        Item {
            id: format!("sentences/g0/{}.wav", n),
            group: "G0".to_string(),
            kind: ItemKind::Sentence,
            blob_ref: format!("blob-{}", n),
        }
    }

    fn flow_with_items(n: usize) -> SessionFlow {
        SessionFlow::new((0..n).map(item).collect())
    }

    #[test]
    fn step_list_shape() {
        let flow = flow_with_items(3);
        assert_eq!(flow.len(), FIXED_STEPS + 3 + 1);
        assert_eq!(flow.steps()[0], Step::Intro);
        assert_eq!(flow.steps()[SCREENING_STEP], Step::Screening);
        assert_eq!(flow.steps()[CALIBRATION_STEP], Step::Calibration);
        assert!(flow.steps()[FIXED_STEPS].is_item());
        assert!(flow.steps()[flow.thank_you_step()].is_terminal());
    }

    #[test]
    fn advance_is_forward_only_and_stops_at_terminal() {
        let flow = flow_with_items(1);
        let mut state = SessionState::new("p1");
        for expected in 1..flow.len() {
            flow.advance(&mut state).unwrap();
            assert_eq!(state.current_step, expected);
        }
        let err = flow.advance(&mut state).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(state.current_step, flow.thank_you_step());
    }

    #[test]
    fn reveal_is_idempotent() {
        let flow = flow_with_items(2);
        let mut state = SessionState::at_step("p1", FIXED_STEPS);
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(30);
        let first = flow.record_item_reveal(&mut state, FIXED_STEPS, t0).unwrap();
        let second = flow.record_item_reveal(&mut state, FIXED_STEPS, t1).unwrap();
        assert_eq!(first, t0);
        assert_eq!(second, t0);
        assert!(state.revealed.contains(&FIXED_STEPS));
    }

    #[test]
    fn reveal_rejects_non_item_steps() {
        let flow = flow_with_items(2);
        let mut state = SessionState::new("p1");
        let err = flow
            .record_item_reveal(&mut state, 0, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn blank_responses_are_rejected() {
        assert!(validate_item_responses("heard this", "heard that").is_ok());
        assert!(matches!(
            validate_item_responses("", "x"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_item_responses("x", "   "),
            Err(Error::Validation(_))
        ));
    }
}
