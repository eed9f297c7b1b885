use crate::db::models::{Attempt, Quiz};

/// Facet bitmask bits, one per time phase.
pub const DURING: i32 = 0x1;
pub const IMMEDIATELY_AFTER: i32 = 0x2;
pub const LATER_WHILE_OPEN: i32 = 0x4;
pub const AFTER_CLOSE: i32 = 0x8;

/// How long after submission "immediately after" lasts.
const IMMEDIATELY_AFTER_WINDOW: i64 = 2 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPhase {
    During,
    ImmediatelyAfter,
    LaterWhileOpen,
    AfterClose,
}

impl ReviewPhase {
    fn bit(self) -> i32 {
        match self {
            ReviewPhase::During => DURING,
            ReviewPhase::ImmediatelyAfter => IMMEDIATELY_AFTER,
            ReviewPhase::LaterWhileOpen => LATER_WHILE_OPEN,
            ReviewPhase::AfterClose => AFTER_CLOSE,
        }
    }
}

/// Which review phase applies to this attempt right now. `time_close` is the
/// user's effective close time (0 = the quiz never closes).
pub fn review_phase(attempt: &Attempt, time_close: i64, now: i64) -> ReviewPhase {
    if !attempt.state.is_terminal() {
        return ReviewPhase::During;
    }
    if now < attempt.time_finish + IMMEDIATELY_AFTER_WINDOW {
        return ReviewPhase::ImmediatelyAfter;
    }
    if time_close == 0 || now < time_close {
        return ReviewPhase::LaterWhileOpen;
    }
    ReviewPhase::AfterClose
}

/// Per-facet visibility for one attempt at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewOptions {
    pub marks: bool,
    pub feedback: bool,
    pub right_answer: bool,
    pub general_feedback: bool,
}

pub fn review_options(
    quiz: &Quiz,
    attempt: &Attempt,
    time_close: i64,
    now: i64,
) -> ReviewOptions {
    let bit = review_phase(attempt, time_close, now).bit();
    ReviewOptions {
        marks: quiz.review_marks & bit != 0,
        feedback: quiz.review_feedback & bit != 0,
        right_answer: quiz.review_right_answer & bit != 0,
        general_feedback: quiz.review_general_feedback & bit != 0,
    }
}
