//! Output selection: which text a finished run returns.

use crate::trace::LoopState;

/// Returned when the run produced nothing usable.
pub const NO_RESPONSE: &str = "Error: No response from agent";

/// Pick the authoritative answer of a finished run.
///
/// The most recent successful detailed report wins over the loop's own
/// terminal utterance, which may be a short paraphrase of it.
pub fn select(state: &LoopState) -> String {
    let detailed = state
        .trace
        .iter()
        .rev()
        .find(|i| i.succeeded() && i.tool().is_some_and(|t| t.is_detailed()))
        .map(|i| i.output.as_str())
        .filter(|output| !output.trim().is_empty());

    detailed
        .or_else(|| {
            state
                .final_answer
                .as_deref()
                .filter(|answer| !answer.trim().is_empty())
        })
        .unwrap_or(NO_RESPONSE)
        .to_string()
}
