//! Text and scoring functions behind step construction and completion.
//!
//! Everything here is pure: the store calls these while holding a process
//! lock and never passes anything it has not already snapshotted.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{ThoughtNumber, ThoughtStep};

/// Steps above this confidence feed the synthesized solution
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Confidence given to a step submitted without one
pub const DEFAULT_STEP_CONFIDENCE: f64 = 0.5;

const SOLUTION_STEP_LIMIT: usize = 3;
const SOLUTION_CONNECTOR: &str = " Furthermore, ";
const RECENCY_WEIGHT_BASE: f64 = 1.1;
const CONTEXT_WINDOW: usize = 2;
const EXCERPT_CHARS: usize = 60;

pub const NO_SOLUTION_MESSAGE: &str =
    "No solution could be generated: the thinking process recorded no thoughts.";

static COMPLEXITY_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)complicated|complex").expect("complexity pattern is valid"));

/// First `EXCERPT_CHARS` characters of `text`, with an ellipsis when cut
pub fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Contextual sentence for a new step, drawn from the last two steps before it
pub fn step_reasoning(previous: &[ThoughtStep], number: ThoughtNumber, total: u32) -> String {
    let context = &previous[previous.len().saturating_sub(CONTEXT_WINDOW)..];

    if context.is_empty() {
        return format!(
            "Thought {} of {} opens the analysis of the problem.",
            number, total
        );
    }

    let quoted: Vec<String> = context
        .iter()
        .map(|step| format!("\"{}\"", excerpt(&step.thought)))
        .collect();
    let lead = if context.len() == 1 {
        "the previous step"
    } else {
        "the previous two steps"
    };

    format!(
        "Thought {} of {} builds on {}: {}.",
        number,
        total,
        lead,
        quoted.join(" and ")
    )
}

/// The three alternative phrasings recorded on a branch step
pub fn branch_alternatives(thought: &str) -> Vec<String> {
    let thought = thought.trim();
    vec![
        format!("Instead of that, consider the opposite: {}", thought),
        format!("From another angle: {}", thought),
        format!("Simplified: {}", COMPLEXITY_WORDS.replace_all(thought, "simple")),
    ]
}

/// Closing text for a completed process.
///
/// Joins the last three steps above `HIGH_CONFIDENCE_THRESHOLD`; without any,
/// falls back to the final step.
pub fn synthesize_solution(thoughts: &[ThoughtStep]) -> String {
    let confident: Vec<&str> = thoughts
        .iter()
        .filter(|step| step.confidence > HIGH_CONFIDENCE_THRESHOLD)
        .map(|step| step.thought.as_str())
        .collect();

    if !confident.is_empty() {
        let start = confident.len().saturating_sub(SOLUTION_STEP_LIMIT);
        return confident[start..].join(SOLUTION_CONNECTOR);
    }

    match thoughts.last() {
        Some(last) => format!(
            "After {} steps of analysis, the conclusion is: {}",
            thoughts.len(),
            last.thought
        ),
        None => NO_SOLUTION_MESSAGE.to_string(),
    }
}

/// Recency-weighted mean of step confidences.
///
/// The i-th step with a positive confidence weighs `1.1^i`. Zero steps give
/// 0; steps without any positive confidence give the default 0.5.
///
/// Weights are taken relative to the newest counted step (`1.1^(i - last)`),
/// which keeps the same ratios while staying finite for any step count.
pub fn weighted_confidence(thoughts: &[ThoughtStep]) -> f64 {
    if thoughts.is_empty() {
        return 0.0;
    }

    let counted: Vec<f64> = thoughts
        .iter()
        .map(|step| step.confidence)
        .filter(|confidence| confidence.is_finite() && *confidence > 0.0)
        .collect();
    let last = counted.len().saturating_sub(1);

    let (weighted_sum, weight_total) = counted.iter().enumerate().fold(
        (0.0, 0.0),
        |(sum, weights), (i, confidence)| {
            let age = i32::try_from(last - i).unwrap_or(i32::MAX);
            let weight = RECENCY_WEIGHT_BASE.powi(-age);
            (sum + confidence * weight, weights + weight)
        },
    );

    if weight_total == 0.0 {
        return DEFAULT_STEP_CONFIDENCE;
    }

    (weighted_sum / weight_total).clamp(0.0, 1.0)
}

/// What the eviction sweep needs to know about a process
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub completed: bool,
}

/// Ids of candidates that are completed or started more than `retention` before `now`
pub fn select_evictions(
    candidates: &[EvictionCandidate],
    now: DateTime<Utc>,
    retention: chrono::Duration,
) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| c.completed || now.signed_duration_since(c.start_time) > retention)
        .map(|c| c.id.clone())
        .collect()
}
