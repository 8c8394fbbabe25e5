use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::thinking::{StartOptions, ThinkingProcess, ThoughtStep};

/// Parameters for the start_thinking tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartThinkingParams {
    #[schemars(description = "The problem statement to reason about")]
    pub problem: String,

    #[schemars(description = "Optional upper bound on steps; can_continue turns false once reached")]
    pub max_steps: Option<u32>,

    #[schemars(description = "Whether branch requests are accepted (default: true)")]
    pub allow_branching: Option<bool>,

    #[schemars(description = "Whether revision requests are accepted (default: true)")]
    pub allow_revision: Option<bool>,

    #[schemars(description = "Optional seed string kept with the process")]
    pub seed: Option<String>,
}

/// Parameters for the think tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ThinkParams {
    #[schemars(description = "Process ID returned by start_thinking")]
    pub process_id: String,

    #[schemars(description = "The thought content for this step")]
    pub thought: String,

    #[schemars(description = "Current thought number in sequence")]
    pub thought_number: u32,

    #[schemars(description = "Current estimate of total thoughts")]
    pub total_thoughts: u32,

    #[schemars(description = "Whether another thought is needed")]
    pub next_thought_needed: bool,

    #[schemars(description = "Treat this thought as a revision of parent_thought_number")]
    pub revision: Option<bool>,

    #[schemars(description = "Branch from parent_thought_number and generate alternative phrasings")]
    pub branch_alternative: Option<bool>,

    #[schemars(description = "Thought number being revised or branched from (e.g. 2 or 2.1)")]
    pub parent_thought_number: Option<f64>,

    #[schemars(description = "Confidence in this thought from 0.0 to 1.0 (default: 0.5)")]
    pub confidence: Option<f64>,
}

/// Parameters for the complete_thinking tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompleteThinkingParams {
    #[schemars(description = "Process ID to complete")]
    pub process_id: String,

    #[schemars(description = "Complete even when no thoughts were recorded (default: false)")]
    #[serde(default)]
    pub force_solution: bool,
}

/// Parameters for tools addressing a single process
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProcessIdParams {
    #[schemars(description = "Process ID returned by start_thinking")]
    pub process_id: String,
}

/// Parameters for the list_thinking_processes tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListProcessesParams {
    #[schemars(description = "Include completed processes in the listing (default: true)")]
    #[serde(default = "default_true")]
    pub include_completed: bool,
}

fn default_true() -> bool {
    true
}

/// Response from start_thinking
#[derive(Debug, Serialize)]
pub struct StartThinkingResponse {
    pub process_id: String,
    pub problem: String,
    pub started_at: DateTime<Utc>,
    pub options: StartOptions,
}

/// Response from think
#[derive(Debug, Serialize)]
pub struct ThinkResponse {
    pub process_id: String,
    pub step: ThoughtStep,
    pub current_step: usize,
    pub can_continue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step_suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
}

/// Response from complete_thinking
#[derive(Debug, Serialize)]
pub struct CompleteThinkingResponse {
    pub process_id: String,
    pub solution: String,
    pub confidence: f64,
    pub total_steps: usize,
    pub thoughts: Vec<ThoughtStep>,
    pub duration_ms: i64,
}

/// Response from get_thinking_process
#[derive(Debug, Serialize)]
pub struct GetProcessResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ThinkingProcess>,
}

/// One row of list_thinking_processes
#[derive(Debug, Serialize)]
pub struct ProcessSummary {
    pub process_id: String,
    pub problem: String,
    pub current_step: usize,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Response from list_thinking_processes
#[derive(Debug, Serialize)]
pub struct ListProcessesResponse {
    pub processes: Vec<ProcessSummary>,
    pub total: usize,
}

/// Response from delete_thinking_process
#[derive(Debug, Serialize)]
pub struct DeleteProcessResponse {
    pub process_id: String,
    pub deleted: bool,
}
