use std::sync::Arc;

use crate::error::{Result, ThinkingError};
use crate::models::{
    CompleteThinkingParams, CompleteThinkingResponse, DeleteProcessResponse, GetProcessResponse,
    ListProcessesParams, ListProcessesResponse, ProcessIdParams, ProcessSummary,
    StartThinkingParams, StartThinkingResponse, ThinkParams, ThinkResponse,
};
use crate::thinking::synthesis::{excerpt, HIGH_CONFIDENCE_THRESHOLD};
use crate::thinking::{
    StartOptions, ThinkingProcess, ThinkingStore, ThoughtContent, ThoughtKind, ThoughtNumber,
    ThoughtRequest, ThoughtStep,
};
use crate::validation::InputValidator;

/// Below this a step gets a revision suggestion
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;
/// Step count from which think responses carry a running summary
const SUMMARY_MIN_STEPS: usize = 3;
const INSIGHT_LIMIT: usize = 3;

/// Handler for MCP tool operations
pub struct ToolHandlers {
    store: Arc<ThinkingStore>,
    validator: Arc<InputValidator>,
}

impl ToolHandlers {
    pub fn new(store: Arc<ThinkingStore>, validator: Arc<InputValidator>) -> Self {
        Self { store, validator }
    }

    pub fn store(&self) -> &ThinkingStore {
        &self.store
    }

    /// Handle start_thinking tool
    pub fn start_thinking(&self, params: StartThinkingParams) -> Result<StartThinkingResponse> {
        self.validator.validate_problem(&params.problem)?;

        let defaults = StartOptions::default();
        let options = StartOptions {
            max_steps: params.max_steps,
            allow_branching: params.allow_branching.unwrap_or(defaults.allow_branching),
            allow_revision: params.allow_revision.unwrap_or(defaults.allow_revision),
            seed: params.seed,
        };

        let process_id = self.store.start_thinking(params.problem, options)?;
        let process = self.snapshot(&process_id)?;

        Ok(StartThinkingResponse {
            process_id,
            problem: process.problem,
            started_at: process.metadata.start_time,
            options: process.options,
        })
    }

    /// Handle think tool
    pub fn think(&self, params: ThinkParams) -> Result<ThinkResponse> {
        self.validator.validate_process_id(&params.process_id)?;
        self.validator.validate_thought_content(&params.thought)?;
        self.validator.validate_thought_numbers(params.thought_number, params.total_thoughts)?;
        self.validator.validate_confidence(params.confidence)?;

        let kind = resolve_kind(&params)?;
        let options = self.snapshot(&params.process_id)?.options;
        match kind {
            ThoughtKind::Revise { .. } if !options.allow_revision => {
                return Err(ThinkingError::InvalidState(format!(
                    "Revisions are disabled for thinking process {}",
                    params.process_id
                )));
            }
            ThoughtKind::Branch { .. }
            | ThoughtKind::Revise {
                with_alternatives: true,
                ..
            } if !options.allow_branching => {
                return Err(ThinkingError::InvalidState(format!(
                    "Branching is disabled for thinking process {}",
                    params.process_id
                )));
            }
            _ => {}
        }

        tracing::info!(
            "Processing thought {} of {} for process '{}' ({:?})",
            params.thought_number,
            params.total_thoughts,
            params.process_id,
            kind
        );

        let mut content = ThoughtContent::new(params.thought, params.thought_number, params.total_thoughts)
            .with_next_thought_needed(params.next_thought_needed);
        content.confidence = params.confidence;

        let (step, process) = self
            .store
            .record_thought(&params.process_id, ThoughtRequest { content, kind })?;

        let can_continue = can_continue(&step, &process);
        Ok(ThinkResponse {
            process_id: params.process_id,
            next_step_suggestion: next_step_suggestion(&step, can_continue),
            summary: running_summary(&process),
            insights: insights(&process),
            current_step: process.current_step,
            can_continue,
            step,
        })
    }

    /// Handle complete_thinking tool
    pub fn complete_thinking(&self, params: CompleteThinkingParams) -> Result<CompleteThinkingResponse> {
        self.validator.validate_process_id(&params.process_id)?;

        let process = self
            .store
            .complete_thinking(&params.process_id, params.force_solution)?;

        let duration_ms = process
            .metadata
            .end_time
            .map(|end| (end - process.metadata.start_time).num_milliseconds())
            .unwrap_or_default();

        Ok(CompleteThinkingResponse {
            process_id: process.id,
            solution: process.solution.unwrap_or_default(),
            confidence: process.metadata.confidence,
            total_steps: process.metadata.total_steps,
            thoughts: process.thoughts,
            duration_ms,
        })
    }

    /// Handle get_thinking_process tool; an unknown or empty id is reported as not found
    pub fn get_process(&self, params: ProcessIdParams) -> Result<GetProcessResponse> {
        let process = self.store.get_process(&params.process_id);
        Ok(GetProcessResponse {
            found: process.is_some(),
            process,
        })
    }

    /// Handle list_thinking_processes tool
    pub fn list_processes(&self, params: ListProcessesParams) -> Result<ListProcessesResponse> {
        let processes: Vec<ProcessSummary> = self
            .store
            .get_all_processes()
            .into_iter()
            .filter(|p| params.include_completed || !p.completed)
            .map(|p| ProcessSummary {
                confidence: p.completed.then_some(p.metadata.confidence),
                problem: excerpt(&p.problem),
                process_id: p.id,
                current_step: p.current_step,
                completed: p.completed,
                started_at: p.metadata.start_time,
            })
            .collect();

        Ok(ListProcessesResponse {
            total: processes.len(),
            processes,
        })
    }

    /// Handle delete_thinking_process tool
    pub fn delete_process(&self, params: ProcessIdParams) -> Result<DeleteProcessResponse> {
        self.validator.validate_process_id(&params.process_id)?;

        let deleted = self.store.delete_process(&params.process_id);
        Ok(DeleteProcessResponse {
            process_id: params.process_id,
            deleted,
        })
    }

    fn snapshot(&self, process_id: &str) -> Result<ThinkingProcess> {
        self.store
            .get_process(process_id)
            .ok_or_else(|| ThinkingError::NotFound(format!("Thinking process {} not found", process_id)))
    }
}

/// Turn the optional revision/branch flags into one request kind.
///
/// With both flags set the step is spliced as a revision and still carries
/// the branch alternatives; either flag without a parent number is a plain
/// append.
fn resolve_kind(params: &ThinkParams) -> Result<ThoughtKind> {
    let parent = match params.parent_thought_number {
        Some(value) => Some(ThoughtNumber::from_f64(value).ok_or_else(|| {
            ThinkingError::Validation {
                field: "parent_thought_number".to_string(),
                reason: format!("{} does not name a thought", value),
            }
        })?),
        None => None,
    };

    let revision = params.revision.unwrap_or(false);
    let branch = params.branch_alternative.unwrap_or(false);

    Ok(match parent {
        Some(parent) if revision => ThoughtKind::Revise {
            parent,
            with_alternatives: branch,
        },
        Some(parent) if branch => ThoughtKind::Branch { parent },
        _ => {
            if revision || branch {
                tracing::debug!("Revision/branch flag without parent_thought_number; appending");
            }
            ThoughtKind::Append
        }
    })
}

fn can_continue(step: &ThoughtStep, process: &ThinkingProcess) -> bool {
    let max_reached = process
        .options
        .max_steps
        .is_some_and(|max| process.current_step >= max as usize);
    step.next_thought_needed && !process.completed && !max_reached
}

fn next_step_suggestion(step: &ThoughtStep, can_continue: bool) -> Option<String> {
    if step.confidence < LOW_CONFIDENCE_THRESHOLD {
        return Some(format!(
            "Confidence in thought {} is low ({:.2}); consider revising it with revision=true and parent_thought_number={}",
            step.thought_number, step.confidence, step.thought_number
        ));
    }

    if can_continue {
        let next = step.thought_number.base() + 1;
        return Some(format!(
            "Continue with thought {} of {}",
            next,
            step.total_thoughts.max(next)
        ));
    }

    None
}

fn running_summary(process: &ThinkingProcess) -> Option<String> {
    if process.current_step < SUMMARY_MIN_STEPS {
        return None;
    }

    let mean = process.thoughts.iter().map(|t| t.confidence).sum::<f64>()
        / process.thoughts.len() as f64;
    Some(format!(
        "{} thoughts recorded on \"{}\"; mean confidence {:.2}",
        process.current_step,
        excerpt(&process.problem),
        mean
    ))
}

fn insights(process: &ThinkingProcess) -> Option<Vec<String>> {
    let confident: Vec<String> = process
        .thoughts
        .iter()
        .filter(|t| t.confidence > HIGH_CONFIDENCE_THRESHOLD)
        .map(|t| excerpt(&t.thought))
        .collect();

    if confident.is_empty() {
        return None;
    }

    let start = confident.len().saturating_sub(INSIGHT_LIMIT);
    Some(confident[start..].to_vec())
}
