use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use super::synthesis::{
    branch_alternatives, select_evictions, step_reasoning, synthesize_solution,
    weighted_confidence, EvictionCandidate, DEFAULT_STEP_CONFIDENCE,
};
use super::types::{
    StartOptions, StepKind, ThinkingProcess, ThoughtContent, ThoughtKind, ThoughtNumber,
    ThoughtRequest, ThoughtStep, MAX_REVISIONS_PER_STEP,
};
use crate::config::{CapacityPolicy, StoreConfig};
use crate::error::{Result, ThinkingError};

type ProcessHandle = Arc<Mutex<ThinkingProcess>>;

struct Entry {
    /// Creation order, used for stable listing
    sequence: u64,
    process: ProcessHandle,
}

#[derive(Default)]
struct ProcessTable {
    entries: HashMap<String, Entry>,
    next_sequence: u64,
}

/// In-memory owner of every thinking process.
///
/// The table lock guards creation, deletion and the eviction sweep. Each
/// process has its own lock, held for the whole of a mutation, so steps on one
/// process never interleave while different processes proceed in parallel.
/// Locks are always taken table first, then process.
pub struct ThinkingStore {
    table: RwLock<ProcessTable>,
    config: StoreConfig,
}

impl ThinkingStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            table: RwLock::new(ProcessTable::default()),
            config,
        }
    }

    /// Number of processes currently held, live and completed
    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a new process and return its id.
    ///
    /// At capacity, completed and stale processes are evicted first. If that
    /// frees nothing the configured `CapacityPolicy` decides between growing
    /// past the bound and refusing.
    pub fn start_thinking(&self, problem: impl Into<String>, options: StartOptions) -> Result<String> {
        let mut table = self.table.write();

        if table.entries.len() >= self.config.max_processes {
            let evicted = self.sweep(&mut table);
            tracing::debug!(
                "Capacity sweep evicted {} processes ({} remain, max {})",
                evicted,
                table.entries.len(),
                self.config.max_processes
            );

            if table.entries.len() >= self.config.max_processes {
                match self.config.capacity_policy {
                    CapacityPolicy::Reject => {
                        tracing::warn!(
                            "Refusing new thinking process: {} live processes",
                            table.entries.len()
                        );
                        return Err(ThinkingError::CapacityExceeded {
                            max: self.config.max_processes,
                        });
                    }
                    CapacityPolicy::Grow => {
                        tracing::warn!(
                            "Nothing to evict; growing past {} processes",
                            self.config.max_processes
                        );
                    }
                }
            }
        }

        let process = ThinkingProcess::new(problem.into(), options);
        let id = process.id.clone();
        let sequence = table.next_sequence;
        table.next_sequence += 1;
        table.entries.insert(
            id.clone(),
            Entry {
                sequence,
                process: Arc::new(Mutex::new(process)),
            },
        );

        tracing::info!("Started thinking process {}", id);
        Ok(id)
    }

    /// Record a step on a live process
    pub fn add_thought(&self, process_id: &str, request: ThoughtRequest) -> Result<ThoughtStep> {
        let handle = self.handle(process_id)?;
        let mut process = handle.lock();
        insert_step(&mut process, process_id, request)
    }

    /// Record a step and return it with a snapshot of the process taken under
    /// the same lock, so the snapshot always contains the new step
    pub fn record_thought(
        &self,
        process_id: &str,
        request: ThoughtRequest,
    ) -> Result<(ThoughtStep, ThinkingProcess)> {
        let handle = self.handle(process_id)?;
        let mut process = handle.lock();
        let step = insert_step(&mut process, process_id, request)?;
        Ok((step, process.clone()))
    }

    /// Seal a process, synthesizing its solution and aggregate confidence
    pub fn complete_thinking(&self, process_id: &str, force_solution: bool) -> Result<ThinkingProcess> {
        let handle = self.handle(process_id)?;
        let mut process = handle.lock();

        if process.completed {
            return Err(ThinkingError::InvalidState(format!(
                "Thinking process {} is already completed",
                process_id
            )));
        }

        if process.thoughts.is_empty() && !force_solution {
            return Err(ThinkingError::InvalidState(format!(
                "Thinking process {} has no thoughts; set force_solution to complete it anyway",
                process_id
            )));
        }

        process.completed = true;
        process.metadata.end_time = Some(Utc::now());
        process.solution = Some(synthesize_solution(&process.thoughts));
        process.metadata.confidence = weighted_confidence(&process.thoughts);
        process.sync_step_count();

        tracing::info!(
            "Completed thinking process {} after {} steps (confidence {:.2})",
            process_id,
            process.current_step,
            process.metadata.confidence
        );

        Ok(process.clone())
    }

    /// Snapshot of one process
    pub fn get_process(&self, process_id: &str) -> Option<ThinkingProcess> {
        let handle = self.handle(process_id).ok()?;
        let process = handle.lock();
        Some(process.clone())
    }

    /// Snapshot of every held process, in creation order
    pub fn get_all_processes(&self) -> Vec<ThinkingProcess> {
        let mut handles: Vec<(u64, ProcessHandle)> = {
            let table = self.table.read();
            table
                .entries
                .values()
                .map(|entry| (entry.sequence, Arc::clone(&entry.process)))
                .collect()
        };
        handles.sort_by_key(|(sequence, _)| *sequence);

        handles
            .into_iter()
            .map(|(_, handle)| handle.lock().clone())
            .collect()
    }

    /// Remove a process; returns whether anything was removed
    pub fn delete_process(&self, process_id: &str) -> bool {
        let removed = self.table.write().entries.remove(process_id).is_some();
        if removed {
            tracing::info!("Deleted thinking process {}", process_id);
        }
        removed
    }

    fn handle(&self, process_id: &str) -> Result<ProcessHandle> {
        self.table
            .read()
            .entries
            .get(process_id)
            .map(|entry| Arc::clone(&entry.process))
            .ok_or_else(|| {
                ThinkingError::NotFound(format!("Thinking process {} not found", process_id))
            })
    }

    /// Evict completed and stale processes; caller holds the table write lock
    fn sweep(&self, table: &mut ProcessTable) -> usize {
        let candidates: Vec<EvictionCandidate> = table
            .entries
            .iter()
            .map(|(id, entry)| {
                let process = entry.process.lock();
                EvictionCandidate {
                    id: id.clone(),
                    start_time: process.metadata.start_time,
                    completed: process.completed,
                }
            })
            .collect();

        let evicted = select_evictions(&candidates, Utc::now(), self.config.retention());
        for id in &evicted {
            table.entries.remove(id);
        }
        evicted.len()
    }
}

impl Default for ThinkingStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Validate `request` against `process` and insert the resulting step
fn insert_step(
    process: &mut ThinkingProcess,
    process_id: &str,
    request: ThoughtRequest,
) -> Result<ThoughtStep> {
    if process.completed {
        return Err(ThinkingError::InvalidState(format!(
            "Thinking process {} is completed and cannot take new thoughts",
            process_id
        )));
    }

    let ThoughtRequest { content, kind } = request;
    let step = match kind {
        ThoughtKind::Append => {
            let number = ThoughtNumber::new(content.thought_number);
            let thought = content.thought.clone();
            let step = new_step(&process.thoughts, number, thought, &content, StepKind::Append, None);
            process.thoughts.push(step.clone());
            step
        }
        ThoughtKind::Branch { parent } => {
            let number = ThoughtNumber::new(content.thought_number);
            let thought = content.thought.clone();
            let mut step = new_step(
                &process.thoughts,
                number,
                thought,
                &content,
                StepKind::Branch,
                Some(parent),
            );
            step.alternatives = Some(branch_alternatives(&content.thought));
            process.thoughts.push(step.clone());
            step
        }
        ThoughtKind::Revise {
            parent,
            with_alternatives,
        } => {
            let position = process.position_of(parent).ok_or_else(|| {
                ThinkingError::ParentNotFound {
                    process_id: process_id.to_string(),
                    parent: parent.to_string(),
                }
            })?;
            let number = next_revision_number(&process.thoughts, parent.base())?;
            let thought = format!("[REVISION] {}", content.thought);
            let mut step = new_step(
                &process.thoughts,
                number,
                thought,
                &content,
                StepKind::Revision,
                Some(parent),
            );
            if with_alternatives {
                step.alternatives = Some(branch_alternatives(&content.thought));
            }
            process.thoughts.insert(position + 1, step.clone());
            step
        }
    };

    process.sync_step_count();
    tracing::debug!(
        "Recorded {:?} thought {} on process {} ({} steps)",
        step.kind,
        step.thought_number,
        process_id,
        process.current_step
    );

    Ok(step)
}

fn new_step(
    previous: &[ThoughtStep],
    number: ThoughtNumber,
    thought: String,
    content: &ThoughtContent,
    kind: StepKind,
    parent: Option<ThoughtNumber>,
) -> ThoughtStep {
    ThoughtStep {
        thought_number: number,
        reasoning: step_reasoning(previous, number, content.total_thoughts),
        thought,
        next_thought_needed: content.next_thought_needed,
        total_thoughts: content.total_thoughts,
        confidence: content.confidence.unwrap_or(DEFAULT_STEP_CONFIDENCE),
        alternatives: None,
        kind,
        parent,
        timestamp: Utc::now(),
    }
}

/// Next unused revision ordinal for `base`
fn next_revision_number(thoughts: &[ThoughtStep], base: u32) -> Result<ThoughtNumber> {
    let highest = thoughts
        .iter()
        .filter(|t| t.thought_number.base() == base)
        .map(|t| t.thought_number.revision())
        .max()
        .unwrap_or(0);

    if highest >= MAX_REVISIONS_PER_STEP {
        return Err(ThinkingError::InvalidState(format!(
            "Thought {} already has {} revisions",
            base, MAX_REVISIONS_PER_STEP
        )));
    }

    Ok(ThoughtNumber::with_revision(base, highest + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thinking::synthesis::NO_SOLUTION_MESSAGE;

    fn append(store: &ThinkingStore, id: &str, number: u32, thought: &str) -> ThoughtStep {
        store
            .add_thought(id, ThoughtRequest::append(ThoughtContent::new(thought, number, 5)))
            .unwrap()
    }

    fn numbers(process: &ThinkingProcess) -> Vec<String> {
        process
            .thoughts
            .iter()
            .map(|t| t.thought_number.to_string())
            .collect()
    }

    #[test]
    fn test_start_creates_empty_process() {
        let store = ThinkingStore::default();
        let options = StartOptions {
            max_steps: Some(8),
            seed: Some("seed-42".to_string()),
            ..StartOptions::default()
        };
        let id = store.start_thinking("Which lead compound first?", options.clone()).unwrap();

        let process = store.get_process(&id).unwrap();
        assert!(!process.completed);
        assert!(process.thoughts.is_empty());
        assert_eq!(process.metadata.total_steps, 0);
        assert_eq!(process.problem, "Which lead compound first?");
        assert_eq!(process.options, options);
    }

    #[test]
    fn test_plain_appends_preserve_order() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();

        for n in 1..=4 {
            append(&store, &id, n, &format!("step {}", n));
        }

        let process = store.get_process(&id).unwrap();
        assert_eq!(process.current_step, 4);
        assert_eq!(process.metadata.total_steps, 4);
        assert_eq!(numbers(&process), vec!["1", "2", "3", "4"]);
        assert_eq!(process.thoughts[3].thought, "step 4");
        assert_eq!(process.thoughts[0].confidence, DEFAULT_STEP_CONFIDENCE);
    }

    #[test]
    fn test_revision_is_spliced_after_parent() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        for n in 1..=3 {
            append(&store, &id, n, &format!("step {}", n));
        }

        let step = store
            .add_thought(
                &id,
                ThoughtRequest::revise(ThoughtNumber::new(2), ThoughtContent::new("better step 2", 4, 5)),
            )
            .unwrap();

        assert_eq!(step.thought_number, ThoughtNumber::with_revision(2, 1));
        assert_eq!(step.thought, "[REVISION] better step 2");
        assert_eq!(step.kind, StepKind::Revision);
        assert_eq!(step.parent, Some(ThoughtNumber::new(2)));

        let process = store.get_process(&id).unwrap();
        assert_eq!(numbers(&process), vec!["1", "2", "2.1", "3"]);
        assert_eq!(process.current_step, 4);
    }

    #[test]
    fn test_revision_of_last_step_lands_at_tail() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");
        append(&store, &id, 2, "two");

        store
            .add_thought(
                &id,
                ThoughtRequest::revise(ThoughtNumber::new(2), ThoughtContent::new("two again", 3, 3)),
            )
            .unwrap();

        let process = store.get_process(&id).unwrap();
        assert_eq!(numbers(&process), vec!["1", "2", "2.1"]);
    }

    #[test]
    fn test_repeated_revisions_take_fresh_ordinals() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");
        append(&store, &id, 2, "two");

        let parent = ThoughtNumber::new(1);
        store
            .add_thought(&id, ThoughtRequest::revise(parent, ThoughtContent::new("first fix", 3, 5)))
            .unwrap();
        let second = store
            .add_thought(&id, ThoughtRequest::revise(parent, ThoughtContent::new("second fix", 4, 5)))
            .unwrap();

        assert_eq!(second.thought_number.to_string(), "1.2");
        let process = store.get_process(&id).unwrap();
        assert_eq!(numbers(&process), vec!["1", "1.2", "1.1", "2"]);
    }

    #[test]
    fn test_revision_ordinals_are_bounded() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");

        for _ in 0..MAX_REVISIONS_PER_STEP {
            store
                .add_thought(
                    &id,
                    ThoughtRequest::revise(ThoughtNumber::new(1), ThoughtContent::new("fix", 2, 5)),
                )
                .unwrap();
        }

        let result = store.add_thought(
            &id,
            ThoughtRequest::revise(ThoughtNumber::new(1), ThoughtContent::new("one more", 2, 5)),
        );
        assert!(matches!(result, Err(ThinkingError::InvalidState(_))));
        assert_eq!(store.get_process(&id).unwrap().current_step, 10);
    }

    #[test]
    fn test_revision_with_missing_parent_is_rejected() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");

        let result = store.add_thought(
            &id,
            ThoughtRequest::revise(ThoughtNumber::new(7), ThoughtContent::new("fix", 2, 5)),
        );

        assert!(matches!(result, Err(ThinkingError::ParentNotFound { .. })));
        let process = store.get_process(&id).unwrap();
        assert_eq!(process.current_step, 1);
        assert_eq!(process.thoughts.len(), 1);
    }

    #[test]
    fn test_branch_records_three_alternatives() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");

        let step = store
            .add_thought(
                &id,
                ThoughtRequest::branch(
                    ThoughtNumber::new(1),
                    ThoughtContent::new("A complex dosing schedule", 2, 5).with_confidence(0.8),
                ),
            )
            .unwrap();

        let alternatives = step.alternatives.as_ref().unwrap();
        assert_eq!(alternatives.len(), 3);
        assert_eq!(alternatives[2], "Simplified: A simple dosing schedule");
        assert_eq!(step.kind, StepKind::Branch);
        assert_eq!(step.confidence, 0.8);

        let process = store.get_process(&id).unwrap();
        assert_eq!(numbers(&process), vec!["1", "2"]);
    }

    #[test]
    fn test_revision_can_carry_branch_alternatives() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");
        append(&store, &id, 2, "two");

        let request = ThoughtRequest {
            content: ThoughtContent::new("A complicated rethink of one", 3, 5),
            kind: ThoughtKind::Revise {
                parent: ThoughtNumber::new(1),
                with_alternatives: true,
            },
        };
        let step = store.add_thought(&id, request).unwrap();

        assert_eq!(step.kind, StepKind::Revision);
        assert_eq!(step.thought_number, ThoughtNumber::with_revision(1, 1));
        let alternatives = step.alternatives.as_ref().unwrap();
        assert_eq!(alternatives.len(), 3);
        assert_eq!(alternatives[2], "Simplified: A simple rethink of one");

        let process = store.get_process(&id).unwrap();
        assert_eq!(numbers(&process), vec!["1", "1.1", "2"]);
    }

    #[test]
    fn test_record_thought_returns_snapshot_with_new_step() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");

        let (step, process) = store
            .record_thought(&id, ThoughtRequest::append(ThoughtContent::new("two", 2, 5)))
            .unwrap();
        assert_eq!(process.current_step, 2);
        assert_eq!(process.thoughts[1].thought_number, step.thought_number);

        store.delete_process(&id);
        assert_eq!(process.thoughts.len(), 2);
        assert!(store.get_process(&id).is_none());
    }

    #[test]
    fn test_long_process_completes_with_bounded_confidence() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        for n in 1..=7600 {
            store
                .add_thought(
                    &id,
                    ThoughtRequest::append(ThoughtContent::new("step", n, 7600).with_confidence(0.5)),
                )
                .unwrap();
        }

        let process = store.complete_thinking(&id, false).unwrap();
        assert_eq!(process.metadata.total_steps, 7600);
        assert!((0.0..=1.0).contains(&process.metadata.confidence));
        assert!((process.metadata.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reasoning_reflects_preceding_steps() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        let first = append(&store, &id, 1, "Potency looks fine");
        let second = append(&store, &id, 2, "Half-life is short");

        assert!(first.reasoning.contains("opens the analysis"));
        assert!(second.reasoning.contains("Potency looks fine"));
        assert!(second.reasoning.starts_with("Thought 2 of 5"));
    }

    #[test]
    fn test_unknown_process_is_not_found() {
        let store = ThinkingStore::default();
        let add = store.add_thought(
            "nonexistent-id",
            ThoughtRequest::append(ThoughtContent::new("x", 1, 1)),
        );
        assert!(matches!(add, Err(ThinkingError::NotFound(_))));
        assert!(matches!(
            store.complete_thinking("nonexistent-id", false),
            Err(ThinkingError::NotFound(_))
        ));
        assert!(store.get_process("nonexistent-id").is_none());
    }

    #[test]
    fn test_completed_process_is_immutable() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "one");
        store.complete_thinking(&id, false).unwrap();

        let result = store.add_thought(&id, ThoughtRequest::append(ThoughtContent::new("two", 2, 2)));
        assert!(matches!(result, Err(ThinkingError::InvalidState(_))));
        assert!(matches!(
            store.complete_thinking(&id, true),
            Err(ThinkingError::InvalidState(_))
        ));
    }

    #[test]
    fn test_empty_completion_requires_force() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();

        assert!(matches!(
            store.complete_thinking(&id, false),
            Err(ThinkingError::InvalidState(_))
        ));
        assert!(!store.get_process(&id).unwrap().completed);

        let process = store.complete_thinking(&id, true).unwrap();
        assert!(process.completed);
        assert_eq!(process.solution.as_deref(), Some(NO_SOLUTION_MESSAGE));
        assert_eq!(process.metadata.confidence, 0.0);
        assert!(process.metadata.end_time.is_some());
    }

    #[test]
    fn test_completion_synthesizes_solution_and_confidence() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        let steps = [("Low solubility", 0.4), ("Salt form fixes it", 0.9), ("Run PK study", 0.85)];
        for (n, (thought, confidence)) in steps.iter().enumerate() {
            store
                .add_thought(
                    &id,
                    ThoughtRequest::append(
                        ThoughtContent::new(*thought, n as u32 + 1, 3).with_confidence(*confidence),
                    ),
                )
                .unwrap();
        }

        let process = store.complete_thinking(&id, false).unwrap();
        assert_eq!(
            process.solution.as_deref(),
            Some("Salt form fixes it Furthermore, Run PK study")
        );
        assert!(process.metadata.confidence > 0.0 && process.metadata.confidence <= 1.0);
        assert_eq!(process.metadata.total_steps, 3);
        assert!(store.get_process(&id).unwrap().completed);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = ThinkingStore::default();
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();

        assert!(store.delete_process(&id));
        assert!(!store.delete_process(&id));
        assert!(store.get_process(&id).is_none());
    }

    #[test]
    fn test_all_processes_in_creation_order() {
        let store = ThinkingStore::default();
        let ids: Vec<String> = (0..5)
            .map(|i| store.start_thinking(format!("problem {}", i), StartOptions::default()).unwrap())
            .collect();
        store.complete_thinking(&ids[1], true).unwrap();

        let listed: Vec<String> = store.get_all_processes().into_iter().map(|p| p.id).collect();
        assert_eq!(listed, ids);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_grow_policy_exceeds_capacity_when_nothing_evictable() {
        let store = ThinkingStore::default();
        for i in 0..100 {
            store.start_thinking(format!("problem {}", i), StartOptions::default()).unwrap();
        }

        assert!(store.start_thinking("problem 101", StartOptions::default()).is_ok());
        assert_eq!(store.len(), 101);
    }

    #[test]
    fn test_reject_policy_refuses_when_nothing_evictable() {
        let store = ThinkingStore::new(StoreConfig {
            max_processes: 3,
            capacity_policy: CapacityPolicy::Reject,
            ..StoreConfig::default()
        });
        let ids: Vec<String> = (0..3)
            .map(|i| store.start_thinking(format!("problem {}", i), StartOptions::default()).unwrap())
            .collect();

        assert!(matches!(
            store.start_thinking("one too many", StartOptions::default()),
            Err(ThinkingError::CapacityExceeded { max: 3 })
        ));

        store.complete_thinking(&ids[0], true).unwrap();
        let id = store.start_thinking("fits now", StartOptions::default()).unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.get_process(&ids[0]).is_none());
        assert!(store.get_process(&id).is_some());
    }

    #[test]
    fn test_sweep_evicts_completed_processes() {
        let store = ThinkingStore::new(StoreConfig {
            max_processes: 2,
            ..StoreConfig::default()
        });
        let done = store.start_thinking("done", StartOptions::default()).unwrap();
        let live = store.start_thinking("live", StartOptions::default()).unwrap();
        store.complete_thinking(&done, true).unwrap();

        store.start_thinking("new", StartOptions::default()).unwrap();

        assert!(store.get_process(&done).is_none());
        assert!(store.get_process(&live).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_sweep_evicts_stale_processes() {
        let store = ThinkingStore::new(StoreConfig {
            max_processes: 1,
            retention_secs: 0,
            capacity_policy: CapacityPolicy::Reject,
        });
        let old = store.start_thinking("old", StartOptions::default()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let new = store.start_thinking("new", StartOptions::default()).unwrap();
        assert!(store.get_process(&old).is_none());
        assert!(store.get_process(&new).is_some());
    }

    #[test]
    fn test_no_sweep_below_capacity() {
        let store = ThinkingStore::new(StoreConfig {
            max_processes: 10,
            ..StoreConfig::default()
        });
        let done = store.start_thinking("done", StartOptions::default()).unwrap();
        store.complete_thinking(&done, true).unwrap();
        store.start_thinking("next", StartOptions::default()).unwrap();

        assert!(store.get_process(&done).is_some());
    }

    #[test]
    fn test_concurrent_appends_are_all_recorded() {
        let store = Arc::new(ThinkingStore::default());
        let id = store.start_thinking("problem", StartOptions::default()).unwrap();
        append(&store, &id, 1, "anchor");

        std::thread::scope(|scope| {
            for worker in 0..8u32 {
                let store = Arc::clone(&store);
                let id = id.clone();
                scope.spawn(move || {
                    for i in 0..25u32 {
                        let number = 2 + worker * 25 + i;
                        store
                            .add_thought(&id, ThoughtRequest::append(ThoughtContent::new("w", number, 201)))
                            .unwrap();
                        if i % 5 == 0 {
                            // Revisions race the appends; ordinals run out after nine
                            let _ = store.add_thought(
                                &id,
                                ThoughtRequest::revise(ThoughtNumber::new(1), ThoughtContent::new("r", 1, 201)),
                            );
                        }
                    }
                });
            }
        });

        let process = store.get_process(&id).unwrap();
        let revisions = process.thoughts.iter().filter(|t| t.kind == StepKind::Revision).count();
        assert_eq!(revisions, MAX_REVISIONS_PER_STEP as usize);
        assert_eq!(process.current_step, 1 + 200 + revisions);
        assert_eq!(process.thoughts[0].thought_number, ThoughtNumber::new(1));
        // Every revision sits directly after the anchor, ahead of all appends
        assert!(process.thoughts[1..=revisions]
            .iter()
            .all(|t| t.kind == StepKind::Revision));
    }

    #[test]
    fn test_concurrent_creation_across_threads() {
        let store = Arc::new(ThinkingStore::new(StoreConfig {
            max_processes: 16,
            capacity_policy: CapacityPolicy::Reject,
            ..StoreConfig::default()
        }));

        let created: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..32)
                .map(|i| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        store
                            .start_thinking(format!("problem {}", i), StartOptions::default())
                            .is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(created.iter().filter(|ok| **ok).count(), 16);
        assert_eq!(store.len(), 16);
    }
}
