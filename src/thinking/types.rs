use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Highest revision ordinal a single step number can carry (`N.1` through `N.9`)
pub const MAX_REVISIONS_PER_STEP: u8 = 9;

/// Position of a step within a process.
///
/// Original steps are `(base, 0)`. A revision of step `N` takes the next free
/// ordinal for `N`, so the first correction of step 2 is `2.1`, the second
/// `2.2`, and so on. Ordering and equality use the pair, never a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThoughtNumber {
    base: u32,
    revision: u8,
}

impl ThoughtNumber {
    pub fn new(base: u32) -> Self {
        Self { base, revision: 0 }
    }

    pub(crate) fn with_revision(base: u32, revision: u8) -> Self {
        Self { base, revision }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// Numeric view, `base + revision / 10`
    pub fn as_f64(&self) -> f64 {
        // one rounding step: the tenths count is exact in f64
        (f64::from(self.base) * 10.0 + f64::from(self.revision)) / 10.0
    }

    /// Parse a caller-supplied number such as `2` or `2.1`.
    ///
    /// Returns `None` for anything that cannot name a step: non-finite or
    /// below 1, or a fractional part that is not a single tenth digit.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 1.0 {
            return None;
        }

        // Shortest round-trip decimal form, so `1000000000.1` keeps its tenth
        let text = value.to_string();
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
        let base: u32 = whole.parse().ok()?;
        let revision: u8 = match fraction {
            "" => 0,
            digit if digit.len() == 1 => digit.parse().ok()?,
            _ => return None,
        };

        if revision > MAX_REVISIONS_PER_STEP {
            return None;
        }

        Some(Self { base, revision })
    }
}

impl fmt::Display for ThoughtNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revision == 0 {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{}.{}", self.base, self.revision)
        }
    }
}

impl Serialize for ThoughtNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.revision == 0 {
            serializer.serialize_u32(self.base)
        } else {
            serializer.serialize_f64(self.as_f64())
        }
    }
}

impl<'de> Deserialize<'de> for ThoughtNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        ThoughtNumber::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid thought number: {}", value)))
    }
}

/// How a recorded step entered the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Append,
    Revision,
    Branch,
}

/// One recorded unit of reasoning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub thought_number: ThoughtNumber,
    pub thought: String,
    /// Caller's hint that more steps follow; not enforced
    pub next_thought_needed: bool,
    /// Caller's running estimate of the step count; not enforced
    pub total_thoughts: u32,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
    pub reasoning: String,
    pub kind: StepKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ThoughtNumber>,
    pub timestamp: DateTime<Utc>,
}

/// Hints supplied when a process is started.
///
/// The store keeps them on the process untouched; the handler layer reads
/// `max_steps` and the enable flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOptions {
    pub max_steps: Option<u32>,
    pub allow_branching: bool,
    pub allow_revision: bool,
    pub seed: Option<String>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            allow_branching: true,
            allow_revision: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMetadata {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_steps: usize,
    pub confidence: f64,
}

/// One reasoning session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingProcess {
    pub id: String,
    pub problem: String,
    pub options: StartOptions,
    pub thoughts: Vec<ThoughtStep>,
    pub current_step: usize,
    pub completed: bool,
    pub solution: Option<String>,
    pub metadata: ProcessMetadata,
}

impl ThinkingProcess {
    pub(crate) fn new(problem: String, options: StartOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            problem,
            options,
            thoughts: Vec::new(),
            current_step: 0,
            completed: false,
            solution: None,
            metadata: ProcessMetadata {
                start_time: Utc::now(),
                end_time: None,
                total_steps: 0,
                confidence: 0.0,
            },
        }
    }

    /// Index of the step numbered `number`, if any
    pub fn position_of(&self, number: ThoughtNumber) -> Option<usize> {
        self.thoughts.iter().position(|t| t.thought_number == number)
    }

    pub(crate) fn sync_step_count(&mut self) {
        self.current_step = self.thoughts.len();
        self.metadata.total_steps = self.thoughts.len();
    }
}

/// Caller-provided fields shared by every kind of think request
#[derive(Debug, Clone)]
pub struct ThoughtContent {
    pub thought: String,
    pub thought_number: u32,
    pub total_thoughts: u32,
    pub next_thought_needed: bool,
    pub confidence: Option<f64>,
}

impl ThoughtContent {
    pub fn new(thought: impl Into<String>, thought_number: u32, total_thoughts: u32) -> Self {
        Self {
            thought: thought.into(),
            thought_number,
            total_thoughts,
            next_thought_needed: true,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_next_thought_needed(mut self, needed: bool) -> Self {
        self.next_thought_needed = needed;
        self
    }
}

/// What the store should do with a new step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThoughtKind {
    /// Push at the tail
    Append,
    /// Splice right after `parent` with the next revision ordinal, optionally
    /// also carrying the three alternative phrasings of a branch
    Revise {
        parent: ThoughtNumber,
        with_alternatives: bool,
    },
    /// Push at the tail with three alternative phrasings
    Branch { parent: ThoughtNumber },
}

#[derive(Debug, Clone)]
pub struct ThoughtRequest {
    pub content: ThoughtContent,
    pub kind: ThoughtKind,
}

impl ThoughtRequest {
    pub fn append(content: ThoughtContent) -> Self {
        Self {
            content,
            kind: ThoughtKind::Append,
        }
    }

    pub fn revise(parent: ThoughtNumber, content: ThoughtContent) -> Self {
        Self {
            content,
            kind: ThoughtKind::Revise {
                parent,
                with_alternatives: false,
            },
        }
    }

    pub fn branch(parent: ThoughtNumber, content: ThoughtContent) -> Self {
        Self {
            content,
            kind: ThoughtKind::Branch { parent },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thought_number_parsing() {
        assert_eq!(ThoughtNumber::from_f64(2.0), Some(ThoughtNumber::new(2)));
        assert_eq!(
            ThoughtNumber::from_f64(2.1),
            Some(ThoughtNumber::with_revision(2, 1))
        );
        assert_eq!(
            ThoughtNumber::from_f64(12.9),
            Some(ThoughtNumber::with_revision(12, 9))
        );
        assert_eq!(ThoughtNumber::from_f64(0.0), None);
        assert_eq!(ThoughtNumber::from_f64(-3.0), None);
        assert_eq!(ThoughtNumber::from_f64(2.15), None);
        assert_eq!(ThoughtNumber::from_f64(f64::NAN), None);
        assert_eq!(ThoughtNumber::from_f64(5_000_000_000.0), None);
    }

    #[test]
    fn test_large_thought_numbers_keep_their_revision() {
        assert_eq!(
            ThoughtNumber::from_f64(1_000_000_000.1),
            Some(ThoughtNumber::with_revision(1_000_000_000, 1))
        );
        assert_eq!(
            ThoughtNumber::from_f64(4_000_000_000.3),
            Some(ThoughtNumber::with_revision(4_000_000_000, 3))
        );
        let number = ThoughtNumber::with_revision(3_999_999_999, 7);
        assert_eq!(ThoughtNumber::from_f64(number.as_f64()), Some(number));
    }

    #[test]
    fn test_revision_sorts_after_parent() {
        let parent = ThoughtNumber::new(2);
        let revision = ThoughtNumber::with_revision(2, 1);
        assert!(parent < revision);
        assert!(revision < ThoughtNumber::new(3));
        assert!((revision.as_f64() - 2.1).abs() < f64::EPSILON);
        assert_eq!(revision.to_string(), "2.1");
    }

    #[test]
    fn test_thought_number_serialization() {
        assert_eq!(serde_json::to_string(&ThoughtNumber::new(4)).unwrap(), "4");
        assert_eq!(
            serde_json::to_string(&ThoughtNumber::with_revision(4, 2)).unwrap(),
            "4.2"
        );
        let parsed: ThoughtNumber = serde_json::from_str("4.2").unwrap();
        assert_eq!(parsed, ThoughtNumber::with_revision(4, 2));
        assert!(serde_json::from_str::<ThoughtNumber>("0").is_err());
    }

    #[test]
    fn test_new_process_is_empty() {
        let process = ThinkingProcess::new("problem".to_string(), StartOptions::default());
        assert!(!process.completed);
        assert!(process.thoughts.is_empty());
        assert_eq!(process.metadata.total_steps, 0);
        assert!(process.metadata.end_time.is_none());
        assert!(uuid::Uuid::parse_str(&process.id).is_ok());
    }
}
