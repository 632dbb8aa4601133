//! Core domain types for a pipeline invocation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ContentPipelineError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline invocation (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One of the three fixed pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idea,
    Draft,
    Editor,
}

impl Stage {
    /// Execution order. Each stage consumes the output of the one before it.
    pub const ALL: [Stage; 3] = [Stage::Idea, Stage::Draft, Stage::Editor];

    /// Short identifier used in logs and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::Draft => "draft",
            Self::Editor => "editor",
        }
    }

    /// Display name reported to callers (`"Idea Agent"`, ...).
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Idea => "Idea Agent",
            Self::Draft => "Draft Agent",
            Self::Editor => "Editor Agent",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.agent_name())
    }
}

// ---------------------------------------------------------------------------
// PipelineRequest
// ---------------------------------------------------------------------------

/// Input to a single pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    message: String,
    context: String,
}

impl PipelineRequest {
    /// Build a request. `message` must contain something other than whitespace;
    /// `context` may be empty.
    pub fn new(message: impl Into<String>, context: impl Into<String>) -> Result<Self> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ContentPipelineError::validation("message must not be empty"));
        }
        Ok(Self {
            message,
            context: context.into(),
        })
    }

    /// The user's original request text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Retrieval context text; empty when none was supplied.
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn has_context(&self) -> bool {
        !self.context.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Output of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub output: String,
}

/// Output of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// One entry per stage, in execution order.
    pub stages: Vec<StageResult>,
    /// Always the Editor stage's output.
    pub final_text: String,
}

impl PipelineResult {
    /// Assemble a result from the three stage outputs.
    pub fn from_outputs(ideas: String, draft: String, edited: String) -> Self {
        let stages = vec![
            StageResult {
                stage: Stage::Idea,
                output: ideas,
            },
            StageResult {
                stage: Stage::Draft,
                output: draft,
            },
            StageResult {
                stage: Stage::Editor,
                output: edited.clone(),
            },
        ];
        Self {
            stages,
            final_text: edited,
        }
    }

    /// Output of the given stage.
    pub fn output_of(&self, stage: Stage) -> Option<&str> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.output.as_str())
    }
}
