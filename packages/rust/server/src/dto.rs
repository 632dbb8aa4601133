//! JSON bodies exchanged with HTTP callers.

use serde::{Deserialize, Serialize};

use contentpipe_shared::PipelineResult;

/// `POST /content-pipeline` request body.
#[derive(Debug, Deserialize)]
pub struct PipelineBody {
    pub message: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// Successful response: the final text plus every stage's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub content: String,
    pub pipeline: PipelineTrace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub stages: Vec<AgentOutput>,
    pub final_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent: String,
    pub output: String,
}

impl From<PipelineResult> for PipelineResponse {
    fn from(result: PipelineResult) -> Self {
        let stages = result
            .stages
            .into_iter()
            .map(|s| AgentOutput {
                agent: s.stage.agent_name().to_string(),
                output: s.output,
            })
            .collect();
        Self {
            content: result.final_text.clone(),
            pipeline: PipelineTrace {
                stages,
                final_content: result.final_text,
            },
        }
    }
}

/// Failure response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
