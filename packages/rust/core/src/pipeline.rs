//! Idea → Draft → Editor prompt chain.

use std::time::Instant;

use tracing::{Span, field, info, instrument, warn};

use contentpipe_shared::{PipelineRequest, PipelineResult, Result, RunId, Stage};

use crate::gateway::GatewayClient;
use crate::prompts;

/// Progress callback for stage-level status.
pub trait StageProgress: Send + Sync {
    /// Called right before a stage's upstream call is sent.
    fn stage_started(&self, stage: Stage);
    /// Called once a stage has produced its output.
    fn stage_completed(&self, stage: Stage, output: &str);
}

/// No-op progress reporter for headless/server usage.
pub struct SilentProgress;

impl StageProgress for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_completed(&self, _stage: Stage, _output: &str) {}
}

/// Run the three-stage content pipeline.
///
/// 1. Idea: brainstorm from the enriched prompt (context + message)
/// 2. Draft: write from the original message and the ideas
/// 3. Editor: polish the draft against the original message
///
/// Stages run strictly in sequence. The first failing call aborts the run
/// and nothing produced so far is returned.
#[instrument(skip_all, fields(run_id = field::Empty, context = request.has_context()))]
pub async fn run_pipeline(
    client: &GatewayClient,
    request: &PipelineRequest,
    progress: &dyn StageProgress,
) -> Result<PipelineResult> {
    let run_id = RunId::new();
    Span::current().record("run_id", field::display(&run_id));
    let start = Instant::now();

    info!(message_len = request.message().len(), "starting content pipeline");

    let enriched = prompts::enriched_prompt(request);
    if request.has_context() {
        info!(context_len = request.context().len(), "added retrieval context to prompt");
    }

    let ideas = run_stage(client, Stage::Idea, &enriched, progress).await?;

    let draft_input = prompts::draft_input(request.message(), &ideas);
    let draft = run_stage(client, Stage::Draft, &draft_input, progress).await?;

    let editor_input = prompts::editor_input(request.message(), &draft);
    let edited = run_stage(client, Stage::Editor, &editor_input, progress).await?;

    let result = PipelineResult::from_outputs(ideas, draft, edited);

    info!(
        final_len = result.final_text.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "content pipeline complete"
    );

    Ok(result)
}

async fn run_stage(
    client: &GatewayClient,
    stage: Stage,
    user_input: &str,
    progress: &dyn StageProgress,
) -> Result<String> {
    progress.stage_started(stage);
    info!(stage = stage.as_str(), "stage started");

    let output = client
        .complete(stage, prompts::system_prompt(stage), user_input)
        .await?;

    if output.is_empty() {
        warn!(stage = stage.as_str(), "stage returned no content, continuing with empty text");
    }
    info!(stage = stage.as_str(), output_len = output.len(), "stage complete");

    progress.stage_completed(stage, &output);
    Ok(output)
}
