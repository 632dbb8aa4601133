//! Fixed prompt templates for the three pipeline stages.

use std::borrow::Cow;

use contentpipe_shared::{PipelineRequest, Stage};

const IDEA_SYSTEM: &str = "You are the IDEA AGENT, a creative brainstormer. Your job is to:
1. Analyze the user's request
2. Generate 3-5 creative angles or approaches
3. Identify key themes and concepts
4. Suggest a compelling direction

Output format: a structured brainstorm as a list of points. Be creative and think outside the box.
Do not use markdown formatting symbols like asterisks or hashes. Use plain text with proper spacing.";

const DRAFT_SYSTEM: &str = "You are the DRAFT AGENT, a skilled content writer. Your job is to:
1. Turn the brainstormed ideas into a complete first draft
2. Structure the content logically with clear sections
3. Write engaging, clear prose
4. Cover every key point from the ideas

Output format: a complete draft based on the ideas provided, comprehensive but readable.
Do not use markdown formatting symbols like asterisks or hashes. Use plain text with proper spacing and line breaks.";

const EDITOR_SYSTEM: &str = "You are the EDITOR AGENT, a meticulous editor and quality controller. Your job is to:
1. Review the draft for clarity, flow, and impact
2. Fix grammatical and spelling errors
3. Improve sentence structure and word choice
4. Make sure the content fully addresses the original request
5. Add finishing touches so it is ready to publish

Output format: the final polished version of the content, professional and engaging.
Do not use markdown formatting symbols like asterisks or hashes. Use plain text with proper spacing and line breaks.";

/// System instruction sent with the given stage.
pub fn system_prompt(stage: Stage) -> &'static str {
    match stage {
        Stage::Idea => IDEA_SYSTEM,
        Stage::Draft => DRAFT_SYSTEM,
        Stage::Editor => EDITOR_SYSTEM,
    }
}

/// User input for the Idea stage: the message, with any context prepended.
pub fn enriched_prompt(request: &PipelineRequest) -> Cow<'_, str> {
    if request.has_context() {
        Cow::Owned(format!(
            "Context information:\n{}\n\nUser request: {}",
            request.context(),
            request.message()
        ))
    } else {
        Cow::Borrowed(request.message())
    }
}

/// User input for the Draft stage. Uses the original message, never the enriched one.
pub fn draft_input(message: &str, ideas: &str) -> String {
    format!(
        "Original request: {message}\n\nIdeas from brainstorm:\n{ideas}\n\n\
         Please create a complete draft based on these ideas."
    )
}

/// User input for the Editor stage.
pub fn editor_input(message: &str, draft: &str) -> String {
    format!(
        "Original request: {message}\n\nDraft to edit:\n{draft}\n\n\
         Please polish and finalize this content."
    )
}
