//! Prompt assembly for the three pipeline stages.
//!
//! Prompts are plain string builders over the read-only context. Variation
//! instructions cycle through fixed angles so sibling variations from the
//! same backend pull in different directions.

use crate::candidate::Candidate;
use crate::context::PipelineContext;

/// Instruction angles cycled through by variation index.
const VARIATION_ANGLES: [&str; 4] = [
    "Prioritize strict compliance with every rule while keeping the reply on-message.",
    "Prioritize natural conversational flow; the reply should read like a human typed it.",
    "Prioritize brevity; keep every sentence that earns its place and cut the rest.",
    "Prioritize warmth; make the reply personable without drifting off-topic.",
];

/// Returns the instruction angle for a variation index.
#[must_use]
pub fn variation_instruction(variation_index: usize) -> &'static str {
    VARIATION_ANGLES[variation_index % VARIATION_ANGLES.len()]
}

/// Builds the shared system prompt from the context.
#[must_use]
pub fn system_prompt(ctx: &PipelineContext) -> String {
    let mut prompt = String::new();

    if ctx.persona_name.is_empty() {
        prompt.push_str("You are a conversational assistant.");
    } else {
        prompt.push_str(&format!("You are {}.", ctx.persona_name));
    }
    if !ctx.persona_tone.is_empty() {
        prompt.push_str(&format!(" Your tone is {}.", ctx.persona_tone));
    }

    if !ctx.rules.is_empty() {
        prompt.push_str("\n\nRules you must respect, in order:\n");
        for (i, rule) in ctx.rules.iter().enumerate() {
            prompt.push_str(&format!("{}. {rule}\n", i + 1));
        }
    }

    if !ctx.knowledge_context.is_empty() {
        prompt.push_str("\nFactual grounding:\n");
        prompt.push_str(&ctx.knowledge_context);
        prompt.push('\n');
    }

    if let Some(guide) = &ctx.flow_guide {
        prompt.push_str("\nStructural guidance for this reply:\n");
        prompt.push_str(guide);
        prompt.push('\n');
    }

    prompt
}

/// Renders the recent conversation history as a transcript block.
fn history_block(ctx: &PipelineContext) -> String {
    if ctx.history.is_empty() {
        return String::new();
    }
    let mut block = String::from("Conversation so far:\n");
    for turn in &ctx.history {
        block.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    block
}

/// Builds the user prompt for one construction variation.
#[must_use]
pub fn construction_prompt(
    seed_response: &str,
    ctx: &PipelineContext,
    variation_index: usize,
) -> String {
    format!(
        "{history}\nDraft reply:\n{seed_response}\n\nRewrite the draft reply above. {angle} \
         Return only the rewritten reply, with no commentary.",
        history = history_block(ctx),
        angle = variation_instruction(variation_index),
    )
}

/// Builds the user prompt for one style refinement.
#[must_use]
pub fn style_prompt(
    candidate_text: &str,
    ctx: &PipelineContext,
    variation_index: usize,
) -> String {
    format!(
        "{history}\nCandidate reply:\n{candidate_text}\n\nPolish the candidate reply above \
         without changing its meaning. {angle} Return only the polished reply.",
        history = history_block(ctx),
        angle = variation_instruction(variation_index),
    )
}

/// Builds the selector's self-nomination prompt.
#[must_use]
pub fn selector_generation_prompt(seed_response: &str, ctx: &PipelineContext) -> String {
    format!(
        "{history}\nDraft reply:\n{seed_response}\n\nWrite the best possible version of this \
         reply. Return only the reply.",
        history = history_block(ctx),
    )
}

/// Builds the ranking prompt over a candidate pool.
///
/// The selector is asked for a small JSON record: a zero-based
/// `choice_index`, a `confidence` in [0, 1], and a short `rationale`.
#[must_use]
pub fn selector_ranking_prompt(candidates: &[Candidate], ctx: &PipelineContext) -> String {
    let mut prompt = String::from(
        "Pick the single best reply from the numbered candidates below. Judge rule \
         compliance first, then naturalness.\n\n",
    );

    if !ctx.rules.is_empty() {
        prompt.push_str("Rules:\n");
        for rule in &ctx.rules {
            prompt.push_str(&format!("- {rule}\n"));
        }
        prompt.push('\n');
    }

    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!("[{i}] {}\n\n", candidate.content));
    }

    prompt.push_str(
        "Answer with only a JSON object of the form \
         {\"choice_index\": <number>, \"confidence\": <0..1>, \"rationale\": \"<one sentence>\"}.",
    );
    prompt
}
