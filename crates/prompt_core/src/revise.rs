//! ReviseProtocol - turning a critique into the next prompt version.
//!
//! A pure text transformation: build the instruction block sent to the
//! aligning model, and interpret its raw output as the new prompt. The
//! model is trusted to honor the "no extra text" rule; the only policy
//! applied here is whitespace trimming, isolated behind
//! [`interpret_response`] so a stricter validator could replace it
//! without touching tree logic.

use thiserror::Error;

/// Sampling temperature for responses to prompts under evaluation.
pub const RESPONSE_TEMPERATURE: f32 = 0.5;

/// Sampling temperature for prompt rewrites. Lower than
/// [`RESPONSE_TEMPERATURE`]: rewriting should stay close to the inputs.
pub const REVISION_TEMPERATURE: f32 = 0.2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReviseError {
    #[error("aligning model returned an empty revision")]
    EmptyRevision,
}

/// Build the fixed instruction block for the aligning model.
///
/// All three inputs appear verbatim in delimited sections; the rules
/// section forbids any output beyond the rewritten prompt.
pub fn build_revision_request(
    initial_prompt: &str,
    initial_response: &str,
    critique: &str,
) -> String {
    format!(
        r#"# Task: Optimize Prompt

## Background
I have an initial prompt that produced a response I am not fully satisfied with. I am providing a critique of that response; rewrite and optimize the initial prompt based on the critique.

## Rules
- The new prompt should steer the model toward a response that better satisfies the critique.
- Return only the optimized prompt, with no additional explanation or text.

## Input

### Initial Prompt:
{initial_prompt}

### Response Generated by the Initial Prompt:
{initial_response}

### Critique of the Response:
{critique}

## Output

### Optimized Prompt:
"#
    )
}

/// Interpret the aligning model's raw output as the next prompt version.
///
/// Trims surrounding whitespace and accepts the rest verbatim; no other
/// parsing or validation.
pub fn interpret_response(raw_text: &str) -> Result<String, ReviseError> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return Err(ReviseError::EmptyRevision);
    }
    Ok(trimmed.to_string())
}
