//! Sends prompts to a completion model, optionally as a thought-then-answer chain.

use thiserror::Error;
use tracing::{debug, error, info};

use super::prompt_builder::{PromptKind, thought_request, with_thought};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse model response: {0}")]
    MalformedResponse(String),

    #[error("model response contained no completion")]
    EmptyCompletion,
}

/// One completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    /// Generation stops before any of these sequences; empty means none.
    pub stop: Vec<String>,
}

/// An external text completion capability.
///
/// Calls block until the provider answers; there is no retry at this level.
pub trait CompletionModel {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError>;
}

impl<M: CompletionModel + ?Sized> CompletionModel for &M {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        (**self).complete(request)
    }
}

impl<M: CompletionModel + ?Sized> CompletionModel for Box<M> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        (**self).complete(request)
    }
}

/// Parameters of the free-form first hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtPass {
    pub model: String,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

/// How one pipeline talks to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPlan {
    pub model: String,
    pub max_tokens: u32,
    /// When set, a thought is requested first and folded into the final prompt.
    pub thought: Option<ThoughtPass>,
}

/// Runs `plan` for `prompt` and returns the final completion text.
pub fn invoke<M: CompletionModel + ?Sized>(
    client: &M,
    prompt: &str,
    kind: PromptKind,
    plan: &InvocationPlan,
) -> Result<String, ModelError> {
    let final_prompt = match &plan.thought {
        Some(pass) => {
            info!("Generating thought process with {}", pass.model);
            let thought = request(
                client,
                CompletionRequest {
                    model: pass.model.clone(),
                    prompt: thought_request(prompt),
                    max_tokens: pass.max_tokens,
                    stop: pass.stop.clone(),
                },
            )?;
            debug!("Thought process:\n{}", thought);
            with_thought(prompt, &thought, kind)
        }
        None => prompt.to_string(),
    };

    info!("Generating {:?} output with {}", kind, plan.model);
    let answer = request(
        client,
        CompletionRequest {
            model: plan.model.clone(),
            prompt: final_prompt,
            max_tokens: plan.max_tokens,
            stop: Vec::new(),
        },
    )?;
    info!("Model generation completed ({} characters)", answer.len());
    Ok(answer)
}

fn request<M: CompletionModel + ?Sized>(
    client: &M,
    request: CompletionRequest,
) -> Result<String, ModelError> {
    debug!(
        "Requesting completion: model={} max_tokens={} prompt_chars={}",
        request.model,
        request.max_tokens,
        request.prompt.len()
    );
    client.complete(&request).map_err(|e| {
        error!("Error generating completion: {}", e);
        e
    })
}
