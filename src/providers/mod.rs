//! Implementations of the pipeline seams that reach outside the process.

mod chat_completions;
mod git_clone;

pub use chat_completions::ChatCompletionsClient;
pub use git_clone::GitCloner;
