mod materializer;
mod model_invoker;
mod pipeline;
mod prompt_builder;
mod repository_loader;
mod test_runner;

pub use materializer::{
    FenceGrammar, FenceScanner, FencedBlock, MaterializeError, extract_blocks,
    materialize_implementation, materialize_tests,
};
pub use model_invoker::{
    CompletionModel, CompletionRequest, InvocationPlan, ModelError, ThoughtPass, invoke,
};
pub use pipeline::{
    IMPLEMENTATION_PROMPT_FILE, ImplementationOutcome, ImplementationPipeline, PipelineError,
    TEST_PROMPT_FILE, TestGenerationOutcome, TestGenerationPipeline,
};
pub use prompt_builder::{
    ImplementationPromptBuilder, PromptKind, TestPromptBuilder, render_codebase, thought_request,
    with_thought,
};
pub use repository_loader::{LoaderError, RepositoryCloner, RepositoryLoader};
pub use test_runner::{PytestRunner, TestExecutor, TestRunError, parse_pytest_summary};
