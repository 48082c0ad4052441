//! The two pipelines: generate tests, then implement the feature against them.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use super::materializer::{MaterializeError, materialize_implementation, materialize_tests};
use super::model_invoker::{CompletionModel, InvocationPlan, ModelError, ThoughtPass, invoke};
use super::prompt_builder::{ImplementationPromptBuilder, PromptKind, TestPromptBuilder};
use super::repository_loader::{LoaderError, RepositoryCloner, RepositoryLoader};
use super::test_runner::{TestExecutor, TestRunError};
use crate::config::Settings;
use crate::data::{FeatureRequest, GENERATED_TEST_FILE, GeneratedArtifact, TestReport};

/// Prompt written instead of calling the model on a dry run.
pub const TEST_PROMPT_FILE: &str = "tdforge_test_prompt.txt";
pub const IMPLEMENTATION_PROMPT_FILE: &str = "tdforge_implementation_prompt.txt";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    TestRun(#[from] TestRunError),

    #[error("Test file not found at {0}")]
    MissingTestFile(PathBuf),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub enum TestGenerationOutcome {
    /// The working copy had no source files; the model was not called.
    Skipped { workdir: PathBuf },
    /// Dry run: the prompt was written to `prompt_file`.
    Prompted { workdir: PathBuf, prompt_file: PathBuf },
    Generated {
        workdir: PathBuf,
        tests: GeneratedArtifact,
        report: TestReport,
    },
}

impl TestGenerationOutcome {
    pub fn workdir(&self) -> &Path {
        match self {
            Self::Skipped { workdir } | Self::Prompted { workdir, .. } | Self::Generated { workdir, .. } => {
                workdir
            }
        }
    }
}

#[derive(Debug)]
pub enum ImplementationOutcome {
    Skipped { workdir: PathBuf },
    Prompted { workdir: PathBuf, prompt_file: PathBuf },
    Implemented {
        workdir: PathBuf,
        /// Test run that fed the prompt.
        report: TestReport,
        artifacts: Vec<GeneratedArtifact>,
    },
}

impl ImplementationOutcome {
    pub fn workdir(&self) -> &Path {
        match self {
            Self::Skipped { workdir } | Self::Prompted { workdir, .. } | Self::Implemented { workdir, .. } => {
                workdir
            }
        }
    }
}

fn plan(settings: &Settings, model: &str, max_tokens: u32, thought: bool) -> InvocationPlan {
    InvocationPlan {
        model: model.to_string(),
        max_tokens,
        thought: thought.then(|| ThoughtPass {
            model: settings.thought_model_or(model).to_string(),
            max_tokens: settings.thought_max_tokens,
            stop: settings.thought_stop.clone(),
        }),
    }
}

fn write_prompt(workdir: &Path, name: &str, prompt: &str) -> Result<PathBuf, PipelineError> {
    let path = workdir.join(name);
    fs::write(&path, prompt).map_err(|source| PipelineError::Io {
        path: path.clone(),
        source,
    })?;
    info!("Dry run: prompt ({} characters) written to {}", prompt.len(), path.display());
    Ok(path)
}

/// Clone → analyze → prompt → model → materialize → run tests.
pub struct TestGenerationPipeline<C, M, T>
where
    C: RepositoryCloner,
    M: CompletionModel,
    T: TestExecutor,
{
    request: FeatureRequest,
    settings: Settings,
    loader: RepositoryLoader<C>,
    model: M,
    tests: T,
    dry_run: bool,
    /// Set once the repository has been cloned.
    workdir: Option<PathBuf>,
}

impl<C, M, T> TestGenerationPipeline<C, M, T>
where
    C: RepositoryCloner,
    M: CompletionModel,
    T: TestExecutor,
{
    pub fn new(
        request: FeatureRequest,
        settings: Settings,
        loader: RepositoryLoader<C>,
        model: M,
        tests: T,
    ) -> Self {
        Self {
            request,
            settings,
            loader,
            model,
            tests,
            dry_run: false,
            workdir: None,
        }
    }

    /// Stop after writing the prompt; neither the model nor the tests run.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Working directory of the last run, if it got that far.
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    pub fn run(&mut self) -> Result<TestGenerationOutcome, PipelineError> {
        let result = self.execute();
        if let Err(e) = &result {
            error!("Error in test generation process: {}", e);
        }
        if let Some(workdir) = &self.workdir {
            info!("Generated tests can be found in {}", workdir.display());
        }
        result
    }

    fn execute(&mut self) -> Result<TestGenerationOutcome, PipelineError> {
        let workdir = self.loader.clone_repository(&self.request)?;
        self.workdir = Some(workdir.clone());

        let files = self.loader.enumerate(&workdir)?;
        if files.is_empty() {
            warn!("No files found for analysis");
            return Ok(TestGenerationOutcome::Skipped { workdir });
        }

        let prompt = TestPromptBuilder::new(&files, &self.request.description).build();
        if self.dry_run {
            let prompt_file = write_prompt(&workdir, TEST_PROMPT_FILE, &prompt)?;
            return Ok(TestGenerationOutcome::Prompted { workdir, prompt_file });
        }

        let plan = plan(
            &self.settings,
            &self.request.model,
            self.settings.test_max_tokens,
            self.settings.test_generation_thought,
        );
        let response = invoke(&self.model, &prompt, PromptKind::TestGeneration, &plan)?;
        let tests = materialize_tests(&workdir, &response)?;

        info!("Running tests from {}", workdir.join(&tests.path).display());
        let report = self.tests.run(&workdir.join(&tests.path))?;

        Ok(TestGenerationOutcome::Generated {
            workdir,
            tests,
            report,
        })
    }
}

/// Reuse → read tests → analyze → run tests → prompt → model → materialize.
pub struct ImplementationPipeline<C, M, T>
where
    C: RepositoryCloner,
    M: CompletionModel,
    T: TestExecutor,
{
    request: FeatureRequest,
    settings: Settings,
    loader: RepositoryLoader<C>,
    model: M,
    tests: T,
    dry_run: bool,
    workdir: Option<PathBuf>,
}

impl<C, M, T> ImplementationPipeline<C, M, T>
where
    C: RepositoryCloner,
    M: CompletionModel,
    T: TestExecutor,
{
    pub fn new(
        request: FeatureRequest,
        settings: Settings,
        loader: RepositoryLoader<C>,
        model: M,
        tests: T,
    ) -> Self {
        Self {
            request,
            settings,
            loader,
            model,
            tests,
            dry_run: false,
            workdir: None,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use `workdir` instead of resolving it from the repository location,
    /// e.g. the timestamp-suffixed directory a preceding test run created.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    pub fn run(&mut self) -> Result<ImplementationOutcome, PipelineError> {
        let result = self.execute();
        match &result {
            Ok(ImplementationOutcome::Implemented {
                workdir, artifacts, ..
            }) => info!(
                "Implementation completed. {} file(s) updated in {}",
                artifacts.len(),
                workdir.display()
            ),
            Ok(_) => {}
            Err(e) => error!("Error in feature implementation process: {}", e),
        }
        result
    }

    fn execute(&mut self) -> Result<ImplementationOutcome, PipelineError> {
        let workdir = match &self.workdir {
            Some(workdir) if workdir.is_dir() => workdir.clone(),
            Some(workdir) => return Err(LoaderError::DirectoryNotFound(workdir.clone()).into()),
            None => self.loader.reuse_repository(&self.request)?,
        };
        self.workdir = Some(workdir.clone());

        let test_file = workdir.join(GENERATED_TEST_FILE);
        let test_source = read_test_cases(&test_file)?;

        let files = self.loader.enumerate(&workdir)?;
        if files.is_empty() {
            warn!("No files found for analysis");
            return Ok(ImplementationOutcome::Skipped { workdir });
        }

        if self.dry_run {
            let prompt =
                ImplementationPromptBuilder::new(&files, &self.request.description, &test_source).build();
            let prompt_file = write_prompt(&workdir, IMPLEMENTATION_PROMPT_FILE, &prompt)?;
            return Ok(ImplementationOutcome::Prompted { workdir, prompt_file });
        }

        let report = self.tests.run(&test_file)?;
        let prompt = ImplementationPromptBuilder::new(&files, &self.request.description, &test_source)
            .with_test_output(&report.output)
            .build();
        info!("Prompt construction completed ({} characters)", prompt.len());

        let plan = plan(
            &self.settings,
            &self.request.model,
            self.settings.implementation_max_tokens,
            self.settings.implementation_thought,
        );
        let response = invoke(&self.model, &prompt, PromptKind::Implementation, &plan)?;
        let artifacts = materialize_implementation(&workdir, &response)?;

        Ok(ImplementationOutcome::Implemented {
            workdir,
            report,
            artifacts,
        })
    }
}

fn read_test_cases(path: &Path) -> Result<String, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingTestFile(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
