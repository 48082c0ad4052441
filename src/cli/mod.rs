use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

mod progress;

use progress::ProgressIndicator;
use tdforge::config::{Settings, resolve_credential};
use tdforge::contexts::{
    ImplementationOutcome, ImplementationPipeline, PytestRunner, RepositoryLoader,
    TestGenerationOutcome, TestGenerationPipeline,
};
use tdforge::data::{FeatureRequest, TestReport};
use tdforge::providers::{ChatCompletionsClient, GitCloner};

#[derive(Clone)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
    pub settings_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// Everything a pipeline needs, resolved once per command.
struct Session {
    request: FeatureRequest,
    settings: Settings,
    base_dir: PathBuf,
}

impl Session {
    fn prepare(repo: &str, feature: &str, config: &Config) -> Result<Self> {
        let settings = Settings::load(config.settings_path.as_deref())?;
        let description = resolve_feature_description(feature)?;

        // A dry run never reaches the model, so it may go without a key.
        let credential = match resolve_credential(config.api_key.clone()) {
            Ok(key) => key,
            Err(_) if config.dry_run => String::new(),
            Err(e) => return Err(e.into()),
        };
        let model = config.model.clone().unwrap_or_else(|| settings.model.clone());
        let base_dir = std::env::current_dir().context("Failed to determine current directory")?;

        if config.verbose {
            println!("Repository: {}", repo);
            println!("Model:      {}", model);
            println!("Endpoint:   {}", settings.api_base);
        }

        Ok(Self {
            request: FeatureRequest::new(repo, description, model, credential),
            settings,
            base_dir,
        })
    }

    fn loader(&self) -> RepositoryLoader<GitCloner> {
        RepositoryLoader::new(&self.base_dir, GitCloner, self.settings.source_extension.clone())
    }

    fn client(&self) -> Result<ChatCompletionsClient> {
        ChatCompletionsClient::new(
            &self.settings.api_base,
            self.request.credential.clone(),
            self.settings.request_timeout(),
        )
        .context("Failed to create model client")
    }

    fn test_runner(&self) -> PytestRunner {
        PytestRunner::new(self.settings.python.clone())
    }

    fn test_pipeline(
        &self,
        config: &Config,
    ) -> Result<TestGenerationPipeline<GitCloner, ChatCompletionsClient, PytestRunner>> {
        Ok(TestGenerationPipeline::new(
            self.request.clone(),
            self.settings.clone(),
            self.loader(),
            self.client()?,
            self.test_runner(),
        )
        .dry_run(config.dry_run))
    }

    fn implementation_pipeline(
        &self,
        config: &Config,
    ) -> Result<ImplementationPipeline<GitCloner, ChatCompletionsClient, PytestRunner>> {
        Ok(ImplementationPipeline::new(
            self.request.clone(),
            self.settings.clone(),
            self.loader(),
            self.client()?,
            self.test_runner(),
        )
        .dry_run(config.dry_run))
    }
}

/// `@path` reads the description from a file; anything else is used as is.
fn resolve_feature_description(feature: &str) -> Result<String> {
    match feature.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature description from {}", path)),
        None => Ok(feature.to_string()),
    }
}

pub fn generate_tests(repo: &str, feature: &str, config: &Config) -> Result<()> {
    let session = Session::prepare(repo, feature, config)?;
    let mut progress = ProgressIndicator::new(1);

    progress.start_item("test generation");
    let result = session.test_pipeline(config)?.run();
    progress.complete_item("test generation", result.is_ok());
    progress.finish();

    report_tests(&result.context("Test generation failed")?, config);
    Ok(())
}

pub fn implement_feature(repo: &str, feature: &str, config: &Config) -> Result<()> {
    let session = Session::prepare(repo, feature, config)?;
    let mut progress = ProgressIndicator::new(1);

    progress.start_item("feature implementation");
    let result = session.implementation_pipeline(config)?.run();
    progress.complete_item("feature implementation", result.is_ok());
    progress.finish();

    report_implementation(&result.context("Feature implementation failed")?, config);
    Ok(())
}

/// Generates tests, then implements the feature in the same working directory.
pub fn run_all(repo: &str, feature: &str, config: &Config) -> Result<()> {
    let session = Session::prepare(repo, feature, config)?;
    let mut progress = ProgressIndicator::new(2);

    progress.start_item("test generation");
    let tests = session.test_pipeline(config)?.run();
    progress.complete_item("test generation", tests.is_ok());
    let tests = match tests {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.finish();
            return Err(e).context("Test generation failed");
        }
    };
    report_tests(&tests, config);

    if !matches!(tests, TestGenerationOutcome::Generated { .. }) && !config.dry_run {
        println!("Skipping feature implementation: no tests were generated");
        progress.finish();
        return Ok(());
    }
    if config.dry_run {
        println!(
            "[DRY RUN] Would implement the feature once tests exist in {}",
            tests.workdir().display()
        );
        progress.finish();
        return Ok(());
    }

    progress.start_item("feature implementation");
    let implementation = session
        .implementation_pipeline(config)?
        .with_workdir(tests.workdir())
        .run();
    progress.complete_item("feature implementation", implementation.is_ok());
    progress.finish();

    report_implementation(&implementation.context("Feature implementation failed")?, config);
    Ok(())
}

fn report_tests(outcome: &TestGenerationOutcome, config: &Config) {
    match outcome {
        TestGenerationOutcome::Skipped { workdir } => {
            println!("No source files found in {}; nothing generated", workdir.display());
        }
        TestGenerationOutcome::Prompted { prompt_file, .. } => {
            println!("[DRY RUN] Test prompt written to {}", prompt_file.display());
        }
        TestGenerationOutcome::Generated { workdir, tests, report } => {
            println!("Generated tests: {}", workdir.join(&tests.path).display());
            report_test_run(report, config);
        }
    }
}

fn report_implementation(outcome: &ImplementationOutcome, config: &Config) {
    match outcome {
        ImplementationOutcome::Skipped { workdir } => {
            println!("No source files found in {}; nothing generated", workdir.display());
        }
        ImplementationOutcome::Prompted { prompt_file, .. } => {
            println!("[DRY RUN] Implementation prompt written to {}", prompt_file.display());
        }
        ImplementationOutcome::Implemented {
            workdir,
            report,
            artifacts,
        } => {
            report_test_run(report, config);
            println!("Generated {} implementation file(s):", artifacts.len());
            for artifact in artifacts {
                println!("  {}", workdir.join(&artifact.path).display());
            }
        }
    }
}

fn report_test_run(report: &TestReport, config: &Config) {
    match &report.summary {
        Some(summary) => println!(
            "Test run: {} passed, {} failed, {} errors, {} skipped",
            summary.passed, summary.failed, summary.errors, summary.skipped
        ),
        None => println!("Test run finished without a pytest summary"),
    }
    if config.verbose {
        println!("{}", report.output);
    }
}
