//! Drives both pipelines through the public API: a local git origin, a mock
//! chat-completions endpoint and a canned test executor.

use git2::{Repository, Signature};
use mockito::Matcher;
use serde_json::json;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use tdforge::config::Settings;
use tdforge::contexts::{
    ImplementationOutcome, ImplementationPipeline, RepositoryLoader, TestExecutor,
    TestGenerationOutcome, TestGenerationPipeline, TestRunError,
};
use tdforge::data::{
    FeatureRequest, GENERATED_TEST_FILE, RAW_IMPLEMENTATION_OUTPUT, RAW_TEST_OUTPUT, TestReport,
};
use tdforge::providers::{ChatCompletionsClient, GitCloner};

const FAILING_RUN: &str = "\
generated_test_cases.py::test_rolling_mean FAILED
E   ImportError: cannot import name 'rolling_mean'
========== 1 failed in 0.05s ==========";

struct CannedTests {
    runs: RefCell<Vec<PathBuf>>,
}

impl TestExecutor for CannedTests {
    fn run(&self, test_file: &Path) -> Result<TestReport, TestRunError> {
        if !test_file.exists() {
            return Err(TestRunError::MissingTestFile(test_file.to_path_buf()));
        }
        self.runs.borrow_mut().push(test_file.to_path_buf());
        Ok(TestReport {
            output: FAILING_RUN.to_string(),
            exit_code: Some(1),
            summary: tdforge::contexts::parse_pytest_summary(FAILING_RUN),
        })
    }
}

fn init_origin(dir: &Path) {
    fs::create_dir_all(dir.join("forecast")).unwrap();
    fs::write(dir.join("train.py"), "from forecast.features import lag\n").unwrap();
    fs::write(dir.join("forecast/features.py"), "def lag(values, n):\n    return values[:-n]\n").unwrap();

    let repo = Repository::init(dir).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("train.py")).unwrap();
    index.add_path(Path::new("forecast/features.py")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
}

fn completion(content: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

fn settings(api_base: &str) -> Settings {
    Settings {
        api_base: api_base.to_string(),
        test_generation_thought: false,
        implementation_thought: false,
        ..Settings::default()
    }
}

#[test]
fn tests_then_implementation_share_a_working_directory() {
    let origin_root = tempfile::tempdir().unwrap();
    let origin = origin_root.path().join("sales-forecast");
    init_origin(&origin);

    let mut server = mockito::Server::new();
    let test_mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"max_tokens": 22000})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(
            "Here you go:\n```python\nfrom forecast.features import rolling_mean\n\ndef test_rolling_mean():\n    assert rolling_mean([1, 2, 3], 3) == [2.0]\n```\n",
        ))
        .create();
    let implementation_mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"max_tokens": 20000})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(
            "```python:forecast/features.py\ndef rolling_mean(values, window):\n    return [sum(values[-window:]) / window]\n```\n\n```python:pkg/../../escape.py\nboom\n```\n",
        ))
        .create();

    let base = tempfile::tempdir().unwrap();
    let request = FeatureRequest::new(
        origin.to_string_lossy(),
        "Add a rolling mean feature",
        "coder",
        "secret",
    );
    let settings = settings(&server.url());
    let client = ChatCompletionsClient::new(&settings.api_base, "secret", None).unwrap();
    let executor = CannedTests {
        runs: RefCell::new(Vec::new()),
    };

    let outcome = TestGenerationPipeline::new(
        request.clone(),
        settings.clone(),
        RepositoryLoader::new(base.path(), GitCloner, "py"),
        &client,
        &executor,
    )
    .run()
    .unwrap();

    let workdir = outcome.workdir().to_path_buf();
    assert_eq!(workdir, base.path().join("sales-forecast"));
    match &outcome {
        TestGenerationOutcome::Generated { tests, report, .. } => {
            assert_eq!(tests.path, PathBuf::from(GENERATED_TEST_FILE));
            assert!(tests.content.starts_with("from forecast.features import rolling_mean"));
            assert_eq!(report.summary.as_ref().unwrap().failed, 1);
        }
        other => panic!("Expected Generated, got {:?}", other),
    }
    assert!(workdir.join(RAW_TEST_OUTPUT).is_file());
    test_mock.assert();

    let outcome = ImplementationPipeline::new(
        request,
        settings,
        RepositoryLoader::new(base.path(), GitCloner, "py"),
        &client,
        &executor,
    )
    .with_workdir(&workdir)
    .run()
    .unwrap();

    match outcome {
        ImplementationOutcome::Implemented { artifacts, .. } => {
            let paths: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();
            assert_eq!(paths, vec![PathBuf::from("new_forecast/features.py")]);
        }
        other => panic!("Expected Implemented, got {:?}", other),
    }
    implementation_mock.assert();

    assert!(workdir.join(RAW_IMPLEMENTATION_OUTPUT).is_file());
    assert!(
        fs::read_to_string(workdir.join("new_forecast/features.py"))
            .unwrap()
            .contains("def rolling_mean")
    );
    assert_eq!(
        fs::read_to_string(workdir.join("forecast/features.py")).unwrap(),
        "def lag(values, n):\n    return values[:-n]\n"
    );
    assert!(!base.path().join("escape.py").exists());
    assert!(!workdir.join("escape.py").exists());
    assert_eq!(executor.runs.borrow().len(), 2);
}

#[test]
fn dry_run_writes_prompt_without_calling_the_model() {
    let origin_root = tempfile::tempdir().unwrap();
    let origin = origin_root.path().join("sales-forecast");
    init_origin(&origin);

    let mut server = mockito::Server::new();
    let never = server.mock("POST", "/chat/completions").expect(0).create();

    let base = tempfile::tempdir().unwrap();
    let request = FeatureRequest::new(origin.to_string_lossy(), "Add a rolling mean feature", "coder", "");
    let settings = settings(&server.url());
    let client = ChatCompletionsClient::new(&settings.api_base, "", None).unwrap();
    let executor = CannedTests {
        runs: RefCell::new(Vec::new()),
    };

    let outcome = TestGenerationPipeline::new(
        request,
        settings,
        RepositoryLoader::new(base.path(), GitCloner, "py"),
        &client,
        &executor,
    )
    .dry_run(true)
    .run()
    .unwrap();

    match outcome {
        TestGenerationOutcome::Prompted { prompt_file, .. } => {
            let prompt = fs::read_to_string(prompt_file).unwrap();
            assert!(prompt.contains("Add a rolling mean feature"));
            assert!(prompt.contains("File: forecast/features.py"));
        }
        other => panic!("Expected Prompted, got {:?}", other),
    }
    never.assert();
    assert!(executor.runs.borrow().is_empty());
}
