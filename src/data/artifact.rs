use std::path::PathBuf;

/// Extracted test code produced by the test-generation pipeline.
pub const GENERATED_TEST_FILE: &str = "generated_test_cases.py";

/// Verbatim model response of the test-generation pipeline.
pub const RAW_TEST_OUTPUT: &str = "raw_llm_output.py";

/// Verbatim model response of the implementation pipeline.
pub const RAW_IMPLEMENTATION_OUTPUT: &str = "raw_code.py";

/// Prepended to every path-annotated block so generated files never
/// overwrite the originals they were derived from.
pub const GENERATED_FILE_PREFIX: &str = "new_";

/// A file written by the materializer from one fenced block.
///
/// `path` is relative to the working directory. Once persisted the artifact
/// is never touched again; a later run simply overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub content: String,
}
