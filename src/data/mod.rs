mod artifact;
mod feature_request;
mod source_file;
mod test_report;

pub use artifact::{
    GENERATED_FILE_PREFIX, GENERATED_TEST_FILE, GeneratedArtifact, RAW_IMPLEMENTATION_OUTPUT,
    RAW_TEST_OUTPUT,
};
pub use feature_request::FeatureRequest;
pub use source_file::SourceFile;
pub use test_report::{TestReport, TestSummary};
