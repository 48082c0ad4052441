//! Turns raw model responses into files under the working directory.
//!
//! Responses are scanned line by line with a small state machine:
//!
//! ```text
//!   Outside ──open──▶ InBlock(target)
//!   InBlock ──open──▶ flush, InBlock(new target)
//!   InBlock ──close─▶ flush, Outside
//!   InBlock ──line──▶ append
//!   Outside ──close/line──▶ Outside (ignored)
//!   end of input in InBlock ──▶ flush
//! ```
//!
//! A new opening marker without a closing fence before it therefore closes the
//! block in progress, and an unterminated block at the end is still kept.
//! Inside a path-annotated block only an unindented fence closes the block.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{
    GENERATED_FILE_PREFIX, GENERATED_TEST_FILE, GeneratedArtifact, RAW_IMPLEMENTATION_OUTPUT,
    RAW_TEST_OUTPUT,
};

const FENCE: &str = "```";
const LANGUAGE_OPEN: &str = "```python";
const PATH_OPEN_PREFIX: &str = "```python:";

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which opening markers a response is expected to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceGrammar {
    /// Blocks open with exactly ```` ```python ````.
    LanguageTag,
    /// Blocks open with ```` ```python:<path> ````.
    PathAnnotated,
}

/// Content of one fenced block, marker lines excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Path from the opening marker; always `None` for [`FenceGrammar::LanguageTag`].
    pub path: Option<String>,
    pub content: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Marker<'a> {
    Open(Option<&'a str>),
    Close,
    Line,
}

#[derive(Debug)]
enum ScanState<'a> {
    OutsideBlock,
    InUnlabeledBlock(Vec<&'a str>),
    InLabeledBlock { path: &'a str, lines: Vec<&'a str> },
}

/// Incremental fence scanner; feed it lines, collect blocks as they close.
#[derive(Debug)]
pub struct FenceScanner<'a> {
    grammar: FenceGrammar,
    state: ScanState<'a>,
}

impl<'a> FenceScanner<'a> {
    pub fn new(grammar: FenceGrammar) -> Self {
        Self {
            grammar,
            state: ScanState::OutsideBlock,
        }
    }

    fn classify(&self, line: &'a str) -> Marker<'a> {
        match self.grammar {
            FenceGrammar::LanguageTag => match line.trim() {
                LANGUAGE_OPEN => Marker::Open(None),
                FENCE => Marker::Close,
                _ => Marker::Line,
            },
            FenceGrammar::PathAnnotated => {
                if let Some(path) = line.strip_prefix(PATH_OPEN_PREFIX) {
                    Marker::Open(Some(path.trim()))
                } else if line.trim_end() == FENCE {
                    // Indented fences belong to the file content, e.g. docstring examples.
                    Marker::Close
                } else {
                    Marker::Line
                }
            }
        }
    }

    /// Consumes one line; returns the block it completed, if any.
    pub fn feed(&mut self, line: &'a str) -> Option<FencedBlock> {
        match self.classify(line) {
            Marker::Open(path) => {
                let finished = self.flush();
                self.state = match path {
                    Some(path) => ScanState::InLabeledBlock {
                        path,
                        lines: Vec::new(),
                    },
                    None => ScanState::InUnlabeledBlock(Vec::new()),
                };
                finished
            }
            Marker::Close => self.flush(),
            Marker::Line => {
                match &mut self.state {
                    ScanState::OutsideBlock => {}
                    ScanState::InUnlabeledBlock(lines) | ScanState::InLabeledBlock { lines, .. } => {
                        lines.push(line)
                    }
                }
                None
            }
        }
    }

    /// Ends the input; an unterminated block is returned rather than lost.
    pub fn finish(mut self) -> Option<FencedBlock> {
        self.flush()
    }

    fn flush(&mut self) -> Option<FencedBlock> {
        match std::mem::replace(&mut self.state, ScanState::OutsideBlock) {
            ScanState::OutsideBlock => None,
            ScanState::InUnlabeledBlock(lines) => Some(FencedBlock {
                path: None,
                content: lines.join("\n"),
            }),
            ScanState::InLabeledBlock { path, lines } => Some(FencedBlock {
                path: Some(path.to_string()),
                content: lines.join("\n"),
            }),
        }
    }
}

/// Extracts every block of `grammar` from `response`, in order.
pub fn extract_blocks(response: &str, grammar: FenceGrammar) -> Vec<FencedBlock> {
    let mut scanner = FenceScanner::new(grammar);
    let mut blocks: Vec<FencedBlock> = response.lines().filter_map(|line| scanner.feed(line)).collect();
    blocks.extend(scanner.finish());
    blocks
}

/// Persists a test-generation response.
///
/// The raw response goes to `raw_llm_output.py`; the extracted blocks, joined
/// by a blank line, go to `generated_test_cases.py`. No blocks means an empty
/// test file, not an error.
pub fn materialize_tests(workdir: &Path, response: &str) -> Result<GeneratedArtifact, MaterializeError> {
    write_file(&workdir.join(RAW_TEST_OUTPUT), response)?;

    let blocks = extract_blocks(response, FenceGrammar::LanguageTag);
    if blocks.is_empty() {
        warn!("Model response contained no ```python blocks; writing an empty test file");
    }
    let content = blocks
        .into_iter()
        .map(|block| block.content)
        .collect::<Vec<_>>()
        .join("\n\n");

    let path = PathBuf::from(GENERATED_TEST_FILE);
    write_file(&workdir.join(&path), &content)?;
    info!("Wrote generated tests to {}", workdir.join(&path).display());
    Ok(GeneratedArtifact { path, content })
}

/// Persists an implementation response.
///
/// The raw response is always kept in `raw_code.py`. Each path-annotated block
/// is written to `new_<path>` as soon as the scanner closes it.
pub fn materialize_implementation(
    workdir: &Path,
    response: &str,
) -> Result<Vec<GeneratedArtifact>, MaterializeError> {
    info!("Starting to write implementation files");
    write_file(&workdir.join(RAW_IMPLEMENTATION_OUTPUT), response)?;

    let mut artifacts = Vec::new();
    let mut scanner = FenceScanner::new(FenceGrammar::PathAnnotated);
    for line in response.lines() {
        if let Some(block) = scanner.feed(line) {
            artifacts.extend(write_block(workdir, block)?);
        }
    }
    if let Some(block) = scanner.finish() {
        artifacts.extend(write_block(workdir, block)?);
    }

    if artifacts.is_empty() {
        warn!("No path-annotated blocks found; raw response kept in {}", RAW_IMPLEMENTATION_OUTPUT);
    }
    info!(
        "Completed writing implementation files. Total files written: {}",
        artifacts.len()
    );
    Ok(artifacts)
}

fn write_block(workdir: &Path, block: FencedBlock) -> Result<Option<GeneratedArtifact>, MaterializeError> {
    let Some(declared) = block.path else {
        return Ok(None);
    };
    let Some(path) = generated_path(&declared) else {
        warn!("Skipping block with unusable target path '{}'", declared);
        return Ok(None);
    };

    let target = workdir.join(&path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| MaterializeError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    write_file(&target, &block.content)?;
    debug!("Written file: {}", path.display());

    Ok(Some(GeneratedArtifact {
        path,
        content: block.content,
    }))
}

/// `new_<declared>`, or `None` when the path is empty or climbs out of the
/// working directory.
fn generated_path(declared: &str) -> Option<PathBuf> {
    if declared.is_empty() {
        return None;
    }
    let path = PathBuf::from(format!("{}{}", GENERATED_FILE_PREFIX, declared));
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes { None } else { Some(path) }
}

fn write_file(path: &Path, content: &str) -> Result<(), MaterializeError> {
    fs::write(path, content).map_err(|source| MaterializeError::Io {
        path: path.to_path_buf(),
        source,
    })
}
