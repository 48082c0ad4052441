//! Prompt documents for the test-generation and implementation passes.
//!
//! Everything here is pure string assembly: the same inputs in the same order
//! always produce the same prompt.

use crate::data::SourceFile;

const TEST_REQUIREMENTS: &str = "\
**Requirements:**

1. **pytest fixtures:** Use fixtures for every shared resource, object or setup/teardown step the tests need.

2. **Coverage:** Exercise different inputs, data types and execution paths, including:
    * **Positive cases:** valid inputs and their expected outputs.
    * **Negative cases:** invalid inputs and error conditions. Assert the expected exception types.
    * **Edge cases:** empty inputs, minimum/maximum values and other special values.
    * **Boundary conditions:** values at and just beyond every documented limit.
    * **Data types:** integers, floats, strings, lists, dictionaries and None where they apply.

3. **Explanations:** Give every test function a short comment describing the scenario it covers and the expected behavior.

4. **Testing practice:** Use meaningful test names, plain `assert` and `pytest.raises`, and a clear structure.

5. **Runnable code:** The test code must be complete and runnable with `pytest` as is. Include every import. Leave no placeholders.

6. **No hallucinations:** Only test behavior that the code or the feature description establishes.

7. **Behavior over internals:** Verify externally visible behavior, not implementation details.

8. **Other files:** When a test needs data or code from another file of the repository, reference and use that file.
";

const TEST_RESPONSE_FORMAT: &str = "\
**Response Format:**

Respond with ONLY the complete, runnable pytest code inside a single fenced block that opens with ```python and closes with ```. \
Do not write any text, explanation or comment outside that block.
";

const IMPLEMENTATION_GUIDELINES: &str = "\
**Implementation Guidelines:**

1. Make every test case pass.
2. Keep the code readable and follow Python best practices.
3. Comment the non-obvious parts of the implementation.
4. Stay aligned with the feature description.
5. Only modify or add what the feature needs.
6. Start from the failures shown in the test execution output.
";

const IMPLEMENTATION_RESPONSE_FORMAT: &str = "\
**Response Format:**

Return the complete content of every file you modify or create. \
Put each file in its own fenced block and write the file path, relative to the repository root, right after the language tag on the opening line. \
Close each block with a bare ``` line.
Example:
```python:path/to/file.py
# complete file content
```
";

const THOUGHT_REQUEST: &str = "\n\n** Generate the thought process for the given prompt **";

/// Which pass a prompt belongs to; decides how a thought is folded back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    TestGeneration,
    Implementation,
}

/// Serializes the files grouped by directory.
///
/// Groups appear in the order their first file was enumerated and keep the
/// file order inside each group.
pub fn render_codebase(files: &[SourceFile]) -> String {
    let mut groups: Vec<(String, Vec<&SourceFile>)> = Vec::new();
    for file in files {
        let dir = file.directory();
        match groups.iter_mut().find(|(name, _)| *name == dir) {
            Some((_, members)) => members.push(file),
            None => groups.push((dir, vec![file])),
        }
    }

    let mut context = String::new();
    for (dir, members) in groups {
        context.push_str(&format!("\nDirectory: {}\n", dir));
        for file in members {
            context.push_str(&format!(
                "\nFile: {}\n```python\n{}\n```\n",
                file.display_path(),
                file.content
            ));
        }
    }
    context
}

/// Builds the prompt asking for a pytest suite.
pub struct TestPromptBuilder<'a> {
    files: &'a [SourceFile],
    feature_description: &'a str,
}

impl<'a> TestPromptBuilder<'a> {
    pub fn new(files: &'a [SourceFile], feature_description: &'a str) -> Self {
        Self {
            files,
            feature_description,
        }
    }

    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("You are an expert Python developer specializing in test-driven development (TDD). ");
        prompt.push_str("Given the Python code below and the description of a feature, write comprehensive pytest test cases ");
        prompt.push_str("that cover positive cases, negative cases, edge cases and boundary conditions. ");
        prompt.push_str("Prioritize coverage and make the tests robust and reliable.\n\n");

        prompt.push_str(TEST_REQUIREMENTS);
        prompt.push('\n');

        prompt.push_str("**Existing Code and Files:**\n");
        prompt.push_str(&render_codebase(self.files));
        prompt.push('\n');

        prompt.push_str("**Feature Description:**\n\n");
        prompt.push_str(self.feature_description);
        prompt.push_str("\n\n");

        prompt.push_str(TEST_RESPONSE_FORMAT);

        prompt
    }
}

/// Builds the prompt asking for the feature implementation.
pub struct ImplementationPromptBuilder<'a> {
    files: &'a [SourceFile],
    feature_description: &'a str,
    test_source: &'a str,
    test_output: Option<&'a str>,
}

impl<'a> ImplementationPromptBuilder<'a> {
    pub fn new(files: &'a [SourceFile], feature_description: &'a str, test_source: &'a str) -> Self {
        Self {
            files,
            feature_description,
            test_source,
            test_output: None,
        }
    }

    /// Sets the captured output of running the tests against the current code.
    pub fn with_test_output(mut self, output: &'a str) -> Self {
        self.test_output = Some(output);
        self
    }

    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("You are an expert Python developer. Given the Python codebase and the test cases below, ");
        prompt.push_str("implement the changes needed to make the tests pass.\n\n");

        prompt.push_str("**Requirements:**\n\n");

        prompt.push_str("1. **Feature Description:**\n");
        prompt.push_str(self.feature_description);
        prompt.push_str("\n\n");

        prompt.push_str("2. **Test Cases to Satisfy:**\n");
        prompt.push_str("```python\n");
        prompt.push_str(self.test_source);
        prompt.push_str("\n```\n\n");

        if let Some(output) = self.test_output {
            prompt.push_str("3. **Test Execution Output:**\n");
            prompt.push_str("Output of running the test cases against the current code; the failures listed here need fixing:\n");
            prompt.push_str("```\n");
            prompt.push_str(output);
            prompt.push_str("\n```\n\n");
        }

        prompt.push_str(if self.test_output.is_some() {
            "4. **Existing Codebase:**\n"
        } else {
            "3. **Existing Codebase:**\n"
        });
        prompt.push_str(&render_codebase(self.files));
        prompt.push('\n');

        prompt.push_str(IMPLEMENTATION_GUIDELINES);
        prompt.push('\n');
        prompt.push_str(IMPLEMENTATION_RESPONSE_FORMAT);

        prompt
    }
}

/// Prompt for the free-form first hop of a thought chain.
pub fn thought_request(prompt: &str) -> String {
    format!("{}{}", prompt, THOUGHT_REQUEST)
}

/// Appends a first-hop thought to the original prompt for the second hop.
pub fn with_thought(prompt: &str, thought: &str, kind: PromptKind) -> String {
    let lead = match kind {
        PromptKind::TestGeneration => {
            "The following is the thought process of the Python developer. \
             Use it to generate the test cases."
        }
        PromptKind::Implementation => "Consider this analysis when implementing the feature:",
    };
    format!("{}\n\n{}\n<think>\n{}\n</think>\n", prompt, lead, thought)
}
