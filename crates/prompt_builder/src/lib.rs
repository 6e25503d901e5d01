//! Prompt construction for function translation and compiler-driven repair.
//!
//! Both prompts are plain string templates: the same inputs always produce
//! byte-identical text, which the repair loop relies on when it re-prompts.

pub mod formatter;
pub mod templates;
pub mod types;

pub use types::FunctionContext;

use db_services::RetrievalExample;
use log::debug;

use formatter::{format_function_details, format_reference_section, format_tagged};
use templates::{OUTPUT_INSTRUCTION, repair_preamble, translation_rules, translation_steps};

/// Translation prompt for one focal function.
pub fn build_prompt(
    source_lang: &str,
    source_code: &str,
    target_lang: &str,
    examples: &[RetrievalExample],
) -> String {
    PromptBuilder::new(source_lang, target_lang).translation_prompt(source_code, examples)
}

/// Repair prompt carrying the previous candidate and its diagnostics.
pub fn build_repair_prompt(
    source_lang: &str,
    source_code: &str,
    target_lang: &str,
    previous_response: &str,
    diagnostics: &str,
) -> String {
    PromptBuilder::new(source_lang, target_lang).repair_prompt(
        source_code,
        previous_response,
        diagnostics,
    )
}

/// Prompt builder for one language pair, optionally with target-side context.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    source_lang: String,
    target_lang: String,
    context: FunctionContext,
}

impl PromptBuilder {
    pub fn new(source_lang: &str, target_lang: &str) -> Self {
        Self {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            context: FunctionContext::default(),
        }
    }

    pub fn with_context(mut self, context: FunctionContext) -> Self {
        self.context = context;
        self
    }

    pub fn translation_prompt(&self, source_code: &str, examples: &[RetrievalExample]) -> String {
        debug!(
            "Building {}->{} translation prompt with {} examples",
            self.source_lang,
            self.target_lang,
            examples.len()
        );

        let mut prompt = String::new();
        prompt.push_str(&format!(
            "\nTranslate the focal {} function to {} \n\n",
            self.source_lang, self.target_lang
        ));
        prompt.push_str(&format_function_details(
            &self.source_lang,
            source_code,
            &self.target_lang,
            &self.context,
        ));
        prompt.push_str("\n\n");
        prompt.push_str(translation_steps());
        prompt.push_str("\n\n");
        prompt.push_str(&translation_rules(&self.target_lang));
        prompt.push_str("\n\n");
        prompt.push_str(&format_reference_section(&self.context, examples));
        prompt.push_str(&format!(
            "\n\n```{}\n{}\n```\n",
            self.target_lang, OUTPUT_INSTRUCTION
        ));
        prompt
    }

    pub fn repair_prompt(
        &self,
        source_code: &str,
        previous_response: &str,
        diagnostics: &str,
    ) -> String {
        debug!(
            "Building {}->{} repair prompt ({} bytes of diagnostics)",
            self.source_lang,
            self.target_lang,
            diagnostics.len()
        );

        [
            repair_preamble(&self.source_lang, &self.target_lang),
            format_tagged("previous response", previous_response),
            format_tagged("error message", diagnostics),
            format_tagged(&format!("{} function", self.source_lang), source_code),
            OUTPUT_INSTRUCTION.to_string(),
        ]
        .join("\n\n")
            + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn examples() -> Vec<RetrievalExample> {
        vec![
            RetrievalExample {
                source_snippet: "int inc(int x) { return x + 1; }".into(),
                translated_snippet: "fn inc(x: i32) -> i32 { x + 1 }".into(),
                score: 0.93,
            },
            RetrievalExample {
                source_snippet: "int dec(int x) { return x - 1; }".into(),
                translated_snippet: "fn dec(x: i32) -> i32 { x - 1 }".into(),
                score: 0.71,
            },
        ]
    }

    const SOURCE: &str = "printf(\"Hello world!\");";

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt("C", SOURCE, "Rust", &examples());
        let b = build_prompt("C", SOURCE, "Rust", &examples());
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_focal_function_and_rubric() {
        let prompt = build_prompt("C", SOURCE, "Rust", &[]);
        assert!(prompt.contains("Translate the focal C function to Rust"));
        assert!(prompt.contains("<focal C function>\n[source code of function]\nprintf(\"Hello world!\");\n</focal C function>"));

        let steps = [
            "1. Confirm the functionality",
            "2. Distinguish the dependencies differences",
            "3. Enumerate all used local variables",
            "4. Distinguish the syntax differences",
            "5. Translate the focal function",
        ];
        let positions: Vec<usize> = steps.iter().map(|s| prompt.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(prompt.contains("The translation process must adhere to the following rules:"));
        assert!(prompt.ends_with("```Rust\n** (only reply with the translated result of the focal function) **\n```\n"));
    }

    #[test]
    fn test_prompt_examples_in_order() {
        let prompt = build_prompt("C", SOURCE, "Rust", &examples());
        let header = prompt.find("Here are some translation example for reference.").unwrap();
        let first = prompt.find("fn inc(x: i32)").unwrap();
        let second = prompt.find("fn dec(x: i32)").unwrap();
        assert!(header < first && first < second);
        assert!(prompt.contains("[source code]\nint inc(int x) { return x + 1; }\n[translation result]\n"));
    }

    #[test]
    fn test_examples_do_not_change_rubric() {
        let without = build_prompt("C", SOURCE, "Rust", &[]);
        let with = build_prompt("C", SOURCE, "Rust", &examples());
        let rubric_end = |p: &str| p.find("Here are some rust codes for reference.").unwrap();
        assert_eq!(&without[..rubric_end(&without)], &with[..rubric_end(&with)]);
    }

    #[test]
    fn test_context_is_rendered() {
        let builder = PromptBuilder::new("C", "Rust").with_context(FunctionContext {
            signature: Some("fn main()".into()),
            reference_snippets: vec!["fn helper() {}".into()],
            ..FunctionContext::default()
        });
        let prompt = builder.translation_prompt(SOURCE, &[]);
        assert!(prompt.contains("<Rust function signature>\nfn main()\n</Rust function signature>"));
        assert!(prompt.contains("Here are some rust codes for reference.\nfn helper() {}\n"));
    }

    #[test]
    fn test_empty_context() {
        assert!(FunctionContext::default().is_empty());
        let context = FunctionContext {
            libraries: vec!["use std::io;".into()],
            ..FunctionContext::default()
        };
        assert!(!context.is_empty());
    }

    #[test]
    fn test_repair_prompt_layout() {
        let prompt = build_repair_prompt(
            "C",
            SOURCE,
            "Rust",
            "prin!(\"Hello world!\");",
            "error: cannot find macro `prin` in this scope",
        );
        assert_eq!(
            prompt,
            "You were asked to translate the given C function to Rust according to the Rust specifications. \
Some errors occurred when executing your code. Please fix them.

<previous response>
prin!(\"Hello world!\");
</previous response>

<error message>
error: cannot find macro `prin` in this scope
</error message>

<C function>
printf(\"Hello world!\");
</C function>

** (only reply with the translated result of the focal function) **
"
        );
    }

    #[test]
    fn test_repair_prompt_is_deterministic() {
        let a = build_repair_prompt("C", SOURCE, "Rust", "x", "e");
        let b = build_repair_prompt("C", SOURCE, "Rust", "x", "e");
        assert_eq!(a, b);
    }
}
