//! Formatting helpers for prompt sections.
//!
//! Each function renders one section and nothing else.

use db_services::RetrievalExample;

use crate::templates::{EXAMPLES_HEADER, REFERENCE_CODE_HEADER};
use crate::types::FunctionContext;

/// Placeholder for an empty section body.
const BLANK: &str = " ";

/// `[source code]` / `[translation result]` blocks in retrieval order.
pub fn format_examples(examples: &[RetrievalExample]) -> String {
    let mut section = String::new();
    for example in examples {
        section.push_str(&format!(
            "[source code]\n{}\n[translation result]\n{}\n",
            example.source_snippet, example.translated_snippet
        ));
    }
    section
}

pub fn format_reference_snippets(snippets: &[String]) -> String {
    if snippets.is_empty() {
        return BLANK.to_string();
    }
    snippets.join("\n")
}

/// References followed by examples; the two headers are always present.
pub fn format_reference_section(
    context: &FunctionContext,
    examples: &[RetrievalExample],
) -> String {
    format!(
        "\n{}\n{}\n{}\n{}",
        REFERENCE_CODE_HEADER,
        format_reference_snippets(&context.reference_snippets),
        EXAMPLES_HEADER,
        format_examples(examples)
    )
}

/// The focal function plus the target-side details block.
pub fn format_function_details(
    source_lang: &str,
    source_code: &str,
    target_lang: &str,
    context: &FunctionContext,
) -> String {
    let signature = context.signature.as_deref().unwrap_or(BLANK);
    let dependencies = join_or_blank(&context.dependencies);
    let libraries = join_or_blank(&context.libraries);

    format!(
        "Here are the basic details about the function under translation
<focal {src} function>
[source code of function]
{code}
</focal {src} function>
<{tgt} function signature>
{signature}
</{tgt} function signature>
<{tgt} function dependencies, and data type declarations>
{dependencies}
</{tgt} function dependencies and data type declarations>
<{tgt} function dependency libraries>{libraries}
</{tgt} function dependency libraries>",
        src = source_lang,
        tgt = target_lang,
        code = source_code,
    )
}

/// Tagged block used by the repair prompt.
pub fn format_tagged(tag: &str, body: &str) -> String {
    format!("<{tag}>\n{body}\n</{tag}>")
}

fn join_or_blank(items: &[String]) -> String {
    if items.is_empty() {
        BLANK.to_string()
    } else {
        items.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(src: &str, dst: &str) -> RetrievalExample {
        RetrievalExample {
            source_snippet: src.to_string(),
            translated_snippet: dst.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_examples_keep_retrieval_order() {
        let text = format_examples(&[example("int a;", "let a: i32;"), example("int b;", "let b: i32;")]);
        assert_eq!(
            text,
            "[source code]\nint a;\n[translation result]\nlet a: i32;\n\
             [source code]\nint b;\n[translation result]\nlet b: i32;\n"
        );
    }

    #[test]
    fn test_no_examples_is_empty() {
        assert_eq!(format_examples(&[]), "");
    }

    #[test]
    fn test_details_with_blank_context() {
        let text = format_function_details("C", "int f();", "Rust", &FunctionContext::default());
        assert!(text.contains("<focal C function>\n[source code of function]\nint f();\n</focal C function>"));
        assert!(text.contains("<Rust function signature>\n \n</Rust function signature>"));
        assert!(text.contains("<Rust function dependency libraries> \n</Rust function dependency libraries>"));
    }

    #[test]
    fn test_details_with_context() {
        let context = FunctionContext {
            signature: Some("fn f() -> i32".into()),
            libraries: vec!["use std::io;".into(), "use std::fs;".into()],
            ..FunctionContext::default()
        };
        let text = format_function_details("C", "int f();", "Rust", &context);
        assert!(text.contains("<Rust function signature>\nfn f() -> i32\n"));
        assert!(text.contains("libraries>use std::io;\nuse std::fs;\n</Rust"));
    }

    #[test]
    fn test_tagged() {
        assert_eq!(format_tagged("error message", "boom"), "<error message>\nboom\n</error message>");
    }
}
