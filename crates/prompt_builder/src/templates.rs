//! Fixed prompt text. Changing anything here changes every prompt byte-for-byte.

/// Output instruction that closes both the translation and repair prompts.
pub const OUTPUT_INSTRUCTION: &str =
    "** (only reply with the translated result of the focal function) **";

pub const REFERENCE_CODE_HEADER: &str = "Here are some rust codes for reference.";

pub const EXAMPLES_HEADER: &str = "Here are some translation example for reference.";

/// The five translation steps.
pub fn translation_steps() -> &'static str {
    "Please translate the function following the given steps
1. Confirm the functionality to be implemented by the current function
2. Distinguish the dependencies differences between the source and target programming languages
2.1 The focal function may have differences in dependencies between the source language and the programming language. For example:
    - Variable Differences: For example, variable names may differ, or the structure of the data types corresponding to the variables may vary.
    - Function Differences: For instance, function names might be different, or a function that exists in the source language might not be available in the target language.
    - Data Type Differences: There may be differences in custom data types between the source language and the target language.
2.2 Enumerate all used dependencies including function, data type and variable within this function in target programming languages(if any)
3. Enumerate all used local variables and their mut status and data types in previous translated code snippets(if any)
4. Distinguish the syntax differences between the source and target programming languages(if any). For example:
    - In C, Java, and Python, variables declared are mutable by default, while in Rust, variables are immutable by default. To make a variable mutable in Rust, the `mut` keyword must be explicitly used.
    - In C and Java, null pointer checks are performed at runtime for variables, whereas in Rust, such checks are not required for variables that are not of the `Option` type.
    - Memory safety checks required in C are not required in Rust.
    - Data type checking required in Python is not required in Rust.
5. Translate the focal function based on the functionality implemented by the function, the dependencies used, the translated code snippets and the syntax differences. "
}

pub fn translation_rules(target_lang: &str) -> String {
    format!(
        "The translation process must adhere to the following rules:
    - Do not perform a simple one-to-one translation; instead, consider the functional consistency of the code. The translated result only needs to achieve the same functionality as the original language's function.
    - ** Ensure that the local variables used genuinely exist in the <translated code snippets>, the dependencies used are actually present in the provided <{target_lang} function dependencies, and data type declarations>, and the syntax used is valid in the target language. **
    - For an `if` code block, if the condition being checked is unnecessary in Rust according to the syntax differences, the `if` block can be omitted entirely, and the translated result should be an empty line. Examples include null pointer checks in C and Java, type checks in Python, or memory safety checks for structs in C."
    )
}

/// Opening paragraph of the repair prompt.
pub fn repair_preamble(source_lang: &str, target_lang: &str) -> String {
    format!(
        "You were asked to translate the given {source_lang} function to {target_lang} according to the \
{target_lang} specifications. Some errors occurred when executing your code. Please fix them."
    )
}
