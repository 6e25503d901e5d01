//! Extra target-side context that can be attached to a translation prompt.

use serde::Deserialize;

/// Known target-language facts about the function under translation.
///
/// Every field is optional; an empty section is rendered as a single space so
/// the prompt layout never shifts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FunctionContext {
    /// Expected target signature, e.g. `fn add(a: i32, b: i32) -> i32`.
    pub signature: Option<String>,
    /// Already translated functions and type declarations the body may use.
    pub dependencies: Vec<String>,
    /// `use` lines the translation may rely on.
    pub libraries: Vec<String>,
    /// Target-language snippets shown before the translation examples.
    pub reference_snippets: Vec<String>,
}

impl FunctionContext {
    pub fn is_empty(&self) -> bool {
        self.signature.is_none()
            && self.dependencies.is_empty()
            && self.libraries.is_empty()
            && self.reference_snippets.is_empty()
    }
}
