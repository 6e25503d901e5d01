//! Pulls the code block out of free-form model output.
//!
//! Matchers are tried in table order; the first one that matches wins. Output
//! without any recognised delimiter is returned unchanged, since some models
//! reply with bare code.

use log::debug;
use regex::{Regex, RegexBuilder};

struct Matcher {
    name: String,
    pattern: Regex,
}

pub struct CodeExtractor {
    matchers: Vec<Matcher>,
}

impl CodeExtractor {
    /// Build the delimiter table for `language` (e.g. `"Rust"`).
    ///
    /// Order: markdown fence, `<lang function>`, `<lang function translation>`,
    /// `<lang translated function>`. All case-insensitive.
    pub fn for_language(language: &str) -> Result<Self, regex::Error> {
        let lang = regex::escape(&language.to_lowercase());
        let table = [
            ("fence", format!(r"```{}(.*?)```", lang)),
            ("function tag", format!(r"<{l} function>(.*?)</{l} function>", l = lang)),
            (
                "function translation tag",
                format!(r"<{l} function translation>(.*?)</{l} function translation>", l = lang),
            ),
            (
                "translated function tag",
                format!(r"<{l} translated function>(.*?)</{l} translated function>", l = lang),
            ),
        ];

        let mut matchers = Vec::with_capacity(table.len());
        for (name, pattern) in table {
            let pattern = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()?;
            matchers.push(Matcher {
                name: name.to_string(),
                pattern,
            });
        }

        Ok(Self { matchers })
    }

    pub fn rust() -> Result<Self, regex::Error> {
        Self::for_language("Rust")
    }

    /// Trimmed content of the first matching delimiter pair, if any.
    pub fn try_extract(&self, raw: &str) -> Option<String> {
        self.matchers.iter().find_map(|matcher| {
            matcher.pattern.captures(raw).and_then(|caps| {
                caps.get(1).map(|m| {
                    debug!("Extracted code using {} matcher", matcher.name);
                    m.as_str().trim().to_string()
                })
            })
        })
    }

    pub fn extract_code(&self, raw: &str) -> String {
        self.try_extract(raw).unwrap_or_else(|| raw.to_string())
    }
}
