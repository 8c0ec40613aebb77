//! Cleaning and parsing raw model output.

use serde_json::Value;
use thiserror::Error;

/// Maximum allowed response length (100KB).
pub const MAX_RESPONSE_LENGTH: usize = 100_000;

/// Errors raised while turning model text into JSON.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelOutputError {
    #[error("Response too long: {actual} bytes exceeds maximum of {max} bytes")]
    TooLong { max: usize, actual: usize },

    #[error("Response was empty")]
    Empty,

    #[error("JSON parse error: {0}")]
    Parse(String),
}

/// Sanitizes model responses before they are parsed or shown.
#[derive(Debug, Clone, Default)]
pub struct ResponseSanitizer {
    additional_patterns: Vec<String>,
}

impl ResponseSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds additional patterns to strip from responses.
    pub fn with_additional_patterns(mut self, patterns: Vec<String>) -> Self {
        self.additional_patterns = patterns;
        self
    }

    /// Checks length, drops control characters and prompt-injection markers.
    pub fn sanitize(&self, response: &str) -> Result<String, ModelOutputError> {
        if response.len() > MAX_RESPONSE_LENGTH {
            return Err(ModelOutputError::TooLong {
                max: MAX_RESPONSE_LENGTH,
                actual: response.len(),
            });
        }

        let cleaned: String = response
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
            .collect();

        Ok(self.strip_injection_markers(&cleaned))
    }

    fn strip_injection_markers(&self, s: &str) -> String {
        let patterns = [
            "```system",
            "```assistant",
            "[INST]",
            "[/INST]",
            "<|system|>",
            "<|assistant|>",
            "<|user|>",
            "<|im_start|>",
            "<|im_end|>",
            "<<SYS>>",
            "<</SYS>>",
        ];

        let mut result = s.to_string();
        for pattern in patterns {
            result = result.replace(pattern, "");
        }
        for pattern in &self.additional_patterns {
            result = result.replace(pattern.as_str(), "");
        }
        result
    }

    /// Sanitizes a response and parses the JSON object it carries.
    ///
    /// Accepts bare JSON, JSON inside a fenced code block, or JSON preceded
    /// by a short preamble.
    pub fn parse_json(&self, response: &str) -> Result<Value, ModelOutputError> {
        let sanitized = self.sanitize(response)?;
        let trimmed = sanitized.trim();
        if trimmed.is_empty() {
            return Err(ModelOutputError::Empty);
        }

        let json = extract_from_code_block(trimmed)
            .or_else(|| extract_balanced_object(trimmed))
            .unwrap_or_else(|| trimmed.to_string());

        serde_json::from_str(&json).map_err(|e| ModelOutputError::Parse(e.to_string()))
    }
}

fn extract_from_code_block(s: &str) -> Option<String> {
    let patterns = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for pattern in patterns {
        if let Some(start) = s.find(pattern) {
            let json_start = start + pattern.len();
            if let Some(end) = s[json_start..].find("```") {
                return Some(s[json_start..json_start + end].trim().to_string());
            }
        }
    }
    None
}

fn extract_balanced_object(s: &str) -> Option<String> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(s[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
