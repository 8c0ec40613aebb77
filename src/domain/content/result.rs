//! Content generation outcomes.

use serde::{Deserialize, Serialize};

use super::matching::{MatchScore, MatchThreshold};
use super::request::ContentRequest;
use crate::domain::foundation::ValidationError;
use crate::domain::sanitize::strip_html;

/// Score and threshold attached to strong-match outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub match_score: MatchScore,
    pub match_score_threshold: MatchThreshold,
}

/// Metadata reported alongside generated copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub name: String,
    /// Intention keys the copy actually draws on.
    pub customer_intention_used: Vec<String>,
    pub character_count: usize,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchMetadata>,
}

/// Metadata of a strong-match check that the item failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFailureMetadata {
    pub name: String,
    #[serde(flatten)]
    pub matching: MatchMetadata,
}

/// One of the three ways a generation request can end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "camelCase")]
pub enum GenerationResult {
    /// No match gate was requested.
    NoMatchRequired {
        content: String,
        explanation: String,
        metadata: GenerationMetadata,
    },
    /// The item passed the match gate and copy was written.
    StrongMatchSuccess {
        content: String,
        explanation: String,
        metadata: GenerationMetadata,
    },
    /// The item failed the match gate; nothing was generated.
    StrongMatchFailure { metadata: MatchFailureMetadata },
}

impl GenerationResult {
    /// Builds the failure outcome for a weak match.
    pub fn weak_match(request: &ContentRequest, matching: MatchMetadata) -> Self {
        GenerationResult::StrongMatchFailure {
            metadata: MatchFailureMetadata {
                name: request.name.clone(),
                matching,
            },
        }
    }

    /// Copy to render, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            GenerationResult::NoMatchRequired { content, .. }
            | GenerationResult::StrongMatchSuccess { content, .. } => Some(content),
            GenerationResult::StrongMatchFailure { .. } => None,
        }
    }

    pub fn matching(&self) -> Option<&MatchMetadata> {
        match self {
            GenerationResult::NoMatchRequired { metadata, .. }
            | GenerationResult::StrongMatchSuccess { metadata, .. } => metadata.matching.as_ref(),
            GenerationResult::StrongMatchFailure { metadata } => Some(&metadata.matching),
        }
    }

    pub fn scenario(&self) -> &'static str {
        match self {
            GenerationResult::NoMatchRequired { .. } => "noMatchRequired",
            GenerationResult::StrongMatchSuccess { .. } => "strongMatchSuccess",
            GenerationResult::StrongMatchFailure { .. } => "strongMatchFailure",
        }
    }
}

/// Metadata section of the model's structured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyMetadata {
    pub name: String,
    #[serde(default)]
    pub customer_intention_used: Vec<String>,
}

/// Structured output of the generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCopy {
    pub content: String,
    pub explanation: String,
    pub metadata: CopyMetadata,
}

impl GeneratedCopy {
    /// Rejects copy that is empty, outside the length bounds or carries markup.
    ///
    /// Length is counted in characters, not bytes. Copy is never truncated
    /// to fit.
    pub fn verify(&self, request: &ContentRequest) -> Result<(), ValidationError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(ValidationError::empty_field("content"));
        }
        let len = content.chars().count();
        if !request.length_fits(len) {
            return Err(ValidationError::out_of_range(
                "content",
                i64::from(request.min_characters),
                i64::from(request.max_characters),
                len as i64,
            ));
        }
        if strip_html(content) != content || content.contains("**") || content.starts_with('#') {
            return Err(ValidationError::invalid_format("content", "contains formatting"));
        }
        Ok(())
    }

    /// Converts verified copy into a result, optionally carrying match data.
    ///
    /// `customerIntentionUsed` keeps only keys present in the intention the
    /// prompt was built from.
    pub fn into_result(self, request: &ContentRequest, matching: Option<MatchMetadata>) -> GenerationResult {
        let used_source = request.generation_intention();
        let mut used: Vec<String> = Vec::new();
        for key in self.metadata.customer_intention_used {
            if used_source.is_set(&key) && !used.contains(&key) {
                used.push(key);
            }
        }

        let content = self.content.trim().to_string();
        let metadata = GenerationMetadata {
            name: request.name.clone(),
            customer_intention_used: used,
            character_count: content.chars().count(),
            matching,
        };

        match matching {
            Some(_) => GenerationResult::StrongMatchSuccess {
                content,
                explanation: self.explanation,
                metadata,
            },
            None => GenerationResult::NoMatchRequired {
                content,
                explanation: self.explanation,
                metadata,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ContentRequest {
        serde_json::from_value(json!({
            "itemInformation": { "title": "Harbour loft" },
            "customerIntention": {
                "objective": "discover",
                "budget": 200,
                "likes": ["views"],
                "priorities": ["quiet"]
            },
            "name": "loft-tag",
            "instructions": "Keep it warm",
            "minCharacters": 10,
            "maxCharacters": 20
        }))
        .unwrap()
    }

    fn copy(content: &str) -> GeneratedCopy {
        GeneratedCopy {
            content: content.to_string(),
            explanation: "views and quiet".to_string(),
            metadata: CopyMetadata {
                name: "loft-tag".to_string(),
                customer_intention_used: vec![
                    "likes".to_string(),
                    "budget".to_string(),
                    "mood".to_string(),
                    "likes".to_string(),
                ],
            },
        }
    }

    fn matching(score: f64) -> MatchMetadata {
        MatchMetadata {
            match_score: MatchScore::new(score).unwrap(),
            match_score_threshold: MatchThreshold::default(),
        }
    }

    mod verify {
        use super::*;

        #[test]
        fn accepts_copy_within_bounds() {
            assert!(copy("Calm harbour vistas").verify(&request()).is_ok());
        }

        #[test]
        fn bounds_are_inclusive() {
            assert!(copy("0123456789").verify(&request()).is_ok());
            assert!(copy("01234567890123456789").verify(&request()).is_ok());
        }

        #[test]
        fn rejects_short_and_long_copy() {
            assert!(copy("too short").verify(&request()).is_err());
            assert!(copy("this line is far too long").verify(&request()).is_err());
        }

        #[test]
        fn counts_characters_not_bytes() {
            // 10 characters, 20 bytes
            assert!(copy("éééééééééé").verify(&request()).is_ok());
        }

        #[test]
        fn rejects_markup() {
            let err = copy("<b>Calm views</b>").verify(&request()).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidFormat { .. }));
            assert!(copy("**Calm views**").verify(&request()).is_err());
        }

        #[test]
        fn rejects_blank_copy() {
            assert!(copy("   ").verify(&request()).is_err());
        }
    }

    mod into_result {
        use super::*;

        #[test]
        fn without_match_is_no_match_required() {
            let result = copy("Calm harbour vistas").into_result(&request(), None);
            match &result {
                GenerationResult::NoMatchRequired { metadata, .. } => {
                    assert_eq!(metadata.character_count, 19);
                    assert!(metadata.matching.is_none());
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn filters_intention_keys() {
            let result = copy("Calm harbour vistas").into_result(&request(), None);
            let GenerationResult::NoMatchRequired { metadata, .. } = result else {
                panic!("wrong scenario");
            };
            assert_eq!(metadata.customer_intention_used, vec!["likes".to_string()]);
        }

        #[test]
        fn with_match_is_strong_match_success() {
            let result = copy("Calm harbour vistas").into_result(&request(), Some(matching(0.8)));
            assert_eq!(result.scenario(), "strongMatchSuccess");
            assert_eq!(result.matching().unwrap().match_score.value(), 0.8);
        }
    }

    mod wire_format {
        use super::*;

        #[test]
        fn success_serializes_flat_match_metadata() {
            let result = copy("Calm harbour vistas").into_result(&request(), Some(matching(0.8)));
            let value = serde_json::to_value(&result).unwrap();
            assert_eq!(value["scenario"], "strongMatchSuccess");
            assert_eq!(value["content"], "Calm harbour vistas");
            assert_eq!(value["metadata"]["matchScore"], 0.8);
            assert_eq!(value["metadata"]["matchScoreThreshold"], 0.65);
            assert_eq!(value["metadata"]["characterCount"], 19);
        }

        #[test]
        fn failure_has_no_content() {
            let result = GenerationResult::weak_match(&request(), matching(0.4));
            let value = serde_json::to_value(&result).unwrap();
            assert_eq!(value["scenario"], "strongMatchFailure");
            assert!(value.get("content").is_none());
            assert_eq!(value["metadata"]["name"], "loft-tag");
            assert_eq!(value["metadata"]["matchScore"], 0.4);
            assert!(result.content().is_none());
        }

        #[test]
        fn no_match_required_omits_match_fields() {
            let result = copy("Calm harbour vistas").into_result(&request(), None);
            let value = serde_json::to_value(&result).unwrap();
            assert!(value["metadata"].get("matchScore").is_none());
        }

        #[test]
        fn parses_model_output() {
            let parsed: GeneratedCopy = serde_json::from_value(json!({
                "content": "Calm harbour vistas",
                "explanation": "views",
                "metadata": { "name": "loft-tag", "customerIntentionUsed": ["likes"] }
            }))
            .unwrap();
            assert_eq!(parsed.metadata.customer_intention_used, vec!["likes".to_string()]);
        }
    }
}
