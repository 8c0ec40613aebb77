//! Prompts and output schemas for match scoring and copy generation.

use serde_json::{json, Value};

use super::request::ContentRequest;

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| Value::Null.to_string())
}

/// Name of the structured output the match scorer asks for.
pub const MATCH_ANALYSIS_FORMAT: &str = "matchAnalysis";

/// Name of the structured output the generator asks for.
pub const PERSONALIZED_CONTENT_FORMAT: &str = "personalizedContent";

pub const MATCH_SYSTEM_PROMPT: &str = "You are an expert in match analysis and product recommendations.

You receive a customer profile (preferences, likes and dislikes) and item details (title, description, characteristics).

RULES:
1. The score is a number between 0 and 1 with 4 decimal places, for example 0.1243 or 0.7685.
2. Use a linear scale: 0 is no match at all, 0.5 is neutral, 1 is a perfect match.
3. Weigh all customer preferences.
4. Explicit dislikes that conflict with the item lower the score; missing information only moves it toward neutral.
5. Score purely on how well the item fits the customer's preferences, and score identical input identically.";

/// User message for the match scorer.
pub fn match_user_prompt(request: &ContentRequest) -> String {
    format!(
        "## Customer preferences:
{intention}

## Item details:
{item}

Analyse the match between these preferences and this item and return a score between 0 and 1 with 4 decimal places.",
        intention = pretty(&request.customer_intention),
        item = pretty(&request.item_information),
    )
}

/// Strict output schema for `{score, explanation}`.
pub fn match_output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "score": {
                "type": "number",
                "description": "Match score from 0 to 1 with 4 decimal places"
            },
            "explanation": {
                "type": "string",
                "description": "Which customer attributes guided the score, in at most 10 words"
            }
        },
        "required": ["score", "explanation"],
        "additionalProperties": false
    })
}

/// System prompt for copy generation.
pub fn generation_system_prompt(request: &ContentRequest) -> String {
    let examples = if request.text_examples.is_empty() {
        String::new()
    } else {
        let listed: Vec<String> = request
            .text_examples
            .iter()
            .enumerate()
            .map(|(i, example)| format!("{}. \"{}\"", i + 1, example))
            .collect();
        format!("\n- Style examples:\n{}", listed.join("\n"))
    };

    format!(
        "You write personalized copy for one item on an online store or platform, showing how the item's features meet the customer's preferences.
Many pieces of copy are written for different items, so vary the connections you draw and avoid repeating phrases.

Content parameters:
- Name: {name}
- Target length: {min}-{max} characters
- Tone: {tone}
- Instruction: {instructions}{examples}

RULES:
1. Stay strictly within {min}-{max} characters.
2. Never invent features; use only the item information provided.
3. Lead with the characteristics that match the customer's preferences.
4. Plain text only. No markdown, HTML or other formatting.
5. Follow the instruction's tone and style.
6. Never copy the examples; use them as a guide.
7. Do not reuse the customer's own words for their preferences; use synonyms instead.
8. In metadata, list only customer intention keys whose values you actually used.",
        name = request.name,
        min = request.min_characters,
        max = request.max_characters,
        tone = request.tone.as_str(),
        instructions = request.instructions,
        examples = examples,
    )
}

/// User message for copy generation. Objective and budget are left out.
pub fn generation_user_prompt(request: &ContentRequest) -> String {
    format!(
        "## Item details:
{item}

## Customer profile:
{intention}

## Task:
Follow these instructions for style, tone, theme and goal. Ignore any notes about length or formatting:
{instructions}

The copy must be between {min} and {max} characters, plain text only.",
        item = pretty(&request.item_information),
        intention = pretty(&request.generation_intention()),
        instructions = request.instructions,
        min = request.min_characters,
        max = request.max_characters,
    )
}

/// Strict output schema for the generated copy.
pub fn generation_output_schema(request: &ContentRequest) -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {
                "type": "string",
                "description": format!(
                    "Generated copy between {} and {} characters long",
                    request.min_characters, request.max_characters
                )
            },
            "explanation": {
                "type": "string",
                "description": "Which customer attributes guided the copy, in at most 10 words"
            },
            "metadata": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": request.name },
                    "customerIntentionUsed": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Customer intention keys whose information was used"
                    }
                },
                "required": ["name", "customerIntentionUsed"],
                "additionalProperties": false
            }
        },
        "required": ["content", "explanation", "metadata"],
        "additionalProperties": false
    })
}
