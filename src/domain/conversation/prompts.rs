//! System prompts for the chat assistant and the structured extractors.
//!
//! Each extraction prompt carries the current snapshot and today's date so
//! the model never falls back to its own idea of "now".

use serde_json::Value;

use super::profile::WidgetProfile;
use crate::domain::foundation::Timestamp;
use crate::domain::schema::SearchSchema;
use crate::domain::snapshot::Snapshot;

fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| Value::Null.to_string())
}

/// Prompt for the streamed chat reply.
pub fn chat_system_prompt(
    profile: &WidgetProfile,
    schema: &SearchSchema,
    current: &Snapshot,
    today: Timestamp,
) -> String {
    format!(
        "You are a helpful chat assistant helping a customer find something that matches their preferences. \
Hold an easy conversation to collect the data needed to run a search, and learn the customer's preferences, likes, dislikes and intentions.
This is the context of the business you are assisting: {business}.
This is the context of how users are interacting with you: {user}.
These are your instructions: {instructions}.
This is the search data you are trying to collect: {schema}.
This is the current state of the collected search data: {current}.

The current date is {date}. Use it as the reference point when talking about dates.

CHAT FLOW:
1. Greet the user briefly and politely.
2. Ask for any missing fields marked \"required\": true. If the user asks something else first, answer it, then ask for the missing fields.
3. Ask follow up questions about preferences, likes, dislikes and intentions.
4. If the user contradicts themselves about a preference, clarify which one holds.
5. If the user is vague, gently ask for more detail.

RULES:
1. Give short, concise answers.
2. Never pretend to be a human.
3. Never ask the user to use a particular data format; the data is extracted separately.
4. If a message is unrelated to the business or user context, reply with something short and witty and offer help with the relevant context.
5. Do not talk about search data or updating the search; just ask politely for what you need.",
        business = profile.business_context,
        user = profile.user_context,
        instructions = profile.instructions,
        schema = to_json(schema),
        current = to_json(current),
        date = today.long_date(),
    )
}

/// Prompt for search data extraction.
pub fn search_data_prompt(schema: &SearchSchema, current: &Snapshot, today: Timestamp) -> String {
    format!(
        "You extract search information from a conversation. Return data in the exact format of the schema:

{schema}

Current search data: {current}

Read the whole conversation, not just the last message. If the assistant suggested something and the user agreed \
(for example the assistant says \"what about Bali\" and the user says \"yes, that sounds good\"), record it.

RULES:
1. Only set a field when the user stated it explicitly or explicitly agreed to a suggestion for it.
2. Keep every current value unless the user explicitly updates it with more specific or corrective information.
3. For array fields, combine existing and new values.
4. If the user contradicts an earlier statement, replace the old value with the new one.
5. Use null for fields that are still unknown.

DATA TYPE RULES:
1. Dates: the current date is {date}. Write dates as yyyy-mm-dd. Do not set a date from a vague mention such as \"next week\"; wait for a specific date.
2. Locations: do not set a location from a vague mention such as \"near me\"; wait for a specific place.",
        schema = to_json(schema),
        current = to_json(current),
        date = today.iso_date(),
    )
}

/// Prompt for customer intention extraction.
pub fn intention_prompt(current: &Snapshot, today: Timestamp) -> String {
    format!(
        "You analyse customer intentions from a conversation: objective, budget, urgency, pain points, likes, dislikes and priorities.
Do not determine any data point without an explicit statement from the user or an explicit affirmation of an assistant suggestion.

Current intention data: {current}
The current date is {date}.

RULES:
1. Return data in the exact format of the schema. Use null for anything not yet known.
2. Keep current values unless new information explicitly updates them.
3. Never put the same concept in more than one of likes, dislikes and priorities.
4. When the user changes their mind, put the item in the field it now belongs to.
5. When the user explicitly withdraws a like, dislike or priority without replacing it, list it in \"retracted\".
6. Only report list items supported by the conversation; existing items are kept for you.",
        current = to_json(current),
        date = today.iso_date(),
    )
}

/// Prompt for customer prospect extraction.
pub fn prospect_prompt(today: Timestamp) -> String {
    format!(
        "You summarise what kind of item a customer is looking for: its type, the price range they would consider, \
the specifications they mentioned and their specific preferences.
Only use information the user stated or explicitly agreed to. Use null where nothing is known.
The current date is {date}.",
        date = today.iso_date(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::SchemaField;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn today() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap())
    }

    fn schema() -> SearchSchema {
        SearchSchema::new().with_field("location", SchemaField::string("City").required())
    }

    #[test]
    fn chat_prompt_carries_context_schema_and_long_date() {
        let profile = WidgetProfile {
            business_context: "Villa rentals".to_string(),
            user_context: "Homepage visitor".to_string(),
            instructions: "Be warm".to_string(),
        };
        let current = Snapshot::from_value(json!({ "location": "Bali" })).unwrap();
        let prompt = chat_system_prompt(&profile, &schema(), &current, today());

        assert!(prompt.contains("Villa rentals"));
        assert!(prompt.contains("Homepage visitor"));
        assert!(prompt.contains("Be warm"));
        assert!(prompt.contains("\"required\":true"));
        assert!(prompt.contains("{\"location\":\"Bali\"}"));
        assert!(prompt.contains("Monday, October 19, 2026"));
    }

    #[test]
    fn search_prompt_grounds_dates_in_iso_form() {
        let prompt = search_data_prompt(&schema(), &Snapshot::new(), today());
        assert!(prompt.contains("2026-10-19"));
        assert!(prompt.contains("Current search data: {}"));
    }

    #[test]
    fn intention_prompt_mentions_retraction_channel() {
        let prompt = intention_prompt(&Snapshot::new(), today());
        assert!(prompt.contains("\"retracted\""));
        assert!(prompt.contains("2026-10-19"));
    }

    #[test]
    fn prospect_prompt_includes_date() {
        assert!(prospect_prompt(today()).contains("2026-10-19"));
    }
}
