//! Sanitization of user input and model output.

mod html;
mod response;

pub use html::{sanitize_json_strings, sanitize_user_text, strip_html};
pub use response::{ModelOutputError, ResponseSanitizer, MAX_RESPONSE_LENGTH};
