//! Axum router configuration for the widget endpoints.

use axum::{routing::post, Router};

use super::handlers::{
    chat, customer_intention, customer_prospect, generate_custom_content, moderate_user_message,
    search_data, WidgetAppState,
};

/// Create the widget API router.
///
/// # Routes
///
/// - `POST /chat` - Streamed assistant reply (text/plain)
/// - `POST /search-data` - Merged search data snapshot
/// - `POST /customer-intention` - Merged intention snapshot
/// - `POST /moderate-user-message` - `{flagged, categories}`
/// - `POST /generate-custom-content` - GenerationResult
/// - `POST /customer-prospect` - Prospect object
///
/// Suitable for mounting at `/api`.
pub fn widget_router() -> Router<WidgetAppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/search-data", post(search_data))
        .route("/customer-intention", post(customer_intention))
        .route("/moderate-user-message", post(moderate_user_message))
        .route("/generate-custom-content", post(generate_custom_content))
        .route("/customer-prospect", post(customer_prospect))
}
