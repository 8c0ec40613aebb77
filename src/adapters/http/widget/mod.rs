//! Widget HTTP adapter - the backend API the embedded widget calls.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{WidgetApiError, WidgetAppState};
pub use routes::widget_router;
