//! Widget Client Adapters
//!
//! - **HttpWidgetClient** - The WidgetBackend port over the backend's HTTP API

mod http_widget_client;

pub use http_widget_client::{HttpWidgetClient, WidgetClientConfig};
