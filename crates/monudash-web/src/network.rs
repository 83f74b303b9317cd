//! Network client for the monument API

use bevy::prelude::*;
use std::sync::{Arc, Mutex};

use monudash_core::Monument;

use crate::app::MonumentRegistry;

/// Fixed message for non-success HTTP statuses
const FETCH_FAILED_MESSAGE: &str = "Failed to fetch monuments";

/// Fallback when a thrown error carries no message of its own
const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

pub struct NetworkPlugin;

/// Resource storing the API base URL
#[derive(Resource, Clone, Default)]
pub struct ApiConfig {
    /// HTTP(S) base URL for the REST API (e.g., "http://localhost:8000")
    pub base_url: String,
}

impl ApiConfig {
    /// Create config from URL query parameters or same-origin fallback
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let window = web_sys::window().expect("no window");
        let location = window.location();

        // Check for ?api= query parameter (development against a remote backend)
        if let Ok(search) = location.search() {
            if let Some(api_param) = parse_query_param(&search, "api") {
                tracing::info!("Using API base from URL parameter: {}", api_param);
                return Self {
                    base_url: api_param,
                };
            }
        }

        // Fall back to same-origin
        let host = location.host().unwrap_or_else(|_| "localhost:8000".to_string());
        let is_https = location.protocol().unwrap_or_default() == "https:";

        Self {
            base_url: format!("{}://{}", if is_https { "https" } else { "http" }, host),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// URL of the monument list endpoint
    pub fn monuments_url(&self) -> String {
        format!("{}/api/monuments", self.base_url)
    }
}

/// Parse a query parameter from a search string
fn parse_query_param(search: &str, param: &str) -> Option<String> {
    let search = search.trim_start_matches('?');
    for pair in search.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if key == param {
                // URL decode the value
                return Some(value.replace("%3A", ":").replace("%2F", "/"));
            }
        }
    }
    None
}

/// Result of the startup fetch, handed from the async task to the ECS
#[derive(Resource, Default)]
pub struct PendingFetch(pub Arc<Mutex<Option<Result<Vec<Monument>, String>>>>);

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        // Initialize API config from browser URL
        let api_config = ApiConfig::from_browser();

        app.insert_resource(api_config)
            .init_resource::<PendingFetch>()
            .add_systems(Startup, fetch_monuments)
            .add_systems(Update, process_fetch_result);
    }
}

/// Fetch the monument list from the REST API on startup.
/// This runs exactly once per application lifetime: no retry, no polling.
fn fetch_monuments(pending: Res<PendingFetch>, api_config: Res<ApiConfig>) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let url = api_config.monuments_url();

        spawn_local(async move {
            tracing::info!("Fetching monuments from: {}", url);
            let outcome = fetch_monument_list(&url).await;
            if let Ok(mut slot) = pending_clone.lock() {
                *slot = Some(outcome);
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (pending, api_config);
        tracing::info!("Monument fetch not available in native mode");
    }
}

/// Perform the GET request and decode the body
#[cfg(target_arch = "wasm32")]
async fn fetch_monument_list(url: &str) -> Result<Vec<Monument>, String> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| error_message(e.to_string()))?;

    if !response.ok() {
        tracing::error!("Monument fetch failed: HTTP {}", response.status());
        return Err(FETCH_FAILED_MESSAGE.to_string());
    }

    let text = response
        .text()
        .await
        .map_err(|e| error_message(e.to_string()))?;

    monudash_core::monument::parse_monuments(&text).map_err(|e| error_message(e.to_string()))
}

/// Use the thrown error's message when it has one, else the generic fallback
#[allow(dead_code)]
fn error_message(message: String) -> String {
    if message.trim().is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

/// Apply the fetch outcome to the registry, settling the load phase once
fn process_fetch_result(pending: Res<PendingFetch>, mut registry: ResMut<MonumentRegistry>) {
    if registry.phase.is_settled() {
        return;
    }

    let outcome = {
        if let Ok(mut slot) = pending.0.lock() {
            slot.take()
        } else {
            None
        }
    };

    match outcome {
        Some(Ok(monuments)) => {
            tracing::info!(
                "Loaded {} monuments ({} with coordinates)",
                monuments.len(),
                monuments.iter().filter(|m| m.is_map_eligible()).count()
            );
            registry.monuments = monuments;
            registry.phase.resolve_ready();
        }
        Some(Err(message)) => {
            tracing::error!("Failed to fetch monuments: {}", message);
            registry.phase.resolve_failure(message);
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monuments_url() {
        let config = ApiConfig {
            base_url: "http://localhost:8000".to_string(),
        };
        assert_eq!(config.monuments_url(), "http://localhost:8000/api/monuments");
    }

    #[test]
    fn test_parse_query_param() {
        assert_eq!(
            parse_query_param("?api=http%3A%2F%2Flocalhost%3A8000", "api"),
            Some("http://localhost:8000".to_string())
        );
        assert_eq!(
            parse_query_param("?foo=bar&api=10.0.0.5%3A8000", "api"),
            Some("10.0.0.5:8000".to_string())
        );
        assert_eq!(parse_query_param("?foo=bar", "api"), None);
        assert_eq!(parse_query_param("", "api"), None);
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(error_message("boom".to_string()), "boom");
        assert_eq!(error_message("  ".to_string()), GENERIC_ERROR_MESSAGE);
    }
}
