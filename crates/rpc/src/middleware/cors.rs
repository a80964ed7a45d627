use http::HeaderValue;
use lantern_common::AllowedOrigins;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Browsers may only POST JSON to the node, and only from the configured
/// origins.
pub fn with_allowed_origins(allowed_origins: AllowedOrigins) -> CorsLayer {
    let allowed_origins = match allowed_origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(origins) => {
            AllowOrigin::list(origins.into_iter().filter_map(|origin| {
                match HeaderValue::from_str(&origin) {
                    Ok(value) => Some(value),
                    Err(error) => {
                        tracing::warn!(%origin, %error, "Ignoring invalid CORS origin");
                        None
                    }
                }
            }))
        }
    };

    CorsLayer::new()
        .allow_methods([http::Method::POST])
        .allow_origin(allowed_origins)
        .allow_headers([http::header::CONTENT_TYPE])
}
