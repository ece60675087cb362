//! Method + route pattern → business transaction type (§4.3 step 4).
//!
//! The static table covers the routes this workspace's reference services
//! expose; anything else falls back to `"<METHOD>-<top-level-path>"` so a
//! new route never breaks context enrichment, only loses a little
//! precision until it's added here.

use http::Method;

const TABLE: &[(&str, &str, &str)] = &[
    ("GET", "/links", "GET-links"),
    ("POST", "/links", "POST-links"),
    ("GET", "/links/:id", "GET-link"),
    ("DELETE", "/links/:id", "DELETE-link"),
    ("GET", "/:code", "GET-redirect"),
];

/// `route_pattern` is the matched route template (e.g. axum's `/links/:id`),
/// not the literal request path — callers extract it from their router
/// before calling this.
pub fn classify(method: &Method, route_pattern: &str) -> String {
    for (m, pattern, label) in TABLE {
        if method.as_str().eq_ignore_ascii_case(m) && *pattern == route_pattern {
            return (*label).to_string();
        }
    }
    let top_level = route_pattern.split('/').find(|s| !s.is_empty()).unwrap_or("root");
    format!("{}-{}", method.as_str(), top_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_route_uses_table_label() {
        assert_eq!(classify(&Method::GET, "/links"), "GET-links");
        assert_eq!(classify(&Method::POST, "/links"), "POST-links");
    }

    #[test]
    fn unknown_route_falls_back_to_method_top_level_path() {
        assert_eq!(classify(&Method::PUT, "/widgets/:id"), "PUT-widgets");
    }

    #[test]
    fn root_path_falls_back_to_root() {
        assert_eq!(classify(&Method::GET, "/"), "GET-root");
    }
}
