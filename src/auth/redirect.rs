//! Helpers for the `redirect_url` that sends a user back to where they were after logging in.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Only local paths are followed, and never back to the log-in page itself.
fn is_safe_redirect_url(redirect_url: &str) -> bool {
    if !redirect_url.starts_with('/') || redirect_url.starts_with("//") {
        return false;
    }

    let path = redirect_url
        .split_once('?')
        .map_or(redirect_url, |(path, _)| path);

    path != endpoints::LOG_IN_VIEW && !path.starts_with("/api")
}

/// Reduce `raw_url` to a local path and query, or `None` if it points elsewhere.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    local_path_and_query(&uri)
}

fn local_path_and_query(uri: &Uri) -> Option<String> {
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// Build the URL of the log-in page that returns the user to the page they requested.
///
/// Page requests return to their own URL. HTMX requests to `/api` routes return
/// to the page that sent them, taken from the `HX-Current-URL` header.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let redirect_target = if request.uri().path().starts_with("/api") {
        redirect_target_from_hx_request(request)?
    } else {
        local_path_and_query(request.uri())?
    };

    build_log_in_redirect_url_from_target(&redirect_target)
}

pub fn build_log_in_redirect_url_from_target(redirect_target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", redirect_target)]) {
        Ok(param) => Some(format!("{}?{}", endpoints::LOG_IN_VIEW, param)),
        Err(error) => {
            tracing::error!("Could not encode redirect URL {redirect_target}: {error}");
            None
        }
    }
}

fn redirect_target_from_hx_request(request: &Request) -> Option<String> {
    let headers = request.headers();
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("Missing HX-Request header for /api request.");
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        tracing::warn!("Missing HX-Current-URL header for /api request.");
        return None;
    };

    // HTMX sends the absolute URL of the current page, so the host is ignored here.
    let redirect_url = current_url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| local_path_and_query(&uri));
    if redirect_url.is_none() {
        tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    redirect_url
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, extract::Request};

    use crate::endpoints;

    use super::{build_log_in_redirect_url, normalize_redirect_url};

    #[test]
    fn keeps_local_paths_with_query() {
        assert_eq!(
            normalize_redirect_url("/transactions?range=7days"),
            Some("/transactions?range=7days".to_owned())
        );
    }

    #[test]
    fn rejects_external_and_looping_urls() {
        for url in [
            "https://evil.example.com/dashboard",
            "//evil.example.com",
            "dashboard",
            endpoints::LOG_IN_VIEW,
            "/api/schedule/1/pay",
        ] {
            assert_eq!(normalize_redirect_url(url), None, "want {url} rejected");
        }
    }

    #[test]
    fn api_request_uses_current_page() {
        let request = Request::builder()
            .uri("/api/schedule/1/pay")
            .header("HX-Request", "true")
            .header("HX-Current-URL", "http://localhost:3000/schedule")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            build_log_in_redirect_url(&request),
            Some(format!("{}?redirect_url=%2Fschedule", endpoints::LOG_IN_VIEW))
        );
    }

    #[test]
    fn api_request_without_htmx_has_no_target() {
        let request = Request::builder()
            .uri("/api/schedule/1/pay")
            .body(Body::empty())
            .unwrap();

        assert_eq!(build_log_in_redirect_url(&request), None);
    }
}
