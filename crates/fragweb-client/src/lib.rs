//! HTTP transport for the fragment refresh controller
//!
//! `HttpFetcher` implements the `FragmentFetcher` seam with reqwest. It
//! owns the base URL, the request timeout, percent-encoding of query
//! values, and the two request shapes: the navigational GET and the legacy
//! PUT carrying a JSON `{"time": ...}` body with a CSRF token header.

use std::time::Duration;

use async_trait::async_trait;
use fragweb_config::HttpConfig;
use fragweb_core::{FetchError, FragmentFetcher, RefreshMethod, RefreshRequest};
use fragweb_utils::join_query;

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher from HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::InvalidRequest {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(HttpFetcher {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL with percent-encoded query values
    fn absolute_url(&self, request: &RefreshRequest) -> String {
        let mut url = format!("{}{}{}", self.base_url, request.path, request.suffix);
        if !request.query.is_empty() {
            let encoded: Vec<(String, String)> = request
                .query
                .iter()
                .map(|(name, value)| {
                    (name.clone(), urlencoding::encode(value).into_owned())
                })
                .collect();
            url.push('?');
            url.push_str(&join_query(&encoded));
        }
        url
    }

    fn classify(error: reqwest::Error, url: &str) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl FragmentFetcher for HttpFetcher {
    async fn fetch(&self, request: &RefreshRequest) -> Result<String, FetchError> {
        let url = self.absolute_url(request);
        log::debug!("fetching {}", url);

        let sent = match &request.method {
            RefreshMethod::Get => {
                self.client
                    .get(&url)
                    .header("X-Requested-With", "XMLHttpRequest")
                    .send()
                    .await
            }
            RefreshMethod::LegacyPut { time, csrf_token } => {
                self.client
                    .put(&url)
                    .header("X-CSRFToken", csrf_token)
                    .json(&serde_json::json!({ "time": time }))
                    .send()
                    .await
            }
        };

        let response = sent.map_err(|e| Self::classify(e, &url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response.text().await.map_err(|e| Self::classify(e, &url))
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use std::collections::HashMap;

    fn fetcher_for(base_url: &str) -> HttpFetcher {
        HttpFetcher::new(&HttpConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            csrf_field: "csrfmiddlewaretoken".to_string(),
        })
        .unwrap()
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_absolute_url_encodes_query_values() {
        let fetcher = fetcher_for("http://127.0.0.1:8000/");
        let request = RefreshRequest::get("/transactions")
            .with_suffix("/ajax")
            .with_param("time", "30 days")
            .with_param("page", "2");
        assert_eq!(
            fetcher.absolute_url(&request),
            "http://127.0.0.1:8000/transactions/ajax?time=30%20days&page=2"
        );
    }

    #[tokio::test]
    async fn test_get_sends_query_and_ajax_header() {
        let app = Router::new().route(
            "/accounts/5",
            get(
                |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                    let time = params.get("time").cloned().unwrap_or_default();
                    let page = params.get("page").cloned().unwrap_or_default();
                    let ajax = headers
                        .get("x-requested-with")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    format!(r#"<div id="echo">{}|{}|{}</div>"#, time, page, ajax)
                },
            ),
        );
        let base = serve(app).await;

        let request = RefreshRequest::get("/accounts/5")
            .with_param("time", "30")
            .with_param("page", "1");
        let body = fetcher_for(&base).fetch(&request).await.unwrap();
        assert_eq!(body, r#"<div id="echo">30|1|XMLHttpRequest</div>"#);
    }

    #[tokio::test]
    async fn test_legacy_put_sends_json_body_and_csrf_header() {
        let app = Router::new().route(
            "/accounts/5",
            put(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                let token = headers
                    .get("x-csrftoken")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                format!(
                    "<tr><td>{}:{}</td></tr>",
                    body["time"].as_str().unwrap_or(""),
                    token
                )
            }),
        );
        let base = serve(app).await;

        let request = RefreshRequest {
            path: "/accounts/5".to_string(),
            suffix: String::new(),
            query: Vec::new(),
            method: RefreshMethod::LegacyPut {
                time: "30".to_string(),
                csrf_token: "tok-123".to_string(),
            },
        };
        let body = fetcher_for(&base).fetch(&request).await.unwrap();
        assert_eq!(body, "<tr><td>30:tok-123</td></tr>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let app = Router::new().route(
            "/accounts/5",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(app).await;

        let error = fetcher_for(&base)
            .fetch(&RefreshRequest::get("/accounts/5"))
            .await
            .unwrap_err();
        assert!(matches!(error, FetchError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 1 is never listening
        let error = fetcher_for("http://127.0.0.1:1")
            .fetch(&RefreshRequest::get("/accounts/5"))
            .await
            .unwrap_err();
        assert!(matches!(error, FetchError::Transport { .. }));
    }
}
