//! Authenticated client for the Layer platform API
//!
//! Every platform call goes through [`ApiClient::request`], which builds the endpoint
//! URI, attaches the standard headers and turns non-success responses into
//! [`PlatformError`](crate::error::PlatformError)s.

use crate::config::ApiConfig;
use crate::error::{Error, Result, platform_error};
use crate::types::{AppId, BearerToken};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

/// Versioned media type accepted from the platform
pub const LAYER_ACCEPT: &str = "application/vnd.layer+json; version=1.0";
/// Content type for ordinary JSON request bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type for PATCH request bodies
pub const PATCH_CONTENT_TYPE: &str = "application/vnd.layer-patch+json";

/// Optional parts of a platform request
#[derive(Debug, Default)]
pub struct RequestOptions<'a> {
    /// JSON request body
    pub body: Option<&'a serde_json::Value>,
    /// Headers added on top of (and overriding) the standard set
    pub extra_headers: Option<HeaderMap>,
    /// Query string parameters
    pub query: Option<&'a [(&'a str, &'a str)]>,
}

/// Successful platform response
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Body parsed as JSON
    Json(serde_json::Value),
    /// Body was empty or not JSON (PATCH and PUT responses are often bodiless)
    Raw {
        /// Response status
        status: StatusCode,
        /// Response text
        body: String,
    },
}

impl ApiResponse {
    /// Deserialize the JSON body into `T`
    ///
    /// A raw (non-JSON) body is an [`Error::InvalidResponse`] here: callers that use
    /// this expect data back.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            ApiResponse::Json(value) => Ok(serde_json::from_value(value)?),
            ApiResponse::Raw { status, body } => Err(Error::InvalidResponse(format!(
                "expected a JSON body, got HTTP {} with {:?}",
                status, body
            ))),
        }
    }
}

/// Thin authenticated client bound to one application
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    app_id: AppId,
    token: BearerToken,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("token", &self.token)
            .finish()
    }
}

impl ApiClient {
    /// Create a client for `app_id`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ApiConfig, app_id: AppId, token: BearerToken) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("api".to_string()),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id,
            token,
        })
    }

    /// Underlying HTTP client, shared with the signed-URL downloads
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Application this client is bound to
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Build `{base_url}/apps/{app_id}/{suffixes joined by '/'}`
    pub fn uri(&self, suffixes: &[&str]) -> String {
        format!(
            "{}/apps/{}/{}",
            self.base_url,
            self.app_id,
            suffixes.join("/")
        )
    }

    /// Standard authenticated headers for `method`
    pub fn headers(&self, method: &Method) -> Result<HeaderMap> {
        let content_type = if *method == Method::PATCH {
            PATCH_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        };

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
            .map_err(|_| Error::Config {
                message: "bearer token contains characters not allowed in a header".to_string(),
                key: Some("token".to_string()),
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(LAYER_ACCEPT));
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Ok(headers)
    }

    /// Issue a platform request and return its body
    ///
    /// On success the body is parsed as JSON; an empty or non-JSON success body comes
    /// back as [`ApiResponse::Raw`]. On a non-success status the error body is turned
    /// into a [`PlatformError`](crate::error::PlatformError).
    pub async fn request(
        &self,
        method: Method,
        suffix: &str,
        options: RequestOptions<'_>,
    ) -> Result<ApiResponse> {
        let url = self.uri(&[suffix]);
        tracing::debug!(method = %method, url = %url, "platform request");

        let mut headers = self.headers(&method)?;
        if let Some(extra) = options.extra_headers {
            headers.extend(extra);
        }

        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = options.body {
            request = request.body(serde_json::to_vec(body)?);
        }
        if let Some(query) = options.query {
            request = request.query(query);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let err = platform_error(response).await;
            tracing::debug!(url = %url, error = %err, "platform request failed");
            return Err(err);
        }

        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(ApiResponse::Json(value)),
            Err(_) => Ok(ApiResponse::Raw { status, body }),
        }
    }

    /// `GET` a platform resource
    pub async fn get(&self, suffix: &str) -> Result<ApiResponse> {
        self.request(Method::GET, suffix, RequestOptions::default()).await
    }

    /// `POST` to a platform resource
    pub async fn post(
        &self,
        suffix: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse> {
        self.request(
            Method::POST,
            suffix,
            RequestOptions {
                body,
                ..Default::default()
            },
        )
        .await
    }

    /// `PUT` a platform resource
    pub async fn put(&self, suffix: &str, body: &serde_json::Value) -> Result<ApiResponse> {
        self.request(
            Method::PUT,
            suffix,
            RequestOptions {
                body: Some(body),
                ..Default::default()
            },
        )
        .await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let config = ApiConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        ApiClient::new(&config, AppId::new("abc123"), BearerToken::new("tok")).unwrap()
    }

    #[test]
    fn uri_joins_suffixes_under_app() {
        let config = ApiConfig::default();
        let client =
            ApiClient::new(&config, AppId::new("layer:///apps/abc123"), BearerToken::new("t"))
                .unwrap();

        assert_eq!(
            client.uri(&["exports", "e1", "status"]),
            "https://api.layer.com/apps/abc123/exports/e1/status"
        );
        assert_eq!(
            client.uri(&["export_security"]),
            "https://api.layer.com/apps/abc123/export_security"
        );
    }

    #[test]
    fn trailing_slash_on_base_url_is_ignored() {
        let config = ApiConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config, AppId::new("a"), BearerToken::new("t")).unwrap();

        assert_eq!(client.uri(&["exports"]), "http://localhost:9000/apps/a/exports");
    }

    #[test]
    fn patch_uses_patch_content_type() {
        let client =
            ApiClient::new(&ApiConfig::default(), AppId::new("a"), BearerToken::new("t")).unwrap();

        let patch = client.headers(&Method::PATCH).unwrap();
        assert_eq!(patch[CONTENT_TYPE], PATCH_CONTENT_TYPE);

        let get = client.headers(&Method::GET).unwrap();
        assert_eq!(get[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(get[ACCEPT], LAYER_ACCEPT);
        assert_eq!(get[AUTHORIZATION], "Bearer t");
        assert!(get[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let client = ApiClient::new(
            &ApiConfig::default(),
            AppId::new("a"),
            BearerToken::new("bad\ntoken"),
        )
        .unwrap();

        assert!(matches!(
            client.headers(&Method::GET),
            Err(Error::Config { .. })
        ));
    }

    #[tokio::test]
    async fn request_sends_standard_headers_and_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/abc123/exports"))
            .and(header("Accept", LAYER_ACCEPT))
            .and(header("Authorization", "Bearer tok"))
            .and(header("Content-Type", JSON_CONTENT_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "e1"}])))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).get("exports").await.unwrap();

        assert_eq!(response, ApiResponse::Json(json!([{"id": "e1"}])));
    }

    #[tokio::test]
    async fn request_sends_body_query_and_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/apps/abc123/conversations/c1"))
            .and(query_param("mode", "full"))
            .and(header("Content-Type", PATCH_CONTENT_TYPE))
            .and(header("If-Match", "etag-1"))
            .and(body_json(json!([{"operation": "set", "property": "x", "value": 1}])))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let body = json!([{"operation": "set", "property": "x", "value": 1}]);
        let mut extra = HeaderMap::new();
        extra.insert("If-Match", HeaderValue::from_static("etag-1"));

        let response = client_for(&server)
            .request(
                Method::PATCH,
                "conversations/c1",
                RequestOptions {
                    body: Some(&body),
                    extra_headers: Some(extra),
                    query: Some(&[("mode", "full")]),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            response,
            ApiResponse::Raw {
                status: StatusCode::NO_CONTENT,
                body: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn extra_headers_replace_standard_ones() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apps/abc123/exports"))
            .and(header("Accept", "text/plain"))
            .and(header("Content-Type", "application/x-ndjson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut extra = HeaderMap::new();
        extra.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        extra.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"));

        let response = client_for(&server)
            .request(
                Method::GET,
                "exports",
                RequestOptions {
                    extra_headers: Some(extra),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(response, ApiResponse::Json(json!([])));
        let requests = server.received_requests().await.unwrap();
        let accept: Vec<_> = requests[0].headers.get_all("accept").iter().collect();
        assert_eq!(accept, vec!["text/plain"]);
    }

    #[tokio::test]
    async fn empty_success_body_is_raw_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/apps/abc123/export_security"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .put("export_security", &json!({"public_key": "pem"}))
            .await
            .unwrap();

        assert!(matches!(response, ApiResponse::Raw { status, .. } if status == 202));
        assert!(response.json::<serde_json::Value>().is_err());
    }

    #[tokio::test]
    async fn json_error_body_becomes_structured_platform_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apps/abc123/exports"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "m", "code": "c", "id": "i"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).post("exports", None).await.unwrap_err();

        match err {
            Error::Platform(e) => {
                assert_eq!(e.message.as_deref(), Some("m"));
                assert_eq!(e.code.as_deref(), Some("c"));
                assert_eq!(e.error_id.as_deref(), Some("i"));
                assert_eq!(e.http_code, 422);
            }
            other => panic!("expected platform error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn text_error_body_becomes_raw_platform_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apps/abc123/exports"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Unprocessable"))
            .mount(&server)
            .await;

        let err = client_for(&server).post("exports", None).await.unwrap_err();

        match err {
            Error::Platform(e) => {
                assert_eq!(e.message.as_deref(), Some("Unprocessable"));
                assert_eq!(e.http_code, 422);
                assert_eq!(e.code, None);
                assert_eq!(e.error_id, None);
            }
            other => panic!("expected platform error, got {:?}", other),
        }
    }
}
