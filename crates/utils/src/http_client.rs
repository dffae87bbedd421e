//! Request builder over [`reqwest`] shared by the Manta service clients.
//!
//! A [`HttpClient`] owns the connection pool, the base url and the query parameters every
//! request carries. [`RequestBuilder`] collects path segments, query parameters, headers and
//! a body, and only touches the network in [`RequestBuilder::send`].
//!
//! ```ignore
//! let client = HttpClient::builder("https://us-east.manta.joyent.com")?
//!     .timeout(Duration::from_secs(30))
//!     .build()?;
//!
//! let response = client
//!     .request()
//!     .method(Method::POST)
//!     .object_path("/account/jobs")
//!     .body(&job_spec)?
//!     .send()
//!     .await?;
//! ```

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("Invalid base url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Base url {0} cannot carry path segments")]
    CannotBeABase(String),
    #[error("Failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("Failed to serialize request body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("Request failed: {0}")]
    Send(#[from] reqwest::Error),
}

/// Shared HTTP client with a base url and per-request defaults.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    default_query: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    base_url: Url,
    default_query: Vec<(String, String)>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpClient {
    pub fn builder(base_url: &str) -> Result<HttpClientBuilder, HttpClientError> {
        let parsed = Url::parse(base_url)
            .map_err(|source| HttpClientError::InvalidUrl { url: base_url.to_string(), source })?;
        if parsed.cannot_be_a_base() {
            return Err(HttpClientError::CannotBeABase(base_url.to_string()));
        }

        Ok(HttpClientBuilder {
            base_url: parsed,
            default_query: Vec::new(),
            timeout: None,
            user_agent: None,
        })
    }

    pub fn request(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl HttpClientBuilder {
    pub fn default_query_param(mut self, key: &str, value: &str) -> Self {
        self.default_query.push((key.to_string(), value.to_string()));
        self
    }

    /// Total time allowed for a single request, connect included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build().map_err(HttpClientError::Build)?;

        Ok(HttpClient {
            client,
            base_url: self.base_url,
            default_query: self.default_query,
        })
    }
}

#[derive(Debug)]
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl<'a> RequestBuilder<'a> {
    fn new(client: &'a HttpClient) -> Self {
        Self {
            client,
            method: Method::GET,
            segments: Vec::new(),
            query: client.default_query.clone(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a single path segment. A `/` inside the segment is percent-encoded.
    pub fn path(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    /// Appends every non-empty segment of a slash separated path such as `/account/stor/dir`.
    pub fn object_path(mut self, path: &str) -> Self {
        self.segments.extend(path.split('/').filter(|segment| !segment.is_empty()).map(str::to_string));
        self
    }

    pub fn query_param(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serializes `body` as JSON and sets the matching content type.
    pub fn body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpClientError> {
        let encoded = serde_json::to_vec(body)?;
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        self.body = Some(Bytes::from(body.into()));
        self
    }

    /// Raw body; the caller sets the content type.
    pub fn bytes_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn body_len(&self) -> u64 {
        self.body.as_ref().map_or(0, |body| body.len() as u64)
    }

    pub fn url(&self) -> Url {
        let mut url = self.client.base_url.clone();
        if !self.segments.is_empty() {
            if let Ok(mut path) = url.path_segments_mut() {
                path.pop_if_empty().extend(&self.segments);
            }
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }

    pub async fn send(self) -> Result<Response, HttpClientError> {
        let url = self.url();
        let mut request = self.client.client.request(self.method, url).headers(self.headers);
        if let Some(body) = self.body {
            request = request.body(body);
        }
        Ok(request.send().await?)
    }
}

/// Reads the body of a non-success response so it can be reported. An unreadable body is
/// logged and reported as empty.
pub async fn extract_http_error_text(response: Response, operation: &str) -> (String, StatusCode) {
    let status = response.status();
    match response.text().await {
        Ok(text) => (text, status),
        Err(e) => {
            tracing::warn!(operation = operation, status = %status, error = %e, "Failed to read error response body");
            (String::new(), status)
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use reqwest::StatusCode;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("http://localhost:8080", "/acct/stor/a b", "http://localhost:8080/acct/stor/a%20b")]
    #[case("http://localhost:8080/prefix/", "acct/jobs", "http://localhost:8080/prefix/acct/jobs")]
    #[case("http://localhost:8080/prefix", "//acct//jobs/", "http://localhost:8080/prefix/acct/jobs")]
    fn object_path_is_appended_to_base(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        let client = HttpClient::builder(base).unwrap().build().unwrap();
        assert_eq!(client.request().object_path(path).url().as_str(), expected);
    }

    #[test]
    fn default_query_params_come_before_request_params() {
        let client =
            HttpClient::builder("http://localhost:8080").unwrap().default_query_param("limit", "10").build().unwrap();
        let url = client.request().path("jobs").query_param("marker", "abc").url();
        assert_eq!(url.as_str(), "http://localhost:8080/jobs?limit=10&marker=abc");
    }

    #[test]
    fn single_segment_with_slash_is_encoded() {
        let client = HttpClient::builder("http://localhost:8080").unwrap().build().unwrap();
        assert_eq!(client.request().path("a/b").url().as_str(), "http://localhost:8080/a%2Fb");
    }

    #[test]
    fn non_base_url_is_rejected() {
        assert!(matches!(HttpClient::builder("mailto:someone@example.com"), Err(HttpClientError::CannotBeABase(_))));
        assert!(matches!(HttpClient::builder("not a url"), Err(HttpClientError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn text_body_is_sent_with_content_type() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST").path("/acct/jobs/1/live/in").header("content-type", "text/plain").body("/a\n/b");
                then.status(204);
            })
            .await;

        let client = HttpClient::builder(&server.base_url()).unwrap().build().unwrap();
        let response = client
            .request()
            .method(Method::POST)
            .object_path("/acct/jobs/1/live/in")
            .text_body("/a\n/b")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        mock.assert_async().await;
    }
}
