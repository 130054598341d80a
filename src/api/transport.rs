use crate::api::{ApiRequest, Backend, RawResponse, TokenCell};
use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Issues requests with the session credential attached and turns every response into either a
/// JSON payload or an `ApiError`. It never panics on a bad response.
#[derive(Clone)]
pub struct Transport {
    backend: Arc<dyn Backend>,
    token: TokenCell,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("has_token", &self.token.is_present())
            .finish()
    }
}

impl Transport {
    pub fn new(backend: Arc<dyn Backend>, token: TokenCell) -> Self {
        Self { backend, token }
    }

    pub fn token(&self) -> &TokenCell {
        &self.token
    }

    /// Sends a request and returns the parsed payload. An empty success body is `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.request_with_headers(method, path, body, HeaderMap::new())
            .await
    }

    /// Like `request`, with caller-supplied headers. A caller-supplied `Authorization` or
    /// `Content-Type` header is left as it is.
    pub async fn request_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<Value, ApiError> {
        let request = self.prepare(method, path, body, headers)?;
        debug!("{} {}", request.method, request.path);
        let response = self.backend.exchange(request).await?;
        trace!("status {} with {} bytes", response.status, response.text.len());
        decode_response(response)
    }

    /// Builds the `ApiRequest`: reads the credential as it is right now, serializes the body and
    /// fills in the default headers.
    pub fn prepare(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        mut headers: HeaderMap,
    ) -> Result<ApiRequest, ApiError> {
        let serialized = match body {
            Some(value) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                }
                Some(serde_json::to_string(value).map_err(|e| {
                    ApiError::Malformed(format!("unable to serialize the request body: {e}"))
                })?)
            }
            None => None,
        };

        if let Some(token) = self.token.get() {
            if !headers.contains_key(AUTHORIZATION) {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    ApiError::Network("the stored credential is not a valid header value".into())
                })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(ApiRequest {
            method,
            path: path.to_string(),
            headers,
            body: serialized,
        })
    }
}

/// Parses a response body: empty text is `Null`, JSON is parsed, anything else is kept as a JSON
/// string so that an HTML error page still reaches the caller.
pub fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Turns a raw response into the payload, or into an `ApiError::Status` for non-success statuses.
pub fn decode_response(response: RawResponse) -> Result<Value, ApiError> {
    let payload = decode_body(&response.text);
    if response.is_success() {
        Ok(payload)
    } else {
        Err(ApiError::from_status(response.status, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, FALLBACK_MESSAGE};
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every request with the same response and remembers the last request.
    struct Canned {
        response: std::result::Result<RawResponse, ApiError>,
        last: Mutex<Option<ApiRequest>>,
    }

    impl Canned {
        fn new(response: std::result::Result<RawResponse, ApiError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                last: Mutex::new(None),
            })
        }
    }

    #[async_trait::async_trait]
    impl Backend for Canned {
        async fn exchange(&self, request: ApiRequest) -> std::result::Result<RawResponse, ApiError> {
            *self.last.lock().unwrap() = Some(request);
            self.response.clone()
        }
    }

    fn transport(token: Option<&str>) -> Transport {
        let cell = TokenCell::new();
        cell.set(token.map(String::from));
        Transport::new(Canned::new(Ok(RawResponse::new(200, ""))), cell)
    }

    #[test]
    fn test_bearer_attached() {
        let t = transport(Some("tok"));
        let req = t.prepare(Method::GET, "/expenses", None, HeaderMap::new()).unwrap();
        assert_eq!(req.headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert!(req.headers.get(CONTENT_TYPE).is_none());
        assert!(req.body.is_none());
    }

    #[test]
    fn test_no_token_no_header() {
        let t = transport(None);
        let req = t.prepare(Method::GET, "/expenses", None, HeaderMap::new()).unwrap();
        assert!(req.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_caller_headers_win() {
        let t = transport(Some("tok"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let body = json!({"a": 1});
        let req = t
            .prepare(Method::POST, "/expenses", Some(&body), headers)
            .unwrap();
        assert_eq!(req.headers.get(AUTHORIZATION).unwrap(), "Bearer other");
        assert_eq!(req.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(req.body.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_json_content_type_for_body() {
        let t = transport(None);
        let body = json!({"description": "Taxi"});
        let req = t
            .prepare(Method::POST, "/expenses", Some(&body), HeaderMap::new())
            .unwrap();
        assert_eq!(req.headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_token_read_on_every_request() {
        let t = transport(None);
        t.token().set(Some("later".into()));
        let req = t.prepare(Method::GET, "/auth/me", None, HeaderMap::new()).unwrap();
        assert_eq!(req.headers.get(AUTHORIZATION).unwrap(), "Bearer later");
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body(r#"{"data":[]}"#), json!({"data": []}));
        assert_eq!(
            decode_body("<h1>Bad Gateway</h1>"),
            Value::String("<h1>Bad Gateway</h1>".into())
        );
    }

    #[test]
    fn test_decode_response() {
        assert_eq!(decode_response(RawResponse::new(204, "")).unwrap(), Value::Null);

        let err = decode_response(RawResponse::new(
            403,
            r#"{"message":"You are not allowed to access this charge."}"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.to_string(), "You are not allowed to access this charge.");
        assert_eq!(err.status(), Some(403));

        let err = decode_response(RawResponse::new(502, "<h1>Bad Gateway</h1>")).unwrap_err();
        assert_eq!(err.to_string(), FALLBACK_MESSAGE);
        assert_eq!(
            err.body(),
            Some(&Value::String("<h1>Bad Gateway</h1>".into()))
        );
    }

    #[tokio::test]
    async fn test_request_passes_network_failure_through() {
        let backend = Canned::new(Err(ApiError::Network("connection refused".into())));
        let t = Transport::new(backend, TokenCell::new());
        let err = t.request(Method::GET, "/expenses", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_request_sends_prepared_request() {
        let backend = Canned::new(Ok(RawResponse::new(200, r#"{"message":"ok"}"#)));
        let cell = TokenCell::new();
        cell.set(Some("tok".into()));
        let t = Transport::new(backend.clone(), cell);
        let payload = t.request(Method::DELETE, "/charges/4", None).await.unwrap();
        assert_eq!(payload, json!({"message": "ok"}));
        let last = backend.last.lock().unwrap().clone().unwrap();
        assert_eq!(last.method, Method::DELETE);
        assert_eq!(last.path, "/charges/4");
        assert_eq!(last.headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
    }
}
