use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::auth::AuthProvider;
use crate::config::{ComputeConfig, LoggingConfig};
use crate::error::{ApiError, Error, Result};

use super::response::fault_message;

pub const XML_CONTENT_TYPE: &str = "application/xml";

/// Response header carrying the server-side request id.
const REQUEST_ID_HEADER: &str = "x-compute-request-id";

static USER_AGENT: LazyLock<String> = LazyLock::new(|| {
    format!(
        "nova-quotas/{} {}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Undecoded result of a successful call.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub body: Bytes,
}

/// XML REST client bound to one service of the catalog.
///
/// The service name is fixed at construction (from `compute.catalog_type`) and
/// selects the base URL from the auth provider's catalog on every call.
#[derive(Clone)]
pub struct RestClient {
    client: HttpsClient,
    auth: AuthProvider,
    service: String,
    region: Option<String>,
    timeout: Duration,
    log_requests: bool,
}

impl RestClient {
    pub fn new(auth: AuthProvider, compute: &ComputeConfig, logging: &LoggingConfig) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| Error::Http(format!("TLS setup failed: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            auth,
            service: compute.catalog_type.clone(),
            region: compute.region.clone(),
            timeout: Duration::from_secs(compute.timeout_secs),
            log_requests: logging.log_requests,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for a path relative to the service endpoint.
    pub fn url(&self, path: &str) -> Result<String> {
        let base = self.auth.base_url(&self.service, self.region.as_deref())?;
        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    pub async fn get(&self, path: &str) -> Result<RawResponse> {
        self.request(Method::GET, path, None).await
    }

    pub async fn put(&self, path: &str, body: String) -> Result<RawResponse> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<RawResponse> {
        self.request(Method::DELETE, path, None).await
    }

    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<RawResponse> {
        let url = self.url(path)?;

        let mut req = Request::builder()
            .method(method.clone())
            .uri(&url)
            .header("X-Auth-Token", self.auth.token())
            .header("Accept", XML_CONTENT_TYPE)
            .header("User-Agent", USER_AGENT.as_str());
        if body.is_some() {
            req = req.header("Content-Type", XML_CONTENT_TYPE);
        }

        let payload = body.unwrap_or_default();
        if self.log_requests && !payload.is_empty() {
            debug!(method = %method, url = %url, body = %payload, "Request body");
        }

        let req = req
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| Error::Http(e.to_string()))?;

        let start_time = Instant::now();
        let exchange = async {
            let response = self
                .client
                .request(req)
                .await
                .map_err(|e| Error::Http(e.to_string()))?;
            let status = response.status().as_u16();
            let request_id = response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::Http(e.to_string()))?
                .to_bytes();
            Ok::<_, Error>(RawResponse {
                status,
                request_id,
                body,
            })
        };

        let raw = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                warn!(method = %method, url = %url, timeout = ?self.timeout, "Request timed out");
                Error::Timeout(self.timeout)
            })??;

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        debug!(
            method = %method,
            url = %url,
            status = raw.status,
            elapsed_ms = elapsed_ms,
            request_id = ?raw.request_id,
            "Compute API request"
        );
        if self.log_requests && !raw.body.is_empty() {
            debug!(body = %String::from_utf8_lossy(&raw.body), "Response body");
        }

        if !(200..300).contains(&raw.status) {
            let message = fault_message(&raw.body);
            warn!(
                method = %method,
                url = %url,
                status = raw.status,
                request_id = ?raw.request_id,
                error = %message,
                "Compute API returned an error"
            );
            return Err(ApiError::from_status(raw.status, message));
        }

        Ok(raw)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("auth", &self.auth)
            .field("service", &self.service)
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{FakeResponse, spawn_fake_compute, test_client};
    use super::*;
    use crate::config::CatalogEntry;
    use crate::error::AuthError;

    #[test]
    fn test_url_joins_with_single_slash() {
        let client = test_client("http://127.0.0.1:1/v2/tenant/");
        assert_eq!(
            client.url("/os-quota-sets/abc").unwrap(),
            "http://127.0.0.1:1/v2/tenant/os-quota-sets/abc"
        );
        assert_eq!(
            client.url("os-quota-sets/abc").unwrap(),
            "http://127.0.0.1:1/v2/tenant/os-quota-sets/abc"
        );
    }

    #[test]
    fn test_url_without_catalog_entry() {
        let auth = AuthProvider::new(
            "tok",
            vec![CatalogEntry {
                service_type: "volume".to_string(),
                url: "http://cinder".to_string(),
                region: None,
            }],
        )
        .unwrap();
        let client =
            RestClient::new(auth, &ComputeConfig::default(), &LoggingConfig::default()).unwrap();
        assert_eq!(client.service(), "compute");
        assert!(matches!(
            client.url("os-quota-sets/a"),
            Err(Error::Auth(AuthError::EndpointNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_get_sends_auth_and_accept_headers() {
        let (base, captured) =
            spawn_fake_compute(FakeResponse::ok("<quota_set id=\"a\"/>").with_request_id("req-9"))
                .await;
        let client = test_client(&base);

        let raw = client.get("os-quota-sets/a").await.unwrap();
        assert_eq!(raw.status, 200);
        assert_eq!(raw.request_id.as_deref(), Some("req-9"));
        assert_eq!(&raw.body[..], b"<quota_set id=\"a\"/>");

        let request = captured.await.unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/v2/tenant-admin/os-quota-sets/a");
        assert_eq!(request.header("x-auth-token"), Some("test-token"));
        assert_eq!(request.header("accept"), Some(XML_CONTENT_TYPE));
        assert!(request.header("user-agent").unwrap().starts_with("nova-quotas/"));
        assert!(request.header("content-type").is_none());
    }

    #[tokio::test]
    async fn test_put_sends_xml_body() {
        let (base, captured) = spawn_fake_compute(FakeResponse::ok("<quota_set/>")).await;
        let client = test_client(&base);

        client
            .put("os-quota-sets/a", "<quota_set cores=\"1\"/>".to_string())
            .await
            .unwrap();

        let request = captured.await.unwrap();
        assert_eq!(request.method, "PUT");
        assert_eq!(request.header("content-type"), Some(XML_CONTENT_TYPE));
        assert_eq!(request.body, "<quota_set cores=\"1\"/>");
    }

    #[tokio::test]
    async fn test_error_status_maps_fault_message() {
        let fault = r#"<itemNotFound code="404"><message>Tenant nope not found</message></itemNotFound>"#;
        let (base, _captured) = spawn_fake_compute(FakeResponse::status(404, fault)).await;
        let client = test_client(&base);

        let err = client.get("os-quota-sets/nope").await.unwrap_err();
        match err {
            Error::Api(ApiError::NotFound { message }) => {
                assert_eq!(message, "Tenant nope not found")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let (base, _captured) =
            spawn_fake_compute(FakeResponse::status(401, "Authentication required")).await;
        let client = test_client(&base);

        let err = client.delete("os-quota-sets/a").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Unauthorized(ref m)) if m == "Authentication required"));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let auth = AuthProvider::new(
            "tok",
            vec![CatalogEntry {
                service_type: "compute".to_string(),
                url: format!("http://{addr}/v2/t"),
                region: None,
            }],
        )
        .unwrap();
        let compute = ComputeConfig {
            timeout_secs: 1,
            ..ComputeConfig::default()
        };
        let client = RestClient::new(auth, &compute, &LoggingConfig::default()).unwrap();

        let err = client.get("os-quota-sets/a").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = test_client(&format!("http://{addr}/v2/t"));
        let err = client.get("os-quota-sets/a").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
