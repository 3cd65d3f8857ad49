use crate::config::Credentials;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, Request, Response, StatusCode, Uri};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hyper::body::{Body, Bytes};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use url::Url;

type HyperHttpsClient = hyper::client::Client<HttpsConnector<HttpConnector>, Body>;
type HyperHttpClient = hyper::client::Client<HttpConnector, Body>;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not access document at \"{location}\" [{reason}]")]
    NotFound { location: String, reason: String },
    #[error("could not fetch \"{location}\": {reason}")]
    Network { location: String, reason: String },
    #[error("could not read \"{location}\": {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },
    #[error("unsupported scheme \"{scheme}\" in \"{location}\"")]
    UnsupportedScheme { location: String, scheme: String },
    #[error("invalid location \"{location}\": {reason}")]
    InvalidLocation { location: String, reason: String },
}

#[derive(Clone)]
pub struct HttpClient {
    https_client: HyperHttpsClient,
    http_client: HyperHttpClient,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            https_client: new_hyper_https_client(),
            http_client: Default::default(),
        }
    }

    async fn get(
        &self,
        uri: Uri,
        authorization: Option<&HeaderValue>,
    ) -> Result<Response<Body>, LoadError> {
        let location = uri.to_string();
        let scheme = uri.scheme_str().unwrap_or("http").to_string();

        let mut builder = Request::get(uri);
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization.clone());
        }
        let req = builder
            .body(Body::empty())
            .map_err(|err| LoadError::InvalidLocation {
                location: location.clone(),
                reason: err.to_string(),
            })?;

        let response = match scheme.as_str() {
            "http" => self.http_client.request(req).await,
            "https" => self.https_client.request(req).await,
            _ => {
                return Err(LoadError::UnsupportedScheme {
                    location,
                    scheme: scheme.clone(),
                })
            }
        };

        response.map_err(|err| LoadError::Network {
            location,
            reason: err.to_string(),
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn new_hyper_https_client() -> HyperHttpsClient {
    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .build();

    hyper::Client::builder().build(https)
}

/// Fetches raw document bytes from local files or over HTTP(S).
///
/// Every HTTP load is a single GET bounded by `timeout`. There are no retries: the first
/// failure is returned to the caller.
#[derive(Clone)]
pub struct ReferenceLoader {
    client: HttpClient,
    authorization: Option<HeaderValue>,
    timeout: Duration,
}

impl ReferenceLoader {
    pub fn new(client: HttpClient, credentials: Option<&Credentials>, timeout: Duration) -> Self {
        let authorization = credentials
            .filter(|credentials| credentials.is_configured())
            .and_then(basic_authorization);

        Self {
            client,
            authorization,
            timeout,
        }
    }

    pub async fn load(&self, location: &Url) -> Result<Bytes, LoadError> {
        let mut location = location.clone();
        location.set_fragment(None);

        match location.scheme() {
            "file" => self.load_file(&location).await,
            "http" | "https" => self.load_http(&location).await,
            scheme => Err(LoadError::UnsupportedScheme {
                location: location.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }

    async fn load_file(&self, location: &Url) -> Result<Bytes, LoadError> {
        let path = location
            .to_file_path()
            .map_err(|_| LoadError::InvalidLocation {
                location: location.to_string(),
                reason: "not a local file path".to_string(),
            })?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(LoadError::NotFound {
                location: location.to_string(),
                reason: "no such file".to_string(),
            }),
            Err(source) => Err(LoadError::Io {
                location: location.to_string(),
                source,
            }),
        }
    }

    async fn load_http(&self, location: &Url) -> Result<Bytes, LoadError> {
        let uri = Uri::try_from(location.as_str()).map_err(|err| LoadError::InvalidLocation {
            location: location.to_string(),
            reason: err.to_string(),
        })?;

        let fetch = async {
            let response = self.client.get(uri, self.authorization.as_ref()).await?;

            if response.status() != StatusCode::OK {
                return Err(LoadError::NotFound {
                    location: location.to_string(),
                    reason: response.status().to_string(),
                });
            }

            hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|err| LoadError::Network {
                    location: location.to_string(),
                    reason: err.to_string(),
                })
        };

        tracing::debug!(%location, "fetching document");

        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(LoadError::Network {
                location: location.to_string(),
                reason: format!("timed out after {:?}", self.timeout),
            }),
        }
    }
}

fn basic_authorization(credentials: &Credentials) -> Option<HeaderValue> {
    let token = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));

    HeaderValue::try_from(format!("Basic {}", token)).ok()
}

/// Turns an absolute URL or a filesystem path into a location.
pub fn location_from_str(raw: &str) -> Result<Url, LoadError> {
    match Url::parse(raw) {
        // Single letter schemes are Windows drive prefixes.
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        _ => file_location(raw, false),
    }
}

/// Like [`location_from_str`], but the result always denotes a directory, so relative
/// joins land inside it.
pub fn directory_location_from_str(raw: &str) -> Result<Url, LoadError> {
    match Url::parse(raw) {
        Ok(mut url) if url.scheme().len() > 1 => {
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            Ok(url)
        }
        _ => file_location(raw, true),
    }
}

fn file_location(raw: &str, directory: bool) -> Result<Url, LoadError> {
    let invalid = |reason: String| LoadError::InvalidLocation {
        location: raw.to_string(),
        reason,
    };

    let path = Path::new(raw);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| invalid(err.to_string()))?
            .join(path)
    };

    let url = if directory {
        Url::from_directory_path(&path)
    } else {
        Url::from_file_path(&path)
    };

    url.map_err(|_| invalid("not an absolute path".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "bot".to_string(),
            password: "secret".to_string(),
        }
    }

    fn guarded_app() -> Router {
        Router::new()
            .route(
                "/specs/pets.yaml",
                get(|headers: HeaderMap| async move {
                    match headers.get(AUTHORIZATION) {
                        Some(value) if value == "Basic Ym90OnNlY3JldA==" => {
                            (StatusCode::OK, "swagger: \"2.0\"")
                        }
                        _ => (StatusCode::UNAUTHORIZED, "authorization failed"),
                    }
                }),
            )
            .route(
                "/slow.yaml",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "swagger: \"2.0\""
                }),
            )
    }

    #[tokio::test]
    async fn loads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pets.yaml"), "swagger: \"2.0\"").unwrap();

        let loader = ReferenceLoader::new(HttpClient::new(), None, Duration::from_secs(1));
        let location = Url::from_file_path(dir.path().join("pets.yaml")).unwrap();

        let bytes = loader.load(&location).await.unwrap();
        assert_eq!(&bytes[..], b"swagger: \"2.0\"");
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ReferenceLoader::new(HttpClient::new(), None, Duration::from_secs(1));
        let location = Url::from_file_path(dir.path().join("missing.yaml")).unwrap();

        let err = loader.load(&location).await.unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[tokio::test]
    async fn http_load_sends_basic_credentials() {
        let addr = serve(guarded_app()).await;
        let location = Url::parse(&format!("http://{}/specs/pets.yaml", addr)).unwrap();

        let loader = ReferenceLoader::new(
            HttpClient::new(),
            Some(&credentials()),
            Duration::from_secs(5),
        );
        let bytes = loader.load(&location).await.unwrap();
        assert_eq!(&bytes[..], b"swagger: \"2.0\"");
    }

    #[tokio::test]
    async fn http_load_fails_on_non_ok_status() {
        let addr = serve(guarded_app()).await;
        let location = Url::parse(&format!("http://{}/specs/pets.yaml", addr)).unwrap();

        let loader = ReferenceLoader::new(HttpClient::new(), None, Duration::from_secs(5));
        let err = loader.load(&location).await.unwrap_err();

        assert!(matches!(err, LoadError::NotFound { .. }));
        let message = err.to_string();
        assert!(message.contains(location.as_str()));
        assert!(message.contains("401"));
    }

    #[tokio::test]
    async fn http_load_times_out() {
        let addr = serve(guarded_app()).await;
        let location = Url::parse(&format!("http://{}/slow.yaml", addr)).unwrap();

        let loader = ReferenceLoader::new(HttpClient::new(), None, Duration::from_millis(100));
        let err = loader.load(&location).await.unwrap_err();

        assert!(matches!(err, LoadError::Network { .. }));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let loader = ReferenceLoader::new(HttpClient::new(), None, Duration::from_secs(1));
        let location = Url::parse("ftp://example.com/pets.yaml").unwrap();

        let err = loader.load(&location).await.unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedScheme { .. }));
    }

    #[test]
    fn blank_credentials_send_no_header() {
        let blank = Credentials {
            username: String::new(),
            password: String::new(),
        };
        let loader = ReferenceLoader::new(HttpClient::new(), Some(&blank), Duration::from_secs(1));
        assert!(loader.authorization.is_none());
    }

    #[test]
    fn empty_password_is_still_sent() {
        let credentials = Credentials {
            username: "bot".to_string(),
            password: String::new(),
        };
        let loader =
            ReferenceLoader::new(HttpClient::new(), Some(&credentials), Duration::from_secs(1));
        assert_eq!(loader.authorization.unwrap(), "Basic Ym90Og==");
    }

    #[test]
    fn locations_from_paths_and_urls() {
        let url = location_from_str("https://example.com/specs/pets.yaml").unwrap();
        assert_eq!(url.scheme(), "https");

        let file = location_from_str("specs/pets.yaml").unwrap();
        assert_eq!(file.scheme(), "file");
        assert!(file.path().ends_with("/specs/pets.yaml"));

        let dir = directory_location_from_str("https://example.com/repo").unwrap();
        assert_eq!(dir.as_str(), "https://example.com/repo/");
        assert_eq!(
            dir.join("main/pets.yaml").unwrap().as_str(),
            "https://example.com/repo/main/pets.yaml"
        );

        let local_dir = directory_location_from_str("specs").unwrap();
        assert!(local_dir.path().ends_with("/specs/"));
    }
}
