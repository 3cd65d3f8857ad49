use crate::config::Config;
use crate::document::{parse_value, SpecDocument};
use crate::loader::{HttpClient, LoadError, ReferenceLoader};
use crate::mock::{mock_response, MockError, MockRequest, MockResponse};
use crate::repository::Repository;
use crate::resolve::Resolver;
use serde_json::Value;
use url::Url;

/// Serves spec documents and mock responses for specs kept in a [`Repository`].
///
/// Holds configuration only. Every call loads and resolves its documents afresh.
pub struct SpecService {
    repository: Repository,
    loader: ReferenceLoader,
    public_url: Option<Url>,
    max_reference_depth: usize,
}

impl SpecService {
    pub fn new(config: &Config, client: HttpClient) -> Result<Self, LoadError> {
        Ok(Self {
            repository: Repository::new(&config.repository)?,
            loader: ReferenceLoader::new(
                client,
                config.credentials.as_ref(),
                config.loader.timeout(),
            ),
            public_url: config.public_url.clone(),
            max_reference_depth: config.loader.max_reference_depth,
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub async fn load_document(
        &self,
        branch: &str,
        spec_name: &str,
    ) -> Result<SpecDocument, MockError> {
        let location = self.repository.file_location(branch, spec_name)?;
        let bytes = self.loader.load(&location).await?;

        Ok(SpecDocument::from_slice(location, &bytes)?)
    }

    /// The unexpanded document with "try it now" pointed at this service.
    pub async fn document_json(&self, branch: &str, spec_name: &str) -> Result<Value, MockError> {
        let mut document = self.load_document(branch, spec_name).await?;

        let host = self.public_url.as_ref().and_then(host_with_port);
        document.patch_try_it(host.as_deref(), &format!("/{}/try/{}", branch, spec_name));

        Ok(document.into_raw())
    }

    /// Any repository file, YAML or JSON, as JSON.
    pub async fn raw_file(&self, branch: &str, path: &str) -> Result<Value, MockError> {
        let location = self.repository.file_location(branch, path)?;
        let bytes = self.loader.load(&location).await?;

        Ok(parse_value(&location, &bytes)?)
    }

    pub async fn try_request(&self, request: &MockRequest) -> Result<MockResponse, MockError> {
        let document = self
            .load_document(&request.branch, &request.spec_name)
            .await?;
        let base = self.resolution_base(&request.branch, &request.spec_name, document.location());

        let resolver = Resolver::new(&self.loader, self.max_reference_depth);
        let spec = document.expand(&resolver, &base).await?;

        mock_response(
            &spec,
            &request.method,
            &request.path,
            request.expected_status.as_deref(),
        )
    }

    /// With a public URL, references resolve through this service's own raw-file
    /// endpoint; otherwise next to the document itself.
    fn resolution_base(&self, branch: &str, spec_name: &str, document: &Url) -> Url {
        let Some(public_url) = &self.public_url else {
            return document.clone();
        };

        let mut base = public_url.clone();
        match base.path_segments_mut() {
            Ok(mut segments) => {
                segments
                    .pop_if_empty()
                    .push(branch)
                    .push("files")
                    .push(spec_name)
                    .push("json")
                    .push("");
            }
            Err(()) => return document.clone(),
        }

        base
    }
}

fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str()?;

    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
