//! Snap Store catalog queries

use snapkit_errors::Error;
use snapkit_net::{DownloadResult, HttpRequest, RetryingExecutor};
use snapkit_types::store::{
    search::ArchSearchPayload, validate_architecture, validate_fields, ArchSearchResponse,
    CategoryResponse, InfoResponse, RefreshRequest, RefreshRevisionResponse, SearchResponse,
    SingleCategoryResponse, VALID_CATEGORY_FIELDS, VALID_INFO_FIELDS, VALID_SEARCH_FIELDS,
    VALID_SNAP_REFRESH_FIELDS,
};
use std::path::Path;

/// Filters for [`StoreEndpoints::search`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub fields: Vec<String>,
    pub category: Option<String>,
    pub arch: Option<String>,
}

/// Store REST endpoints
#[derive(Clone)]
pub struct StoreEndpoints {
    executor: RetryingExecutor,
    api_version: String,
}

fn with_fields<S: AsRef<str>>(request: HttpRequest, fields: &[S]) -> HttpRequest {
    if fields.is_empty() {
        return request;
    }
    let fields: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();
    request.query("fields", fields.join(","))
}

impl StoreEndpoints {
    pub(crate) fn new(executor: RetryingExecutor, api_version: &str) -> Self {
        Self {
            executor,
            api_version: api_version.to_string(),
        }
    }

    fn path(&self, rest: &str) -> String {
        format!("/{}/snaps/{rest}", self.api_version)
    }

    /// All store categories
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` before any request for an
    /// unknown field, otherwise a network, status or payload error.
    pub async fn categories<S: AsRef<str>>(&self, fields: &[S]) -> Result<CategoryResponse, Error> {
        validate_fields(fields, VALID_CATEGORY_FIELDS)?;
        let request = with_fields(HttpRequest::get(self.path("categories")), fields);
        self.executor.execute_json(&request, "categories").await
    }

    /// One category by name
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidField` for an unknown field and
    /// `ApiError::Status` with 404 for an unknown category.
    pub async fn category<S: AsRef<str>>(
        &self,
        name: &str,
        fields: &[S],
    ) -> Result<SingleCategoryResponse, Error> {
        validate_fields(fields, VALID_CATEGORY_FIELDS)?;
        let request = with_fields(
            HttpRequest::get(self.path(&format!("categories/{name}"))),
            fields,
        );
        self.executor.execute_json(&request, "category").await
    }

    /// Full-text search
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown fields or architecture,
    /// otherwise a network, status or payload error.
    pub async fn search(&self, query: &str, params: &SearchParams) -> Result<SearchResponse, Error> {
        validate_fields(&params.fields, VALID_SEARCH_FIELDS)?;
        if let Some(arch) = &params.arch {
            validate_architecture(arch)?;
        }

        let mut request = with_fields(HttpRequest::get(self.path("find")).query("q", query), &params.fields);
        if let Some(category) = &params.category {
            request = request.query("category", category);
        }
        if let Some(arch) = &params.arch {
            request = request.query("architecture", arch);
        }
        self.executor.execute_json(&request, "search").await
    }

    /// Store metadata and channel map for one snap
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown fields or architecture,
    /// otherwise a network, status or payload error.
    pub async fn info<S: AsRef<str>>(
        &self,
        name: &str,
        fields: &[S],
        arch: Option<&str>,
    ) -> Result<InfoResponse, Error> {
        validate_fields(fields, VALID_INFO_FIELDS)?;
        let mut request = with_fields(HttpRequest::get(self.path(&format!("info/{name}"))), fields);
        if let Some(arch) = arch {
            validate_architecture(arch)?;
            request = request.query("architecture", arch);
        }
        self.executor.execute_json(&request, "info").await
    }

    /// Every snap published for `arch`
    ///
    /// Uses the v1 names listing, which the store scopes by the
    /// `X-Ubuntu-Architecture` header.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidArchitecture` before any request for
    /// an unknown architecture.
    pub async fn snaps_for_arch(&self, arch: &str) -> Result<ArchSearchResponse, Error> {
        validate_architecture(arch)?;
        let request = HttpRequest::get("/api/v1/snaps/names")
            .header("X-Ubuntu-Architecture", arch);
        let payload: ArchSearchPayload = self.executor.execute_json(&request, "arch listing").await?;
        Ok(ArchSearchResponse::from_payload(arch, payload))
    }

    /// Metadata of one specific revision, including its download link
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown fields or architecture,
    /// otherwise a network, status or payload error.
    pub async fn revision_info<S: AsRef<str>>(
        &self,
        name: &str,
        revision: u64,
        arch: &str,
        fields: &[S],
    ) -> Result<RefreshRevisionResponse, Error> {
        validate_fields(fields, VALID_SNAP_REFRESH_FIELDS)?;
        validate_architecture(arch)?;

        let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let request = HttpRequest::post(self.path("refresh"))
            .header("Snap-Device-Architecture", arch)
            .json(&RefreshRequest::download_revision(name, revision, &fields))?;
        self.executor.execute_json(&request, "revision info").await
    }

    /// Stream a file, usually a `.snap`, from `url` to `dest`
    ///
    /// # Errors
    ///
    /// Returns a network, status or I/O error.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult, Error> {
        self.executor.download(&HttpRequest::get(url), dest).await
    }
}
