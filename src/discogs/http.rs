use crate::discogs::client::{Discogs, DiscogsError, PageParams};
use crate::discogs::models::{
    Artist, CollectionCustomFields, CollectionFolder, CollectionFolderItems, CollectionFolders,
    CollectionItemInfo, CollectionValue, ErrorResponse, MasterRelease, MasterReleaseVersions,
    RecordLabel, Release, ReleaseSummaries, SearchResultType, SearchResults, UserIdentity,
    UserProfile,
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

pub const DISCOGS_API_BASE_URL: &str = "https://api.discogs.com";

/// Configuration for the HTTP-backed client. Timeout applies per request;
/// retries cover transient transport failures and rate limiting only.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Discogs requires all API calls to include a custom `User-Agent` header.
    pub user_agent: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        HttpClientConfig {
            user_agent: concat!("discollect/", env!("CARGO_PKG_VERSION")).to_string(),
            base_url: DISCOGS_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

/// Intermediate failure from the request helpers, before each operation maps
/// a 404 onto its own not-found kind.
enum RequestFailure {
    NotFound,
    Unauthorized,
    Api(ErrorResponse),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl RequestFailure {
    /// Convert to a `DiscogsError`, substituting `not_found` for a 404.
    fn into_discogs(self, not_found: DiscogsError) -> DiscogsError {
        match self {
            RequestFailure::NotFound => not_found,
            RequestFailure::Unauthorized => DiscogsError::UnauthenticatedUser,
            RequestFailure::Api(response) => DiscogsError::Response(response),
            RequestFailure::Other(source) => DiscogsError::Unknown(source),
        }
    }
}

/// Whether an operation needs a signed-in credential before it can be issued.
#[derive(Clone, Copy, PartialEq)]
enum Auth {
    Public,
    Required,
}

/// `reqwest`-backed implementation of the Discogs contract.
///
/// Sign-in is a personal access token handed over by the caller; the OAuth
/// handshake that produces it lives outside this crate.
pub struct DiscogsHttpClient {
    http: Client,
    user_agent: String,
    base_url: String,
    max_retries: u32,
    token: RwLock<Option<String>>,
}

impl DiscogsHttpClient {
    pub fn new(config: HttpClientConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        DiscogsHttpClient {
            http,
            user_agent: config.user_agent,
            base_url: config.base_url,
            max_retries: config.max_retries,
            token: RwLock::new(None),
        }
    }

    /// Store the access token and mark the client signed in. No network call
    /// happens here; the token is only attached to subsequent requests.
    pub fn sign_in(&self, token: &str) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
    }

    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        auth: Auth,
        body: Option<serde_json::Value>,
    ) -> Result<T, RequestFailure> {
        let token = self.current_token();
        if auth == Auth::Required && token.is_none() {
            return Err(RequestFailure::Unauthorized);
        }

        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header("User-Agent", &self.user_agent)
                .query(query);

            // Attach the token to public calls too when we have one; Discogs
            // grants authenticated requests a higher rate limit.
            if let Some(token) = &token {
                request = request.header("Authorization", format!("Discogs token={}", token));
            }

            if let Some(body) = &body {
                request = request.json(body);
            }

            debug!("Discogs API: {} {}", method, url);
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries {
                        attempt += 1;
                        let backoff = Duration::from_millis(250 * (1 << attempt));
                        warn!("Transient error for {} ({}), retrying in {:?}", url, e, backoff);
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(RequestFailure::Other(Box::new(e)));
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                attempt += 1;
                let backoff = Duration::from_millis(1000 * (1 << attempt));
                warn!("Rate limited on {}, retrying in {:?}", url, backoff);
                tokio::time::sleep(backoff).await;
                continue;
            }

            return if status.is_success() {
                response
                    .json::<T>()
                    .await
                    .map_err(|e| RequestFailure::Other(Box::new(e)))
            } else if status == StatusCode::NOT_FOUND {
                Err(RequestFailure::NotFound)
            } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                Err(RequestFailure::Unauthorized)
            } else {
                match response.json::<ErrorResponse>().await {
                    Ok(error_response) => Err(RequestFailure::Api(error_response)),
                    Err(e) => Err(RequestFailure::Other(Box::new(e))),
                }
            };
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RequestFailure> {
        self.request(Method::GET, path, query, Auth::Public, None)
            .await
    }

    async fn authorized_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RequestFailure> {
        self.request(Method::GET, path, query, Auth::Required, None)
            .await
    }

    async fn authorized_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, RequestFailure> {
        self.request(Method::POST, path, &[], Auth::Required, body)
            .await
    }
}

fn page_query(page: PageParams) -> Vec<(&'static str, String)> {
    vec![
        ("page", page.page_number.to_string()),
        ("per_page", page.per_page.to_string()),
    ]
}

fn unknown_user(username: &str) -> DiscogsError {
    DiscogsError::UnknownUser {
        username: username.to_string(),
    }
}

#[async_trait]
impl Discogs for DiscogsHttpClient {
    fn is_signed_in(&self) -> bool {
        self.current_token().is_some()
    }

    fn sign_out(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    async fn user_identity(&self) -> Result<UserIdentity, DiscogsError> {
        self.authorized_get("/oauth/identity", &[])
            .await
            .map_err(|e| e.into_discogs(DiscogsError::UnauthenticatedUser))
    }

    async fn user_profile(&self, username: &str) -> Result<UserProfile, DiscogsError> {
        self.get(&format!("/users/{}", username), &[])
            .await
            .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn artist(&self, id: u64) -> Result<Artist, DiscogsError> {
        self.get(&format!("/artists/{}", id), &[])
            .await
            .map_err(|e| e.into_discogs(DiscogsError::ArtistNotFound(id)))
    }

    async fn artist_releases(
        &self,
        artist_id: u64,
        page: PageParams,
    ) -> Result<ReleaseSummaries, DiscogsError> {
        self.get(&format!("/artists/{}/releases", artist_id), &page_query(page))
            .await
            .map_err(|e| e.into_discogs(DiscogsError::ArtistNotFound(artist_id)))
    }

    async fn label(&self, id: u64) -> Result<RecordLabel, DiscogsError> {
        self.get(&format!("/labels/{}", id), &[])
            .await
            .map_err(|e| e.into_discogs(DiscogsError::LabelNotFound(id)))
    }

    async fn label_releases(
        &self,
        label_id: u64,
        page: PageParams,
    ) -> Result<ReleaseSummaries, DiscogsError> {
        self.get(&format!("/labels/{}/releases", label_id), &page_query(page))
            .await
            .map_err(|e| e.into_discogs(DiscogsError::LabelNotFound(label_id)))
    }

    async fn master_release(&self, id: u64) -> Result<MasterRelease, DiscogsError> {
        self.get(&format!("/masters/{}", id), &[])
            .await
            .map_err(|e| e.into_discogs(DiscogsError::MasterReleaseNotFound(id)))
    }

    async fn master_release_versions(
        &self,
        id: u64,
        page: PageParams,
    ) -> Result<MasterReleaseVersions, DiscogsError> {
        self.get(&format!("/masters/{}/versions", id), &page_query(page))
            .await
            .map_err(|e| e.into_discogs(DiscogsError::MasterReleaseNotFound(id)))
    }

    async fn release(&self, id: u64) -> Result<Release, DiscogsError> {
        self.get(&format!("/releases/{}", id), &[])
            .await
            .map_err(|e| e.into_discogs(DiscogsError::ReleaseNotFound(id)))
    }

    async fn custom_collection_fields(
        &self,
        username: &str,
    ) -> Result<CollectionCustomFields, DiscogsError> {
        self.authorized_get(&format!("/users/{}/collection/fields", username), &[])
            .await
            .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn collection_value(&self, username: &str) -> Result<CollectionValue, DiscogsError> {
        self.authorized_get(&format!("/users/{}/collection/value", username), &[])
            .await
            .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn collection_folders(&self, username: &str) -> Result<CollectionFolders, DiscogsError> {
        self.authorized_get(&format!("/users/{}/collection/folders", username), &[])
            .await
            .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn collection_folder(
        &self,
        folder_id: i64,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError> {
        self.authorized_get(
            &format!("/users/{}/collection/folders/{}", username, folder_id),
            &[],
        )
        .await
        .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn create_folder(
        &self,
        name: &str,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError> {
        self.authorized_post(
            &format!("/users/{}/collection/folders", username),
            Some(serde_json::json!({ "name": name })),
        )
        .await
        .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn edit_folder(
        &self,
        folder: &CollectionFolder,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError> {
        self.authorized_post(
            &format!("/users/{}/collection/folders/{}", username, folder.id),
            Some(serde_json::json!({ "name": folder.name })),
        )
        .await
        .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn collection_items(
        &self,
        folder_id: i64,
        username: &str,
        page: PageParams,
    ) -> Result<CollectionFolderItems, DiscogsError> {
        self.authorized_get(
            &format!(
                "/users/{}/collection/folders/{}/releases",
                username, folder_id
            ),
            &page_query(page),
        )
        .await
        .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn add_item(
        &self,
        item_id: u64,
        folder_id: i64,
        username: &str,
    ) -> Result<CollectionItemInfo, DiscogsError> {
        self.authorized_post(
            &format!(
                "/users/{}/collection/folders/{}/releases/{}",
                username, folder_id, item_id
            ),
            None,
        )
        .await
        .map_err(|e| e.into_discogs(unknown_user(username)))
    }

    async fn search(
        &self,
        query: &str,
        result_type: Option<SearchResultType>,
    ) -> Result<SearchResults, DiscogsError> {
        let mut params = vec![("q", query.to_string())];
        if let Some(result_type) = result_type {
            let type_param = match result_type {
                SearchResultType::Artist => "artist",
                SearchResultType::Release => "release",
                SearchResultType::Master => "master",
                SearchResultType::Label => "label",
            };
            params.push(("type", type_param.to_string()));
        }

        self.authorized_get("/database/search", &params)
            .await
            .map_err(|e| e.into_discogs(DiscogsError::Response(ErrorResponse {
                message: format!("no results for query: {}", query),
            })))
    }
}
