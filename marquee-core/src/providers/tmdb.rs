use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::MetadataResolver;
use super::availability::{
    DEFAULT_REGIONS, WatchProvidersResponse, aggregate_providers,
};
use super::title::TitleQuery;
use crate::error::ProviderError;
use crate::types::{MovieId, MovieStatus, ResolvedMovie};

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Clone)]
pub struct TmdbSettings {
    pub api_key: String,
    pub base_url: String,
    pub language: String,
    pub regions: Vec<String>,
    pub request_timeout: Duration,
}

impl fmt::Debug for TmdbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("regions", &self.regions)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TmdbSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: TMDB_API_BASE.to_string(),
            language: "en-US".to_string(),
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    id: u64,
    title: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f32>,
    release_date: Option<String>,
}

/// Metadata resolver backed by the TMDB search and watch-provider endpoints.
#[derive(Debug, Clone)]
pub struct TmdbResolver {
    settings: TmdbSettings,
    client: Client,
}

impl TmdbResolver {
    pub fn new(settings: TmdbSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn search_movie(
        &self,
        query: &TitleQuery,
    ) -> Result<Option<TmdbSearchResult>, ProviderError> {
        debug!("TMDB search for: {:?}", query);

        let mut params = vec![
            ("api_key", self.settings.api_key.clone()),
            ("query", query.title.clone()),
            ("language", self.settings.language.clone()),
        ];
        if let Some(year) = query.year {
            params.push(("year", year.to_string()));
        }

        let response = self
            .client
            .get(self.endpoint("search/movie"))
            .query(&params)
            .send()
            .await?;

        let search: TmdbSearchResponse = check_status(response)?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!("TMDB search returned {} results", search.results.len());
        Ok(search.results.into_iter().next())
    }

    async fn watch_providers(
        &self,
        movie_id: u64,
    ) -> Result<WatchProvidersResponse, ProviderError> {
        let response = self
            .client
            .get(self.endpoint(&format!("movie/{movie_id}/watch/providers")))
            .query(&[("api_key", self.settings.api_key.as_str())])
            .send()
            .await?;

        check_status(response)?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

fn check_status(response: Response) -> Result<Response, ProviderError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(ProviderError::InvalidApiKey),
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
        status if !status.is_success() => {
            Err(ProviderError::Status(status.as_u16()))
        }
        _ => Ok(response),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl MetadataResolver for TmdbResolver {
    async fn resolve(&self, title: &str) -> ResolvedMovie {
        let query = TitleQuery::parse(title);

        let hit = match self.search_movie(&query).await {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                debug!(title, "no TMDB match");
                return ResolvedMovie::not_found(title);
            }
            Err(err) => {
                warn!(title, error = %err, "TMDB search failed");
                return ResolvedMovie::failed(title);
            }
        };

        let mut movie = ResolvedMovie {
            id: MovieId::Tmdb(hit.id),
            title: non_empty(hit.title).unwrap_or_else(|| query.title.clone()),
            original_title: title.to_string(),
            poster_path: non_empty(hit.poster_path),
            vote_average: hit.vote_average.unwrap_or_default(),
            release_date: non_empty(hit.release_date),
            providers: Vec::new(),
            status: MovieStatus::Error,
        };

        match self.watch_providers(hit.id).await {
            Ok(availability) => {
                movie.providers =
                    aggregate_providers(&availability, &self.settings.regions);
                movie.status = if movie.has_availability() {
                    MovieStatus::Found
                } else {
                    MovieStatus::NoAvailability
                };
            }
            Err(err) => {
                warn!(title, tmdb_id = hit.id, error = %err, "TMDB watch providers failed");
            }
        }

        movie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode as AxumStatus,
        response::{IntoResponse, Response as AxumResponse},
        routing::get,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        search: AtomicUsize,
        providers: AtomicUsize,
    }

    async fn search(
        State(calls): State<Arc<Calls>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> AxumResponse {
        calls.search.fetch_add(1, Ordering::SeqCst);
        if params.get("api_key").map(String::as_str) != Some("test-key") {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        let query = params.get("query").cloned().unwrap_or_default();
        let year = params.get("year").cloned();
        match (query.as_str(), year.as_deref()) {
            ("Heat", Some("1995")) => Json(json!({
                "results": [
                    {"id": 949, "title": "Heat", "poster_path": "/heat.jpg", "vote_average": 7.9, "release_date": "1995-12-15"},
                    {"id": 5, "title": "Heat 2", "poster_path": null, "vote_average": 1.0, "release_date": ""}
                ]
            }))
            .into_response(),
            ("Unavailable", _) => Json(json!({
                "results": [{"id": 1, "title": "Unavailable", "release_date": ""}]
            }))
            .into_response(),
            ("Flaky", _) => Json(json!({
                "results": [{"id": 2, "title": "Flaky", "vote_average": 5.5}]
            }))
            .into_response(),
            ("Broken", _) => AxumStatus::INTERNAL_SERVER_ERROR.into_response(),
            ("Throttled", _) => AxumStatus::TOO_MANY_REQUESTS.into_response(),
            ("Garbled", _) => "not json".into_response(),
            _ => Json(json!({"results": []})).into_response(),
        }
    }

    async fn providers(
        State(calls): State<Arc<Calls>>,
        Path(id): Path<u64>,
    ) -> AxumResponse {
        calls.providers.fetch_add(1, Ordering::SeqCst);
        match id {
            949 => Json(json!({
                "id": 949,
                "results": {
                    "GB": {"flatrate": [{"provider_id": 8, "provider_name": "Netflix", "logo_path": "/n.jpg"}]},
                    "US": {
                        "flatrate": [{"provider_id": 8, "provider_name": "Netflix", "logo_path": "/n.jpg"}],
                        "rent": [{"provider_id": 2, "provider_name": "Apple TV", "logo_path": "/a.jpg"}]
                    }
                }
            }))
            .into_response(),
            1 => Json(json!({"id": 1, "results": {}})).into_response(),
            _ => AxumStatus::SERVICE_UNAVAILABLE.into_response(),
        }
    }

    async fn stub_tmdb() -> (String, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let app = Router::new()
            .route("/search/movie", get(search))
            .route("/movie/{id}/watch/providers", get(providers))
            .with_state(Arc::clone(&calls));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });
        (format!("http://{addr}"), calls)
    }

    fn resolver(base_url: &str, api_key: &str) -> TmdbResolver {
        let mut settings = TmdbSettings::new(api_key);
        settings.base_url = base_url.to_string();
        settings.request_timeout = Duration::from_secs(5);
        TmdbResolver::new(settings).expect("resolver")
    }

    #[tokio::test]
    async fn resolves_title_with_year_hint_and_providers() {
        let (base, calls) = stub_tmdb().await;
        let movie = resolver(&base, "test-key").resolve("Heat (1995)").await;

        assert_eq!(movie.status, MovieStatus::Found);
        assert_eq!(movie.id, MovieId::Tmdb(949));
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.original_title, "Heat (1995)");
        assert_eq!(movie.poster_path.as_deref(), Some("/heat.jpg"));
        assert_eq!(movie.release_date.as_deref(), Some("1995-12-15"));
        // US is visited before GB, so Netflix is attributed to US.
        assert_eq!(movie.providers.len(), 2);
        assert_eq!(movie.providers[0].id, 8);
        assert_eq!(movie.providers[0].region, "US");
        assert_eq!(movie.providers[1].id, 2);
        assert_eq!(calls.search.load(Ordering::SeqCst), 1);
        assert_eq!(calls.providers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_providers_mean_no_availability() {
        let (base, _) = stub_tmdb().await;
        let movie = resolver(&base, "test-key").resolve("Unavailable").await;
        assert_eq!(movie.status, MovieStatus::NoAvailability);
        assert!(movie.providers.is_empty());
        assert_eq!(movie.release_date, None, "blank dates are dropped");
    }

    #[tokio::test]
    async fn zero_results_short_circuit_to_not_found() {
        let (base, calls) = stub_tmdb().await;
        let movie = resolver(&base, "test-key")
            .resolve("Nonexistent Movie Title Xyz")
            .await;

        assert_eq!(movie.status, MovieStatus::NotFound);
        assert!(movie.providers.is_empty());
        assert!(movie.poster_path.is_none());
        assert_eq!(calls.search.load(Ordering::SeqCst), 1);
        assert_eq!(calls.providers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_failures_become_error_status() {
        let (base, calls) = stub_tmdb().await;
        let resolver = resolver(&base, "test-key");

        for title in ["Broken", "Throttled", "Garbled"] {
            let movie = resolver.resolve(title).await;
            assert_eq!(movie.status, MovieStatus::Error, "{title}");
            assert!(movie.providers.is_empty());
            assert!(matches!(movie.id, MovieId::Synthetic(_)));
        }
        assert_eq!(calls.providers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn availability_failure_keeps_metadata_but_reports_error() {
        let (base, _) = stub_tmdb().await;
        let movie = resolver(&base, "test-key").resolve("Flaky").await;
        assert_eq!(movie.status, MovieStatus::Error);
        assert_eq!(movie.id, MovieId::Tmdb(2));
        assert_eq!(movie.vote_average, 5.5);
        assert!(movie.providers.is_empty());
    }

    #[tokio::test]
    async fn invalid_api_key_is_an_error_not_a_miss() {
        let (base, _) = stub_tmdb().await;
        let movie = resolver(&base, "wrong").resolve("Heat (1995)").await;
        assert_eq!(movie.status, MovieStatus::Error);
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let movie = resolver(&format!("http://{addr}"), "test-key")
            .resolve("Heat")
            .await;
        assert_eq!(movie.status, MovieStatus::Error);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let settings = TmdbSettings::new("super-secret");
        assert!(!format!("{settings:?}").contains("super-secret"));
    }
}
