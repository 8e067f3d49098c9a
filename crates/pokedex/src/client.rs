use crate::prelude::*;
use futures::future::join_all;
use pokedex_core::catalogue::{
    transform_detail, transform_index, transform_type_members, transform_type_names,
    CreatureDetail, CreatureSummary, IndexResponse, PokemonResponse, TypeListResponse,
    TypeResponse,
};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";

/// One page of the catalogue index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    /// Total number of entities the catalogue reports
    pub count: usize,
    pub results: Vec<CreatureSummary>,
}

/// Read-only access to the creature catalogue
///
/// Every call is a single request with no retry. Implementations never hold
/// state the pipelines depend on. Futures are `Send` so request groups can
/// run on their own task while the session keeps reading input.
pub trait Catalogue: Send + Sync + 'static {
    fn fetch_index(
        &self,
        limit: usize,
        offset: usize,
    ) -> impl Future<Output = Result<IndexPage, CatalogueError>> + Send;

    /// Fetch one detail record; `reference` is a resource URL, an id, or a name
    fn fetch_detail(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<CreatureDetail, CatalogueError>> + Send;

    fn fetch_type_members(
        &self,
        type_name: &str,
    ) -> impl Future<Output = Result<HashSet<String>, CatalogueError>> + Send;

    fn fetch_type_names(&self) -> impl Future<Output = Result<Vec<String>, CatalogueError>> + Send;
}

/// Catalogue backed by the PokeAPI REST service
#[derive(Debug, Clone)]
pub struct HttpCatalogue {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogue {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn detail_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!(
                "{}/pokemon/{}",
                self.base_url,
                urlencoding::encode(&reference.to_lowercase())
            )
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogueError> {
        log::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogueError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogueError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(CatalogueError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogueError::Network(format!("{url}: {e}")))?;

        serde_json::from_str(&body).map_err(|e| CatalogueError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl Catalogue for HttpCatalogue {
    async fn fetch_index(&self, limit: usize, offset: usize) -> Result<IndexPage, CatalogueError> {
        let url = format!(
            "{}/pokemon?limit={limit}&offset={offset}",
            self.base_url
        );
        let response: IndexResponse = self.get_json(&url).await?;

        Ok(IndexPage {
            count: response.count,
            results: transform_index(response),
        })
    }

    async fn fetch_detail(&self, reference: &str) -> Result<CreatureDetail, CatalogueError> {
        let url = self.detail_url(reference);
        let response: PokemonResponse = self.get_json(&url).await?;
        Ok(transform_detail(response))
    }

    async fn fetch_type_members(
        &self,
        type_name: &str,
    ) -> Result<HashSet<String>, CatalogueError> {
        let url = format!(
            "{}/type/{}",
            self.base_url,
            urlencoding::encode(type_name)
        );
        let response: TypeResponse = self.get_json(&url).await?;
        Ok(transform_type_members(response))
    }

    async fn fetch_type_names(&self) -> Result<Vec<String>, CatalogueError> {
        let url = format!("{}/type", self.base_url);
        let response: TypeListResponse = self.get_json(&url).await?;
        Ok(transform_type_names(response))
    }
}

/// Result of a group of detail requests, in request order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub details: Vec<CreatureDetail>,
    /// Names whose request failed, with the reason
    pub failed: Vec<(String, CatalogueError)>,
}

/// What a pipeline did with the result of a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Results were committed; `count` entries added, `failed` requests dropped
    Loaded { count: usize, failed: usize },
    /// The load was not started
    Skipped,
    /// A newer request replaced this one before it finished
    Superseded,
    Failed(String),
}

/// Fetch details for `refs` as one parallel group
///
/// Results keep request order. Individual failures are collected and the
/// successful subset is returned; the group only fails when every request
/// failed or `cancel` fired.
pub async fn fetch_details<C: Catalogue>(
    catalogue: &C,
    refs: &[CreatureSummary],
    cancel: &CancellationToken,
) -> Result<BatchOutcome, CatalogueError> {
    let detail_futures = refs.iter().map(|r| catalogue.fetch_detail(&r.url));

    let results = tokio::select! {
        _ = cancel.cancelled() => return Err(CatalogueError::Cancelled),
        results = join_all(detail_futures) => results,
    };

    if cancel.is_cancelled() {
        return Err(CatalogueError::Cancelled);
    }

    let mut outcome = BatchOutcome::default();
    for (reference, result) in refs.iter().zip(results) {
        match result {
            Ok(detail) => outcome.details.push(detail),
            Err(err) => {
                log::warn!("Failed to fetch details for {}: {}", reference.name, err);
                outcome.failed.push((reference.name.clone(), err));
            }
        }
    }

    if outcome.details.is_empty() {
        if let Some((_, first)) = outcome.failed.first() {
            return Err(CatalogueError::BatchFailed {
                failed: outcome.failed.len(),
                first: Box::new(first.clone()),
            });
        }
    }

    Ok(outcome)
}

/// Fetch the member sets of several types as one parallel group, in request order
pub async fn fetch_type_member_sets<C: Catalogue>(
    catalogue: &C,
    type_names: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<HashSet<String>>, CatalogueError> {
    let member_futures = type_names
        .iter()
        .map(|name| catalogue.fetch_type_members(name));

    let results = tokio::select! {
        _ = cancel.cancelled() => return Err(CatalogueError::Cancelled),
        results = join_all(member_futures) => results,
    };

    if cancel.is_cancelled() {
        return Err(CatalogueError::Cancelled);
    }

    results.into_iter().collect()
}

/// Hands out one cancellation token per request group
///
/// Starting a new group cancels the previous one, so a pipeline only ever
/// commits the results of its latest request.
#[derive(Debug, Default)]
pub struct RequestGroup {
    current: Option<CancellationToken>,
}

impl RequestGroup {
    pub fn begin(&mut self) -> CancellationToken {
        self.cancel();
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{summary, FakeCatalogue};

    #[test]
    fn test_detail_url_from_id_and_name() {
        let catalogue = HttpCatalogue::new("https://pokeapi.co/api/v2/", None).unwrap();

        assert_eq!(catalogue.base_url(), "https://pokeapi.co/api/v2");
        assert_eq!(
            catalogue.detail_url("25"),
            "https://pokeapi.co/api/v2/pokemon/25"
        );
        assert_eq!(
            catalogue.detail_url("Mr-Mime"),
            "https://pokeapi.co/api/v2/pokemon/mr-mime"
        );
        assert_eq!(
            catalogue.detail_url("https://pokeapi.co/api/v2/pokemon/1/"),
            "https://pokeapi.co/api/v2/pokemon/1/"
        );
    }

    #[tokio::test]
    async fn test_fetch_details_keeps_request_order() {
        let catalogue = FakeCatalogue::with_range(10);
        let refs = vec![summary(7), summary(2), summary(9)];

        let outcome = fetch_details(&catalogue, &refs, &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<u32> = outcome.details.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![7, 2, 9]);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_details_preserves_partial_success() {
        let catalogue = FakeCatalogue::with_range(10).failing_detail(2);
        let refs = vec![summary(1), summary(2), summary(3)];

        let outcome = fetch_details(&catalogue, &refs, &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<u32> = outcome.details.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "mon2");
    }

    #[tokio::test]
    async fn test_fetch_details_fails_when_all_fail() {
        let catalogue = FakeCatalogue::with_range(10)
            .failing_detail(1)
            .failing_detail(2);
        let refs = vec![summary(1), summary(2)];

        let err = fetch_details(&catalogue, &refs, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogueError::BatchFailed { failed: 2, .. }));
    }

    #[tokio::test]
    async fn test_fetch_details_empty_group() {
        let catalogue = FakeCatalogue::with_range(3);

        let outcome = fetch_details(&catalogue, &[], &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.details.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_details_cancelled() {
        let catalogue = FakeCatalogue::with_range(3);
        let token = CancellationToken::new();
        token.cancel();

        let err = fetch_details(&catalogue, &[summary(1)], &token)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_fetch_type_member_sets_propagates_failure() {
        let catalogue = FakeCatalogue::with_range(3).with_type("fire", &[1, 2]);
        let types = vec!["fire".to_string(), "missing".to_string()];

        let err = fetch_type_member_sets(&catalogue, &types, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogueError::NotFound(_)));
    }

    #[test]
    fn test_request_group_cancels_previous() {
        let mut group = RequestGroup::default();
        let first = group.begin();
        let second = group.begin();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        group.cancel();
        assert!(second.is_cancelled());
    }
}
