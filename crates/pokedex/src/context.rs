use crate::cache::ReferenceCache;
use crate::client::{Catalogue, HttpCatalogue};
use crate::prelude::{eprintln, *};
use pokedex_core::detail::DEFAULT_CATALOGUE_SIZE;
use pokedex_core::gallery::{DEFAULT_BATCH_SIZE, DEFAULT_SCROLL_THRESHOLD};
use pokedex_core::list::DEFAULT_PAGE_SIZE;
use std::sync::Arc;
use std::time::Duration;

/// Tunables shared by the view pipelines
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub page_size: usize,
    pub batch_size: usize,
    pub scroll_threshold: f64,
    /// Upper bound of detail navigation; derived from the cache when unset
    pub max_id: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            max_id: None,
        }
    }
}

impl From<&crate::Global> for PipelineConfig {
    fn from(global: &crate::Global) -> Self {
        Self {
            page_size: global.page_size.max(1),
            batch_size: global.batch_size.max(1),
            scroll_threshold: global.scroll_threshold,
            max_id: global.max_id,
        }
    }
}

/// Dependencies built once at startup and handed to every pipeline read-only
pub struct AppContext<C> {
    pub catalogue: Arc<C>,
    pub cache: Arc<ReferenceCache>,
    pub config: PipelineConfig,
}

impl<C> Clone for AppContext<C> {
    fn clone(&self) -> Self {
        Self {
            catalogue: Arc::clone(&self.catalogue),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        }
    }
}

impl<C: Catalogue> AppContext<C> {
    /// Build the reference cache and wrap everything up
    pub async fn build(catalogue: C, config: PipelineConfig) -> Self {
        let cache = ReferenceCache::build(&catalogue).await;
        Self::with_cache(catalogue, cache, config)
    }

    pub fn with_cache(catalogue: C, cache: ReferenceCache, config: PipelineConfig) -> Self {
        Self {
            catalogue: Arc::new(catalogue),
            cache: Arc::new(cache),
            config,
        }
    }

    /// Inclusive upper bound for detail navigation
    pub fn max_id(&self) -> u32 {
        self.config
            .max_id
            .or_else(|| self.cache.contiguous_max_id())
            .unwrap_or(DEFAULT_CATALOGUE_SIZE)
    }
}

impl AppContext<HttpCatalogue> {
    pub async fn from_global(global: &crate::Global) -> Result<Self> {
        let timeout = global.timeout_secs.map(Duration::from_secs);
        let catalogue = HttpCatalogue::new(&global.api_base, timeout)?;

        if global.verbose {
            eprintln!("Catalogue API Base: {}", catalogue.base_url());
        }

        Ok(Self::build(catalogue, PipelineConfig::from(global)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{summary, FakeCatalogue};

    #[tokio::test]
    async fn test_build_shares_one_cache() {
        let ctx = AppContext::build(FakeCatalogue::with_range(20), PipelineConfig::default()).await;
        let other = ctx.clone();

        assert!(Arc::ptr_eq(&ctx.cache, &other.cache));
        assert_eq!(ctx.cache.len(), 20);
    }

    #[test]
    fn test_max_id_prefers_config() {
        let config = PipelineConfig {
            max_id: Some(151),
            ..PipelineConfig::default()
        };
        let cache = ReferenceCache::from_entries((1..=300).map(summary).collect());

        let ctx = AppContext::with_cache(FakeCatalogue::default(), cache, config);

        assert_eq!(ctx.max_id(), 151);
    }

    #[test]
    fn test_max_id_from_cache_then_fallback() {
        let cache = ReferenceCache::from_entries((1..=300).map(summary).collect());
        let ctx = AppContext::with_cache(FakeCatalogue::default(), cache, PipelineConfig::default());
        assert_eq!(ctx.max_id(), 300);

        let ctx = AppContext::with_cache(
            FakeCatalogue::default(),
            ReferenceCache::default(),
            PipelineConfig::default(),
        );
        assert_eq!(ctx.max_id(), DEFAULT_CATALOGUE_SIZE);
    }
}
