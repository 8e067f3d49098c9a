use crate::client::Catalogue;
use crate::error::CatalogueError;
use pokedex_core::catalogue::CreatureSummary;

/// Every catalogue reference, fetched once at startup and never mutated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCache {
    entries: Vec<CreatureSummary>,
}

impl ReferenceCache {
    pub fn from_entries(entries: Vec<CreatureSummary>) -> Self {
        Self { entries }
    }

    /// Ask for the catalogue size with a one-item request, then fetch the full index
    pub async fn try_build<C: Catalogue>(catalogue: &C) -> Result<Self, CatalogueError> {
        let sizing = catalogue.fetch_index(1, 0).await?;
        log::debug!("Catalogue reports {} entries", sizing.count);

        if sizing.count == 0 {
            return Ok(Self::default());
        }

        let index = catalogue.fetch_index(sizing.count, 0).await?;
        Ok(Self::from_entries(index.results))
    }

    /// Like [`ReferenceCache::try_build`], degrading to an empty cache on failure
    pub async fn build<C: Catalogue>(catalogue: &C) -> Self {
        match Self::try_build(catalogue).await {
            Ok(cache) => {
                log::info!("Reference cache holds {} entries", cache.len());
                cache
            }
            Err(err) => {
                log::warn!("Failed to build reference cache, continuing empty: {err}");
                Self::default()
            }
        }
    }

    pub fn entries(&self) -> &[CreatureSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&CreatureSummary> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&CreatureSummary> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Largest `k` such that ids `1..=k` are all present
    ///
    /// The catalogue appends alternate forms with ids far beyond the main
    /// sequence, so the entry count alone overstates the navigable range.
    pub fn contiguous_max_id(&self) -> Option<u32> {
        let mut ids: Vec<u32> = self.entries.iter().map(|entry| entry.id).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut max = 0;
        for id in ids {
            if id == max + 1 {
                max = id;
            } else if id > max + 1 {
                break;
            }
        }

        (max > 0).then_some(max)
    }
}
