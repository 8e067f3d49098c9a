//! In-memory catalogue used by the pipeline tests

use crate::client::{Catalogue, IndexPage};
use crate::error::CatalogueError;
use pokedex_core::catalogue::{parse_id_from_url, CreatureDetail, CreatureSummary};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn summary(id: u32) -> CreatureSummary {
    CreatureSummary {
        name: format!("mon{id}"),
        url: format!("https://fake.test/api/v2/pokemon/{id}/"),
        id,
    }
}

pub fn detail(id: u32) -> CreatureDetail {
    CreatureDetail {
        id,
        name: format!("mon{id}"),
        image_url: Some(format!("https://fake.test/sprites/{id}.png")),
        types: vec!["normal".to_string()],
        height: id * 2,
        weight: id * 10,
    }
}

#[derive(Debug, Default)]
pub struct FakeCatalogue {
    entries: Vec<CreatureSummary>,
    types: HashMap<String, HashSet<String>>,
    failing_details: HashSet<u32>,
    failing_index: bool,
    /// Types whose next member request never resolves
    stalled_types: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeCatalogue {
    /// Catalogue with ids `1..=size` named `mon{id}`
    pub fn with_range(size: u32) -> Self {
        Self {
            entries: (1..=size).map(summary).collect(),
            ..Self::default()
        }
    }

    pub fn with_entries(entries: Vec<CreatureSummary>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn with_type(mut self, type_name: &str, ids: &[u32]) -> Self {
        let names = ids.iter().map(|id| format!("mon{id}")).collect();
        self.types.insert(type_name.to_string(), names);
        self
    }

    pub fn failing_detail(mut self, id: u32) -> Self {
        self.failing_details.insert(id);
        self
    }

    /// The first member request for `type_name` hangs until it is cancelled
    pub fn stalling_type(self, type_name: &str) -> Self {
        self.stalled_types
            .lock()
            .unwrap()
            .insert(type_name.to_string());
        self
    }

    pub fn failing_index(mut self) -> Self {
        self.failing_index = true;
        self
    }

    /// Requests seen so far, as `kind:argument`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn detail_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with("detail:"))
            .count()
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }

    fn resolve(&self, reference: &str) -> Option<&CreatureSummary> {
        let id = parse_id_from_url(reference).or_else(|| reference.parse().ok());
        self.entries.iter().find(|entry| match id {
            Some(id) => entry.id == id,
            None => entry.name == reference,
        })
    }
}

impl Catalogue for FakeCatalogue {
    async fn fetch_index(&self, limit: usize, offset: usize) -> Result<IndexPage, CatalogueError> {
        self.record(format!("index:{limit}:{offset}"));
        if self.failing_index {
            return Err(CatalogueError::Network("connection refused".to_string()));
        }

        Ok(IndexPage {
            count: self.entries.len(),
            results: self
                .entries
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn fetch_detail(&self, reference: &str) -> Result<CreatureDetail, CatalogueError> {
        self.record(format!("detail:{reference}"));
        let entry = self
            .resolve(reference)
            .ok_or_else(|| CatalogueError::NotFound(reference.to_string()))?;

        if self.failing_details.contains(&entry.id) {
            return Err(CatalogueError::Network("connection reset".to_string()));
        }

        Ok(CreatureDetail {
            name: entry.name.clone(),
            ..detail(entry.id)
        })
    }

    async fn fetch_type_members(
        &self,
        type_name: &str,
    ) -> Result<HashSet<String>, CatalogueError> {
        self.record(format!("type:{type_name}"));
        let stalled = self.stalled_types.lock().unwrap().remove(type_name);
        if stalled {
            std::future::pending::<()>().await;
        }
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| CatalogueError::NotFound(type_name.to_string()))
    }

    async fn fetch_type_names(&self) -> Result<Vec<String>, CatalogueError> {
        self.record("types".to_string());
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
