//! Core library for pokedex
//!
//! This crate implements the **Functional Core** of the pokedex application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`pokedex_core`** (this crate): catalogue records and pure derivations with zero I/O
//! - **`pokedex`**: HTTP fetching, view pipelines and the CLI (the Imperative Shell)
//!
//! Every function here is deterministic and is tested with fixture data only.
//! The shell fetches from the catalogue API, hands the records to these
//! functions, and renders whatever comes back.
//!
//! # Module Organization
//!
//! - [`catalogue`]: wire models for the PokeAPI endpoints and their transformation into records
//! - [`list`]: search, sort and pagination of the reference cache
//! - [`gallery`]: infinite-scroll batching and the multi-type intersection filter
//! - [`detail`]: identifier parsing and prev/next navigation bounds
//! - [`pagination`]: page arithmetic with clamping
//!
//! # Example Usage
//!
//! ```rust
//! use pokedex_core::catalogue::CreatureSummary;
//! use pokedex_core::list::{recompute, ListState, SortKey, DEFAULT_PAGE_SIZE};
//!
//! let cache = vec![
//!     CreatureSummary { name: "venusaur".into(), url: String::new(), id: 3 },
//!     CreatureSummary { name: "bulbasaur".into(), url: String::new(), id: 1 },
//! ];
//!
//! let mut state = ListState::default();
//! state.set_search_term("saur");
//! state.set_sort(SortKey::Name);
//!
//! let view = recompute(&cache, &state, DEFAULT_PAGE_SIZE);
//! assert_eq!(view.refs[0].name, "bulbasaur");
//! assert_eq!(view.pagination.total_pages, 1);
//! ```

pub mod catalogue;
pub mod detail;
pub mod gallery;
pub mod list;
pub mod pagination;
