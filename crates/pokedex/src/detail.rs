use crate::client::{Catalogue, RequestGroup};
use crate::context::AppContext;
use crate::prelude::{println, *};
use colored::Colorize;
use pokedex_core::catalogue::{capitalize, display_id, CreatureDetail};
use pokedex_core::detail::{parse_detail_id, DetailNav, DetailState};
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Args, Clone)]
pub struct ShowOptions {
    /// Numeric Pokémon id (e.g. "25")
    pub id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// A detail request in flight
#[derive(Debug)]
pub struct DetailLoad {
    token: CancellationToken,
    id: u32,
}

/// Single-entity view with bounded prev/next navigation
pub struct DetailPipeline<C> {
    ctx: AppContext<C>,
    state: Option<DetailState>,
    loading: bool,
    group: RequestGroup,
}

impl<C: Catalogue> DetailPipeline<C> {
    pub fn new(ctx: AppContext<C>) -> Self {
        Self {
            ctx,
            state: None,
            loading: false,
            group: RequestGroup::default(),
        }
    }

    pub fn state(&self) -> Option<&DetailState> {
        self.state.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn max_id(&self) -> u32 {
        self.ctx.max_id()
    }

    fn begin_id(&mut self, id: u32) -> DetailLoad {
        self.loading = true;
        DetailLoad {
            token: self.group.begin(),
            id,
        }
    }

    /// Start loading a user-supplied id, superseding any load in flight
    ///
    /// A malformed id settles to `NotFound` right away and returns `None`.
    pub fn begin_load(&mut self, input: &str) -> Option<DetailLoad> {
        match parse_detail_id(input) {
            Some(id) => Some(self.begin_id(id)),
            None => {
                self.cancel();
                log::warn!("{}", CatalogueError::InvalidId(input.to_string()));
                self.state = Some(DetailState::NotFound {
                    requested: input.to_string(),
                });
                None
            }
        }
    }

    fn nav(&self) -> Option<DetailNav> {
        match &self.state {
            Some(DetailState::Loaded { nav, .. }) => Some(*nav),
            _ => None,
        }
    }

    /// Start loading the previous id; `None` when navigation is refused
    pub fn begin_previous(&mut self) -> Option<DetailLoad> {
        let target = self.nav()?.previous()?;
        Some(self.begin_id(target))
    }

    /// Start loading the next id; `None` when navigation is refused
    pub fn begin_next(&mut self) -> Option<DetailLoad> {
        let target = self.nav()?.next()?;
        Some(self.begin_id(target))
    }

    pub async fn fetch(
        ctx: &AppContext<C>,
        load: &DetailLoad,
    ) -> Result<CreatureDetail, CatalogueError> {
        if let Some(reference) = ctx.cache.get(load.id) {
            log::debug!("Loading details for {} ({})", reference.name, load.id);
        }

        let reference = load.id.to_string();
        tokio::select! {
            _ = load.token.cancelled() => Err(CatalogueError::Cancelled),
            result = ctx.catalogue.fetch_detail(&reference) => result,
        }
    }

    /// Commit a finished load; `None` when a newer load replaced it
    ///
    /// Fetch failures become `NotFound`.
    pub fn commit(
        &mut self,
        load: DetailLoad,
        result: Result<CreatureDetail, CatalogueError>,
    ) -> Option<&DetailState> {
        if load.token.is_cancelled() {
            log::debug!("Discarding superseded detail load for {}", load.id);
            return None;
        }

        self.loading = false;
        let state = match result {
            Ok(detail) => DetailState::Loaded {
                detail,
                nav: DetailNav::new(load.id, self.max_id()),
            },
            Err(err) if err.is_cancelled() => return None,
            Err(err) => {
                log::error!("Error fetching Pokémon details for {}: {err}", load.id);
                DetailState::NotFound {
                    requested: load.id.to_string(),
                }
            }
        };
        Some(self.state.insert(state))
    }

    async fn settle(&mut self, load: DetailLoad) -> Option<&DetailState> {
        let result = Self::fetch(&self.ctx, &load).await;
        self.commit(load, result)
    }

    /// Load the entity for a user-supplied id; anything unusable ends up `NotFound`
    pub async fn load_detail(&mut self, input: &str) -> &DetailState {
        if let Some(load) = self.begin_load(input) {
            self.settle(load).await;
        }
        self.state.get_or_insert_with(|| DetailState::NotFound {
            requested: input.to_string(),
        })
    }

    /// Move to the previous id; `None` when navigation is refused
    #[cfg(test)]
    pub async fn previous(&mut self) -> Option<&DetailState> {
        let load = self.begin_previous()?;
        self.settle(load).await
    }

    /// Move to the next id; `None` when navigation is refused
    #[cfg(test)]
    pub async fn next(&mut self) -> Option<&DetailState> {
        let load = self.begin_next()?;
        self.settle(load).await
    }

    /// Cancel the load in flight
    pub fn cancel(&mut self) {
        self.group.cancel();
        self.loading = false;
    }
}

pub async fn run(options: ShowOptions, global: crate::Global) -> Result<()> {
    let ctx = AppContext::from_global(&global).await?;
    let mut pipeline = DetailPipeline::new(ctx);

    let state = pipeline.load_detail(&options.id).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else {
        print!("{}", format_detail_text(state));
    }

    Ok(())
}

/// Convert a detail state to formatted text with colors
pub fn format_detail_text(state: &DetailState) -> String {
    let mut result = String::new();

    let (detail, nav) = match state {
        DetailState::Loaded { detail, nav } => (detail, nav),
        DetailState::NotFound { requested } => {
            result.push_str(&format!(
                "\n{}\n",
                format!("Pokémon not found: {requested}").yellow()
            ));
            return result;
        }
    };

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&format!(
        "{} {}\n",
        display_id(detail.id).bright_cyan().bold(),
        capitalize(&detail.name).bright_cyan().bold()
    ));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_cyan()));

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Image",
        detail.image_url.as_deref().unwrap_or("(no image)")
    ]);
    table.add_row(prettytable::row!["Height", detail.height]);
    table.add_row(prettytable::row!["Weight", detail.weight]);
    table.add_row(prettytable::row!["Types", detail.types.join(", ")]);
    result.push('\n');
    result.push_str(&table.to_string());

    result.push_str(&format!("\n{}:\n", "To navigate".bright_white().bold()));
    match nav.previous() {
        Some(id) => result.push_str(&format!(
            "  {}: {}\n",
            "Previous".green(),
            format!("pokedex show {id}").cyan()
        )),
        None => result.push_str(&format!("  {}\n", "Previous: unavailable".bright_black())),
    }
    match nav.next() {
        Some(id) => result.push_str(&format!(
            "  {}: {}\n",
            "Next".green(),
            format!("pokedex show {id}").cyan()
        )),
        None => result.push_str(&format!("  {}\n", "Next: unavailable".bright_black())),
    }

    result.push('\n');
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ReferenceCache;
    use crate::context::PipelineConfig;
    use crate::testing::FakeCatalogue;

    fn pipeline(size: u32) -> DetailPipeline<FakeCatalogue> {
        let cache = ReferenceCache::from_entries((1..=size).map(crate::testing::summary).collect());
        DetailPipeline::new(AppContext::with_cache(
            FakeCatalogue::with_range(size),
            cache,
            PipelineConfig::default(),
        ))
    }

    fn loaded_id(state: Option<&DetailState>) -> Option<u32> {
        match state {
            Some(DetailState::Loaded { detail, .. }) => Some(detail.id),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_load_detail() {
        let mut pipeline = pipeline(151);

        let state = pipeline.load_detail("25").await.clone();

        match state {
            DetailState::Loaded { detail, nav } => {
                assert_eq!(detail.id, 25);
                assert_eq!(detail.name, "mon25");
                assert_eq!(detail.height, 50);
                assert_eq!(detail.weight, 250);
                assert_eq!(detail.types, vec!["normal"]);
                assert_eq!(nav.max_id, 151);
            }
            other => panic!("expected loaded state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found_without_request() {
        let mut pipeline = pipeline(151);

        let state = pipeline.load_detail("pikachu").await.clone();

        assert_eq!(
            state,
            DetailState::NotFound {
                requested: "pikachu".to_string()
            }
        );
        assert!(pipeline.ctx.catalogue.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_found() {
        let mut pipeline = pipeline(10);

        let state = pipeline.load_detail("99").await.clone();

        assert!(matches!(state, DetailState::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_next_moves_forward() {
        let mut pipeline = pipeline(151);
        pipeline.load_detail("7").await;

        let next = pipeline.next().await.cloned();

        assert_eq!(loaded_id(next.as_ref()), Some(8));
        assert_eq!(loaded_id(pipeline.state()), Some(8));
    }

    #[tokio::test]
    async fn test_previous_refused_at_first() {
        let mut pipeline = pipeline(151);
        pipeline.load_detail("1").await;
        let before = pipeline.ctx.catalogue.detail_requests();

        assert!(pipeline.previous().await.is_none());
        assert_eq!(pipeline.ctx.catalogue.detail_requests(), before);
        assert_eq!(loaded_id(pipeline.state()), Some(1));
    }

    #[tokio::test]
    async fn test_next_refused_at_last() {
        let mut pipeline = pipeline(151);
        pipeline.load_detail("151").await;
        let before = pipeline.ctx.catalogue.detail_requests();

        assert!(pipeline.next().await.is_none());
        assert_eq!(pipeline.ctx.catalogue.detail_requests(), before);
    }

    #[tokio::test]
    async fn test_navigation_refused_without_loaded_detail() {
        let mut pipeline = pipeline(151);
        pipeline.load_detail("abc").await;

        assert!(pipeline.next().await.is_none());
        assert!(pipeline.previous().await.is_none());
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let mut pipeline = pipeline(151);

        let stale = pipeline.begin_load("5").unwrap();
        let fresh = pipeline.begin_load("6").unwrap();
        assert!(pipeline.is_loading());

        let stale_result = DetailPipeline::fetch(&pipeline.ctx, &stale).await;
        assert!(pipeline.commit(stale, stale_result).is_none());
        assert!(pipeline.is_loading());
        assert!(pipeline.state().is_none());

        let fresh_result = DetailPipeline::fetch(&pipeline.ctx, &fresh).await;
        pipeline.commit(fresh, fresh_result);
        assert_eq!(loaded_id(pipeline.state()), Some(6));
        assert!(!pipeline.is_loading());
    }

    #[test]
    fn test_format_detail_text_loaded() {
        let state = DetailState::Loaded {
            detail: crate::testing::detail(1),
            nav: DetailNav::new(1, 151),
        };

        let formatted = format_detail_text(&state);

        assert!(formatted.contains("#001"));
        assert!(formatted.contains("Mon1"));
        assert!(formatted.contains("Height"));
        assert!(formatted.contains("Weight"));
        assert!(formatted.contains("normal"));
        assert!(formatted.contains("Previous: unavailable"));
        assert!(formatted.contains("pokedex show 2"));
    }

    #[test]
    fn test_format_detail_text_not_found() {
        let state = DetailState::NotFound {
            requested: "abc".to_string(),
        };

        let formatted = format_detail_text(&state);

        assert!(formatted.contains("Pokémon not found: abc"));
    }
}
