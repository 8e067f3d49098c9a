use crate::client::{
    fetch_details, fetch_type_member_sets, BatchOutcome, Catalogue, HttpCatalogue, LoadOutcome,
    RequestGroup,
};
use crate::context::AppContext;
use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use pokedex_core::catalogue::{capitalize, display_id, CreatureDetail, CreatureSummary};
use pokedex_core::gallery::{
    batch_refs, intersect_members, select_from_cache, GalleryState, ScrollMetrics,
};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # First batch of the unfiltered gallery:
  pokedex gallery

  # Scroll three times (four batches):
  pokedex gallery --batches 4

  # Only Pokémon that are both fire and flying:
  pokedex gallery --types fire,flying")]
pub struct GalleryOptions {
    /// Type filters; an entity must belong to every listed type
    #[arg(short, long, value_delimiter = ',')]
    pub types: Vec<String>,

    /// Number of infinite-scroll batches to load when no type filter is set
    #[arg(
        short,
        long,
        default_value = "1",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub batches: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct TypesOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Everything the gallery renders
#[derive(Debug, Serialize, Clone)]
pub struct GalleryOutput {
    pub selected_types: Vec<String>,
    pub offset: usize,
    pub exhausted: bool,
    pub loading: bool,
    pub filtering: bool,
    pub pokemon: Vec<CreatureDetail>,
}

#[derive(Debug)]
pub struct BatchLoad {
    token: CancellationToken,
    offset: usize,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    /// References the batch asked details for; zero means the catalogue ended
    requested: usize,
    outcome: BatchOutcome,
}

#[derive(Debug)]
pub struct FilterLoad {
    token: CancellationToken,
    types: Vec<String>,
}

/// Infinite-scroll gallery with a multi-type intersection filter
pub struct GalleryPipeline<C> {
    ctx: AppContext<C>,
    state: GalleryState,
    batch_group: RequestGroup,
    filter_group: RequestGroup,
}

impl<C: Catalogue> GalleryPipeline<C> {
    pub fn new(ctx: AppContext<C>) -> Self {
        Self {
            ctx,
            state: GalleryState::default(),
            batch_group: RequestGroup::default(),
            filter_group: RequestGroup::default(),
        }
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn display(&self) -> &[CreatureDetail] {
        self.state.display()
    }

    /// Start the next batch unless one is already in flight
    pub fn begin_batch(&mut self) -> Option<BatchLoad> {
        if self.state.loading || self.state.is_filtered() || self.state.exhausted {
            return None;
        }

        self.state.loading = true;
        Some(BatchLoad {
            token: self.batch_group.begin(),
            offset: self.state.offset,
        })
    }

    /// Start the first batch when the unfiltered gallery is still empty
    pub fn begin_initial_batch(&mut self) -> Option<BatchLoad> {
        if self.state.needs_initial_batch() {
            self.begin_batch()
        } else {
            None
        }
    }

    /// Start the next batch when a scroll event lands near the bottom
    pub fn begin_scroll(&mut self, metrics: ScrollMetrics) -> Option<BatchLoad> {
        if self
            .state
            .should_load_batch(metrics, self.ctx.config.scroll_threshold)
        {
            self.begin_batch()
        } else {
            None
        }
    }

    /// Resolve the batch references and fetch their details
    ///
    /// References come from the reference cache; without one, the index
    /// page for the batch is fetched directly.
    pub async fn run_batch(
        ctx: &AppContext<C>,
        load: &BatchLoad,
    ) -> Result<BatchResult, CatalogueError> {
        let batch_size = ctx.config.batch_size;
        let catalogue = ctx.catalogue.as_ref();

        let refs: Vec<CreatureSummary> = if ctx.cache.is_empty() {
            let page = tokio::select! {
                _ = load.token.cancelled() => return Err(CatalogueError::Cancelled),
                page = catalogue.fetch_index(batch_size, load.offset) => page?,
            };
            page.results
        } else {
            batch_refs(ctx.cache.entries(), load.offset, batch_size).to_vec()
        };

        if refs.is_empty() {
            return Ok(BatchResult::default());
        }

        let outcome = fetch_details(catalogue, &refs, &load.token).await?;
        Ok(BatchResult {
            requested: refs.len(),
            outcome,
        })
    }

    pub fn commit_batch(
        &mut self,
        load: BatchLoad,
        result: Result<BatchResult, CatalogueError>,
    ) -> LoadOutcome {
        self.state.loading = false;

        if load.token.is_cancelled() {
            log::debug!("Discarding cancelled batch at offset {}", load.offset);
            return LoadOutcome::Superseded;
        }

        match result {
            Ok(result) if result.requested == 0 => {
                log::info!("Reached the end of the catalogue at offset {}", load.offset);
                self.state.exhausted = true;
                LoadOutcome::Loaded {
                    count: 0,
                    failed: 0,
                }
            }
            Ok(result) => {
                let failed = result.outcome.failed.len();
                let count = self
                    .state
                    .append_batch(result.outcome.details, self.ctx.config.batch_size);
                LoadOutcome::Loaded { count, failed }
            }
            Err(err) if err.is_cancelled() => LoadOutcome::Superseded,
            Err(err) => {
                log::error!("Error fetching batch at offset {}: {}", load.offset, err);
                LoadOutcome::Failed(err.to_string())
            }
        }
    }

    async fn load_batch(&mut self, load: Option<BatchLoad>) -> LoadOutcome {
        let Some(load) = load else {
            return LoadOutcome::Skipped;
        };
        let result = Self::run_batch(&self.ctx, &load).await;
        self.commit_batch(load, result)
    }

    /// Load the first batch when the unfiltered gallery is still empty
    pub async fn ensure_initial_batch(&mut self) -> LoadOutcome {
        let load = self.begin_initial_batch();
        self.load_batch(load).await
    }

    /// React to a scroll event; loads the next batch near the bottom
    pub async fn on_scroll(&mut self, metrics: ScrollMetrics) -> LoadOutcome {
        let load = self.begin_scroll(metrics);
        self.load_batch(load).await
    }

    /// Start a filter computation for the current selection, cancelling the previous one
    ///
    /// Returns `None` when no type is selected.
    pub fn begin_filter(&mut self) -> Option<FilterLoad> {
        let token = self.filter_group.begin();

        if !self.state.is_filtered() {
            self.filter_group.cancel();
            self.state.filtering = false;
            self.state.filtered.clear();
            return None;
        }

        self.state.filtering = true;
        Some(FilterLoad {
            token,
            types: self.state.selected_types.clone(),
        })
    }

    /// Intersect the member sets of the selected types and fetch the survivors
    pub async fn run_filter(
        ctx: &AppContext<C>,
        load: &FilterLoad,
    ) -> Result<BatchOutcome, CatalogueError> {
        let catalogue = ctx.catalogue.as_ref();
        let sets = fetch_type_member_sets(catalogue, &load.types, &load.token).await?;

        let Some(names) = intersect_members(&sets) else {
            return Ok(BatchOutcome::default());
        };

        let refs = select_from_cache(ctx.cache.entries(), &names);
        log::debug!(
            "Types {:?} intersect to {} names, {} in the reference cache",
            load.types,
            names.len(),
            refs.len()
        );

        if refs.is_empty() {
            return Ok(BatchOutcome::default());
        }

        fetch_details(catalogue, &refs, &load.token).await
    }

    pub fn commit_filter(
        &mut self,
        load: FilterLoad,
        result: Result<BatchOutcome, CatalogueError>,
    ) -> LoadOutcome {
        if load.token.is_cancelled() {
            log::debug!("Discarding superseded filter for {:?}", load.types);
            return LoadOutcome::Superseded;
        }

        self.state.filtering = false;
        match result {
            Ok(outcome) => {
                let failed = outcome.failed.len();
                self.state.filtered = outcome.details;
                LoadOutcome::Loaded {
                    count: self.state.filtered.len(),
                    failed,
                }
            }
            Err(err) if err.is_cancelled() => LoadOutcome::Superseded,
            Err(err) => {
                log::error!("Error fetching filtered Pokémon: {err}");
                self.state.filtered.clear();
                LoadOutcome::Failed(err.to_string())
            }
        }
    }

    async fn apply_filter(&mut self) -> LoadOutcome {
        match self.begin_filter() {
            Some(load) => {
                let result = Self::run_filter(&self.ctx, &load).await;
                self.commit_filter(load, result)
            }
            None => self.ensure_initial_batch().await,
        }
    }

    /// Select the type if absent, deselect it if present
    ///
    /// Only updates the selection; follow with [`GalleryPipeline::begin_filter`].
    pub fn toggle_selection(&mut self, type_name: &str) {
        self.state.toggle_type(type_name);
    }

    /// Select the type if absent, deselect it if present, then refilter
    #[cfg(test)]
    pub async fn toggle_type(&mut self, type_name: &str) -> LoadOutcome {
        self.toggle_selection(type_name);
        self.apply_filter().await
    }

    /// Replace the whole selection, then refilter
    pub async fn set_types(&mut self, types: &[String]) -> LoadOutcome {
        self.state.select_types(types);
        self.apply_filter().await
    }

    /// Cancel every request group in flight
    pub fn cancel(&mut self) {
        self.batch_group.cancel();
        self.filter_group.cancel();
        self.state.loading = false;
        self.state.filtering = false;
    }

    pub fn output(&self) -> GalleryOutput {
        GalleryOutput {
            selected_types: self.state.selected_types.clone(),
            offset: self.state.offset,
            exhausted: self.state.exhausted,
            loading: self.state.loading,
            filtering: self.state.filtering,
            pokemon: self.display().to_vec(),
        }
    }
}

pub async fn run(options: GalleryOptions, global: crate::Global) -> Result<()> {
    let ctx = AppContext::from_global(&global).await?;
    let mut pipeline = GalleryPipeline::new(ctx);

    if options.types.is_empty() {
        report(pipeline.ensure_initial_batch().await);
        for _ in 1..options.batches {
            // Each extra batch stands in for one scroll to the bottom.
            let outcome = pipeline.on_scroll(ScrollMetrics::at_bottom(0.0)).await;
            if global.verbose {
                eprintln!("Scroll: {:?}", outcome);
            }
            report(outcome);
        }
    } else {
        report(pipeline.set_types(&options.types).await);
    }

    let output = pipeline.output();
    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_gallery_text(&output, options.batches));
    }

    Ok(())
}

pub async fn run_types(options: TypesOptions, global: crate::Global) -> Result<()> {
    let catalogue = HttpCatalogue::new(
        &global.api_base,
        global.timeout_secs.map(Duration::from_secs),
    )?;
    let types = catalogue
        .fetch_type_names()
        .await
        .map_err(|e| eyre!("Failed to fetch type names: {}", e))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&types)?);
    } else {
        println!("{}", format_types_text(&types));
    }

    Ok(())
}

fn report(outcome: LoadOutcome) {
    match outcome {
        LoadOutcome::Failed(message) => {
            eprintln!("{}", f!("Failed to load Pokémon: {message}").red())
        }
        LoadOutcome::Loaded { failed, .. } if failed > 0 => {
            eprintln!("{}", f!("{failed} entries could not be loaded.").yellow())
        }
        _ => {}
    }
}

pub fn format_types_text(types: &[String]) -> String {
    let mut result = format!("{}\n", "TYPES".bright_cyan().bold());
    for type_name in types {
        result.push_str(&format!("  {}\n", type_name.green()));
    }
    result.push_str(&format!(
        "\n{}: {}",
        "Filter the gallery".bright_white().bold(),
        "pokedex gallery --types <type>[,<type>...]".cyan()
    ));
    result
}

/// Convert gallery output to formatted text with colors
pub fn format_gallery_text(output: &GalleryOutput, batches: usize) -> String {
    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    let title = if output.selected_types.is_empty() {
        format!("POKEDEX GALLERY ({} loaded)", output.pokemon.len())
    } else {
        format!(
            "POKEDEX GALLERY [{}] ({} matches)",
            output.selected_types.join(" + "),
            output.pokemon.len()
        )
    };
    result.push_str(&format!("{}\n", title.bright_cyan().bold()));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_cyan()));

    if output.filtering {
        result.push_str(&format!("\n{}\n", "Filtering by type...".bright_black()));
    } else if output.pokemon.is_empty() && !output.loading {
        result.push_str(&format!("\n{}\n", "No Pokémon to show.".yellow()));
    }

    for pokemon in &output.pokemon {
        result.push_str(&format!(
            "\n{} {}\n",
            display_id(pokemon.id).yellow().bold(),
            capitalize(&pokemon.name).white().bold()
        ));
        result.push_str(&format!(
            "    {}: {}\n",
            "Types".green(),
            pokemon.types.join(", ")
        ));
        if let Some(image) = &pokemon.image_url {
            result.push_str(&format!("    {}: {}\n", "Image".green(), image.cyan()));
        }
    }

    result.push_str(&format!("\n{}:\n", "To browse".bright_white().bold()));
    if output.selected_types.is_empty() && !output.exhausted {
        result.push_str(&format!(
            "  {}: {}\n",
            "Load more".green(),
            format!("pokedex gallery --batches {}", batches + 1).cyan()
        ));
    }
    if !output.selected_types.is_empty() {
        result.push_str(&format!(
            "  {}: {}\n",
            "Clear filter".green(),
            "pokedex gallery".cyan()
        ));
    }
    result.push_str(&format!(
        "  {}: {}\n",
        "Filter by type".green(),
        "pokedex gallery --types <type>[,<type>...]".cyan()
    ));
    if let Some(first) = output.pokemon.first() {
        result.push_str(&format!(
            "  {}: {}\n",
            "Details".green(),
            format!("pokedex show {}", first.id).cyan()
        ));
    }

    result.push('\n');
    result
}
