use crate::client::{fetch_details, BatchOutcome, Catalogue, LoadOutcome, RequestGroup};
use crate::context::AppContext;
use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use pokedex_core::catalogue::{capitalize, display_id, CreatureDetail, CreatureSummary};
use pokedex_core::list::{filter_and_sort, recompute, ListState, ListView, SortKey, SortOrder};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Args, Clone)]
#[command(after_help = "EXAMPLES:
  # First page, sorted by id:
  pokedex list

  # Everything whose name contains \"saur\", sorted by name:
  pokedex list --search saur --sort name

  # Third page in descending id order:
  pokedex list --desc --page 3")]
pub struct ListOptions {
    /// Case-insensitive substring to match against names
    #[arg(short, long)]
    pub search: Option<String>,

    /// Sort key: name or id
    #[arg(long, default_value = "id")]
    pub sort: SortKey,

    /// Sort in descending order
    #[arg(long)]
    pub desc: bool,

    /// Page number (1-indexed, clamped to the available pages)
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Everything the list view renders
#[derive(Debug, Serialize, Clone)]
pub struct ListPageOutput {
    #[serde(flatten)]
    pub view: ListView,
    pub pokemon: Vec<CreatureDetail>,
    pub failed: usize,
    pub loading: bool,
}

/// A page-detail request in flight
#[derive(Debug)]
pub struct PageLoad {
    token: CancellationToken,
    refs: Vec<CreatureSummary>,
}

/// Search, sort and paginate the reference cache; fetch details for the visible page
pub struct ListPipeline<C> {
    ctx: AppContext<C>,
    state: ListState,
    page_details: Vec<CreatureDetail>,
    failed: usize,
    loading: bool,
    group: RequestGroup,
}

impl<C: Catalogue> ListPipeline<C> {
    pub fn new(ctx: AppContext<C>) -> Self {
        Self {
            ctx,
            state: ListState::default(),
            page_details: Vec::new(),
            failed: 0,
            loading: false,
            group: RequestGroup::default(),
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn page_details(&self) -> &[CreatureDetail] {
        &self.page_details
    }

    pub fn view(&self) -> ListView {
        recompute(self.ctx.cache.entries(), &self.state, self.ctx.config.page_size)
    }

    fn filtered_count(&self) -> usize {
        filter_and_sort(self.ctx.cache.entries(), &self.state).len()
    }

    pub fn set_search_term(&mut self, text: &str) {
        self.state.set_search_term(text);
    }

    pub fn set_sort(&mut self, key: SortKey) {
        self.state.set_sort(key);
    }

    pub fn go_to_page(&mut self, page: usize) {
        let count = self.filtered_count();
        self.state.go_to_page(page, count, self.ctx.config.page_size);
    }

    pub fn next_page(&mut self) {
        let count = self.filtered_count();
        self.state.next_page(count, self.ctx.config.page_size);
    }

    pub fn previous_page(&mut self) {
        let count = self.filtered_count();
        self.state.previous_page(count, self.ctx.config.page_size);
    }

    /// Start loading the current page, superseding any load in flight
    pub fn begin_page_load(&mut self) -> PageLoad {
        let token = self.group.begin();
        self.loading = true;
        PageLoad {
            token,
            refs: self.view().refs,
        }
    }

    /// Commit a finished page load unless a newer one replaced it
    pub fn commit_page(
        &mut self,
        load: PageLoad,
        result: Result<BatchOutcome, CatalogueError>,
    ) -> LoadOutcome {
        if load.token.is_cancelled() {
            log::debug!("Discarding superseded page load");
            return LoadOutcome::Superseded;
        }

        self.loading = false;
        match result {
            Ok(outcome) => {
                self.failed = outcome.failed.len();
                self.page_details = outcome.details;
                LoadOutcome::Loaded {
                    count: self.page_details.len(),
                    failed: self.failed,
                }
            }
            Err(err) if err.is_cancelled() => LoadOutcome::Superseded,
            Err(err) => {
                log::error!("Error fetching details for page {}: {}", self.state.page, err);
                self.page_details.clear();
                self.failed = load.refs.len();
                LoadOutcome::Failed(err.to_string())
            }
        }
    }

    /// Fetch details for every entry of a page load as one parallel group
    ///
    /// Borrows only the context, so the request can run on its own task.
    pub async fn fetch_page(
        ctx: &AppContext<C>,
        load: &PageLoad,
    ) -> Result<BatchOutcome, CatalogueError> {
        if load.refs.is_empty() {
            return Ok(BatchOutcome::default());
        }
        fetch_details(ctx.catalogue.as_ref(), &load.refs, &load.token).await
    }

    pub async fn load_page(&mut self) -> LoadOutcome {
        let load = self.begin_page_load();
        let result = Self::fetch_page(&self.ctx, &load).await;
        self.commit_page(load, result)
    }

    /// Cancel the page load in flight
    pub fn cancel(&mut self) {
        self.group.cancel();
        self.loading = false;
    }

    pub fn output(&self) -> ListPageOutput {
        ListPageOutput {
            view: self.view(),
            pokemon: self.page_details.clone(),
            failed: self.failed,
            loading: self.loading,
        }
    }
}

pub async fn run(options: ListOptions, global: crate::Global) -> Result<()> {
    let ctx = AppContext::from_global(&global).await?;

    if global.verbose {
        eprintln!("Reference cache: {} entries", ctx.cache.len());
    }

    let mut pipeline = ListPipeline::new(ctx);
    apply_options(&mut pipeline, &options);

    if let LoadOutcome::Failed(message) = pipeline.load_page().await {
        eprintln!("{}", f!("Failed to load page: {message}").red());
    }

    let output = pipeline.output();
    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_list_text(&output));
    }

    Ok(())
}

fn apply_options<C: Catalogue>(pipeline: &mut ListPipeline<C>, options: &ListOptions) {
    if let Some(search) = &options.search {
        pipeline.set_search_term(search);
    }
    if pipeline.state().sort_key != options.sort {
        pipeline.set_sort(options.sort);
    }
    if options.desc {
        pipeline.set_sort(options.sort);
    }
    pipeline.go_to_page(options.page);
}

fn column_label(label: &str, key: SortKey, view: &ListView) -> String {
    if view.sort_key == key {
        format!("{label} {}", view.sort_order.arrow())
    } else {
        label.to_string()
    }
}

fn sort_flag(view: &ListView) -> String {
    let key = match view.sort_key {
        SortKey::Name => "name",
        SortKey::Id => "id",
    };
    match view.sort_order {
        SortOrder::Asc => format!("--sort {key}"),
        SortOrder::Desc => format!("--sort {key} --desc"),
    }
}

/// Quote a value for pasting into a shell command
fn quote_arg(value: &str) -> String {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_else(|_| format!("{value:?}"))
}

/// Convert a list page to formatted text with colors
pub fn format_list_text(output: &ListPageOutput) -> String {
    let view = &output.view;
    let info = &view.pagination;
    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&format!(
        "{}\n",
        format!(
            "POKEDEX (Page {} of {})",
            info.current_page, info.total_pages
        )
        .bright_cyan()
        .bold()
    ));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_cyan()));

    if !view.search_term.is_empty() {
        result.push_str(&format!(
            "{}: {} ({} matches)\n",
            "Search".green(),
            view.search_term.bright_white(),
            view.filtered_count
        ));
    }

    if output.loading {
        result.push_str(&format!("\n{}\n", "Loading page...".bright_black()));
    } else if output.pokemon.is_empty() {
        result.push_str(&format!("\n{}\n", "No Pokémon on this page.".yellow()));
    } else {
        let mut table = new_table();
        table.add_row(prettytable::row![
            column_label("ID", SortKey::Id, view),
            column_label("Name", SortKey::Name, view),
            "Types"
        ]);
        for pokemon in &output.pokemon {
            table.add_row(prettytable::row![
                display_id(pokemon.id),
                capitalize(&pokemon.name),
                pokemon.types.join(", ")
            ]);
        }
        result.push('\n');
        result.push_str(&table.to_string());
    }

    if output.failed > 0 {
        result.push_str(&format!(
            "\n{}\n",
            format!("{} entries could not be loaded.", output.failed).yellow()
        ));
    }

    result.push_str(&format!("\n{}:\n", "To navigate".bright_white().bold()));
    let search = if view.search_term.is_empty() {
        String::new()
    } else {
        format!(" --search {}", quote_arg(&view.search_term))
    };
    if info.has_next {
        result.push_str(&format!(
            "  {}: {}\n",
            "Next page".green(),
            format!(
                "pokedex list{search} {} --page {}",
                sort_flag(view),
                info.current_page + 1
            )
            .cyan()
        ));
    }
    if info.has_previous {
        result.push_str(&format!(
            "  {}: {}\n",
            "Previous page".green(),
            format!(
                "pokedex list{search} {} --page {}",
                sort_flag(view),
                info.current_page - 1
            )
            .cyan()
        ));
    }
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
