use crate::client::{BatchOutcome, Catalogue, LoadOutcome};
use crate::context::AppContext;
use crate::detail::{format_detail_text, DetailLoad, DetailPipeline};
use crate::gallery::{
    format_gallery_text, format_types_text, BatchLoad, BatchResult, FilterLoad, GalleryPipeline,
};
use crate::list::{format_list_text, ListPipeline, PageLoad};
use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use pokedex_core::catalogue::CreatureDetail;
use pokedex_core::gallery::ScrollMetrics;
use pokedex_core::list::SortKey;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "Commands:
  list                 show the list view
  search [text]        filter the list by name (no text clears the filter)
  sort <name|id>       sort the list; repeating the key flips the order
  page <n>             jump to a list page
  next | prev          next/previous list page or Pokémon, depending on the view
  gallery              show the gallery
  scroll               scroll the gallery to the bottom
  type <name>          toggle a gallery type filter
  types                list the available types
  show <id|name>       open the detail view
  help                 show this message
  quit                 leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    List,
    Search(String),
    Sort(SortKey),
    Page(usize),
    Next,
    Previous,
    Gallery,
    Scroll,
    Type(String),
    Types,
    Show(String),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<BrowseCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "list" | "l" => BrowseCommand::List,
        "search" | "s" | "/" => BrowseCommand::Search(rest.to_string()),
        "sort" => BrowseCommand::Sort(rest.parse()?),
        "page" | "p" => BrowseCommand::Page(
            rest.parse()
                .map_err(|_| format!("Invalid page number: {rest}"))?,
        ),
        "next" | "n" => BrowseCommand::Next,
        "prev" | "previous" => BrowseCommand::Previous,
        "gallery" | "g" => BrowseCommand::Gallery,
        "scroll" => BrowseCommand::Scroll,
        "type" | "t" if !rest.is_empty() => BrowseCommand::Type(rest.to_lowercase()),
        "type" | "t" => return Err("Usage: type <name>".to_string()),
        "types" => BrowseCommand::Types,
        "show" | "open" if !rest.is_empty() => BrowseCommand::Show(rest.to_string()),
        "show" | "open" => return Err("Usage: show <id|name>".to_string()),
        "help" | "?" => BrowseCommand::Help,
        "quit" | "exit" | "q" => BrowseCommand::Quit,
        "" => return Err(String::new()),
        other => return Err(format!("Unknown command: {other}. Type 'help' for a list.")),
    };

    Ok(command)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    List,
    Gallery,
    Detail,
}

impl View {
    pub fn label(self) -> &'static str {
        match self {
            View::List => "list",
            View::Gallery => "gallery",
            View::Detail => "detail",
        }
    }
}

/// A finished request group, sent back from its task
#[derive(Debug)]
pub enum Completion {
    Page(PageLoad, Result<BatchOutcome, CatalogueError>),
    Batch(BatchLoad, Result<BatchResult, CatalogueError>),
    Filter(FilterLoad, Result<BatchOutcome, CatalogueError>),
    Detail(DetailLoad, Result<CreatureDetail, CatalogueError>),
    Types(Result<Vec<String>, CatalogueError>),
}

/// The three views sharing one context, driven by line commands
///
/// Commands only begin loads. Each request group runs on its own task and
/// reports back through [`Session::next_completion`], so input keeps flowing
/// while requests are in flight and a newer command can supersede an older
/// load.
pub struct Session<C> {
    ctx: AppContext<C>,
    list: ListPipeline<C>,
    gallery: GalleryPipeline<C>,
    detail: DetailPipeline<C>,
    view: View,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<C: Catalogue> Session<C> {
    pub fn new(ctx: AppContext<C>) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        Self {
            list: ListPipeline::new(ctx.clone()),
            gallery: GalleryPipeline::new(ctx.clone()),
            detail: DetailPipeline::new(ctx.clone()),
            ctx,
            view: View::List,
            completions_tx,
            completions,
            in_flight: 0,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Whether any request group has not reported back yet
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Whether the view on screen is waiting for its own request group
    pub fn view_loading(&self) -> bool {
        match self.view {
            View::List => self.list.is_loading(),
            View::Gallery => {
                let state = self.gallery.state();
                state.loading || state.filtering
            }
            View::Detail => self.detail.is_loading(),
        }
    }

    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions.recv().await
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }

    /// Apply one command; returns the text to show right away
    pub fn handle(&mut self, command: BrowseCommand) -> Option<String> {
        let text = match command {
            BrowseCommand::List => self.start_page_load(),
            BrowseCommand::Search(text) => {
                self.list.set_search_term(&text);
                self.start_page_load()
            }
            BrowseCommand::Sort(key) => {
                self.list.set_sort(key);
                self.start_page_load()
            }
            BrowseCommand::Page(page) => {
                self.list.go_to_page(page);
                self.start_page_load()
            }
            BrowseCommand::Next | BrowseCommand::Previous => {
                self.step(command == BrowseCommand::Next)
            }
            BrowseCommand::Gallery => {
                self.view = View::Gallery;
                match self.gallery.begin_initial_batch() {
                    Some(load) => self.start_batch(load),
                    None => self.render_gallery(None),
                }
            }
            BrowseCommand::Scroll => {
                self.view = View::Gallery;
                match self.gallery.begin_scroll(ScrollMetrics::at_bottom(0.0)) {
                    Some(load) => self.start_batch(load),
                    None => self.scroll_refused(),
                }
            }
            BrowseCommand::Type(type_name) => {
                self.view = View::Gallery;
                self.gallery.toggle_selection(&type_name);
                self.start_filter()
            }
            BrowseCommand::Types => {
                let ctx = self.ctx.clone();
                self.spawn(async move { Completion::Types(ctx.catalogue.fetch_type_names().await) });
                status("Loading types...")
            }
            BrowseCommand::Show(target) => {
                self.view = View::Detail;
                let id = self
                    .ctx
                    .cache
                    .lookup_by_name(&target)
                    .map(|reference| reference.id.to_string())
                    .unwrap_or(target);
                match self.detail.begin_load(&id) {
                    Some(load) => self.start_detail(load),
                    None => self.detail.state().map(format_detail_text).unwrap_or_default(),
                }
            }
            BrowseCommand::Help => HELP.to_string(),
            BrowseCommand::Quit => {
                self.list.cancel();
                self.gallery.cancel();
                self.detail.cancel();
                return None;
            }
        };
        Some(text)
    }

    /// Commit a finished request group; returns the refreshed view when it is on screen
    pub fn complete(&mut self, completion: Completion) -> Option<String> {
        self.in_flight = self.in_flight.saturating_sub(1);

        match completion {
            Completion::Page(load, result) => {
                let outcome = self.list.commit_page(load, result);
                if outcome == LoadOutcome::Superseded || self.view != View::List {
                    return None;
                }
                let mut text = failure_line("Failed to load page", &outcome);
                text.push_str(&format_list_text(&self.list.output()));
                Some(text)
            }
            Completion::Batch(load, result) => {
                let outcome = self.gallery.commit_batch(load, result);
                self.gallery_completed(outcome)
            }
            Completion::Filter(load, result) => {
                let outcome = self.gallery.commit_filter(load, result);
                self.gallery_completed(outcome)
            }
            Completion::Detail(load, result) => {
                let state = self.detail.commit(load, result)?;
                (self.view == View::Detail).then(|| format_detail_text(state))
            }
            Completion::Types(Ok(types)) => Some(format_types_text(&types)),
            Completion::Types(Err(err)) => {
                log::error!("Error fetching types: {err}");
                Some(format!("{}", "Could not load the type list.".red()))
            }
        }
    }

    fn start_page_load(&mut self) -> String {
        self.view = View::List;
        let load = self.list.begin_page_load();
        let ctx = self.ctx.clone();
        self.spawn(async move {
            let result = ListPipeline::fetch_page(&ctx, &load).await;
            Completion::Page(load, result)
        });

        let info = self.list.view().pagination;
        status(&f!(
            "Loading page {} of {}...",
            info.current_page,
            info.total_pages.max(1)
        ))
    }

    fn start_batch(&mut self, load: BatchLoad) -> String {
        let ctx = self.ctx.clone();
        self.spawn(async move {
            let result = GalleryPipeline::run_batch(&ctx, &load).await;
            Completion::Batch(load, result)
        });
        status("Loading more Pokémon...")
    }

    fn start_filter(&mut self) -> String {
        let Some(load) = self.gallery.begin_filter() else {
            return match self.gallery.begin_initial_batch() {
                Some(load) => self.start_batch(load),
                None => self.render_gallery(None),
            };
        };

        let ctx = self.ctx.clone();
        self.spawn(async move {
            let result = GalleryPipeline::run_filter(&ctx, &load).await;
            Completion::Filter(load, result)
        });
        status(&f!(
            "Filtering by {}...",
            self.gallery.state().selected_types.join(" + ")
        ))
    }

    fn start_detail(&mut self, load: DetailLoad) -> String {
        let ctx = self.ctx.clone();
        self.spawn(async move {
            let result = DetailPipeline::fetch(&ctx, &load).await;
            Completion::Detail(load, result)
        });
        status("Loading details...")
    }

    fn step(&mut self, forward: bool) -> String {
        match self.view {
            View::List => {
                if forward {
                    self.list.next_page();
                } else {
                    self.list.previous_page();
                }
                self.start_page_load()
            }
            View::Detail => {
                let load = if forward {
                    self.detail.begin_next()
                } else {
                    self.detail.begin_previous()
                };
                match load {
                    Some(load) => self.start_detail(load),
                    None => format!("{}", "No Pokémon in that direction.".yellow()),
                }
            }
            View::Gallery => format!("{}", "Use 'scroll' to load more of the gallery.".yellow()),
        }
    }

    fn scroll_refused(&self) -> String {
        let state = self.gallery.state();
        let message = if state.loading {
            "A batch is already loading."
        } else if state.is_filtered() {
            "Scrolling is paused while a type filter is active."
        } else {
            "The whole catalogue is loaded."
        };
        format!("{}", message.yellow())
    }

    fn gallery_completed(&self, outcome: LoadOutcome) -> Option<String> {
        if outcome == LoadOutcome::Superseded || self.view != View::Gallery {
            return None;
        }
        Some(self.render_gallery(Some(&outcome)))
    }

    fn render_gallery(&self, outcome: Option<&LoadOutcome>) -> String {
        let mut text = match outcome {
            Some(outcome) => failure_line("Failed to load Pokémon", outcome),
            None => String::new(),
        };
        let batches = self.gallery.state().offset / self.ctx.config.batch_size.max(1);
        text.push_str(&format_gallery_text(&self.gallery.output(), batches.max(1)));
        text
    }
}

fn status(message: &str) -> String {
    format!("{}", message.bright_black())
}

fn failure_line(prefix: &str, outcome: &LoadOutcome) -> String {
    match outcome {
        LoadOutcome::Failed(message) => format!("{}\n", f!("{prefix}: {message}").red()),
        _ => String::new(),
    }
}

fn prompt<C: Catalogue>(session: &Session<C>) -> Result<()> {
    let busy = if session.view_loading() { " …" } else { "" };
    print!("pokedex [{}{busy}]> ", session.view().label());
    std::io::stdout().flush().context("Failed to flush stdout")
}

pub async fn run(global: crate::Global) -> Result<()> {
    let ctx = AppContext::from_global(&global).await?;
    let mut session = Session::new(ctx);

    if let Some(text) = session.handle(BrowseCommand::List) {
        println!("{text}");
    }
    println!("{}", "Type 'help' for commands.".bright_black());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(&session)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };

                match parse_command(&line) {
                    Ok(BrowseCommand::Quit) => {
                        session.handle(BrowseCommand::Quit);
                        break;
                    }
                    Ok(command) => {
                        if let Some(text) = session.handle(command) {
                            println!("{text}");
                        }
                    }
                    Err(message) if message.is_empty() => {}
                    Err(message) => eprintln!("{}", message.yellow()),
                }
            }
            Some(completion) = session.next_completion() => {
                match session.complete(completion) {
                    Some(text) => println!("\n{text}"),
                    None => continue,
                }
            }
        }
        prompt(&session)?;
    }

    Ok(())
}
