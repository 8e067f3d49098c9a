use crate::prelude::*;
use clap::Parser;

mod browse;
mod cache;
mod client;
mod context;
mod detail;
mod error;
mod gallery;
mod list;
mod prelude;

#[cfg(test)]
mod testing;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Browse the Pokémon catalogue from the terminal"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Catalogue API base URL
    #[clap(
        long,
        env = "POKEDEX_API_BASE",
        global = true,
        default_value = client::DEFAULT_API_BASE
    )]
    api_base: String,

    /// Entries per list page
    #[clap(long, env = "POKEDEX_PAGE_SIZE", global = true, default_value = "50")]
    page_size: usize,

    /// Entries per gallery batch
    #[clap(long, env = "POKEDEX_BATCH_SIZE", global = true, default_value = "20")]
    batch_size: usize,

    /// Distance from the bottom that triggers the next gallery batch
    #[clap(
        long,
        env = "POKEDEX_SCROLL_THRESHOLD",
        global = true,
        default_value = "100"
    )]
    scroll_threshold: f64,

    /// Highest id reachable by detail navigation
    #[clap(long, env = "POKEDEX_MAX_ID", global = true)]
    max_id: Option<u32>,

    /// Per-request timeout in seconds
    #[clap(long, env = "POKEDEX_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Whether to display additional information.
    #[clap(long, env = "POKEDEX_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Paginated, searchable, sortable list
    List(crate::list::ListOptions),

    /// Image gallery with type filters
    Gallery(crate::gallery::GalleryOptions),

    /// Details for a single Pokémon
    Show(crate::detail::ShowOptions),

    /// Available type names
    Types(crate::gallery::TypesOptions),

    /// Interactive session over all views
    Browse,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::List(options) => crate::list::run(options, app.global).await,
        SubCommands::Gallery(options) => crate::gallery::run(options, app.global).await,
        SubCommands::Show(options) => crate::detail::run(options, app.global).await,
        SubCommands::Types(options) => crate::gallery::run_types(options, app.global).await,
        SubCommands::Browse => crate::browse::run(app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
