//! ddx - inspect data files the way the xray overlay shows them
//!
//! - `ddx inspect <file>` prints the global and page data trees of a data file
//! - `ddx serve <file>` serves a page carrying the overlay for that file

use axum::{Router, response::Html, routing::get};
use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use dodeca_xray::{PageContext, RunMode, XrayOptions, XrayPlugin, data};
use facet::Facet;
use facet_args as args;
use std::net::SocketAddr;
use xray::DataParser;

const DEFAULT_PORT: u16 = 4100;

/// Print the data trees of a data file
#[derive(Facet, Debug)]
struct InspectArgs {
    /// YAML, JSON or TOML file used as the template context
    #[facet(args::positional)]
    file: String,

    /// Comma-separated top-level keys that belong to global data
    #[facet(args::named, default)]
    global: Option<String>,

    /// Print descriptor JSON instead of markup
    #[facet(args::named)]
    json: bool,

    /// Number of levels walked below the root
    #[facet(args::named, default)]
    max_depth: Option<usize>,

    /// Maximum characters of summarized strings
    #[facet(args::named, default)]
    cutoff: Option<usize>,
}

/// Serve a page carrying the overlay for a data file
#[derive(Facet, Debug)]
struct ServeArgs {
    /// YAML, JSON or TOML file used as the template context
    #[facet(args::positional)]
    file: String,

    /// Comma-separated top-level keys that belong to global data
    #[facet(args::named, default)]
    global: Option<String>,

    /// Port to listen on (127.0.0.1)
    #[facet(args::named, default)]
    port: Option<u16>,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum Command {
    /// Print the global and page data trees of a data file
    Inspect(InspectArgs),
    /// Serve a page carrying the overlay for a data file
    Serve(ServeArgs),
}

#[derive(Facet, Debug)]
struct Args {
    #[facet(args::subcommand)]
    command: Command,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let parsed: Args = facet_args::from_slice(&args_refs).map_err(|e| eyre!("{e}"))?;
    Ok(parsed.command)
}

fn split_keys(keys: Option<&str>) -> Vec<String> {
    keys.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_options() -> Result<XrayOptions> {
    let cwd = std::env::current_dir()?;
    let cwd = Utf8PathBuf::try_from(cwd)
        .map_err(|e| eyre!("Current directory is not valid UTF-8: {}", e.as_path().display()))?;
    XrayOptions::discover_or_default(&cwd)
}

fn inspect(args: InspectArgs) -> Result<()> {
    let mut options = load_options()?;
    if let Some(max_depth) = args.max_depth {
        options.max_depth = max_depth;
    }
    if let Some(cutoff) = args.cutoff {
        options.cutoff = cutoff;
    }

    let context = data::load_data_file(Utf8Path::new(&args.file))?;
    let mut global_keys = split_keys(args.global.as_deref());
    global_keys.extend(options.shallow_keys.iter().cloned());

    let mut parser = DataParser::new(options.parse_options());
    parser.set_global_keys(global_keys);
    let global = parser.parse_global_data(&context)?;
    let page = parser.parse_page_data(&context)?;
    tracing::debug!(seen = parser.seen_global().len(), "Parsed {}", args.file);

    if args.json {
        let out = serde_json::json!({ "globalData": global, "pageData": page });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let render = |tree: Option<xray::Descriptor>| tree.map(|t| xray::render(&t)).unwrap_or_default();
        println!("<!-- global data -->\n{}", render(global));
        println!("<!-- page data -->\n{}", render(page));
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let options = load_options()?;
    let context = data::load_data_file(Utf8Path::new(&args.file))?;
    let global_keys = split_keys(args.global.as_deref());

    let generator = format!("ddx v{}", env!("CARGO_PKG_VERSION"));
    let mut plugin = XrayPlugin::new(options, RunMode::Serve, generator);
    if let Some(reason) = plugin.disabled_reason() {
        return Err(eyre!("Xray is disabled: {reason}"));
    }

    plugin.before_build();
    let overlay = plugin.overlay(&PageContext {
        url: "/",
        input_path: &args.file,
        context: &context,
        global_keys: &global_keys,
    })?;
    let html = format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head><body>\n{overlay}\n</body></html>",
        html_escape::encode_text(&args.file)
    );
    // Assets come from the router below, so nothing lands in the working directory
    let results = [dodeca_xray::BuildResult::new("/", args.file.as_str(), &html)];
    plugin.record_build(&results, None, Utf8Path::new("."));

    let app = Router::new()
        .route(
            "/",
            get(move || {
                let html = html.clone();
                async move { Html(html) }
            }),
        )
        .merge(plugin.router());

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port.unwrap_or(DEFAULT_PORT)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving {} on http://{addr}/", args.file);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dodeca_xray=info".parse()?)
                .add_directive("ddx=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    match parse_args()? {
        Command::Inspect(args) => inspect(args),
        Command::Serve(args) => serve(args).await,
    }
}
