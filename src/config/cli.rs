use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the sitesettings binary.
#[derive(Debug, Parser)]
#[command(
    name = "sitesettings",
    version,
    about = "Resolve site settings against a content fixture"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SITESETTINGS_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve the layout settings of a site by its start page.
    Resolve(ResolveArgs),
    /// Find the start page that owns a content item.
    #[command(name = "start-page")]
    StartPage(StartPageArgs),
    /// Build the search page model for a site.
    Search(SearchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the site fixture to load content from.
    #[arg(
        long = "fixture",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub fixture: Option<PathBuf>,

    /// Enable the settings object cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,

    /// Override the settings cache capacity.
    #[arg(long = "cache-capacity", value_name = "COUNT", global = true)]
    pub cache_capacity: Option<usize>,

    /// Override the language used when a request names none.
    #[arg(long = "default-language", value_name = "LANG", global = true)]
    pub default_language: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    /// Content id of the site's start page.
    #[arg(long = "start-page", value_name = "ID")]
    pub start_page: u64,

    /// Content language; defaults to the configured default language.
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Resolve as an editor, preferring shared drafts.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub edit: bool,
}

#[derive(Debug, Args, Clone)]
#[group(required = true, multiple = false)]
pub struct StartPageArgs {
    /// Content id of the item.
    #[arg(long, value_name = "ID")]
    pub content: Option<u64>,

    /// Stable identifier of the item.
    #[arg(long, value_name = "GUID")]
    pub guid: Option<Uuid>,
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// Name of the site as declared in the fixture.
    #[arg(long, value_name = "NAME")]
    pub site: Option<String>,

    /// Search query as typed by the visitor.
    #[arg(long, default_value = "")]
    pub query: String,

    /// Content language; defaults to the configured default language.
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Build the page as an editor.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub edit: bool,
}
