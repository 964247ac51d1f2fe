use std::{process, sync::Arc};

use serde_json::json;
use sitesettings::{
    application::{
        context::{ContextMode, RequestContext, SiteDefinition},
        error::AppError,
        search::SearchPageService,
        settings::SettingsService,
    },
    cache::{CacheConfig, DefaultCacheKeyCreator, MemoryObjectCache, VersionInvalidator},
    config,
    domain::{
        content::{ContentRef, LanguageTag},
        schema::builtin_registry,
        settings::LayoutSettings,
    },
    infra::{error::InfraError, fixture::SiteFixture, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

struct App {
    settings: Arc<SettingsService>,
    sites: Vec<SiteDefinition>,
    default_language: LanguageTag,
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;

    let app = build_application(&settings).await?;

    let output = match cli_args.command {
        config::Command::Resolve(args) => run_resolve(&app, args).await?,
        config::Command::StartPage(args) => run_start_page(&app, args).await?,
        config::Command::Search(args) => run_search(&app, args).await?,
    };

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn build_application(settings: &config::Settings) -> Result<App, AppError> {
    let fixture_path = settings.site.fixture.as_ref().ok_or_else(|| {
        InfraError::configuration("no site fixture configured; pass --fixture or set site.fixture")
    })?;

    let types = Arc::new(builtin_registry()?);
    let loaded = SiteFixture::load(fixture_path).await?.into_store(types)?;

    let cache = Arc::new(MemoryObjectCache::new(&CacheConfig::from(&settings.cache)));
    let keys = Arc::new(DefaultCacheKeyCreator::new());
    loaded.store.subscribe(Arc::new(VersionInvalidator::new(
        Arc::clone(&cache),
        Arc::clone(&keys),
    )));

    let service = SettingsService::from_store(loaded.store, cache, keys);
    service.initialize().await;
    info!(
        settings_root = ?service.global_settings_root(),
        sites = loaded.sites.len(),
        "Settings service ready"
    );

    Ok(App {
        settings: Arc::new(service),
        sites: loaded.sites,
        default_language: settings.site.default_language.clone(),
    })
}

fn request_context(
    app: &App,
    language: Option<String>,
    edit: bool,
) -> Result<RequestContext, AppError> {
    let language = match language {
        Some(language) => LanguageTag::parse(language)?,
        None => app.default_language.clone(),
    };
    let mode = if edit {
        ContextMode::Edit
    } else {
        ContextMode::Normal
    };
    Ok(RequestContext::new(language).with_mode(mode))
}

async fn run_resolve(app: &App, args: config::ResolveArgs) -> Result<serde_json::Value, AppError> {
    let ctx = request_context(app, args.language, args.edit)?;
    let start_page = ContentRef::new(args.start_page);

    let settings = app
        .settings
        .resolve::<LayoutSettings>(start_page, None, &ctx)
        .await;

    Ok(json!({
        "start_page": start_page.id,
        "language": ctx.preferred_language.as_str(),
        "draft": ctx.is_draft(),
        "settings": settings.as_deref(),
    }))
}

async fn run_start_page(
    app: &App,
    args: config::StartPageArgs,
) -> Result<serde_json::Value, AppError> {
    let start_page = match (args.content, args.guid) {
        (Some(id), _) => {
            app.settings
                .resolve_start_page_by_reference(ContentRef::new(id))
                .await
        }
        (None, Some(guid)) => app.settings.resolve_start_page_by_guid(guid).await,
        (None, None) => {
            return Err(AppError::validation("either --content or --guid is required"));
        }
    };

    let start_page = start_page.ok_or(AppError::NotFound)?;
    Ok(json!({ "start_page": start_page.id }))
}

async fn run_search(app: &App, args: config::SearchArgs) -> Result<serde_json::Value, AppError> {
    let site = match args.site.as_deref() {
        Some(name) => Some(
            app.sites
                .iter()
                .find(|site| site.name == name)
                .cloned()
                .ok_or_else(|| AppError::validation(format!("unknown site `{name}`")))?,
        ),
        None => app.sites.first().cloned(),
    };

    let mut ctx = request_context(app, args.language, args.edit)?;
    if let Some(site) = site {
        ctx = ctx.with_site(site);
    }

    let model = SearchPageService::new(Arc::clone(&app.settings))
        .index(&args.query, &ctx)
        .await;
    serde_json::to_value(model)
        .map_err(|err| AppError::unexpected(format!("failed to encode search model: {err}")))
}
