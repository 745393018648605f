//! # micromanager
//!
//! Administration CLI. Assembles the adapters selected at compile time,
//! then runs one content operation per invocation and prints the result
//! as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use configs::{AppConfig, EngineConfig, LogConfig, LogFormat};
use domains::models::{EditorId, PublishTarget, RenderContext, TemplateCategory};
use domains::ports::{ContentRepository, FileStore, TemplateCatalog};
use domains::slots::SlotCategory;
use serde_json::json;
use services::{ContentEngine, EngineSettings, LocaleUpdate, SlotTarget};
use storage_adapters::ThemeDirectoryCatalog;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// Adapters are picked by cargo features
#[cfg(feature = "db-sqlite")]
use secrecy::ExposeSecret;
#[cfg(feature = "db-sqlite")]
use storage_adapters::SqliteContentRepository;
#[cfg(not(feature = "db-sqlite"))]
use storage_adapters::InMemoryContentRepository;

#[cfg(feature = "media-local")]
use storage_adapters::LocalFileStore;
#[cfg(not(feature = "media-local"))]
use storage_adapters::InMemoryFileStore;

#[derive(Parser)]
#[command(name = "micromanager")]
#[command(about = "Template-first content administration", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./micromanager.toml when present)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Administrator recorded as creator or last editor of writes
    #[arg(long, value_name = "UUID", global = true, default_value_t = Uuid::nil())]
    editor: EditorId,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sites and their languages
    Site {
        #[command(subcommand)]
        command: SiteCommands,
    },

    /// Manage pages, their locales and page types
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },

    /// Edit draft slot values
    Content {
        #[command(subcommand)]
        command: ContentCommands,
    },

    /// Publish a page for one language or all site languages
    Publish {
        page: Uuid,

        /// Language code, or "all"
        #[arg(long, default_value = "all")]
        language: PublishTarget,
    },

    /// Explain why a page cannot be published yet
    Check {
        page: Uuid,

        /// Only check this language
        #[arg(long)]
        language: Option<String>,
    },

    /// Purge deleted values the live page no longer shows
    Reconcile { page: Uuid },

    /// Read content the way a render would
    Show {
        #[command(subcommand)]
        command: ShowCommands,
    },
}

#[derive(Subcommand)]
enum SiteCommands {
    /// Create a site with its primary language
    Create {
        name: String,

        /// Theme directory (defaults to themes.default_theme)
        #[arg(long)]
        theme: Option<String>,

        #[arg(long)]
        language: String,
    },
    /// List site languages, primary first
    Languages { site: Uuid },
    AddLanguage { site: Uuid, language: String },
    RemoveLanguage { site: Uuid, language: String },
    SetPrimary { site: Uuid, language: String },
    SetTheme { site: Uuid, theme: String },
}

#[derive(Subcommand)]
enum PageCommands {
    /// Create a page from a `page/...` or `content/...` template
    Create {
        site: Uuid,
        template: String,
        title: String,
    },
    /// Open a locale, seeding it when the page has none in that language
    Locale { page: Uuid, language: String },
    /// Change the title or readiness of a locale
    UpdateLocale {
        page: Uuid,
        language: String,

        #[arg(long)]
        title: Option<String>,

        /// Mark the translation ready (or not)
        #[arg(long)]
        ready: Option<bool>,
    },
    Delete { page: Uuid },
    SetHome { page: Uuid },
    /// Replace the page types a page is assigned to
    Types { page: Uuid, types: Vec<String> },
    /// Order the pages of one type
    Reorder {
        site: Uuid,
        content_type: String,
        pages: Vec<Uuid>,
    },
    /// Preview the slug a title would get
    Slug { title: String },
}

#[derive(Args)]
struct SlotArgs {
    #[arg(long)]
    site: Uuid,

    /// Owning page; omit for a site-global value
    #[arg(long)]
    page: Option<Uuid>,

    /// Slot category as declared by the template tag, e.g. `microcontents`
    #[arg(long)]
    category: SlotCategory,

    content_type: String,

    /// Existing value of a plural slot
    #[arg(long)]
    item: Option<Uuid>,
}

impl SlotArgs {
    fn target(&self) -> SlotTarget {
        let target = match self.page {
            Some(page) => SlotTarget::page(self.site, page, self.category, &self.content_type),
            None => SlotTarget::global(self.site, self.category, &self.content_type),
        };
        match self.item {
            Some(item) => target.instance(item),
            None => target,
        }
    }
}

#[derive(Subcommand)]
enum ContentCommands {
    /// Write the draft text of a slot
    Set {
        #[command(flatten)]
        slot: SlotArgs,

        #[arg(long)]
        language: String,

        value: String,
    },
    /// Upload a file as the draft of an image slot
    Upload {
        #[command(flatten)]
        slot: SlotArgs,

        file: PathBuf,
    },
    /// Delete a slot value, keeping it for the live page when needed
    Delete {
        #[arg(long)]
        site: Uuid,

        #[arg(long)]
        page: Option<Uuid>,

        #[arg(long)]
        category: SlotCategory,

        item: Uuid,
    },
}

#[derive(Args)]
struct RenderArgs {
    #[arg(long)]
    site: Uuid,

    /// Falls back to the primary language
    #[arg(long)]
    language: Option<String>,

    /// Read drafts instead of published content
    #[arg(long)]
    preview: bool,
}

#[derive(Subcommand)]
enum ShowCommands {
    /// Page behind a slug
    Slug {
        #[command(flatten)]
        render: RenderArgs,
        slug: String,
    },
    Home {
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Values of a slot, falling back to the site-global slot
    Slot {
        #[command(flatten)]
        render: RenderArgs,

        #[arg(long)]
        page: Option<Uuid>,

        #[arg(long)]
        category: SlotCategory,

        content_type: String,
    },
    /// Pages assigned to a page type
    Type {
        #[command(flatten)]
        render: RenderArgs,
        content_type: String,
    },
    /// Pages using a template, most recently published first
    Template {
        #[command(flatten)]
        render: RenderArgs,
        template: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.log);

    let engine = build_engine(&config).await?;
    run(&engine, &config, cli.editor, cli.command).await
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match log.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

async fn build_engine(config: &AppConfig) -> anyhow::Result<ContentEngine> {
    // 1. Metadata
    #[cfg(feature = "db-sqlite")]
    let repo: Arc<dyn ContentRepository> = Arc::new(
        SqliteContentRepository::new(config.database.url.expose_secret(), config.database.max_connections)
            .await
            .context("failed to open the content database")?,
    );
    #[cfg(not(feature = "db-sqlite"))]
    let repo: Arc<dyn ContentRepository> = {
        tracing::warn!("built without db-sqlite, content lives only as long as this process");
        Arc::new(InMemoryContentRepository::new())
    };

    // 2. Files
    #[cfg(feature = "media-local")]
    let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(&config.media.root));
    #[cfg(not(feature = "media-local"))]
    let files: Arc<dyn FileStore> = Arc::new(InMemoryFileStore::new());

    // 3. Templates
    let catalog: Arc<dyn TemplateCatalog> = Arc::new(ThemeDirectoryCatalog::new(&config.themes.root));

    tracing::debug!(
        media_root = %config.media.root.display(),
        themes_root = %config.themes.root.display(),
        "engine assembled"
    );
    Ok(ContentEngine::new(repo, files, catalog, engine_settings(&config.engine)))
}

fn engine_settings(engine: &EngineConfig) -> EngineSettings {
    EngineSettings {
        slug_max_length: engine.slug_max_length,
        slug_retry_limit: engine.slug_retry_limit,
        honor_slot_bounds: engine.honor_slot_bounds,
        file_copy_attempts: engine.file_copy_attempts,
        ..EngineSettings::default()
    }
}

fn print(value: serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn render_context(engine: &ContentEngine, args: &RenderArgs) -> anyhow::Result<RenderContext> {
    Ok(engine
        .sites
        .render_context(args.site, args.language.as_deref(), args.preview)
        .await?)
}

async fn run(engine: &ContentEngine, config: &AppConfig, editor: EditorId, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Site { command } => run_site(engine, config, command).await,
        Commands::Page { command } => run_page(engine, editor, command).await,
        Commands::Content { command } => run_content(engine, editor, command).await,
        Commands::Publish { page, language } => {
            let incomplete = engine.publication.publish(page, language).await?;
            if !incomplete.is_empty() {
                for message in &incomplete {
                    eprintln!("{message}");
                }
                bail!("page {page} was not published");
            }
            print(json!({ "published": page }))
        }
        Commands::Check { page, language } => {
            let messages: Vec<String> = match language {
                Some(language) => engine.completeness.report(page, &language).await?.into_iter().collect(),
                None => engine
                    .completeness
                    .incomplete_languages(page)
                    .await?
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            };
            print(json!({ "complete": messages.is_empty(), "messages": messages }))
        }
        Commands::Reconcile { page } => {
            let purged = engine.store.reconcile_tombstones(page).await?;
            print(json!({ "purged": purged }))
        }
        Commands::Show { command } => run_show(engine, command).await,
    }
}

async fn run_site(engine: &ContentEngine, config: &AppConfig, command: SiteCommands) -> anyhow::Result<()> {
    let sites = &engine.sites;
    match command {
        SiteCommands::Create { name, theme, language } => {
            let theme = theme.unwrap_or_else(|| config.themes.default_theme.clone());
            let site = sites.create_site(&name, &theme, &language).await?;
            print(json!(site))
        }
        SiteCommands::Languages { site } => print(json!(sites.languages(site).await?)),
        SiteCommands::AddLanguage { site, language } => print(json!(sites.add_language(site, &language).await?)),
        SiteCommands::RemoveLanguage { site, language } => {
            let removed = sites.remove_language(site, &language).await?;
            print(json!({ "removed": removed }))
        }
        SiteCommands::SetPrimary { site, language } => {
            sites.set_primary_language(site, &language).await?;
            print(json!(sites.languages(site).await?))
        }
        SiteCommands::SetTheme { site, theme } => print(json!(sites.set_theme(site, &theme).await?)),
    }
}

async fn run_page(engine: &ContentEngine, editor: EditorId, command: PageCommands) -> anyhow::Result<()> {
    let store = &engine.store;
    match command {
        PageCommands::Create { site, template, title } => {
            let category: TemplateCategory = template
                .split_once('/')
                .map(|(category, _)| category)
                .unwrap_or_default()
                .parse()
                .with_context(|| format!("template '{template}' must live under page/ or content/"))?;
            let agg = store
                .create_template_content(site, &template, category, &title, editor)
                .await?;
            print(json!({ "page": agg.page, "locales": agg.locales }))
        }
        PageCommands::Locale { page, language } => print(json!(store.open_locale(page, &language, editor).await?)),
        PageCommands::UpdateLocale {
            page,
            language,
            title,
            ready,
        } => {
            let update = LocaleUpdate {
                title,
                translation_ready: ready,
            };
            print(json!(store.update_locale(page, &language, update, editor).await?))
        }
        PageCommands::Delete { page } => {
            let deleted = store.delete_template_content(page).await?;
            print(json!({ "deleted": deleted }))
        }
        PageCommands::SetHome { page } => {
            store.set_home_page(page).await?;
            print(json!({ "home_page": page }))
        }
        PageCommands::Types { page, types } => print(json!(store.assign_types(page, &types).await?)),
        PageCommands::Reorder {
            site,
            content_type,
            pages,
        } => {
            store.reorder_type(site, &content_type, &pages).await?;
            print(json!({ "content_type": content_type, "pages": pages }))
        }
        PageCommands::Slug { title } => print(json!({ "slug": store.generate_slug(&title).await? })),
    }
}

async fn run_content(engine: &ContentEngine, editor: EditorId, command: ContentCommands) -> anyhow::Result<()> {
    let store = &engine.store;
    match command {
        ContentCommands::Set { slot, language, value } => {
            let item = store.set_content(&slot.target(), &language, value, editor).await?;
            print(json!({ "item": item }))
        }
        ContentCommands::Upload { slot, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let item = store.upload_image(&slot.target(), file_name, bytes, editor).await?;
            print(json!({ "item": item }))
        }
        ContentCommands::Delete {
            site,
            page,
            category,
            item,
        } => {
            let outcome = store.delete_content(site, page, category.entity_kind(), item).await?;
            print(json!({ "item": item, "outcome": format!("{outcome:?}") }))
        }
    }
}

async fn run_show(engine: &ContentEngine, command: ShowCommands) -> anyhow::Result<()> {
    let queries = &engine.queries;
    match command {
        ShowCommands::Slug { render, slug } => {
            let ctx = render_context(engine, &render).await?;
            print(json!(queries.page_by_slug(&ctx, &slug).await?))
        }
        ShowCommands::Home { render } => {
            let ctx = render_context(engine, &render).await?;
            print(json!(queries.home_page(&ctx).await?))
        }
        ShowCommands::Slot {
            render,
            page,
            category,
            content_type,
        } => {
            let ctx = render_context(engine, &render).await?;
            print(json!(queries.slot_contents(&ctx, page, category, &content_type).await?))
        }
        ShowCommands::Type { render, content_type } => {
            let ctx = render_context(engine, &render).await?;
            print(json!(queries.pages_by_type(&ctx, &content_type).await?))
        }
        ShowCommands::Template { render, template } => {
            let ctx = render_context(engine, &render).await?;
            print(json!(queries.pages_by_template(&ctx, &template).await?))
        }
    }
}
