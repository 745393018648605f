//! # SQLite repository
//!
//! Maps the relational model in `migrations/` onto the domain models.
//! A change set is written inside one transaction; unique and foreign key
//! violations surface as `Conflict`.

use async_trait::async_trait;
use domains::error::{DomainError, Result};
use domains::models::{
    ContentImage, LocalizedMicroContent, LocalizedTemplateContent, MicroContent, Site, SiteLanguage,
    SlotItem, TemplateContent, TemplateContentType,
};
use domains::ports::{ChangeSet, ContentRepository, Deletion, GlobalContents, PageAggregate};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use crate::StorageError;

const SCHEMA: &str = include_str!("../migrations/0001_content.sql");

pub struct SqliteContentRepository {
    pool: SqlitePool,
}

impl SqliteContentRepository {
    /// Connects and applies the schema. `sqlite::memory:` databases exist
    /// per connection, so they get a single, never-recycled connection.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { max_connections });
        if in_memory {
            options = options.idle_timeout(None).max_lifetime(None);
        }
        let pool = options.connect(url).await.map_err(db)?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(db)?;
        tracing::info!(url, "sqlite content repository ready");
        Ok(Self { pool })
    }
}

fn db(err: sqlx::Error) -> DomainError {
    StorageError::from(err).into()
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn get_uuid(row: &SqliteRow, column: &str) -> Uuid {
    blob_to_uuid(row.get::<Vec<u8>, _>(column).as_slice())
}

fn get_opt_uuid(row: &SqliteRow, column: &str) -> Option<Uuid> {
    row.get::<Option<Vec<u8>>, _>(column).map(|b| blob_to_uuid(&b))
}

fn site_from_row(row: &SqliteRow) -> Site {
    Site {
        id: get_uuid(row, "id"),
        name: row.get("name"),
        theme: row.get("theme"),
        created_at: row.get("created_at"),
    }
}

fn language_from_row(row: &SqliteRow) -> SiteLanguage {
    SiteLanguage {
        id: get_uuid(row, "id"),
        site_id: get_uuid(row, "site_id"),
        language: row.get("language"),
        is_primary: row.get("is_primary"),
    }
}

fn page_from_row(row: &SqliteRow) -> Result<TemplateContent> {
    Ok(TemplateContent {
        id: get_uuid(row, "id"),
        site_id: get_uuid(row, "site_id"),
        template_name: row.get("template_name"),
        category: row.get::<String, _>("category").parse()?,
        draft_version: row.get("draft_version"),
        published_version: row.get("published_version"),
        published_at: row.get("published_at"),
        is_home_page: row.get("is_home_page"),
        created_at: row.get("created_at"),
    })
}

fn locale_from_row(row: &SqliteRow) -> LocalizedTemplateContent {
    LocalizedTemplateContent {
        id: get_uuid(row, "id"),
        template_content_id: get_uuid(row, "template_content_id"),
        language: row.get("language"),
        title: row.get("title"),
        slug: row.get("slug"),
        draft_version: row.get("draft_version"),
        published_version: row.get("published_version"),
        translation_ready: row.get("translation_ready"),
        creator: get_uuid(row, "creator"),
        created_at: row.get("created_at"),
        last_modified: row.get("last_modified"),
        last_modified_by: get_opt_uuid(row, "last_modified_by"),
    }
}

fn item_from_row(row: &SqliteRow) -> SlotItem {
    SlotItem {
        id: get_uuid(row, "id"),
        site_id: get_uuid(row, "site_id"),
        template_content_id: get_opt_uuid(row, "template_content_id"),
        content_type: row.get("content_type"),
        position: row.get("position"),
        deleted: row.get("deleted"),
        deleted_in_version: row.get("deleted_in_version"),
    }
}

fn localized_mc_from_row(row: &SqliteRow) -> LocalizedMicroContent {
    LocalizedMicroContent {
        id: get_uuid(row, "id"),
        microcontent_id: get_uuid(row, "microcontent_id"),
        language: row.get("language"),
        draft_content: row.get("draft_content"),
        published_content: row.get("published_content"),
        plain_text: row.get("plain_text"),
        creator: get_uuid(row, "creator"),
        created_at: row.get("created_at"),
        last_modified: row.get("last_modified"),
        last_modified_by: get_opt_uuid(row, "last_modified_by"),
    }
}

fn image_from_row(row: &SqliteRow) -> ContentImage {
    ContentImage {
        item: item_from_row(row),
        draft_content: row.get("draft_content"),
        published_content: row.get("published_content"),
        published_source: row.get("published_source"),
        creator: get_uuid(row, "creator"),
        created_at: row.get("created_at"),
        last_modified: row.get("last_modified"),
        last_modified_by: get_opt_uuid(row, "last_modified_by"),
    }
}

fn page_type_from_row(row: &SqliteRow) -> TemplateContentType {
    TemplateContentType {
        id: get_uuid(row, "id"),
        template_content_id: get_uuid(row, "template_content_id"),
        content_type: row.get("content_type"),
        position: row.get("position"),
    }
}

/// Attaches localized rows to their items.
fn assemble_microcontents(items: Vec<SqliteRow>, localized: Vec<SqliteRow>) -> Vec<MicroContent> {
    let mut microcontents: Vec<MicroContent> = items
        .iter()
        .map(|row| MicroContent {
            item: item_from_row(row),
            locales: Vec::new(),
        })
        .collect();
    for row in &localized {
        let lmc = localized_mc_from_row(row);
        if let Some(mc) = microcontents.iter_mut().find(|m| m.item.id == lmc.microcontent_id) {
            mc.locales.push(lmc);
        }
    }
    microcontents
}

#[async_trait]
impl ContentRepository for SqliteContentRepository {
    async fn get_site(&self, id: Uuid) -> Result<Option<Site>> {
        let row = sqlx::query("SELECT id, name, theme, created_at FROM sites WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(site_from_row))
    }

    async fn list_site_languages(&self, site_id: Uuid) -> Result<Vec<SiteLanguage>> {
        let rows = sqlx::query("SELECT * FROM site_languages WHERE site_id = ? ORDER BY language")
            .bind(uuid_to_blob(site_id))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        Ok(rows.iter().map(language_from_row).collect())
    }

    /// Loads a page and everything it owns in one transaction so the
    /// aggregate is a consistent snapshot.
    async fn load_page(&self, id: Uuid) -> Result<Option<PageAggregate>> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let key = uuid_to_blob(id);

        let Some(row) = sqlx::query("SELECT * FROM template_contents WHERE id = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?
        else {
            return Ok(None);
        };
        let mut agg = PageAggregate::new(page_from_row(&row)?);

        agg.locales = sqlx::query("SELECT * FROM localized_template_contents WHERE template_content_id = ? ORDER BY language")
            .bind(&key)
            .fetch_all(&mut *tx)
            .await
            .map_err(db)?
            .iter()
            .map(locale_from_row)
            .collect();

        let items = sqlx::query("SELECT * FROM microcontents WHERE template_content_id = ? ORDER BY position, id")
            .bind(&key)
            .fetch_all(&mut *tx)
            .await
            .map_err(db)?;
        let localized = sqlx::query(
            "SELECT lm.* FROM localized_microcontents lm \
             JOIN microcontents m ON m.id = lm.microcontent_id \
             WHERE m.template_content_id = ? ORDER BY lm.language",
        )
        .bind(&key)
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;
        agg.microcontents = assemble_microcontents(items, localized);

        agg.images = sqlx::query("SELECT * FROM content_images WHERE template_content_id = ? ORDER BY position, id")
            .bind(&key)
            .fetch_all(&mut *tx)
            .await
            .map_err(db)?
            .iter()
            .map(image_from_row)
            .collect();

        agg.types = sqlx::query("SELECT * FROM template_content_types WHERE template_content_id = ? ORDER BY content_type")
            .bind(&key)
            .fetch_all(&mut *tx)
            .await
            .map_err(db)?
            .iter()
            .map(page_type_from_row)
            .collect();

        tx.commit().await.map_err(db)?;
        Ok(Some(agg))
    }

    async fn list_pages(&self, site_id: Uuid) -> Result<Vec<TemplateContent>> {
        let rows = sqlx::query("SELECT * FROM template_contents WHERE site_id = ? ORDER BY created_at, id")
            .bind(uuid_to_blob(site_id))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(page_from_row).collect()
    }

    async fn find_locale_by_slug(&self, slug: &str) -> Result<Option<LocalizedTemplateContent>> {
        let row = sqlx::query("SELECT * FROM localized_template_contents WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(locale_from_row))
    }

    async fn find_locale(&self, page_id: Uuid, language: &str) -> Result<Option<LocalizedTemplateContent>> {
        let row = sqlx::query("SELECT * FROM localized_template_contents WHERE template_content_id = ? AND language = ?")
            .bind(uuid_to_blob(page_id))
            .bind(language)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.as_ref().map(locale_from_row))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM localized_template_contents WHERE slug = ?) AS taken")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.get("taken"))
    }

    async fn list_page_types(&self, site_id: Uuid, content_type: &str) -> Result<Vec<TemplateContentType>> {
        let rows = sqlx::query(
            "SELECT t.* FROM template_content_types t \
             JOIN template_contents p ON p.id = t.template_content_id \
             WHERE p.site_id = ? AND t.content_type = ? ORDER BY t.position, t.id",
        )
        .bind(uuid_to_blob(site_id))
        .bind(content_type)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(rows.iter().map(page_type_from_row).collect())
    }

    async fn load_global_contents(&self, site_id: Uuid) -> Result<GlobalContents> {
        let key = uuid_to_blob(site_id);
        let items = sqlx::query(
            "SELECT * FROM microcontents WHERE site_id = ? AND template_content_id IS NULL ORDER BY position, id",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        let localized = sqlx::query(
            "SELECT lm.* FROM localized_microcontents lm \
             JOIN microcontents m ON m.id = lm.microcontent_id \
             WHERE m.site_id = ? AND m.template_content_id IS NULL ORDER BY lm.language",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        let images = sqlx::query(
            "SELECT * FROM content_images WHERE site_id = ? AND template_content_id IS NULL ORDER BY position, id",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        Ok(GlobalContents {
            microcontents: assemble_microcontents(items, localized),
            images: images.iter().map(image_from_row).collect(),
        })
    }

    /// Atomic write of a whole change set.
    ///
    /// Guards are re-read inside the transaction; any mismatch aborts
    /// before the first write.
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        for guard in &changes.guards {
            let row = sqlx::query("SELECT draft_version, published_version FROM template_contents WHERE id = ?")
                .bind(uuid_to_blob(guard.page_id))
                .fetch_optional(&mut *tx)
                .await
                .map_err(db)?
                .ok_or_else(|| DomainError::Conflict(format!("page {} no longer exists", guard.page_id)))?;
            let draft: i32 = row.get("draft_version");
            let published: Option<i32> = row.get("published_version");
            if draft != guard.draft_version || published != guard.published_version {
                return Err(DomainError::Conflict(format!("page {} was modified concurrently", guard.page_id)));
            }
        }

        for site in &changes.sites {
            upsert_site(&mut tx, site).await?;
        }
        for language in &changes.site_languages {
            upsert_site_language(&mut tx, language).await?;
        }
        for page in &changes.pages {
            upsert_page(&mut tx, page).await?;
        }
        for locale in &changes.locales {
            upsert_locale(&mut tx, locale).await?;
        }
        for mc in &changes.microcontents {
            upsert_microcontent(&mut tx, mc).await?;
        }
        for img in &changes.images {
            upsert_image(&mut tx, img).await?;
        }
        for assignment in &changes.page_types {
            upsert_page_type(&mut tx, assignment).await?;
        }
        for deletion in &changes.deletions {
            delete(&mut tx, *deletion).await?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }
}

type Tx<'a> = Transaction<'a, Sqlite>;

async fn upsert_site(tx: &mut Tx<'_>, site: &Site) -> Result<()> {
    sqlx::query(
        "INSERT INTO sites (id, name, theme, created_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, theme = excluded.theme",
    )
    .bind(uuid_to_blob(site.id))
    .bind(&site.name)
    .bind(&site.theme)
    .bind(site.created_at)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn upsert_site_language(tx: &mut Tx<'_>, language: &SiteLanguage) -> Result<()> {
    sqlx::query(
        "INSERT INTO site_languages (id, site_id, language, is_primary) VALUES (?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET language = excluded.language, is_primary = excluded.is_primary",
    )
    .bind(uuid_to_blob(language.id))
    .bind(uuid_to_blob(language.site_id))
    .bind(&language.language)
    .bind(language.is_primary)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn upsert_page(tx: &mut Tx<'_>, page: &TemplateContent) -> Result<()> {
    sqlx::query(
        "INSERT INTO template_contents \
         (id, site_id, template_name, category, draft_version, published_version, published_at, is_home_page, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET template_name = excluded.template_name, \
         draft_version = excluded.draft_version, published_version = excluded.published_version, \
         published_at = excluded.published_at, is_home_page = excluded.is_home_page",
    )
    .bind(uuid_to_blob(page.id))
    .bind(uuid_to_blob(page.site_id))
    .bind(&page.template_name)
    .bind(page.category.as_str())
    .bind(page.draft_version)
    .bind(page.published_version)
    .bind(page.published_at)
    .bind(page.is_home_page)
    .bind(page.created_at)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn upsert_locale(tx: &mut Tx<'_>, locale: &LocalizedTemplateContent) -> Result<()> {
    sqlx::query(
        "INSERT INTO localized_template_contents \
         (id, template_content_id, language, title, slug, draft_version, published_version, \
          translation_ready, creator, created_at, last_modified, last_modified_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET title = excluded.title, slug = excluded.slug, \
         draft_version = excluded.draft_version, published_version = excluded.published_version, \
         translation_ready = excluded.translation_ready, last_modified = excluded.last_modified, \
         last_modified_by = excluded.last_modified_by",
    )
    .bind(uuid_to_blob(locale.id))
    .bind(uuid_to_blob(locale.template_content_id))
    .bind(&locale.language)
    .bind(&locale.title)
    .bind(&locale.slug)
    .bind(locale.draft_version)
    .bind(locale.published_version)
    .bind(locale.translation_ready)
    .bind(uuid_to_blob(locale.creator))
    .bind(locale.created_at)
    .bind(locale.last_modified)
    .bind(locale.last_modified_by.map(uuid_to_blob))
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn upsert_microcontent(tx: &mut Tx<'_>, mc: &MicroContent) -> Result<()> {
    let item = &mc.item;
    sqlx::query(
        "INSERT INTO microcontents \
         (id, site_id, template_content_id, content_type, position, deleted, deleted_in_version) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET position = excluded.position, deleted = excluded.deleted, \
         deleted_in_version = excluded.deleted_in_version",
    )
    .bind(uuid_to_blob(item.id))
    .bind(uuid_to_blob(item.site_id))
    .bind(item.template_content_id.map(uuid_to_blob))
    .bind(&item.content_type)
    .bind(item.position)
    .bind(item.deleted)
    .bind(item.deleted_in_version)
    .execute(&mut **tx)
    .await
    .map_err(db)?;

    for lmc in &mc.locales {
        sqlx::query(
            "INSERT INTO localized_microcontents \
             (id, microcontent_id, language, draft_content, published_content, plain_text, \
              creator, created_at, last_modified, last_modified_by) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET draft_content = excluded.draft_content, \
             published_content = excluded.published_content, plain_text = excluded.plain_text, \
             last_modified = excluded.last_modified, last_modified_by = excluded.last_modified_by",
        )
        .bind(uuid_to_blob(lmc.id))
        .bind(uuid_to_blob(lmc.microcontent_id))
        .bind(&lmc.language)
        .bind(&lmc.draft_content)
        .bind(&lmc.published_content)
        .bind(&lmc.plain_text)
        .bind(uuid_to_blob(lmc.creator))
        .bind(lmc.created_at)
        .bind(lmc.last_modified)
        .bind(lmc.last_modified_by.map(uuid_to_blob))
        .execute(&mut **tx)
        .await
        .map_err(db)?;
    }
    Ok(())
}

async fn upsert_image(tx: &mut Tx<'_>, img: &ContentImage) -> Result<()> {
    let item = &img.item;
    sqlx::query(
        "INSERT INTO content_images \
         (id, site_id, template_content_id, content_type, position, deleted, deleted_in_version, \
          draft_content, published_content, published_source, creator, created_at, last_modified, last_modified_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET position = excluded.position, deleted = excluded.deleted, \
         deleted_in_version = excluded.deleted_in_version, draft_content = excluded.draft_content, \
         published_content = excluded.published_content, published_source = excluded.published_source, \
         last_modified = excluded.last_modified, last_modified_by = excluded.last_modified_by",
    )
    .bind(uuid_to_blob(item.id))
    .bind(uuid_to_blob(item.site_id))
    .bind(item.template_content_id.map(uuid_to_blob))
    .bind(&item.content_type)
    .bind(item.position)
    .bind(item.deleted)
    .bind(item.deleted_in_version)
    .bind(&img.draft_content)
    .bind(&img.published_content)
    .bind(&img.published_source)
    .bind(uuid_to_blob(img.creator))
    .bind(img.created_at)
    .bind(img.last_modified)
    .bind(img.last_modified_by.map(uuid_to_blob))
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn upsert_page_type(tx: &mut Tx<'_>, assignment: &TemplateContentType) -> Result<()> {
    sqlx::query(
        "INSERT INTO template_content_types (id, template_content_id, content_type, position) \
         VALUES (?, ?, ?, ?) ON CONFLICT(id) DO UPDATE SET position = excluded.position",
    )
    .bind(uuid_to_blob(assignment.id))
    .bind(uuid_to_blob(assignment.template_content_id))
    .bind(&assignment.content_type)
    .bind(assignment.position)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn delete(tx: &mut Tx<'_>, deletion: Deletion) -> Result<()> {
    let (sql, id) = match deletion {
        Deletion::SiteLanguage(id) => ("DELETE FROM site_languages WHERE id = ?", id),
        Deletion::Page(id) => ("DELETE FROM template_contents WHERE id = ?", id),
        Deletion::Locale(id) => ("DELETE FROM localized_template_contents WHERE id = ?", id),
        Deletion::MicroContent(id) => ("DELETE FROM microcontents WHERE id = ?", id),
        Deletion::LocalizedMicroContent(id) => ("DELETE FROM localized_microcontents WHERE id = ?", id),
        Deletion::Image(id) => ("DELETE FROM content_images WHERE id = ?", id),
        Deletion::PageType(id) => ("DELETE FROM template_content_types WHERE id = ?", id),
    };
    sqlx::query(sql)
        .bind(uuid_to_blob(id))
        .execute(&mut **tx)
        .await
        .map_err(db)?;
    Ok(())
}
