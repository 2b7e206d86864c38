use super::model::StoredArticle;
use crate::model::{GeneratedArticle, GeneratedImage, Platform, SocialPost};
use crate::orchestrator::ArticleBundle;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database URL: {}", normalized))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/` and create the parent
/// directory. In-memory and non-sqlite URLs pass through unchanged.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query_part {
        Some(q) => format!("sqlite://{}?{}", expanded, q),
        None => format!("sqlite://{}", expanded),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Persist a fresh run: article and feature image replace whatever was
/// stored, and stale social posts are dropped.
#[instrument(skip_all)]
pub async fn save_bundle(
    pool: &Pool,
    run_id: Uuid,
    source_url: &str,
    bundle: &ArticleBundle,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    upsert_article_tx(&mut tx, run_id, Some(source_url), &bundle.article, now).await?;
    sqlx::query(
        "INSERT INTO feature_images (id, mime_type, bytes, created_at) VALUES (1, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET mime_type = excluded.mime_type, bytes = excluded.bytes, created_at = excluded.created_at",
    )
    .bind(&bundle.feature_image.mime_type)
    .bind(&bundle.feature_image.bytes)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    delete_social_posts_tx(&mut tx).await?;
    tx.commit().await?;
    Ok(())
}

async fn delete_social_posts_tx(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    for table in ["social_posts", "social_post_lists"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn upsert_article_tx(
    tx: &mut Transaction<'_, Sqlite>,
    run_id: Uuid,
    source_url: Option<&str>,
    article: &GeneratedArticle,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO articles (id, run_id, source_url, title, image_prompt, video_prompt, article_content, created_at, updated_at) \
         VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET run_id = excluded.run_id, source_url = excluded.source_url, \
         title = excluded.title, image_prompt = excluded.image_prompt, video_prompt = excluded.video_prompt, \
         article_content = excluded.article_content, created_at = excluded.created_at, updated_at = excluded.updated_at",
    )
    .bind(run_id.to_string())
    .bind(source_url)
    .bind(&article.title)
    .bind(&article.image_prompt)
    .bind(&article.video_prompt)
    .bind(&article.article_content)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Replace the stored article after a user edit. Fails if nothing is stored.
#[instrument(skip_all)]
pub async fn update_article(pool: &Pool, article: &GeneratedArticle) -> Result<()> {
    let res = sqlx::query(
        "UPDATE articles SET title = ?, image_prompt = ?, video_prompt = ?, article_content = ?, updated_at = ? WHERE id = 1",
    )
    .bind(&article.title)
    .bind(&article.image_prompt)
    .bind(&article.video_prompt)
    .bind(&article.article_content)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("no stored article to update"));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn load_article(pool: &Pool) -> Result<Option<StoredArticle>> {
    let row = sqlx::query(
        "SELECT run_id, source_url, title, image_prompt, video_prompt, article_content, created_at, updated_at FROM articles WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    row.map(|r| article_from_row(&r)).transpose()
}

fn article_from_row(row: &SqliteRow) -> Result<StoredArticle> {
    let run_id: String = row.try_get("run_id")?;
    Ok(StoredArticle {
        run_id: Uuid::parse_str(&run_id).context("stored run_id is not a UUID")?,
        source_url: row.try_get("source_url")?,
        article: GeneratedArticle {
            title: row.try_get("title")?,
            image_prompt: row.try_get("image_prompt")?,
            video_prompt: row.try_get("video_prompt")?,
            article_content: row.try_get("article_content")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip_all)]
pub async fn load_feature_image(pool: &Pool) -> Result<Option<GeneratedImage>> {
    let row = sqlx::query("SELECT mime_type, bytes FROM feature_images WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    row.map(|r| -> Result<GeneratedImage> {
        Ok(GeneratedImage {
            mime_type: r.try_get("mime_type")?,
            bytes: r.try_get("bytes")?,
        })
    })
    .transpose()
}

#[instrument(skip_all)]
pub async fn replace_social_posts(pool: &Pool, posts: &[SocialPost]) -> Result<()> {
    let mut tx = pool.begin().await?;
    delete_social_posts_tx(&mut tx).await?;
    sqlx::query("INSERT INTO social_post_lists (id, updated_at) VALUES (1, ?)")
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    for (position, post) in posts.iter().enumerate() {
        let hashtags = serde_json::to_string(&post.hashtags)?;
        sqlx::query(
            "INSERT INTO social_posts (position, platform, caption, hashtags, image_prompt) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(position as i64)
        .bind(post.platform.as_str())
        .bind(&post.caption)
        .bind(hashtags)
        .bind(&post.image_prompt)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Drop the stored post list, if any.
#[instrument(skip_all)]
pub async fn clear_social_posts(pool: &Pool) -> Result<()> {
    let mut tx = pool.begin().await?;
    delete_social_posts_tx(&mut tx).await?;
    tx.commit().await?;
    Ok(())
}

/// Stored posts in their original order; `None` when no list is stored.
/// A stored empty list loads as `Some(vec![])`.
#[instrument(skip_all)]
pub async fn load_social_posts(pool: &Pool) -> Result<Option<Vec<SocialPost>>> {
    let rows = sqlx::query(
        "SELECT platform, caption, hashtags, image_prompt FROM social_posts ORDER BY position ASC",
    )
    .fetch_all(pool)
    .await?;
    if rows.is_empty() {
        let marked = sqlx::query("SELECT id FROM social_post_lists WHERE id = 1")
            .fetch_optional(pool)
            .await?
            .is_some();
        return Ok(marked.then(Vec::new));
    }
    let posts = rows
        .iter()
        .map(|row| -> Result<SocialPost> {
            let platform: String = row.try_get("platform")?;
            let hashtags: String = row.try_get("hashtags")?;
            Ok(SocialPost {
                platform: Platform::parse(&platform)
                    .ok_or_else(|| anyhow!("unknown stored platform '{}'", platform))?,
                caption: row.try_get("caption")?,
                hashtags: serde_json::from_str(&hashtags)
                    .context("stored hashtags are not a JSON array")?,
                image_prompt: row.try_get("image_prompt")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(posts))
}

#[instrument(skip_all)]
pub async fn clear_all(pool: &Pool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for table in [
        "articles",
        "feature_images",
        "social_posts",
        "social_post_lists",
    ] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn bundle(title: &str) -> ArticleBundle {
        ArticleBundle {
            article: GeneratedArticle {
                title: title.into(),
                image_prompt: "P".into(),
                video_prompt: "V".into(),
                article_content: "C".into(),
            },
            feature_image: GeneratedImage::jpeg(vec![1, 2, 3]),
        }
    }

    #[test]
    fn prepare_sqlite_url_passes_memory_through() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("postgres://localhost/db"),
            "postgres://localhost/db"
        );
    }

    #[test]
    fn prepare_sqlite_url_keeps_query_and_creates_parent() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested").join("newzly.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        assert_eq!(prepare_sqlite_url(&url), url);
        assert!(td.path().join("nested").exists());
    }

    #[tokio::test]
    async fn save_and_load_bundle() {
        let pool = setup_pool().await;
        assert!(load_article(&pool).await.unwrap().is_none());

        let run_id = Uuid::new_v4();
        save_bundle(&pool, run_id, "https://example.com/a", &bundle("T"))
            .await
            .unwrap();

        let stored = load_article(&pool).await.unwrap().unwrap();
        assert_eq!(stored.run_id, run_id);
        assert_eq!(stored.source_url.as_deref(), Some("https://example.com/a"));
        assert_eq!(stored.article.title, "T");
        let image = load_feature_image(&pool).await.unwrap().unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);

        save_bundle(&pool, Uuid::new_v4(), "https://example.com/b", &bundle("T2"))
            .await
            .unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(load_article(&pool).await.unwrap().unwrap().article.title, "T2");
    }

    #[tokio::test]
    async fn update_requires_stored_article() {
        let pool = setup_pool().await;
        let edited = bundle("Edited").article;
        assert!(update_article(&pool, &edited).await.is_err());

        save_bundle(&pool, Uuid::new_v4(), "https://example.com/a", &bundle("T"))
            .await
            .unwrap();
        update_article(&pool, &edited).await.unwrap();
        assert_eq!(
            load_article(&pool).await.unwrap().unwrap().article.title,
            "Edited"
        );
    }

    #[tokio::test]
    async fn social_posts_keep_order_and_clear() {
        let pool = setup_pool().await;
        assert!(load_social_posts(&pool).await.unwrap().is_none());

        let posts = vec![
            SocialPost {
                platform: Platform::Twitter,
                caption: "one".into(),
                hashtags: vec!["#a".into()],
                image_prompt: "p1".into(),
            },
            SocialPost {
                platform: Platform::Facebook,
                caption: "two".into(),
                hashtags: vec![],
                image_prompt: "p2".into(),
            },
        ];
        replace_social_posts(&pool, &posts).await.unwrap();
        assert_eq!(load_social_posts(&pool).await.unwrap(), Some(posts));

        save_bundle(&pool, Uuid::new_v4(), "https://example.com/a", &bundle("T"))
            .await
            .unwrap();
        assert!(load_social_posts(&pool).await.unwrap().is_none());

        clear_all(&pool).await.unwrap();
        assert!(load_article(&pool).await.unwrap().is_none());
        assert!(load_feature_image(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_post_list_survives_reload() {
        let pool = setup_pool().await;
        replace_social_posts(&pool, &[]).await.unwrap();
        assert_eq!(load_social_posts(&pool).await.unwrap(), Some(vec![]));

        clear_social_posts(&pool).await.unwrap();
        assert!(load_social_posts(&pool).await.unwrap().is_none());

        replace_social_posts(&pool, &[]).await.unwrap();
        clear_all(&pool).await.unwrap();
        assert!(load_social_posts(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_hashtags_surface_as_error() {
        let pool = setup_pool().await;
        sqlx::query(
            "INSERT INTO social_posts (position, platform, caption, hashtags, image_prompt) VALUES (0, 'Twitter', 'c', 'not json', 'p')",
        )
        .execute(&pool)
        .await
        .unwrap();
        assert!(load_social_posts(&pool).await.is_err());
    }
}
