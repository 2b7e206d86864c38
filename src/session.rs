//! User-facing state: the current article, its feature image and social
//! posts, progress steps and the last error. Persists through `db`.
use anyhow::{anyhow, bail, Result};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::gemini::GeminiService;
use crate::model::{GeneratedArticle, GeneratedImage, GenerationOptions, LoadingStep, SocialPost};
use crate::orchestrator::{self, Orchestrator, StepObserver};
use crate::social;

pub const EMPTY_URL: &str = "Please enter a valid URL.";

pub struct Session<'a> {
    service: &'a dyn GeminiService,
    pool: Pool,
    options: GenerationOptions,
    run_id: Option<Uuid>,
    article: Option<GeneratedArticle>,
    feature_image: Option<GeneratedImage>,
    social_posts: Option<Vec<SocialPost>>,
    steps: Vec<LoadingStep>,
    error: Option<String>,
}

impl<'a> Session<'a> {
    pub fn new(service: &'a dyn GeminiService, pool: Pool, options: GenerationOptions) -> Self {
        Self {
            service,
            pool,
            options,
            run_id: None,
            article: None,
            feature_image: None,
            social_posts: None,
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: GenerationOptions) {
        self.options = options;
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn article(&self) -> Option<&GeneratedArticle> {
        self.article.as_ref()
    }

    pub fn feature_image(&self) -> Option<&GeneratedImage> {
        self.feature_image.as_ref()
    }

    pub fn social_posts(&self) -> Option<&[SocialPost]> {
        self.social_posts.as_deref()
    }

    pub fn steps(&self) -> &[LoadingStep] {
        &self.steps
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Restore persisted content. Unreadable data is wiped rather than
    /// reported.
    #[instrument(skip_all)]
    pub async fn load(&mut self) -> Result<()> {
        match self.read_persisted().await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(?err, "failed to load stored content; clearing store");
                self.reset_state();
                db::clear_all(&self.pool).await
            }
        }
    }

    async fn read_persisted(&mut self) -> Result<()> {
        let stored = db::load_article(&self.pool).await?;
        let image = db::load_feature_image(&self.pool).await?;
        let posts = db::load_social_posts(&self.pool).await?;
        self.run_id = stored.as_ref().map(|s| s.run_id);
        self.article = stored.map(|s| s.article);
        self.feature_image = image;
        self.social_posts = posts;
        Ok(())
    }

    /// Run the article pipeline for `url`, replacing all current content.
    #[instrument(skip_all)]
    pub async fn generate_article(
        &mut self,
        url: &str,
        observer: &mut dyn StepObserver,
    ) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            self.error = Some(EMPTY_URL.to_string());
            bail!(EMPTY_URL);
        }
        self.clear().await?;

        let mut run = Orchestrator::new(self.service);
        let result = run.run(url, &self.options, observer).await;
        self.steps = run.steps().to_vec();
        match result {
            Ok(bundle) => {
                let run_id = Uuid::new_v4();
                if let Err(err) = db::save_bundle(&self.pool, run_id, url, &bundle).await {
                    error!(?err, "failed to store generated article");
                    self.steps.clear();
                    self.error = Some(format!("Failed to save the article. {}", err));
                    return Err(err);
                }
                info!(%run_id, title = %bundle.article.title, "article stored");
                self.run_id = Some(run_id);
                self.article = Some(bundle.article);
                self.feature_image = Some(bundle.feature_image);
                Ok(())
            }
            Err(err) => {
                let message = orchestrator::failure_message(&err);
                self.error = Some(message.clone());
                Err(anyhow!(message))
            }
        }
    }

    /// Generate social posts for the current article. Does nothing when no
    /// article is loaded.
    #[instrument(skip_all)]
    pub async fn generate_social_posts(&mut self) -> Result<()> {
        let Some(content) = self.article.as_ref().map(|a| a.article_content.clone()) else {
            return Ok(());
        };
        self.error = None;
        self.social_posts = None;
        db::clear_social_posts(&self.pool).await?;
        match social::generate_social_posts(self.service, &content).await {
            Ok(posts) => {
                db::replace_social_posts(&self.pool, &posts).await?;
                info!(count = posts.len(), "social posts stored");
                self.social_posts = Some(posts);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "social post generation failed");
                self.error = Some(social::FAILURE_MESSAGE.to_string());
                Err(anyhow!(social::FAILURE_MESSAGE))
            }
        }
    }

    /// Square image for the post at `index`.
    pub async fn post_image(&self, index: usize) -> Result<GeneratedImage> {
        let post = self
            .social_posts
            .as_ref()
            .and_then(|posts| posts.get(index))
            .ok_or_else(|| anyhow!("no social post at index {}", index))?;
        social::generate_post_image(self.service, post)
            .await
            .map_err(|err| {
                warn!(platform = %post.platform, error = %err, "post image failed");
                anyhow!(err)
            })
    }

    /// Replace the whole article with a user-edited version.
    #[instrument(skip_all)]
    pub async fn update_article(&mut self, edited: GeneratedArticle) -> Result<()> {
        if self.article.is_none() {
            bail!("no article to edit");
        }
        db::update_article(&self.pool, &edited).await?;
        self.article = Some(edited);
        Ok(())
    }

    /// Drop all content, progress and errors, in memory and on disk.
    pub async fn clear(&mut self) -> Result<()> {
        self.reset_state();
        db::clear_all(&self.pool).await
    }

    fn reset_state(&mut self) {
        self.run_id = None;
        self.article = None;
        self.feature_image = None;
        self.social_posts = None;
        self.steps.clear();
        self.error = None;
    }
}
