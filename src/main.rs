use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use newzly::config::{self, Config};
use newzly::db;
use newzly::gemini::GeminiClient;
use newzly::model::{
    CaptionLength, GeneratedArticle, GenerationOptions, LoadingStep, StepStatus, DEFAULT_LANGUAGE,
    LANGUAGES,
};
use newzly::poller::{self, VideoPoller};
use newzly::session::Session;

const EMPTY_VIDEO_PROMPT: &str = "Please enter a video prompt.";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generate articles, social posts and videos from a URL or prompt"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an article and feature image based on a URL
    Article {
        url: String,
        /// Text model id (defaults to gemini.text_model)
        #[arg(long)]
        model: Option<String>,
        /// Output language
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        language: String,
        /// Comma-separated SEO keywords
        #[arg(long, default_value = "")]
        keywords: String,
    },
    /// Generate social media posts for the stored article
    Social,
    /// Generate the square image of one social post
    PostImage {
        index: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render a video from a text prompt
    Video {
        prompt: String,
        #[arg(long, default_value = "newzly_video_summary.mp4")]
        out: PathBuf,
    },
    /// Print the stored article and posts
    Show,
    /// Replace the stored article's title and/or content
    Edit {
        #[arg(long)]
        title: Option<String>,
        /// File whose contents replace the article body
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// Delete all stored content
    Clear,
    /// Print an example config file
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::ExampleConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let client = GeminiClient::from_config(&cfg)?;

    if let Command::Video { prompt, out } = &args.command {
        return run_video(&cfg, &client, prompt, out).await;
    }

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database_url());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let options = GenerationOptions {
        model: cfg.gemini.text_model.clone(),
        ..GenerationOptions::default()
    };
    let mut session = Session::new(&client, pool, options);
    session.load().await?;

    match args.command {
        Command::Article {
            url,
            model,
            language,
            keywords,
        } => {
            if !LANGUAGES.contains(&language.as_str()) {
                bail!(
                    "unsupported language '{}'; choose one of: {}",
                    language,
                    LANGUAGES.join(", ")
                );
            }
            session.set_options(GenerationOptions {
                model: model.unwrap_or_else(|| cfg.gemini.text_model.clone()),
                language,
                seo_keywords: keywords,
            });
            let mut print_steps = |steps: &[LoadingStep]| print_progress(steps);
            if let Err(err) = session.generate_article(&url, &mut print_steps).await {
                error!(%err, "article generation failed");
                return Err(err);
            }
            if let Some(image) = session.feature_image() {
                let path = Path::new(&cfg.app.data_dir)
                    .join(format!("feature_image.{}", image.file_extension()));
                tokio::fs::write(&path, &image.bytes)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "feature image written");
            }
            print_article(&session);
        }
        Command::Social => {
            if session.article().is_none() {
                bail!("no stored article; run `newzly article <url>` first");
            }
            session.generate_social_posts().await?;
            print_posts(&session);
        }
        Command::PostImage { index, out } => {
            let image = session.post_image(index).await?;
            let out = out.unwrap_or_else(|| {
                PathBuf::from(format!("newzly_post_{}.{}", index, image.file_extension()))
            });
            tokio::fs::write(&out, &image.bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Saved image to {}", out.display());
        }
        Command::Show => {
            print_article(&session);
            print_posts(&session);
        }
        Command::Edit {
            title,
            content_file,
        } => {
            let Some(current) = session.article().cloned() else {
                bail!("no stored article to edit");
            };
            let article_content = match content_file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => current.article_content.clone(),
            };
            session
                .update_article(GeneratedArticle {
                    title: title.unwrap_or(current.title),
                    article_content,
                    ..current
                })
                .await?;
            print_article(&session);
        }
        Command::Clear => {
            session.clear().await?;
            println!("Cleared stored content.");
        }
        Command::Video { .. } | Command::ExampleConfig => {}
    }

    Ok(())
}

async fn run_video(cfg: &Config, client: &GeminiClient, prompt: &str, out: &Path) -> Result<()> {
    if prompt.trim().is_empty() {
        bail!(EMPTY_VIDEO_PROMPT);
    }
    let poller = VideoPoller::new(client).with_interval(cfg.video_poll_interval());
    let mut print_message = |message: &str| println!("{}", message);
    let video = match poller.generate_video(prompt, &mut print_message).await {
        Ok(video) => video,
        Err(err) => {
            let message = poller::failure_message(&err);
            error!(%err, "video generation failed");
            bail!(message);
        }
    };
    tokio::fs::write(out, &video.bytes)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("Saved video to {}", out.display());
    Ok(())
}

fn print_progress(steps: &[LoadingStep]) {
    if let Some(step) = steps.iter().rev().find(|s| s.status != StepStatus::Pending) {
        let marker = match step.status {
            StepStatus::Done => "[done]",
            _ => "[....]",
        };
        println!("{} {}", marker, step.label);
    }
}

fn print_article(session: &Session<'_>) {
    let Some(article) = session.article() else {
        println!("No stored article.");
        return;
    };
    println!("{}", article.page_title());
    println!("{}", article.meta_description());
    println!();
    println!("{}", article.copy_text());
    println!();
    println!("Video prompt: {}", article.video_prompt);
    if let Some(image) = session.feature_image() {
        println!("Feature image: {} ({} bytes)", image.mime_type, image.bytes.len());
    }
}

fn print_posts(session: &Session<'_>) {
    let Some(posts) = session.social_posts() else {
        return;
    };
    for (index, post) in posts.iter().enumerate() {
        let count = post.caption.chars().count();
        let limit = post.platform.character_limit();
        let note = match post.caption_length() {
            CaptionLength::Over => " (over limit)",
            CaptionLength::Near => " (near limit)",
            CaptionLength::Ok => "",
        };
        println!();
        println!("[{}] {} {}/{}{}", index, post.platform, count, limit, note);
        println!("{}", post.share_text());
        println!("Image prompt: {}", post.image_prompt);
    }
}
