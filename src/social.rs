//! Social media posts derived from a finished article.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::GenerationError;
use crate::gemini::GeminiService;
use crate::model::{AspectRatio, GeneratedImage, Platform, SocialPost, DEFAULT_MODEL};
use crate::prompts;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

const POST_IMAGE_BLOCKED: &str =
    "The image prompt was blocked or returned no content. Please try regenerating.";
const NO_IMAGE_PROMPT: &str = "No image prompt available.";

pub const FAILURE_MESSAGE: &str = "Failed to generate social media posts. Please try again.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    platform: String,
    caption: String,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    image_prompt: String,
}

#[instrument(skip_all)]
pub async fn generate_social_posts(
    service: &dyn GeminiService,
    article_content: &str,
) -> Result<Vec<SocialPost>, GenerationError> {
    let text = service
        .generate_text(
            DEFAULT_MODEL,
            &prompts::social_prompt(article_content),
            &prompts::social_schema(),
        )
        .await
        .map_err(|e| GenerationError::from_api("Social post generation", e))?;
    parse_posts(&text)
}

pub fn parse_posts(text: &str) -> Result<Vec<SocialPost>, GenerationError> {
    let json_text = text.trim();
    debug!(len = json_text.len(), "social posts JSON received");
    let raw: Vec<RawPost> = serde_json::from_str(json_text).map_err(|err| {
        warn!(%err, "failed to parse social posts JSON");
        GenerationError::Parse {
            what: "social posts",
        }
    })?;

    raw.into_iter()
        .map(|post| {
            let platform = Platform::parse(post.platform.trim()).ok_or_else(|| {
                warn!(platform = %post.platform, "unknown platform in social posts");
                GenerationError::Parse {
                    what: "social posts",
                }
            })?;
            Ok(SocialPost {
                platform,
                caption: post.caption,
                hashtags: normalize_hashtags(&post.hashtags),
                image_prompt: post.image_prompt,
            })
        })
        .collect()
}

/// Strip whitespace inside each tag, ensure a leading `#`, drop empty tags.
pub fn normalize_hashtags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| {
            let compact = WHITESPACE.replace_all(tag, "");
            let body = compact.trim_start_matches('#');
            if body.is_empty() {
                None
            } else {
                Some(format!("#{}", body))
            }
        })
        .collect()
}

/// Square image for one post.
#[instrument(skip_all, fields(platform = %post.platform))]
pub async fn generate_post_image(
    service: &dyn GeminiService,
    post: &SocialPost,
) -> Result<GeneratedImage, GenerationError> {
    if post.image_prompt.trim().is_empty() {
        return Err(GenerationError::InvalidInput(NO_IMAGE_PROMPT));
    }
    let image = service
        .generate_image(&post.image_prompt, AspectRatio::Square)
        .await
        .map_err(|e| GenerationError::from_api("Social image generation", e))?;
    image.ok_or_else(|| {
        warn!("social image generation returned no images");
        GenerationError::SafetyBlocked(POST_IMAGE_BLOCKED)
    })
}
