//! Article pipeline: article text first, then a feature image built from the
//! prompt embedded in that text.
use tracing::{debug, info, instrument, warn};

use crate::error::GenerationError;
use crate::gemini::GeminiService;
use crate::model::{
    AspectRatio, GeneratedArticle, GeneratedImage, GenerationOptions, LoadingStep, StepStatus,
};
use crate::prompts;

pub const ARTICLE_STEPS: [&str; 3] = [
    "Analyzing URL and crafting article...",
    "Generating feature image...",
    "Finalizing content...",
];

const FEATURE_IMAGE_BLOCKED: &str = "The generated image prompt was blocked by safety filters. Try generating the article again to get a new prompt.";

/// Receives a snapshot of the step list after every transition. An empty
/// snapshot means progress was reset.
pub trait StepObserver {
    fn steps_changed(&mut self, steps: &[LoadingStep]);
}

impl<F> StepObserver for F
where
    F: FnMut(&[LoadingStep]),
{
    fn steps_changed(&mut self, steps: &[LoadingStep]) {
        self(steps)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleBundle {
    pub article: GeneratedArticle,
    pub feature_image: GeneratedImage,
}

pub struct Orchestrator<'a> {
    service: &'a dyn GeminiService,
    steps: Vec<LoadingStep>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(service: &'a dyn GeminiService) -> Self {
        Self {
            service,
            steps: Vec::new(),
        }
    }

    pub fn steps(&self) -> &[LoadingStep] {
        &self.steps
    }

    /// Run the three steps in order. Any failure clears progress and aborts.
    #[instrument(skip_all, fields(url = %url, model = %options.model))]
    pub async fn run(
        &mut self,
        url: &str,
        options: &GenerationOptions,
        observer: &mut dyn StepObserver,
    ) -> Result<ArticleBundle, GenerationError> {
        self.steps = ARTICLE_STEPS
            .into_iter()
            .map(|label| LoadingStep {
                label,
                status: StepStatus::Pending,
            })
            .collect();
        observer.steps_changed(&self.steps);

        self.advance(0, StepStatus::Active, observer);
        let article = match generate_article(self.service, url, options).await {
            Ok(article) => article,
            Err(err) => return Err(self.abort(err, observer)),
        };
        self.advance(0, StepStatus::Done, observer);

        self.advance(1, StepStatus::Active, observer);
        let feature_image = match generate_feature_image(self.service, &article.image_prompt).await
        {
            Ok(image) => image,
            Err(err) => return Err(self.abort(err, observer)),
        };
        self.advance(1, StepStatus::Done, observer);

        self.advance(2, StepStatus::Active, observer);
        self.advance(2, StepStatus::Done, observer);

        info!(title = %article.title, "article run complete");
        Ok(ArticleBundle {
            article,
            feature_image,
        })
    }

    fn advance(&mut self, index: usize, status: StepStatus, observer: &mut dyn StepObserver) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = status;
        }
        observer.steps_changed(&self.steps);
    }

    fn abort(&mut self, err: GenerationError, observer: &mut dyn StepObserver) -> GenerationError {
        warn!(error = %err, "article run aborted");
        self.steps.clear();
        observer.steps_changed(&self.steps);
        err
    }
}

/// Message shown to the user when a run fails.
pub fn failure_message(err: &GenerationError) -> String {
    format!("Failed to generate the article. {}", err)
}

#[instrument(skip_all, fields(language = %options.language))]
pub async fn generate_article(
    service: &dyn GeminiService,
    url: &str,
    options: &GenerationOptions,
) -> Result<GeneratedArticle, GenerationError> {
    let prompt = prompts::article_prompt(url, &options.language, &options.seo_keywords);
    let text = service
        .generate_text(&options.model, &prompt, &prompts::article_schema())
        .await
        .map_err(|e| GenerationError::from_api("Article generation", e))?;
    parse_article(&text)
}

pub fn parse_article(text: &str) -> Result<GeneratedArticle, GenerationError> {
    let json_text = text.trim();
    debug!(len = json_text.len(), "article JSON response received");
    match serde_json::from_str::<GeneratedArticle>(json_text) {
        Ok(article) if article.is_complete() => Ok(article),
        Ok(_) => {
            warn!("parsed article is missing required fields");
            Err(GenerationError::Parse { what: "article" })
        }
        Err(err) => {
            warn!(%err, "failed to parse article JSON");
            Err(GenerationError::Parse { what: "article" })
        }
    }
}

#[instrument(skip_all)]
pub async fn generate_feature_image(
    service: &dyn GeminiService,
    prompt: &str,
) -> Result<GeneratedImage, GenerationError> {
    let image = service
        .generate_image(prompt, AspectRatio::Landscape)
        .await
        .map_err(|e| GenerationError::from_api("Image generation", e))?;
    image.ok_or_else(|| {
        warn!("image generation returned no images; likely safety filtered");
        GenerationError::SafetyBlocked(FEATURE_IMAGE_BLOCKED)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_article_accepts_complete_json() {
        let article = parse_article(
            "  {\"title\":\"T\",\"imagePrompt\":\"P\",\"videoPrompt\":\"V\",\"articleContent\":\"C\"}\n",
        )
        .unwrap();
        assert_eq!(article.title, "T");
        assert_eq!(article.article_content, "C");
    }

    #[test]
    fn parse_article_rejects_missing_or_empty_fields() {
        let err = parse_article("{\"title\":\"T\"}").unwrap_err();
        assert!(matches!(err, GenerationError::Parse { what: "article" }));

        let err = parse_article(
            "{\"title\":\"\",\"imagePrompt\":\"P\",\"videoPrompt\":\"V\",\"articleContent\":\"C\"}",
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse the structured article"));

        assert!(parse_article("").is_err());
        assert!(parse_article("not json").is_err());
    }

    #[test]
    fn failure_message_prefixes_cause() {
        let err = GenerationError::QuotaExceeded {
            service: "Article generation",
        };
        assert!(failure_message(&err).starts_with("Failed to generate the article. Article generation failed due to API quota limits"));
    }
}
