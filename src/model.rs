use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_LANGUAGE: &str = "English";

pub const LANGUAGES: &[&str] = &[
    "Chinese",
    "Dutch",
    "English",
    "French",
    "German",
    "Hindi",
    "Italian",
    "Japanese",
    "Portuguese",
    "Russian",
    "Spanish",
];

const META_DESCRIPTION_LEN: usize = 160;

/// Structured article returned by the text model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub title: String,
    pub image_prompt: String,
    pub video_prompt: String,
    pub article_content: String,
}

impl GeneratedArticle {
    /// All four fields must carry text for the article to be usable.
    pub fn is_complete(&self) -> bool {
        [
            &self.title,
            &self.image_prompt,
            &self.video_prompt,
            &self.article_content,
        ]
        .iter()
        .all(|f| !f.is_empty())
    }

    pub fn page_title(&self) -> String {
        format!("{} | NEWZLY", self.title)
    }

    /// First non-empty line of the content, cut to 160 characters.
    pub fn meta_description(&self) -> String {
        let first = self
            .article_content
            .split('\n')
            .find(|p| !p.trim().is_empty())
            .unwrap_or("");
        let snippet: String = first.chars().take(META_DESCRIPTION_LEN).collect();
        let snippet = snippet.trim();
        if snippet.chars().count() >= META_DESCRIPTION_LEN {
            format!("{snippet}...")
        } else {
            snippet.to_string()
        }
    }

    pub fn copy_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.article_content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Instagram,
    Twitter,
    LinkedIn,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Twitter,
        Platform::LinkedIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
            Platform::Twitter => "Twitter",
            Platform::LinkedIn => "LinkedIn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Caption length limit. Facebook's is a practical soft limit.
    pub fn character_limit(&self) -> usize {
        match self {
            Platform::Twitter => 280,
            Platform::Instagram => 2200,
            Platform::Facebook => 5000,
            Platform::LinkedIn => 3000,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    pub platform: Platform,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub image_prompt: String,
}

/// Caption length relative to the platform limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionLength {
    Ok,
    Near,
    Over,
}

impl SocialPost {
    pub fn caption_length(&self) -> CaptionLength {
        let limit = self.platform.character_limit();
        let count = self.caption.chars().count();
        if count > limit {
            CaptionLength::Over
        } else if count * 10 > limit * 9 {
            CaptionLength::Near
        } else {
            CaptionLength::Ok
        }
    }

    pub fn hashtag_line(&self) -> String {
        self.hashtags.join(" ")
    }

    pub fn share_text(&self) -> String {
        format!("{}\n\n{}", self.caption, self.hashtag_line())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Landscape,
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".into(),
            bytes,
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            _ => "jpg",
        }
    }
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedVideo {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for GeneratedVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedVideo")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// User-selected options for article generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub model: String,
    pub language: String,
    pub seo_keywords: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            language: DEFAULT_LANGUAGE.into(),
            seo_keywords: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingStep {
    pub label: &'static str,
    pub status: StepStatus,
}

/// Provider-assigned name of a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One status fetch of a long-running operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStatus {
    pub done: bool,
    pub result_locator: Option<String>,
    pub error: Option<String>,
}
