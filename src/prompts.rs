//! Prompt text and response schemas sent to the text model.
use serde_json::{json, Value};

fn keyword_instruction(seo_keywords: &str) -> String {
    if seo_keywords.trim().is_empty() {
        return String::new();
    }
    format!(
        r#"
**SEO Keyword Integration:**
You have been provided with the following list of SEO keywords: "{seo_keywords}".
*   **Headline:** At least one of the primary keywords must be naturally integrated into the headline.
*   **Article Body:** Weave these keywords naturally throughout the article content, especially in subheadings and the first few paragraphs. Do not "keyword stuff". The integration must feel organic and relevant to the context. Aim for a sensible keyword density.
"#
    )
}

pub fn article_prompt(url: &str, language: &str, seo_keywords: &str) -> String {
    let keywords = keyword_instruction(seo_keywords);
    format!(
        r#"
**Persona:**
Assume the persona of a seasoned, witty journalist for a top-tier online publication known for its sharp, insightful tech and culture commentary. You are writing an in-depth feature article, not a dry news report. Your goal is to inform, engage, and make the reader think.

**Primary Task:**
Write a 100% original, deeply researched, and highly engaging news article in {language}. The article's foundation is the content from this URL: {url}. You must synthesize the information, not just rephrase it, and build a compelling new narrative.
{keywords}
**Article Structure & Content Guidelines:**
1.  **Captivating Headline:** Create a headline that is intriguing and informative but avoids cheap clickbait.
2.  **Hooking Introduction (1-2 paragraphs):** Start with a powerful hook: a surprising fact, a relatable anecdote, or a provocative question. Set the scene and state why this topic is important right now.
3.  **Main Body (Multiple Sections):**
    *   Break the core story into logical sections using clear, compelling subheadings (Markdown: '## Subheading').
    *   For each section, go beyond surface-level facts. Explain the 'why' and 'how'.
    *   Incorporate different perspectives. If there are debates or opposing views, present them.
    *   Weave in a human element with illustrative examples or synthesized quotes.
4.  **Insight & Analysis (1-2 paragraphs):** What are the broader implications of this news for the industry, for society, for the reader? Offer a unique perspective.
5.  **Forward-Looking Conclusion (1 paragraph):** Do not just summarize. End with a thought-provoking statement or question about the future.

**Style & Tone Requirements:**
*   **Language:** The entire output must be in {language}.
*   **Voice:** Authoritative, intelligent, and conversational with a touch of wit.
*   **Sentence Fluency:** Mix short, punchy statements with longer, more descriptive sentences.
*   **Vivid Language:** Use strong verbs, metaphors, and clear analogies to explain complex ideas.
*   **STRICTLY AVOID:** AI clichés, robotic or academic language, unexplained jargon, emojis or hyperlinks.
*   **Length:** Aim for a comprehensive feature piece, around 1200-1800 words.

**Output Format:**
Return a single, valid JSON object with the exact keys: "title", "imagePrompt", "videoPrompt", and "articleContent". Ensure the "articleContent" value contains the full article formatted with Markdown subheadings.
"#
    )
}

pub fn article_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "A clickbait yet professional title."
            },
            "imagePrompt": {
                "type": "STRING",
                "description": "Create a safe-for-work (SFW), high-quality, photorealistic 16:9 feature image prompt. The prompt must be purely descriptive of a visual scene, avoiding any names, controversial topics, or ambiguous terms that could be misinterpreted. Do not ask for any text to be rendered in the image."
            },
            "videoPrompt": {
                "type": "STRING",
                "description": "Generate a highly descriptive, scene-by-scene prompt for a 15-30 second video summarizing the article, as a single paragraph. Specify the overall tone, key visuals with camera angles and scene transitions for several short scenes, concise on-screen text overlays, a royalty-free music style, and a closing call to action."
            },
            "articleContent": {
                "type": "STRING",
                "description": "The full news article (1000-1500 words) in the specified language, following all the rules, with subheadings prefixed by '##'."
            }
        },
        "required": ["title", "imagePrompt", "videoPrompt", "articleContent"]
    })
}

pub fn social_prompt(article_content: &str) -> String {
    format!(
        r#"
Based on the following news article, create a series of SEO-optimized social media posts.

For each post, provide:
1. A compelling caption.
2. A list of relevant hashtags, with each hashtag STARTING WITH the '#' symbol.
3. A safe-for-work (SFW), purely descriptive prompt for a visually appealing, postcard-style square (1:1 aspect ratio) image. The prompt must avoid names, controversial topics, or ambiguous terms. Do not ask for any text to be rendered in the image.

Article:
---
{article_content}
---

Generate posts for the following platforms: Facebook, Instagram, Twitter, and LinkedIn. Your output must be in JSON format.
"#
    )
}

pub fn social_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "platform": {
                    "type": "STRING",
                    "enum": ["Facebook", "Instagram", "Twitter", "LinkedIn"],
                    "description": "The social media platform."
                },
                "caption": {
                    "type": "STRING",
                    "description": "A compelling caption for the post."
                },
                "hashtags": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "An array of relevant hashtags, each one starting with '#'."
                },
                "imagePrompt": {
                    "type": "STRING",
                    "description": "A detailed, SFW prompt for generating a postcard-style image, avoiding names, controversial topics, or ambiguous terms."
                }
            },
            "required": ["platform", "caption", "hashtags", "imagePrompt"]
        }
    })
}
