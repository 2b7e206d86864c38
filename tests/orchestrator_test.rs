mod common;

use common::{quota_error, Call, RecordingGemini, ARTICLE_JSON};
use newzly::error::GenerationError;
use newzly::model::{AspectRatio, GeneratedImage, GenerationOptions, LoadingStep, StepStatus};
use newzly::orchestrator::{self, Orchestrator, ARTICLE_STEPS};

use StepStatus::{Active as A, Done as D, Pending as P};

fn statuses(snapshots: &[Vec<LoadingStep>]) -> Vec<Vec<StepStatus>> {
    snapshots
        .iter()
        .map(|s| s.iter().map(|step| step.status).collect())
        .collect()
}

#[tokio::test]
async fn run_completes_every_step_in_order() {
    let gemini = RecordingGemini::default();
    gemini.push_text(Ok(ARTICLE_JSON.into())).await;
    gemini
        .push_image(Ok(Some(GeneratedImage::jpeg(vec![0xff, 0xd8]))))
        .await;

    let mut snapshots: Vec<Vec<LoadingStep>> = Vec::new();
    let mut observer = |steps: &[LoadingStep]| snapshots.push(steps.to_vec());
    let mut run = Orchestrator::new(&gemini);
    let bundle = run
        .run(
            "https://example.com/post",
            &GenerationOptions::default(),
            &mut observer,
        )
        .await
        .unwrap();

    assert_eq!(bundle.article.title, "T");
    assert_eq!(bundle.article.image_prompt, "P");
    assert_eq!(bundle.article.video_prompt, "V");
    assert_eq!(bundle.article.article_content, "C");
    assert_eq!(bundle.feature_image.bytes, vec![0xff, 0xd8]);

    let labels: Vec<&str> = run.steps().iter().map(|s| s.label).collect();
    assert_eq!(labels, ARTICLE_STEPS.to_vec());
    assert!(run.steps().iter().all(|s| s.status == D));

    assert_eq!(
        statuses(&snapshots),
        vec![
            vec![P, P, P],
            vec![A, P, P],
            vec![D, P, P],
            vec![D, A, P],
            vec![D, D, P],
            vec![D, D, A],
            vec![D, D, D],
        ]
    );

    let calls = gemini.calls().await;
    assert_eq!(calls.len(), 2);
    match &calls[0] {
        Call::Text { prompt, .. } => assert!(prompt.contains("https://example.com/post")),
        other => panic!("unexpected first call: {:?}", other),
    }
    assert_eq!(
        calls[1],
        Call::Image {
            prompt: "P".into(),
            aspect_ratio: AspectRatio::Landscape,
        }
    );
}

#[tokio::test]
async fn quota_failure_skips_image_and_clears_steps() {
    let gemini = RecordingGemini::default();
    gemini.push_text(Err(quota_error())).await;

    let mut snapshots: Vec<Vec<LoadingStep>> = Vec::new();
    let mut observer = |steps: &[LoadingStep]| snapshots.push(steps.to_vec());
    let mut run = Orchestrator::new(&gemini);
    let err = run
        .run(
            "https://example.com",
            &GenerationOptions::default(),
            &mut observer,
        )
        .await
        .unwrap_err();

    assert!(err.is_quota());
    let message = orchestrator::failure_message(&err);
    assert!(message.starts_with("Failed to generate the article. "));
    assert!(message.contains("quota limits"));

    assert!(run.steps().is_empty());
    assert_eq!(snapshots.last().map(Vec::len), Some(0));
    assert_eq!(gemini.count(|c| matches!(c, Call::Image { .. })).await, 0);
}

#[tokio::test]
async fn blocked_feature_image_aborts_run() {
    let gemini = RecordingGemini::default();
    gemini.push_text(Ok(ARTICLE_JSON.into())).await;
    gemini.push_image(Ok(None)).await;

    let mut observer = |_: &[LoadingStep]| {};
    let mut run = Orchestrator::new(&gemini);
    let err = run
        .run(
            "https://example.com",
            &GenerationOptions::default(),
            &mut observer,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::SafetyBlocked(_)));
    assert!(err.to_string().contains("safety filters"));
    assert!(run.steps().is_empty());
}

#[tokio::test]
async fn malformed_article_is_a_parse_error() {
    let gemini = RecordingGemini::default();
    gemini.push_text(Ok("this is not json".into())).await;

    let mut observer = |_: &[LoadingStep]| {};
    let mut run = Orchestrator::new(&gemini);
    let err = run
        .run(
            "https://example.com",
            &GenerationOptions::default(),
            &mut observer,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Parse { .. }));
    assert_eq!(gemini.calls().await.len(), 1);
}

#[tokio::test]
async fn options_reach_the_text_request() {
    let gemini = RecordingGemini::default();
    gemini.push_text(Ok(ARTICLE_JSON.into())).await;
    gemini
        .push_image(Ok(Some(GeneratedImage::jpeg(vec![1]))))
        .await;

    let options = GenerationOptions {
        model: "gemini-2.5-pro".into(),
        language: "German".into(),
        seo_keywords: "rust, async".into(),
    };
    let mut observer = |_: &[LoadingStep]| {};
    Orchestrator::new(&gemini)
        .run("https://example.com", &options, &mut observer)
        .await
        .unwrap();

    match &gemini.calls().await[0] {
        Call::Text { model, prompt } => {
            assert_eq!(model, "gemini-2.5-pro");
            assert!(prompt.contains("German"));
            assert!(prompt.contains("rust, async"));
        }
        other => panic!("unexpected call: {:?}", other),
    }
}
