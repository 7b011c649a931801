use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::media::{GeneratedImage, VideoJob};
use crate::types::Priority;

const LONG_PROMPT: &str =
    "A sunlit campsite at dawn, a green tent glowing softly, mist over the lake, photorealistic";

fn suggestion(id: &str) -> Suggestion {
    Suggestion {
        id: id.to_owned(),
        title: "Own the shipping delays".to_owned(),
        rationale: "Negative chatter about delivery".to_owned(),
        topic: "delivery".to_owned(),
        priority: Priority::High,
        suggested_copy: "We hear you.".to_owned(),
        tone: "empathetic".to_owned(),
    }
}

fn ad(headline: &str) -> Value {
    json!({
        "headline": headline,
        "body": "Faster shipping is here.",
        "call_to_action": "Shop now",
        "hashtags": ["camping", "#outdoors"],
        "objective": "awareness",
        "image_prompt": LONG_PROMPT
    })
}

/// Pops one scripted reply per call; `Err` entries become failures.
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<Value, InsightsError>>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<Value, InsightsError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, _: &str, _: bool, temperature: f32) -> Result<String, InsightsError> {
        assert!((temperature - 0.7).abs() < f32::EPSILON);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InsightsError::EmptyResponse("script exhausted".to_owned())))
            .map(|v| v.to_string())
    }
}

/// Fails for prompts containing "FAIL", otherwise returns a URL per call.
struct FakeImages {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, InsightsError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(prompt.to_owned());
        if prompt.contains("FAIL") {
            return Err(InsightsError::Media("content policy".to_owned()));
        }
        Ok(GeneratedImage {
            url: format!("https://img/{}.png", calls.len()),
            revised_prompt: None,
        })
    }
}

/// Completes immediately, with or without a URL.
struct FakeVideo {
    url: Option<&'static str>,
}

#[async_trait]
impl VideoGenerator for FakeVideo {
    async fn submit(&self, _: &VideoRequest) -> Result<VideoJob, InsightsError> {
        Ok(VideoJob {
            job_id: "req-1".to_owned(),
            status: VideoStatus::Pending,
            url: None,
        })
    }

    async fn poll(&self, job_id: &str) -> Result<VideoJob, InsightsError> {
        Ok(VideoJob {
            job_id: job_id.to_owned(),
            status: VideoStatus::Completed,
            url: self.url.map(str::to_owned),
        })
    }
}

struct NoCredentials;

#[async_trait]
impl ImageGenerator for NoCredentials {
    async fn generate_image(&self, _: &str) -> Result<GeneratedImage, InsightsError> {
        Err(InsightsError::MissingCredential("XAI_API_KEY".to_owned()))
    }
}

fn orchestrator(
    llm: ScriptedLlm,
    images: Arc<dyn ImageGenerator>,
    video: FakeVideo,
    options: CreativeOptions,
) -> CreativeOrchestrator {
    CreativeOrchestrator::new(Arc::new(llm), images, Arc::new(video), options)
}

fn fake_images() -> Arc<FakeImages> {
    Arc::new(FakeImages {
        calls: Mutex::new(Vec::new()),
    })
}

#[test]
fn parse_validates_and_numbers_surviving_ads() {
    let mut short_prompt = ad("Short");
    short_prompt["image_prompt"] = json!("too short");
    let mut bad_objective = ad("Bad");
    bad_objective["objective"] = json!("virality");
    let mut no_hashtags = ad("None");
    no_hashtags.as_object_mut().unwrap().remove("hashtags");

    let ads = parse_ad_ideas(
        json!({"ads": [short_prompt, ad("First"), bad_objective, no_hashtags, ad("Second")]}),
        "sug-1",
        AdFormat::SingleImage,
        4,
    );
    let ids: Vec<&str> = ads.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["ad-sug-1-1", "ad-sug-1-2"]);
    assert_eq!(ads[0].headline, "First");
    assert_eq!(ads[0].hashtags, vec!["#camping", "#outdoors"]);
    assert_eq!(ads[0].objective, Objective::Awareness);
    assert_eq!(ads[0].suggestion_id, "sug-1");
}

#[test]
fn parse_caps_at_requested_count() {
    let items: Vec<Value> = (0..6).map(|i| ad(&format!("Ad {i}"))).collect();
    let ads = parse_ad_ideas(Value::Array(items), "s", AdFormat::SingleImage, 4);
    assert_eq!(ads.len(), 4);
}

#[test]
fn prompt_of_exactly_fifty_chars_is_rejected() {
    let mut item = ad("Edge");
    item["image_prompt"] = json!("x".repeat(MIN_PROMPT_CHARS));
    assert!(parse_ad_ideas(item, "s", AdFormat::SingleImage, 4).is_empty());
    let mut item = ad("Edge");
    item["image_prompt"] = json!("x".repeat(MIN_PROMPT_CHARS + 1));
    assert_eq!(parse_ad_ideas(item, "s", AdFormat::SingleImage, 4).len(), 1);
}

#[test]
fn post_text_joins_copy_and_hashtags() {
    let text = compose_post_text("Head", "Body", "Buy", &["#a".to_owned(), "#b".to_owned()]);
    assert_eq!(text, "Head\n\nBody\n\nBuy #a #b");
}

#[tokio::test]
async fn image_failure_drops_only_that_ad() {
    let mut failing = ad("Broken");
    failing["image_prompt"] = json!(format!("FAIL {LONG_PROMPT}"));
    let llm = ScriptedLlm::new(vec![Ok(json!({"ads": [ad("One"), failing, ad("Three")]}))]);
    let images = fake_images();
    let orch = orchestrator(
        llm,
        images.clone(),
        FakeVideo { url: None },
        CreativeOptions::default(),
    );

    let out = orch.generate(&[suggestion("sug-1")], &[], "acmegear").await.unwrap();

    assert_eq!(images.calls.lock().unwrap().len(), 3);
    let ids: Vec<&str> = out.ad_ideas.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["ad-sug-1-1", "ad-sug-1-3"]);
    assert_eq!(out.media.len(), 2);
    for (ad, media) in out.ad_ideas.iter().zip(&out.media) {
        assert_eq!(media.ad_idea_id, ad.id);
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(ad.generated_media_url, media.url);
        assert_eq!(media.width, Some(1024));
    }
}

#[tokio::test]
async fn failed_ad_call_does_not_abort_other_suggestions() {
    let llm = ScriptedLlm::new(vec![
        Err(InsightsError::MalformedResponse("oops".to_owned())),
        Ok(json!([ad("Only")])),
    ]);
    let options = CreativeOptions {
        max_suggestions: 2,
        ..CreativeOptions::default()
    };
    let orch = orchestrator(llm, fake_images(), FakeVideo { url: None }, options);

    let out = orch
        .generate(&[suggestion("a"), suggestion("b"), suggestion("c")], &[], "acmegear")
        .await
        .unwrap();
    assert_eq!(out.ad_ideas.len(), 1);
    assert_eq!(out.ad_ideas[0].suggestion_id, "b");
}

#[tokio::test]
async fn only_top_suggestions_get_creatives() {
    let llm = ScriptedLlm::new(vec![Ok(json!([ad("One")])), Ok(json!([ad("Two")]))]);
    let orch = orchestrator(llm, fake_images(), FakeVideo { url: None }, CreativeOptions::default());
    let out = orch
        .generate(&[suggestion("a"), suggestion("b")], &[], "acmegear")
        .await
        .unwrap();
    assert_eq!(out.ad_ideas.len(), 1);
    assert_eq!(out.ad_ideas[0].suggestion_id, "a");
}

#[tokio::test]
async fn completed_video_without_url_is_dropped() {
    let llm = ScriptedLlm::new(vec![Ok(json!([ad("Video")]))]);
    let options = CreativeOptions {
        format: AdFormat::Video,
        video_poll_interval: Duration::ZERO,
        ..CreativeOptions::default()
    };
    let orch = orchestrator(llm, fake_images(), FakeVideo { url: None }, options);
    let out = orch.generate(&[suggestion("s")], &[], "acmegear").await.unwrap();
    assert!(out.ad_ideas.is_empty());
    assert!(out.media.is_empty());
}

#[tokio::test]
async fn completed_video_is_attached() {
    let llm = ScriptedLlm::new(vec![Ok(json!([ad("Video")]))]);
    let options = CreativeOptions {
        format: AdFormat::Video,
        video_poll_interval: Duration::ZERO,
        ..CreativeOptions::default()
    };
    let orch = orchestrator(
        llm,
        fake_images(),
        FakeVideo {
            url: Some("https://v/req-1.mp4"),
        },
        options,
    );
    let out = orch.generate(&[suggestion("s")], &[], "acmegear").await.unwrap();
    let ad = &out.ad_ideas[0];
    assert_eq!(ad.format, AdFormat::Video);
    assert_eq!(ad.video_status, Some(VideoStatus::Completed));
    assert_eq!(ad.generated_media_url.as_deref(), Some("https://v/req-1.mp4"));
    assert_eq!(out.media[0].kind, MediaKind::Video);
    assert_eq!(out.media[0].job_id.as_deref(), Some("req-1"));
}

#[tokio::test]
async fn async_video_returns_pending_job() {
    let llm = ScriptedLlm::new(vec![Ok(json!([ad("Video")]))]);
    let options = CreativeOptions {
        format: AdFormat::Video,
        video_mode: VideoMode::Async,
        ..CreativeOptions::default()
    };
    let orch = orchestrator(llm, fake_images(), FakeVideo { url: None }, options);
    let out = orch.generate(&[suggestion("s")], &[], "acmegear").await.unwrap();
    let ad = &out.ad_ideas[0];
    assert_eq!(ad.video_status, Some(VideoStatus::Pending));
    assert_eq!(ad.video_job_id.as_deref(), Some("req-1"));
    assert!(ad.generated_media_url.is_none());
    assert_eq!(out.media[0].status, VideoStatus::Pending);
}

#[tokio::test]
async fn missing_credentials_abort_generation() {
    let llm = ScriptedLlm::new(vec![Ok(json!([ad("One")]))]);
    let orch = orchestrator(
        llm,
        Arc::new(NoCredentials),
        FakeVideo { url: None },
        CreativeOptions::default(),
    );
    let err = orch
        .generate(&[suggestion("s")], &[], "acmegear")
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}
