use std::path::PathBuf;

use brandpulse_insights::{AdFormat, ScoredMention, VideoMode};

use super::*;
use crate::insights::{order_mentions, pipeline_options, InsightsArgs};

fn config() -> brandpulse_core::AppConfig {
    brandpulse_core::load_app_config().expect("default config should load")
}

fn args(video: bool, async_video: bool) -> InsightsArgs {
    InsightsArgs {
        brand: "acme".to_owned(),
        skip_creative: false,
        skip_playbooks: false,
        video,
        async_video,
        sort: MentionOrder::Fetch,
        output: None,
    }
}

fn scored(id: &str, engagement_score: u64, created_at: &str) -> ScoredMention {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "text": "text",
        "author_id": "author",
        "created_at": created_at,
        "engagement_score": engagement_score
    }))
    .unwrap()
}

fn ids(mentions: &[ScoredMention]) -> Vec<&str> {
    mentions.iter().map(|m| m.mention.id.as_str()).collect()
}

#[test]
fn parses_insights_command() {
    let cli = Cli::try_parse_from(["brandpulse", "insights", "--brand", "Acme"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Insights {
            ref brand,
            skip_creative: false,
            skip_playbooks: false,
            video: false,
            async_video: false,
            sort: MentionOrder::Fetch,
            output: None,
        } if brand == "Acme"
    ));
}

#[test]
fn parses_insights_flags() {
    let cli = Cli::try_parse_from([
        "brandpulse",
        "insights",
        "--brand",
        "tesla",
        "--skip-playbooks",
        "--async-video",
        "--output",
        "out.json",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Commands::Insights {
            skip_playbooks: true,
            async_video: true,
            output: Some(ref path),
            ..
        } if path == &PathBuf::from("out.json")
    ));
}

#[test]
fn parses_sort_order() {
    let cli = Cli::try_parse_from([
        "brandpulse",
        "insights",
        "--brand",
        "acme",
        "--sort",
        "engagement",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Insights {
            sort: MentionOrder::Engagement,
            ..
        }
    ));

    assert!(
        Cli::try_parse_from(["brandpulse", "insights", "--brand", "acme", "--sort", "likes"])
            .is_err()
    );
}

#[test]
fn insights_requires_brand() {
    assert!(Cli::try_parse_from(["brandpulse", "insights"]).is_err());
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["brandpulse"]).is_err());
}

#[test]
fn parses_history_commands() {
    let show = Cli::try_parse_from(["brandpulse", "history", "show"]).unwrap();
    assert!(matches!(
        show.command,
        Commands::History {
            command: HistoryCommands::Show
        }
    ));

    let clear = Cli::try_parse_from(["brandpulse", "history", "clear"]).unwrap();
    assert!(matches!(
        clear.command,
        Commands::History {
            command: HistoryCommands::Clear
        }
    ));
}

#[test]
fn parses_video_status_job_id() {
    let cli = Cli::try_parse_from(["brandpulse", "video-status", "req-42"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::VideoStatus { ref job_id } if job_id == "req-42"
    ));
}

#[test]
fn worker_collects_repeated_brands_and_default_schedule() {
    let cli =
        Cli::try_parse_from(["brandpulse", "worker", "--brand", "acme", "--brand", "tesla"])
            .unwrap();
    match cli.command {
        Commands::Worker {
            brands,
            schedule,
            output_dir,
        } => {
            assert_eq!(brands, vec!["acme", "tesla"]);
            assert_eq!(schedule, "0 0 */3 * * *");
            assert_eq!(output_dir, PathBuf::from("data/insights"));
        }
        other => panic!("expected worker command, got {other:?}"),
    }
}

#[test]
fn worker_requires_a_brand() {
    assert!(Cli::try_parse_from(["brandpulse", "worker"]).is_err());
}

#[test]
fn default_run_generates_images_and_waits() {
    let options = pipeline_options(&config(), &args(false, false));
    assert_eq!(options.creative.format, AdFormat::SingleImage);
    assert_eq!(options.creative.video_mode, VideoMode::Wait);
    assert!(!options.skip_creative);
}

#[test]
fn async_video_flag_selects_video_async() {
    let options = pipeline_options(&config(), &args(true, true));
    assert_eq!(options.creative.format, AdFormat::Video);
    assert_eq!(options.creative.video_mode, VideoMode::Async);
}

#[test]
fn mentions_are_reordered_on_request() {
    let mentions = vec![
        scored("old-popular", 40, "2024-01-01T00:00:00Z"),
        scored("new-quiet", 1, "2024-03-01T00:00:00Z"),
        scored("mid", 40, "2024-02-01T00:00:00Z"),
    ];

    let fetch = order_mentions(mentions.clone(), MentionOrder::Fetch);
    assert_eq!(ids(&fetch), vec!["old-popular", "new-quiet", "mid"]);

    let engagement = order_mentions(mentions.clone(), MentionOrder::Engagement);
    assert_eq!(ids(&engagement), vec!["old-popular", "mid", "new-quiet"]);

    let recency = order_mentions(mentions, MentionOrder::Recency);
    assert_eq!(ids(&recency), vec!["new-quiet", "mid", "old-popular"]);
}
