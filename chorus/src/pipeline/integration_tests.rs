//! End-to-end pipeline tests over mock backends.

use super::*;
use crate::events::CollectingEventSink;
use crate::stages::HEURISTIC_SELECTOR;
use crate::testing::mocks::{roster_of, verdict_json, MockBackend, MockReply};
use pretty_assertions::assert_eq;
use std::time::Duration;

const SEED: &str = "Thanks for reaching out! We're open 9-5.";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("chorus=debug")
        .with_test_writer()
        .try_init();
}

fn base_config() -> SynthesisConfig {
    SynthesisConfig {
        construction_backends: vec!["builder-a".to_string(), "builder-b".to_string()],
        style_backends: vec!["stylist".to_string()],
        primary_selector: "judge".to_string(),
        backup_selectors: vec!["backup".to_string()],
        variations_per_backend: 2,
        style_top_n: 2,
        call_timeout: Duration::from_millis(200),
        stage_timeout: Duration::from_millis(400),
        pipeline_timeout: Duration::from_secs(2),
        ..SynthesisConfig::default()
    }
}

fn happy_selector() -> MockBackend {
    MockBackend::scripted(
        "judge",
        vec![
            MockReply::Text("the judge's own draft".to_string()),
            MockReply::Text(verdict_json(0, 0.95, "best compliance")),
        ],
    )
}

#[tokio::test]
async fn test_all_backends_succeed() {
    init_tracing();
    let roster = roster_of(vec![
        MockBackend::always("builder-a", "draft from a"),
        MockBackend::always("builder-b", "draft from b"),
        MockBackend::always("stylist", "a polished reply"),
        happy_selector(),
        MockBackend::always("backup", &verdict_json(0, 0.5, "unused")),
    ]);

    let pipeline = SynthesisPipeline::new(roster, base_config()).unwrap();
    let result = pipeline.synthesize(SEED, &PipelineContext::new()).await;

    assert!(result.was_improved);
    assert_eq!(result.selector_used, "judge");
    assert!(result.backends_failed.is_empty());
    assert!(result.issues.is_empty());
    assert!(!result.final_text.is_empty());
}

#[tokio::test]
async fn test_style_roster_wiped_out() {
    let roster = roster_of(vec![
        MockBackend::always("builder-a", "draft from a"),
        MockBackend::always("builder-b", "draft from b"),
        MockBackend::slow("stylist", "too late", Duration::from_secs(10)),
        happy_selector(),
        MockBackend::always("backup", &verdict_json(0, 0.5, "unused")),
    ]);

    let pipeline = SynthesisPipeline::new(roster, base_config()).unwrap();
    let result = pipeline.synthesize(SEED, &PipelineContext::new()).await;

    // Selection ran over construction candidates only
    assert!(result.final_text.starts_with("draft from"));
    assert!(result
        .issues
        .iter()
        .any(|i| i.contains("style stage produced no candidates")));
    assert!(result.backends_failed.contains(&"stylist".to_string()));
}

#[tokio::test]
async fn test_every_backend_fails() {
    init_tracing();
    let roster = roster_of(vec![
        MockBackend::failing("builder-a", "down"),
        MockBackend::failing("builder-b", "down"),
        MockBackend::failing("stylist", "down"),
        MockBackend::failing("judge", "down"),
        MockBackend::failing("backup", "down"),
    ]);

    let pipeline = SynthesisPipeline::new(roster, base_config()).unwrap();
    let result = pipeline.synthesize(SEED, &PipelineContext::new()).await;

    assert_eq!(result.final_text, SEED);
    assert!(!result.was_improved);
    assert_eq!(result.selector_used, HEURISTIC_SELECTOR);
    assert!(result
        .issues
        .iter()
        .any(|i| i.contains("all construction backends failed")));
    assert!(result.backends_succeeded.is_empty());
}

#[tokio::test]
async fn test_malformed_primary_verdict_uses_backup() {
    let judge = MockBackend::scripted(
        "judge",
        vec![
            MockReply::Text("the judge's own draft".to_string()),
            MockReply::Text("definitely candidate two, trust me".to_string()),
        ],
    );
    let roster = roster_of(vec![
        MockBackend::always("builder-a", "draft from a"),
        MockBackend::always("builder-b", "draft from b"),
        MockBackend::always("stylist", "a polished reply"),
        judge,
        MockBackend::always("backup", &verdict_json(0, 0.7, "backup pick")),
    ]);

    let pipeline = SynthesisPipeline::new(roster, base_config()).unwrap();
    let result = pipeline.synthesize(SEED, &PipelineContext::new()).await;

    assert_eq!(result.selector_used, "backup");
    assert!(result
        .issues
        .iter()
        .any(|i| i.contains("unparseable")));
}

#[tokio::test]
async fn test_pipeline_deadline_mid_style() {
    let config = SynthesisConfig {
        call_timeout: Duration::from_millis(500),
        stage_timeout: Duration::from_millis(600),
        pipeline_timeout: Duration::from_millis(600),
        ..base_config()
    };
    let roster = roster_of(vec![
        MockBackend::slow("builder-a", "draft from a", Duration::from_millis(300)),
        MockBackend::slow("builder-b", "draft from b", Duration::from_millis(300)),
        MockBackend::slow("stylist", "too late", Duration::from_secs(10)),
        happy_selector(),
        MockBackend::always("backup", &verdict_json(0, 0.5, "unused")),
    ]);

    let pipeline = SynthesisPipeline::new(roster, config).unwrap();
    let result = pipeline.synthesize(SEED, &PipelineContext::new()).await;

    // Construction-only pool plus heuristic selection
    assert!(result.final_text.starts_with("draft from"));
    assert_eq!(result.selector_used, HEURISTIC_SELECTOR);
    assert!(result
        .issues
        .iter()
        .any(|i| i.contains("pipeline deadline reached during style")));
}

#[tokio::test]
async fn test_always_terminates_within_deadline_plus_epsilon() {
    let config = SynthesisConfig {
        call_timeout: Duration::from_millis(100),
        stage_timeout: Duration::from_millis(150),
        pipeline_timeout: Duration::from_millis(200),
        ..base_config()
    };
    // Every backend hangs far past every budget
    let roster = roster_of(vec![
        MockBackend::slow("builder-a", "x", Duration::from_secs(60)),
        MockBackend::slow("builder-b", "x", Duration::from_secs(60)),
        MockBackend::slow("stylist", "x", Duration::from_secs(60)),
        MockBackend::slow("judge", "x", Duration::from_secs(60)),
        MockBackend::slow("backup", "x", Duration::from_secs(60)),
    ]);

    let pipeline = SynthesisPipeline::new(roster, config).unwrap();
    let result = tokio::time::timeout(
        Duration::from_millis(600),
        pipeline.synthesize(SEED, &PipelineContext::new()),
    )
    .await
    .expect("synthesize must return within the pipeline deadline plus epsilon");

    assert_eq!(result.final_text, SEED);
    assert!(!result.was_improved);
}

#[tokio::test]
async fn test_unknown_roster_ids_degrade_gracefully() {
    // Config names backends the roster does not contain
    let roster = roster_of(vec![happy_selector()]);

    let pipeline = SynthesisPipeline::new(roster, base_config()).unwrap();
    let result = pipeline.synthesize(SEED, &PipelineContext::new()).await;

    assert!(!result.final_text.is_empty());
    assert!(result.backends_failed.contains(&"builder-a".to_string()));
    // The judge still nominated and ranked its own candidate
    assert_eq!(result.selector_used, "judge");
    assert_eq!(result.final_text, "the judge's own draft");
}

#[tokio::test]
async fn test_invalid_config_rejected_at_construction() {
    let config = SynthesisConfig {
        primary_selector: String::new(),
        ..base_config()
    };
    assert!(SynthesisPipeline::new(BackendRoster::new(), config).is_err());
}

#[tokio::test]
async fn test_backend_call_events_cover_every_attempt() {
    let events = Arc::new(CollectingEventSink::new());
    let roster = roster_of(vec![
        MockBackend::always("builder-a", "draft from a"),
        MockBackend::always("builder-b", "draft from b"),
        MockBackend::always("stylist", "a polished reply"),
        happy_selector(),
        MockBackend::always("backup", &verdict_json(0, 0.5, "unused")),
    ]);

    let pipeline =
        SynthesisPipeline::with_events(roster, base_config(), events.clone()).unwrap();
    pipeline.synthesize(SEED, &PipelineContext::new()).await;

    // construction 2x2, style min(2,4)x1x2, nomination 1, ranking 1
    assert_eq!(events.backend_calls().len(), 4 + 4 + 2);
}

#[tokio::test]
async fn test_result_is_serializable() {
    let roster = roster_of(vec![
        MockBackend::failing("builder-a", "down"),
        MockBackend::failing("builder-b", "down"),
        MockBackend::failing("stylist", "down"),
        MockBackend::failing("judge", "down"),
        MockBackend::failing("backup", "down"),
    ]);

    let pipeline = SynthesisPipeline::new(roster, base_config()).unwrap();
    let result = pipeline.synthesize(SEED, &PipelineContext::new()).await;

    let json = serde_json::to_string(&result).unwrap();
    let back: PipelineResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.final_text, SEED);
}
