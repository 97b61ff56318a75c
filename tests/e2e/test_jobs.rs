use crate::e2e::helpers;

use helpers::mocks::FAIL_PLANNING;
use helpers::{wait_for_terminal, TestContext, MAX_INPUT_BYTES, PLANNER_MAX_ATTEMPTS};
use hyper::StatusCode;
use serde_json::{json, Value};
use test_context::test_context;
use uuid::Uuid;

const THREE_SENTENCES: &str =
    "The ferry left at dawn. Gulls followed it out of the harbour. By noon the coast was gone.";

async fn submit(ctx: &TestContext, body: &Value) -> String {
    let response = ctx.client.post("/api/v1/jobs", body).await.unwrap();
    response.assert_status(StatusCode::ACCEPTED);

    let body = response.body.as_ref().unwrap();
    assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("queued"));
    body.get("job_id")
        .and_then(|v| v.as_str())
        .expect("Missing job_id")
        .to_string()
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_produce_an_audiobook_for_a_short_text(ctx: &TestContext) {
    let job_id = submit(
        ctx,
        &json!({
            "text": THREE_SENTENCES,
            "config": { "language": "en", "segment_count": 1 }
        }),
    )
    .await;

    let job = wait_for_terminal(&ctx.client, &job_id).await.unwrap();

    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["current_step"], "done");
    assert_eq!(job["segments_total"], 1);
    assert_eq!(job["segments_completed"], 1);
    assert_eq!(job["chunks_completed"], job["chunks_total"]);
    assert!(job.get("input_text").is_none());

    let result = &job["result"];
    assert_eq!(result["title"], "Test Audiobook");
    assert_eq!(result["language"], "en");
    assert_eq!(result["segment_count"], 1);
    assert_eq!(result["chapters"].as_array().unwrap().len(), 1);
    assert_eq!(result["chapters"][0]["title"], "Chapter 1");
    assert_eq!(
        result["download_url"],
        format!("/api/v1/jobs/{}/artifact", job_id)
    );

    let artifact = ctx
        .client
        .get(&format!("/api/v1/jobs/{}/artifact", job_id))
        .await
        .unwrap();
    artifact
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/mpeg");
    assert!(artifact
        .header("content-disposition")
        .unwrap()
        .contains("Test_Audiobook"));
    assert!(artifact.body_bytes.starts_with(b"ID3"));

    // delivered artifact plus transcript, workspace reclaimed
    let delivered: Vec<String> = std::fs::read_dir(ctx.output_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(delivered.iter().any(|n| n.ends_with(".mp3")));
    assert!(delivered.iter().any(|n| n.ends_with(".txt")));
    assert!(!ctx.work_dir.path().join(&job_id).exists());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_give_each_radio_show_host_their_own_voice(ctx: &TestContext) {
    let job_id = submit(
        ctx,
        &json!({
            "text": THREE_SENTENCES,
            "config": {
                "language": "en",
                "segment_count": 1,
                "narrative_mode": "radio_show",
                "voices": ["nova", "onyx"]
            }
        }),
    )
    .await;

    let job = wait_for_terminal(&ctx.client, &job_id).await.unwrap();
    assert_eq!(job["status"], "completed");

    let voices = ctx.tts.voices_used();
    assert!(voices.contains(&"nova".to_string()), "voices: {:?}", voices);
    assert!(voices.contains(&"onyx".to_string()), "voices: {:?}", voices);
    assert!(voices.iter().all(|v| v == "nova" || v == "onyx"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_split_long_scripts_into_chapters(ctx: &TestContext) {
    let text = "First part talks about the sea and the ships that sail on it.\n\n\
                Second part covers the mountains and the people living there.\n\n\
                Third part ends the story back home by the fire.";
    let job_id = submit(
        ctx,
        &json!({ "text": text, "config": { "language": "en", "segment_count": 3 } }),
    )
    .await;

    let job = wait_for_terminal(&ctx.client, &job_id).await.unwrap();

    assert_eq!(job["status"], "completed");
    let chapters = job["result"]["chapters"].as_array().unwrap();
    let titles: Vec<&str> = chapters.iter().map(|c| c["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Chapter 1", "Chapter 2", "Chapter 3"]);

    // chunk ceiling is small, so there are more chunks than segments
    assert!(job["result"]["chunk_count"].as_u64().unwrap() > 3);

    // chapters tile the timeline in order
    for pair in chapters.windows(2) {
        assert_eq!(pair[0]["end_ms"], pair[1]["start_ms"]);
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_the_job_when_planning_keeps_failing(ctx: &TestContext) {
    let job_id = submit(
        ctx,
        &json!({
            "text": format!("{} {}", THREE_SENTENCES, FAIL_PLANNING),
            "config": { "language": "en" }
        }),
    )
    .await;

    let job = wait_for_terminal(&ctx.client, &job_id).await.unwrap();

    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"]["stage"], "planning");
    assert!(job["error"]["message"]
        .as_str()
        .unwrap()
        .contains("planning stage failed"));
    assert!(job.get("result").is_none());
    assert_eq!(ctx.planner.calls(), PLANNER_MAX_ATTEMPTS as usize);

    let artifact = ctx
        .client
        .get(&format!("/api/v1/jobs/{}/artifact", job_id))
        .await
        .unwrap();
    artifact.assert_status(StatusCode::CONFLICT);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_identical_terminal_reads(ctx: &TestContext) {
    let job_id = submit(
        ctx,
        &json!({ "text": THREE_SENTENCES, "config": { "segment_count": 1 } }),
    )
    .await;
    wait_for_terminal(&ctx.client, &job_id).await.unwrap();

    let path = format!("/api/v1/jobs/{}", job_id);
    let first = ctx.client.get(&path).await.unwrap();
    let second = ctx.client.get(&path).await.unwrap();

    first.assert_status(StatusCode::OK);
    assert_eq!(first.body_bytes, second.body_bytes);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_empty_text(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/v1/jobs", &json!({ "text": "   " }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("text must not be empty");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_oversized_text(ctx: &TestContext) {
    let text = "a".repeat(MAX_INPUT_BYTES + 1);
    let response = ctx
        .client
        .post("/api/v1/jobs", &json!({ "text": text }))
        .await
        .unwrap();

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_unknown_options(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/v1/jobs",
            &json!({ "text": THREE_SENTENCES, "config": { "language": "tlh" } }),
        )
        .await
        .unwrap();
    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("unsupported language");

    let response = ctx
        .client
        .post(
            "/api/v1/jobs",
            &json!({ "text": THREE_SENTENCES, "config": { "narrative_mode": "villain" } }),
        )
        .await
        .unwrap();
    assert!(response.status.is_client_error());

    let response = ctx
        .client
        .post_raw("/api/v1/jobs", "{\"text\": ")
        .await
        .unwrap();
    assert!(response.status.is_client_error());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_not_found_for_unknown_jobs(ctx: &TestContext) {
    let id = Uuid::new_v4();

    let response = ctx.client.get(&format!("/api/v1/jobs/{}", id)).await.unwrap();
    response.assert_status(StatusCode::NOT_FOUND);

    let response = ctx
        .client
        .get(&format!("/api/v1/jobs/{}/artifact", id))
        .await
        .unwrap();
    response.assert_status(StatusCode::NOT_FOUND);

    let response = ctx.client.get("/api/v1/jobs/not-a-uuid").await.unwrap();
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_modes_and_categories(ctx: &TestContext) {
    let response = ctx.client.get("/api/v1/modes").await.unwrap();
    response.assert_status(StatusCode::OK);
    let modes = response.body.as_ref().unwrap().as_array().unwrap().clone();
    let ids: Vec<&str> = modes.iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["mentor", "friend", "lover", "radio_show"]);

    let response = ctx.client.get("/api/v1/categories").await.unwrap();
    response.assert_status(StatusCode::OK);
    let categories = response.body.as_ref().unwrap().as_array().unwrap().clone();
    assert_eq!(categories.len(), 5);
    for category in &categories {
        assert!(category["label"].as_str().is_some());
        assert!(!category["recommended_modes"].as_array().unwrap().is_empty());
    }
}
