use super::*;
use shared::domain::GoodsLinks;

fn sample_results() -> Vec<MatchResult> {
    vec![
        MatchResult {
            group: "乃木坂46".to_string(),
            name: "賀喜 遥香".to_string(),
            image_url: "https://cdn.example/kaki.jpg".to_string(),
            profile_url: Some("https://example.com/kaki".to_string()),
            goods: GoodsLinks {
                rakuten: Some("https://rakuten.example/kaki".to_string()),
                ..GoodsLinks::default()
            },
        },
        MatchResult {
            group: "櫻坂46".to_string(),
            name: "森田 ひかる".to_string(),
            image_url: "https://cdn.example/morita.jpg".to_string(),
            ..MatchResult::default()
        },
    ]
}

#[tokio::test]
async fn round_trips_saved_results() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let results = sample_results();
    storage
        .save_results(ANALYZE_RESULTS_KEY, &results)
        .await
        .expect("save");

    let stored = storage
        .load_results(ANALYZE_RESULTS_KEY)
        .await
        .expect("load")
        .expect("stored entry");
    assert_eq!(stored.results, results);
}

#[tokio::test]
async fn overwrites_previous_entry_under_same_key() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .save_results(ANALYZE_RESULTS_KEY, &sample_results())
        .await
        .expect("first save");
    let replacement = vec![MatchResult {
        name: "小坂 菜緒".to_string(),
        ..MatchResult::default()
    }];
    storage
        .save_results(ANALYZE_RESULTS_KEY, &replacement)
        .await
        .expect("second save");

    let stored = storage
        .load_results(ANALYZE_RESULTS_KEY)
        .await
        .expect("load")
        .expect("stored entry");
    assert_eq!(stored.results, replacement);
}

#[tokio::test]
async fn missing_key_reads_as_absent() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let stored = storage
        .load_results(ANALYZE_RESULTS_KEY)
        .await
        .expect("load");
    assert!(stored.is_none());
}

#[tokio::test]
async fn corrupt_payload_reads_as_absent() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    sqlx::query("INSERT INTO stored_results (key, payload, saved_at) VALUES (?, ?, ?)")
        .bind(ANALYZE_RESULTS_KEY)
        .bind("{not json")
        .bind("2024-01-01T00:00:00Z")
        .execute(storage.pool())
        .await
        .expect("insert garbage");

    let stored = storage
        .load_results(ANALYZE_RESULTS_KEY)
        .await
        .expect("load");
    assert!(stored.is_none());
}

#[tokio::test]
async fn clear_removes_stored_entry() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .save_results(ANALYZE_RESULTS_KEY, &sample_results())
        .await
        .expect("save");
    storage
        .clear_results(ANALYZE_RESULTS_KEY)
        .await
        .expect("clear");

    let stored = storage
        .load_results(ANALYZE_RESULTS_KEY)
        .await
        .expect("load");
    assert!(stored.is_none());
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("kiosk_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}
