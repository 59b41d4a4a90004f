use super::*;
use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

struct MemberServerState {
    document: Value,
    cache_headers: Mutex<Vec<Option<String>>>,
}

async fn serve_members(
    State(state): State<Arc<MemberServerState>>,
    headers: HeaderMap,
) -> Json<Value> {
    let cache_control = headers
        .get(axum::http::header::CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    state.cache_headers.lock().await.push(cache_control);
    Json(state.document.clone())
}

async fn spawn_member_server(document: Value) -> anyhow::Result<(String, Arc<MemberServerState>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(MemberServerState {
        document,
        cache_headers: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/member_data.json", get(serve_members))
        .route("/broken.json", get(|| async { "definitely not json" }))
        .with_state(Arc::clone(&state));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn sample_document() -> Value {
    json!({
        "001": {
            "name": "賀喜 遥香",
            "group": "乃木坂46",
            "imageUrl": "https://cdn.example/kaki.jpg",
            "profileUrl": "https://example.com/kaki",
            "goods": { "rakuten": "https://rakuten.example/kaki" },
        },
        "002": {
            "name": "森田 ひかる",
            "group": "櫻坂46",
            "image": "https://cdn.example/morita.jpg",
        },
        "003": {
            "group": "日向坂46",
            "imageUrl": "https://cdn.example/unnamed.jpg",
        },
    })
}

#[tokio::test]
async fn loads_and_indexes_by_normalized_name() {
    let (base, _state) = spawn_member_server(sample_document()).await.expect("spawn");
    let http = reqwest::Client::new();

    let index = MemberIndex::load(&http, &format!("{base}/member_data.json")).await;

    // The unnamed record is skipped.
    assert_eq!(index.len(), 2);
    let record = index.get("賀喜遥香").expect("kaki by squashed name");
    assert_eq!(record.profile_url.as_deref(), Some("https://example.com/kaki"));
    // Full-width spaces normalize to the same key.
    assert!(index.get("賀喜　遥香").is_some());
    assert!(index.get("森田 ひかる").is_some());
}

#[tokio::test]
async fn index_fetch_bypasses_caches() {
    let (base, state) = spawn_member_server(sample_document()).await.expect("spawn");
    let http = reqwest::Client::new();

    MemberIndex::load(&http, &format!("{base}/member_data.json")).await;

    let headers = state.cache_headers.lock().await.clone();
    assert_eq!(headers, vec![Some("no-cache".to_string())]);
}

#[tokio::test]
async fn accepts_top_level_arrays() {
    let document = json!([
        { "name": "賀喜 遥香", "imageUrl": "https://cdn.example/kaki.jpg" },
        { "name": "森田 ひかる", "imageUrl": "https://cdn.example/morita.jpg" },
    ]);
    let (base, _state) = spawn_member_server(document).await.expect("spawn");
    let http = reqwest::Client::new();

    let index = MemberIndex::load(&http, &format!("{base}/member_data.json")).await;

    assert_eq!(index.len(), 2);
}

#[tokio::test]
async fn unreachable_resource_degrades_to_an_empty_index() {
    let http = reqwest::Client::new();
    let index = MemberIndex::load(&http, "http://127.0.0.1:1/member_data.json").await;
    assert!(index.is_empty());
}

#[tokio::test]
async fn unparsable_document_degrades_to_an_empty_index() {
    let (base, _state) = spawn_member_server(sample_document()).await.expect("spawn");
    let http = reqwest::Client::new();

    let index = MemberIndex::load(&http, &format!("{base}/broken.json")).await;

    assert!(index.is_empty());
}

#[test]
fn whitespace_variants_collapse_to_one_entry() {
    let index = MemberIndex::from_records([
        MemberRecord {
            name: "Jane Doe".to_string(),
            ..MemberRecord::default()
        },
        MemberRecord {
            name: "JaneDoe".to_string(),
            ..MemberRecord::default()
        },
    ]);
    assert_eq!(index.len(), 1);
}

#[test]
fn candidate_images_deduplicate_with_set_semantics() {
    let index = MemberIndex::from_records([
        MemberRecord {
            name: "a".to_string(),
            image: Some("https://cdn.example/shared.jpg".to_string()),
            ..MemberRecord::default()
        },
        MemberRecord {
            name: "b".to_string(),
            image_url: Some("https://cdn.example/shared.jpg".to_string()),
            ..MemberRecord::default()
        },
        MemberRecord {
            name: "c".to_string(),
            ..MemberRecord::default()
        },
    ]);
    assert_eq!(
        index.candidate_images(),
        vec!["https://cdn.example/shared.jpg".to_string()]
    );
}
