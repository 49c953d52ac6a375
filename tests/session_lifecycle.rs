mod support;

use serde_json::Value;

async fn create_session(base_url: &str, client: &reqwest::Client) -> String {
    let host_id = format!("host-{}", uuid::Uuid::new_v4());
    let payload = serde_json::json!({
        "hostId": host_id,
        "settings": { "maxPlayers": 2 }
    });

    let res = client
        .post(format!("{base_url}/sessions"))
        .json(&payload)
        .send()
        .await
        .expect("create request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let body: Value = res.json().await.expect("create response body");
    body["sessionId"]
        .as_str()
        .expect("sessionId in response")
        .to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert_eq!(res.text().await.expect("body"), "ok");
}

#[tokio::test]
async fn test_session_creation_and_listing() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let session_id = create_session(base_url, &client).await;

    let res = client
        .get(format!("{base_url}/sessions"))
        .send()
        .await
        .expect("list request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let sessions: Vec<Value> = res.json().await.expect("list body");
    let listed = sessions
        .iter()
        .find(|s| s["id"] == session_id.as_str())
        .expect("created session should be listed");
    assert_eq!(listed["status"], "Waiting");
    assert_eq!(listed["players"].as_array().expect("players").len(), 1);
    assert_eq!(listed["players"][0]["isHost"], true);
}

#[tokio::test]
async fn test_join_then_start_flow() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let session_id = create_session(base_url, &client).await;

    let join = client
        .post(format!("{base_url}/sessions/{session_id}/join"))
        .json(&serde_json::json!({ "playerId": "p2", "displayName": "Player Two" }))
        .send()
        .await
        .expect("join request should succeed");
    assert_eq!(join.status(), reqwest::StatusCode::OK);
    let body: Value = join.json().await.expect("join body");
    assert_eq!(body["players"].as_array().expect("players").len(), 2);

    let start = client
        .post(format!("{base_url}/sessions/{session_id}/start"))
        .send()
        .await
        .expect("start request should succeed");
    assert_eq!(start.status(), reqwest::StatusCode::OK);
    let body: Value = start.json().await.expect("start body");
    assert_eq!(body["status"], "Active");
    assert!(body["startedAt"].is_u64());
}

#[tokio::test]
async fn test_join_rejections() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    // Unknown session id.
    let res = client
        .post(format!("{base_url}/sessions/missing/join"))
        .json(&serde_json::json!({ "playerId": "p2" }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    // Capacity: settings above cap the session at two players.
    let session_id = create_session(base_url, &client).await;
    for pid in ["p2"] {
        let res = client
            .post(format!("{base_url}/sessions/{session_id}/join"))
            .json(&serde_json::json!({ "playerId": pid }))
            .send()
            .await
            .expect("request should succeed");
        assert_eq!(res.status(), reqwest::StatusCode::OK);
    }
    let res = client
        .post(format!("{base_url}/sessions/{session_id}/join"))
        .json(&serde_json::json!({ "playerId": "p3" }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = res.json().await.expect("error body");
    assert_eq!(body["error"], "session full");

    // Joining after start is rejected for new player ids.
    let started_id = create_session(base_url, &client).await;
    let res = client
        .post(format!("{base_url}/sessions/{started_id}/start"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let res = client
        .post(format!("{base_url}/sessions/{started_id}/join"))
        .json(&serde_json::json!({ "playerId": "late" }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = res.json().await.expect("error body");
    assert_eq!(body["error"], "session already started");
}

#[tokio::test]
async fn test_double_start_is_conflict() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let session_id = create_session(base_url, &client).await;
    let res = client
        .post(format!("{base_url}/sessions/{session_id}/start"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let res = client
        .post(format!("{base_url}/sessions/{session_id}/start"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);
}
