//! Integration tests for the ocular-screen HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use ocular_screen::server::{run, ServerConfig};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::sync::oneshot::Sender;

    async fn start() -> (SocketAddr, Sender<()>) {
        let config = ServerConfig::new(0, None);
        let (addr, shutdown_tx) = run(config).await.expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        (addr, shutdown_tx)
    }

    async fn create_session(client: &reqwest::Client, addr: SocketAddr, caller: &str) -> String {
        let response = client
            .post(format!("http://{}/sessions", addr))
            .bearer_auth(caller)
            .json(&json!({ "participant_name": "Participant A", "participant_age": 29 }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "active");
        body["id"].as_str().expect("session id").to_string()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_missing_bearer_is_unauthorized() {
        let (addr, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/sessions", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        let body: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "UNAUTHORIZED");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_full_session_flow() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();
        let id = create_session(&client, addr, "clinician-a").await;

        // Nothing recorded yet
        let response = client
            .post(format!("http://{}/sessions/{}/analyze", addr, id))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INSUFFICIENT_DATA");

        let samples: Vec<Value> = (0..10)
            .map(|i| {
                json!({
                    "timestamp": 1_700_000_000_000i64 + i * 16,
                    "gazeX": 50.0,
                    "gazeY": 50.0,
                    "pupilDiameter": 3.5,
                    "stimulusId": "neutral-face-01"
                })
            })
            .collect();
        let response = client
            .post(format!("http://{}/sessions/{}/samples", addr, id))
            .bearer_auth("clinician-a")
            .json(&samples)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["recorded"], 10);
        assert_eq!(body["total"], 10);

        let response = client
            .post(format!("http://{}/sessions/{}/complete", addr, id))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        let response = client
            .post(format!("http://{}/sessions/{}/analyze", addr, id))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let result: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(result["overall_score"], 0.0);
        assert_eq!(result["markers"].as_array().map(Vec::len), Some(0));
        assert_eq!(result["recommendations"].as_array().map(Vec::len), Some(4));

        let response = client
            .get(format!("http://{}/sessions/{}/analysis", addr, id))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        let stored: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(stored, result);

        let response = client
            .get(format!("http://{}/sessions/{}/report", addr, id))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let report: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(report["risk_level"], "Low Risk");
        assert_eq!(report["participant"]["age"], 29);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_persisted_server_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown_tx) = run(ServerConfig::new(0, Some(dir.path().to_path_buf())))
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let id = create_session(&client, addr, "clinician-a").await;

        let samples: Vec<Value> = (0..3)
            .map(|i| json!({ "timestamp": i * 16, "gazeX": 50.0, "gazeY": 50.0, "pupilDiameter": 3.5 }))
            .collect();
        let response = client
            .post(format!("http://{}/sessions/{}/samples", addr, id))
            .bearer_auth("clinician-a")
            .json(&samples)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        let snapshot = std::fs::read_to_string(dir.path().join("sessions.json")).unwrap();
        assert!(!snapshot.contains('\n'));
        assert!(snapshot.contains(&id));

        let audit: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("audit.json")).unwrap())
                .unwrap();
        assert_eq!(audit["samples_recorded"], 3);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_foreign_session_is_forbidden() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();
        let id = create_session(&client, addr, "clinician-a").await;

        let response = client
            .get(format!("http://{}/sessions/{}", addr, id))
            .bearer_auth("clinician-b")
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

        let response = client
            .get(format!("http://{}/sessions/does-not-exist", addr))
            .bearer_auth("clinician-b")
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        // Each caller only lists their own sessions
        let response = client
            .get(format!("http://{}/sessions", addr))
            .bearer_auth("clinician-b")
            .send()
            .await
            .expect("Failed to send request");
        let listed: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(listed.as_array().map(Vec::len), Some(0));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_unanalyzed_report_and_stimuli() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();
        let id = create_session(&client, addr, "clinician-a").await;

        let response = client
            .get(format!("http://{}/sessions/{}/report", addr, id))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = client
            .post(format!("http://{}/stimuli", addr))
            .bearer_auth("clinician-a")
            .json(&json!({
                "id": "img-17",
                "name": "Crowded street",
                "kind": "image",
                "category": "trauma_related",
                "content": "A crowded street at night",
                "duration_ms": 3000
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let response = client
            .get(format!("http://{}/stimuli?category=trauma_related", addr))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        let listed: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let response = client
            .get(format!("http://{}/stimuli?category=neutral", addr))
            .bearer_auth("clinician-a")
            .send()
            .await
            .expect("Failed to send request");
        let listed: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(listed.as_array().map(Vec::len), Some(0));

        let _ = shutdown_tx.send(());
    }
}
