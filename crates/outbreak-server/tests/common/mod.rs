use std::net::SocketAddr;
use std::time::Duration;

use outbreak_server::config::{AuthFileConfig, ServerConfig};
use outbreak_server::{build_app, spawn_sweeper};

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with admin auth disabled.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Start a test server with an admin bearer token.
    pub async fn with_admin_token(token: &str) -> Self {
        let config = ServerConfig {
            auth: AuthFileConfig {
                admin_token: Some(token.to_string()),
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);
        spawn_sweeper(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}/api/v1{path}", self.addr)
    }
}

/// Register a user and return (user_id, token).
pub async fn register_user(
    client: &reqwest::Client,
    server: &TestServer,
    user_name: &str,
) -> (String, String) {
    let resp = client
        .post(server.api_url("/users"))
        .json(&serde_json::json!({
            "user_name": user_name,
            "display_name": format!("{user_name} display"),
            "email_address": format!("{user_name}@example.edu"),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "registration failed for {user_name}");
    let body: serde_json::Value = resp.json().await.unwrap();
    (
        body["user_id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

/// Create a game and return its id. Assumes admin auth is disabled.
pub async fn create_game(
    client: &reqwest::Client,
    server: &TestServer,
    display_name: &str,
) -> String {
    let resp = client
        .post(server.api_url("/games"))
        .json(&serde_json::json!({ "display_name": display_name }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "game creation failed");
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

/// Advance the game one stage and return the new stage name.
pub async fn next_stage(client: &reqwest::Client, server: &TestServer, game_id: &str) -> String {
    let resp = client
        .post(server.api_url(&format!("/games/{game_id}/stage/next")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "stage advance failed");
    let body: serde_json::Value = resp.json().await.unwrap();
    body["stage"].as_str().unwrap().to_string()
}
