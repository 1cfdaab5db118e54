use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Secret the spawned server signs tokens with; tests mint tokens against
/// the same secret to exercise expiry and issuer checks end to end.
#[allow(dead_code)]
pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests.
        // DATABASE_URL is cleared so the server runs on the in-memory store.
        let mut cmd = Command::new("target/debug/quill-api");
        cmd.env("QUILL_PORT", port.to_string())
            .env("JWT_SECRET", JWT_SECRET)
            .env_remove("DATABASE_URL")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Register a fresh account with a unique email. Returns (token, account).
pub async fn register_account(
    client: &reqwest::Client,
    base_url: &str,
    label: &str,
) -> Result<(String, Value)> {
    let email = format!("{}+{}@example.com", label, uuid::Uuid::new_v4());
    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&json!({
            "email": email,
            "displayName": label,
            "password": "a perfectly fine password",
        }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "registration failed: {}",
        res.status()
    );

    let body: Value = res.json().await?;
    let token = body["data"]["token"]
        .as_str()
        .context("missing token in registration response")?
        .to_string();
    Ok((token, body["data"]["account"].clone()))
}

/// Create a note as the given account. Returns the created note.
#[allow(dead_code)]
pub async fn create_note(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    body: Value,
) -> Result<Value> {
    let res = client
        .post(format!("{}/notes", base_url))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "note creation failed: {}",
        res.status()
    );
    let body: Value = res.json().await?;
    Ok(body["data"].clone())
}
