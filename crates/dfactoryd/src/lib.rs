//! Shared helpers, HTTP client and response types used by the `dfactoryd`
//! binary.

use df_config::FactoryConfig;
use df_factory::AppSummary;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use uuid::Uuid;

pub use df_supervisor::is_process_alive;
use df_supervisor::process_name;

/// Build-time daemon version string.
///
/// `DFACTORYD_VERSION` in the build environment wins over the crate version.
pub const DAEMON_VERSION: &str = match option_env!("DFACTORYD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

// ---------------------------------------------------------------------------
// PID file management
// ---------------------------------------------------------------------------

/// Reads the daemon PID from `path`, returning `None` if missing or invalid.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Writes the current process PID to `path`.
pub fn write_pid_file(path: &Path) -> anyhow::Result<()> {
    fs::write(path, std::process::id().to_string())?;
    Ok(())
}

/// Removes the PID file at `path` if it exists.
pub fn remove_pid_file(path: &Path) {
    let _ = fs::remove_file(path);
}

/// Whether `pid` is running a `dfactoryd` executable.
pub fn pid_looks_like_dfactoryd(pid: u32) -> bool {
    process_name(pid).is_some_and(|name| name.to_ascii_lowercase().starts_with("dfactoryd"))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Base URL a local client should use to reach the daemon. Wildcard binds are
/// reached over loopback.
pub fn daemon_base_url(config: &FactoryConfig) -> String {
    let host = match config.host {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        other => other,
    };
    format!("http://{}", SocketAddr::new(host, config.port))
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub hostname: String,
    pub apps: usize,
}

#[derive(Debug, Serialize)]
struct CreateAppBody<'a> {
    name: &'a str,
    command: &'a str,
    args: &'a [String],
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreateAppResponse {
    pub id: Uuid,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error body every failing daemon endpoint returns.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}

/// Thin JSON client for the daemon's `/api` routes.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> anyhow::Result<HealthResponse> {
        decode(self.http.get(self.url("/api/health")).send().await?).await
    }

    pub async fn list(&self) -> anyhow::Result<Vec<AppSummary>> {
        decode(self.http.get(self.url("/api/apps")).send().await?).await
    }

    pub async fn create(
        &self,
        name: &str,
        command: &str,
        args: &[String],
    ) -> anyhow::Result<CreateAppResponse> {
        let body = CreateAppBody {
            name,
            command,
            args,
        };
        decode(
            self.http
                .post(self.url("/api/apps"))
                .json(&body)
                .send()
                .await?,
        )
        .await
    }

    pub async fn stop(&self, id: &Uuid) -> anyhow::Result<SuccessResponse> {
        decode(
            self.http
                .post(self.url(&format!("/api/apps/{id}/stop")))
                .send()
                .await?,
        )
        .await
    }

    pub async fn remove(&self, id: &Uuid) -> anyhow::Result<SuccessResponse> {
        decode(
            self.http
                .delete(self.url(&format!("/api/apps/{id}")))
                .send()
                .await?,
        )
        .await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(err) => anyhow::bail!("{} ({}): {}", err.code, status.as_u16(), err.message),
        Err(_) => anyhow::bail!("daemon returned {status}: {text}"),
    }
}

/// One line of `dfactoryd list` output.
pub fn format_app_line(app: &AppSummary) -> String {
    let pid = app
        .pid
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = serde_json::to_value(app.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let mut command = app.command.clone();
    for arg in &app.args {
        command.push(' ');
        command.push_str(arg);
    }
    format!(
        "{}  {:<8} {:>7}  {}  {}",
        app.handle, status, pid, app.name, command
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
