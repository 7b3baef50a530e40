//! Build information for clients.

use axum::Json;
use serde::Serialize;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Set at build time; local builds report `no-commit`.
pub const COMMIT: &str = match option_env!("STOREBOOK_COMMIT") {
    Some(commit) => commit,
    None => "no-commit",
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub app_name: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
}

/// `GET /api/v1/system/info`
pub async fn get_system_info() -> Json<SystemInfo> {
    Json(SystemInfo {
        app_name: APP_NAME,
        version: VERSION,
        commit: COMMIT,
    })
}
