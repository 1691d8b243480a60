//! Response types for the non-controller endpoints

use gantry_services::NavNode;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    /// Routes in the live registry snapshot
    pub routes: usize,
    pub rights_enabled: bool,
}

/// Navigation tree visible to the caller
#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    pub user: String,
    pub items: Vec<NavNode>,
}
