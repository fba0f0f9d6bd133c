use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassifyRequest {
    /// overrides the server's image url for this request
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifyResponse {
    pub id: u64,
    pub source: String,
    pub duration: Duration,
    pub index: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenResponse {
    pub status: String,
    pub image: Option<ImageInfo>,
    pub label: Option<String>,
    pub last: Option<ClassifyResponse>,
}
