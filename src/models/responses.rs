use serde::{Deserialize, Serialize};

/// Response for a successful map generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateMapResponse {
    pub filename: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    pub width: u32,
    pub height: u32,
    /// Remaining balance; None when accounts are disabled
    #[serde(rename = "creditsRemaining", skip_serializing_if = "Option::is_none")]
    pub credits_remaining: Option<i32>,
    /// Set when the road overlay was requested but unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// One entry in the gallery listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub filename: String,
    pub created: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: u64,
}

/// Response for the gallery listing, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryResponse {
    pub files: Vec<GalleryEntry>,
    pub count: usize,
}

/// Response for account creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub credits: i32,
}

/// Response for the credit balance query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditsResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub credits: i32,
}

/// Response for a started purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    #[serde(rename = "paymentIntentId")]
    pub payment_intent_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    pub credits: i32,
    #[serde(rename = "amountCents")]
    pub amount_cents: i32,
}

/// Response for a confirmed payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub credits: i32,
}
