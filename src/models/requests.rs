use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to generate a contour map
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateMapRequest {
    /// Required when accounts are enabled
    #[serde(alias = "user_id", rename = "userId", default)]
    pub user_id: Option<String>,
    #[validate(length(min = 7))]
    pub bbox: String,
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default = "default_background", rename = "backgroundColor", alias = "background_color")]
    pub background_color: String,
    #[serde(default)]
    pub roads: bool,
    #[validate(range(min = 100, max = 5000))]
    #[serde(default = "default_width")]
    pub width: u32,
    #[validate(range(min = 100, max = 5000))]
    #[serde(default = "default_height")]
    pub height: u32,
    /// Elevation tile zoom; auto-selected from the bbox size when omitted
    #[validate(range(min = 1, max = 15))]
    #[serde(default)]
    pub zoom: Option<u8>,
}

fn default_interval() -> f64 {
    20.0
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn default_width() -> u32 {
    1600
}

fn default_height() -> u32 {
    1200
}

/// Request to create a user account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
}

/// Request to start a credit purchase
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseCreditsRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    /// Package size in credits; must match one of the offered packages
    pub credits: i32,
}

/// Request to confirm a completed payment and credit the account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "payment_intent_id", rename = "paymentIntentId")]
    pub payment_intent_id: String,
}
