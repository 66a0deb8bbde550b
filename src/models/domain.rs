use serde::{Deserialize, Serialize};

/// Geographic bounding box in degrees
///
/// Invariant after validation: min < max on both axes, longitude within
/// [-180, 180], latitude within [-85, 85].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Slippy-map tile index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// Rendering options for one map generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Background color as a hex string, e.g. "#f2efe9"
    pub background: String,
    pub width: u32,
    pub height: u32,
    pub include_roads: bool,
    /// Contour interval in meters
    pub interval: f64,
    /// Elevation tile zoom; auto-selected from the bbox size when None
    pub zoom: Option<u8>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            width: 1600,
            height: 1200,
            include_roads: false,
            interval: 20.0,
            zoom: None,
        }
    }
}

/// Registered user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    pub credits: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Persisted record of a generated map artifact; insert-only
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneratedMap {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub filename: String,
    pub bbox: String,
    pub settings: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Credit purchase lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Ledger row for a credit purchase
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditTransaction {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub payment_intent_id: String,
    pub credits_purchased: i32,
    pub amount_cents: i32,
    pub status: TransactionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Credit packages offered for purchase: (credits, price in cents)
pub const CREDIT_PACKAGES: &[(i32, i32)] = &[(1, 200), (5, 1000), (15, 3000), (50, 10000)];

/// Price in cents for a package size, if it is one we sell
pub fn package_price(credits: i32) -> Option<i32> {
    CREDIT_PACKAGES
        .iter()
        .find(|(c, _)| *c == credits)
        .map(|(_, price)| *price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_display_roundtrips_through_parser() {
        let bbox = BoundingBox {
            min_lon: 7.1,
            min_lat: 43.6,
            max_lon: 7.4,
            max_lat: 43.8,
        };
        let parsed = crate::core::parse_bbox(&bbox.to_string()).unwrap();
        assert_eq!(parsed, bbox);
    }

    #[test]
    fn test_package_price_table() {
        assert_eq!(package_price(1), Some(200));
        assert_eq!(package_price(50), Some(10000));
        assert_eq!(package_price(7), None);
    }
}
