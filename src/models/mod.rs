// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    package_price, BoundingBox, CreditTransaction, GeneratedMap, RenderSettings, TileCoord,
    TransactionStatus, User, CREDIT_PACKAGES,
};
pub use requests::{ConfirmPaymentRequest, GenerateMapRequest, PurchaseCreditsRequest, RegisterRequest};
pub use responses::{
    ConfirmPaymentResponse, CreditsResponse, ErrorResponse, GalleryEntry, GalleryResponse,
    GenerateMapResponse, HealthResponse, PurchaseResponse, RegisterResponse,
};
