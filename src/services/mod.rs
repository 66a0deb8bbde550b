// Service exports
pub mod billing;
pub mod generator;
pub mod overpass;
pub mod payments;
pub mod postgres;
pub mod terrain;

pub use billing::{charge, ChargeError, CreditLedger};
pub use generator::{GenerateError, MapGenerator, RenderedMap};
pub use overpass::{OverpassClient, OverpassError};
pub use payments::{PaymentIntent, PaymentsClient, PaymentsError};
pub use postgres::{PostgresClient, PostgresError};
pub use terrain::{TerrainClient, TerrainError};
