pub mod catalog;
pub mod database;
pub mod google_auth;
pub mod sheets;
pub mod webhook;

pub use catalog::{BenefitCatalog, ResolvedBenefits};
pub use database::{BenefitStore, Database, QueryParam};
pub use google_auth::ServiceAccountAuth;
pub use sheets::SheetsClient;
pub use webhook::{AiWebhookClient, WebhookPayload};
