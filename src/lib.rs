//! BDN API Client Library
//!
//! Thin async clients for three BDN services that share the same
//! `x-bdn-key` / `x-bdn-account` header authentication:
//!
//! - the SMS gateway (single send, bulk send, shipment status),
//! - HQ Public, the CRM contacts API (lookup, create, update, events),
//! - Record Linking, fuzzy person lookup against a reference register.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `contact_merge`: Reconciles sparse contact updates into fetched records.
//! - `credentials`: API credentials and their validation.
//! - `errors`: Error handling types.
//! - `gateway_client`: Shared HTTP transport.
//! - `hq_public`: HQ Public contacts client.
//! - `models`: Request and response models.
//! - `record_linking`: Record-linking client.
//! - `sms`: SMS gateway client.

pub mod config;
pub mod contact_merge;
pub mod credentials;
pub mod errors;
pub mod gateway_client;
pub mod hq_public;
pub mod models;
pub mod record_linking;
pub mod sms;

pub use credentials::{ApiService, Credentials};
pub use errors::ApiError;
pub use hq_public::HqPublicClient;
pub use record_linking::RecordLinkingClient;
pub use sms::SmsClient;
