//! Client for the SMS gateway.

use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::config::{Config, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::credentials::{ApiService, Credentials};
use crate::errors::ApiError;
use crate::gateway_client::{parse_json, BdnGatewayClient};
use crate::models::{BulkSendResponse, BulkSms, SingleSms};

/// Column header the bulk endpoint expects above the recipient list.
pub const RECIPIENT_COLUMN: &str = "MOBILE";

#[derive(Clone)]
pub struct SmsClient {
    gateway: BdnGatewayClient,
}

impl SmsClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ApiError> {
        let gateway = BdnGatewayClient::new(
            base_url,
            credentials,
            ApiService::Sms,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )?;
        Ok(Self { gateway })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let gateway = BdnGatewayClient::new(
            config.sms_base_url.clone(),
            config.bdn_credentials.clone(),
            ApiService::Sms,
            config.http_timeout,
        )?;
        Ok(Self { gateway })
    }

    /// Sends one SMS to one recipient.
    pub async fn send_single(&self, sms: &SingleSms) -> Result<(), ApiError> {
        self.gateway.authorize()?;
        if sms.recipient.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "send_single requires a recipient".to_string(),
            ));
        }
        if sms.message.is_empty() {
            return Err(ApiError::InvalidArgument(
                "send_single requires a message".to_string(),
            ));
        }

        let body = json!({
            "PhoneNumber": sms.recipient,
            "Message": sms.message,
            "From": sms.from,
        });

        tracing::info!("SMS: sending single message");
        self.gateway
            .request(Method::POST, "/Rpc/Single/Send", &[], Some(&body))
            .await?;

        tracing::info!("✓ SMS sent");
        Ok(())
    }

    /// Sends one message to many recipients.
    ///
    /// # Returns
    ///
    /// * `Result<String, ApiError>` - The shipment id, usable with
    ///   [`SmsClient::get_shipment`].
    pub async fn send_bulk(&self, sms: &BulkSms) -> Result<String, ApiError> {
        self.gateway.authorize()?;
        let recipients = recipient_column(&sms.recipients, sms.remove_duplicates).ok_or_else(|| {
            ApiError::InvalidArgument("send_bulk requires at least one recipient".to_string())
        })?;
        if sms.message.is_empty() {
            return Err(ApiError::InvalidArgument(
                "send_bulk requires a message".to_string(),
            ));
        }

        let body = json!({
            "Template": {
                "MessageTemplate": sms.message,
                "From": sms.from,
            },
            "Recipients": recipients,
            "RecipientsPhoneColumnName": RECIPIENT_COLUMN,
            "SendTime": sms.send_time_iso(),
        });

        tracing::info!("SMS: sending bulk message to {} recipient(s)", sms.recipients.len());
        let response = self
            .gateway
            .request(Method::POST, "/Rpc/Bulk/Send", &[], Some(&body))
            .await?;

        let parsed: BulkSendResponse = parse_json(&response)?;
        let shipment_id = match parsed.shipment_id {
            Value::String(id) => id,
            Value::Null => {
                return Err(ApiError::RemoteFailure(
                    "Bulk send response carried no ShipmentId".to_string(),
                ))
            }
            other => other.to_string(),
        };

        tracing::info!("✓ Bulk SMS accepted as shipment {}", shipment_id);
        Ok(shipment_id)
    }

    /// Returns delivery information for a bulk shipment.
    pub async fn get_shipment(&self, shipment_id: &str) -> Result<Value, ApiError> {
        self.gateway.authorize()?;
        if shipment_id.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "get_shipment requires a shipment id".to_string(),
            ));
        }

        tracing::info!("SMS: fetching shipment {}", shipment_id);
        self.gateway
            .get_json(
                "/Rpc/Report/GetShipment",
                &[("shipmentId", shipment_id.to_string())],
            )
            .await
    }
}

/// Renders recipients as the single-column CSV the bulk endpoint expects.
///
/// Blank entries are skipped. Returns `None` when no recipient remains.
pub fn recipient_column(recipients: &[String], remove_duplicates: bool) -> Option<String> {
    let mut seen = HashSet::new();
    let rows: Vec<&str> = recipients
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .filter(|r| !remove_duplicates || seen.insert(*r))
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(format!("{}\n{}", RECIPIENT_COLUMN, rows.join("\n")))
}
