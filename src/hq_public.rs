//! Client for the HQ Public contacts API.

use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use crate::config::{Config, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::contact_merge;
use crate::credentials::{ApiService, Credentials};
use crate::errors::{ApiError, ResultExt};
use crate::gateway_client::{parse_json, BdnGatewayClient};
use crate::models::{Contact, ContactUpdate, MarketingEvent, EXTRA_FIELDS};

const CONTACTS_PATH: &str = "/CustomerAPI/Contacts";
const REQUIRED_AT_CREATE: &str = "ReqExtraFields";

#[derive(Clone)]
pub struct HqPublicClient {
    gateway: BdnGatewayClient,
}

impl HqPublicClient {
    /// Creates a client for the given base URL.
    ///
    /// Credentials are not checked here; every operation fails with
    /// `Unauthorized` while key, account or domain is blank.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ApiError> {
        let gateway = BdnGatewayClient::new(
            base_url,
            credentials,
            ApiService::HqPublic,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )?;
        Ok(Self { gateway })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let gateway = BdnGatewayClient::new(
            config.hq_base_url.clone(),
            config.hq_credentials.clone(),
            ApiService::HqPublic,
            config.http_timeout,
        )?;
        Ok(Self { gateway })
    }

    /// Looks up contacts by e-mail address.
    ///
    /// # Returns
    ///
    /// * `Result<Value, ApiError>` - The JSON list returned by HQ Public.
    pub async fn get_contacts_by_email(&self, email: &str) -> Result<Value, ApiError> {
        self.gateway.authorize()?;
        if email.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "get_contacts_by_email requires an e-mail address".to_string(),
            ));
        }

        tracing::info!("HQ Public: looking up contacts by e-mail");
        self.gateway
            .get_json(
                &format!("{}/GetByEmail", CONTACTS_PATH),
                &[("email", email.to_string())],
            )
            .await
    }

    /// Looks up contacts by mobile number.
    ///
    /// A 2xx answer that is not JSON is reported as `RemoteFailure`
    /// carrying the body, since HQ Public returns plain-text errors here.
    pub async fn get_contacts_by_mobile(&self, mobile: &str) -> Result<Value, ApiError> {
        self.gateway.authorize()?;
        if mobile.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "get_contacts_by_mobile requires a mobile number".to_string(),
            ));
        }

        tracing::info!("HQ Public: looking up contacts by mobile");
        let body = self
            .gateway
            .get(
                &format!("{}/GetByMobile", CONTACTS_PATH),
                &[("mobile", mobile.to_string())],
            )
            .await?;

        serde_json::from_str(&body).map_err(|_| {
            tracing::warn!("HQ Public answered GetByMobile with non-JSON body");
            ApiError::RemoteFailure(body)
        })
    }

    /// Fetches a single contact.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - HQ Public answered with its empty `ContactId: 0` record.
    pub async fn get_contact_by_id(&self, contact_id: i64) -> Result<Option<Contact>, ApiError> {
        self.gateway.authorize()?;

        tracing::info!("HQ Public: fetching contact {}", contact_id);
        let body = self
            .gateway
            .get(CONTACTS_PATH, &[("contactId", contact_id.to_string())])
            .await?;

        let contact = Contact::from_value(parse_json(&body)?)?;
        if contact.contact_id() == Some(0) {
            tracing::debug!("HQ Public has no contact {}", contact_id);
            return Ok(None);
        }

        Ok(Some(contact))
    }

    /// Applies a sparse update to an existing contact.
    ///
    /// Fetches the current record, reconciles `update` into it (see
    /// [`contact_merge::merge`]) and PUTs the result.
    ///
    /// # Returns
    ///
    /// * `Result<String, ApiError>` - The raw response body of the PUT.
    pub async fn update_contact(
        &self,
        contact_id: i64,
        update: ContactUpdate,
    ) -> Result<String, ApiError> {
        self.gateway.authorize()?;
        if contact_id == 0 {
            return Err(ApiError::InvalidArgument(
                "update_contact requires a contact id other than 0".to_string(),
            ));
        }

        let existing = self
            .get_contact_by_id(contact_id)
            .await
            .with_context(|| format!("Fetching contact {} before update", contact_id))?
            .filter(|contact| contact.get("ContactId").is_some())
            .ok_or_else(|| {
                ApiError::NotFound(format!("No contact matched id {}", contact_id))
            })?;

        let merged = contact_merge::merge(existing, update)?;

        tracing::info!("HQ Public: updating contact {}", contact_id);
        let body = self
            .gateway
            .request(Method::PUT, CONTACTS_PATH, &[], Some(&merged))
            .await?;

        tracing::info!("✓ Contact {} updated", contact_id);
        Ok(body)
    }

    /// Creates a contact and then applies its extra fields with a follow-up
    /// update, since HQ Public ignores most extra fields on creation.
    ///
    /// Extra fields the remote requires at creation time go in the
    /// `ReqExtraFields` root field; they are sent as `ExtraFields` on POST.
    ///
    /// # Returns
    ///
    /// * `Result<i64, ApiError>` - The id of the new contact.
    pub async fn create_contact(&self, mut contact: ContactUpdate) -> Result<i64, ApiError> {
        self.gateway.authorize()?;

        if contact.fields.shift_remove("ContactId").is_some() {
            tracing::warn!(
                "`ContactId` can't be used with create_contact; it was removed from the request"
            );
        }

        let extra_fields = std::mem::take(&mut contact.extra_fields);
        let required_extra_fields = contact.fields.shift_remove(REQUIRED_AT_CREATE);

        let mut body = match serde_json::to_value(&contact)? {
            Value::Object(map) => map,
            _ => {
                return Err(ApiError::InvalidArgument(
                    "create_contact requires a JSON object".to_string(),
                ))
            }
        };
        if let Some(required) = required_extra_fields {
            body.insert(EXTRA_FIELDS.to_string(), required);
        }

        tracing::info!("HQ Public: creating contact");
        let response = self
            .gateway
            .request(Method::POST, CONTACTS_PATH, &[], Some(&body))
            .await?;

        let contact_id = parse_contact_id(&response)?;
        tracing::info!("✓ Contact created: {}", contact_id);

        contact.extra_fields = extra_fields;
        self.update_contact(contact_id, contact)
            .await
            .with_context(|| format!("Contact {} created but follow-up update failed", contact_id))?;

        Ok(contact_id)
    }

    /// Posts a custom event to the marketing automation engine.
    pub async fn post_event(&self, event: &MarketingEvent) -> Result<(), ApiError> {
        self.gateway.authorize()?;
        if event.event_type_name.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "post_event requires an event type name".to_string(),
            ));
        }
        if event.customer_id.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "post_event requires a customer id".to_string(),
            ));
        }

        tracing::info!(
            "HQ Public: posting event '{}' for customer {}",
            event.event_type_name,
            event.customer_id
        );
        self.gateway
            .request::<()>(
                Method::POST,
                "/CustomerAPI/MarketingAutomation/PostEvent",
                &[
                    ("eventTypeName", event.event_type_name.clone()),
                    ("description", event.description.clone()),
                    ("customerId", event.customer_id.clone()),
                    ("context", event.context.clone()),
                ],
                None,
            )
            .await?;

        Ok(())
    }
}

/// HQ Public answers a successful POST with the bare numeric id.
fn parse_contact_id(body: &str) -> Result<i64, ApiError> {
    body.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::RemoteFailure(format!("Contact creation failed: {}", body)))
}
