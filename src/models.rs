use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::ApiError;

// ============ HQ Public Contacts ============

/// A contact record as returned by HQ Public.
///
/// Kept as an order-preserving JSON object so that fields this crate does
/// not know about survive a fetch → merge → PUT cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contact(Map<String, Value>);

impl Contact {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parses a contact, rejecting anything that is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ApiError::RemoteFailure(format!(
                "Expected a contact object, got {}",
                other
            ))),
        }
    }

    /// The remote identifier. HQ Public answers lookups for unknown ids
    /// with an empty record whose `ContactId` is 0.
    pub fn contact_id(&self) -> Option<i64> {
        self.0.get("ContactId").and_then(Value::as_i64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Root-level extra fields, or an empty slice when the array is absent.
    pub fn extra_fields(&self) -> &[Value] {
        array_or_empty(self.0.get(EXTRA_FIELDS))
    }

    pub fn addresses(&self) -> &[Value] {
        array_or_empty(self.0.get(ADDRESSES))
    }

    /// Reads `Values[0].Fields[0].Value` of the root extra field with `key`.
    pub fn extra_field_value(&self, key: &str) -> Option<&Value> {
        self.extra_fields()
            .iter()
            .find(|field| field.get(KEY).and_then(Value::as_str) == Some(key))
            .and_then(|field| field.pointer("/Values/0/Fields/0/Value"))
    }
}

impl From<Contact> for Value {
    fn from(contact: Contact) -> Self {
        Value::Object(contact.0)
    }
}

pub(crate) const EXTRA_FIELDS: &str = "ExtraFields";
pub(crate) const ADDRESSES: &str = "Addresses";
pub(crate) const KEY: &str = "Key";
pub(crate) const ADDRESS_TYPE_ID: &str = "AddressTypeId";

fn array_or_empty(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Deserializes a field that was present in the input, keeping an explicit
/// `null` as `Some(Value::Null)`. Combined with `#[serde(default)]` an
/// absent field stays `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Reads `null` as an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A sparse extra-field change: `{Key, Id?, Value?}`.
///
/// `None` leaves the remote slot untouched; `Some(Value::Null)` writes null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraFieldUpdate {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(
        rename = "Id",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    #[serde(
        rename = "Value",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl ExtraFieldUpdate {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: None,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// An address change, matched against existing addresses by `AddressTypeId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressUpdate {
    #[serde(
        rename = "ExtraFields",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extra_fields: Vec<ExtraFieldUpdate>,
    /// Every other address field (`AddressTypeId`, `Street`, `ZipCode`, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AddressUpdate {
    pub fn new(address_type_id: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(ADDRESS_TYPE_ID.to_string(), address_type_id.into());
        Self {
            extra_fields: Vec::new(),
            fields,
        }
    }

    pub fn address_type_id(&self) -> Option<&Value> {
        self.fields.get(ADDRESS_TYPE_ID)
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn extra_field(mut self, field: ExtraFieldUpdate) -> Self {
        self.extra_fields.push(field);
        self
    }
}

/// A caller-supplied sparse contact change.
///
/// `ExtraFields` and `Addresses` are reconciled by key against the fetched
/// contact; every other key is a root field that overwrites the remote one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    #[serde(
        rename = "ExtraFields",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extra_fields: Vec<ExtraFieldUpdate>,
    #[serde(
        rename = "Addresses",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub addresses: Vec<AddressUpdate>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContactUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a caller mapping such as
    /// `{"FirstName": "Kari", "ExtraFields": [{"Key": "dept", "Value": "Eng"}]}`.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        if !value.is_object() {
            return Err(ApiError::InvalidArgument(
                "A contact update must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidArgument(format!("Malformed contact update: {}", e)))
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn extra_field(mut self, field: ExtraFieldUpdate) -> Self {
        self.extra_fields.push(field);
        self
    }

    pub fn address(mut self, address: AddressUpdate) -> Self {
        self.addresses.push(address);
        self
    }
}

/// A custom event for the HQ marketing automation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketingEvent {
    pub event_type_name: String,
    pub customer_id: String,
    pub description: String,
    pub context: String,
}

impl MarketingEvent {
    pub fn new(event_type_name: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            event_type_name: event_type_name.into(),
            customer_id: customer_id.into(),
            description: String::new(),
            context: "0".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

// ============ SMS ============

pub const DEFAULT_SMS_SHORTCODE: u32 = 2262;

/// Sender shown on the handset: a numeric short code or an alphanumeric name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sender {
    Shortcode(u32),
    Name(String),
}

impl Default for Sender {
    fn default() -> Self {
        Sender::Shortcode(DEFAULT_SMS_SHORTCODE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleSms {
    pub recipient: String,
    pub message: String,
    pub from: Sender,
}

impl SingleSms {
    pub fn new(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            message: message.into(),
            from: Sender::default(),
        }
    }

    pub fn sender(mut self, sender: Sender) -> Self {
        self.from = sender;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkSms {
    pub recipients: Vec<String>,
    pub message: String,
    pub from: Sender,
    /// `None` sends immediately.
    pub send_time: Option<DateTime<Utc>>,
    pub remove_duplicates: bool,
}

impl BulkSms {
    pub fn new(recipients: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            recipients,
            message: message.into(),
            from: Sender::default(),
            send_time: None,
            remove_duplicates: true,
        }
    }

    pub fn sender(mut self, sender: Sender) -> Self {
        self.from = sender;
        self
    }

    pub fn send_at(mut self, send_time: DateTime<Utc>) -> Self {
        self.send_time = Some(send_time);
        self
    }

    pub fn keep_duplicates(mut self) -> Self {
        self.remove_duplicates = false;
        self
    }

    /// ISO-8601 send time with millisecond precision, e.g. `2024-05-01T08:00:00.000Z`.
    pub fn send_time_iso(&self) -> String {
        self.send_time
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkSendResponse {
    #[serde(rename = "ShipmentId")]
    pub shipment_id: Value,
}

// ============ Record Linking ============

/// A record-linking hit with lowercase-first keys (`firstName`, `zipCode`, ...).
pub type Record = Map<String, Value>;

/// Search criteria for a record-linking query.
///
/// A non-empty `fulltext` overrides every other criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub address_name: Option<String>,
    pub address_number: Option<String>,
    pub address_letter: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub mobile: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub company_org_no: Option<String>,
    pub fulltext: Option<String>,
}

impl SearchCriteria {
    /// Query parameters in the remote's capitalization.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        if let Some(fulltext) = non_empty(&self.fulltext) {
            return vec![("Fulltext", fulltext.to_string())];
        }

        [
            ("FirstName", &self.first_name),
            ("MiddleName", &self.middle_name),
            ("LastName", &self.last_name),
            ("AddressName", &self.address_name),
            ("AddressNumber", &self.address_number),
            ("AddressLetter", &self.address_letter),
            ("ZipCode", &self.zip_code),
            ("City", &self.city),
            ("Mobile", &self.mobile),
            ("Phone", &self.phone),
            ("CompanyName", &self.company_name),
            ("CompanyOrgNo", &self.company_org_no),
        ]
        .into_iter()
        .filter_map(|(name, value)| non_empty(value).map(|v| (name, v.to_string())))
        .collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub const DEFAULT_MAX_RESULTS: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct MultiSearch {
    pub search: SearchCriteria,
    pub max_results: u32,
}

impl MultiSearch {
    pub fn new(search: SearchCriteria) -> Self {
        Self {
            search,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

pub const DEFAULT_CONTACT_FIELDS: [&str; 13] = [
    "krId",
    "phone",
    "mobile",
    "firstName",
    "middleName",
    "lastName",
    "streetName",
    "streetNumber",
    "streetLetter",
    "streetZipCode",
    "streetCity",
    "age",
    "gender",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SingleSearch {
    pub search: SearchCriteria,
    pub wash_degree: u32,
    /// Fields to return, in the caller's lowercase-first naming.
    pub contact_fields: Vec<String>,
    pub analyze_fields: Vec<String>,
}

impl SingleSearch {
    pub fn new(search: SearchCriteria) -> Self {
        Self {
            search,
            wash_degree: 0,
            contact_fields: DEFAULT_CONTACT_FIELDS.iter().map(|f| f.to_string()).collect(),
            analyze_fields: Vec::new(),
        }
    }

    pub fn wash_degree(mut self, wash_degree: u32) -> Self {
        self.wash_degree = wash_degree;
        self
    }

    pub fn contact_fields(mut self, fields: Vec<String>) -> Self {
        self.contact_fields = fields;
        self
    }

    pub fn analyze_fields(mut self, fields: Vec<String>) -> Self {
        self.analyze_fields = fields;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_field_update_distinguishes_null_from_absent() {
        let update: ExtraFieldUpdate =
            serde_json::from_value(json!({ "Key": "dept", "Id": null })).unwrap();

        assert_eq!(update.id, Some(Value::Null));
        assert_eq!(update.value, None);
    }

    #[test]
    fn test_contact_update_splits_nested_sequences() {
        let update = ContactUpdate::from_value(json!({
            "FirstName": "Kari",
            "ExtraFields": [{ "Key": "dept", "Value": "Eng" }],
            "Addresses": [{ "AddressTypeId": 2, "Street": "Storgata 1" }]
        }))
        .unwrap();

        assert_eq!(update.fields.get("FirstName"), Some(&json!("Kari")));
        assert!(!update.fields.contains_key("ExtraFields"));
        assert_eq!(update.extra_fields[0].value, Some(json!("Eng")));
        assert_eq!(update.addresses[0].address_type_id(), Some(&json!(2)));
        assert!(update.addresses[0].extra_fields.is_empty());
    }

    #[test]
    fn test_contact_update_null_sequences_are_empty() {
        let update = ContactUpdate::from_value(json!({
            "FirstName": "Kari",
            "ExtraFields": null,
            "Addresses": [{ "AddressTypeId": 2, "ExtraFields": null }]
        }))
        .unwrap();

        assert!(update.extra_fields.is_empty());
        assert_eq!(update.addresses.len(), 1);
        assert!(update.addresses[0].extra_fields.is_empty());
        assert!(!update.fields.contains_key("ExtraFields"));
    }

    #[test]
    fn test_contact_update_rejects_non_object() {
        let err = ContactUpdate::from_value(json!(["not", "a", "map"])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn test_contact_accessors() {
        let contact = Contact::from_value(json!({
            "ContactId": 11936,
            "ExtraFields": [
                { "Key": "dept", "Values": [{ "Id": 9, "Fields": [{ "Value": "Sales" }] }] }
            ]
        }))
        .unwrap();

        assert_eq!(contact.contact_id(), Some(11936));
        assert_eq!(contact.extra_field_value("dept"), Some(&json!("Sales")));
        assert!(contact.addresses().is_empty());
    }

    #[test]
    fn test_sender_serializes_untagged() {
        assert_eq!(serde_json::to_value(Sender::default()).unwrap(), json!(2262));
        assert_eq!(
            serde_json::to_value(Sender::Name("Netlife".into())).unwrap(),
            json!("Netlife")
        );
    }

    #[test]
    fn test_send_time_iso_uses_millis() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let bulk = BulkSms::new(vec!["4790000000".into()], "hi").send_at(at);
        assert_eq!(bulk.send_time_iso(), "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn test_search_criteria_fulltext_wins() {
        let criteria = SearchCriteria {
            first_name: Some("Ola".into()),
            fulltext: Some("Ola Nordmann Oslo".into()),
            ..Default::default()
        };
        assert_eq!(
            criteria.to_query(),
            vec![("Fulltext", "Ola Nordmann Oslo".to_string())]
        );
    }

    #[test]
    fn test_search_criteria_skips_empty_values() {
        let criteria = SearchCriteria {
            first_name: Some("Ola".into()),
            last_name: Some(String::new()),
            zip_code: Some("0150".into()),
            ..Default::default()
        };
        assert_eq!(
            criteria.to_query(),
            vec![
                ("FirstName", "Ola".to_string()),
                ("ZipCode", "0150".to_string())
            ]
        );
    }
}
