//! Client for the record-linking (fuzzy person lookup) API.
//!
//! The remote uses upper camel case (`FirstName`) for query parameters and
//! response fields; callers see lower camel case (`firstName`).

use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::{Config, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::credentials::{ApiService, Credentials};
use crate::errors::ApiError;
use crate::gateway_client::BdnGatewayClient;
use crate::models::{MultiSearch, Record, SingleSearch};

/// Fields copied from the single multi-search hit into the single lookup.
const IDENTITY_FIELDS: [(&str, &str); 10] = [
    ("firstName", "FirstName"),
    ("middleName", "MiddleName"),
    ("lastName", "LastName"),
    ("addressName", "AddressName"),
    ("addressNumber", "AddressNumber"),
    ("addressLetter", "AddressLetter"),
    ("zipCode", "ZipCode"),
    ("city", "City"),
    ("mobile", "Mobile"),
    ("phone", "Phone"),
];

#[derive(Clone)]
pub struct RecordLinkingClient {
    gateway: BdnGatewayClient,
}

impl RecordLinkingClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ApiError> {
        let gateway = BdnGatewayClient::new(
            base_url,
            credentials,
            ApiService::RecordLinking,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )?;
        Ok(Self { gateway })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let gateway = BdnGatewayClient::new(
            config.record_linking_base_url.clone(),
            config.bdn_credentials.clone(),
            ApiService::RecordLinking,
            config.http_timeout,
        )?;
        Ok(Self { gateway })
    }

    /// Returns up to `max_results` records matching the search.
    pub async fn get_multi(&self, options: &MultiSearch) -> Result<Vec<Record>, ApiError> {
        self.gateway.authorize()?;

        let query = options.search.to_query();
        if query.is_empty() {
            return Err(ApiError::InvalidArgument(
                "get_multi requires at least one search criterion".to_string(),
            ));
        }

        tracing::info!(
            "Record Linking: multi search on {} field(s), max {}",
            query.len(),
            options.max_results
        );
        let records: Vec<Record> = self
            .gateway
            .get_json(&format!("/Multi/{}", options.max_results), &query)
            .await?;

        tracing::info!("Record Linking: {} record(s) found", records.len());
        Ok(records.into_iter().map(camel_case_keys).collect())
    }

    /// Resolves the search to exactly one record and returns its full
    /// details at the requested wash degree.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing matched.
    /// * `Err(ApiError::InvalidArgument)` - More than one record matched.
    pub async fn get_single(&self, options: &SingleSearch) -> Result<Option<Record>, ApiError> {
        self.gateway.authorize()?;

        let candidates = self
            .get_multi(&MultiSearch::new(options.search.clone()).max_results(2))
            .await?;

        let candidate = match candidates.as_slice() {
            [] => return Ok(None),
            [single] => single,
            _ => {
                return Err(ApiError::InvalidArgument(
                    "get_single search matched multiple records; make it more specific"
                        .to_string(),
                ))
            }
        };

        let query = single_query(options, candidate);

        tracing::info!(
            "Record Linking: single lookup at wash degree {}",
            options.wash_degree
        );
        let record: Record = self
            .gateway
            .get_json(&format!("/Single/{}", options.wash_degree), &query)
            .await?;

        Ok(Some(camel_case_keys(record)))
    }
}

fn single_query(options: &SingleSearch, candidate: &Record) -> Vec<(&'static str, String)> {
    let mut query = vec![(
        "ContactFields",
        options
            .contact_fields
            .iter()
            .map(|f| upper_first(f))
            .collect::<Vec<_>>()
            .join(","),
    )];

    if !options.analyze_fields.is_empty() {
        query.push(("AnalyzeFields", options.analyze_fields.join(",")));
    }

    for (field, param) in IDENTITY_FIELDS {
        let value = match candidate.get(field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            // Numeric identity values (e.g. a mobile stored as a number)
            // are sent as decimal text rather than skipped.
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        query.push((param, value));
    }

    query
}

fn camel_case_keys(record: Record) -> Record {
    record
        .into_iter()
        .map(|(key, value)| (lower_camel_case(&key), value))
        .collect::<Map<String, Value>>()
}

/// `streetZipCode` → `StreetZipCode`.
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converts `FirstName`, `ZIPCode` or `street_city` to `firstName`,
/// `zipCode` and `streetCity`.
pub fn lower_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, word) in split_words(s).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            out.push_str(&upper_first(&lower));
        }
    }
    out
}

/// Splits on separators, on lower→upper transitions, after a run of digits
/// and before the last capital of an acronym that is followed by a
/// lowercase letter.
fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            let case_change = c.is_uppercase()
                && (prev.is_lowercase() || (prev.is_uppercase() && next_is_lower));
            let after_digits = c.is_alphabetic() && prev.is_ascii_digit();
            if case_change || after_digits {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}
