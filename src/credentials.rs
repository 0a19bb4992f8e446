use crate::errors::ApiError;
use serde_json::{Map, Value};

/// The remote services this crate talks to.
///
/// Each service requires a different set of credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiService {
    Sms,
    HqPublic,
    RecordLinking,
}

impl ApiService {
    /// Credential keys the service needs, in the caller-facing mapping names.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            ApiService::HqPublic => &["apiKey", "apiAccount", "apiDomain"],
            ApiService::Sms | ApiService::RecordLinking => &["apiKey", "apiAccount"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApiService::Sms => "SMS",
            ApiService::HqPublic => "HQ Public",
            ApiService::RecordLinking => "Record Linking",
        }
    }
}

/// Static API credentials sent as `x-bdn-*` headers.
///
/// Blank values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_account: Option<String>,
    pub api_domain: Option<String>,
}

impl Credentials {
    /// Credentials for the SMS and record-linking services.
    pub fn new(api_key: impl Into<String>, api_account: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_account: Some(api_account.into()),
            api_domain: None,
        }
    }

    /// Adds the domain header value required by HQ Public.
    pub fn with_domain(mut self, api_domain: impl Into<String>) -> Self {
        self.api_domain = Some(api_domain.into());
        self
    }

    /// Builds credentials from a caller mapping such as
    /// `{"apiKey": "...", "apiAccount": "...", "apiDomain": "..."}`.
    ///
    /// Fails with `MissingCredential` naming every required key that is
    /// absent or blank. Nothing is applied on failure.
    pub fn from_map(map: &Map<String, Value>, service: ApiService) -> Result<Self, ApiError> {
        let read = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let missing: Vec<&str> = service
            .required_keys()
            .iter()
            .copied()
            .filter(|key| read(*key).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(ApiError::MissingCredential(format!(
                "{} is missing",
                describe_missing(&missing)
            )));
        }

        Ok(Self {
            api_key: read("apiKey"),
            api_account: read("apiAccount"),
            api_domain: read("apiDomain"),
        })
    }

    /// Checks that every credential the service needs is set.
    pub fn authorize(&self, service: ApiService) -> Result<(), ApiError> {
        let unset = service
            .required_keys()
            .iter()
            .any(|key| self.value(*key).is_none());

        if unset {
            return Err(ApiError::Unauthorized(format!(
                "{} credentials are not set; construct the client with apiKey and apiAccount{}",
                service.name(),
                if service == ApiService::HqPublic {
                    " and apiDomain"
                } else {
                    ""
                }
            )));
        }

        Ok(())
    }

    fn value(&self, key: &str) -> Option<&str> {
        let field = match key {
            "apiKey" => &self.api_key,
            "apiAccount" => &self.api_account,
            "apiDomain" => &self.api_domain,
            _ => return None,
        };
        field.as_deref().filter(|v| !v.trim().is_empty())
    }

    pub(crate) fn key(&self) -> &str {
        self.value("apiKey").unwrap_or_default()
    }

    pub(crate) fn account(&self) -> &str {
        self.value("apiAccount").unwrap_or_default()
    }

    pub(crate) fn domain(&self) -> Option<&str> {
        self.value("apiDomain")
    }
}

/// Renders `["a", "b", "c"]` as `[a], [b] and [c]`.
fn describe_missing(keys: &[&str]) -> String {
    let bracketed: Vec<String> = keys.iter().map(|k| format!("[{}]", k)).collect();
    match bracketed.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}
