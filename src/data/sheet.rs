//! Hosted spreadsheet client
//!
//! Fetches the CSV export of the sheet over HTTP and parses it into a
//! [`Snapshot`]. Google Sheets edit links are rewritten to their export form.

use std::fmt;

use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::{parse_table, DataLoader, LoadError, Snapshot};

/// Host prefix of Google Sheets document links
const GOOGLE_SHEETS_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

/// Credentials attached to every sheet request
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth access token, sent as a bearer token
    #[serde(default)]
    pub access_token: Option<String>,
    /// API key, sent as the `key` query parameter
    #[serde(default)]
    pub api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Builds the CSV export URL for a sheet link
///
/// # Arguments
/// * `sheet_url` - The link to the sheet, as copied from the browser
/// * `worksheet` - Optional tab name to export instead of the default tab
///
/// Links that are not Google Sheets documents are returned unchanged.
pub fn csv_export_url(sheet_url: &str, worksheet: Option<&str>) -> String {
    let Some(rest) = sheet_url.strip_prefix(GOOGLE_SHEETS_PREFIX) else {
        return sheet_url.to_string();
    };
    let id = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    if id.is_empty() {
        return sheet_url.to_string();
    }

    if let Some(name) = worksheet {
        let base = format!("{}{}/gviz/tq", GOOGLE_SHEETS_PREFIX, id);
        return match Url::parse_with_params(&base, &[("tqx", "out:csv"), ("sheet", name)]) {
            Ok(url) => url.to_string(),
            Err(_) => base,
        };
    }

    let gid = rest
        .split(|c| matches!(c, '?' | '#' | '&'))
        .find_map(|part| part.strip_prefix("gid="));
    match gid {
        Some(gid) => format!("{}{}/export?format=csv&gid={}", GOOGLE_SHEETS_PREFIX, id, gid),
        None => format!("{}{}/export?format=csv", GOOGLE_SHEETS_PREFIX, id),
    }
}

/// Loader that reads the whole sheet in one request
#[derive(Debug, Clone)]
pub struct SheetLoader {
    client: Client,
    url: String,
    credentials: Credentials,
}

impl SheetLoader {
    /// Creates a loader for the given sheet link
    pub fn new(sheet_url: &str, worksheet: Option<&str>, credentials: Credentials) -> Self {
        Self::with_client(Client::new(), sheet_url, worksheet, credentials)
    }

    /// Creates a loader with a custom HTTP client
    pub fn with_client(
        client: Client,
        sheet_url: &str,
        worksheet: Option<&str>,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            url: csv_export_url(sheet_url, worksheet),
            credentials,
        }
    }

    /// The URL the loader requests
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Downloads the raw CSV export
    async fn fetch_table(&self) -> Result<String, LoadError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.credentials.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(key) = &self.credentials.api_key {
            request = request.query(&[("key", key)]);
        }

        tracing::debug!(url = %self.url, "fetching sheet");
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LoadError::SourceUnavailable(format!(
                "credentials rejected ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(LoadError::SourceUnavailable(format!(
                "sheet request failed with {}",
                status
            )));
        }

        // Private sheets answer with a sign-in page instead of an error status
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"));
        if is_html {
            return Err(LoadError::SourceUnavailable(
                "sheet returned an HTML page; check sharing settings and credentials".to_string(),
            ));
        }

        Ok(response.text().await?)
    }
}

impl DataLoader for SheetLoader {
    async fn fetch(&self) -> Result<Snapshot, LoadError> {
        let text = self.fetch_table().await?;
        let records = parse_table(&text)?;
        tracing::debug!(rows = records.len(), "parsed sheet");
        Ok(Snapshot::new(records, Utc::now()))
    }
}
