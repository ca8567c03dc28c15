// # Cloudflare Record Store
//
// `RecordStore` implementation backed by the Cloudflare API v4. The store
// manages exactly one TXT record, `<record_prefix>.<domain>`, whose content
// is the encoded alias directory.
//
// ## Responsibilities
//
// - Resolve the zone once, in `CloudflareRecordStore::connect`
// - Read the record (GET)
// - Replace its content (PUT for overwrite, PATCH for patch)
// - Map HTTP statuses and API envelopes to `aliasdns_core::Error`
//
// The store never retries, never caches record content between calls and
// never decodes the content; all of that is owned by `AliasEngine`.
//
// ## Security
//
// - The API token never appears in logs or `Debug` output
// - The token should come from the environment (`ALIASDNS_API_TOKEN`)
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=TXT&name=...`
// - Overwrite DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Update DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use aliasdns_core::config::{AliasConfig, StoreConfig};
use aliasdns_core::traits::{RecordStore, RecordStoreFactory, TxtRecord};
use aliasdns_core::{Error, Result, StoreRegistry};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Environment variable selecting dry-run mode (`ALIASDNS_MODE=dry-run`)
pub const MODE_ENV: &str = "ALIASDNS_MODE";

const STORE_NAME: &str = "cloudflare";

/// Everything needed to talk to one record
#[derive(Clone)]
pub struct CloudflareSettings {
    /// API token (Zone:DNS:Edit)
    pub api_token: String,
    /// Zone name used for lookup
    pub domain: String,
    /// Fully qualified TXT record name
    pub record_name: String,
    /// Preconfigured zone id; skips the lookup
    pub zone_id: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Log writes instead of sending them
    pub dry_run: bool,
    /// API base URL
    pub api_base: String,
}

impl std::fmt::Debug for CloudflareSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareSettings")
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("record_name", &self.record_name)
            .field("zone_id", &self.zone_id)
            .field("timeout", &self.timeout)
            .field("dry_run", &self.dry_run)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareSettings {
    /// Build settings from the application configuration
    ///
    /// Fails unless the store section is a valid Cloudflare section.
    pub fn from_config(config: &AliasConfig) -> Result<Self> {
        config.store.validate()?;

        match &config.store {
            StoreConfig::Cloudflare {
                api_token,
                zone_id,
                timeout_secs,
                dry_run,
                api_base,
            } => Ok(Self {
                api_token: api_token.clone(),
                domain: config.domain.clone(),
                record_name: config.record_name(),
                zone_id: zone_id.clone().filter(|z| !z.is_empty()),
                timeout: Duration::from_secs(*timeout_secs),
                dry_run: *dry_run,
                api_base: api_base
                    .as_deref()
                    .unwrap_or(CLOUDFLARE_API_BASE)
                    .trim_end_matches('/')
                    .to_string(),
            }),
            other => Err(Error::config(format!(
                "Invalid config for Cloudflare store: type {}",
                other.type_name()
            ))),
        }
    }
}

/// Cloudflare-backed TXT record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true the store performs every GET, logs the intended
/// PUT or PATCH payload and reports success without modifying the record.
pub struct CloudflareRecordStore {
    /// ⚠️ NEVER log this value
    api_token: String,
    zone_id: String,
    record_name: String,
    api_base: String,
    client: reqwest::Client,
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareRecordStore")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Standard Cloudflare response wrapper
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    #[serde(default)]
    content: String,
}

impl CloudflareRecordStore {
    /// Build the HTTP client and resolve the zone
    ///
    /// With a preconfigured zone id no request is made. Otherwise the zone
    /// is looked up by the configured domain; a failed lookup fails
    /// construction.
    pub async fn connect(settings: CloudflareSettings) -> Result<Self> {
        if settings.api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let mut store = Self {
            api_token: settings.api_token,
            zone_id: String::new(),
            record_name: settings.record_name,
            api_base: settings.api_base,
            client,
            dry_run: settings.dry_run,
        };

        store.zone_id = match settings.zone_id {
            Some(zone_id) => {
                tracing::debug!("Using pre-configured zone ID");
                zone_id
            }
            None => store.lookup_zone(&settings.domain).await?,
        };

        if store.dry_run {
            tracing::warn!("Cloudflare store running in DRY-RUN mode - no changes will be made");
        }

        Ok(store)
    }

    /// The resolved zone id
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn lookup_zone(&self, domain: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for domain: {}", domain);

        let url = format!("{}/zones", self.api_base);
        let request = self
            .client
            .get(&url)
            .query(&[("name", domain)]);
        let zones: Vec<Zone> = self.send(request, &format!("zone {}", domain)).await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", domain)))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, self.zone_id, record_id
        )
    }

    /// Send a request and unwrap the API envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, what, &body));
        }

        parse_envelope(&body)
    }

    async fn write(&self, method: Method, record_id: &str, content: &str) -> Result<()> {
        let url = self.record_url(record_id);
        let payload = serde_json::json!({
            "type": "TXT",
            "name": self.record_name,
            "content": content,
        });

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send {} request to {} with payload: {}",
                method,
                url,
                payload
            );
            return Ok(());
        }

        tracing::debug!("{} {}", method, url);
        let request = self.client.request(method, &url).json(&payload);
        let record: DnsRecord = self
            .send(request, &format!("record {}", self.record_name))
            .await?;

        tracing::info!(
            "TXT record {} updated ({} bytes)",
            record.name,
            record.content.len()
        );
        Ok(())
    }
}

#[async_trait]
impl RecordStore for CloudflareRecordStore {
    async fn fetch(&self) -> Result<TxtRecord> {
        let url = format!("{}/zones/{}/dns_records", self.api_base, self.zone_id);
        tracing::debug!("Fetching TXT record {}", self.record_name);

        let request = self
            .client
            .get(&url)
            .query(&[("type", "TXT"), ("name", self.record_name.as_str())]);
        let records: Vec<DnsRecord> = self
            .send(request, &format!("record {}", self.record_name))
            .await?;

        let record = records.into_iter().next().ok_or_else(|| {
            Error::not_found(format!("TXT record not found: {}", self.record_name))
        })?;

        Ok(TxtRecord::new(record.id, record.name, record.content))
    }

    async fn overwrite(&self, record_id: &str, content: &str) -> Result<()> {
        self.write(Method::PUT, record_id, content).await
    }

    async fn patch(&self, record_id: &str, content: &str) -> Result<()> {
        self.write(Method::PATCH, record_id, content).await
    }

    fn record_name(&self) -> &str {
        &self.record_name
    }

    fn store_name(&self) -> &'static str {
        STORE_NAME
    }
}

/// Map a failed request to an error
fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Cloudflare request timed out: {}", e))
    } else {
        Error::http(format!("HTTP request failed: {}", e))
    }
}

/// Map an unsuccessful HTTP status to an error
fn status_error(status: StatusCode, what: &str, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("Not found: {}", what)),
        409 => Error::conflict(format!(
            "Record is being updated by another process. Status: {}",
            status
        )),
        429 => Error::rate_limited(format!("Rate limit exceeded. Status: {}", status)),
        500..=599 => Error::unavailable(format!("Cloudflare server error: {} - {}", status, body)),
        _ => Error::provider(STORE_NAME, format!("Request for {} failed: {} - {}", what, status, body)),
    }
}

/// Decode a response body and surface API-level failures
fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: ApiEnvelope<T> = serde_json::from_str(body)
        .map_err(|e| Error::provider(STORE_NAME, format!("Failed to parse response: {}", e)))?;

    if !envelope.success {
        let messages: Vec<String> = envelope
            .errors
            .iter()
            .map(|m| format!("{} ({})", m.message, m.code))
            .collect();
        return Err(Error::provider(
            STORE_NAME,
            format!("API reported failure: {}", messages.join("; ")),
        ));
    }

    envelope
        .result
        .ok_or_else(|| Error::provider(STORE_NAME, "Invalid response format: missing result"))
}

/// Whether the environment asks for dry-run mode
fn dry_run_from_env() -> bool {
    std::env::var(MODE_ENV)
        .map(|mode| mode.eq_ignore_ascii_case("dry-run"))
        .unwrap_or(false)
}

/// Factory for creating Cloudflare record stores
pub struct CloudflareFactory;

#[async_trait]
impl RecordStoreFactory for CloudflareFactory {
    async fn create(&self, config: &AliasConfig) -> Result<Box<dyn RecordStore>> {
        let mut settings = CloudflareSettings::from_config(config)?;
        settings.dry_run |= dry_run_from_env();

        Ok(Box::new(CloudflareRecordStore::connect(settings).await?))
    }
}

/// Register the Cloudflare store with a registry
///
/// # Example
///
/// ```rust
/// use aliasdns_core::StoreRegistry;
///
/// let registry = StoreRegistry::new();
/// aliasdns_store_cloudflare::register(&registry);
/// assert!(registry.has_store("cloudflare"));
/// ```
pub fn register(registry: &StoreRegistry) {
    registry.register_store(STORE_NAME, Box::new(CloudflareFactory));
}
