use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;

use crate::config::{ConfigError, GoogleAdsConfig};
use crate::model::{
    AccessToken, AccessTokenResponse, AdGroupBidModifierOperation, ApiErrorEnvelope,
    GoogleAdsFailure, MutateAdGroupBidModifiersRequest, MutateAdGroupBidModifiersResponse,
};

const DEVELOPER_TOKEN_HEADER: &str = "developer-token";
const LOGIN_CUSTOMER_ID_HEADER: &str = "login-customer-id";
const REQUEST_ID_HEADER: &str = "request-id";
const REDACTED: &str = "REDACTED";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Google Ads request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse Google Ads response: {0}")]
    ResponseParsingFailed(String),
    #[error(transparent)]
    GoogleAds(#[from] GoogleAdsException),
    #[error("OAuth token request failed with status {status}: {error_text}")]
    TokenRequestFailed {
        status: reqwest::StatusCode,
        error_text: String,
    },
    #[error("Failed to parse url: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Invalid retry configuration: {0}")]
    InvalidRetryConfig(String),
    #[error("Token management error: {0}")]
    Token(#[from] TokenError),
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the validation failure reported by the API, if this is one
    pub fn as_google_ads(&self) -> Option<&GoogleAdsException> {
        match self {
            Error::GoogleAds(exception) => Some(exception),
            _ => None,
        }
    }
}

/// A request the API rejected with a `GoogleAdsFailure`
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Request with ID \"{request_id}\" failed with status \"{code}\"")]
pub struct GoogleAdsException {
    pub request_id: String,
    /// Status name, e.g. `INVALID_ARGUMENT`
    pub code: String,
    pub failure: GoogleAdsFailure,
}

/// Errors from the OAuth access-token exchange
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Token refresh failed after {attempts} attempts: {last_error}")]
    RefreshFailed { attempts: u32, last_error: String },
    #[error("Rate limited: retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },
    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}

impl TokenError {
    /// Returns true if this error indicates a retryable condition
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TokenError::RateLimited { .. } | TokenError::Timeout { .. }
        )
    }

    /// Returns the retry delay in seconds if this is a rate limited error
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            TokenError::RateLimited {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

/// Retry behaviour for the OAuth token exchange.
///
/// Mutate calls are never retried: a batch either succeeds once or fails.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,
    /// Cap on any single backoff delay
    pub max_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            timeout_seconds: 10,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| Error::InvalidRetryConfig(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

impl RetryConfig {
    /// Reads the retry settings from the environment, falling back to the
    /// defaults for unset variables:
    ///
    /// - `GOOGLE_ADS_RETRY_MAX_ATTEMPTS` (3)
    /// - `GOOGLE_ADS_RETRY_BASE_DELAY_MS` (1000)
    /// - `GOOGLE_ADS_RETRY_MAX_DELAY_MS` (30000)
    /// - `GOOGLE_ADS_REQUEST_TIMEOUT_SECONDS` (10)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the resulting
    /// configuration is inconsistent
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();
        let config = Self {
            max_attempts: env_or("GOOGLE_ADS_RETRY_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_delay_ms: env_or("GOOGLE_ADS_RETRY_BASE_DELAY_MS", defaults.base_delay_ms)?,
            max_delay_ms: env_or("GOOGLE_ADS_RETRY_MAX_DELAY_MS", defaults.max_delay_ms)?,
            timeout_seconds: env_or(
                "GOOGLE_ADS_REQUEST_TIMEOUT_SECONDS",
                defaults.timeout_seconds,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        let problem = if self.max_attempts == 0 {
            "max_attempts must be greater than 0"
        } else if self.base_delay_ms == 0 {
            "base_delay_ms must be greater than 0"
        } else if self.max_delay_ms < self.base_delay_ms {
            "max_delay_ms must be greater than or equal to base_delay_ms"
        } else if self.timeout_seconds == 0 {
            "timeout_seconds must be greater than 0"
        } else {
            return Ok(());
        };
        Err(Error::InvalidRetryConfig(problem.to_string()))
    }

    /// Short delays for test environments
    pub fn for_tests() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 10,
            max_delay_ms: 50,
            timeout_seconds: 5,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// HTTP client with exponential backoff for idempotent requests
#[derive(Debug, Clone)]
pub struct RetryClient {
    client: Client,
    config: RetryConfig,
}

impl RetryClient {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Sends the request built by `request_builder`, retrying on 429, 5xx and
    /// transport errors. Other 4xx responses are returned to the caller
    /// untouched.
    ///
    /// # Errors
    /// Returns `TokenError::RateLimited` or `TokenError::Timeout` when the last
    /// attempt hit that condition, otherwise `TokenError::RefreshFailed`.
    pub async fn execute_with_retry<F>(
        &self,
        request_builder: F,
    ) -> Result<reqwest::Response, TokenError>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let max_attempts = self.config.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let is_last = attempt == max_attempts;
            let request =
                request_builder().timeout(StdDuration::from_secs(self.config.timeout_seconds));

            let delay = match request.send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = extract_retry_after(&response).unwrap_or(60);
                    tracing::warn!(
                        "Rate limited (429) on attempt {}/{}. Retry after {} seconds",
                        attempt,
                        max_attempts,
                        retry_after
                    );
                    if is_last {
                        return Err(TokenError::RateLimited {
                            retry_after_seconds: retry_after,
                        });
                    }
                    StdDuration::from_millis(std::cmp::min(
                        retry_after.saturating_mul(1000),
                        self.config.max_delay_ms,
                    ))
                }
                Ok(response) if response.status().is_server_error() => {
                    last_error = format!("Server error: {}", response.status());
                    tracing::warn!(
                        "Server error {} on attempt {}/{}",
                        response.status(),
                        attempt,
                        max_attempts
                    );
                    self.backoff_delay(attempt)
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => {
                    tracing::warn!("Request timeout on attempt {}/{}", attempt, max_attempts);
                    if is_last {
                        return Err(TokenError::Timeout {
                            timeout_seconds: self.config.timeout_seconds,
                        });
                    }
                    last_error = e.to_string();
                    self.backoff_delay(attempt)
                }
                Err(e) => {
                    tracing::warn!(
                        "Request failed on attempt {}/{}: {}",
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = e.to_string();
                    self.backoff_delay(attempt)
                }
            };

            if !is_last {
                sleep(delay).await;
            }
        }

        Err(TokenError::RefreshFailed {
            attempts: max_attempts,
            last_error,
        })
    }

    /// min(base_delay * 2^(attempt-1) + jitter, max_delay), jitter in [0, base_delay/2]
    fn backoff_delay(&self, attempt: u32) -> StdDuration {
        use rand::Rng;

        let base_delay = self.config.base_delay_ms;
        let exponential = base_delay.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        let jitter = rand::thread_rng().gen_range(0..=base_delay / 2);
        let delay = std::cmp::min(exponential.saturating_add(jitter), self.config.max_delay_ms);

        tracing::debug!("Backoff delay for attempt {}: {}ms", attempt, delay);
        StdDuration::from_millis(delay)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn extract_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

/// OAuth 2.0 installed-app credentials
#[derive(Debug)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub refresh_token: Secret<String>,
    pub token_uri: Url,
}

/// Caches the OAuth access token and refreshes it before it expires
#[derive(Debug)]
pub struct TokenManager {
    credentials: OAuthCredentials,
    access_token: Mutex<Option<AccessToken>>,
    retry_client: RetryClient,
    /// Only one refresh in flight at a time
    refresh_semaphore: Semaphore,
}

impl TokenManager {
    pub fn new(credentials: OAuthCredentials, config: RetryConfig) -> Self {
        Self {
            credentials,
            access_token: Mutex::new(None),
            retry_client: RetryClient::new(config),
            refresh_semaphore: Semaphore::new(1),
        }
    }

    /// Returns a valid access token, refreshing it when it is missing or
    /// expires within five minutes.
    ///
    /// # Errors
    /// Returns an error if the token exchange fails after all retries
    pub async fn get_token(&self) -> Result<String, Error> {
        if let Some(token) = self.cached_token().await {
            tracing::debug!("Using cached access token");
            return Ok(token);
        }

        let _permit = self.refresh_semaphore.acquire().await.map_err(|e| {
            Error::RequestFailed(format!("Failed to acquire token refresh semaphore: {e}"))
        })?;

        // Another task may have refreshed while we waited
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        self.refresh().await
    }

    async fn cached_token(&self) -> Option<String> {
        let guard = self.access_token.lock().await;
        guard
            .as_ref()
            .filter(|token| !token.expires_soon(Duration::minutes(5)))
            .map(|token| token.token.expose_secret().clone())
    }

    async fn refresh(&self) -> Result<String, Error> {
        tracing::debug!("Exchanging refresh token at {}", self.credentials.token_uri);

        let credentials = &self.credentials;
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret().as_str()),
            ("refresh_token", credentials.refresh_token.expose_secret().as_str()),
        ];

        let response = self
            .retry_client
            .execute_with_retry(|| {
                self.retry_client
                    .client()
                    .post(credentials.token_uri.clone())
                    .form(&params)
            })
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::TokenRequestFailed { status, error_text });
        }

        let token_response: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| Error::ResponseParsingFailed(e.to_string()))?;

        let lifetime = Duration::seconds(token_response.expires_in.unwrap_or(3600));
        let token = AccessToken::new(token_response.access_token.clone(), Utc::now() + lifetime);
        *self.access_token.lock().await = Some(token);

        tracing::info!("OAuth access token refreshed");
        Ok(token_response.access_token)
    }

    /// Drops the cached token so the next call refreshes
    pub async fn clear_token(&self) {
        *self.access_token.lock().await = None;
    }
}

/// Renders request headers as pretty JSON with keys sorted and credentials
/// masked. `None` renders as `{}`.
pub fn headers_to_json(headers: Option<&HeaderMap>) -> String {
    let Some(headers) = headers else {
        return "{}".to_string();
    };

    let rendered: BTreeMap<&str, String> = headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str();
            let value = if name == DEVELOPER_TOKEN_HEADER || name == AUTHORIZATION.as_str() {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name, value)
        })
        .collect();

    serde_json::to_string_pretty(&rendered).unwrap_or_else(|_| "{}".to_string())
}

/// Turns a non-2xx mutate response into an [`Error`].
///
/// Bodies carrying a `GoogleAdsFailure` become [`Error::GoogleAds`]; the
/// request id comes from the failure detail, falling back to the
/// `request-id` response header.
pub fn parse_error_response(
    status: StatusCode,
    header_request_id: Option<String>,
    body: &str,
) -> Error {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let detail = envelope
        .as_ref()
        .and_then(|envelope| envelope.error.google_ads_failure());

    match (envelope, detail) {
        (Some(envelope), Some(detail)) => {
            let code = envelope.error.status.clone().unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("UNKNOWN")
                    .to_uppercase()
                    .replace(' ', "_")
            });
            Error::GoogleAds(GoogleAdsException {
                request_id: detail.request_id.or(header_request_id).unwrap_or_default(),
                code,
                failure: GoogleAdsFailure {
                    errors: detail.errors,
                },
            })
        }
        (envelope, _) => {
            let message = envelope
                .map(|envelope| envelope.error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| body.to_string());
            Error::RequestFailed(format!("status {status}: {message}"))
        }
    }
}

#[derive(Debug)]
pub struct GoogleAdsClient {
    client: Client,
    base_url: Url,
    api_version: String,
    developer_token: Secret<String>,
    login_customer_id: Option<String>,
    token_manager: Arc<TokenManager>,
}

impl GoogleAdsClient {
    /// Creates a client from a loaded configuration, with retry settings
    /// read from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint or token URI is not a valid URL or
    /// the retry environment variables are invalid
    pub fn from_config(config: GoogleAdsConfig) -> Result<Self, Error> {
        let retry = RetryConfig::from_env()?;
        Self::with_retry_config(config, retry)
    }

    /// Creates a client with explicit retry settings for the token exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint or token URI is not a valid URL
    pub fn with_retry_config(config: GoogleAdsConfig, retry: RetryConfig) -> Result<Self, Error> {
        let base_url = endpoint_url(&config.endpoint)?;
        let credentials = OAuthCredentials {
            client_id: config.client_id,
            client_secret: config.client_secret,
            refresh_token: config.refresh_token,
            token_uri: Url::parse(&config.token_uri)?,
        };

        Ok(Self {
            client: Client::new(),
            base_url,
            api_version: config.api_version,
            developer_token: config.developer_token,
            login_customer_id: config.login_customer_id,
            token_manager: Arc::new(TokenManager::new(credentials, retry)),
        })
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    /// `{base}/{version}/customers/{customer_id}/adGroupBidModifiers:mutate`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments
    pub fn mutate_url(&self, customer_id: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::RequestFailed(format!("{} cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend([
                self.api_version.as_str(),
                "customers",
                customer_id,
                "adGroupBidModifiers:mutate",
            ]);
        Ok(url)
    }

    fn request_headers(&self, access_token: &str) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        );
        headers.insert(
            HeaderName::from_static(DEVELOPER_TOKEN_HEADER),
            HeaderValue::from_str(self.developer_token.expose_secret())?,
        );
        if let Some(login_customer_id) = &self.login_customer_id {
            headers.insert(
                HeaderName::from_static(LOGIN_CUSTOMER_ID_HEADER),
                HeaderValue::from_str(login_customer_id)?,
            );
        }
        Ok(headers)
    }

    /// Creates ad group bid modifiers in a single batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GoogleAds`] when the API rejects the batch, or a
    /// transport, authentication or parsing error otherwise
    pub async fn mutate_ad_group_bid_modifiers(
        &self,
        customer_id: &str,
        operations: Vec<AdGroupBidModifierOperation>,
    ) -> Result<MutateAdGroupBidModifiersResponse, Error> {
        let url = self.mutate_url(customer_id)?;
        let access_token = self.token_manager.get_token().await?;
        let headers = self.request_headers(&access_token)?;
        let body = MutateAdGroupBidModifiersRequest { operations };

        tracing::info!(
            "Request: POST {}\nHeaders: {}",
            url,
            headers_to_json(Some(&headers))
        );
        tracing::debug!(
            "Body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let response = self
            .client
            .post(url.clone())
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let text = response.text().await?;

        if !status.is_success() {
            let error = parse_error_response(status, request_id, &text);
            match &error {
                Error::GoogleAds(exception) => tracing::warn!(
                    "Request to {} failed: request_id={} status={} errors={}",
                    url,
                    exception.request_id,
                    exception.code,
                    exception.failure.errors.len()
                ),
                other => tracing::error!("Request to {} failed: {}", url, other),
            }
            return Err(error);
        }

        let parsed: MutateAdGroupBidModifiersResponse =
            serde_json::from_str(&text).map_err(|e| {
                Error::ResponseParsingFailed(format!("{e} (body: {text})"))
            })?;

        tracing::info!(
            "Request to {} succeeded: request_id={} results={}",
            url,
            request_id.as_deref().unwrap_or("-"),
            parsed.results.len()
        );
        tracing::debug!("Response: {}", text);

        Ok(parsed)
    }
}

/// Accepts a bare host (`googleads.googleapis.com`) or a full base URL
fn endpoint_url(endpoint: &str) -> Result<Url, Error> {
    if endpoint.contains("://") {
        Ok(Url::parse(endpoint)?)
    } else {
        Ok(Url::parse(&format!("https://{endpoint}"))?)
    }
}
