//! Client constants
//!
//! Centralized location for header names, parameter names and defaults
//! shared by every layer.

// Endpoints
pub const DEFAULT_API_URL: &str = "https://esi.evetech.net/";
pub const DEFAULT_DATASOURCE: &str = "tranquility";
pub const DEFAULT_API_VERSION: &str = "latest";
pub const DEFAULT_SSO_TOKEN_URL: &str = "https://login.eveonline.com/v2/oauth/token";
pub const SPEC_FILENAME: &str = "swagger.json";

// Timing defaults
pub const DEFAULT_SPEC_CACHE_DURATION_SECS: u64 = 3600;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_VALID_DURATION_SECS: u64 = 1200;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.2;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Languages ESI can localize responses into.
pub const DEFAULT_LANGUAGES: &[&str] = &["de", "en", "fr", "ja", "ru", "zh", "ko", "es"];

// Cache keys
pub const SPEC_CACHE_PREFIX: &str = "esi_swaggerspec_";
pub const RESPONSE_CACHE_PREFIX: &str = "esi_";

// Request parameters managed by the client
pub const DATASOURCE_PARAM: &str = "datasource";
pub const LANGUAGE_PARAM: &str = "language";
pub const PAGE_PARAM: &str = "page";
pub const TOKEN_PARAM: &str = "token";

// Headers
pub const PAGES_HEADER: &str = "x-pages";
pub const EXPIRES_HEADER: &str = "expires";
pub const USER_AGENT_HEADER: &str = "User-Agent";

/// Gateway statuses that are retried with backoff.
pub const RETRYABLE_STATUSES: [u16; 3] = [502, 503, 504];

/// SSO protocol version written on every refresh.
pub const CURRENT_SSO_VERSION: u8 = 2;

/// Maximum number of page requests kept in flight by `results`.
pub const PAGE_FETCH_CONCURRENCY: usize = 4;
