//! Configuration keys read by the auth checks.

pub const JWT_SECRET: [&str; 2] = ["JWT_SECRET_KEY", "JWT_SECRET"];
pub const SERVICE_ID: &str = "SERVICE_ID";
pub const SERVICE_SECRET: &str = "SERVICE_SECRET";
pub const AUTH_SERVICE_URL: &str = "AUTH_SERVICE_URL";
pub const AUTH_SERVICE_ENABLED: &str = "AUTH_SERVICE_ENABLED";
pub const GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
pub const GITHUB_CLIENT_ID: &str = "GITHUB_CLIENT_ID";
pub const GITHUB_CLIENT_SECRET: &str = "GITHUB_CLIENT_SECRET";
pub const OAUTH_REDIRECT_URI: &str = "OAUTH_REDIRECT_URI";
pub const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
pub const FRONTEND_URL: &str = "FRONTEND_URL";
pub const BACKEND_URL: &str = "BACKEND_URL";
pub const ACCESS_TOKEN_EXPIRE_MINUTES: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
pub const REFRESH_TOKEN_EXPIRE_DAYS: &str = "REFRESH_TOKEN_EXPIRE_DAYS";
pub const AUTH_CIRCUIT_FAILURE_THRESHOLD: &str = "AUTH_CIRCUIT_FAILURE_THRESHOLD";
pub const AUTH_CIRCUIT_TIMEOUT: &str = "AUTH_CIRCUIT_TIMEOUT";
pub const AUTH_CACHE_TTL: &str = "AUTH_CACHE_TTL";
pub const AUTH_CACHE_ENABLED: &str = "AUTH_CACHE_ENABLED";
