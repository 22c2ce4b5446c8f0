use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub storage_path: String,
    pub jwt_secret: String,
    /// Externally visible origin, used to build blob and invite URLs.
    pub public_url: String,
    pub session_ttl_days: i64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/homebuild.db?mode=rwc".to_string()),
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "./data/blobs".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-change-in-production".to_string()),
            public_url: env::var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|d| d.parse().ok())
                .filter(|d| *d > 0)
                .unwrap_or(7),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
        }
    }

    pub fn invite_link(&self, token: &str) -> String {
        format!("{}/invite/{token}", self.public_url)
    }

    pub fn blob_base_url(&self) -> String {
        format!("{}/blobs", self.public_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            storage_path: "./blobs".to_string(),
            jwt_secret: "secret".to_string(),
            public_url: "https://builder.example".to_string(),
            session_ttl_days: 7,
            max_upload_bytes: 1024,
        }
    }

    #[test]
    fn invite_link_uses_public_url() {
        assert_eq!(
            config().invite_link("abc"),
            "https://builder.example/invite/abc"
        );
    }

    #[test]
    fn blob_urls_live_under_blobs() {
        assert_eq!(config().blob_base_url(), "https://builder.example/blobs");
    }
}
