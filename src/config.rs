use jsonwebtoken::Algorithm;
use std::{env, net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Names of the three DynamoDB tables the service reads and writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNames {
    pub memes: String,
    pub votes: String,
    pub feed_history: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub tables: TableNames,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub hash_service_url: String,
    pub request_timeout: Duration,
    pub init_tables: bool,
}

impl Config {
    /// Loads configuration from the `.env` file (if any) and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Missing .env is fine, real deployments use plain env vars
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingVar(key.into()));

        let bind_address_str = get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let aws_region = get("AWS_DEFAULT_REGION").unwrap_or_else(|| "ca-central-1".to_string());
        let localstack_endpoint = get("AWS_ENDPOINT_URL").filter(|url| !url.is_empty());

        let tables = TableNames {
            memes: get("MEMES_TABLE").unwrap_or_else(|| "memes".to_string()),
            votes: get("VOTES_TABLE").unwrap_or_else(|| "votes".to_string()),
            feed_history: get("FEED_HISTORY_TABLE").unwrap_or_else(|| "feed_history".to_string()),
        };

        let jwt_secret = required("JWT_SECRET_KEY")?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::InvalidVar(
                "JWT_SECRET_KEY".into(),
                "secret must not be empty".into(),
            ));
        }

        let algorithm_str = get("JWT_ALGORITHM").unwrap_or_else(|| "HS256".to_string());
        let jwt_algorithm = parse_hmac_algorithm(&algorithm_str)?;

        let hash_service_url = required("HASH_SERVICE_URL")?;

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidVar("REQUEST_TIMEOUT_SECS".into(), e.to_string())
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(30),
        };

        let init_tables = match get("INIT_TABLES") {
            Some(raw) => raw
                .parse::<bool>()
                .map_err(|e| ConfigError::InvalidVar("INIT_TABLES".into(), e.to_string()))?,
            None => false,
        };

        Ok(Config {
            bind_address,
            aws_region,
            localstack_endpoint,
            tables,
            jwt_secret,
            jwt_algorithm,
            hash_service_url,
            request_timeout,
            init_tables,
        })
    }
}

// Tokens are checked against a shared secret, so only the HMAC family makes sense.
fn parse_hmac_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(raw)
        .map_err(|e| ConfigError::InvalidVar("JWT_ALGORITHM".into(), e.to_string()))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(ConfigError::InvalidVar(
            "JWT_ALGORITHM".into(),
            format!("{:?} is not an HMAC algorithm", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(map: &HashMap<String, String>) -> Result<Config, ConfigError> {
        Config::from_source(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let map = vars(&[
            ("JWT_SECRET_KEY", "super-secret"),
            ("HASH_SERVICE_URL", "http://localhost:8000/hash"),
        ]);
        let config = load(&map).expect("config loads");

        assert_eq!(config.bind_address, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.aws_region, "ca-central-1");
        assert!(config.localstack_endpoint.is_none());
        assert_eq!(config.tables.memes, "memes");
        assert_eq!(config.tables.votes, "votes");
        assert_eq!(config.tables.feed_history, "feed_history");
        assert_eq!(config.jwt_algorithm, Algorithm::HS256);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.init_tables);
    }

    #[test]
    fn missing_secret_is_reported_by_name() {
        let map = vars(&[("HASH_SERVICE_URL", "http://localhost:8000/hash")]);
        let err = load(&map).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "JWT_SECRET_KEY"));
    }

    #[test]
    fn rejects_asymmetric_jwt_algorithm() {
        let map = vars(&[
            ("JWT_SECRET_KEY", "super-secret"),
            ("HASH_SERVICE_URL", "http://localhost:8000/hash"),
            ("JWT_ALGORITHM", "RS256"),
        ]);
        let err = load(&map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar(ref v, _) if v == "JWT_ALGORITHM"));
    }

    #[test]
    fn overrides_are_honoured() {
        let map = vars(&[
            ("JWT_SECRET_KEY", "super-secret"),
            ("HASH_SERVICE_URL", "http://localhost:8000/hash"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("AWS_ENDPOINT_URL", "http://localhost:4566"),
            ("FEED_HISTORY_TABLE", "history_dev"),
            ("JWT_ALGORITHM", "HS512"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("INIT_TABLES", "true"),
        ]);
        let config = load(&map).expect("config loads");

        assert_eq!(config.bind_address, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.localstack_endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.tables.feed_history, "history_dev");
        assert_eq!(config.jwt_algorithm, Algorithm::HS512);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.init_tables);
    }

    #[test]
    fn bad_timeout_is_invalid() {
        let map = vars(&[
            ("JWT_SECRET_KEY", "super-secret"),
            ("HASH_SERVICE_URL", "http://localhost:8000/hash"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
        ]);
        assert!(matches!(
            load(&map),
            Err(ConfigError::InvalidVar(ref v, _)) if v == "REQUEST_TIMEOUT_SECS"
        ));
    }
}
