use std::env;

/// Connection details for the headless-CMS GraphQL API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub token: String,
}

/// Process configuration, loaded once at startup.
///
/// The upstream connection is optional so the server can still boot (and
/// answer health checks) without credentials; API routes that need the
/// upstream fail with a configuration error instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub upstream: Option<UpstreamConfig>,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// Recognised variables: `PORT` (default 3000), `GRAPHQL_ENDPOINT`,
    /// `GRAPHQL_TOKEN`.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let upstream = upstream_from(
            env::var("GRAPHQL_ENDPOINT").ok(),
            env::var("GRAPHQL_TOKEN").ok(),
        );

        Self { port, upstream }
    }
}

/// Both endpoint and token must be present and non-empty; a partial
/// configuration is treated as unconfigured.
fn upstream_from(endpoint: Option<String>, token: Option<String>) -> Option<UpstreamConfig> {
    match (endpoint, token) {
        (Some(endpoint), Some(token)) if !endpoint.is_empty() && !token.is_empty() => {
            Some(UpstreamConfig { endpoint, token })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_requires_both_endpoint_and_token() {
        assert!(upstream_from(None, None).is_none());
        assert!(upstream_from(Some("https://cms.example/graphql".into()), None).is_none());
        assert!(upstream_from(None, Some("token".into())).is_none());
        assert!(upstream_from(Some(String::new()), Some("token".into())).is_none());

        let upstream = upstream_from(
            Some("https://cms.example/graphql".into()),
            Some("token".into()),
        )
        .expect("complete configuration should parse");
        assert_eq!(upstream.endpoint, "https://cms.example/graphql");
    }
}
