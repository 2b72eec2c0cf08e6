use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::{Error, Result};
use crate::identity::{BasicCredentials, CredentialScheme, Identity, StaticIdentityResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

/// Gateway settings, read from the command line or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "gateway", version, about = "API gateway with aggregated OpenAPI documentation")]
pub struct GatewayConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long = "env", env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    /// Mount point of the service actions.
    #[arg(long, env = "API_PREFIX", default_value = "/api")]
    pub api_prefix: String,

    /// Login for `/openapi-private.json`.
    #[arg(long, env = "BASIC_USER")]
    pub basic_user: Option<String>,

    /// Password for `/openapi-private.json`.
    #[arg(long, env = "BASIC_PASS", hide_env_values = true)]
    pub basic_pass: Option<String>,

    /// Bearer tokens, `token=id[:role|role],...`.
    #[arg(long, env = "API_TOKENS", hide_env_values = true)]
    pub api_tokens: Option<String>,

    /// Basic users, `login:password[:role|role],...`.
    #[arg(long, env = "API_USERS", hide_env_values = true)]
    pub api_users: Option<String>,

    /// Where generated documents are written outside production. Defaults to
    /// the working directory.
    #[arg(long, env = "OPENAPI_DIR")]
    pub openapi_dir: Option<PathBuf>,

    /// Print the public document and exit.
    #[arg(long, env = "PRINT_OPENAPI")]
    pub print_openapi: bool,
}

impl GatewayConfig {
    /// Loads `.env`, parses arguments and environment, then validates.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config =
            Self::try_parse_from(args).map_err(|err| Error::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;
        if !self.api_prefix.starts_with('/') {
            return Err(Error::Configuration(format!(
                "API_PREFIX must start with `/`, got `{}`",
                self.api_prefix
            )));
        }
        match (self.basic_user.as_deref(), self.basic_pass.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {}
            (None, None) if self.environment != Environment::Production => {}
            (None, None) => {
                return Err(Error::Configuration(
                    "BASIC_USER and BASIC_PASS are required in production".into(),
                ))
            }
            _ => {
                return Err(Error::Configuration(
                    "BASIC_USER and BASIC_PASS must be set together and non-empty".into(),
                ))
            }
        }
        self.identity_resolver()?;
        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|err| Error::Configuration(format!("invalid bind address: {err}")))?
            .next()
            .ok_or_else(|| Error::Configuration(format!("`{}` resolves to no address", self.host)))
    }

    pub fn private_docs_credentials(&self) -> BasicCredentials {
        BasicCredentials::new(
            self.basic_user.clone().unwrap_or_default(),
            self.basic_pass.clone().unwrap_or_default(),
        )
    }

    /// Directory for the diagnostic schema files; `None` in production and tests.
    pub fn schema_output_dir(&self) -> Option<PathBuf> {
        match self.environment {
            Environment::Development => {
                Some(self.openapi_dir.clone().unwrap_or_else(|| PathBuf::from(".")))
            }
            Environment::Test | Environment::Production => None,
        }
    }

    pub fn identity_resolver(&self) -> Result<StaticIdentityResolver> {
        let mut resolver = StaticIdentityResolver::new();
        for entry in entries(self.api_tokens.as_deref()) {
            let (token, identity) = entry.split_once('=').ok_or_else(|| {
                Error::Configuration("API_TOKENS entries must look like `token=id`".into())
            })?;
            let identity = parse_identity(identity, CredentialScheme::Bearer, "API_TOKENS")?;
            resolver = resolver.with_token(token.trim(), identity);
        }
        for entry in entries(self.api_users.as_deref()) {
            let mut parts = entry.splitn(3, ':');
            let (Some(login), Some(password)) = (parts.next(), parts.next()) else {
                return Err(Error::Configuration(
                    "API_USERS entries must look like `login:password`".into(),
                ));
            };
            let identity = match parts.next() {
                Some(roles) => parse_identity(&format!("{login}:{roles}"), CredentialScheme::Basic, "API_USERS")?,
                None => parse_identity(login, CredentialScheme::Basic, "API_USERS")?,
            };
            resolver = resolver.with_user(login, password, identity);
        }
        Ok(resolver)
    }
}

fn entries(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.into_iter()
        .flat_map(|raw| raw.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

/// Parses `id[:role|role]`.
fn parse_identity(raw: &str, scheme: CredentialScheme, var: &str) -> Result<Identity> {
    let (id, roles) = raw.split_once(':').unwrap_or((raw, ""));
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::Configuration(format!("{var} contains an entry without id")));
    }
    let roles = roles.split('|').map(str::trim).filter(|role| !role.is_empty());
    Ok(Identity::new(id, scheme).with_roles(roles))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(extra: &[&str]) -> Result<GatewayConfig> {
        let mut args = vec!["gateway", "--host", "127.0.0.1", "--port", "8080", "--env", "development"];
        args.extend_from_slice(extra);
        GatewayConfig::from_args(args)
    }

    #[test]
    fn parses_bind_address_and_credentials() {
        let cfg = config(&["--basic-user", "docs", "--basic-pass", "pw"]).unwrap();
        assert_eq!(cfg.bind_address().unwrap(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cfg.private_docs_credentials(), BasicCredentials::new("docs", "pw"));
    }

    #[test]
    fn half_configured_basic_credentials_are_rejected() {
        let err = config(&["--basic-user", "docs"]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn production_requires_private_docs_credentials() {
        let args = ["gateway", "--host", "127.0.0.1", "--port", "1", "--env", "production"];
        let err = GatewayConfig::from_args(args).unwrap_err();
        assert!(err.to_string().contains("required in production"));
    }

    #[test]
    fn invalid_host_is_a_configuration_error() {
        let args = ["gateway", "--host", "not a host", "--port", "80", "--env", "test"];
        assert!(matches!(GatewayConfig::from_args(args), Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn tokens_and_users_feed_the_resolver() {
        use crate::identity::{Credential, IdentityResolver};

        let cfg = config(&["--api-tokens", "t-1=svc:editor|admin, t-2=bot", "--api-users", "ann:pw"]).unwrap();
        let resolver = cfg.identity_resolver().unwrap();

        let svc = resolver.resolve(&Credential::Bearer("t-1".into())).await.unwrap();
        assert_eq!(svc.id, "svc");
        assert!(svc.roles.contains("admin"));
        let ann = Credential::Basic {
            login: "ann".into(),
            password: "pw".into(),
        };
        assert_eq!(resolver.resolve(&ann).await.unwrap().scheme, CredentialScheme::Basic);

        assert!(config(&["--api-tokens", "no-separator"]).is_err());
    }

    #[test]
    fn schema_files_are_only_written_in_development() {
        let cfg = config(&["--openapi-dir", "/tmp/docs"]).unwrap();
        assert_eq!(cfg.schema_output_dir(), Some(PathBuf::from("/tmp/docs")));
        let args = ["gateway", "--host", "127.0.0.1", "--port", "1", "--env", "test"];
        assert_eq!(GatewayConfig::from_args(args).unwrap().schema_output_dir(), None);
    }
}
