//! Credential extraction and identity resolution.

use std::collections::{BTreeSet, HashMap};

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::handler::BoxFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialScheme {
    Basic,
    Bearer,
}

/// The resolved caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub roles: BTreeSet<String>,
    pub scheme: CredentialScheme,
}

impl Identity {
    pub fn new(id: impl Into<String>, scheme: CredentialScheme) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
            scheme,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }
}

/// A credential as presented in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    Basic { login: String, password: String },
}

impl Credential {
    /// Parses an `Authorization` header value. Unknown schemes and undecodable
    /// Basic payloads yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let (scheme, rest) = value.trim().split_once(' ')?;
        let rest = rest.trim();
        if rest.is_empty() {
            return None;
        }
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(Credential::Bearer(rest.to_string()));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD.decode(rest).ok()?;
            let decoded = String::from_utf8(decoded).ok()?;
            let (login, password) = decoded.split_once(':')?;
            return Some(Credential::Basic {
                login: login.to_string(),
                password: password.to_string(),
            });
        }
        None
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::parse)
    }

    pub fn scheme(&self) -> CredentialScheme {
        match self {
            Credential::Bearer(_) => CredentialScheme::Bearer,
            Credential::Basic { .. } => CredentialScheme::Basic,
        }
    }
}

/// Login/password pair guarding a resource.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BasicCredentials {
    pub login: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Both the configured and the presented pair must be non-empty.
    pub fn matches(&self, credential: Option<&Credential>) -> bool {
        match credential {
            Some(Credential::Basic { login, password }) => {
                !login.is_empty()
                    && !password.is_empty()
                    && *login == self.login
                    && *password == self.password
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Turns a presented credential into an identity.
pub trait IdentityResolver: Send + Sync {
    fn resolve<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, Option<Identity>>;
}

/// Resolver backed by a fixed set of bearer tokens and basic users.
#[derive(Default, Clone)]
pub struct StaticIdentityResolver {
    tokens: HashMap<String, Identity>,
    users: HashMap<String, (String, Identity)>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    pub fn with_user(
        mut self,
        login: impl Into<String>,
        password: impl Into<String>,
        identity: Identity,
    ) -> Self {
        self.users.insert(login.into(), (password.into(), identity));
        self
    }

    fn lookup(&self, credential: &Credential) -> Option<Identity> {
        match credential {
            Credential::Bearer(token) => self.tokens.get(token).cloned(),
            Credential::Basic { login, password } => self
                .users
                .get(login)
                .filter(|(expected, _)| expected == password)
                .map(|(_, identity)| identity.clone()),
        }
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn resolve<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, Option<Identity>> {
        Box::pin(async move { self.lookup(credential) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_header(pair: &str) -> String {
        format!("Basic {}", STANDARD.encode(pair))
    }

    #[test]
    fn parses_bearer_and_basic_headers() {
        assert_eq!(
            Credential::parse("Bearer abc.def"),
            Some(Credential::Bearer("abc.def".into()))
        );
        assert_eq!(
            Credential::parse(&basic_header("admin:s3:cret")),
            Some(Credential::Basic {
                login: "admin".into(),
                password: "s3:cret".into()
            })
        );
        assert_eq!(Credential::parse("Digest xyz"), None);
        assert_eq!(Credential::parse("Basic !!!"), None);
        assert_eq!(Credential::parse("Bearer "), None);
    }

    #[test]
    fn basic_guard_rejects_empty_configuration() {
        let guard = BasicCredentials::default();
        let presented = Credential::Basic {
            login: String::new(),
            password: String::new(),
        };
        assert!(!guard.matches(Some(&presented)));
        assert!(!guard.matches(None));

        let guard = BasicCredentials::new("docs", "pw");
        assert!(guard.matches(Credential::parse(&basic_header("docs:pw")).as_ref()));
        assert!(!guard.matches(Credential::parse(&basic_header("docs:nope")).as_ref()));
        assert!(!guard.matches(Some(&Credential::Bearer("pw".into()))));
    }

    #[tokio::test]
    async fn static_resolver_resolves_tokens_and_users() {
        let resolver = StaticIdentityResolver::new()
            .with_token("t-1", Identity::new("svc", CredentialScheme::Bearer))
            .with_user("ann", "pw", Identity::new("ann", CredentialScheme::Basic));

        let by_token = resolver.resolve(&Credential::Bearer("t-1".into())).await;
        assert_eq!(by_token.map(|i| i.id), Some("svc".to_string()));

        let wrong = Credential::Basic {
            login: "ann".into(),
            password: "nope".into(),
        };
        assert!(resolver.resolve(&wrong).await.is_none());
    }
}
