//! # Connection configuration
//!
//! One [`MongoConfig`] describes every deployment target. The three stock
//! layouts are available as [`Profile`]s and can be refined from the
//! environment or the command line.
//!
//! ## Environment Variables
//!
//! - `MONGO_PROFILE`: starting profile (`local`, `compose`, `authenticated`)
//! - `MONGO_URI`: full connection string, used verbatim for hosts and replica set
//! - `MONGO_HOSTS`: comma-separated `host:port` seed list
//! - `MONGO_REPLICA_SET`: replica-set name
//! - `MONGO_USERNAME` / `MONGO_PASSWORD`: credentials, both or neither
//! - `MONGO_AUTH_SOURCE`: authentication database
//! - `MONGO_MAX_POOL_SIZE`: pool size cap
//! - `MONGO_SERVER_SELECTION_TIMEOUT_MS`: replica selection timeout
//! - `MONGO_SOCKET_TIMEOUT_MS`: per-operation timeout
//! - `MONGO_APP_NAME`: application name reported to the server

use std::{
    env,
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

use clap::ValueEnum;
use mongodb::options::{ClientOptions, Credential};

use crate::errors::{BootstrapError, ConfigError};

pub const DEFAULT_REPLICA_SET: &str = "rs0";
const SEED_PORTS: [u16; 3] = [27017, 27018, 27019];

/// Deployment layouts the bootstrapper ships with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Replica set on the local machine, driver defaults for pooling.
    #[default]
    Local,
    /// Replica set reachable as `mongodb` inside a compose network.
    Compose,
    /// Containerized replica set reached from the host with credentials.
    Authenticated,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Profile as ValueEnum>::from_str(s, true)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// Seed endpoints as `host:port`.
    pub hosts: Vec<String>,
    pub replica_set: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_source: Option<String>,
    pub max_pool_size: Option<u32>,
    pub server_selection_timeout: Option<Duration>,
    /// Enforced around each operation, the driver has no socket timeout of its own.
    pub socket_timeout: Option<Duration>,
    pub app_name: Option<String>,
    /// When set, hosts and replica set come from this string instead.
    pub uri: Option<String>,
}

impl MongoConfig {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            replica_set: None,
            username: None,
            password: None,
            auth_source: None,
            max_pool_size: None,
            server_selection_timeout: None,
            socket_timeout: None,
            app_name: None,
            uri: None,
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        let mut config = Self::new(Vec::<String>::new());
        config.uri = Some(uri.into());
        config
    }

    pub fn from_profile(profile: Profile) -> Self {
        let host = match profile {
            Profile::Local => "localhost",
            Profile::Compose => "mongodb",
            Profile::Authenticated => "host.docker.internal",
        };
        let config = Self::new(SEED_PORTS.iter().map(|port| format!("{host}:{port}")))
            .with_replica_set(DEFAULT_REPLICA_SET);

        match profile {
            Profile::Local => config,
            Profile::Compose => config.with_pool_limits(
                10,
                Duration::from_millis(5000),
                Duration::from_millis(45000),
            ),
            Profile::Authenticated => config
                .with_credentials("stockmarket", "supersecret123")
                .with_pool_limits(
                    10,
                    Duration::from_millis(5000),
                    Duration::from_millis(45000),
                ),
        }
    }

    /// Builds a config from `MONGO_PROFILE` and then overlays the other variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_parse::<Profile>("MONGO_PROFILE")?.unwrap_or_default();
        Self::from_profile(profile).apply_env()
    }

    /// Overrides fields with whatever `MONGO_*` variables are set.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(uri) = env_string("MONGO_URI") {
            self.uri = Some(uri);
        }
        if let Some(hosts) = env_string("MONGO_HOSTS") {
            self.hosts = split_hosts(&hosts);
        }
        if let Some(replica_set) = env_string("MONGO_REPLICA_SET") {
            self.replica_set = Some(replica_set);
        }
        if let Some(username) = env_string("MONGO_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = env_string("MONGO_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(source) = env_string("MONGO_AUTH_SOURCE") {
            self.auth_source = Some(source);
        }
        if let Some(size) = env_parse::<u32>("MONGO_MAX_POOL_SIZE")? {
            self.max_pool_size = Some(size);
        }
        if let Some(ms) = env_parse::<u64>("MONGO_SERVER_SELECTION_TIMEOUT_MS")? {
            self.server_selection_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = env_parse::<u64>("MONGO_SOCKET_TIMEOUT_MS")? {
            self.socket_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(app_name) = env_string("MONGO_APP_NAME") {
            self.app_name = Some(app_name);
        }

        Ok(self)
    }

    pub fn with_replica_set(mut self, name: impl Into<String>) -> Self {
        self.replica_set = Some(name.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_pool_limits(
        mut self,
        max_pool_size: u32,
        server_selection_timeout: Duration,
        socket_timeout: Duration,
    ) -> Self {
        self.max_pool_size = Some(max_pool_size);
        self.server_selection_timeout = Some(server_selection_timeout);
        self.socket_timeout = Some(socket_timeout);
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.is_none() && self.hosts.is_empty() {
            return Err(ConfigError::NoHosts);
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::IncompleteCredentials);
        }
        Ok(())
    }

    /// Connection string without credentials, safe to log.
    pub fn connection_string(&self) -> String {
        if let Some(uri) = &self.uri {
            return redact_uri(uri);
        }

        let mut uri = format!("mongodb://{}/", self.hosts.join(","));
        if let Some(replica_set) = &self.replica_set {
            uri.push_str("?replicaSet=");
            uri.push_str(replica_set);
        }
        uri
    }

    /// Translates the config into driver options.
    ///
    /// Credentials are attached as a [`Credential`] rather than embedded in
    /// the connection string, so they never need escaping.
    pub async fn client_options(&self) -> Result<ClientOptions, BootstrapError> {
        self.validate()?;

        let uri = match &self.uri {
            Some(uri) => uri.clone(),
            None => self.connection_string(),
        };
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(BootstrapError::InvalidOptions)?;

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password = Some(password.clone());
            credential.source = self.auth_source.clone();
            options.credential = Some(credential);
        }
        if self.max_pool_size.is_some() {
            options.max_pool_size = self.max_pool_size;
        }
        if self.server_selection_timeout.is_some() {
            options.server_selection_timeout = self.server_selection_timeout;
        }
        if self.app_name.is_some() {
            options.app_name = self.app_name.clone();
        }

        Ok(options)
    }
}

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("hosts", &self.hosts)
            .field("replica_set", &self.replica_set)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("auth_source", &self.auth_source)
            .field("max_pool_size", &self.max_pool_size)
            .field("server_selection_timeout", &self.server_selection_timeout)
            .field("socket_timeout", &self.socket_timeout)
            .field("app_name", &self.app_name)
            .field("uri", &self.uri.as_deref().map(redact_uri))
            .finish()
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self::from_profile(Profile::default())
    }
}

pub fn split_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Replaces the `user:password@` part of a connection string.
pub fn redact_uri(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://").map(|i| i + 3) else {
        return uri.to_string();
    };
    let rest = &uri[scheme_end..];
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());

    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}***@{}", &uri[..scheme_end], &rest[at + 1..]),
        None => uri.to_string(),
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    env_string(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
                key: key.to_string(),
                details: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: [&str; 11] = [
        "MONGO_PROFILE",
        "MONGO_URI",
        "MONGO_HOSTS",
        "MONGO_REPLICA_SET",
        "MONGO_USERNAME",
        "MONGO_PASSWORD",
        "MONGO_AUTH_SOURCE",
        "MONGO_MAX_POOL_SIZE",
        "MONGO_SERVER_SELECTION_TIMEOUT_MS",
        "MONGO_SOCKET_TIMEOUT_MS",
        "MONGO_APP_NAME",
    ];

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let mut all: Vec<(&str, Option<&str>)> = ALL_VARS.iter().map(|k| (*k, None)).collect();
        for (key, value) in vars {
            all.retain(|(k, _)| k != key);
            all.push((*key, Some(*value)));
        }
        temp_env::with_vars(all, f);
    }

    #[test]
    fn local_profile_uses_driver_defaults() {
        let config = MongoConfig::from_profile(Profile::Local);
        assert_eq!(
            config.hosts,
            vec!["localhost:27017", "localhost:27018", "localhost:27019"]
        );
        assert_eq!(config.replica_set.as_deref(), Some("rs0"));
        assert!(config.username.is_none());
        assert!(config.max_pool_size.is_none());
        assert!(config.server_selection_timeout.is_none());
        assert!(config.socket_timeout.is_none());
    }

    #[test]
    fn compose_profile_carries_pool_options() {
        let config = MongoConfig::from_profile(Profile::Compose);
        assert_eq!(config.hosts[0], "mongodb:27017");
        assert_eq!(config.max_pool_size, Some(10));
        assert_eq!(config.server_selection_timeout, Some(Duration::from_millis(5000)));
        assert_eq!(config.socket_timeout, Some(Duration::from_millis(45000)));
        assert!(config.username.is_none());
    }

    #[test]
    fn authenticated_profile_carries_credentials() {
        let config = MongoConfig::from_profile(Profile::Authenticated);
        assert_eq!(config.hosts[2], "host.docker.internal:27019");
        assert_eq!(config.username.as_deref(), Some("stockmarket"));
        assert!(config.password.is_some());
        assert_eq!(config.max_pool_size, Some(10));
    }

    #[test]
    fn connection_string_lists_seeds_and_replica_set() {
        let config = MongoConfig::new(["a:27017", "b:27018", "c:27019"]).with_replica_set("rs0");
        assert_eq!(
            config.connection_string(),
            "mongodb://a:27017,b:27018,c:27019/?replicaSet=rs0"
        );

        let config = MongoConfig::new(["a:27017"]);
        assert_eq!(config.connection_string(), "mongodb://a:27017/");
    }

    #[test]
    fn connection_string_never_contains_password() {
        let config = MongoConfig::from_profile(Profile::Authenticated);
        assert!(!config.connection_string().contains("supersecret123"));

        let config = MongoConfig::from_uri("mongodb://user:pw@db:27017/?replicaSet=rs0");
        assert_eq!(config.connection_string(), "mongodb://***@db:27017/?replicaSet=rs0");
    }

    #[test]
    fn debug_output_hides_password() {
        let config = MongoConfig::from_profile(Profile::Authenticated);
        let debug = format!("{config:?}");
        assert!(!debug.contains("supersecret123"));
        assert!(debug.contains("password: Some(\"***\")"));
        assert!(debug.contains("stockmarket"));

        let config = MongoConfig::from_uri("mongodb://user:hunter2@db:27017/");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn redact_uri_leaves_plain_uris_alone() {
        assert_eq!(redact_uri("mongodb://db:27017/"), "mongodb://db:27017/");
        assert_eq!(redact_uri("not a uri"), "not a uri");
        assert_eq!(
            redact_uri("mongodb+srv://u:p@cluster.example.com/app"),
            "mongodb+srv://***@cluster.example.com/app"
        );
    }

    #[test]
    fn validate_rejects_empty_hosts_and_half_credentials() {
        let config = MongoConfig::new(Vec::<String>::new());
        assert!(matches!(config.validate(), Err(ConfigError::NoHosts)));

        let mut config = MongoConfig::from_profile(Profile::Local);
        config.username = Some("stockmarket".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompleteCredentials)
        ));

        assert!(MongoConfig::from_profile(Profile::Authenticated).validate().is_ok());
    }

    #[test]
    fn split_hosts_trims_and_skips_blanks() {
        assert_eq!(split_hosts(" a:1, b:2 ,,c:3 "), vec!["a:1", "b:2", "c:3"]);
        assert!(split_hosts("").is_empty());
    }

    #[test]
    fn profile_parses_case_insensitively() {
        assert_eq!("compose".parse::<Profile>().unwrap(), Profile::Compose);
        assert_eq!("AUTHENTICATED".parse::<Profile>().unwrap(), Profile::Authenticated);
        assert!("staging".parse::<Profile>().is_err());
    }

    #[test]
    fn from_env_defaults_to_local_profile() {
        with_env(&[], || {
            let config = MongoConfig::from_env().unwrap();
            assert_eq!(config, MongoConfig::from_profile(Profile::Local));
        });
    }

    #[test]
    fn from_env_overlays_variables_on_profile() {
        with_env(
            &[
                ("MONGO_PROFILE", "compose"),
                ("MONGO_HOSTS", "db1:27017,db2:27017"),
                ("MONGO_MAX_POOL_SIZE", "25"),
                ("MONGO_SOCKET_TIMEOUT_MS", "1000"),
            ],
            || {
                let config = MongoConfig::from_env().unwrap();
                assert_eq!(config.hosts, vec!["db1:27017", "db2:27017"]);
                assert_eq!(config.max_pool_size, Some(25));
                assert_eq!(config.socket_timeout, Some(Duration::from_secs(1)));
                assert_eq!(config.server_selection_timeout, Some(Duration::from_millis(5000)));
                assert_eq!(config.replica_set.as_deref(), Some("rs0"));
            },
        );
    }

    #[test]
    fn from_env_reports_unparseable_numbers() {
        with_env(&[("MONGO_MAX_POOL_SIZE", "lots")], || {
            let err = MongoConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("MONGO_MAX_POOL_SIZE"));
        });
    }

    #[test]
    fn from_env_rejects_unknown_profile() {
        with_env(&[("MONGO_PROFILE", "staging")], || {
            assert!(MongoConfig::from_env().is_err());
        });
    }

    #[tokio::test]
    async fn client_options_carry_pool_and_credentials() {
        let config = MongoConfig::from_profile(Profile::Authenticated).with_app_name("bootstrap");
        let options = config.client_options().await.unwrap();

        assert_eq!(options.hosts.len(), 3);
        assert_eq!(options.repl_set_name.as_deref(), Some("rs0"));
        assert_eq!(options.max_pool_size, Some(10));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_millis(5000)));
        assert_eq!(options.app_name.as_deref(), Some("bootstrap"));

        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("stockmarket"));
        assert_eq!(credential.password.as_deref(), Some("supersecret123"));
    }

    #[tokio::test]
    async fn client_options_leave_driver_defaults_for_local() {
        let options = MongoConfig::from_profile(Profile::Local)
            .client_options()
            .await
            .unwrap();
        assert!(options.credential.is_none());
        assert!(options.max_pool_size.is_none());
        assert!(options.server_selection_timeout.is_none());
    }

    #[tokio::test]
    async fn client_options_reject_invalid_config() {
        let err = MongoConfig::new(Vec::<String>::new())
            .client_options()
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidConfig(ConfigError::NoHosts)));
    }

    #[tokio::test]
    async fn client_options_reject_malformed_uri() {
        let config = MongoConfig::from_uri("postgres://nope");
        let err = config.client_options().await.unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidOptions(_)));
    }
}
