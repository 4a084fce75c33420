use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment, Metadata, Provider,
};

lazy_static::lazy_static! {
    /// Provide a lazily instantiated static reference to
    /// a config object parsed from canonical locations
    /// so that applications have immutable access to it from
    /// anywhere without ever having to parse the config more
    /// than once.
    pub static ref CONFIG: Config = load_config();
}

fn load_config() -> Config {
    Config::figment().extract().unwrap_or_default()
}

/// Credentials handed to the transport for servers asking for them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Short names for service document URIs.
    services: HashMap<String, String>,
    credentials: Option<Credentials>,
    user_agent: String,
    /// Record every exchange into this directory, in the playback layout.
    record: Option<PathBuf>,
}

impl Config {
    /// The service document URI registered under `alias`, if any.
    pub fn service(&self, alias: &str) -> Option<&str> {
        self.services.get(alias).map(String::as_str)
    }

    pub fn services(&self) -> &HashMap<String, String> {
        &self.services
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn record(&self) -> Option<&PathBuf> {
        self.record.as_ref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            services: HashMap::new(),
            credentials: None,
            user_agent: concat!("apub/", env!("CARGO_PKG_VERSION")).into(),
            record: None,
        }
    }
}

impl Config {
    pub fn from<T: Provider>(provider: T) -> Result<Config, figment::Error> {
        Figment::from(Config::default()).admerge(provider).extract()
    }

    pub fn figment() -> Figment {
        let mut fig = Figment::from(Config::default());

        if let Ok(c) = etcetera::choose_base_strategy() {
            let config = c.config_dir().join("apub.toml");
            fig = fig.admerge(Toml::file(config));
        }

        fig.admerge(Env::prefixed("APUB_").split("__"))
    }
}

impl Provider for Config {
    fn metadata(&self) -> figment::Metadata {
        Metadata::named("AtomPub CLI Config")
    }
    fn data(
        &self,
    ) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        figment::providers::Serialized::defaults(self).data()
    }
}
