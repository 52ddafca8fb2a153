use serde::{de, Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::config::backends::{AntivirusBackend, StorageBackend};

#[derive(Debug, Deserialize)]
pub struct DevhostConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub hasura: HasuraConfig,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_prefix() -> String {
    "nhost".to_string()
}

fn default_proxy_port() -> u16 {
    1337
}

fn default_first_run_marker() -> String {
    "db_data".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Prefix shared by the network and every container name (`<prefix>_<service>`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,
    /// Path under the state directory whose absence marks a first run.
    #[serde(default = "default_first_run_marker")]
    pub first_run_marker: String,
    /// Abort startup when an image cannot be pulled instead of continuing.
    #[serde(default)]
    pub strict_images: bool,
}

fn default_hasura_service() -> String {
    "hasura".to_string()
}

fn default_hasura_cli() -> String {
    "hasura".to_string()
}

fn default_database() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HasuraConfig {
    /// Name of the service running the GraphQL engine.
    #[serde(default = "default_hasura_service")]
    pub service: String,
    #[serde(default = "default_hasura_cli")]
    pub cli: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// Overrides the endpoint derived from the running service.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub admin_secret: Option<String>,
}

impl Default for HasuraConfig {
    fn default() -> Self {
        Self {
            service: default_hasura_service(),
            cli: default_hasura_cli(),
            database: default_database(),
            endpoint: None,
            admin_secret: None,
        }
    }
}

fn default_version() -> String {
    "latest".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Image repository. Services without one are not container-managed.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    /// Host port the service is reachable on.
    #[serde(default)]
    pub port: Option<u16>,
    /// Port inside the container; defaults to `port`.
    #[serde(default)]
    pub container_port: Option<u16>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub health_endpoint: Option<String>,
    #[serde(default)]
    pub admin_secret: Option<String>,
    /// Port adopted on reconciliation instead of inspecting published ports.
    #[serde(default)]
    pub pinned_port: Option<u16>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub command: Option<StringOrList>,
    #[serde(default)]
    pub entrypoint: Option<StringOrList>,
    #[serde(default)]
    pub storage: Option<StorageBackend>,
    #[serde(default)]
    pub antivirus: Option<AntivirusBackend>,
}

/// A value that can be either a single string or a list of strings.
/// When given a string, it is kept as a single-element list.
#[derive(Debug, Clone, PartialEq)]
pub struct StringOrList(pub Vec<String>);

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StringOrList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringOrListVisitor;

        impl<'de> de::Visitor<'de> for StringOrListVisitor {
            type Value = StringOrList;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or a list of strings")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<StringOrList, E> {
                Ok(StringOrList(vec![value.to_string()]))
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<StringOrList, A::Error> {
                let mut values = Vec::new();
                while let Some(value) = seq.next_element::<String>()? {
                    values.push(value);
                }
                Ok(StringOrList(values))
            }
        }

        deserializer.deserialize_any(StringOrListVisitor)
    }
}
