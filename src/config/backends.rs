//! Pluggable backends of the storage service.
//!
//! The storage container is told which content store and which antivirus
//! scanner to use through its environment. Each backend is chosen once from
//! config and only contributes variables; nothing is dispatched at runtime.

use serde::Deserialize;

/// Something that turns into container environment variables.
pub trait BackendEnv {
    fn container_env(&self) -> Vec<(String, String)>;
}

fn default_region() -> String {
    "no-region".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackend {
    Dummy,
    S3 {
        endpoint: String,
        bucket: String,
        #[serde(default = "default_region")]
        region: String,
        #[serde(default)]
        access_key: Option<String>,
        #[serde(default)]
        secret_key: Option<String>,
        #[serde(default)]
        root_folder: Option<String>,
        #[serde(default)]
        disable_https: bool,
    },
}

impl BackendEnv for StorageBackend {
    fn container_env(&self) -> Vec<(String, String)> {
        match self {
            StorageBackend::Dummy => Vec::new(),
            StorageBackend::S3 {
                endpoint,
                bucket,
                region,
                access_key,
                secret_key,
                root_folder,
                disable_https,
            } => {
                let mut env = vec![
                    ("S3_ENDPOINT".to_string(), endpoint.clone()),
                    ("S3_BUCKET".to_string(), bucket.clone()),
                    ("S3_REGION".to_string(), region.clone()),
                ];
                if let Some(key) = access_key {
                    env.push(("S3_ACCESS_KEY".to_string(), key.clone()));
                }
                if let Some(secret) = secret_key {
                    env.push(("S3_SECRET_KEY".to_string(), secret.clone()));
                }
                if let Some(root) = root_folder {
                    env.push(("S3_ROOT_FOLDER".to_string(), root.clone()));
                }
                if *disable_https {
                    env.push(("S3_DISABLE_HTTPS".to_string(), "true".to_string()));
                }
                env
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AntivirusBackend {
    Dummy,
    #[serde(rename = "clamav")]
    ClamAv { server: String },
}

impl BackendEnv for AntivirusBackend {
    fn container_env(&self) -> Vec<(String, String)> {
        match self {
            AntivirusBackend::Dummy => Vec::new(),
            AntivirusBackend::ClamAv { server } => {
                vec![("CLAMAV_SERVER".to_string(), server.clone())]
            }
        }
    }
}
