//! Resource identity attached to every exported snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SERVICE_NAME: &str = "service.name";
pub const SERVICE_VERSION: &str = "service.version";
pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";
pub const TELEMETRY_SDK_NAME: &str = "telemetry.sdk.name";
pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";
pub const TELEMETRY_SDK_VERSION: &str = "telemetry.sdk.version";

const DEFAULT_SERVICE_NAME: &str = "unknown_service";

/// Immutable string key/value record. Built once at startup and shared by
/// `Arc` with every snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    attrs: BTreeMap<String, String>,
}

impl ResourceIdentity {
    pub fn builder() -> ResourceIdentityBuilder {
        ResourceIdentityBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn service_name(&self) -> &str {
        self.get(SERVICE_NAME).unwrap_or(DEFAULT_SERVICE_NAME)
    }

    /// Pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl Default for ResourceIdentity {
    fn default() -> Self {
        Self::builder().build_owned()
    }
}

#[derive(Debug, Default)]
pub struct ResourceIdentityBuilder {
    attrs: BTreeMap<String, String>,
}

impl ResourceIdentityBuilder {
    pub fn service_name(self, v: impl Into<String>) -> Self {
        self.attribute(SERVICE_NAME, v)
    }

    pub fn service_version(self, v: impl Into<String>) -> Self {
        self.attribute(SERVICE_VERSION, v)
    }

    pub fn instance_id(self, v: impl Into<String>) -> Self {
        self.attribute(SERVICE_INSTANCE_ID, v)
    }

    /// Arbitrary attribute. Later writes to the same key win.
    pub fn attribute(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.attrs.insert(k.into(), v.into());
        self
    }

    pub fn build(self) -> Arc<ResourceIdentity> {
        Arc::new(self.build_owned())
    }

    fn build_owned(mut self) -> ResourceIdentity {
        self.attrs
            .entry(SERVICE_NAME.to_string())
            .or_insert_with(|| DEFAULT_SERVICE_NAME.to_string());
        self.attrs
            .entry(SERVICE_INSTANCE_ID.to_string())
            .or_insert_with(default_instance_id);
        self.attrs
            .insert(TELEMETRY_SDK_NAME.to_string(), "otelpush".to_string());
        self.attrs
            .insert(TELEMETRY_SDK_LANGUAGE.to_string(), "rust".to_string());
        self.attrs.insert(
            TELEMETRY_SDK_VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        ResourceIdentity { attrs: self.attrs }
    }
}

/// `<pid>-<start nanos, hex>`: unique enough per host without extra deps.
fn default_instance_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{}-{:x}", std::process::id(), nanos)
}
