// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Lifecycle Engine Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) holding the
// engine's timing and lookup settings:
// - requeue delays for phase retries and cross-entity waits
// - deployment health timeout
// - fallback namespace for task and evaluation definitions
// - naming-collision retry bound

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const API_VERSION: &str = "lifecycle.keptn.sh/v1";
pub const KIND: &str = "LifecycleConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfigManifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: LifecycleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Engine settings (content under spec:)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Delay before a phase that has not finished, or failed to reconcile, is retried.
    #[serde(default = "default_phase_requeue", with = "humantime_serde")]
    pub phase_requeue_interval: Duration,

    /// Delay before a workload re-checks its application's pre-deployment evaluations.
    #[serde(default = "default_dependency_requeue", with = "humantime_serde")]
    pub dependency_requeue_interval: Duration,

    /// How long a deployment may stay unhealthy before the phase fails.
    #[serde(default = "default_observability_timeout", with = "humantime_serde")]
    pub observability_timeout: Duration,

    /// Namespace searched for definitions missing from the entity's namespace.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    #[serde(default = "default_max_create_attempts")]
    pub max_create_attempts: u32,

    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_phase_requeue() -> Duration {
    Duration::from_secs(5)
}

fn default_dependency_requeue() -> Duration {
    Duration::from_secs(10)
}

fn default_observability_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_namespace() -> String {
    "keptn-lifecycle-toolkit-system".to_string()
}

fn default_max_create_attempts() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            phase_requeue_interval: default_phase_requeue(),
            dependency_requeue_interval: default_dependency_requeue(),
            observability_timeout: default_observability_timeout(),
            default_namespace: default_namespace(),
            max_create_attempts: default_max_create_attempts(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LifecycleConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "lifecycle-engine".to_string(),
                labels: None,
            },
            spec: LifecycleConfig::default(),
        }
    }
}

impl LifecycleConfigManifest {
    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let manifest: Self = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config at {:?}: {}", path, e))?;
        let mut manifest = Self::from_yaml_str(&content)?;
        manifest.apply_env_overrides();
        tracing::info!(path = ?path, "Loaded lifecycle configuration");
        Ok(manifest)
    }

    /// Environment overrides for container deployments
    pub fn apply_env_overrides(&mut self) {
        if let Ok(namespace) = std::env::var("KEPTN_DEFAULT_NAMESPACE") {
            if !namespace.is_empty() {
                tracing::info!(namespace = %namespace, "Environment override: KEPTN_DEFAULT_NAMESPACE");
                self.spec.default_namespace = namespace;
            }
        }

        if let Ok(val) = std::env::var("KEPTN_OBSERVABILITY_TIMEOUT") {
            match humantime_serde::re::humantime::parse_duration(&val) {
                Ok(timeout) => {
                    tracing::info!(timeout = %val, "Environment override: KEPTN_OBSERVABILITY_TIMEOUT");
                    self.spec.observability_timeout = timeout;
                }
                Err(e) => {
                    tracing::warn!(
                        "Invalid value for KEPTN_OBSERVABILITY_TIMEOUT: '{}' ({}). Ignoring.",
                        val,
                        e
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }
        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }
        self.spec.validate()
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_create_attempts == 0 {
            anyhow::bail!("spec.max_create_attempts must be at least 1");
        }
        if self.phase_requeue_interval.is_zero() || self.dependency_requeue_interval.is_zero() {
            anyhow::bail!("requeue intervals must be greater than zero");
        }
        if self.default_namespace.is_empty() {
            anyhow::bail!("spec.default_namespace cannot be empty");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("spec.log_level cannot be empty");
        }
        Ok(())
    }
}
