//! Broker configuration
//!
//! Names the topic and subscription the harness talks to and how it
//! authenticates to the broker. Read from the environment at startup and
//! validated before any client is built.

use serde::{Deserialize, Serialize};

use crate::client::{BrokerError, BrokerResult};

/// How the harness authenticates to the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BrokerAuth {
    /// Shared access key carried in a connection string
    SharedAccess {
        /// Full connection string, secret included
        #[serde(skip_serializing)]
        connection_string: String,
    },
    /// Managed identity against a fully qualified namespace
    ManagedIdentity {
        /// Broker namespace (without scheme or domain suffix)
        namespace: String,
    },
}

/// Broker settings for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Broker endpoint shown on the status page
    pub endpoint: String,
    /// Topic the harness produces to and consumes from
    pub topic: String,
    /// Subscription the harness consumes
    pub subscription: String,
    /// Authentication method
    pub auth: BrokerAuth,
}

impl BrokerSettings {
    /// Load settings from `BROKER_ENDPOINT`, `BROKER_TOPIC`,
    /// `BROKER_SUBSCRIPTION`, and either `BROKER_CONNECTION_STR` or
    /// `BROKER_NAMESPACE`.
    pub fn from_env() -> BrokerResult<Self> {
        let endpoint = std::env::var("BROKER_ENDPOINT").unwrap_or_default();
        let topic = std::env::var("BROKER_TOPIC")
            .map_err(|_| BrokerError::Config("BROKER_TOPIC is not set".to_string()))?;
        let subscription = std::env::var("BROKER_SUBSCRIPTION")
            .map_err(|_| BrokerError::Config("BROKER_SUBSCRIPTION is not set".to_string()))?;

        let auth = if let Ok(connection_string) = std::env::var("BROKER_CONNECTION_STR") {
            BrokerAuth::SharedAccess { connection_string }
        } else if let Ok(namespace) = std::env::var("BROKER_NAMESPACE") {
            BrokerAuth::ManagedIdentity { namespace }
        } else {
            return Err(BrokerError::Config(
                "Neither BROKER_CONNECTION_STR nor BROKER_NAMESPACE is set".to_string(),
            ));
        };

        Ok(Self {
            endpoint,
            topic,
            subscription,
            auth,
        })
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> BrokerResult<()> {
        if self.topic.trim().is_empty() {
            return Err(BrokerError::Config("topic must not be empty".to_string()));
        }
        if self.subscription.trim().is_empty() {
            return Err(BrokerError::Config(
                "subscription must not be empty".to_string(),
            ));
        }
        match &self.auth {
            BrokerAuth::SharedAccess { connection_string } if connection_string.trim().is_empty() => {
                Err(BrokerError::Config(
                    "Connection string required for shared access authentication".to_string(),
                ))
            }
            BrokerAuth::ManagedIdentity { namespace } if namespace.trim().is_empty() => {
                Err(BrokerError::Config(
                    "Namespace required for managed identity authentication".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Connection string with the shared access key masked, for display.
    pub fn redacted_connection(&self) -> Option<String> {
        match &self.auth {
            BrokerAuth::SharedAccess { connection_string } if connection_string.len() > 40 => {
                Some(format!(
                    "{}...{}",
                    &connection_string[..25],
                    &connection_string[connection_string.len() - 12..]
                ))
            }
            BrokerAuth::SharedAccess { .. } => Some("...".to_string()),
            BrokerAuth::ManagedIdentity { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(auth: BrokerAuth) -> BrokerSettings {
        BrokerSettings {
            endpoint: "sb://harness.servicebus.windows.net".to_string(),
            topic: "events".to_string(),
            subscription: "workers".to_string(),
            auth,
        }
    }

    #[test]
    fn test_validate_accepts_shared_access() {
        let settings = settings(BrokerAuth::SharedAccess {
            connection_string: "Endpoint=sb://harness.servicebus.windows.net/;SharedAccessKeyName=send;SharedAccessKey=abc123".to_string(),
        });
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_connection_string() {
        let settings = settings(BrokerAuth::SharedAccess {
            connection_string: "".to_string(),
        });
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Connection string required"));
    }

    #[test]
    fn test_validate_rejects_empty_namespace() {
        let settings = settings(BrokerAuth::ManagedIdentity {
            namespace: "  ".to_string(),
        });
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Namespace required"));
    }

    #[test]
    fn test_redacted_connection_masks_the_key() {
        let connection = "Endpoint=sb://harness.servicebus.windows.net/;SharedAccessKeyName=send;SharedAccessKey=secretsecretsecret";
        let settings = settings(BrokerAuth::SharedAccess {
            connection_string: connection.to_string(),
        });
        let redacted = settings.redacted_connection().unwrap();
        assert!(redacted.starts_with("Endpoint=sb://harness.ser"));
        assert!(redacted.contains("..."));
        assert!(!redacted.contains("secretsecretsecret"));
    }

    #[test]
    fn test_managed_identity_has_no_connection_to_redact() {
        let settings = settings(BrokerAuth::ManagedIdentity {
            namespace: "harness".to_string(),
        });
        assert!(settings.redacted_connection().is_none());
    }
}
