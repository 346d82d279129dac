use std::env;

use crate::error::GatewayError;

pub const QUEUE_CAPACITY_VAR: &str = "STRATA_QUEUE_CAPACITY";
pub const CLUSTER_ID_VAR: &str = "STRATA_CLUSTER_ID";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GatewayConfig {
    /// How many envelopes may wait for the apply loop before `send` waits.
    pub queue_capacity: usize,
    pub cluster_id: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            cluster_id: 0,
        }
    }
}

impl GatewayConfig {
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn cluster_id(mut self, cluster_id: u64) -> Self {
        self.cluster_id = cluster_id;
        self
    }

    /// Reads the configuration from the environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GatewayError> {
        let mut config = Self::default();
        if let Some(capacity) = lookup(QUEUE_CAPACITY_VAR) {
            config.queue_capacity = capacity.trim().parse().map_err(|_| {
                GatewayError::configuration(format!(
                    "{} must be a positive number, got {:?}",
                    QUEUE_CAPACITY_VAR, capacity
                ))
            })?;
        }
        // Accepts pod style names such as `strata-3`
        if let Some(cluster) = lookup(CLUSTER_ID_VAR) {
            config.cluster_id = cluster
                .trim()
                .rsplit('-')
                .next()
                .and_then(|id| id.parse().ok())
                .ok_or_else(|| {
                    GatewayError::configuration(format!(
                        "{} must end in a number, got {:?}",
                        CLUSTER_ID_VAR, cluster
                    ))
                })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.queue_capacity == 0 {
            return Err(GatewayError::configuration(
                "queue capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn reads_variables() {
        let config = GatewayConfig::from_lookup(lookup(&[
            (QUEUE_CAPACITY_VAR, "16"),
            (CLUSTER_ID_VAR, "strata-3"),
        ]))
        .unwrap();
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.cluster_id, 3);

        let config = GatewayConfig::from_lookup(lookup(&[(CLUSTER_ID_VAR, "7")])).unwrap();
        assert_eq!(config.cluster_id, 7);
    }

    #[test]
    fn rejects_bad_values() {
        for vars in [
            [(QUEUE_CAPACITY_VAR, "lots")],
            [(QUEUE_CAPACITY_VAR, "0")],
            [(CLUSTER_ID_VAR, "strata-")],
        ] {
            let err = GatewayConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::Configuration);
        }
    }

    #[test]
    fn builder() {
        let config = GatewayConfig::default().queue_capacity(8).cluster_id(2);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.cluster_id, 2);
        assert!(GatewayConfig::default().queue_capacity(0).validate().is_err());
    }
}
