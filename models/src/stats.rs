use prometheus::{Error as PrometheusError, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use std::collections::HashMap;

use crate::gateway::Dispatch;

pub struct ResourceCounters {
    pub guilds: IntGauge,
    pub members: IntGauge,
}

pub struct GatewayStats {
    pub registry: Registry,
    pub dispatches: IntCounterVec,
    pub resource_counts: ResourceCounters,
    pub decode_failures: IntCounter,
    pub inconsistent_references: IntCounter,
}

impl GatewayStats {
    pub fn new(cluster_id: u64) -> Result<Self, PrometheusError> {
        let dispatches = IntCounterVec::new(
            Opts::new("gateway_dispatches", "Dispatches received from the gateway"),
            &["event"],
        )?;
        let resource_counter = IntGaugeVec::new(
            Opts::new("resource_counts", "Counts of cached resources"),
            &["count"],
        )?;
        let decode_failures = IntCounter::with_opts(Opts::new(
            "decode_failures",
            "Envelopes dropped because their payload could not be decoded",
        ))?;
        let inconsistent_references = IntCounter::with_opts(Opts::new(
            "inconsistent_references",
            "Dispatches skipped because they referenced entities missing from the cache",
        ))?;

        let mut static_labels = HashMap::new();
        static_labels.insert(String::from("cluster"), cluster_id.to_string());
        let registry = Registry::new_custom(Some("strata".into()), Some(static_labels))?;

        registry.register(Box::new(dispatches.clone()))?;
        registry.register(Box::new(resource_counter.clone()))?;
        registry.register(Box::new(decode_failures.clone()))?;
        registry.register(Box::new(inconsistent_references.clone()))?;

        Ok(GatewayStats {
            registry,
            dispatches,
            resource_counts: ResourceCounters {
                guilds: resource_counter.get_metric_with_label_values(&["Guilds"])?,
                members: resource_counter.get_metric_with_label_values(&["Members"])?,
            },
            decode_failures,
            inconsistent_references,
        })
    }

    pub fn update(&self, dispatch: &Dispatch) {
        // Unknown names are bucketed together to keep label cardinality bounded
        let label = if dispatch.is_unknown() {
            "UNKNOWN"
        } else {
            dispatch.name()
        };
        self.dispatches.with_label_values(&[label]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gateway::UnknownDispatch, guild::GuildDelete, id::GuildId};

    #[test]
    fn counts_dispatches_by_name() {
        let stats = GatewayStats::new(0).unwrap();
        let delete = Dispatch::GuildDelete(GuildDelete {
            id: GuildId::new(1),
            unavailable: false,
        });
        stats.update(&delete);
        stats.update(&delete);
        stats.update(&Dispatch::Unknown(UnknownDispatch {
            name: String::from("SOMETHING_NEW"),
            payload: serde_json::Value::Null,
        }));

        assert_eq!(stats.dispatches.with_label_values(&["GUILD_DELETE"]).get(), 2);
        assert_eq!(stats.dispatches.with_label_values(&["UNKNOWN"]).get(), 1);
    }
}
