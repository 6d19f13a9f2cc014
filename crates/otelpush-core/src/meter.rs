//! Meter provider and meters.
//!
//! The provider is constructed explicitly and passed by reference (or cheap
//! clone) to whoever records or collects; there is no process-global
//! "current provider".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{MetricsError, Result};
use crate::instrument::{
    validate_name, Counter, InstrumentDescriptor, InstrumentEntry, InstrumentKind, UpDownCounter,
};
use crate::resource::ResourceIdentity;
use crate::snapshot::Snapshot;
use crate::store::AggregationStore;

#[derive(Clone)]
pub struct MeterProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    store: Arc<AggregationStore>,
    meters: DashMap<String, Meter>,
    next_instrument_id: Arc<AtomicU64>,
}

impl MeterProvider {
    pub fn builder() -> MeterProviderBuilder {
        MeterProviderBuilder::default()
    }

    /// Meter for an instrumentation scope. Idempotent per name.
    pub fn meter(&self, scope: &str) -> Meter {
        self.inner
            .meters
            .entry(scope.to_string())
            .or_insert_with(|| Meter {
                scope: Arc::from(scope),
                store: Arc::clone(&self.inner.store),
                instruments: Arc::new(DashMap::new()),
                next_instrument_id: Arc::clone(&self.inner.next_instrument_id),
            })
            .value()
            .clone()
    }

    pub fn resource(&self) -> &Arc<ResourceIdentity> {
        self.inner.store.resource()
    }

    pub fn store(&self) -> &Arc<AggregationStore> {
        &self.inner.store
    }

    /// Cumulative snapshot of everything recorded so far.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.store.snapshot()
    }
}

#[derive(Default)]
pub struct MeterProviderBuilder {
    resource: Option<Arc<ResourceIdentity>>,
    cardinality_limit: Option<usize>,
}

impl MeterProviderBuilder {
    pub fn with_resource(mut self, resource: Arc<ResourceIdentity>) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Bound the number of series per instrument. Unset means unbounded.
    pub fn with_cardinality_limit(mut self, limit: usize) -> Self {
        self.cardinality_limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<MeterProvider> {
        if let Some(limit) = self.cardinality_limit {
            if limit < 2 {
                return Err(MetricsError::Config(format!(
                    "cardinality limit must be at least 2, got {limit}"
                )));
            }
        }
        let resource = self
            .resource
            .unwrap_or_else(|| Arc::new(ResourceIdentity::default()));
        Ok(MeterProvider {
            inner: Arc::new(ProviderInner {
                store: Arc::new(AggregationStore::new(resource, self.cardinality_limit)),
                meters: DashMap::new(),
                next_instrument_id: Arc::new(AtomicU64::new(1)),
            }),
        })
    }
}

/// Instrument factory for one scope. Instrument names are unique per meter.
#[derive(Clone)]
pub struct Meter {
    scope: Arc<str>,
    store: Arc<AggregationStore>,
    instruments: Arc<DashMap<String, Arc<InstrumentEntry>>>,
    next_instrument_id: Arc<AtomicU64>,
}

impl Meter {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn create_counter(&self, name: &str, description: &str, unit: &str) -> Result<Counter> {
        let desc = InstrumentDescriptor::new(name, InstrumentKind::Counter, description, unit);
        let entry = self.register(desc)?;
        Ok(Counter::new(entry, Arc::clone(&self.store)))
    }

    pub fn create_up_down_counter(
        &self,
        name: &str,
        description: &str,
        unit: &str,
    ) -> Result<UpDownCounter> {
        let desc = InstrumentDescriptor::new(name, InstrumentKind::UpDownCounter, description, unit);
        let entry = self.register(desc)?;
        Ok(UpDownCounter::new(entry, Arc::clone(&self.store)))
    }

    fn register(&self, desc: InstrumentDescriptor) -> Result<Arc<InstrumentEntry>> {
        validate_name(&desc.name)?;

        match self.instruments.entry(desc.name.clone()) {
            Entry::Occupied(o) => {
                let existing = o.get();
                let existing_desc = existing.descriptor();
                if existing_desc.kind != desc.kind {
                    return Err(MetricsError::DuplicateInstrument {
                        name: desc.name,
                        existing: existing_desc.kind,
                        requested: desc.kind,
                    });
                }
                if **existing_desc != desc {
                    tracing::warn!(
                        scope = %self.scope,
                        instrument = %desc.name,
                        "instrument re-registered with a different description or unit, keeping the first"
                    );
                }
                Ok(Arc::clone(existing))
            }
            Entry::Vacant(v) => {
                let id = self.next_instrument_id.fetch_add(1, Ordering::Relaxed);
                let entry = Arc::new(InstrumentEntry::new(id, Arc::clone(&self.scope), desc));
                v.insert(Arc::clone(&entry));
                Ok(entry)
            }
        }
    }
}
