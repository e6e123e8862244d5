//! Per-type encode and decode plan cache.
//!
//! Resolving a record's fields (labels, exclusions, readers and writers) is
//! done once per type and direction, then shared. The cache is keyed by the
//! [`TypeId`] of the plan and may be used from any number of threads; two
//! threads racing on the same type may both build a plan, but only the first
//! one inserted is kept and every caller gets an equivalent plan.

use crate::de::DecodePlan;
use crate::field::Record;
use crate::ser::EncodePlan;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

type ErasedPlan = Arc<dyn Any + Send + Sync>;

/// A concurrent map from record type to its [`EncodePlan`] and
/// [`DecodePlan`].
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, PlanCache};
///
/// struct Ping { seq: u32 }
/// impl_record!(Ping { seq });
///
/// let cache = PlanCache::new();
/// assert!(!cache.contains::<Ping>());
///
/// let first = cache.get_or_build::<Ping>();
/// let again = cache.get_or_build::<Ping>();
/// assert!(std::sync::Arc::ptr_eq(&first, &again));
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Default)]
pub struct PlanCache {
    plans: RwLock<HashMap<TypeId, ErasedPlan>>,
}

impl PlanCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by [`Encoder::new`](crate::Encoder::new)
    /// and the free functions.
    pub fn global() -> &'static Arc<PlanCache> {
        static GLOBAL: OnceLock<Arc<PlanCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(PlanCache::new()))
    }

    /// Returns the encode plan for `R`, building and storing it on first use.
    pub fn get_or_build<R: Record>(&self) -> Arc<EncodePlan<R>> {
        self.get_or_insert_with(EncodePlan::<R>::build)
    }

    /// Returns the decode plan for `R`, building and storing it on first use.
    pub fn decode_plan<R: Record>(&self) -> Arc<DecodePlan<R>> {
        self.get_or_insert_with(DecodePlan::<R>::build)
    }

    fn get_or_insert_with<P, F>(&self, build: F) -> Arc<P>
    where
        P: Any + Send + Sync,
        F: FnOnce() -> P,
    {
        let id = TypeId::of::<P>();
        if let Some(plan) = self.plans.read().get(&id).cloned() {
            if let Ok(plan) = plan.downcast::<P>() {
                trace!(plan = std::any::type_name::<P>(), "plan cache hit");
                return plan;
            }
        }

        // built without holding the lock; field resolution runs user code
        let built = Arc::new(build());
        debug!(plan = std::any::type_name::<P>(), "built plan");

        let stored = Arc::clone(
            self.plans
                .write()
                .entry(id)
                .or_insert_with(|| Arc::clone(&built) as ErasedPlan),
        );
        stored.downcast::<P>().unwrap_or(built)
    }

    /// Whether an encode plan for `R` has been stored.
    #[must_use]
    pub fn contains<R: Record>(&self) -> bool {
        self.plans.read().contains_key(&TypeId::of::<EncodePlan<R>>())
    }

    /// Whether a decode plan for `R` has been stored.
    #[must_use]
    pub fn contains_decode<R: Record>(&self) -> bool {
        self.plans.read().contains_key(&TypeId::of::<DecodePlan<R>>())
    }

    /// Number of stored plans, counting each direction of each type.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache").field("len", &self.len()).finish()
    }
}
