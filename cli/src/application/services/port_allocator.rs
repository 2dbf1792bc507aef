//! Application service: port allocation.
//!
//! Must run while the caller holds the allocation lock: the scan here and the
//! registry insert that follows form one critical section.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::application::ports::RegistryStore;
use crate::domain::allocation::{PortRange, lowest_free_port};
use crate::domain::error::LifecycleError;

/// Return the lowest port in `range` not assigned to any registry row.
///
/// # Errors
///
/// Returns `LifecycleError::AllocationExhausted` when every port in the range
/// is taken, or the registry's error if it cannot be read.
pub async fn allocate(store: &impl RegistryStore, range: PortRange) -> Result<u16> {
    let used: BTreeSet<u16> = store.list_all().await?.iter().map(|a| a.port).collect();
    lowest_free_port(&used, range).ok_or_else(|| {
        LifecycleError::AllocationExhausted {
            base: range.base,
            max: range.max,
        }
        .into()
    })
}
