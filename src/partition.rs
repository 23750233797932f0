//! Partition planning and partition-aware data location
//!
//! A partition is a disjoint slice of a keyed dataset identified by an
//! index and a total count. The planner is a pure function; the locator
//! narrows a dataset to the rows one partition owns.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifies one partition out of a fixed total. Invariant: `index < count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub index: u32,
    pub count: u32,
}

/// Produce one descriptor per index in `[0, count)`, in index order.
pub fn plan(count: u32) -> Result<Vec<PartitionDescriptor>> {
    if count < 1 {
        return Err(Error::InvalidPartitionCount(count));
    }
    Ok((0..count)
        .map(|index| PartitionDescriptor { index, count })
        .collect())
}

/// Rows that can be assigned to a partition by a numeric key.
pub trait PartitionKey {
    fn partition_key(&self) -> u64;
}

/// Narrows a dataset to the rows owned by one partition.
///
/// Contract: over all indices in `[0, count)` the selected sets are
/// pairwise disjoint and their union is the full dataset.
pub trait PartitionLocator<T>: Send + Sync {
    fn select_partition<'a>(&self, items: &'a [T], partition: &PartitionDescriptor) -> Vec<&'a T>;
}

/// Deterministic modulo rule on the partition key.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyModuloLocator;

impl<T: PartitionKey> PartitionLocator<T> for KeyModuloLocator {
    fn select_partition<'a>(&self, items: &'a [T], partition: &PartitionDescriptor) -> Vec<&'a T> {
        items
            .iter()
            .filter(|item| item.partition_key() % u64::from(partition.count) == u64::from(partition.index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Keyed(u64);

    impl PartitionKey for Keyed {
        fn partition_key(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn plan_produces_one_descriptor_per_index() {
        for count in 1..=8 {
            let descriptors = plan(count).unwrap();
            assert_eq!(descriptors.len(), count as usize);
            let indices: HashSet<u32> = descriptors.iter().map(|d| d.index).collect();
            assert_eq!(indices, (0..count).collect());
            assert!(descriptors.iter().all(|d| d.count == count && d.index < d.count));
        }
    }

    #[test]
    fn plan_rejects_zero_partitions() {
        assert!(matches!(plan(0), Err(Error::InvalidPartitionCount(0))));
    }

    #[test]
    fn locator_partitions_are_disjoint_and_cover_dataset() {
        let items: Vec<Keyed> = (0..50).map(Keyed).collect();
        let locator = KeyModuloLocator;
        let mut seen = HashSet::new();

        for descriptor in plan(3).unwrap() {
            for item in locator.select_partition(&items, &descriptor) {
                assert!(seen.insert(item.0), "key {} owned by two partitions", item.0);
            }
        }
        assert_eq!(seen.len(), items.len());
    }
}
