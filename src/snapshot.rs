//! Hardware snapshot and the aggregator that builds it.

use std::fmt;
use std::sync::Arc;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::hardware::{Category, CategoryFields, FieldProvider, HardwareSource};

/// Every category's fields at one point in time, in display order.
///
/// A snapshot is never mutated once built; merging benchmark results or
/// refreshing produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    categories: Vec<(Category, CategoryFields)>,
}

impl Snapshot {
    pub fn get(&self, category: Category) -> Option<&CategoryFields> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, fields)| fields)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryFields)> {
        self.categories.iter().map(|(c, fields)| (*c, fields))
    }

    /// Total number of (category, field) pairs.
    pub fn field_count(&self) -> usize {
        self.categories.iter().map(|(_, fields)| fields.len()).sum()
    }

    /// A copy of this snapshot with `category` replaced by `fields`.
    pub fn with_category(&self, category: Category, fields: CategoryFields) -> Snapshot {
        let mut categories = self.categories.clone();
        match categories.iter_mut().find(|(c, _)| *c == category) {
            Some(slot) => slot.1 = fields,
            None => categories.push((category, fields)),
        }
        Snapshot { categories }
    }
}

impl FromIterator<(Category, CategoryFields)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (Category, CategoryFields)>>(iter: I) -> Self {
        let mut snapshot = Snapshot {
            categories: Vec::new(),
        };
        for (category, fields) in iter {
            snapshot = snapshot.with_category(category, fields);
        }
        snapshot
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, fields) in &self.categories {
            map.serialize_entry(category, fields)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category names to fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut categories: Vec<(Category, CategoryFields)> = Vec::new();
                while let Some((category, fields)) =
                    access.next_entry::<Category, CategoryFields>()?
                {
                    if categories.iter().any(|(c, _)| *c == category) {
                        return Err(de::Error::custom(format!(
                            "duplicate category `{category}`"
                        )));
                    }
                    categories.push((category, fields));
                }
                Ok(Snapshot { categories })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

/// Builds complete snapshots by querying every category once.
#[derive(Clone)]
pub struct SnapshotAggregator {
    provider: FieldProvider,
}

impl SnapshotAggregator {
    pub fn new(source: Arc<dyn HardwareSource>) -> Self {
        Self {
            provider: FieldProvider::new(source),
        }
    }

    /// Query every category in display order. Never fails; unreadable fields
    /// are placeholders.
    pub fn build_snapshot(&self) -> Snapshot {
        let started = std::time::Instant::now();
        let categories = Category::ALL
            .into_iter()
            .map(|category| (category, self.provider.collect(category)))
            .collect();
        let snapshot = Snapshot { categories };

        let unavailable = snapshot
            .iter()
            .flat_map(|(_, fields)| fields.iter())
            .filter(|(_, value)| !value.is_available())
            .count();
        tracing::info!(
            fields = snapshot.field_count(),
            unavailable,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Hardware snapshot built"
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{FakeSource, FieldValue};

    fn fake_snapshot() -> Snapshot {
        SnapshotAggregator::new(Arc::new(FakeSource)).build_snapshot()
    }

    #[test]
    fn snapshot_covers_exactly_the_declared_schema() {
        let snapshot = fake_snapshot();

        assert_eq!(snapshot.iter().map(|(c, _)| c).collect::<Vec<_>>(), Category::ALL);
        for (category, fields) in snapshot.iter() {
            assert_eq!(fields.names().collect::<Vec<_>>(), category.fields());
        }
    }

    #[test]
    fn fake_cpu_fixture_survives_aggregation() {
        let snapshot = fake_snapshot();
        let cpu = snapshot.get(Category::Cpu).unwrap();

        assert_eq!(cpu.get("name"), Some(&FieldValue::Text("X".to_string())));
        assert_eq!(cpu.get("cores"), Some(&FieldValue::Integer(4)));
        assert_eq!(cpu.get("usage_percent"), Some(&FieldValue::Unavailable));
        // The panicking GPU probe does not affect other categories.
        assert!(snapshot
            .get(Category::Gpu)
            .unwrap()
            .iter()
            .all(|(_, v)| !v.is_available()));
    }

    #[test]
    fn json_round_trip_preserves_values_and_order() {
        let snapshot = fake_snapshot();
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back, snapshot);
        let first_key = json.lines().nth(1).unwrap().trim();
        assert!(first_key.starts_with("\"System\""), "got {first_key}");
    }

    #[test]
    fn with_category_leaves_the_original_untouched() {
        let snapshot = fake_snapshot();
        let bench: CategoryFields = [("cpu_elapsed_seconds", FieldValue::Float(0.5))]
            .into_iter()
            .collect();

        let merged = snapshot.with_category(Category::Benchmark, bench.clone());

        assert_eq!(merged.get(Category::Benchmark), Some(&bench));
        assert_ne!(snapshot.get(Category::Benchmark), Some(&bench));
        assert_eq!(merged.iter().count(), Category::ALL.len());
    }

    #[test]
    fn duplicate_categories_are_rejected() {
        let json = r#"{"CPU": {}, "CPU": {}}"#;
        assert!(serde_json::from_str::<Snapshot>(json).is_err());
    }
}
