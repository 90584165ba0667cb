//! Field provider: the boundary between raw OS queries and the report.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::field::{panic_message, CategoryFields, FieldValue, Readings};
use super::{battery, cpu, display, firmware, gpu, identity, network, ram, sound, storage, system};
use super::Category;

/// Performs the raw probe for one category.
///
/// Implementations report whatever they managed to read; the provider takes care
/// of mapping it onto the declared schema.
pub trait HardwareSource: Send + Sync {
    fn probe(&self, category: Category) -> Readings;
}

/// Production source backed by sysinfo and platform files/tools.
///
/// Stateless: every probe opens its own handles, so concurrent probes are safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoSource;

impl HardwareSource for SysinfoSource {
    fn probe(&self, category: Category) -> Readings {
        match category {
            Category::System => system::probe(),
            Category::Cpu => cpu::probe(),
            Category::Gpu => gpu::probe(),
            Category::Ram => ram::probe(),
            Category::Disks => storage::probe(),
            Category::Network => network::probe(),
            Category::Bios => firmware::probe_bios(),
            Category::Motherboard => firmware::probe_motherboard(),
            Category::Sound => sound::probe(),
            Category::Battery => battery::probe(),
            Category::Display => display::probe(),
            Category::Identity => identity::probe(),
            // Filled in from benchmark runs, never probed.
            Category::Benchmark => Readings::new(),
        }
    }
}

/// Collects one category at a time and normalizes failures into placeholders.
#[derive(Clone)]
pub struct FieldProvider {
    source: Arc<dyn HardwareSource>,
}

impl FieldProvider {
    pub fn new(source: Arc<dyn HardwareSource>) -> Self {
        Self { source }
    }

    /// Collect every declared field of `category`.
    ///
    /// Never fails: a field whose query errored, panicked or was not reported
    /// becomes `FieldValue::Unavailable`, and fields the probe reported but the
    /// schema does not declare are dropped.
    pub fn collect(&self, category: Category) -> CategoryFields {
        let source = Arc::clone(&self.source);
        let mut readings =
            match panic::catch_unwind(AssertUnwindSafe(move || source.probe(category))) {
                Ok(readings) => readings,
                Err(payload) => {
                    tracing::warn!(
                        category = %category,
                        panic = %panic_message(payload.as_ref()),
                        "Hardware probe panicked, reporting every field as unavailable"
                    );
                    Readings::new()
                }
            };

        let fields = category
            .fields()
            .iter()
            .map(|&name| {
                let value = match readings.take(name) {
                    Some(Ok(value)) => value,
                    Some(Err(err)) => {
                        tracing::debug!(
                            category = %category,
                            field = name,
                            error = %err,
                            "Field unavailable"
                        );
                        FieldValue::Unavailable
                    }
                    None => FieldValue::Unavailable,
                };
                (name, value)
            })
            .collect();

        for extra in readings.leftover_names() {
            tracing::trace!(category = %category, field = extra, "Dropping undeclared field");
        }

        fields
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Source with fixed CPU readings whose usage sensor always fails.
    pub(crate) struct FakeSource;

    impl HardwareSource for FakeSource {
        fn probe(&self, category: Category) -> Readings {
            match category {
                Category::Cpu => Readings::new()
                    .read("name", || Ok("X"))
                    .read("cores", || Ok(4u32))
                    .read("threads", || Ok(8u32))
                    .read("frequency_mhz", || Ok(3200u64))
                    .read("usage_percent", || -> anyhow::Result<f64> {
                        anyhow::bail!("usage sensor offline")
                    }),
                Category::Ram => Readings::new()
                    .read("total_gb", || Ok(16.0))
                    .read("bogus_field", || Ok("ignored")),
                Category::Gpu => panic!("GPU driver crashed"),
                _ => Readings::new(),
            }
        }
    }

    #[test]
    fn failing_field_becomes_placeholder_while_siblings_survive() {
        let provider = FieldProvider::new(Arc::new(FakeSource));
        let cpu = provider.collect(Category::Cpu);

        let expected: CategoryFields = [
            ("name", FieldValue::Text("X".to_string())),
            ("cores", FieldValue::Integer(4)),
            ("threads", FieldValue::Integer(8)),
            ("frequency_mhz", FieldValue::Integer(3200)),
            ("usage_percent", FieldValue::Unavailable),
        ]
        .into_iter()
        .collect();
        assert_eq!(cpu, expected);
    }

    #[test]
    fn missing_fields_are_filled_and_extra_fields_dropped() {
        let provider = FieldProvider::new(Arc::new(FakeSource));
        let ram = provider.collect(Category::Ram);

        assert_eq!(ram.names().collect::<Vec<_>>(), Category::Ram.fields());
        assert_eq!(ram.get("total_gb"), Some(&FieldValue::Float(16.0)));
        assert_eq!(ram.get("swap_percent"), Some(&FieldValue::Unavailable));
        assert_eq!(ram.get("bogus_field"), None);
    }

    #[test]
    fn panicking_probe_yields_all_placeholders() {
        let provider = FieldProvider::new(Arc::new(FakeSource));
        let gpu = provider.collect(Category::Gpu);

        assert_eq!(gpu.len(), Category::Gpu.fields().len());
        assert!(gpu.iter().all(|(_, v)| *v == FieldValue::Unavailable));
    }

    #[test]
    fn benchmark_category_starts_as_placeholders() {
        let provider = FieldProvider::new(Arc::new(SysinfoSource));
        let bench = provider.collect(Category::Benchmark);

        assert_eq!(bench.names().collect::<Vec<_>>(), Category::Benchmark.fields());
        assert!(bench.iter().all(|(_, v)| !v.is_available()));
    }
}
