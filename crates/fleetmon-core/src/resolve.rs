// ── Device state resolution ──
//
// Several scrape targets (ports) can report for one device IP. Resolution
// folds every instance of an IP into one snapshot. The fold is a max over
// a total order, so the result does not depend on sample order:
//
//   1. an abnormal reading outranks a normal one
//   2. then the larger raw code wins
//   3. then the later timestamp wins
//   4. then the lexically greater instance label wins
//
// An instance without a reading for the category ranks below any instance
// with one.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::classify::CategoryClassifier;
use crate::model::{Category, DeviceSnapshot, MetricKind, PerCategory, Sample, UNKNOWN_STATUS};
use crate::parse::resolve_ip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reading {
    code: i64,
    at: DateTime<Utc>,
}

/// Sort key of a reading; `None` (no reading) sorts lowest.
type Rank = Option<(bool, i64, DateTime<Utc>)>;

fn rank(category: Category, reading: Option<Reading>) -> Rank {
    reading.map(|r| (CategoryClassifier::is_abnormal(category, r.code), r.code, r.at))
}

/// Keep whichever of `slot` and `candidate` ranks higher.
fn keep_best(category: Category, slot: &mut Option<Reading>, candidate: Reading) {
    if rank(category, Some(candidate)) > rank(category, *slot) {
        *slot = Some(candidate);
    }
}

/// Keep the most recent gauge value.
fn keep_latest<T: Copy>(slot: &mut Option<(T, DateTime<Utc>)>, value: T, at: DateTime<Utc>) {
    if slot.is_none_or(|(_, prev)| at > prev) {
        *slot = Some((value, at));
    }
}

/// Everything one scrape target reported in this pass.
#[derive(Debug)]
struct InstanceObservation<'a> {
    instance: &'a str,
    status: PerCategory<Option<Reading>>,
    online: Option<bool>,
    cpu: Option<(f64, DateTime<Utc>)>,
    memory: Option<(f64, DateTime<Utc>)>,
    ocr: Option<(i64, DateTime<Utc>)>,
    latest: DateTime<Utc>,
}

impl<'a> InstanceObservation<'a> {
    fn new(instance: &'a str, first_seen: DateTime<Utc>) -> Self {
        Self {
            instance,
            status: PerCategory::default(),
            online: None,
            cpu: None,
            memory: None,
            ocr: None,
            latest: first_seen,
        }
    }

    fn record(&mut self, sample: &Sample) {
        let at = sample.timestamp;
        self.latest = self.latest.max(at);

        match sample.kind {
            MetricKind::Status(category) => {
                if let Some(code) = sample.value.as_code() {
                    keep_best(category, self.status.get_mut(category), Reading { code, at });
                }
            }
            MetricKind::Liveness => {
                let up = sample.value.as_code() == Some(1);
                self.online = Some(self.online.unwrap_or(false) || up);
            }
            MetricKind::CpuUsage => keep_latest(&mut self.cpu, sample.value.as_f64(), at),
            MetricKind::MemoryUsage => keep_latest(&mut self.memory, sample.value.as_f64(), at),
            MetricKind::OcrSeconds => {
                if let Some(secs) = sample.value.as_code() {
                    keep_latest(&mut self.ocr, secs, at);
                }
            }
        }
    }

    fn rank(&self, category: Category) -> (Rank, &'a str) {
        (rank(category, *self.status.get(category)), self.instance)
    }
}

/// Collapses per-instance samples into one [`DeviceSnapshot`] per IP.
#[derive(Debug, Clone, Default)]
pub struct DeviceStateResolver {
    classifier: Arc<CategoryClassifier>,
}

impl DeviceStateResolver {
    pub fn new(classifier: Arc<CategoryClassifier>) -> Self {
        Self { classifier }
    }

    /// Resolve `samples` into snapshots, ordered by IP.
    pub fn resolve(&self, samples: &[Sample]) -> Vec<DeviceSnapshot> {
        let mut by_instance: BTreeMap<&str, InstanceObservation<'_>> = BTreeMap::new();
        for sample in samples {
            by_instance
                .entry(sample.instance.as_str())
                .or_insert_with(|| InstanceObservation::new(&sample.instance, sample.timestamp))
                .record(sample);
        }

        let mut by_ip: BTreeMap<&str, Vec<InstanceObservation<'_>>> = BTreeMap::new();
        for (instance, observation) in by_instance {
            by_ip.entry(resolve_ip(instance)).or_default().push(observation);
        }

        by_ip
            .into_iter()
            .filter_map(|(ip, observations)| self.collapse(ip, &observations))
            .collect()
    }

    fn collapse(&self, ip: &str, observations: &[InstanceObservation<'_>]) -> Option<DeviceSnapshot> {
        let winner = observations
            .iter()
            .max_by_key(|o| o.rank(Category::Camera))?;

        // Auxiliary categories are resolved on their own values so an
        // abnormal reading on a non-winning port still surfaces.
        let values = PerCategory::from_fn(|category| {
            observations
                .iter()
                .max_by_key(|o| o.rank(category))
                .and_then(|o| *o.status.get(category))
                .map(|r| r.code)
        });

        let camera = winner.status.camera;
        let status = camera.map_or_else(
            || UNKNOWN_STATUS.to_owned(),
            |r| self.classifier.classify(Category::Camera, r.code).label,
        );

        Some(DeviceSnapshot {
            ip: ip.to_owned(),
            instance: winner.instance.to_owned(),
            is_online: winner.online.unwrap_or(false),
            values,
            cpu_usage: winner.cpu.map(|(v, _)| v),
            memory_usage: winner.memory.map(|(v, _)| v),
            ocr_value_seconds: winner.ocr.map(|(v, _)| v),
            status,
            observed_at: camera.map_or(winner.latest, |r| r.at),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::SampleValue;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn code(instance: &str, category: Category, value: i64, secs: i64) -> Sample {
        Sample {
            instance: instance.to_owned(),
            kind: MetricKind::Status(category),
            value: SampleValue::Integer(value),
            timestamp: at(secs),
        }
    }

    fn gauge(instance: &str, kind: MetricKind, value: SampleValue, secs: i64) -> Sample {
        Sample {
            instance: instance.to_owned(),
            kind,
            value,
            timestamp: at(secs),
        }
    }

    fn resolver() -> DeviceStateResolver {
        DeviceStateResolver::default()
    }

    #[test]
    fn abnormal_camera_beats_newer_normal() {
        let samples = [
            code("10.0.0.5:5000", Category::Camera, 0, 10),
            code("10.0.0.5:5001", Category::Camera, 2, 5),
        ];
        let snapshots = resolver().resolve(&samples);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].instance, "10.0.0.5:5001");
        assert_eq!(snapshots[0].value(Category::Camera), Some(2));
        assert_eq!(snapshots[0].status, "no signal");
        assert_eq!(snapshots[0].observed_at, at(5));
    }

    #[test]
    fn equal_codes_prefer_later_timestamp() {
        let samples = [
            code("10.0.0.5:5000", Category::Camera, 3, 5),
            code("10.0.0.5:5001", Category::Camera, 3, 20),
        ];
        let snapshot = &resolver().resolve(&samples)[0];
        assert_eq!(snapshot.instance, "10.0.0.5:5001");
        assert_eq!(snapshot.observed_at, at(20));
    }

    #[test]
    fn larger_code_wins_among_abnormal() {
        let samples = [
            code("10.0.0.5:5000", Category::Camera, 4, 1),
            code("10.0.0.5:5001", Category::Camera, 1, 9),
        ];
        assert_eq!(resolver().resolve(&samples)[0].instance, "10.0.0.5:5000");
    }

    #[test]
    fn result_is_order_independent() {
        let mut samples = vec![
            code("10.0.0.5:5000", Category::Camera, 2, 7),
            code("10.0.0.5:5001", Category::Camera, 2, 7),
            code("10.0.0.5:5002", Category::Camera, 0, 9),
            gauge("10.0.0.5:5001", MetricKind::Liveness, SampleValue::Integer(1), 7),
        ];
        let forward = resolver().resolve(&samples);
        samples.reverse();
        let backward = resolver().resolve(&samples);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].instance, "10.0.0.5:5001");
        assert!(forward[0].is_online);
    }

    #[test]
    fn liveness_and_usage_follow_camera_winner() {
        let samples = [
            code("10.0.0.5:5000", Category::Camera, 0, 10),
            gauge("10.0.0.5:5000", MetricKind::Liveness, SampleValue::Integer(1), 10),
            gauge("10.0.0.5:5000", MetricKind::CpuUsage, SampleValue::Float(90.0), 10),
            code("10.0.0.5:5001", Category::Camera, 1, 10),
            gauge("10.0.0.5:5001", MetricKind::CpuUsage, SampleValue::Float(12.5), 10),
        ];
        let snapshot = &resolver().resolve(&samples)[0];
        assert_eq!(snapshot.instance, "10.0.0.5:5001");
        assert!(!snapshot.is_online, "winner reported no liveness");
        assert_eq!(snapshot.cpu_usage, Some(12.5));
        assert_eq!(snapshot.memory_usage, None);
    }

    #[test]
    fn auxiliary_categories_resolve_independently() {
        let samples = [
            code("10.0.0.5:5000", Category::Camera, 2, 10),
            code("10.0.0.5:5000", Category::Hdmi, 0, 10),
            code("10.0.0.5:5001", Category::Camera, 0, 10),
            code("10.0.0.5:5001", Category::Hdmi, 2, 10),
            code("10.0.0.5:5001", Category::Dc, 1, 10),
        ];
        let snapshot = &resolver().resolve(&samples)[0];
        assert_eq!(snapshot.instance, "10.0.0.5:5000");
        assert_eq!(snapshot.value(Category::Hdmi), Some(2));
        assert_eq!(snapshot.value(Category::Dc), Some(1));
        assert_eq!(snapshot.value(Category::Ac), None);
    }

    #[test]
    fn device_without_camera_reports_unknown_status() {
        let samples = [
            gauge("10.0.0.9:9100", MetricKind::Liveness, SampleValue::Integer(0), 3),
            gauge("10.0.0.9:9100", MetricKind::MemoryUsage, SampleValue::Float(40.0), 8),
        ];
        let snapshot = &resolver().resolve(&samples)[0];
        assert_eq!(snapshot.ip, "10.0.0.9");
        assert_eq!(snapshot.status, UNKNOWN_STATUS);
        assert!(!snapshot.is_online);
        assert_eq!(snapshot.observed_at, at(8));
    }

    #[test]
    fn distinct_ips_stay_separate() {
        let samples = [
            code("10.0.0.6:5000", Category::Camera, 0, 1),
            code("10.0.0.5:5000", Category::Camera, 0, 1),
        ];
        let ips: Vec<String> = resolver()
            .resolve(&samples)
            .into_iter()
            .map(|s| s.ip)
            .collect();
        assert_eq!(ips, ["10.0.0.5", "10.0.0.6"]);
    }
}
