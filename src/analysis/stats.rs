//! Speed distribution statistics
//!
//! Computes everything the text report shows from a slice of vehicle
//! records: percentile bounds, the binned distribution, clustering within the
//! normal range, the overall traffic pattern and the per-direction
//! comparison. Rendering lives in [`report`](super::report).
//!
//! # Binning
//!
//! The normal range `[p_low, p_high)` is split into `num_bins` equal-width
//! bins. Two outlier bins sit on either side:
//!
//! - below: `speed < p_low`
//! - above: `speed >= p_high`
//!
//! Percentiles use the nearest-rank-by-index rule: the value at index
//! `floor(n * p / 100)` of the ascending sort, clamped to the last element.

use crate::config::{AppConfig, MIN_REPORT_VEHICLES};
use crate::types::{Direction, VehicleRecord};

/// Share of all vehicles above the high percentile that counts as excessive
pub const EXCESSIVE_SPEEDING_SHARE: f64 = 0.05;

/// Parameters of a report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub percentile_low: f64,
    pub percentile_high: f64,
    pub num_bins: usize,
    pub rtl_correction_factor: f64,
    /// Percent of normal traffic in one half that counts as clustering
    pub clustering_threshold: f64,
    /// Percent difference in direction means worth calling out
    pub directional_difference: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ReportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            percentile_low: config.analysis.percentile_low,
            percentile_high: config.analysis.percentile_high,
            num_bins: config.analysis.normal_range_bins.max(1),
            rtl_correction_factor: config.perspective.rtl_correction_factor,
            clustering_threshold: config.thresholds.clustering_threshold,
            directional_difference: config.thresholds.directional_difference,
        }
    }
}

/// Which part of the distribution a bin covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinKind {
    BelowRange,
    /// 1-based index within the normal range
    Normal(usize),
    AboveRange,
}

/// One bin of the distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBin {
    pub kind: BinKind,
    /// Inclusive lower edge (unused for the below-range bin)
    pub low: f64,
    /// Exclusive upper edge (unused for the above-range bin)
    pub high: f64,
    pub count: usize,
}

/// Overall shape of the traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficPattern {
    ExcessiveSpeeding,
    HighSpeedClustering,
    LowSpeedClustering,
    EvenDistribution,
}

impl TrafficPattern {
    pub fn title(&self) -> &'static str {
        match self {
            TrafficPattern::ExcessiveSpeeding => "EXCESSIVE SPEEDING",
            TrafficPattern::HighSpeedClustering => "HIGH-SPEED CLUSTERING",
            TrafficPattern::LowSpeedClustering => "LOW-SPEED CLUSTERING",
            TrafficPattern::EvenDistribution => "EVEN DISTRIBUTION",
        }
    }

    /// Patterns that warrant attention
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            TrafficPattern::ExcessiveSpeeding | TrafficPattern::HighSpeedClustering
        )
    }
}

/// Mean speed per direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalComparison {
    pub rtl_count: usize,
    pub rtl_mean: f64,
    pub ltr_count: usize,
    pub ltr_mean: f64,
    /// `|rtl - ltr| / min(rtl, ltr) * 100`; `None` when the smaller mean is 0
    pub difference_pct: Option<f64>,
    /// Set when the difference exceeds the threshold
    pub faster: Option<Direction>,
}

impl DirectionalComparison {
    fn compute(rtl: &[f64], ltr: &[f64], threshold: f64) -> Option<Self> {
        if rtl.is_empty() || ltr.is_empty() {
            return None;
        }
        let rtl_mean = mean(rtl);
        let ltr_mean = mean(ltr);
        let slower = rtl_mean.min(ltr_mean);
        let difference_pct = (slower > 0.0).then(|| (rtl_mean - ltr_mean).abs() / slower * 100.0);

        let notable = match difference_pct {
            Some(pct) => pct > threshold,
            None => rtl_mean != ltr_mean,
        };
        let faster = notable.then(|| {
            if rtl_mean > ltr_mean {
                Direction::RightToLeft
            } else {
                Direction::LeftToRight
            }
        });

        Some(Self {
            rtl_count: rtl.len(),
            rtl_mean,
            ltr_count: ltr.len(),
            ltr_mean,
            difference_pct,
            faster,
        })
    }
}

/// Statistics over a set of vehicle records
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedStatistics {
    pub settings: ReportSettings,
    pub total: usize,
    pub rtl_count: usize,
    pub ltr_count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Speed at the low percentile
    pub p_low_value: f64,
    /// Speed at the high percentile
    pub p_high_value: f64,
    /// Below-range, normal bins in order, above-range
    pub bins: Vec<SpeedBin>,
    pub normal_count: usize,
    pub outliers_low: usize,
    pub outliers_high: usize,
    pub lower_half: usize,
    pub upper_half: usize,
    /// Share of normal traffic in the lower half; 0 when there is none
    pub lower_half_pct: f64,
    /// Share of normal traffic in the upper half; 0 when there is none
    pub upper_half_pct: f64,
    pub pattern: TrafficPattern,
    pub directional: Option<DirectionalComparison>,
}

impl SpeedStatistics {
    /// Compute statistics over normalized speeds. Returns `None` below
    /// [`MIN_REPORT_VEHICLES`] records.
    pub fn compute(records: &[VehicleRecord], settings: &ReportSettings) -> Option<Self> {
        if records.len() < MIN_REPORT_VEHICLES {
            return None;
        }

        let speeds: Vec<f64> = records.iter().map(|r| r.speed_normalized).collect();
        let by_direction = |d: Direction| -> Vec<f64> {
            records
                .iter()
                .filter(|r| r.direction == d)
                .map(|r| r.speed_normalized)
                .collect()
        };
        let rtl = by_direction(Direction::RightToLeft);
        let ltr = by_direction(Direction::LeftToRight);

        let mut sorted = speeds.clone();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();

        let p_low_value = percentile_value(&sorted, settings.percentile_low);
        let p_high_value = percentile_value(&sorted, settings.percentile_high);
        let num_bins = settings.num_bins.max(1);

        let mut bins = build_bins(p_low_value, p_high_value, num_bins);
        for &speed in &speeds {
            let index = bin_index(speed, &bins);
            bins[index].count += 1;
        }

        let outliers_low = bins[0].count;
        let outliers_high = bins[num_bins + 1].count;
        let normal = &bins[1..=num_bins];
        let normal_count: usize = normal.iter().map(|b| b.count).sum();
        let mid = num_bins / 2;
        let lower_half: usize = normal[..mid].iter().map(|b| b.count).sum();
        let upper_half: usize = normal[mid..].iter().map(|b| b.count).sum();
        let share = |part: usize| {
            if normal_count > 0 {
                part as f64 / normal_count as f64 * 100.0
            } else {
                0.0
            }
        };
        let lower_half_pct = share(lower_half);
        let upper_half_pct = share(upper_half);

        let pattern = if outliers_high as f64 > n as f64 * EXCESSIVE_SPEEDING_SHARE {
            TrafficPattern::ExcessiveSpeeding
        } else if upper_half_pct > settings.clustering_threshold {
            TrafficPattern::HighSpeedClustering
        } else if lower_half_pct > settings.clustering_threshold {
            TrafficPattern::LowSpeedClustering
        } else {
            TrafficPattern::EvenDistribution
        };

        Some(Self {
            settings: settings.clone(),
            total: n,
            rtl_count: rtl.len(),
            ltr_count: ltr.len(),
            min: sorted[0],
            max: sorted[n - 1],
            mean: mean(&speeds),
            p_low_value,
            p_high_value,
            bins,
            normal_count,
            outliers_low,
            outliers_high,
            lower_half,
            upper_half,
            lower_half_pct,
            upper_half_pct,
            pattern,
            directional: DirectionalComparison::compute(
                &rtl,
                &ltr,
                settings.directional_difference,
            ),
        })
    }

    /// Percent of all vehicles
    pub fn share_of_total(&self, count: usize) -> f64 {
        count as f64 / self.total as f64 * 100.0
    }
}

/// Value at percentile `p` of an ascending, non-empty slice
pub fn percentile_value(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len();
    let index = ((n as f64) * (p / 100.0)).floor().max(0.0) as usize;
    sorted[index.min(n - 1)]
}

/// Outlier bins around `num_bins` equal-width bins spanning `[low, high)`
fn build_bins(low: f64, high: f64, num_bins: usize) -> Vec<SpeedBin> {
    let width = (high - low) / num_bins as f64;
    let mut bins = Vec::with_capacity(num_bins + 2);
    bins.push(SpeedBin {
        kind: BinKind::BelowRange,
        low: f64::NEG_INFINITY,
        high: low,
        count: 0,
    });
    for i in 0..num_bins {
        bins.push(SpeedBin {
            kind: BinKind::Normal(i + 1),
            low: low + i as f64 * width,
            high: low + (i + 1) as f64 * width,
            count: 0,
        });
    }
    bins.push(SpeedBin {
        kind: BinKind::AboveRange,
        low: high,
        high: f64::INFINITY,
        count: 0,
    });
    bins
}

/// Index into `bins` (as built by [`build_bins`]) for one speed
fn bin_index(speed: f64, bins: &[SpeedBin]) -> usize {
    let last = bins.len() - 1;
    if speed < bins[0].high {
        return 0;
    }
    if speed >= bins[last].low {
        return last;
    }
    // Rounding in the edge arithmetic can leave a value past the last
    // computed edge but still below p_high; it belongs to the top bin.
    (1..last)
        .find(|&i| bins[i].low <= speed && speed < bins[i].high)
        .unwrap_or(last - 1)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(n: u64, direction: Direction, speed: f64) -> VehicleRecord {
        VehicleRecord {
            vehicle_number: n,
            track_id: n as u32,
            direction,
            distance_pixels: speed,
            time_elapsed: 1.0,
            speed_raw: speed,
            speed_normalized: speed,
            timestamp: n as f64,
        }
    }

    fn ltr(speeds: &[f64]) -> Vec<VehicleRecord> {
        speeds
            .iter()
            .enumerate()
            .map(|(i, &s)| record(i as u64 + 1, Direction::LeftToRight, s))
            .collect()
    }

    #[test]
    fn test_percentile_index_rule() {
        let sorted: Vec<f64> = (1..=20).map(f64::from).collect();
        // floor(20 * 0.05) = 1, floor(20 * 0.95) = 19
        assert_eq!(percentile_value(&sorted, 5.0), 2.0);
        assert_eq!(percentile_value(&sorted, 95.0), 20.0);
        assert_eq!(percentile_value(&sorted, 100.0), 20.0);
        assert_eq!(percentile_value(&sorted, 0.0), 1.0);
    }

    #[test]
    fn test_too_few_records() {
        let records = ltr(&[10.0, 20.0, 30.0]);
        assert!(SpeedStatistics::compute(&records, &ReportSettings::default()).is_none());
    }

    #[test]
    fn test_bins_account_for_every_record() {
        let speeds: Vec<f64> = (1..=20).map(|i| i as f64 * 10.0).collect();
        let stats = SpeedStatistics::compute(&ltr(&speeds), &ReportSettings::default()).unwrap();

        assert_eq!(stats.bins.len(), 6);
        let total: usize = stats.bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 20);
        assert_eq!(stats.p_low_value, 20.0);
        assert_eq!(stats.p_high_value, 200.0);
        // 10 is below 20; 200 is at p_high and goes above
        assert_eq!(stats.outliers_low, 1);
        assert_eq!(stats.outliers_high, 1);
        assert_eq!(stats.normal_count, 18);
        assert_eq!(stats.lower_half + stats.upper_half, stats.normal_count);
    }

    #[test]
    fn test_bin_edges_half_open() {
        let bins = build_bins(0.0, 100.0, 4);
        assert_eq!(bin_index(-1.0, &bins), 0);
        assert_eq!(bin_index(0.0, &bins), 1);
        assert_eq!(bin_index(25.0, &bins), 2);
        assert_eq!(bin_index(99.999, &bins), 4);
        assert_eq!(bin_index(100.0, &bins), 5);
    }

    #[test]
    fn test_value_past_last_edge_goes_to_top_bin() {
        let mut bins = build_bins(0.0, 0.3, 3);
        // Simulate an edge that rounded short of p_high
        bins[3].high = 0.29;
        assert_eq!(bin_index(0.295, &bins), 3);
    }

    #[test]
    fn test_identical_speeds() {
        let stats =
            SpeedStatistics::compute(&ltr(&[50.0; 8]), &ReportSettings::default()).unwrap();
        // p_low == p_high == 50, so every record lands above the range
        assert_eq!(stats.outliers_high, 8);
        assert_eq!(stats.normal_count, 0);
        assert_eq!(stats.upper_half_pct, 0.0);
        assert_eq!(stats.lower_half_pct, 0.0);
        assert_eq!(stats.pattern, TrafficPattern::ExcessiveSpeeding);
    }

    #[test]
    fn test_low_speed_clustering() {
        let settings = ReportSettings {
            percentile_low: 0.0,
            percentile_high: 100.0,
            ..ReportSettings::default()
        };
        // Range [10, 100); most traffic in the lower half
        let speeds = [10.0, 12.0, 15.0, 20.0, 25.0, 30.0, 40.0, 60.0, 100.0];
        let stats = SpeedStatistics::compute(&ltr(&speeds), &settings).unwrap();
        assert_eq!(stats.outliers_high, 1);
        // 1 of 9 is above the 5% share, so speeding takes precedence
        assert_eq!(stats.pattern, TrafficPattern::ExcessiveSpeeding);

        // Enough records that the single maximum stays under the 5% share
        let mut speeds: Vec<f64> = vec![10.0; 30];
        speeds.extend([12.0, 14.0, 16.0, 18.0, 100.0]);
        let stats = SpeedStatistics::compute(&ltr(&speeds), &settings).unwrap();
        assert_eq!(stats.outliers_high, 1);
        assert_eq!(stats.lower_half, 34);
        assert!(stats.lower_half_pct > 60.0);
        assert_eq!(stats.pattern, TrafficPattern::LowSpeedClustering);
    }

    #[test]
    fn test_high_speed_clustering() {
        let settings = ReportSettings {
            percentile_low: 0.0,
            percentile_high: 100.0,
            ..ReportSettings::default()
        };
        let mut speeds = vec![10.0, 20.0];
        speeds.extend(vec![180.0; 40]);
        speeds.push(200.0);
        let stats = SpeedStatistics::compute(&ltr(&speeds), &settings).unwrap();
        // Only the max sits at p_high: 1 of 43 is under the 5% share
        assert_eq!(stats.outliers_high, 1);
        assert!(stats.upper_half_pct > 60.0);
        assert_eq!(stats.pattern, TrafficPattern::HighSpeedClustering);
    }

    #[test]
    fn test_directional_comparison() {
        let mut records = ltr(&[100.0, 100.0]);
        records.push(record(3, Direction::RightToLeft, 130.0));
        records.push(record(4, Direction::RightToLeft, 130.0));
        let stats = SpeedStatistics::compute(&records, &ReportSettings::default()).unwrap();

        let dir = stats.directional.unwrap();
        assert_eq!((dir.rtl_count, dir.ltr_count), (2, 2));
        assert!((dir.difference_pct.unwrap() - 30.0).abs() < 1e-9);
        assert_eq!(dir.faster, Some(Direction::RightToLeft));
    }

    #[test]
    fn test_similar_directions() {
        let mut records = ltr(&[100.0, 100.0]);
        records.push(record(3, Direction::RightToLeft, 110.0));
        records.push(record(4, Direction::RightToLeft, 110.0));
        let stats = SpeedStatistics::compute(&records, &ReportSettings::default()).unwrap();
        assert_eq!(stats.directional.unwrap().faster, None);
    }

    #[test]
    fn test_zero_mean_direction() {
        let mut records = ltr(&[0.0, 0.0]);
        records.push(record(3, Direction::RightToLeft, 50.0));
        records.push(record(4, Direction::RightToLeft, 50.0));
        let stats = SpeedStatistics::compute(&records, &ReportSettings::default()).unwrap();
        let dir = stats.directional.unwrap();
        assert_eq!(dir.difference_pct, None);
        assert_eq!(dir.faster, Some(Direction::RightToLeft));
    }

    #[test]
    fn test_single_direction_has_no_comparison() {
        let stats =
            SpeedStatistics::compute(&ltr(&[1.0, 2.0, 3.0, 4.0]), &ReportSettings::default())
                .unwrap();
        assert!(stats.directional.is_none());
        assert_eq!(stats.rtl_count, 0);
    }

    proptest! {
        #[test]
        fn test_counts_are_conserved(
            speeds in prop::collection::vec(0.0f64..500.0, 4..200),
            bins in 1usize..10,
        ) {
            let settings = ReportSettings { num_bins: bins, ..ReportSettings::default() };
            let stats = SpeedStatistics::compute(&ltr(&speeds), &settings).unwrap();
            let total: usize = stats.bins.iter().map(|b| b.count).sum();
            prop_assert_eq!(total, speeds.len());
            prop_assert_eq!(stats.outliers_low + stats.normal_count + stats.outliers_high, speeds.len());
            prop_assert_eq!(stats.lower_half + stats.upper_half, stats.normal_count);
            prop_assert!(stats.p_low_value <= stats.p_high_value);
        }

        #[test]
        fn test_order_does_not_matter(
            mut speeds in prop::collection::vec(0.0f64..500.0, 4..100),
        ) {
            let settings = ReportSettings::default();
            let a = SpeedStatistics::compute(&ltr(&speeds), &settings).unwrap();
            speeds.reverse();
            let b = SpeedStatistics::compute(&ltr(&speeds), &settings).unwrap();
            prop_assert_eq!(a.bins, b.bins);
            prop_assert_eq!(a.pattern, b.pattern);
        }
    }
}
