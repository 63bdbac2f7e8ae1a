//! Text report rendering
//!
//! Turns [`SpeedStatistics`] into the human-readable report that is
//! overwritten on disk every few vehicles and once more at shutdown.

use super::stats::{BinKind, SpeedStatistics, TrafficPattern};
use crate::error::{Result, TrafficError};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::Path;

const RULE_WIDTH: usize = 70;

fn heavy_rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn light_rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// One block per two percent of the total
fn bar(pct: f64) -> String {
    "█".repeat((pct / 2.0) as usize)
}

/// Render the full report
pub fn render(stats: &SpeedStatistics, generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_sections(&mut out, stats, generated_at);
    out
}

fn write_sections(
    out: &mut String,
    stats: &SpeedStatistics,
    generated_at: DateTime<Local>,
) -> std::fmt::Result {
    let s = &stats.settings;
    let p_low = s.percentile_low;
    let p_high = s.percentile_high;

    writeln!(out, "TRAFFIC SPEED ANALYSIS")?;
    writeln!(out, "{}", heavy_rule())?;
    writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Vehicles analyzed: {}", stats.total)?;
    writeln!(out, "Perspective correction: RTL x{}", s.rtl_correction_factor)?;
    writeln!(out)?;

    writeln!(out, "SUMMARY")?;
    writeln!(out, "{}", light_rule())?;
    writeln!(out, "Total vehicles:    {}", stats.total)?;
    writeln!(
        out,
        "  RTL direction:   {} ({:.1}%)",
        stats.rtl_count,
        stats.share_of_total(stats.rtl_count)
    )?;
    writeln!(
        out,
        "  LTR direction:   {} ({:.1}%)",
        stats.ltr_count,
        stats.share_of_total(stats.ltr_count)
    )?;
    writeln!(out)?;

    writeln!(out, "Speed statistics:")?;
    writeln!(out, "  Full range:      {:.1} - {:.1} px/s", stats.min, stats.max)?;
    writeln!(out, "  Mean speed:      {:.1} px/s", stats.mean)?;
    writeln!(out, "  {}th percentile:  {:.1} px/s", p_low, stats.p_low_value)?;
    writeln!(out, "  {}th percentile: {:.1} px/s", p_high, stats.p_high_value)?;
    writeln!(out)?;

    writeln!(out, "SPEED DISTRIBUTION ({} bins)", stats.bins.len())?;
    writeln!(out, "{}", light_rule())?;
    for (i, bin) in stats.bins.iter().enumerate() {
        let pct = stats.share_of_total(bin.count);
        match bin.kind {
            BinKind::BelowRange => writeln!(
                out,
                "Bin {} [< {:6.1}]:        {:4} vehicles ({:5.1}%) {} Below {}th %ile",
                i,
                stats.p_low_value,
                bin.count,
                pct,
                bar(pct),
                p_low
            )?,
            BinKind::AboveRange => writeln!(
                out,
                "Bin {} [> {:6.1}]:        {:4} vehicles ({:5.1}%) {} Above {}th %ile",
                i,
                stats.p_high_value,
                bin.count,
                pct,
                bar(pct),
                p_high
            )?,
            BinKind::Normal(_) => writeln!(
                out,
                "Bin {} [{:6.1} - {:6.1}]: {:4} vehicles ({:5.1}%) {}",
                i,
                bin.low,
                bin.high,
                bin.count,
                pct,
                bar(pct)
            )?,
        }
    }

    writeln!(out)?;
    writeln!(out, "KEY METRICS")?;
    writeln!(out, "{}", light_rule())?;
    writeln!(
        out,
        "Normal traffic ({}th-{}th %ile): {:4} vehicles ({:.1}%)",
        p_low,
        p_high,
        stats.normal_count,
        stats.share_of_total(stats.normal_count)
    )?;
    if stats.outliers_low > 0 {
        writeln!(
            out,
            "Slow outliers (< {}th %ile):     {:4} vehicles ({:.1}%)",
            p_low,
            stats.outliers_low,
            stats.share_of_total(stats.outliers_low)
        )?;
    }
    if stats.outliers_high > 0 {
        writeln!(
            out,
            "Fast outliers (> {}th %ile):    {:4} vehicles ({:.1}%)",
            p_high,
            stats.outliers_high,
            stats.share_of_total(stats.outliers_high)
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Within normal range:")?;
    writeln!(
        out,
        "  Lower half: {:4} vehicles ({:5.1}%)",
        stats.lower_half, stats.lower_half_pct
    )?;
    writeln!(
        out,
        "  Upper half: {:4} vehicles ({:5.1}%)",
        stats.upper_half, stats.upper_half_pct
    )?;
    writeln!(out)?;

    writeln!(out, "INTERPRETATION")?;
    writeln!(out, "{}", light_rule())?;
    let marker = if stats.pattern.is_warning() { "⚠️ " } else { "✓" };
    writeln!(out, "{} {}", marker, stats.pattern.title())?;
    match stats.pattern {
        TrafficPattern::ExcessiveSpeeding => writeln!(
            out,
            "   {} vehicles ({:.1}%) above {}th percentile",
            stats.outliers_high,
            stats.share_of_total(stats.outliers_high),
            p_high
        )?,
        TrafficPattern::HighSpeedClustering => writeln!(
            out,
            "   {:.1}% of normal traffic in upper half of range",
            stats.upper_half_pct
        )?,
        TrafficPattern::LowSpeedClustering => writeln!(
            out,
            "   {:.1}% of normal traffic in lower half of range",
            stats.lower_half_pct
        )?,
        TrafficPattern::EvenDistribution => {
            writeln!(out, "   Normal traffic spread relatively evenly")?
        }
    }

    if let Some(dir) = &stats.directional {
        writeln!(out)?;
        writeln!(out, "DIRECTIONAL COMPARISON")?;
        writeln!(out, "{}", light_rule())?;
        writeln!(
            out,
            "RTL (farther lane):  {:4} vehicles, mean {:6.1} px/s",
            dir.rtl_count, dir.rtl_mean
        )?;
        writeln!(
            out,
            "LTR (closer lane):   {:4} vehicles, mean {:6.1} px/s",
            dir.ltr_count, dir.ltr_mean
        )?;
        writeln!(out)?;
        match (dir.faster, dir.difference_pct) {
            (Some(faster), Some(pct)) => {
                writeln!(out, "Direction {} averages {:.1}% faster", faster, pct)?
            }
            (Some(faster), None) => writeln!(out, "Direction {} is faster", faster)?,
            (None, _) => writeln!(out, "Both directions show similar average speeds")?,
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", heavy_rule())?;
    Ok(())
}

/// Replace the report file with a freshly rendered report
pub fn write_report(path: impl AsRef<Path>, stats: &SpeedStatistics) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, render(stats, Local::now()))
        .map_err(|e| TrafficError::Report(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::ReportSettings;
    use crate::types::{Direction, VehicleRecord};
    use chrono::TimeZone;

    fn records() -> Vec<VehicleRecord> {
        [
            (Direction::RightToLeft, 115.0),
            (Direction::LeftToRight, 100.0),
            (Direction::RightToLeft, 138.0),
            (Direction::LeftToRight, 90.0),
            (Direction::LeftToRight, 110.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, &(direction, speed))| VehicleRecord {
            vehicle_number: i as u64 + 1,
            track_id: i as u32,
            direction,
            distance_pixels: speed,
            time_elapsed: 1.0,
            speed_raw: speed,
            speed_normalized: speed,
            timestamp: i as f64,
        })
        .collect()
    }

    fn rendered() -> String {
        let stats = SpeedStatistics::compute(&records(), &ReportSettings::default()).unwrap();
        let at = Local.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        render(&stats, at)
    }

    #[test]
    fn test_sections_present_in_order() {
        let text = rendered();
        let order = [
            "TRAFFIC SPEED ANALYSIS",
            "SUMMARY",
            "SPEED DISTRIBUTION (6 bins)",
            "KEY METRICS",
            "INTERPRETATION",
            "DIRECTIONAL COMPARISON",
        ];
        let mut last = 0;
        for heading in order {
            let pos = text[last..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing {}", heading));
            last += pos;
        }
    }

    #[test]
    fn test_summary_lines() {
        let text = rendered();
        assert!(text.contains("Generated: 2025-06-01 08:30:00"));
        assert!(text.contains("Total vehicles:    5"));
        assert!(text.contains("  RTL direction:   2 (40.0%)"));
        assert!(text.contains("  LTR direction:   3 (60.0%)"));
        assert!(text.contains("Perspective correction: RTL x1.15"));
        assert!(text.contains("5th percentile:"));
        assert!(text.contains("95th percentile:"));
    }

    #[test]
    fn test_directional_verdict() {
        let text = rendered();
        // RTL mean 126.5 vs LTR 100.0
        assert!(text.contains("Direction RTL averages 26.5% faster"));
    }

    #[test]
    fn test_bar_length() {
        assert_eq!(bar(0.0), "");
        assert_eq!(bar(41.0).chars().count(), 20);
    }

    #[test]
    fn test_write_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "stale").unwrap();
        let stats = SpeedStatistics::compute(&records(), &ReportSettings::default()).unwrap();
        write_report(&path, &stats).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("TRAFFIC SPEED ANALYSIS"));
        assert!(!content.contains("stale"));
    }
}
