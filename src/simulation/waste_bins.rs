//! Waste-bin fill analysis.
//!
//! Each pass walks every bin and moves its fill level the way a street
//! camera would see it change between two visits: nearly full bins are
//! sometimes emptied by a truck, the rest slowly fill up.

use crate::core::waste::is_full;
use crate::entities::waste_bin::{self, ImageSource};
use crate::entities::{WasteBin, WasteBinModel};
use crate::errors::Result;
use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Level above which a truck may have emptied the bin
const EMPTYING_THRESHOLD: i32 = 80;

/// Next fill level of a bin currently at `fill_level`.
///
/// * above 80: 30 % chance the bin was emptied (new level 5..=20),
///   otherwise 70 % chance it grew by 1..=10
/// * otherwise: 50 % chance it grew by 1..=5
///
/// The result never exceeds 100.
pub fn next_fill_level<R: Rng + ?Sized>(rng: &mut R, fill_level: i32) -> i32 {
    if fill_level > EMPTYING_THRESHOLD {
        if rng.random_bool(0.3) {
            rng.random_range(5..=20)
        } else if rng.random_bool(0.7) {
            (fill_level + rng.random_range(1..=10)).min(100)
        } else {
            fill_level
        }
    } else if rng.random_bool(0.5) {
        (fill_level + rng.random_range(1..=5)).min(100)
    } else {
        fill_level
    }
}

/// Outcome of one analysis pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// Bins looked at
    pub analyzed: usize,
    /// Bins whose level or full flag changed
    pub changed: usize,
    /// Bins that could not be saved
    pub failed: usize,
}

/// Runs one pass over every bin with a freshly seeded generator.
pub async fn analyze_bins(db: &DatabaseConnection) -> Result<AnalysisReport> {
    let mut rng = StdRng::from_os_rng();
    analyze_bins_with(db, &mut rng).await
}

/// Runs one pass over every bin, drawing from `rng`.
///
/// A bin that fails to save is logged and skipped; only failing to load the
/// bins fails the pass.
#[instrument(skip_all)]
pub async fn analyze_bins_with<R: Rng + Send>(db: &DatabaseConnection, rng: &mut R) -> Result<AnalysisReport> {
    let bins = WasteBin::find().all(db).await?;
    let mut report = AnalysisReport::default();
    let analyzed_at = Utc::now().to_rfc3339();

    for bin in bins {
        report.analyzed += 1;
        let fill_level = next_fill_level(rng, bin.fill_level);
        let changed = fill_level != bin.fill_level || is_full(fill_level) != bin.is_full;
        match save_analysis(db, bin, fill_level, &analyzed_at).await {
            Ok(saved) => {
                if changed {
                    report.changed += 1;
                    info!(bin = %saved.id, fill_level = saved.fill_level, is_full = saved.is_full, "Bin updated");
                }
            }
            Err(e) => {
                report.failed += 1;
                warn!(error = %e, "Failed to store bin analysis");
            }
        }
    }

    info!(analyzed = report.analyzed, changed = report.changed, failed = report.failed, "Waste bin analysis completed");
    Ok(report)
}

async fn save_analysis(
    db: &DatabaseConnection,
    bin: WasteBinModel,
    fill_level: i32,
    analyzed_at: &str,
) -> Result<WasteBinModel> {
    let keep_bot = bin.image_source == ImageSource::Bot;
    let mut active: waste_bin::ActiveModel = bin.into();
    active.fill_level = Set(fill_level);
    active.is_full = Set(is_full(fill_level));
    active.last_analysis = Set(analyzed_at.to_string());
    if !keep_bot {
        active.image_source = Set(ImageSource::Cctv);
    }
    Ok(active.update(db).await?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::resource::Resource;
    use crate::core::tenant::Scope;
    use crate::core::validation::WriteMode;
    use crate::core::waste::{ImageUpdate, WasteBinInput, WasteBins, update_image};
    use crate::test_utils::*;

    #[test]
    fn test_next_fill_level_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for start in [0, 1, 50, 79, 80, 81, 95, 100] {
            for _ in 0..200 {
                let next = next_fill_level(&mut rng, start);
                assert!((0..=100).contains(&next), "{start} -> {next}");
                if start <= 80 {
                    // low bins only ever grow, by at most 5
                    assert!(next >= start && next <= start + 5, "{start} -> {next}");
                } else {
                    assert!(next >= start || (5..=20).contains(&next), "{start} -> {next}");
                }
            }
        }
    }

    #[test]
    fn test_full_bins_get_emptied_sometimes() {
        let mut rng = StdRng::seed_from_u64(42);
        let emptied = (0..1000)
            .filter(|_| next_fill_level(&mut rng, 90) <= 20)
            .count();
        // roughly 30 %
        assert!((200..400).contains(&emptied), "emptied {emptied} times");
    }

    #[tokio::test]
    async fn test_pass_keeps_full_flag_consistent() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        for (i, level) in [0, 40, 81, 99].into_iter().enumerate() {
            let bin = create_test_waste_bin(&db, org.item.id, &format!("Bin {i}")).await?;
            let patch = WasteBinInput {
                fill_level: Some(level),
                ..Default::default()
            };
            WasteBins::update(&db, Scope::All, bin.item.id, patch, WriteMode::Patch).await?;
        }

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..5 {
            let report = analyze_bins_with(&db, &mut rng).await?;
            assert_eq!(report.analyzed, 4);
            assert_eq!(report.failed, 0);
        }

        for bin in WasteBin::find().all(&db).await? {
            assert!((0..=100).contains(&bin.fill_level));
            assert_eq!(bin.is_full, bin.fill_level > 80);
            assert!(chrono::DateTime::parse_from_rfc3339(&bin.last_analysis).is_ok());
            assert_eq!(bin.image_source, ImageSource::Cctv);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_bot_images_keep_their_source() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_test_organization(&db, "fergana_admin").await?;
        let bin = create_test_waste_bin(&db, org.item.id, "Bozor 1").await?;
        let push = ImageUpdate {
            image_url: Some("https://t.me/photo.jpg".into()),
            image_source: Some(ImageSource::Bot),
            ..Default::default()
        };
        update_image(&db, Scope::All, bin.item.id, push).await?;

        analyze_bins(&db).await?;
        let stored = WasteBin::find_by_id(bin.item.id).one(&db).await?.unwrap();
        assert_eq!(stored.image_source, ImageSource::Bot);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_table() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(analyze_bins(&db).await?, AnalysisReport::default());
        Ok(())
    }
}
