//! Camera screenshot simulation.
//!
//! Stands in for the street cameras and the image classifier behind them:
//! every bin gets a placeholder screenshot and a plausible reading of its
//! fill level, recorded as a CCTV image.

use crate::core::waste::is_full;
use crate::entities::waste_bin::{self, ImageSource};
use crate::entities::{WasteBin, WasteBinModel};
use crate::errors::Result;
use rand::{Rng, SeedableRng, rngs::StdRng};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use serde::Serialize;
use tracing::{info, instrument, warn};

const PLACEHOLDER_BASE: &str = "https://via.placeholder.com/640x480";

/// Placeholder screenshot URL, colored by how full the bin looks.
#[must_use]
pub fn screenshot_url(bin_id: Uuid, fill_level: i32) -> String {
    let color = if fill_level > 80 {
        "red"
    } else if fill_level < 30 {
        "green"
    } else {
        "yellow"
    };
    let short = bin_id.simple().to_string();
    format!(
        "{PLACEHOLDER_BASE}/000000/{color}.png?text=Waste+Bin+{}&fill={fill_level}%",
        &short[..8]
    )
}

/// What the classifier read off one screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAnalysis {
    /// Whether a bin was recognised in the frame
    pub is_waste_bin: bool,
    /// Whether the bin looks full
    pub is_full: bool,
    /// Fill percentage
    pub fill_level: i32,
    /// 60..=95
    pub confidence: i32,
    /// Free-text analysis notes
    pub notes: String,
}

impl ImageAnalysis {
    /// The bin's `last_analysis` text.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "AI tahlili: {}, Isbot: {}, IsFull: {}, Conf: {}%",
            self.notes, self.is_waste_bin, self.is_full, self.confidence
        )
    }
}

/// Simulates classifying a screenshot of a bin at `fill_level`.
///
/// The reading is usually the stored level; one in ten readings is off by
/// up to 10 points. A reading above 90 may be reported as overflowing
/// (level 100) and one below 20 may get a "still empty" note.
pub fn analyze_image<R: Rng + ?Sized>(rng: &mut R, fill_level: i32) -> ImageAnalysis {
    let confidence = (80 + rng.random_range(-10..=10)).clamp(60, 95);

    let mut level = fill_level;
    if rng.random_bool(0.1) {
        level = (fill_level + rng.random_range(-10..=10)).clamp(0, 100);
    }
    let mut full = is_full(level);
    let mut notes = format!(
        "Konteyner {level}% to'la. {}",
        if full { "To'lgan" } else { "To'lmagan" }
    );

    if level > 90 && rng.random_bool(0.3) {
        notes = "Konteyner toshib ketayotgan. Tez orada yuklash kerak.".to_string();
        full = true;
        level = 100;
    } else if level < 20 && rng.random_bool(0.2) {
        notes = "Konteyner hali bo'sh. Yana to'lishi kerak.".to_string();
    }

    ImageAnalysis {
        is_waste_bin: true,
        is_full: full,
        fill_level: level,
        confidence,
        notes,
    }
}

/// Outcome of one screenshot round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScreenshotReport {
    /// Bins that got a new screenshot
    pub captured: usize,
    /// Bins that could not be saved
    pub failed: usize,
}

/// Takes one round of screenshots with a freshly seeded generator.
pub async fn capture_screenshots(db: &DatabaseConnection) -> Result<ScreenshotReport> {
    let mut rng = StdRng::from_os_rng();
    capture_screenshots_with(db, &mut rng).await
}

/// Takes one round of screenshots, drawing from `rng`.
#[instrument(skip_all)]
pub async fn capture_screenshots_with<R: Rng + Send>(
    db: &DatabaseConnection,
    rng: &mut R,
) -> Result<ScreenshotReport> {
    let bins = WasteBin::find().all(db).await?;
    let mut report = ScreenshotReport::default();

    for bin in bins {
        let url = screenshot_url(bin.id, bin.fill_level);
        let analysis = analyze_image(rng, bin.fill_level);
        match save_screenshot(db, bin, url, &analysis).await {
            Ok(saved) => {
                report.captured += 1;
                info!(
                    bin = %saved.id,
                    fill_level = saved.fill_level,
                    is_full = saved.is_full,
                    confidence = analysis.confidence,
                    "Bin updated with camera screenshot"
                );
            }
            Err(e) => {
                report.failed += 1;
                warn!(error = %e, "Failed to store camera screenshot");
            }
        }
    }

    Ok(report)
}

async fn save_screenshot(
    db: &DatabaseConnection,
    bin: WasteBinModel,
    url: String,
    analysis: &ImageAnalysis,
) -> Result<WasteBinModel> {
    let mut active: waste_bin::ActiveModel = bin.into();
    active.image_url = Set(Some(url));
    active.image_source = Set(ImageSource::Cctv);
    active.last_analysis = Set(analysis.summary());
    active.fill_level = Set(analysis.fill_level);
    active.is_full = Set(analysis.is_full);
    Ok(active.update(db).await?)
}
