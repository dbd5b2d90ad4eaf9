//! Chi-squared quantiles (2 degrees of freedom) for confidence ellipses.
//!
//! With the `statrs` feature the quantile comes from the inverse CDF. Without
//! it a four-entry table is used; confidence levels that are not in the table
//! resolve to the nearest tabulated level, so those results are approximate.

use tracing::debug;

use crate::error::{Result, SimError};

/// (confidence, chi2 quantile) for 2 degrees of freedom.
pub const CHI2_DF2_TABLE: [(f64, f64); 4] = [
    (0.95, 5.991),
    (0.99, 9.210),
    (0.997, 11.829),
    (0.999, 13.816),
];

/// How quantiles are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantileSource {
    /// Inverse CDF from the statistics library.
    Statistical,
    /// Hard-coded lookup table.
    Table,
}

impl QuantileSource {
    /// Best source compiled into this build.
    pub fn detect() -> Self {
        if cfg!(feature = "statrs") {
            QuantileSource::Statistical
        } else {
            QuantileSource::Table
        }
    }

    pub fn quantile(&self, confidence: f64) -> Result<f64> {
        check_confidence(confidence)?;
        match self {
            QuantileSource::Statistical => statistical_quantile(confidence),
            QuantileSource::Table => Ok(table_quantile(confidence)),
        }
    }
}

fn check_confidence(confidence: f64) -> Result<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(SimError::InvalidInput(format!(
            "confidence {} must lie strictly between 0 and 1",
            confidence
        )))
    }
}

/// `chi2_ppf(confidence, df=2)` from the best available source.
pub fn chi2_ppf_df2(confidence: f64) -> Result<f64> {
    QuantileSource::detect().quantile(confidence)
}

#[cfg(feature = "statrs")]
fn statistical_quantile(confidence: f64) -> Result<f64> {
    use statrs::distribution::{ChiSquared, ContinuousCDF};

    let dist = ChiSquared::new(2.0).map_err(|e| SimError::InvalidInput(e.to_string()))?;
    Ok(dist.inverse_cdf(confidence))
}

#[cfg(not(feature = "statrs"))]
fn statistical_quantile(confidence: f64) -> Result<f64> {
    debug!("statrs not compiled in, using chi-squared table");
    Ok(table_quantile(confidence))
}

/// Table lookup; untabulated levels use the nearest entry.
pub fn table_quantile(confidence: f64) -> f64 {
    let (level, value) = CHI2_DF2_TABLE
        .iter()
        .copied()
        .min_by(|a, b| (a.0 - confidence).abs().total_cmp(&(b.0 - confidence).abs()))
        .unwrap_or(CHI2_DF2_TABLE[2]);
    if (level - confidence).abs() > 1e-9 {
        debug!(confidence, level, "confidence not tabulated, using nearest level");
    }
    value
}
