pub mod chi2;
pub mod ellipse;

pub use chi2::{chi2_ppf_df2, QuantileSource, CHI2_DF2_TABLE};
pub use ellipse::{
    compute_dispersion_ellipse, compute_with_source, dispersion_ellipse_from_matrix, Ellipse,
    DEFAULT_CONFIDENCE,
};
