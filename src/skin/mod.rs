//! Skin Optics
//!
//! - [`absorption`]: spectral absorption/transmission formulas
//! - [`lut`]: RGB lookup data precomputed from those formulas at init

pub mod absorption;
pub mod lut;

pub use absorption::{absorb, spec_abs_d, spec_abs_e, transmission_for_wavelength};
pub use lut::{SkinParams, TRANSMITTANCE_LUT_WIDTH, TransmittanceProfile, transmission_tint};
