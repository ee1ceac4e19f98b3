//! Skin Lookup Data
//!
//! Folds the spectral model in [`super::absorption`] into RGB quantities the
//! shaders can sample: a transmission tint and a thickness → transmittance
//! profile uploaded once as a `256×1` `Rgba16Float` texture.
//!
//! Spectral integration samples `[380, 780)` every 5 nm and weights each
//! sample by its band tint from [`absorb`]. Negative tint lobes (the deep-red
//! band dips below zero near 700 nm) are clamped to zero before weighting.

use glam::Vec3;
use half::f16;

use super::absorption::{
    VISIBLE_MAX_NM, VISIBLE_MIN_NM, absorb, spec_abs_d, spec_abs_e, transmission_for_wavelength,
};

/// Width of the transmittance lookup texture.
pub const TRANSMITTANCE_LUT_WIDTH: u32 = 256;

const SPECTRAL_STEP_NM: f32 = 5.0;

/// Physiological parameters of the skin being rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinParams {
    /// Melanin volume fraction of the epidermis.
    pub melanin_fraction: f32,
    /// Eumelanin share of the melanin mix.
    pub eumelanin_ratio: f32,
    /// Blood volume fraction of the dermis.
    pub blood_fraction: f32,
    /// Deoxygenated share of the haemoglobin.
    pub deoxy_ratio: f32,
    /// Thickness (cm) mapped to the last texel of the profile.
    pub max_thickness_cm: f32,
}

impl Default for SkinParams {
    fn default() -> Self {
        Self {
            melanin_fraction: 0.05,
            eumelanin_ratio: 0.7,
            blood_fraction: 0.02,
            deoxy_ratio: 0.25,
            max_thickness_cm: 0.2,
        }
    }
}

fn spectral_samples() -> impl Iterator<Item = f32> {
    let count = ((VISIBLE_MAX_NM - VISIBLE_MIN_NM) / SPECTRAL_STEP_NM) as u32;
    (0..count).map(|i| VISIBLE_MIN_NM + i as f32 * SPECTRAL_STEP_NM)
}

/// Per-channel average of `f` over the visible range, weighted by band tint.
fn band_weighted(f: impl Fn(f32) -> f64) -> Vec3 {
    let mut sum = Vec3::ZERO;
    let mut weight = Vec3::ZERO;
    for lambda in spectral_samples() {
        let tint = absorb(Vec3::ONE, lambda).max(Vec3::ZERO);
        sum += tint * f(lambda) as f32;
        weight += tint;
    }
    sum / weight.max(Vec3::splat(f32::EPSILON))
}

/// RGB tint of light transmitted through skin.
#[must_use]
pub fn transmission_tint() -> Vec3 {
    band_weighted(|lambda| f64::from(transmission_for_wavelength(lambda)))
}

/// RGB absorption coefficient (cm⁻¹) of the epidermis.
#[must_use]
pub fn epidermis_rgb_absorption(melanin_fraction: f32, eumelanin_ratio: f32) -> Vec3 {
    band_weighted(|lambda| spec_abs_e(lambda, melanin_fraction, eumelanin_ratio))
}

/// RGB absorption coefficient (cm⁻¹) of the dermis.
#[must_use]
pub fn dermis_rgb_absorption(blood_fraction: f32, deoxy_ratio: f32) -> Vec3 {
    band_weighted(|lambda| spec_abs_d(lambda, blood_fraction, deoxy_ratio))
}

/// Precomputed thickness → RGB transmittance row.
#[derive(Debug, Clone)]
pub struct TransmittanceProfile {
    width: u32,
    texels: Vec<[f16; 4]>,
}

impl TransmittanceProfile {
    /// Evaluates `exp(-μ·d)` for `width` thicknesses evenly spaced over
    /// `[0, params.max_thickness_cm]`.
    #[must_use]
    pub fn compute(params: &SkinParams, width: u32) -> Self {
        let mu = epidermis_rgb_absorption(params.melanin_fraction, params.eumelanin_ratio)
            + dermis_rgb_absorption(params.blood_fraction, params.deoxy_ratio);
        let last = width.saturating_sub(1).max(1) as f32;

        let texels = (0..width)
            .map(|i| {
                let d = params.max_thickness_cm * i as f32 / last;
                let t = (-mu * d).exp();
                [
                    f16::from_f32(t.x),
                    f16::from_f32(t.y),
                    f16::from_f32(t.z),
                    f16::ONE,
                ]
            })
            .collect();

        Self { width, texels }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Transmittance at texel `index`, widened back to `f32`.
    #[must_use]
    pub fn sample(&self, index: usize) -> Option<Vec3> {
        self.texels
            .get(index)
            .map(|t| Vec3::new(t[0].to_f32(), t[1].to_f32(), t[2].to_f32()))
    }

    /// Raw texel bytes in `Rgba16Float` layout.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tint_channels_are_fractions() {
        let tint = transmission_tint();
        for c in tint.to_array() {
            assert!((0.0..=1.0).contains(&c), "tint channel {c} out of range");
        }
        // Red light passes through skin more easily than blue.
        assert!(tint.x > tint.z);
    }

    #[test]
    fn profile_starts_clear_and_decays() {
        let profile = TransmittanceProfile::compute(&SkinParams::default(), 64);
        assert_eq!(profile.width(), 64);
        assert_eq!(profile.as_bytes().len(), 64 * 8);

        let first = profile.sample(0).unwrap();
        assert!((first - Vec3::ONE).abs().max_element() < 1e-3);

        let last = profile.sample(63).unwrap();
        assert!(last.x < first.x && last.y < first.y && last.z < first.z);
    }

    #[test]
    fn melanin_darkens_blue_more_than_red() {
        let mu = epidermis_rgb_absorption(0.3, 0.7);
        assert!(mu.z > mu.x, "blue absorption {} should exceed red {}", mu.z, mu.x);
    }
}
