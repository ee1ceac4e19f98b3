//! Spectral Skin Absorption
//!
//! Closed-form absorption and transmission curves for a two-layer skin model
//! (melanin-bearing epidermis over blood-bearing dermis). Wavelengths are in
//! nanometres; absorption coefficients are in cm⁻¹.
//!
//! Everything here is pure and stateless. The renderer never evaluates these
//! per frame: [`super::lut`] folds them into lookup data once at init.

use glam::Vec3;

/// Lower bound of the visible range covered by the tint curve.
pub const VISIBLE_MIN_NM: f32 = 380.0;
/// Upper bound (exclusive) of the visible range covered by the tint curve.
pub const VISIBLE_MAX_NM: f32 = 780.0;

/// Molar weight of haemoglobin (g/mol).
const HAEMOGLOBIN_MOLAR_WEIGHT: f64 = 64_500.0;
/// Haemoglobin concentration in whole blood (g/L).
const HAEMOGLOBIN_CONCENTRATION: f64 = 150.0;
/// Molar extinction used for both haemoglobin states.
const HAEMOGLOBIN_EXTINCTION: f64 = 818.0;

/// Fraction of light transmitted at `wavelength`, from a cubic fit.
///
/// The result is clamped to `[0, 1]`; the fit goes negative far in the
/// infrared and exceeds one near 780 nm, both of which clamp silently.
#[must_use]
pub fn transmission_for_wavelength(wavelength: f32) -> f32 {
    let x = wavelength;
    let cubic = (-0.000_001_55 * f64::from(x * x * x)) as f32;
    let value = (cubic + 0.002_471_3 * (x * x) - 1.018_45 * x + 127.489) / 100.0;
    value.clamp(0.0, 1.0)
}

/// RGB tint of a single wavelength, applied multiplicatively to `color`.
///
/// Eight bands cover `[380, 780)`; each band ramps one or two channels
/// linearly. Every band includes its lower bound. Outside the bands the input
/// color is returned unchanged.
#[must_use]
pub fn absorb(color: Vec3, wavelength: f32) -> Vec3 {
    let w = wavelength;
    let tint = if (380.0..410.0).contains(&w) {
        // Violet: red fades in while blue fades out.
        let t = (410.0 - w) / 30.0;
        Vec3::new(0.6 - 0.41 * t, 0.0, 0.39 + 0.6 * t)
    } else if (410.0..440.0).contains(&w) {
        Vec3::new(0.19 - 0.19 * ((440.0 - w) / 30.0), 0.0, 1.0)
    } else if (440.0..490.0).contains(&w) {
        Vec3::new(0.0, 1.0 - (490.0 - w) / 50.0, 1.0)
    } else if (490.0..510.0).contains(&w) {
        Vec3::new(0.0, 1.0, (510.0 - w) / 20.0)
    } else if (510.0..580.0).contains(&w) {
        Vec3::new(1.0 - (580.0 - w) / 70.0, 1.0, 0.0)
    } else if (580.0..640.0).contains(&w) {
        Vec3::new(1.0, (640.0 - w) / 60.0, 0.0)
    } else if (640.0..700.0).contains(&w) {
        Vec3::new(1.0, 0.0, 0.0)
    } else if (700.0..780.0).contains(&w) {
        Vec3::new(0.35 - 0.65 * ((780.0 - w) / 80.0), 0.0, 0.0)
    } else {
        return color;
    };
    color * tint
}

/// Eumelanin absorption coefficient.
#[must_use]
pub fn eumelanin_absorption(lambda: f32) -> f64 {
    6.6e11 * f64::from(lambda).powf(-3.33)
}

/// Pheomelanin absorption coefficient.
#[must_use]
pub fn pheomelanin_absorption(lambda: f32) -> f64 {
    2.9e15 * f64::from(lambda).powf(-4.75)
}

/// Baseline absorption of melanin-free, blood-free tissue.
#[must_use]
pub fn skin_base_absorption(lambda: f32) -> f64 {
    7.84e8 * f64::from(lambda).powf(-3.255)
}

/// Oxygenated haemoglobin absorption coefficient.
///
/// The model uses a single wavelength-independent extinction value.
#[must_use]
pub fn oxy_haemoglobin_absorption(_lambda: f32) -> f64 {
    2.303 * (HAEMOGLOBIN_CONCENTRATION * HAEMOGLOBIN_EXTINCTION / HAEMOGLOBIN_MOLAR_WEIGHT)
}

/// Deoxygenated haemoglobin absorption coefficient.
#[must_use]
pub fn deoxy_haemoglobin_absorption(_lambda: f32) -> f64 {
    2.303 * (HAEMOGLOBIN_CONCENTRATION * HAEMOGLOBIN_EXTINCTION / HAEMOGLOBIN_MOLAR_WEIGHT)
}

/// Spectral absorption of the epidermis.
///
/// * `melanin_fraction` - melanin volume fraction `Vm`
/// * `eumelanin_ratio` - share of eumelanin in the melanin mix `Φm`
#[must_use]
pub fn spec_abs_e(lambda: f32, melanin_fraction: f32, eumelanin_ratio: f32) -> f64 {
    let vm = f64::from(melanin_fraction);
    let phi = f64::from(eumelanin_ratio);
    let beta_carotene = 0.0;

    let melanin =
        phi * eumelanin_absorption(lambda) + (1.0 - phi) * pheomelanin_absorption(lambda);
    vm * melanin + (1.0 - vm) * (beta_carotene + skin_base_absorption(lambda))
}

/// Spectral absorption of the dermis.
///
/// Known defect, reproduced as-is until the intended formula is settled:
/// the blood-weighted sum
/// `Vb·(Φh·μ_hb + (1−Φh)·μ_hbo2) + (1−Vb)·μ_base`
/// is never returned. Both haemoglobin terms use the deoxy extinction, the
/// sum is discarded, and the function yields the oxy coefficient regardless
/// of `blood_fraction` and `deoxy_ratio`. [`spec_abs_d_weighted`] exposes the
/// discarded sum for callers that want to compare.
#[must_use]
pub fn spec_abs_d(lambda: f32, blood_fraction: f32, deoxy_ratio: f32) -> f64 {
    let _ = spec_abs_d_weighted(lambda, blood_fraction, deoxy_ratio);
    oxy_haemoglobin_absorption(lambda)
}

/// The blood-weighted dermis sum that [`spec_abs_d`] computes and drops.
#[must_use]
pub fn spec_abs_d_weighted(lambda: f32, blood_fraction: f32, deoxy_ratio: f32) -> f64 {
    let vb = f64::from(blood_fraction);
    let phi = f64::from(deoxy_ratio);
    let hb = deoxy_haemoglobin_absorption(lambda);
    let hbo2 = deoxy_haemoglobin_absorption(lambda);
    let bilirubin = 0.0;
    let beta_carotene = 0.0;

    vb * (phi * hb + (1.0 - phi) * hbo2 + bilirubin + beta_carotene)
        + (1.0 - vb) * skin_base_absorption(lambda)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haemoglobin_states_share_extinction() {
        assert_eq!(
            oxy_haemoglobin_absorption(450.0),
            deoxy_haemoglobin_absorption(600.0)
        );
        let expected = 2.303 * (150.0 * 818.0 / 64_500.0);
        assert!((oxy_haemoglobin_absorption(500.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn dermis_ignores_blood_parameters() {
        let a = spec_abs_d(500.0, 0.0, 0.0);
        let b = spec_abs_d(500.0, 0.9, 0.7);
        assert_eq!(a, b);
        assert_eq!(a, oxy_haemoglobin_absorption(500.0));
    }

    #[test]
    fn epidermis_without_melanin_is_base_absorption() {
        let base = skin_base_absorption(550.0);
        assert!((spec_abs_e(550.0, 0.0, 0.5) - base).abs() < 1e-9);
    }
}
