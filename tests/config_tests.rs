//! Runtime configuration tests
//!
//! Tests for:
//! - Default parameter table
//! - Range clamping on `set`
//! - Type checking and int → float promotion
//! - Boolean toggles

use glam::Vec3;
use sss::errors::SssError;
use sss::renderer::{ParamRange, ParamValue, RenderConfig};

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn default_values() {
    let config = RenderConfig::default();
    assert!(config.enable_transmittance());
    assert!(config.enable_blur());
    assert_eq!(config.sss_width(), 0.012);
    assert_eq!(config.sss_weight(), 1.0);
    assert_eq!(config.kernel_size(), 25);
    assert_eq!(config.light_pitch(), 30.0);
    assert_eq!(config.light_yaw(), 45.0);
    assert_eq!(config.exposure(), 1.0);
    assert_eq!(config.ambient(), 0.05);
    assert_eq!(config.light_color(), Vec3::ONE);
}

#[test]
fn parameters_are_listed_with_ranges() {
    let config = RenderConfig::default();
    assert_eq!(config.iter().count(), 10);

    let kernel = config.iter().find(|p| p.name == "kernelSize").unwrap();
    assert_eq!(kernel.range, ParamRange::Int { min: 10, max: 50 });

    let blur = config.iter().find(|p| p.name == "enableBlur").unwrap();
    assert_eq!(blur.range, ParamRange::None);
}

// ============================================================================
// Set
// ============================================================================

#[test]
fn set_clamps_into_range() {
    let mut config = RenderConfig::default();

    assert_eq!(config.set("kernelSize", 100_i32).unwrap(), ParamValue::Int(50));
    assert_eq!(config.set("kernelSize", 3_i32).unwrap(), ParamValue::Int(10));
    assert_eq!(
        config.set("SSSWidth", 0.0_f32).unwrap(),
        ParamValue::Float(0.0001)
    );
    assert_eq!(config.set("exposure", 20.0_f32).unwrap(), ParamValue::Float(10.0));
    assert_eq!(config.exposure(), 10.0);
}

#[test]
fn vector_parameters_clamp_per_component() {
    let mut config = RenderConfig::default();
    let stored = config
        .set("lightColor", Vec3::new(-1.0, 5.0, 20.0))
        .unwrap();
    assert_eq!(stored, ParamValue::Vec3(Vec3::new(0.0, 5.0, 10.0)));
    assert_eq!(config.light_color(), Vec3::new(0.0, 5.0, 10.0));
}

#[test]
fn int_is_promoted_for_float_parameters() {
    let mut config = RenderConfig::default();
    assert_eq!(config.set("exposure", 2_i32).unwrap(), ParamValue::Float(2.0));
    assert_eq!(config.exposure(), 2.0);
}

#[test]
fn wrong_type_is_rejected_and_value_kept() {
    let mut config = RenderConfig::default();

    let err = config.set("enableBlur", 1.0_f32).unwrap_err();
    assert!(matches!(err, SssError::ParameterType { expected: "bool", .. }));
    assert!(config.enable_blur());

    // Floats are not narrowed to ints.
    let err = config.set("kernelSize", 30.5_f32).unwrap_err();
    assert!(matches!(err, SssError::ParameterType { expected: "int", .. }));
    assert_eq!(config.kernel_size(), 25);
}

#[test]
fn unknown_parameter_is_rejected() {
    let mut config = RenderConfig::default();
    let err = config.set("bloomStrength", 1.0_f32).unwrap_err();
    assert!(matches!(err, SssError::UnknownParameter(name) if name == "bloomStrength"));
    assert!(config.get("bloomStrength").is_none());
}

// ============================================================================
// Toggle
// ============================================================================

#[test]
fn toggle_flips_booleans() {
    let mut config = RenderConfig::default();
    assert!(!config.toggle("enableBlur").unwrap());
    assert!(!config.enable_blur());
    assert!(config.toggle("enableBlur").unwrap());
    assert_eq!(config.get("enableBlur"), Some(ParamValue::Bool(true)));
}

#[test]
fn toggle_rejects_non_booleans() {
    let mut config = RenderConfig::default();
    assert!(matches!(
        config.toggle("exposure"),
        Err(SssError::ParameterType { .. })
    ));
    assert!(matches!(
        config.toggle("nope"),
        Err(SssError::UnknownParameter(_))
    ));
}
