//! Runtime Configuration Surface
//!
//! A flat namespace of named toggles and sliders. The UI (or any other
//! caller) writes through [`RenderConfig::set`], which clamps into the
//! declared range; passes read the typed getters every frame.
//!
//! | Name                  | Type  | Range             | Default |
//! |-----------------------|-------|-------------------|---------|
//! | `enableTransmittance` | bool  |                   | true    |
//! | `enableBlur`          | bool  |                   | true    |
//! | `SSSWidth`            | float | [0.0001, 0.1]     | 0.012   |
//! | `SSSWeight`           | float | [0, 1]            | 1.0     |
//! | `kernelSize`          | int   | [10, 50]          | 25      |
//! | `lightPitch`          | float | [-89, 89]         | 30      |
//! | `lightYaw`            | float | [-180, 180]       | 45      |
//! | `exposure`            | float | [0, 10]           | 1.0     |
//! | `ambient`             | float | [0, 1]            | 0.05    |
//! | `lightColor`          | vec3  | components [0,10] | (1,1,1) |

use std::fmt;

use glam::Vec3;

use crate::errors::{Result, SssError};

/// A parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec3(Vec3),
}

impl ParamValue {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vec3(_) => "vec3",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Vec3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec3> for ParamValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

/// Valid range of a numeric parameter. Vectors clamp per component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamRange {
    None,
    Int { min: i32, max: i32 },
    Float { min: f32, max: f32 },
}

impl ParamRange {
    fn clamp(self, value: ParamValue) -> ParamValue {
        match (self, value) {
            (Self::Int { min, max }, ParamValue::Int(v)) => ParamValue::Int(v.clamp(min, max)),
            (Self::Float { min, max }, ParamValue::Float(v)) => {
                ParamValue::Float(if v.is_nan() { min } else { v.clamp(min, max) })
            }
            (Self::Float { min, max }, ParamValue::Vec3(v)) => {
                ParamValue::Vec3(v.clamp(Vec3::splat(min), Vec3::splat(max)))
            }
            (_, v) => v,
        }
    }
}

/// Descriptor of one parameter, for UI collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDesc {
    pub name: &'static str,
    pub value: ParamValue,
    pub range: ParamRange,
}

// Indices into `RenderConfig::params`, in table order.
const ENABLE_TRANSMITTANCE: usize = 0;
const ENABLE_BLUR: usize = 1;
const SSS_WIDTH: usize = 2;
const SSS_WEIGHT: usize = 3;
const KERNEL_SIZE: usize = 4;
const LIGHT_PITCH: usize = 5;
const LIGHT_YAW: usize = 6;
const EXPOSURE: usize = 7;
const AMBIENT: usize = 8;
const LIGHT_COLOR: usize = 9;

/// The named parameters read by render passes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    params: Vec<ParamDesc>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let float = |min, max| ParamRange::Float { min, max };
        let p = |name, value: ParamValue, range| ParamDesc { name, value, range };
        Self {
            params: vec![
                p("enableTransmittance", true.into(), ParamRange::None),
                p("enableBlur", true.into(), ParamRange::None),
                p("SSSWidth", 0.012_f32.into(), float(0.0001, 0.1)),
                p("SSSWeight", 1.0_f32.into(), float(0.0, 1.0)),
                p("kernelSize", 25_i32.into(), ParamRange::Int { min: 10, max: 50 }),
                p("lightPitch", 30.0_f32.into(), float(-89.0, 89.0)),
                p("lightYaw", 45.0_f32.into(), float(-180.0, 180.0)),
                p("exposure", 1.0_f32.into(), float(0.0, 10.0)),
                p("ambient", 0.05_f32.into(), float(0.0, 1.0)),
                p("lightColor", Vec3::ONE.into(), float(0.0, 10.0)),
            ],
        }
    }
}

impl RenderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value)
    }

    /// Stores `value` clamped into the parameter's range and returns what
    /// was stored.
    ///
    /// An `Int` is accepted for float parameters.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<ParamValue> {
        let param = self
            .params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| SssError::UnknownParameter(name.to_string()))?;

        let value = match (param.value, value.into()) {
            (ParamValue::Float(_), ParamValue::Int(v)) => ParamValue::Float(v as f32),
            (current, new) if std::mem::discriminant(&current) == std::mem::discriminant(&new) => {
                new
            }
            (current, _) => {
                return Err(SssError::ParameterType {
                    name: name.to_string(),
                    expected: current.type_name(),
                });
            }
        };

        param.value = param.range.clamp(value);
        log::debug!("Config {} = {}", param.name, param.value);
        Ok(param.value)
    }

    /// Flips a boolean parameter and returns the new value.
    pub fn toggle(&mut self, name: &str) -> Result<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => {
                self.set(name, !v)?;
                Ok(!v)
            }
            Some(other) => Err(SssError::ParameterType {
                name: name.to_string(),
                expected: other.type_name(),
            }),
            None => Err(SssError::UnknownParameter(name.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamDesc> {
        self.params.iter()
    }

    fn bool_at(&self, index: usize) -> bool {
        matches!(self.params[index].value, ParamValue::Bool(true))
    }

    fn float_at(&self, index: usize) -> f32 {
        match self.params[index].value {
            ParamValue::Float(v) => v,
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn enable_transmittance(&self) -> bool {
        self.bool_at(ENABLE_TRANSMITTANCE)
    }

    #[must_use]
    pub fn enable_blur(&self) -> bool {
        self.bool_at(ENABLE_BLUR)
    }

    #[must_use]
    pub fn sss_width(&self) -> f32 {
        self.float_at(SSS_WIDTH)
    }

    #[must_use]
    pub fn sss_weight(&self) -> f32 {
        self.float_at(SSS_WEIGHT)
    }

    #[must_use]
    pub fn kernel_size(&self) -> i32 {
        match self.params[KERNEL_SIZE].value {
            ParamValue::Int(v) => v,
            _ => 0,
        }
    }

    #[must_use]
    pub fn light_pitch(&self) -> f32 {
        self.float_at(LIGHT_PITCH)
    }

    #[must_use]
    pub fn light_yaw(&self) -> f32 {
        self.float_at(LIGHT_YAW)
    }

    #[must_use]
    pub fn exposure(&self) -> f32 {
        self.float_at(EXPOSURE)
    }

    #[must_use]
    pub fn ambient(&self) -> f32 {
        self.float_at(AMBIENT)
    }

    #[must_use]
    pub fn light_color(&self) -> Vec3 {
        match self.params[LIGHT_COLOR].value {
            ParamValue::Vec3(v) => v,
            _ => Vec3::ONE,
        }
    }
}
