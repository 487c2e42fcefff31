// src/color_space.rs

//! Color space descriptors and the shared `ColorSpace` handle.
//!
//! A descriptor is value-like: two color spaces are the same space when
//! their descriptors are equal, regardless of which `ColorSpaceRef` carries
//! them. Handles are reference counted and shared read-only by any number of
//! surfaces and displays.

use crate::error::{Result, SystemError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// CIE 1931 xy chromaticity coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// RGB primaries plus reference white.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Primaries {
    pub red: Chromaticity,
    pub green: Chromaticity,
    pub blue: Chromaticity,
    pub white: Chromaticity,
}

const D65: Chromaticity = Chromaticity::new(0.3127, 0.3290);

impl Primaries {
    /// Rec. 709 / sRGB primaries, D65 white.
    pub const SRGB: Primaries = Primaries {
        red: Chromaticity::new(0.640, 0.330),
        green: Chromaticity::new(0.300, 0.600),
        blue: Chromaticity::new(0.150, 0.060),
        white: D65,
    };

    /// DCI-P3 primaries with D65 white, as used by Display P3 monitors.
    pub const DISPLAY_P3: Primaries = Primaries {
        red: Chromaticity::new(0.680, 0.320),
        green: Chromaticity::new(0.265, 0.690),
        blue: Chromaticity::new(0.150, 0.060),
        white: D65,
    };

    /// Adobe RGB (1998) primaries, D65 white.
    pub const ADOBE_RGB: Primaries = Primaries {
        red: Chromaticity::new(0.640, 0.330),
        green: Chromaticity::new(0.210, 0.710),
        blue: Chromaticity::new(0.150, 0.060),
        white: D65,
    };

    fn points(&self) -> [Chromaticity; 4] {
        [self.red, self.green, self.blue, self.white]
    }
}

/// Mapping between encoded channel values and linear light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransferFn {
    /// Piecewise sRGB curve.
    Srgb,
    /// Pure power curve with the given exponent.
    Gamma(f64),
    Linear,
}

impl TransferFn {
    /// Encoded value in [0,1] to linear light.
    pub fn decode(self, v: f64) -> f64 {
        match self {
            TransferFn::Srgb => {
                if v <= 0.04045 {
                    v / 12.92
                } else {
                    ((v + 0.055) / 1.055).powf(2.4)
                }
            }
            TransferFn::Gamma(g) => v.powf(g),
            TransferFn::Linear => v,
        }
    }

    /// Linear light in [0,1] to encoded value.
    pub fn encode(self, l: f64) -> f64 {
        match self {
            TransferFn::Srgb => {
                if l <= 0.003_130_8 {
                    l * 12.92
                } else {
                    1.055 * l.powf(1.0 / 2.4) - 0.055
                }
            }
            TransferFn::Gamma(g) => l.powf(1.0 / g),
            TransferFn::Linear => l,
        }
    }
}

/// Generic description of a color space, before the platform wraps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColorSpaceDescriptor {
    /// The standard sRGB space.
    Srgb,
    /// Parametric RGB space.
    Rgb {
        name: String,
        transfer: TransferFn,
        primaries: Primaries,
    },
    /// Embedded ICC profile. Only bridged to itself by the built-in
    /// conversion engine.
    Icc { name: String, data: Vec<u8> },
}

impl ColorSpaceDescriptor {
    pub fn srgb() -> Self {
        ColorSpaceDescriptor::Srgb
    }

    pub fn linear_srgb() -> Self {
        ColorSpaceDescriptor::Rgb {
            name: "Linear sRGB".to_string(),
            transfer: TransferFn::Linear,
            primaries: Primaries::SRGB,
        }
    }

    pub fn display_p3() -> Self {
        ColorSpaceDescriptor::Rgb {
            name: "Display P3".to_string(),
            transfer: TransferFn::Srgb,
            primaries: Primaries::DISPLAY_P3,
        }
    }

    pub fn adobe_rgb() -> Self {
        ColorSpaceDescriptor::Rgb {
            name: "Adobe RGB (1998)".to_string(),
            transfer: TransferFn::Gamma(563.0 / 256.0),
            primaries: Primaries::ADOBE_RGB,
        }
    }

    pub fn icc(name: impl Into<String>, data: Vec<u8>) -> Self {
        ColorSpaceDescriptor::Icc {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ColorSpaceDescriptor::Srgb => "sRGB",
            ColorSpaceDescriptor::Rgb { name, .. } | ColorSpaceDescriptor::Icc { name, .. } => {
                name
            }
        }
    }

    /// Transfer function and primaries, for descriptors the conversion
    /// engine can evaluate directly.
    pub fn parametric(&self) -> Option<(TransferFn, Primaries)> {
        match self {
            ColorSpaceDescriptor::Srgb => Some((TransferFn::Srgb, Primaries::SRGB)),
            ColorSpaceDescriptor::Rgb {
                transfer,
                primaries,
                ..
            } => Some((*transfer, *primaries)),
            ColorSpaceDescriptor::Icc { .. } => None,
        }
    }

    /// True for sRGB itself and any parametric space with identical
    /// parameters.
    pub fn is_srgb(&self) -> bool {
        self.parametric() == Some((TransferFn::Srgb, Primaries::SRGB))
    }

    /// True when both descriptors encode pixels identically: equal
    /// descriptors, or parametric spaces with the same parameters.
    pub fn same_encoding(&self, other: &Self) -> bool {
        if self == other {
            return true;
        }
        match (self.parametric(), other.parametric()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Rejects descriptors no platform could wrap.
    pub fn validate(&self) -> Result<()> {
        match self {
            ColorSpaceDescriptor::Srgb => Ok(()),
            ColorSpaceDescriptor::Rgb {
                transfer,
                primaries,
                name,
            } => {
                if let TransferFn::Gamma(g) = transfer {
                    if !g.is_finite() || *g <= 0.0 {
                        return Err(SystemError::invalid(format!(
                            "color space '{}' has non-positive gamma {}",
                            name, g
                        )));
                    }
                }
                for point in primaries.points() {
                    let valid = point.x.is_finite()
                        && point.y.is_finite()
                        && point.x >= 0.0
                        && point.y > 0.0
                        && point.x + point.y <= 1.0;
                    if !valid {
                        return Err(SystemError::invalid(format!(
                            "color space '{}' has an invalid chromaticity ({}, {})",
                            name, point.x, point.y
                        )));
                    }
                }
                if crate::conversion::rgb_to_xyz(primaries).is_none() {
                    return Err(SystemError::invalid(format!(
                        "color space '{}' has degenerate primaries",
                        name
                    )));
                }
                Ok(())
            }
            ColorSpaceDescriptor::Icc { name, data } => {
                if data.is_empty() {
                    Err(SystemError::invalid(format!(
                        "ICC profile '{}' has no data",
                        name
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Platform-wrapped color space. Immutable once created.
#[derive(Debug, Clone)]
pub struct ColorSpace {
    descriptor: ColorSpaceDescriptor,
}

/// Shared handle to a color space. Lives as long as its longest holder.
pub type ColorSpaceRef = Arc<ColorSpace>;

impl ColorSpace {
    pub(crate) fn new(descriptor: ColorSpaceDescriptor) -> Self {
        Self { descriptor }
    }

    pub(crate) fn shared(descriptor: ColorSpaceDescriptor) -> ColorSpaceRef {
        Arc::new(Self::new(descriptor))
    }

    pub fn descriptor(&self) -> &ColorSpaceDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn is_srgb(&self) -> bool {
        self.descriptor.is_srgb()
    }
}

impl PartialEq for ColorSpace {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Color space policy for displays.
///
/// `FollowActiveMonitor` re-resolves the effective space from whichever
/// monitor the window is on each time it is queried.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DisplayColorSpace {
    Explicit(ColorSpaceRef),
    #[default]
    FollowActiveMonitor,
}

impl DisplayColorSpace {
    pub fn from_option(cs: Option<ColorSpaceRef>) -> Self {
        match cs {
            Some(cs) => DisplayColorSpace::Explicit(cs),
            None => DisplayColorSpace::FollowActiveMonitor,
        }
    }

    pub fn explicit(&self) -> Option<&ColorSpaceRef> {
        match self {
            DisplayColorSpace::Explicit(cs) => Some(cs),
            DisplayColorSpace::FollowActiveMonitor => None,
        }
    }

    pub fn follows_active_monitor(&self) -> bool {
        matches!(self, DisplayColorSpace::FollowActiveMonitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_compare_color_spaces_by_descriptor_not_identity() {
        let a = ColorSpace::shared(ColorSpaceDescriptor::display_p3());
        let b = ColorSpace::shared(ColorSpaceDescriptor::display_p3());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_ne!(*a, *ColorSpace::shared(ColorSpaceDescriptor::srgb()));
    }

    #[test]
    fn it_should_recognise_parametric_srgb() {
        let parametric = ColorSpaceDescriptor::Rgb {
            name: "sRGB IEC61966-2.1".to_string(),
            transfer: TransferFn::Srgb,
            primaries: Primaries::SRGB,
        };
        assert!(parametric.is_srgb());
        assert!(!ColorSpaceDescriptor::display_p3().is_srgb());
        assert!(!ColorSpaceDescriptor::icc("x", vec![1]).is_srgb());

        assert!(parametric.same_encoding(&ColorSpaceDescriptor::srgb()));
        assert!(!parametric.same_encoding(&ColorSpaceDescriptor::display_p3()));
        let profile = ColorSpaceDescriptor::icc("x", vec![1]);
        assert!(profile.same_encoding(&profile.clone()));
        assert!(!profile.same_encoding(&ColorSpaceDescriptor::icc("x", vec![2])));
    }

    #[test]
    fn it_should_reject_malformed_descriptors() {
        let bad_gamma = ColorSpaceDescriptor::Rgb {
            name: "bad".to_string(),
            transfer: TransferFn::Gamma(0.0),
            primaries: Primaries::SRGB,
        };
        assert!(matches!(
            bad_gamma.validate(),
            Err(SystemError::InvalidArgument(_))
        ));

        let collapsed = ColorSpaceDescriptor::Rgb {
            name: "collapsed".to_string(),
            transfer: TransferFn::Linear,
            primaries: Primaries {
                red: Chromaticity::new(0.3, 0.3),
                green: Chromaticity::new(0.3, 0.3),
                blue: Chromaticity::new(0.3, 0.3),
                white: Chromaticity::new(0.3127, 0.3290),
            },
        };
        assert!(collapsed.validate().is_err());
        assert!(ColorSpaceDescriptor::icc("empty", Vec::new()).validate().is_err());
        assert!(ColorSpaceDescriptor::adobe_rgb().validate().is_ok());
    }

    #[test]
    fn it_should_round_trip_the_transfer_curves() {
        for tf in [TransferFn::Srgb, TransferFn::Gamma(2.2), TransferFn::Linear] {
            for i in 0..=10 {
                let v = i as f64 / 10.0;
                assert!((tf.encode(tf.decode(v)) - v).abs() < 1e-9, "{:?} at {}", tf, v);
            }
        }
    }

    #[test]
    fn it_should_treat_none_as_follow_active_monitor() {
        assert!(DisplayColorSpace::from_option(None).follows_active_monitor());
        let cs = ColorSpace::shared(ColorSpaceDescriptor::srgb());
        let policy = DisplayColorSpace::from_option(Some(cs.clone()));
        assert_eq!(policy.explicit(), Some(&cs));
    }
}
