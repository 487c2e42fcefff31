// src/capabilities.rs

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Optional features a platform backend may or may not support.
    ///
    /// Computed once when the backend finishes initialization and stable for
    /// the lifetime of the `System`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        /// More than one display may be open at once.
        const MULTIPLE_DISPLAYS = 1 << 0;
        /// Displays can be resized after creation.
        const CAN_RESIZE_DISPLAY = 1 << 1;
        /// Displays accept a scale factor > 1 (HiDPI backing surfaces).
        const DISPLAY_SCALE = 1 << 2;
        /// Native mouse cursors can be customized.
        const CUSTOM_NATIVE_MOUSE_CURSOR = 1 << 3;
        /// GPU acceleration can be toggled at runtime.
        const GPU_ACCELERATION_SWITCH = 1 << 4;
        /// Color management (color spaces, conversions, monitor profiles).
        const COLOR_SPACES = 1 << 5;
    }
}

impl Capabilities {
    /// True when every flag in `c` is present in `self`.
    pub fn has(self, c: Capabilities) -> bool {
        self.contains(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_report_only_the_flags_in_the_mask() {
        let caps = Capabilities::MULTIPLE_DISPLAYS | Capabilities::COLOR_SPACES;
        for flag in Capabilities::all().iter() {
            let expected = flag == Capabilities::MULTIPLE_DISPLAYS || flag == Capabilities::COLOR_SPACES;
            assert_eq!(caps.has(flag), expected, "flag {:?}", flag);
            // Pure: asking twice gives the same answer.
            assert_eq!(caps.has(flag), caps.has(flag));
        }
    }

    #[test]
    fn it_should_require_every_flag_of_a_composite_query() {
        let caps = Capabilities::DISPLAY_SCALE;
        assert!(caps.has(Capabilities::empty()));
        assert!(!caps.has(Capabilities::DISPLAY_SCALE | Capabilities::CAN_RESIZE_DISPLAY));
    }
}
