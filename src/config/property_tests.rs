//! Property-based tests for configuration module
//!
//! These tests use proptest to generate random configurations and verify
//! validation bounds.

use super::*;
use proptest::prelude::*;

prop_compose! {
    fn valid_frame_config()(
        decoration_thickness in 0u32..200,
        bottom in any::<bool>(),
        focus_new_windows in any::<bool>(),
        follow_moved_window in any::<bool>(),
    ) -> FrameConfig {
        FrameConfig {
            decoration_thickness,
            decoration_edge: if bottom { DecorationEdge::Bottom } else { DecorationEdge::Top },
            focus_new_windows,
            follow_moved_window,
        }
    }
}

prop_compose! {
    fn valid_screen_config()(
        x in -4000i32..4000,
        y in -4000i32..4000,
        width in 320u32..8000,
        height in 240u32..5000,
    ) -> ScreenConfig {
        ScreenConfig { x, y, width, height }
    }
}

prop_compose! {
    fn valid_config()(
        frames in valid_frame_config(),
        screen in valid_screen_config(),
        debug in any::<bool>(),
    ) -> TesseraConfig {
        TesseraConfig {
            frames,
            screen,
            general: GeneralConfig { debug },
        }
    }
}

proptest! {
    #[test]
    fn prop_valid_configs_validate(config in valid_config()) {
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn prop_decoration_at_least_screen_height_is_rejected(height in 1u32..2000, extra in 0u32..100) {
        let mut config = TesseraConfig::default();
        config.screen.height = height;
        config.frames.decoration_thickness = height + extra;
        prop_assert!(config.validate().is_err());
    }
}
