//! Property tests for settings validation and metadata assembly.

use depthrig::types::{DeviceMetadata, Intrinsics};
use depthrig::CaptureSettings;
use proptest::prelude::*;

proptest! {
    #[test]
    fn positive_dimensions_always_validate(
        width in 1u32..8192,
        height in 1u32..8192,
        fps in 1u32..240,
    ) {
        prop_assert!(CaptureSettings::new(width, height, fps).is_ok());
    }

    #[test]
    fn zero_dimension_always_rejected(
        zeroed in 0usize..3,
        width in 1u32..8192,
        height in 1u32..8192,
        fps in 1u32..240,
    ) {
        let (width, height, fps) = match zeroed {
            0 => (0, height, fps),
            1 => (width, 0, fps),
            _ => (width, height, 0),
        };
        prop_assert!(CaptureSettings::new(width, height, fps).is_err());
    }

    #[test]
    fn disabled_streams_always_rejected(
        enable_depth: bool,
        enable_color: bool,
        align_depth_to_color: bool,
    ) {
        prop_assume!(!(enable_depth && enable_color && align_depth_to_color));
        let settings = CaptureSettings {
            enable_depth,
            enable_color,
            align_depth_to_color,
            ..CaptureSettings::default()
        };
        prop_assert!(settings.validated().is_err());
    }

    #[test]
    fn intrinsic_matrix_has_pinhole_form(
        fx in 1.0f32..4000.0,
        fy in 1.0f32..4000.0,
        ppx in 0.0f32..4000.0,
        ppy in 0.0f32..4000.0,
    ) {
        let intrinsics = Intrinsics {
            width: 1280,
            height: 720,
            fx,
            fy,
            ppx,
            ppy,
            coeffs: vec![0.0; 5],
        };
        let meta = DeviceMetadata::from_intrinsics("cam", "0001", 0.001, &intrinsics);
        prop_assert_eq!(meta.intrinsic_matrix, [
            [fx, 0.0, ppx],
            [0.0, fy, ppy],
            [0.0, 0.0, 1.0],
        ]);
    }
}
