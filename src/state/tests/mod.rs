//! Tests for saving, loading and merging application state.

mod document_tests;

use crate::state::{AppState, DisplayState};
use crate::transform::{TransformKind, TransformTree};
use crate::view::{Aspect, DisplayMode, ImageInfo, Matrix4, SavedView};

/// Build a state with one dataset, two derived transforms and two displays.
pub(super) fn sample_state() -> AppState {
    let mut transforms = TransformTree::new();
    let data = transforms
        .add(
            "cells",
            None,
            TransformKind::Dataset {
                pattern: "cell<1-2>.tif".to_string(),
                files: vec!["cell1.tif".into(), "cell2.tif".into()],
                image: ImageInfo {
                    width: 640,
                    height: 480,
                    slices: 12,
                    micron_width: 64.0,
                    micron_height: 48.0,
                    micron_step: 0.5,
                },
            },
        )
        .unwrap();
    let sub = transforms
        .add("half", Some(data), TransformKind::Subsample { x: 2, y: 2, z: 1 })
        .unwrap();
    transforms
        .add("mip", Some(sub), TransformKind::MaxProjection)
        .unwrap();
    transforms.select(sub);

    let mut flat = DisplayState::new("2D", DisplayMode::TwoD);
    flat.links = vec![sub];
    flat.view = SavedView {
        matrix: Some(Matrix4::make(0.0, 0.0, 0.0, 0.9, 0.1, -0.2, 0.0)),
        show_scale: true,
        ..SavedView::default()
    };

    let mut volume = DisplayState::new("3D", DisplayMode::ThreeD);
    volume.links = vec![data, sub];
    volume.view = SavedView {
        matrix: Some(Matrix4::make(-60.0, 0.0, -30.0, 0.5, 0.0, 0.0, 0.0)),
        aspect: Aspect::new(1.0, 0.75, 0.1),
        show_scale: false,
        bounding_box: false,
        parallel: true,
    };

    AppState {
        displays: vec![flat, volume],
        transforms,
    }
}
