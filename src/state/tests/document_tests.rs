//! Tests for whole-document XML.

use super::sample_state;
use crate::state::{AppState, StateError};
use crate::transform::{TransformError, TransformId, TransformKind};
use crate::view::DisplayMode;

#[test]
fn test_document_layout() {
    let xml = sample_state().to_xml().unwrap();

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<VisBio version=\"1\">"));
    assert!(xml.contains("<DataTransforms selected=\"1\">"));
    assert!(xml.contains("<File name=\"cell2.tif\"/>"));
    assert!(xml.contains("links=\"0,1\""));

    let transforms = xml.find("<DataTransforms").unwrap();
    let displays = xml.find("<Displays").unwrap();
    assert!(transforms < displays, "transforms must be written first");
}

#[test]
fn test_document_survives_save_and_load() {
    let state = sample_state();
    let loaded = AppState::from_xml(&state.to_xml().unwrap()).unwrap();

    assert_eq!(loaded.displays, state.displays);
    assert_eq!(loaded.transforms.len(), 3);
    assert_eq!(loaded.transforms.selected_id(), Some(TransformId(1)));
    for (a, b) in loaded.transforms.iter().zip(state.transforms.iter()) {
        assert!(a.same_as(b), "transform {} changed", a.id);
    }
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.xml");

    let state = sample_state();
    state.save_to_file(&path).unwrap();
    let loaded = AppState::load_from_file(&path).unwrap();

    assert_eq!(loaded.displays, state.displays);
    assert_eq!(loaded.transforms.len(), state.transforms.len());
}

#[test]
fn test_missing_root_is_an_error() {
    let err = AppState::from_xml("<Displays/>").unwrap_err();
    assert!(matches!(err, StateError::MissingElement { .. }));
}

#[test]
fn test_unknown_transform_tag_is_an_error() {
    let xml = r#"<VisBio version="1">
        <DataTransforms>
          <Transform tag="spectral" id="0" name="x"/>
        </DataTransforms>
    </VisBio>"#;
    let err = AppState::from_xml(xml).unwrap_err();
    assert!(matches!(err, StateError::UnknownTransform { ref tag } if tag == "spectral"));
}

#[test]
fn test_orphan_transform_is_an_error() {
    let xml = r#"<VisBio version="1">
        <DataTransforms>
          <Transform tag="projection" id="3" name="mip" parent="9"/>
        </DataTransforms>
    </VisBio>"#;
    let err = AppState::from_xml(xml).unwrap_err();
    assert!(matches!(err, StateError::Transform(_)));
}

#[test]
fn test_largest_transform_id_is_an_error() {
    let xml = r#"<VisBio version="1">
        <DataTransforms>
          <Transform tag="dataset" id="4294967295" name="raw" pattern="a.png" width="10" height="20" slices="1">
            <File name="a.png"/>
          </Transform>
        </DataTransforms>
    </VisBio>"#;
    let err = AppState::from_xml(xml).unwrap_err();
    assert!(matches!(
        err,
        StateError::Transform(TransformError::IdOverflow(TransformId(u32::MAX)))
    ));
}

#[test]
fn test_lenient_display_attributes() {
    let xml = r#"<VisBio>
        <Displays>
          <Display name="odd" dim="7" links="0,x,2">
            <View matrix="garbage" aspectX="2"/>
          </Display>
          <Display name="bare"/>
        </Displays>
    </VisBio>"#;
    let state = AppState::from_xml(xml).unwrap();

    let odd = state.display("odd").unwrap();
    assert_eq!(odd.mode, DisplayMode::TwoD);
    assert_eq!(odd.links, vec![TransformId(0), TransformId(2)]);
    assert!(odd.view.matrix.is_none());
    assert_eq!(odd.view.aspect.x, 2.0);

    let bare = state.display("bare").unwrap();
    assert!(bare.links.is_empty());
    assert!(bare.view.matrix.is_none());
}

#[test]
fn test_dataset_without_calibration() {
    let xml = r#"<VisBio version="1">
        <DataTransforms>
          <Transform tag="dataset" id="4" name="raw" pattern="a.png" width="10" height="20" slices="1">
            <File name="a.png"/>
          </Transform>
        </DataTransforms>
    </VisBio>"#;
    let state = AppState::from_xml(xml).unwrap();
    let raw = state.transforms.get(TransformId(4)).unwrap();
    match &raw.kind {
        TransformKind::Dataset { files, image, .. } => {
            assert_eq!(files, &vec!["a.png".to_string()]);
            assert!(!image.is_calibrated());
        }
        other => panic!("unexpected kind {:?}", other),
    }
    assert!(state.transforms.selected().is_none());
}

#[test]
fn test_unknown_selection_is_ignored() {
    let xml = r#"<VisBio><DataTransforms selected="5"/></VisBio>"#;
    let state = AppState::from_xml(xml).unwrap();
    assert!(state.transforms.is_empty());
    assert!(state.transforms.selected_id().is_none());
}
