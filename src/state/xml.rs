//! XML helpers shared by the state readers and writers.
//!
//! View state is stored as a single `View` element whose attributes hold the
//! matrix (in the array-to-string form of [`Matrix4`]), the three aspect
//! values and the three display switches. Reading is lenient: unreadable
//! numbers fall back to defaults with a warning.

use std::collections::HashMap;
use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use super::error::{Result, StateError};
use crate::view::{Aspect, Matrix4, SavedView};

/// Element holding one display's view state.
pub const VIEW_ELEMENT: &str = "View";

/// Write a `View` element.
pub fn write_view<W: Write>(writer: &mut Writer<W>, view: &SavedView) -> Result<()> {
    let mut element = BytesStart::new(VIEW_ELEMENT);
    if let Some(matrix) = &view.matrix {
        element.push_attribute(("matrix", matrix.to_string().as_str()));
    }
    element.push_attribute(("aspectX", view.aspect.x.to_string().as_str()));
    element.push_attribute(("aspectY", view.aspect.y.to_string().as_str()));
    element.push_attribute(("aspectZ", view.aspect.z.to_string().as_str()));
    element.push_attribute(("showScale", bool_str(view.show_scale)));
    element.push_attribute(("boundingBox", bool_str(view.bounding_box)));
    element.push_attribute(("parallel", bool_str(view.parallel)));

    writer
        .write_event(Event::Empty(element))
        .map_err(|e| StateError::Xml(e.into()))?;
    Ok(())
}

/// Build a view from the attributes of a `View` element.
pub fn view_from_attributes(attrs: &HashMap<String, String>) -> SavedView {
    let defaults = SavedView::default();

    let matrix = attrs.get("matrix").and_then(|text| {
        let parsed = Matrix4::parse(text);
        if parsed.is_none() {
            log::warn!("Ignoring unreadable view matrix '{}'", text);
        }
        parsed
    });

    SavedView {
        matrix,
        aspect: Aspect::new(
            aspect_value(attrs, "aspectX"),
            aspect_value(attrs, "aspectY"),
            aspect_value(attrs, "aspectZ"),
        ),
        show_scale: flag(attrs, "showScale", defaults.show_scale),
        bounding_box: flag(attrs, "boundingBox", defaults.bounding_box),
        parallel: flag(attrs, "parallel", defaults.parallel),
    }
}

/// Read the first `View` element of an XML fragment.
pub fn read_view_str(xml: &str) -> Result<SavedView> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == VIEW_ELEMENT.as_bytes() =>
            {
                return Ok(view_from_attributes(&attributes(e)?));
            }
            Ok(Event::Eof) => return Err(StateError::missing_element(VIEW_ELEMENT)),
            Err(e) => return Err(StateError::Xml(e)),
            _ => {}
        }
    }
}

/// Collect the attributes of an element into a map.
pub fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| StateError::Xml(e.into()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| StateError::Xml(e.into()))?
            .to_string();
        map.insert(key, value);
    }
    Ok(map)
}

/// Element name as an owned string.
pub fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).to_string()
}

pub fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Boolean attribute, true only for a case-insensitive `"true"`.
fn flag(attrs: &HashMap<String, String>, key: &str, default: bool) -> bool {
    attrs
        .get(key)
        .map_or(default, |v| v.trim().eq_ignore_ascii_case("true"))
}

/// Stored aspect component; anything unusable reads as 1.
fn aspect_value(attrs: &HashMap<String, String>, key: &str) -> f64 {
    let Some(text) = attrs.get(key) else {
        return 1.0;
    };
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => {
            log::warn!("Ignoring unreadable {} '{}'", key, text);
            1.0
        }
    }
}
