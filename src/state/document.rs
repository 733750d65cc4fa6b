//! Whole-application state documents.
//!
//! A document holds the data transform tree and the view state of every
//! display:
//!
//! ```xml
//! <VisBio version="1">
//!   <DataTransforms selected="0">
//!     <Transform tag="dataset" id="0" name="cells" pattern="c<1-2>.tif" ...>
//!       <File name="c1.tif"/>
//!       <File name="c2.tif"/>
//!     </Transform>
//!   </DataTransforms>
//!   <Displays>
//!     <Display name="3D" dim="3" links="0">
//!       <View matrix="..." aspectX="1" ... />
//!     </Display>
//!   </Displays>
//! </VisBio>
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use super::error::{Result, StateError};
use super::xml::{self, VIEW_ELEMENT};
use crate::constants::{ARRAY_DELIMITER, STATE_VERSION};
use crate::transform::{DataTransform, TransformId, TransformKind, TransformTree};
use crate::view::{DisplayMode, SavedView};

const ROOT_ELEMENT: &str = "VisBio";
const TRANSFORMS_ELEMENT: &str = "DataTransforms";
const TRANSFORM_ELEMENT: &str = "Transform";
const FILE_ELEMENT: &str = "File";
const DISPLAYS_ELEMENT: &str = "Displays";
const DISPLAY_ELEMENT: &str = "Display";

/// Saved state of one display window.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub name: String,
    pub mode: DisplayMode,
    /// Transforms shown in the display, in link order
    pub links: Vec<TransformId>,
    pub view: SavedView,
}

impl DisplayState {
    pub fn new(name: impl Into<String>, mode: DisplayMode) -> Self {
        Self {
            name: name.into(),
            mode,
            links: Vec::new(),
            view: SavedView::default(),
        }
    }
}

/// Everything persisted between sessions.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub displays: Vec<DisplayState>,
    pub transforms: TransformTree,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(&self, name: &str) -> Option<&DisplayState> {
        self.displays.iter().find(|d| d.name == name)
    }

    pub fn display_mut(&mut self, name: &str) -> Option<&mut DisplayState> {
        self.displays.iter_mut().find(|d| d.name == name)
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Serialize to an XML document.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;

        let mut root = BytesStart::new(ROOT_ELEMENT);
        root.push_attribute(("version", STATE_VERSION));
        write(&mut writer, Event::Start(root))?;

        self.write_transforms(&mut writer)?;
        self.write_displays(&mut writer)?;

        write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

        String::from_utf8(writer.into_inner())
            .map_err(|_| StateError::invalid("Invalid UTF-8 in XML"))
    }

    fn write_transforms<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut element = BytesStart::new(TRANSFORMS_ELEMENT);
        if let Some(id) = self.transforms.selected_id() {
            element.push_attribute(("selected", id.to_string().as_str()));
        }
        write(writer, Event::Start(element))?;

        for transform in self.transforms.iter() {
            let mut element = BytesStart::new(TRANSFORM_ELEMENT);
            element.push_attribute(("tag", transform.kind.tag()));
            element.push_attribute(("id", transform.id.to_string().as_str()));
            element.push_attribute(("name", transform.name.as_str()));
            if let Some(parent) = transform.parent {
                element.push_attribute(("parent", parent.to_string().as_str()));
            }
            for (key, value) in transform.kind.attributes() {
                element.push_attribute((key, value.as_str()));
            }

            let files = transform.kind.files();
            if files.is_empty() {
                write(writer, Event::Empty(element))?;
                continue;
            }
            write(writer, Event::Start(element))?;
            for file in files {
                let mut element = BytesStart::new(FILE_ELEMENT);
                element.push_attribute(("name", file.as_str()));
                write(writer, Event::Empty(element))?;
            }
            write(writer, Event::End(BytesEnd::new(TRANSFORM_ELEMENT)))?;
        }

        write(writer, Event::End(BytesEnd::new(TRANSFORMS_ELEMENT)))
    }

    fn write_displays<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        write(writer, Event::Start(BytesStart::new(DISPLAYS_ELEMENT)))?;

        for display in &self.displays {
            let links = display
                .links
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(&ARRAY_DELIMITER.to_string());

            let mut element = BytesStart::new(DISPLAY_ELEMENT);
            element.push_attribute(("name", display.name.as_str()));
            element.push_attribute(("dim", display.mode.dims().to_string().as_str()));
            element.push_attribute(("links", links.as_str()));
            write(writer, Event::Start(element))?;
            xml::write_view(writer, &display.view)?;
            write(writer, Event::End(BytesEnd::new(DISPLAY_ELEMENT)))?;
        }

        write(writer, Event::End(BytesEnd::new(DISPLAYS_ELEMENT)))
    }

    /// Write the document to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let xml = self.to_xml()?;
        std::fs::write(path, xml)?;
        log::info!(
            "Saved state with {} display(s) and {} transform(s) to {:?}",
            self.displays.len(),
            self.transforms.len(),
            path
        );
        Ok(())
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Parse an XML document.
    pub fn from_xml(content: &str) -> Result<Self> {
        let mut reader = quick_xml::Reader::from_str(content);
        reader.trim_text(true);

        let mut parser = DocumentParser::default();
        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => parser.open(e, false)?,
                Ok(Event::Empty(ref e)) => parser.open(e, true)?,
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    parser.close(&name)?;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(StateError::Xml(e)),
                _ => {}
            }
        }
        parser.finish()
    }

    /// Read a document from a file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let state = Self::from_xml(&content)?;
        log::info!(
            "Loaded state with {} display(s) and {} transform(s) from {:?}",
            state.displays.len(),
            state.transforms.len(),
            path
        );
        Ok(state)
    }
}

fn write<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| StateError::Xml(e.into()))?;
    Ok(())
}

/// Transform element whose `File` children are still being read.
struct PendingTransform {
    attrs: HashMap<String, String>,
    files: Vec<String>,
}

#[derive(Default)]
struct DocumentParser {
    state: AppState,
    seen_root: bool,
    selected: Option<TransformId>,
    transform: Option<PendingTransform>,
    display: Option<DisplayState>,
}

impl DocumentParser {
    fn open(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<()> {
        let name = xml::element_name(element);
        match name.as_str() {
            ROOT_ELEMENT => {
                self.seen_root = true;
                let attrs = xml::attributes(element)?;
                match attrs.get("version") {
                    Some(version) if version != STATE_VERSION => {
                        log::warn!("Reading state version {} as {}", version, STATE_VERSION);
                    }
                    _ => {}
                }
            }
            TRANSFORMS_ELEMENT => {
                let attrs = xml::attributes(element)?;
                self.selected = attrs
                    .get("selected")
                    .and_then(|v| v.trim().parse().ok())
                    .map(TransformId);
            }
            TRANSFORM_ELEMENT => {
                self.transform = Some(PendingTransform {
                    attrs: xml::attributes(element)?,
                    files: Vec::new(),
                });
                if empty {
                    self.finish_transform()?;
                }
            }
            FILE_ELEMENT => {
                let attrs = xml::attributes(element)?;
                let Some(pending) = self.transform.as_mut() else {
                    return Err(StateError::invalid("File element outside a transform"));
                };
                let file = attrs
                    .get("name")
                    .ok_or_else(|| StateError::missing_attribute("name"))?;
                pending.files.push(file.clone());
            }
            DISPLAY_ELEMENT => {
                let attrs = xml::attributes(element)?;
                self.display = Some(display_from_attributes(&attrs)?);
                if empty {
                    self.finish_display();
                }
            }
            VIEW_ELEMENT => {
                let attrs = xml::attributes(element)?;
                let Some(display) = self.display.as_mut() else {
                    return Err(StateError::invalid("View element outside a display"));
                };
                display.view = xml::view_from_attributes(&attrs);
            }
            DISPLAYS_ELEMENT => {}
            other => log::debug!("Skipping unknown state element <{}>", other),
        }
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        match name {
            TRANSFORM_ELEMENT => self.finish_transform()?,
            DISPLAY_ELEMENT => self.finish_display(),
            _ => {}
        }
        Ok(())
    }

    fn finish_transform(&mut self) -> Result<()> {
        let Some(PendingTransform { attrs, files }) = self.transform.take() else {
            return Ok(());
        };

        let tag = attrs
            .get("tag")
            .ok_or_else(|| StateError::missing_attribute("tag"))?;
        let id = parse_id(&attrs, "id")?.ok_or_else(|| StateError::missing_attribute("id"))?;
        let kind = TransformKind::from_tag(tag, &attrs, files)?;

        self.state.transforms.insert(DataTransform {
            id,
            name: attrs.get("name").cloned().unwrap_or_default(),
            parent: parse_id(&attrs, "parent")?,
            kind,
        })?;
        Ok(())
    }

    fn finish_display(&mut self) {
        if let Some(display) = self.display.take() {
            self.state.displays.push(display);
        }
    }

    fn finish(mut self) -> Result<AppState> {
        if !self.seen_root {
            return Err(StateError::missing_element(ROOT_ELEMENT));
        }
        if let Some(id) = self.selected {
            if !self.state.transforms.select(id) {
                log::warn!("Selected transform {} not found", id);
            }
        }
        Ok(self.state)
    }
}

fn parse_id(attrs: &HashMap<String, String>, key: &str) -> Result<Option<TransformId>> {
    attrs
        .get(key)
        .map(|v| {
            v.trim()
                .parse()
                .map(TransformId)
                .map_err(|_| StateError::invalid_value(key, v.as_str()))
        })
        .transpose()
}

fn display_from_attributes(attrs: &HashMap<String, String>) -> Result<DisplayState> {
    let name = attrs
        .get("name")
        .ok_or_else(|| StateError::missing_attribute("name"))?;

    let mode = attrs
        .get("dim")
        .and_then(|v| v.trim().parse().ok())
        .and_then(DisplayMode::from_dims)
        .unwrap_or_else(|| {
            log::warn!("Display '{}' has no valid dimension, assuming 2D", name);
            DisplayMode::TwoD
        });

    let links = attrs
        .get("links")
        .map(|v| {
            v.split(ARRAY_DELIMITER)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse() {
                    Ok(id) => Some(TransformId(id)),
                    Err(_) => {
                        log::warn!("Ignoring bad link '{}' on display '{}'", s, name);
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(DisplayState {
        name: name.clone(),
        mode,
        links,
        view: SavedView::default(),
    })
}
