//! View transform handler.
//!
//! A [`ViewHandler`] owns the camera state of one display: the projection
//! matrix, the aspect ratios and the scale / bounding box / parallel
//! projection switches. Every change goes through the handler, which pushes
//! it to the live display and only remembers it once the display accepted
//! it. Display failures are logged and leave the handler untouched.

use std::io::Write;

use quick_xml::Writer;

use super::aspect::Aspect;
use super::display::{Display, DisplayError, DisplayMode};
use super::matrix::Matrix4;
use crate::config::ViewConfig;
use crate::state::{self, StateError};

/// Camera state of one display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub matrix: Matrix4,
    pub aspect: Aspect,
    pub show_scale: bool,
    pub bounding_box: bool,
    pub parallel: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
            aspect: Aspect::unit(),
            show_scale: false,
            bounding_box: true,
            parallel: false,
        }
    }
}

/// View state as read back from a saved document.
///
/// `matrix` is `None` when the stored matrix was missing or unreadable, in
/// which case the handler computes its default camera on init.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedView {
    pub matrix: Option<Matrix4>,
    pub aspect: Aspect,
    pub show_scale: bool,
    pub bounding_box: bool,
    pub parallel: bool,
}

impl From<ViewState> for SavedView {
    fn from(state: ViewState) -> Self {
        Self {
            matrix: Some(state.matrix),
            aspect: state.aspect,
            show_scale: state.show_scale,
            bounding_box: state.bounding_box,
            parallel: state.parallel,
        }
    }
}

impl Default for SavedView {
    fn default() -> Self {
        let state = ViewState::default();
        Self {
            matrix: None,
            ..SavedView::from(state)
        }
    }
}

/// Owns and mutates the view transform of one display.
#[derive(Debug)]
pub struct ViewHandler<D: Display> {
    display: Option<D>,
    mode: DisplayMode,
    state: ViewState,
    /// Whether `state.matrix` came from a restore and should survive init
    loaded: bool,
    config: ViewConfig,
}

impl<D: Display> ViewHandler<D> {
    /// Create a handler driving `display`.
    pub fn new(display: D, config: ViewConfig) -> Self {
        let mode = display.mode();
        Self {
            display: Some(display),
            mode,
            state: ViewState::default(),
            loaded: false,
            config,
        }
    }

    /// Create a handler with no live display; changes only touch the
    /// remembered state.
    pub fn detached(mode: DisplayMode, config: ViewConfig) -> Self {
        Self {
            display: None,
            mode,
            state: ViewState::default(),
            loaded: false,
            config,
        }
    }

    /// Attach a live display. Call [`ViewHandler::init_state`] afterwards to
    /// push the remembered state to it.
    pub fn attach(&mut self, display: D) {
        self.mode = display.mode();
        self.display = Some(display);
    }

    /// Detach and return the live display.
    pub fn detach(&mut self) -> Option<D> {
        self.display.take()
    }

    pub fn display(&self) -> Option<&D> {
        self.display.as_ref()
    }

    pub fn display_mut(&mut self) -> Option<&mut D> {
        self.display.as_mut()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn aspect(&self) -> Aspect {
        self.state.aspect
    }

    pub fn show_scale(&self) -> bool {
        self.state.show_scale
    }

    pub fn bounding_box(&self) -> bool {
        self.state.bounding_box
    }

    pub fn parallel(&self) -> bool {
        self.state.parallel
    }

    /// Current projection matrix.
    ///
    /// Queries the live display when there is one and falls back to the
    /// remembered matrix otherwise (or when the query fails).
    pub fn matrix(&self) -> Matrix4 {
        match &self.display {
            Some(display) => match display.projection_matrix() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Could not read projection matrix: {}", e);
                    self.state.matrix
                }
            },
            None => self.state.matrix,
        }
    }

    /// Full state with the live matrix.
    pub fn snapshot(&self) -> ViewState {
        ViewState {
            matrix: self.matrix(),
            ..self.state
        }
    }

    /// State in its persisted form.
    pub fn saved(&self) -> SavedView {
        SavedView::from(self.snapshot())
    }

    /// Default camera for this display's mode, with the current aspect.
    pub fn default_matrix(&self) -> Matrix4 {
        let camera = match self.mode {
            DisplayMode::TwoD => Matrix4::make(
                0.0,
                0.0,
                0.0,
                self.config.default_zoom_2d,
                0.0,
                0.0,
                0.0,
            ),
            DisplayMode::ThreeD => {
                let [rx, ry, rz] = self.config.default_rotation_3d;
                Matrix4::make(rx, ry, rz, self.config.default_zoom_3d, 0.0, 0.0, 0.0)
            }
        };
        let a = self.state.aspect;
        camera.multiply(&Matrix4::scale_xyz(a.x, a.y, a.z))
    }

    // ========================================================================
    // Matrix operations
    // ========================================================================

    /// Scale the view by `scale`.
    pub fn zoom(&mut self, scale: f64) {
        if !(scale.is_finite() && scale > 0.0) {
            log::warn!("Ignoring invalid zoom factor {}", scale);
            return;
        }
        self.apply_delta(&Matrix4::scale(scale), "zoom");
    }

    pub fn zoom_in(&mut self) {
        self.zoom(self.config.zoom_factor);
    }

    pub fn zoom_out(&mut self) {
        self.zoom(1.0 / self.config.zoom_factor);
    }

    /// Rotate the view about the X, Y and Z axes, in degrees.
    pub fn rotate(&mut self, rx: f64, ry: f64, rz: f64) {
        self.apply_delta(&Matrix4::rotation(rx, ry, rz), "rotate");
    }

    /// Roll clockwise.
    pub fn rotate_clockwise(&mut self) {
        self.rotate(0.0, 0.0, -self.config.rotation_step);
    }

    /// Roll counterclockwise.
    pub fn rotate_counterclockwise(&mut self) {
        self.rotate(0.0, 0.0, self.config.rotation_step);
    }

    /// Yaw left. Meaningful on 3D displays only, but not restricted.
    pub fn rotate_left(&mut self) {
        self.rotate(0.0, -self.config.rotation_step, 0.0);
    }

    pub fn rotate_right(&mut self) {
        self.rotate(0.0, self.config.rotation_step, 0.0);
    }

    /// Pitch up. Meaningful on 3D displays only, but not restricted.
    pub fn rotate_up(&mut self) {
        self.rotate(-self.config.rotation_step, 0.0, 0.0);
    }

    pub fn rotate_down(&mut self) {
        self.rotate(self.config.rotation_step, 0.0, 0.0);
    }

    /// Translate the view by normalized display units.
    pub fn pan(&mut self, px: f64, py: f64, pz: f64) {
        self.apply_delta(&Matrix4::translation(px, py, pz), "pan");
    }

    pub fn pan_left(&mut self) {
        self.pan(-self.config.pan_step, 0.0, 0.0);
    }

    pub fn pan_right(&mut self) {
        self.pan(self.config.pan_step, 0.0, 0.0);
    }

    pub fn pan_up(&mut self) {
        self.pan(0.0, self.config.pan_step, 0.0);
    }

    pub fn pan_down(&mut self) {
        self.pan(0.0, -self.config.pan_step, 0.0);
    }

    /// Change the aspect ratios.
    ///
    /// Values are normalized with [`Aspect::normalized`]. The previous aspect
    /// scaling is undone from the current matrix before the new one is
    /// applied, both on the data side of the matrix.
    pub fn set_aspect(&mut self, x: f64, y: f64, z: f64) {
        let aspect = Aspect::normalized(x, y, z);
        let old = self.state.aspect;
        let matrix = self
            .matrix()
            .multiply(&Matrix4::aspect_undo(old.x, old.y, old.z))
            .multiply(&Matrix4::scale_xyz(aspect.x, aspect.y, aspect.z));

        if self.push_matrix(matrix, "set aspect") {
            log::debug!(
                "Aspect set to ({}, {}, {})",
                aspect.x,
                aspect.y,
                aspect.z
            );
            self.state.aspect = aspect;
        }
    }

    /// Derive the aspect from the first linked image source.
    pub fn guess_aspect(&mut self) {
        let Some(info) = self
            .display
            .as_ref()
            .and_then(|d| d.linked_images().into_iter().next())
        else {
            log::debug!("No linked image to guess aspect from");
            return;
        };
        let aspect = Aspect::guess(&info);
        self.set_aspect(aspect.x, aspect.y, aspect.z);
    }

    /// Restore the default camera.
    ///
    /// Displays with a native reset use it and then get the aspect through
    /// their native aspect path; the others receive the default matrix with
    /// the aspect folded in.
    pub fn reset(&mut self) {
        let native = match self.display.as_mut().map(|d| d.reset_projection()) {
            Some(Ok(native)) => native,
            Some(Err(e)) => {
                log::warn!("Could not reset projection: {}", e);
                return;
            }
            None => false,
        };

        if !native {
            let matrix = self.default_matrix();
            self.push_matrix(matrix, "reset view");
            return;
        }

        let aspect = self.state.aspect;
        let Some(display) = self.display.as_mut() else {
            return;
        };
        if let Err(e) = display.set_aspect(aspect) {
            log::warn!("Could not reapply aspect after reset: {}", e);
        }
        match display.projection_matrix() {
            Ok(m) => self.state.matrix = m,
            Err(e) => log::warn!("Could not read projection matrix after reset: {}", e),
        }
    }

    // ========================================================================
    // Display switches
    // ========================================================================

    pub fn toggle_scale(&mut self, on: bool) {
        if self.push("toggle scale", |d| d.set_scale_enabled(on)) {
            self.state.show_scale = on;
        }
    }

    pub fn toggle_bounding_box(&mut self, on: bool) {
        if self.push("toggle bounding box", |d| d.set_box_visible(on)) {
            self.state.bounding_box = on;
        }
    }

    /// Switch parallel projection. Only 3D displays receive the change;
    /// 2D displays just remember the flag.
    pub fn toggle_parallel(&mut self, on: bool) {
        if !self.mode.is_3d() {
            log::debug!("Parallel projection ignored on a 2D display");
            self.state.parallel = on;
            return;
        }
        if self.push("toggle parallel projection", |d| {
            d.set_parallel_projection(on)
        }) {
            self.state.parallel = on;
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Whether two handlers hold interchangeable state.
    pub fn matches<E: Display>(&self, other: &ViewHandler<E>) -> bool {
        self.snapshot() == other.snapshot()
    }

    /// Establish the state and push all of it to the display.
    ///
    /// With a `source` its state is copied wholesale. Otherwise a restored
    /// state is kept, or the default camera is computed when nothing was
    /// restored. The eye separation comes from the handler's config.
    pub fn init_state(&mut self, source: Option<&ViewState>) {
        if let Some(source) = source {
            self.state = *source;
        } else if !self.loaded {
            self.state.matrix = self.default_matrix();
        }
        self.loaded = false;

        let state = self.state;
        let Some(display) = self.display.as_mut() else {
            return;
        };
        log_failure("apply matrix", display.set_projection_matrix(&state.matrix));
        log_failure("toggle scale", display.set_scale_enabled(state.show_scale));
        log_failure("toggle bounding box", display.set_box_visible(state.bounding_box));
        if self.mode.is_3d() {
            log_failure(
                "toggle parallel projection",
                display.set_parallel_projection(state.parallel),
            );
        }
        log_failure(
            "set eye separation",
            display.set_eye_separation(self.config.eye_separation),
        );
    }

    /// Load a saved state; takes effect on the next [`ViewHandler::init_state`].
    pub fn restore_state(&mut self, saved: &SavedView) {
        self.state.aspect = saved.aspect;
        self.state.show_scale = saved.show_scale;
        self.state.bounding_box = saved.bounding_box;
        self.state.parallel = saved.parallel;
        if let Some(matrix) = saved.matrix {
            self.state.matrix = matrix;
            self.loaded = true;
        }
    }

    /// Restore from the first `View` element of an XML fragment.
    pub fn restore_state_str(&mut self, xml: &str) -> Result<(), StateError> {
        let saved = state::xml::read_view_str(xml)?;
        self.restore_state(&saved);
        Ok(())
    }

    /// Write the state as a `View` element.
    pub fn save_state<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), StateError> {
        state::xml::write_view(writer, &self.saved())
    }

    /// The state as a standalone `View` element.
    pub fn save_state_string(&self) -> Result<String, StateError> {
        let mut writer = Writer::new(Vec::new());
        self.save_state(&mut writer)?;
        String::from_utf8(writer.into_inner())
            .map_err(|_| StateError::invalid("Invalid UTF-8 in XML"))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn apply_delta(&mut self, delta: &Matrix4, what: &str) {
        let matrix = Matrix4::compose(delta, &self.matrix());
        self.push_matrix(matrix, what);
    }

    /// Push a matrix and remember it if the display accepted it.
    fn push_matrix(&mut self, matrix: Matrix4, what: &str) -> bool {
        if self.push(what, |d| d.set_projection_matrix(&matrix)) {
            self.state.matrix = matrix;
            true
        } else {
            false
        }
    }

    fn push<F>(&mut self, what: &str, f: F) -> bool
    where
        F: FnOnce(&mut D) -> Result<(), DisplayError>,
    {
        match self.display.as_mut() {
            Some(display) => match f(display) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Could not {}: {}", what, e);
                    false
                }
            },
            None => true,
        }
    }
}

fn log_failure(what: &str, result: Result<(), DisplayError>) {
    if let Err(e) = result {
        log::warn!("Could not {}: {}", what, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::display::{ImageInfo, MemoryDisplay};

    const EPSILON: f64 = 1e-9;

    fn handler(mode: DisplayMode) -> ViewHandler<MemoryDisplay> {
        let mut h = ViewHandler::new(MemoryDisplay::new(mode), ViewConfig::default());
        h.init_state(None);
        h
    }

    #[test]
    fn test_zoom_in_then_out_restores_matrix() {
        let mut h = handler(DisplayMode::ThreeD);
        h.rotate(10.0, 20.0, 30.0);
        let before = h.matrix();

        h.zoom_in();
        assert!(!h.matrix().approx_eq(&before, EPSILON));
        h.zoom_out();
        assert!(h.matrix().approx_eq(&before, EPSILON));
    }

    #[test]
    fn test_four_clockwise_steps_equal_sixty_degrees() {
        let mut a = handler(DisplayMode::TwoD);
        let mut b = handler(DisplayMode::TwoD);

        for _ in 0..4 {
            a.rotate_clockwise();
        }
        b.rotate(0.0, 0.0, -60.0);

        assert!(a.matrix().approx_eq(&b.matrix(), EPSILON));
    }

    #[test]
    fn test_operations_compose_on_the_left() {
        let mut h = handler(DisplayMode::TwoD);
        let before = h.matrix();
        h.pan_right();
        let expected = Matrix4::compose(&Matrix4::translation(0.25, 0.0, 0.0), &before);
        assert!(h.matrix().approx_eq(&expected, EPSILON));
    }

    #[test]
    fn test_pan_steps_cancel() {
        let mut h = handler(DisplayMode::TwoD);
        let before = h.matrix();
        h.pan_up();
        h.pan_left();
        h.pan_down();
        h.pan_right();
        assert!(h.matrix().approx_eq(&before, EPSILON));
    }

    #[test]
    fn test_invalid_zoom_is_ignored() {
        let mut h = handler(DisplayMode::TwoD);
        let before = h.matrix();
        h.zoom(0.0);
        h.zoom(f64::NAN);
        h.zoom(-2.0);
        assert_eq!(h.matrix(), before);
    }

    #[test]
    fn test_set_aspect_normalizes() {
        let mut h = handler(DisplayMode::ThreeD);
        h.set_aspect(300.0, 600.0, 150.0);
        let a = h.aspect();
        assert_eq!(a.x.max(a.y), 1.0);
        assert!((a.x - 0.5).abs() < EPSILON);
        assert!((a.z - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_set_aspect_replaces_previous_scaling() {
        let mut a = handler(DisplayMode::ThreeD);
        a.set_aspect(1.0, 0.5, 2.0);
        a.set_aspect(0.25, 1.0, 0.5);

        let mut b = handler(DisplayMode::ThreeD);
        b.set_aspect(0.25, 1.0, 0.5);

        assert!(a.matrix().approx_eq(&b.matrix(), EPSILON));
    }

    #[test]
    fn test_failed_push_leaves_state_untouched() {
        let mut h = handler(DisplayMode::ThreeD);
        let before = h.snapshot();
        h.display_mut().unwrap().failing = true;

        h.zoom_in();
        h.rotate_left();
        h.set_aspect(2.0, 1.0, 1.0);
        h.toggle_scale(true);
        h.toggle_bounding_box(false);
        h.toggle_parallel(true);

        h.display_mut().unwrap().failing = false;
        assert_eq!(h.snapshot(), before);
    }

    #[test]
    fn test_matrix_falls_back_without_display() {
        let mut h = handler(DisplayMode::TwoD);
        h.zoom_in();
        let live = h.matrix();
        let display = h.detach().unwrap();
        assert_eq!(display.matrix, live);
        assert_eq!(h.matrix(), live);
    }

    #[test]
    fn test_detached_handler_tracks_state() {
        let mut h: ViewHandler<MemoryDisplay> =
            ViewHandler::detached(DisplayMode::TwoD, ViewConfig::default());
        h.init_state(None);
        let start = h.matrix();
        h.zoom(2.0);
        assert!(h.matrix().approx_eq(&Matrix4::scale(2.0).multiply(&start), EPSILON));
        h.toggle_scale(true);
        assert!(h.show_scale());
    }

    #[test]
    fn test_toggles_reach_display() {
        let mut h = handler(DisplayMode::ThreeD);
        h.toggle_scale(true);
        h.toggle_bounding_box(false);
        h.toggle_parallel(true);

        let d = h.display().unwrap();
        assert!(d.scale_enabled);
        assert!(!d.box_visible);
        assert!(d.parallel);
        assert!(h.show_scale() && !h.bounding_box() && h.parallel());
    }

    #[test]
    fn test_parallel_not_pushed_on_2d() {
        let mut h = handler(DisplayMode::TwoD);
        h.toggle_parallel(true);
        assert!(!h.display().unwrap().parallel);
    }

    #[test]
    fn test_reset_native_and_generic_agree() {
        let config = ViewConfig::default();
        let generic_display = MemoryDisplay::new(DisplayMode::ThreeD);
        let mut generic = ViewHandler::new(generic_display, config);
        generic.init_state(None);

        let home = generic.default_matrix();
        let native_display = MemoryDisplay::new(DisplayMode::ThreeD).with_native_reset(home);
        let mut native = ViewHandler::new(native_display, config);
        native.init_state(None);

        for h in [&mut generic, &mut native] {
            h.zoom_in();
            h.rotate_up();
            h.set_aspect(1.0, 0.5, 0.25);
            h.reset();
        }

        assert!(generic.matrix().approx_eq(&native.matrix(), EPSILON));
        assert_eq!(native.display().unwrap().native_aspect, native.aspect());
    }

    #[test]
    fn test_reset_restores_default_camera() {
        let mut h = handler(DisplayMode::TwoD);
        let home = h.matrix();
        h.zoom_in();
        h.pan_left();
        h.reset();
        assert!(h.matrix().approx_eq(&home, EPSILON));
    }

    #[test]
    fn test_guess_aspect_from_linked_image() {
        let mut info = ImageInfo::uncalibrated(640, 480, 20);
        info.micron_step = 24.0;
        let display = MemoryDisplay::new(DisplayMode::ThreeD).link(info);
        let mut h = ViewHandler::new(display, ViewConfig::default());
        h.init_state(None);
        h.guess_aspect();

        let a = h.aspect();
        assert_eq!(a.x, 1.0);
        assert!((a.y - 0.75).abs() < EPSILON);
        assert!((a.z - 0.75).abs() < EPSILON);
    }

    #[test]
    fn test_guess_aspect_without_images_is_noop() {
        let mut h = handler(DisplayMode::ThreeD);
        h.guess_aspect();
        assert_eq!(h.aspect(), Aspect::unit());
    }

    #[test]
    fn test_matches_is_reflexive_and_symmetric() {
        let a = handler(DisplayMode::ThreeD);
        let b = handler(DisplayMode::ThreeD);
        assert!(a.matches(&a));
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn test_matches_detects_each_difference() {
        let base = handler(DisplayMode::ThreeD);
        let changes: [fn(&mut ViewHandler<MemoryDisplay>); 5] = [
            |h| h.zoom_in(),
            |h| h.set_aspect(1.0, 0.5, 1.0),
            |h| h.toggle_scale(true),
            |h| h.toggle_bounding_box(false),
            |h| h.toggle_parallel(true),
        ];
        for change in changes {
            let mut other = handler(DisplayMode::ThreeD);
            change(&mut other);
            assert!(!base.matches(&other));
            assert!(!other.matches(&base));
        }
    }

    #[test]
    fn test_init_state_copies_source_and_pushes_everything() {
        let mut source = handler(DisplayMode::ThreeD);
        source.rotate_right();
        source.toggle_scale(true);
        source.toggle_parallel(true);

        let config = ViewConfig {
            eye_separation: 0.05,
            ..ViewConfig::default()
        };
        let mut copy = ViewHandler::new(MemoryDisplay::new(DisplayMode::ThreeD), config);
        copy.init_state(Some(&source.snapshot()));

        assert!(copy.matches(&source));
        let d = copy.display().unwrap();
        assert_eq!(d.matrix, source.matrix());
        assert!(d.scale_enabled);
        assert!(d.parallel);
        assert_eq!(d.eye_separation, 0.05);
    }

    #[test]
    fn test_init_state_keeps_restored_matrix() {
        let saved = SavedView {
            matrix: Some(Matrix4::scale(3.0)),
            show_scale: true,
            ..SavedView::default()
        };

        let mut h = ViewHandler::new(MemoryDisplay::new(DisplayMode::TwoD), ViewConfig::default());
        h.restore_state(&saved);
        h.init_state(None);

        assert_eq!(h.matrix(), Matrix4::scale(3.0));
        assert!(h.display().unwrap().scale_enabled);
    }

    #[test]
    fn test_init_state_without_restore_uses_default() {
        let mut h = ViewHandler::new(MemoryDisplay::new(DisplayMode::TwoD), ViewConfig::default());
        h.restore_state(&SavedView::default());
        h.init_state(None);
        assert_eq!(h.matrix(), h.default_matrix());
    }
}
