//! A graphics context that records the calls made against it instead of
//! painting, for tests and embedders that want to introspect interpreter
//! output

use crate::{
    error::{PostScriptError, PostScriptResult},
    font::FontInfo,
    geometry::{BoundingBox, Point},
    graphics::{default_ctm, FillRule, GraphicsContext, GraphicsState},
};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    NewPath,
    MoveTo(Point),
    LineTo(Point),
    BezierCurveTo(Point, Point, Point),
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
    },
    ClosePath,
    Stroke,
    Fill(FillRule),
    StrokeRect(Point, f64, f64),
    FillRect(Point, f64, f64),
    Clip(FillRule),
    RectClip(Point, f64, f64),
    SetFont(FontInfo),
    FillText(Vec<u8>, Point),
    CharPath(Vec<u8>, Point),
    Save,
    Restore,
}

pub struct RecordingContext {
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    calls: Vec<RecordedCall>,

    /// Device-space start of the current subpath, for closepath
    subpath_start: Option<Point>,
}

impl RecordingContext {
    pub fn new(height: f64) -> Self {
        Self::with_bounding_box(height, None)
    }

    pub fn with_bounding_box(height: f64, bounding_box: Option<BoundingBox>) -> Self {
        Self {
            state: GraphicsState::new(default_ctm(height, bounding_box)),
            saved: Vec::new(),
            calls: Vec::new(),
            subpath_start: None,
        }
    }

    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    fn record(&mut self, call: RecordedCall) {
        self.calls.push(call);
    }
}

impl GraphicsContext for RecordingContext {
    fn state(&self) -> &GraphicsState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut GraphicsState {
        &mut self.state
    }

    fn save(&mut self) {
        self.saved.push(self.state.clone());
        self.record(RecordedCall::Save);
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }

        self.record(RecordedCall::Restore);
    }

    fn new_path(&mut self) {
        self.state.current_point = None;
        self.subpath_start = None;
        self.record(RecordedCall::NewPath);
    }

    fn move_to(&mut self, p: Point) {
        let device = self.state.ctm.apply(p);

        self.state.current_point = Some(device);
        self.subpath_start = Some(device);
        self.record(RecordedCall::MoveTo(p));
    }

    fn line_to(&mut self, p: Point) -> PostScriptResult<()> {
        self.current_point()?;

        self.state.current_point = Some(self.state.ctm.apply(p));
        self.record(RecordedCall::LineTo(p));

        Ok(())
    }

    fn bezier_curve_to(
        &mut self,
        control_one: Point,
        control_two: Point,
        end: Point,
    ) -> PostScriptResult<()> {
        self.current_point()?;

        self.state.current_point = Some(self.state.ctm.apply(end));
        self.record(RecordedCall::BezierCurveTo(control_one, control_two, end));

        Ok(())
    }

    fn arc(
        &mut self,
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
    ) {
        let end = Point::new(
            center.x + radius * end_angle.to_radians().cos(),
            center.y + radius * end_angle.to_radians().sin(),
        );

        let device_end = self.state.ctm.apply(end);

        if self.state.current_point.is_none() {
            let start = Point::new(
                center.x + radius * start_angle.to_radians().cos(),
                center.y + radius * start_angle.to_radians().sin(),
            );
            self.subpath_start = Some(self.state.ctm.apply(start));
        }

        self.state.current_point = Some(device_end);

        self.record(RecordedCall::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            clockwise,
        });
    }

    fn close_path(&mut self) -> PostScriptResult<()> {
        // closing an empty path is a no-op
        if let Some(start) = self.subpath_start {
            self.state.current_point = Some(start);
            self.record(RecordedCall::ClosePath);
        }

        Ok(())
    }

    fn stroke(&mut self) {
        self.state.current_point = None;
        self.subpath_start = None;
        self.record(RecordedCall::Stroke);
    }

    fn fill(&mut self, rule: FillRule) {
        self.state.current_point = None;
        self.subpath_start = None;
        self.record(RecordedCall::Fill(rule));
    }

    fn stroke_rect(&mut self, origin: Point, width: f64, height: f64) {
        self.record(RecordedCall::StrokeRect(origin, width, height));
    }

    fn fill_rect(&mut self, origin: Point, width: f64, height: f64) {
        self.record(RecordedCall::FillRect(origin, width, height));
    }

    fn clip(&mut self, rule: FillRule) {
        self.state.current_point = None;
        self.subpath_start = None;
        self.record(RecordedCall::Clip(rule));
    }

    fn rect_clip(&mut self, origin: Point, width: f64, height: f64) {
        self.record(RecordedCall::RectClip(origin, width, height));
    }

    fn set_font(&mut self, font: FontInfo) {
        self.record(RecordedCall::SetFont(font.clone()));
        self.state.font = Some(font);
    }

    fn string_width(&self, text: &[u8]) -> PostScriptResult<Point> {
        let font = self
            .state
            .font
            .as_ref()
            .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;

        Ok(font.fallback_advance(text))
    }

    fn fill_text(&mut self, text: &[u8], at: Point) -> PostScriptResult<()> {
        if self.state.font.is_none() {
            anyhow::bail!(PostScriptError::InvalidFont);
        }

        self.record(RecordedCall::FillText(text.to_vec(), at));

        Ok(())
    }

    fn char_path(&mut self, text: &[u8], at: Point) -> PostScriptResult<()> {
        if self.state.font.is_none() {
            anyhow::bail!(PostScriptError::InvalidFont);
        }

        self.record(RecordedCall::CharPath(text.to_vec(), at));

        Ok(())
    }
}
