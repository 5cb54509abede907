use crate::{
    data_structures::Matrix,
    error::{PostScriptError, PostScriptResult},
    font::FontInfo,
    geometry::{BoundingBox, Point},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Initial value: 0, for square butt caps
    #[default]
    Butt = 0,
    Round = 1,
    /// Projecting square: the stroke continues half a line width past the
    /// endpoint
    Square = 2,
}

impl LineCap {
    pub fn from_integer(i: i32) -> PostScriptResult<Self> {
        Ok(match i {
            0 => LineCap::Butt,
            1 => LineCap::Round,
            2 => LineCap::Square,
            _ => anyhow::bail!(PostScriptError::RangeCheck),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    /// Initial value: 0, for mitered joins
    #[default]
    Miter = 0,
    Round = 1,
    Bevel = 2,
}

impl LineJoin {
    pub fn from_integer(i: i32) -> PostScriptResult<Self> {
        Ok(match i {
            0 => LineJoin::Miter,
            1 => LineJoin::Round,
            2 => LineJoin::Bevel,
            _ => anyhow::bail!(PostScriptError::RangeCheck),
        })
    }
}

/// A description of the dash pattern to be used when paths are stroked
///
/// Initial value: a solid line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashPattern {
    pub array: Vec<f64>,
    pub offset: f64,
}

impl DashPattern {
    pub fn solid() -> Self {
        Self::default()
    }

    pub fn is_solid(&self) -> bool {
        self.array.is_empty() || self.array.iter().all(|&d| d == 0.0)
    }
}

/// The current color in one of the two device color spaces the interpreter
/// supports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Gray(f64),
    Rgb { red: f64, green: f64, blue: f64 },
}

impl Color {
    pub fn black() -> Self {
        Color::Gray(0.0)
    }

    pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Color::Rgb {
            red: red.clamp(0.0, 1.0),
            green: green.clamp(0.0, 1.0),
            blue: blue.clamp(0.0, 1.0),
        }
    }

    pub fn gray(level: f64) -> Self {
        Color::Gray(level.clamp(0.0, 1.0))
    }

    pub fn as_rgb(&self) -> (f64, f64, f64) {
        match *self {
            Color::Gray(level) => (level, level, level),
            Color::Rgb { red, green, blue } => (red, green, blue),
        }
    }

    /// The color reduced to a packed 24-bit 0x00RRGGBB value
    pub fn to_pixel(&self) -> u32 {
        let (r, g, b) = self.as_rgb();

        let r = (r * 255.0).round() as u32;
        let g = (g * 255.0).round() as u32;
        let b = (b * 255.0).round() as u32;

        r << 16 | g << 8 | b
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    /// Nonzero winding number rule
    NonZero,
    /// Even-odd rule
    EvenOdd,
}

/// The device-independent paint parameters shared by every graphics-context
/// implementation and snapshotted by `save`/`restore`
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// The current transformation matrix, mapping user space to device
    /// space. Modified by the coordinate transformation operators
    pub ctm: Matrix,

    /// The thickness, in user space units, of paths to be stroked
    ///
    /// Initial value: 1.0
    pub line_width: f64,

    pub line_cap: LineCap,

    pub line_join: LineJoin,

    /// The maximum length of mitered line joins for stroked paths
    ///
    /// Initial value: 10.0, for a miter cutoff below approximately 11.5
    /// degrees
    pub miter_limit: f64,

    pub dash: DashPattern,

    /// Initial value: black in DeviceGray
    pub color: Color,

    /// The current point in device space, if any. Path construction
    /// operators update it; painting and `newpath` clear it
    pub current_point: Option<Point>,

    pub font: Option<FontInfo>,
}

impl GraphicsState {
    pub fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            line_width: 1.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: 10.0,
            dash: DashPattern::solid(),
            color: Color::default(),
            current_point: None,
            font: None,
        }
    }
}

/// Computes the transformation from default user space to device space for a
/// canvas `height` pixels tall
///
/// User-space y grows upward while the device origin sits at the top left,
/// so the default CTM is `[1 0 0 -1 -llx height+lly]`
pub fn default_ctm(height: f64, bounding_box: Option<BoundingBox>) -> Matrix {
    let bbox = bounding_box.unwrap_or_default();

    Matrix::new(1.0, 0.0, 0.0, -1.0, -bbox.llx, height + bbox.lly)
}

/// The drawing interface the interpreter paints through
///
/// The evaluator never touches a concrete backend; every graphics-state,
/// path, painting, and text operator funnels into these methods. Path
/// coordinates are in user space; the implementation applies the CTM it
/// maintains
pub trait GraphicsContext {
    fn state(&self) -> &GraphicsState;
    fn state_mut(&mut self) -> &mut GraphicsState;

    /// Pushes a copy of the full paint state, including the CTM, the clip,
    /// and the current point. Restores are LIFO
    fn save(&mut self);
    fn restore(&mut self);

    fn new_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point) -> PostScriptResult<()>;
    fn bezier_curve_to(
        &mut self,
        control_one: Point,
        control_two: Point,
        end: Point,
    ) -> PostScriptResult<()>;

    /// Appends a circular arc. Angles are in degrees; `clockwise` selects
    /// the `arcn` direction. A line segment connects any existing current
    /// point to the arc's start
    fn arc(
        &mut self,
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
    );

    fn close_path(&mut self) -> PostScriptResult<()>;

    /// The current point in device space
    fn current_point(&self) -> PostScriptResult<Point> {
        self.state()
            .current_point
            .ok_or(anyhow::anyhow!(PostScriptError::NoCurrentPoint))
    }

    /// The current point mapped back to user space
    fn current_point_user(&self) -> PostScriptResult<Point> {
        let device = self.current_point()?;

        Ok(self.state().ctm.inverse()?.apply(device))
    }

    fn stroke(&mut self);
    fn fill(&mut self, rule: FillRule);
    fn stroke_rect(&mut self, origin: Point, width: f64, height: f64);
    fn fill_rect(&mut self, origin: Point, width: f64, height: f64);

    /// Intersects the clip region with the current path
    fn clip(&mut self, rule: FillRule);
    fn rect_clip(&mut self, origin: Point, width: f64, height: f64);

    fn set_font(&mut self, font: FontInfo) {
        self.state_mut().font = Some(font);
    }

    /// The advance vector, in user space, that painting `text` would produce
    fn string_width(&self, text: &[u8]) -> PostScriptResult<Point>;

    /// Paints `text` with glyph origin at the user-space point `at`
    fn fill_text(&mut self, text: &[u8], at: Point) -> PostScriptResult<()>;

    /// Appends the outlines of `text` to the current path
    fn char_path(&mut self, text: &[u8], at: Point) -> PostScriptResult<()>;
}
