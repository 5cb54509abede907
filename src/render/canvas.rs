//! The raster canvas backend: a software scanline rasterizer over a packed
//! 24-bit RGB pixel buffer

use std::{io::Write, rc::Rc};

use crate::{
    error::{PostScriptError, PostScriptResult},
    font::FontInfo,
    geometry::{bezier, BoundingBox, Point},
    graphics::{default_ctm, FillRule, GraphicsContext, GraphicsState, LineCap},
};

pub struct Canvas {
    width: usize,
    height: usize,
    buffer: Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            // white page
            buffer: vec![0x00ff_ffff; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.buffer[y * self.width + x]
    }

    fn set_pixel(&mut self, x: usize, y: usize, pixel: u32) {
        self.buffer[y * self.width + x] = pixel;
    }

    /// Encodes the buffer as an 8-bit RGB PNG
    pub fn write_png<W: Write>(&self, writer: W) -> PostScriptResult<()> {
        let mut encoder = png::Encoder::new(writer, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);

        let mut data = Vec::with_capacity(self.width * self.height * 3);

        for &pixel in &self.buffer {
            data.push((pixel >> 16) as u8);
            data.push((pixel >> 8) as u8);
            data.push(pixel as u8);
        }

        let mut writer = encoder
            .write_header()
            .map_err(|err| anyhow::anyhow!(PostScriptError::IoError(err.to_string().into())))?;

        writer
            .write_image_data(&data)
            .map_err(|err| anyhow::anyhow!(PostScriptError::IoError(err.to_string().into())))?;

        Ok(())
    }
}

/// A subpath flattened to a device-space polyline
#[derive(Debug, Clone, Default)]
struct Subpath {
    points: Vec<Point>,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
struct DevicePath {
    subpaths: Vec<Subpath>,
}

impl DevicePath {
    fn clear(&mut self) {
        self.subpaths.clear();
    }

    fn begin(&mut self, p: Point) {
        self.subpaths.push(Subpath {
            points: vec![p],
            closed: false,
        });
    }

    fn append(&mut self, p: Point) {
        if let Some(subpath) = self.subpaths.last_mut() {
            subpath.points.push(p);
        } else {
            self.begin(p);
        }
    }

    fn close(&mut self) -> Option<Point> {
        let subpath = self.subpaths.last_mut()?;
        subpath.closed = true;

        subpath.points.first().copied()
    }

    fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }

    /// Every subpath as a closed polygon, for filling and clipping
    fn polygons(&self) -> Vec<Vec<Point>> {
        self.subpaths
            .iter()
            .filter(|subpath| subpath.points.len() >= 2)
            .map(|subpath| subpath.points.clone())
            .collect()
    }
}

struct SavedState {
    graphics: GraphicsState,
    clip: Option<Rc<Vec<u8>>>,
}

/// Maps the graphics-context interface onto [`Canvas`]
///
/// Path points are frozen into device space as they are appended, so later
/// CTM changes do not move already-constructed segments
pub struct CanvasContext {
    canvas: Canvas,
    state: GraphicsState,
    saved: Vec<SavedState>,
    path: DevicePath,

    /// Device-space clip mask; `None` means the whole canvas
    clip: Option<Rc<Vec<u8>>>,
}

/// Flattening tolerance for curves and arcs, in device pixels
const FLATTEN_TOLERANCE: f64 = 0.25;

impl CanvasContext {
    pub fn new(width: usize, height: usize, bounding_box: Option<BoundingBox>) -> Self {
        Self {
            canvas: Canvas::new(width, height),
            state: GraphicsState::new(default_ctm(height as f64, bounding_box)),
            saved: Vec::new(),
            path: DevicePath::default(),
            clip: None,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }

    fn device(&self, p: Point) -> Point {
        self.state.ctm.apply(p)
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.state.current_point = None;
    }

    fn fill_polygons(&mut self, polygons: &[Vec<Point>], rule: FillRule) {
        let pixel = self.state.color.to_pixel();

        fill_polygons_into(
            &mut self.canvas,
            self.clip.as_deref().map(Vec::as_slice),
            polygons,
            rule,
            pixel,
        );
    }

    fn intersect_clip(&mut self, polygons: &[Vec<Point>], rule: FillRule) {
        let mask = rasterize_mask(self.canvas.width, self.canvas.height, polygons, rule);

        let combined = match &self.clip {
            Some(existing) => existing
                .iter()
                .zip(&mask)
                .map(|(&a, &b)| a & b)
                .collect(),
            None => mask,
        };

        self.clip = Some(Rc::new(combined));
    }

    /// A rectangle's corners in device space
    fn rect_polygon(&self, origin: Point, width: f64, height: f64) -> Vec<Point> {
        [
            origin,
            Point::new(origin.x + width, origin.y),
            Point::new(origin.x + width, origin.y + height),
            Point::new(origin.x, origin.y + height),
        ]
        .iter()
        .map(|&p| self.device(p))
        .collect()
    }

    /// Expands the current path into stroke polygons: dash segmentation,
    /// one quad per segment, and cap/join geometry
    fn stroke_polygons(&self) -> Vec<Vec<Point>> {
        let scale = self.state.ctm.mean_scale();
        let width = (self.state.line_width * scale).max(0.8);
        let half = width / 2.0;

        let dash: Vec<f64> = self
            .state
            .dash
            .array
            .iter()
            .map(|&d| d * scale)
            .collect();
        let dash_offset = self.state.dash.offset * scale;

        let mut polygons = Vec::new();

        for subpath in &self.path.subpaths {
            let mut points = subpath.points.clone();

            if subpath.closed && points.first() != points.last() {
                if let Some(&first) = points.first() {
                    points.push(first);
                }
            }

            if points.len() < 2 {
                continue;
            }

            let pieces = if self.state.dash.is_solid() {
                vec![points]
            } else {
                dash_split(&points, &dash, dash_offset)
            };

            for piece in pieces {
                append_stroke_geometry(
                    &mut polygons,
                    &piece,
                    half,
                    self.state.line_cap,
                    subpath.closed,
                );
            }
        }

        polygons
    }
}

impl GraphicsContext for CanvasContext {
    fn state(&self) -> &GraphicsState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut GraphicsState {
        &mut self.state
    }

    fn save(&mut self) {
        self.saved.push(SavedState {
            graphics: self.state.clone(),
            clip: self.clip.clone(),
        });
    }

    fn restore(&mut self) {
        if let Some(saved) = self.saved.pop() {
            self.state = saved.graphics;
            self.clip = saved.clip;
        }
    }

    fn new_path(&mut self) {
        self.clear_path();
    }

    fn move_to(&mut self, p: Point) {
        let device = self.device(p);

        self.path.begin(device);
        self.state.current_point = Some(device);
    }

    fn line_to(&mut self, p: Point) -> PostScriptResult<()> {
        self.current_point()?;

        let device = self.device(p);
        self.path.append(device);
        self.state.current_point = Some(device);

        Ok(())
    }

    fn bezier_curve_to(
        &mut self,
        control_one: Point,
        control_two: Point,
        end: Point,
    ) -> PostScriptResult<()> {
        let start = self.current_point()?;

        let c1 = self.device(control_one);
        let c2 = self.device(control_two);
        let device_end = self.device(end);

        let mut flattened = Vec::new();
        bezier::flatten_cubic(start, c1, c2, device_end, FLATTEN_TOLERANCE, &mut flattened);

        for p in flattened {
            self.path.append(p);
        }

        self.state.current_point = Some(device_end);

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
        let mut start = start_angle;
        let mut end = end_angle;

        if clockwise {
            while end > start {
                end -= 360.0;
            }
        } else {
            while end < start {
                end += 360.0;
            }
        }

        let sweep = end - start;
        let segments = ((sweep.abs() / 6.0).ceil() as usize).max(2);

        let connect = self.state.current_point.is_some() && !self.path.is_empty();

        for i in 0..=segments {
            let angle = (start + sweep * i as f64 / segments as f64).to_radians();

            let user = Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            );
            let device = self.device(user);

            if i == 0 && !connect {
                self.path.begin(device);
            } else {
                self.path.append(device);
            }

            self.state.current_point = Some(device);
        }
    }

    fn close_path(&mut self) -> PostScriptResult<()> {
        if let Some(start) = self.path.close() {
            self.state.current_point = Some(start);
        }

        Ok(())
    }

    fn stroke(&mut self) {
        let polygons = self.stroke_polygons();
        self.fill_polygons(&polygons, FillRule::NonZero);
        self.clear_path();
    }

    fn fill(&mut self, rule: FillRule) {
        let polygons = self.path.polygons();
        self.fill_polygons(&polygons, rule);
        self.clear_path();
    }

    fn stroke_rect(&mut self, origin: Point, width: f64, height: f64) {
        let corners = self.rect_polygon(origin, width, height);

        let mut closed = corners.clone();
        closed.push(corners[0]);

        let scale = self.state.ctm.mean_scale();
        let half = ((self.state.line_width * scale).max(0.8)) / 2.0;

        let mut polygons = Vec::new();
        append_stroke_geometry(&mut polygons, &closed, half, self.state.line_cap, true);

        self.fill_polygons(&polygons, FillRule::NonZero);
    }

    fn fill_rect(&mut self, origin: Point, width: f64, height: f64) {
        let polygon = self.rect_polygon(origin, width, height);
        self.fill_polygons(&[polygon], FillRule::NonZero);
    }

    fn clip(&mut self, rule: FillRule) {
        let polygons = self.path.polygons();
        self.intersect_clip(&polygons, rule);
        self.clear_path();
    }

    fn rect_clip(&mut self, origin: Point, width: f64, height: f64) {
        let polygon = self.rect_polygon(origin, width, height);
        self.intersect_clip(&[polygon], FillRule::NonZero);
        self.clear_path();
    }

    fn string_width(&self, text: &[u8]) -> PostScriptResult<Point> {
        let font = self
            .state
            .font
            .as_ref()
            .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;

        Ok(font.fallback_advance(text))
    }

    fn fill_text(&mut self, text: &[u8], _at: Point) -> PostScriptResult<()> {
        let font: &FontInfo = self
            .state
            .font
            .as_ref()
            .ok_or(anyhow::anyhow!(PostScriptError::InvalidFont))?;

        // glyph outlines come from the embedder's font provider; without
        // one, text advances the current point but paints nothing
        log::debug!(
            "no glyph source for font {:?}; {} bytes of text not painted",
            String::from_utf8_lossy(&font.name),
            text.len()
        );

        Ok(())
    }

    fn char_path(&mut self, text: &[u8], _at: Point) -> PostScriptResult<()> {
        if self.state.font.is_none() {
            anyhow::bail!(PostScriptError::InvalidFont);
        }

        log::debug!("charpath without glyph outlines; {} bytes skipped", text.len());

        Ok(())
    }
}

/// Splits a polyline into dash pieces by walking the pattern along its
/// length
fn dash_split(points: &[Point], pattern: &[f64], offset: f64) -> Vec<Vec<Point>> {
    let cycle: f64 = pattern.iter().sum();

    if cycle <= 0.0 {
        return vec![points.to_vec()];
    }

    let mut pieces = Vec::new();
    let mut current: Vec<Point> = Vec::new();

    // position within the dash cycle
    let mut phase = offset.rem_euclid(cycle);
    let mut pattern_index = 0;

    while phase >= pattern[pattern_index] {
        phase -= pattern[pattern_index];
        pattern_index = (pattern_index + 1) % pattern.len();
    }

    // even indices are on, odd are off
    let mut pen_down = pattern_index % 2 == 0;
    let mut remaining = pattern[pattern_index] - phase;

    if pen_down {
        current.push(points[0]);
    }

    for window in points.windows(2) {
        let (mut from, to) = (window[0], window[1]);
        let mut segment_len = from.euclidean_distance(to);

        while segment_len > remaining {
            let t = remaining / segment_len;
            let cut = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);

            if pen_down {
                current.push(cut);
                pieces.push(std::mem::take(&mut current));
            }

            pen_down = !pen_down;

            if pen_down {
                current = vec![cut];
            }

            segment_len -= remaining;
            from = cut;

            // zero-length entries toggle the pen without advancing
            loop {
                pattern_index = (pattern_index + 1) % pattern.len();
                remaining = pattern[pattern_index];

                if remaining > 0.0 {
                    break;
                }

                pen_down = !pen_down;
            }
        }

        remaining -= segment_len;

        if pen_down {
            current.push(to);
        }
    }

    if pen_down && current.len() >= 2 {
        pieces.push(current);
    }

    pieces
}

/// One quad per segment plus cap and join geometry
fn append_stroke_geometry(
    polygons: &mut Vec<Vec<Point>>,
    points: &[Point],
    half_width: f64,
    cap: LineCap,
    closed: bool,
) {
    for window in points.windows(2) {
        let (mut from, mut to) = (window[0], window[1]);

        if from == to {
            continue;
        }

        if cap == LineCap::Square && !closed {
            let direction = (to - from).with_distance_from_origin(half_width);

            if window[0] == points[0] {
                from = from - direction;
            }

            if window[1] == points[points.len() - 1] {
                to = to + direction;
            }
        }

        let normal = (to - from).rotate_90().with_distance_from_origin(half_width);

        polygons.push(vec![from + normal, to + normal, to - normal, from - normal]);
    }

    // joins are approximated by disks at the vertices; round caps get the
    // same treatment at the endpoints
    let interior = if points.len() > 2 {
        &points[1..points.len() - 1]
    } else {
        &[]
    };

    for &p in interior {
        polygons.push(circle_polygon(p, half_width));
    }

    if closed && points.len() > 2 {
        polygons.push(circle_polygon(points[0], half_width));
    }

    if cap == LineCap::Round && !closed {
        polygons.push(circle_polygon(points[0], half_width));
        polygons.push(circle_polygon(points[points.len() - 1], half_width));
    }
}

fn circle_polygon(center: Point, radius: f64) -> Vec<Point> {
    const SEGMENTS: usize = 12;

    (0..SEGMENTS)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / SEGMENTS as f64;

            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Scanline fill of device-space polygons, honoring an optional clip mask
fn fill_polygons_into(
    canvas: &mut Canvas,
    clip: Option<&[u8]>,
    polygons: &[Vec<Point>],
    rule: FillRule,
    pixel: u32,
) {
    each_span(canvas.width, canvas.height, polygons, rule, |x, y| {
        let inside_clip = clip.map_or(true, |mask| mask[y * canvas.width + x] != 0);

        if inside_clip {
            canvas.set_pixel(x, y, pixel);
        }
    });
}

fn rasterize_mask(
    width: usize,
    height: usize,
    polygons: &[Vec<Point>],
    rule: FillRule,
) -> Vec<u8> {
    let mut mask = vec![0u8; width * height];

    each_span(width, height, polygons, rule, |x, y| {
        mask[y * width + x] = 1;
    });

    mask
}

/// Visits every pixel whose center lies inside the polygons under the given
/// fill rule. Subpaths are implicitly closed
fn each_span(
    width: usize,
    height: usize,
    polygons: &[Vec<Point>],
    rule: FillRule,
    mut visit: impl FnMut(usize, usize),
) {
    if polygons.is_empty() || width == 0 || height == 0 {
        return;
    }

    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for polygon in polygons {
        for p in polygon {
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
    }

    let y_start = (min_y.floor().max(0.0)) as usize;
    let y_end = (max_y.ceil().min(height as f64)).max(0.0) as usize;

    let mut crossings: Vec<(f64, i32)> = Vec::new();

    for y in y_start..y_end {
        let sample_y = y as f64 + 0.5;

        crossings.clear();

        for polygon in polygons {
            if polygon.len() < 2 {
                continue;
            }

            for i in 0..polygon.len() {
                let p = polygon[i];
                let q = polygon[(i + 1) % polygon.len()];

                let (top, bottom, direction) = if p.y <= q.y { (p, q, 1) } else { (q, p, -1) };

                if sample_y < top.y || sample_y >= bottom.y {
                    continue;
                }

                let t = (sample_y - top.y) / (bottom.y - top.y);
                let x = top.x + (bottom.x - top.x) * t;

                crossings.push((x, direction));
            }
        }

        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0i32;
        let mut parity = 0u32;
        let mut span_start: Option<f64> = None;

        for &(x, direction) in crossings.iter() {
            let was_inside = match rule {
                FillRule::NonZero => winding != 0,
                FillRule::EvenOdd => parity % 2 == 1,
            };

            winding += direction;
            parity += 1;

            let now_inside = match rule {
                FillRule::NonZero => winding != 0,
                FillRule::EvenOdd => parity % 2 == 1,
            };

            if !was_inside && now_inside {
                span_start = Some(x);
            } else if was_inside && !now_inside {
                if let Some(start) = span_start.take() {
                    fill_span(width, start, x, |px| visit(px, y));
                }
            }
        }
    }
}

fn fill_span(width: usize, start: f64, end: f64, mut visit: impl FnMut(usize)) {
    // pixels whose center x + 0.5 lies within [start, end)
    let first = (start - 0.5).ceil().max(0.0) as usize;
    let last = ((end - 0.5).ceil().max(0.0) as usize).min(width);

    for px in first..last {
        visit(px);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::Color;

    const WHITE: u32 = 0x00ff_ffff;
    const BLACK: u32 = 0x0000_0000;

    fn context() -> CanvasContext {
        CanvasContext::new(20, 20, None)
    }

    #[test]
    fn fill_rect_paints_pixels() {
        let mut ctx = context();

        // user space y grows upward; this square occupies the bottom-left
        // corner of user space, which is the bottom-left of the device too
        ctx.fill_rect(Point::new(2.0, 2.0), 6.0, 6.0);

        let canvas = ctx.into_canvas();

        // device y = height - user y
        assert_eq!(canvas.pixel(4, 14), BLACK);
        assert_eq!(canvas.pixel(4, 4), WHITE);
        assert_eq!(canvas.pixel(14, 14), WHITE);
    }

    #[test]
    fn fill_respects_color() {
        let mut ctx = context();
        ctx.state_mut().color = Color::rgb(1.0, 0.0, 0.0);

        ctx.fill_rect(Point::new(0.0, 0.0), 20.0, 20.0);

        assert_eq!(ctx.canvas().pixel(10, 10), 0x00ff_0000);
    }

    #[test]
    fn triangle_fill_stays_inside() {
        let mut ctx = context();

        ctx.move_to(Point::new(1.0, 1.0));
        ctx.line_to(Point::new(19.0, 1.0)).unwrap();
        ctx.line_to(Point::new(1.0, 19.0)).unwrap();
        ctx.close_path().unwrap();
        ctx.fill(FillRule::NonZero);

        let canvas = ctx.into_canvas();

        // near the right angle of the triangle (device bottom-left)
        assert_eq!(canvas.pixel(2, 17), BLACK);
        // far corner outside the hypotenuse
        assert_eq!(canvas.pixel(18, 2), WHITE);
    }

    #[test]
    fn even_odd_leaves_hole() {
        let mut ctx = context();

        // outer square with an inner square, both wound the same way
        ctx.move_to(Point::new(2.0, 2.0));
        ctx.line_to(Point::new(18.0, 2.0)).unwrap();
        ctx.line_to(Point::new(18.0, 18.0)).unwrap();
        ctx.line_to(Point::new(2.0, 18.0)).unwrap();
        ctx.close_path().unwrap();

        ctx.move_to(Point::new(7.0, 7.0));
        ctx.line_to(Point::new(13.0, 7.0)).unwrap();
        ctx.line_to(Point::new(13.0, 13.0)).unwrap();
        ctx.line_to(Point::new(7.0, 13.0)).unwrap();
        ctx.close_path().unwrap();

        ctx.fill(FillRule::EvenOdd);

        let canvas = ctx.into_canvas();

        assert_eq!(canvas.pixel(4, 10), BLACK);
        // the inner square is a hole under even-odd
        assert_eq!(canvas.pixel(10, 10), WHITE);
    }

    #[test]
    fn clip_restricts_painting() {
        let mut ctx = context();

        ctx.rect_clip(Point::new(0.0, 0.0), 10.0, 20.0);
        ctx.fill_rect(Point::new(0.0, 0.0), 20.0, 20.0);

        let canvas = ctx.into_canvas();

        assert_eq!(canvas.pixel(5, 10), BLACK);
        assert_eq!(canvas.pixel(15, 10), WHITE);
    }

    #[test]
    fn stroke_paints_along_line() {
        let mut ctx = context();
        ctx.state_mut().line_width = 2.0;

        ctx.move_to(Point::new(2.0, 10.0));
        ctx.line_to(Point::new(18.0, 10.0)).unwrap();
        ctx.stroke();

        let canvas = ctx.into_canvas();

        // the horizontal line at user y = 10 lands at device y = 10
        assert_eq!(canvas.pixel(10, 10), BLACK);
        assert_eq!(canvas.pixel(10, 5), WHITE);
    }

    #[test]
    fn stroke_clears_current_point() {
        let mut ctx = context();

        ctx.move_to(Point::new(2.0, 10.0));
        ctx.line_to(Point::new(18.0, 10.0)).unwrap();
        ctx.stroke();

        assert!(ctx.current_point().is_err());
    }

    #[test]
    fn dash_split_produces_gaps() {
        let points = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];

        let pieces = dash_split(&points, &[2.0, 2.0], 0.0);

        // 10 units of 2-on 2-off: dashes at [0,2], [4,6], [8,10]
        assert_eq!(pieces.len(), 3);
        assert!((pieces[0][0].x - 0.0).abs() < 1e-9);
        assert!((pieces[0][1].x - 2.0).abs() < 1e-9);
        assert!((pieces[1][0].x - 4.0).abs() < 1e-9);
    }
}
