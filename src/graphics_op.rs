//! The graphics, coordinate-transform, path, painting, and font operators
//!
//! These are kept apart from the core evaluator: everything here bottoms out
//! in calls through the graphics context rather than in stack or dictionary
//! manipulation

use crate::{
    data_structures::Matrix,
    error::{PostScriptError, PostScriptResult},
    font::{self, FontDescription},
    graphics::{Color, DashPattern, FillRule, GraphicsContext, LineCap, LineJoin},
    geometry::Point,
    interpreter::Interpreter,
    object::{
        ArrayIndex, DictKey, DictionaryIndex, Name, Object, ObjectKind, PostScriptArray,
    },
    operator::Operator,
};

impl<'a> Interpreter<'a> {
    pub(crate) fn execute_graphics_operator(
        &mut self,
        op: Operator,
        gtx: &mut dyn GraphicsContext,
    ) -> PostScriptResult<()> {
        match op {
            // graphics state
            Operator::GSave => {
                gtx.save();
                Ok(())
            }
            Operator::GRestore => {
                gtx.restore();
                Ok(())
            }
            Operator::SetLineWidth => {
                let width = self.pop_number()?;

                if width < 0.0 {
                    anyhow::bail!(PostScriptError::RangeCheck);
                }

                gtx.state_mut().line_width = width;
                Ok(())
            }
            Operator::CurrentLineWidth => {
                self.push(Object::real(gtx.state().line_width));
                Ok(())
            }
            Operator::SetLineCap => {
                let cap = LineCap::from_integer(self.pop_int()?)?;
                gtx.state_mut().line_cap = cap;
                Ok(())
            }
            Operator::CurrentLineCap => {
                self.push(Object::int(gtx.state().line_cap as i32));
                Ok(())
            }
            Operator::SetLineJoin => {
                let join = LineJoin::from_integer(self.pop_int()?)?;
                gtx.state_mut().line_join = join;
                Ok(())
            }
            Operator::CurrentLineJoin => {
                self.push(Object::int(gtx.state().line_join as i32));
                Ok(())
            }
            Operator::SetMiterLimit => {
                let limit = self.pop_number()?;

                if limit < 1.0 {
                    anyhow::bail!(PostScriptError::RangeCheck);
                }

                gtx.state_mut().miter_limit = limit;
                Ok(())
            }
            Operator::CurrentMiterLimit => {
                self.push(Object::real(gtx.state().miter_limit));
                Ok(())
            }
            Operator::SetDash => self.set_dash(gtx),
            Operator::CurrentDash => self.current_dash(gtx),
            Operator::SetRgbColor => {
                let blue = self.pop_number()?;
                let green = self.pop_number()?;
                let red = self.pop_number()?;

                gtx.state_mut().color = Color::rgb(red, green, blue);
                Ok(())
            }
            Operator::CurrentRgbColor => {
                let (red, green, blue) = gtx.state().color.as_rgb();

                self.push(Object::real(red));
                self.push(Object::real(green));
                self.push(Object::real(blue));
                Ok(())
            }
            Operator::SetGray => {
                let level = self.pop_number()?;
                gtx.state_mut().color = Color::gray(level);
                Ok(())
            }
            Operator::CurrentGray => {
                let level = match gtx.state().color {
                    Color::Gray(level) => level,
                    Color::Rgb { red, green, blue } => {
                        // NTSC luminosity weighting
                        0.3 * red + 0.59 * green + 0.11 * blue
                    }
                };

                self.push(Object::real(level));
                Ok(())
            }
            Operator::SetColorSpace => self.set_color_space(gtx),

            // coordinate systems
            Operator::MatrixOp => {
                let obj = self.matrix_object(Matrix::identity());
                self.push(obj);
                Ok(())
            }
            Operator::CurrentMatrix => {
                let arr = self.pop_matrix_array()?;
                let ctm = gtx.state().ctm;

                self.write_matrix_into(arr, ctm)?;
                self.push(Object::literal(ObjectKind::Array(arr)));
                Ok(())
            }
            Operator::SetMatrix => {
                let arr = self.pop_matrix_array()?;
                gtx.state_mut().ctm = self.read_matrix(arr)?;
                Ok(())
            }
            Operator::Translate => {
                let ty = self.pop_number()?;
                let tx = self.pop_number()?;

                let ctm = gtx.state().ctm;
                gtx.state_mut().ctm = Matrix::translation(tx, ty) * ctm;
                Ok(())
            }
            Operator::TranslateMatrix => {
                let arr = self.pop_matrix_array()?;
                let ty = self.pop_number()?;
                let tx = self.pop_number()?;

                self.write_matrix_into(arr, Matrix::translation(tx, ty))?;
                self.push(Object::literal(ObjectKind::Array(arr)));
                Ok(())
            }
            Operator::Scale => {
                let sy = self.pop_number()?;
                let sx = self.pop_number()?;

                let ctm = gtx.state().ctm;
                gtx.state_mut().ctm = Matrix::scaling(sx, sy) * ctm;
                Ok(())
            }
            Operator::ScaleMatrix => {
                let arr = self.pop_matrix_array()?;
                let sy = self.pop_number()?;
                let sx = self.pop_number()?;

                self.write_matrix_into(arr, Matrix::scaling(sx, sy))?;
                self.push(Object::literal(ObjectKind::Array(arr)));
                Ok(())
            }
            Operator::Rotate => {
                let degrees = self.pop_number()?;

                let ctm = gtx.state().ctm;
                gtx.state_mut().ctm = Matrix::rotation(degrees) * ctm;
                Ok(())
            }
            Operator::RotateMatrix => {
                let arr = self.pop_matrix_array()?;
                let degrees = self.pop_number()?;

                self.write_matrix_into(arr, Matrix::rotation(degrees))?;
                self.push(Object::literal(ObjectKind::Array(arr)));
                Ok(())
            }
            Operator::Concat => {
                let arr = self.pop_matrix_array()?;
                let m = self.read_matrix(arr)?;

                let ctm = gtx.state().ctm;
                gtx.state_mut().ctm = m * ctm;
                Ok(())
            }

            // path construction
            Operator::NewPath => {
                gtx.new_path();
                Ok(())
            }
            Operator::CurrentPoint => {
                let p = gtx.current_point_user()?;

                self.push(Object::real(p.x));
                self.push(Object::real(p.y));
                Ok(())
            }
            Operator::MoveTo => {
                let p = self.pop_point()?;
                gtx.move_to(p);
                Ok(())
            }
            Operator::RMoveTo => {
                let delta = self.pop_point()?;
                let p = gtx.current_point_user()?;

                gtx.move_to(p + delta);
                Ok(())
            }
            Operator::LineTo => {
                let p = self.pop_point()?;
                gtx.line_to(p)
            }
            Operator::RLineTo => {
                let delta = self.pop_point()?;
                let p = gtx.current_point_user()?;

                gtx.line_to(p + delta)
            }
            Operator::Arc => self.arc(gtx, false),
            Operator::ArcN => self.arc(gtx, true),
            Operator::ArcT => self.arc_tangent(gtx, false),
            Operator::ArcTo => self.arc_tangent(gtx, true),
            Operator::CurveTo => {
                let end = self.pop_point()?;
                let control_two = self.pop_point()?;
                let control_one = self.pop_point()?;

                gtx.bezier_curve_to(control_one, control_two, end)
            }
            Operator::RCurveTo => {
                let d3 = self.pop_point()?;
                let d2 = self.pop_point()?;
                let d1 = self.pop_point()?;

                let p = gtx.current_point_user()?;

                gtx.bezier_curve_to(p + d1, p + d2, p + d3)
            }
            Operator::ClosePath => gtx.close_path(),
            Operator::Clip => {
                gtx.clip(FillRule::NonZero);
                Ok(())
            }
            Operator::EoClip => {
                gtx.clip(FillRule::EvenOdd);
                Ok(())
            }
            Operator::RectClip => {
                let (origin, width, height) = self.pop_rect()?;
                gtx.rect_clip(origin, width, height);
                Ok(())
            }

            // painting
            Operator::Stroke => {
                gtx.stroke();
                Ok(())
            }
            Operator::Fill => {
                gtx.fill(FillRule::NonZero);
                Ok(())
            }
            Operator::EoFill => {
                gtx.fill(FillRule::EvenOdd);
                Ok(())
            }
            Operator::RectStroke => {
                let (origin, width, height) = self.pop_rect()?;
                gtx.stroke_rect(origin, width, height);
                Ok(())
            }
            Operator::RectFill => {
                let (origin, width, height) = self.pop_rect()?;
                gtx.fill_rect(origin, width, height);
                Ok(())
            }
            Operator::Show => self.show(gtx),
            Operator::StringWidth => {
                let s = self.pop_string()?;
                let text = self.vm().get_str(s).as_bytes().to_vec();

                let advance = gtx.string_width(&text)?;

                self.push(Object::real(advance.x));
                self.push(Object::real(advance.y));
                Ok(())
            }
            Operator::CharPath => {
                // the stroke-path flag only matters for outline fonts
                let _stroke_path = self.pop_bool()?;

                let s = self.pop_string()?;
                let text = self.vm().get_str(s).as_bytes().to_vec();

                let at = gtx.current_point_user()?;
                gtx.char_path(&text, at)
            }

            // fonts
            Operator::FindFont => {
                let name = self.pop_font_key()?;
                let dict = self.resolve_font(name)?;

                self.push(Object::literal(ObjectKind::Dictionary(dict)));
                Ok(())
            }
            Operator::DefineFont => self.define_font(),
            Operator::ScaleFont => {
                let scale = self.pop_number()?;
                let dict = self.pop_dict()?;

                let scaled = self.scale_font_dict(dict, Matrix::scaling(scale, scale))?;
                self.push(Object::literal(ObjectKind::Dictionary(scaled)));
                Ok(())
            }
            Operator::MakeFont => {
                let arr = self.pop_matrix_array()?;
                let m = self.read_matrix(arr)?;
                let dict = self.pop_dict()?;

                let transformed = self.scale_font_dict(dict, m)?;
                self.push(Object::literal(ObjectKind::Dictionary(transformed)));
                Ok(())
            }
            Operator::SelectFont => self.select_font(gtx),
            Operator::SetFont => {
                let dict = self.pop_dict()?;
                let info = font::font_info_from_dict(self.vm(), dict)?;

                gtx.set_font(info);
                Ok(())
            }

            op => unreachable!("{:?} is not a graphics operator", op),
        }
    }
}

/// Helpers
impl<'a> Interpreter<'a> {
    fn pop_point(&mut self) -> PostScriptResult<Point> {
        let y = self.pop_number()?;
        let x = self.pop_number()?;

        Ok(Point::new(x, y))
    }

    fn pop_rect(&mut self) -> PostScriptResult<(Point, f64, f64)> {
        let height = self.pop_number()?;
        let width = self.pop_number()?;
        let origin = self.pop_point()?;

        Ok((origin, width, height))
    }

    fn pop_matrix_array(&mut self) -> PostScriptResult<ArrayIndex> {
        let arr = self.pop_array()?;

        if self.vm().get_arr(arr).len() != 6 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        Ok(arr)
    }

    fn read_matrix(&self, arr: ArrayIndex) -> PostScriptResult<Matrix> {
        self.check_readable(self.vm().get_arr(arr).access())?;

        font::matrix_from_array(self.vm(), arr)
    }

    fn write_matrix_into(&mut self, arr: ArrayIndex, m: Matrix) -> PostScriptResult<()> {
        self.check_writable(self.vm().get_arr(arr).access())?;

        let elements: Vec<Object> = m.as_array().iter().map(|&n| Object::real(n)).collect();

        self.vm_mut().get_arr_mut(arr).write_at(0, &elements)
    }

    fn matrix_object(&mut self, m: Matrix) -> Object {
        let idx = font::matrix_to_array(self.vm_mut(), m);

        Object::literal(ObjectKind::Array(idx))
    }

    fn set_dash(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        let offset = self.pop_number()?;
        let arr = self.pop_array()?;

        self.check_readable(self.vm().get_arr(arr).access())?;

        let mut array = Vec::with_capacity(self.vm().get_arr(arr).len());

        for obj in self.vm().get_arr(arr).as_slice() {
            let n = obj.clone().into_real()?;

            if n < 0.0 {
                anyhow::bail!(PostScriptError::RangeCheck);
            }

            array.push(n);
        }

        // a nonempty pattern of all zeros would paint nothing
        if !array.is_empty() && array.iter().all(|&n| n == 0.0) {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        gtx.state_mut().dash = DashPattern { array, offset };

        Ok(())
    }

    fn current_dash(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        let dash = gtx.state().dash.clone();

        let elements: Vec<Object> = dash.array.iter().map(|&n| Object::real(n)).collect();
        let idx = self
            .vm_mut()
            .new_array(PostScriptArray::from_objects(elements));

        self.push(Object::literal(ObjectKind::Array(idx)));
        self.push(Object::real(dash.offset));

        Ok(())
    }

    fn set_color_space(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        let operand = self.pop()?;

        let name = match operand.kind {
            ObjectKind::Name(name) => name,
            // array form: the family name is the first element
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                match self.vm().get_arr(arr).as_slice().first() {
                    Some(Object {
                        kind: ObjectKind::Name(name),
                        ..
                    }) => name.clone(),
                    _ => anyhow::bail!(PostScriptError::TypeCheck),
                }
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        // selecting a color space resets the current color to black
        match name.as_bytes() {
            b"DeviceRGB" => gtx.state_mut().color = Color::rgb(0.0, 0.0, 0.0),
            b"DeviceGray" => gtx.state_mut().color = Color::gray(0.0),
            other => {
                log::warn!(
                    "unsupported color space {:?}",
                    String::from_utf8_lossy(other)
                );
                anyhow::bail!(PostScriptError::RangeCheck);
            }
        }

        Ok(())
    }

    /// `arc` and `arcn`: a line segment connects any existing current point
    /// to the arc's start
    fn arc(&mut self, gtx: &mut dyn GraphicsContext, clockwise: bool) -> PostScriptResult<()> {
        let end_angle = self.pop_number()?;
        let start_angle = self.pop_number()?;
        let radius = self.pop_number()?;
        let center = self.pop_point()?;

        if radius < 0.0 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        gtx.arc(center, radius, start_angle, end_angle, clockwise);

        Ok(())
    }

    /// `arct`/`arcto`: a circular fillet of radius r tangent to the lines
    /// current-point to (x1, y1) and (x1, y1) to (x2, y2)
    fn arc_tangent(
        &mut self,
        gtx: &mut dyn GraphicsContext,
        push_tangents: bool,
    ) -> PostScriptResult<()> {
        let radius = self.pop_number()?;
        let p2 = self.pop_point()?;
        let p1 = self.pop_point()?;

        if radius < 0.0 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        let p0 = gtx.current_point_user()?;

        let (t1, t2) = match tangent_arc(p0, p1, p2, radius) {
            Some(arc) => {
                gtx.line_to(arc.t1)?;
                gtx.arc(
                    arc.center,
                    radius,
                    arc.start_angle,
                    arc.end_angle,
                    arc.clockwise,
                );

                (arc.t1, arc.t2)
            }
            // collinear or degenerate: the fillet collapses to the corner
            None => {
                gtx.line_to(p1)?;
                (p1, p1)
            }
        };

        if push_tangents {
            self.push(Object::real(t1.x));
            self.push(Object::real(t1.y));
            self.push(Object::real(t2.x));
            self.push(Object::real(t2.y));
        }

        Ok(())
    }

    fn show(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        let s = self.pop_string()?;

        self.check_readable(self.vm().get_str(s).access())?;
        let text = self.vm().get_str(s).as_bytes().to_vec();

        let start = gtx.current_point_user()?;

        gtx.fill_text(&text, start)?;

        // the current point advances by the string's width
        let advance = gtx.string_width(&text)?;
        gtx.move_to(start + advance);

        Ok(())
    }

    fn pop_font_key(&mut self) -> PostScriptResult<Name> {
        match self.pop()?.kind {
            ObjectKind::Name(name) => Ok(name),
            ObjectKind::String(s) => {
                Ok(Name::from_bytes(self.vm().get_str(s).as_bytes().to_vec()))
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    /// FontDirectory first, the host registry second, and a substitution
    /// font when neither knows the name
    fn resolve_font(&mut self, name: Name) -> PostScriptResult<DictionaryIndex> {
        let directory = self.font_directory();

        if let Some(Object {
            kind: ObjectKind::Dictionary(dict),
            ..
        }) = self
            .vm()
            .get_dict(directory)
            .get(&DictKey::Name(name.clone()))
        {
            return Ok(*dict);
        }

        let description: Option<FontDescription> = self
            .font_registry()
            .and_then(|registry| registry.load_font(name.as_bytes()));

        match description {
            Some(description) => {
                let font_name = Name::from_bytes(description.name);
                font::make_font_dict(self.vm_mut(), font_name, description.font_type)
            }
            None => {
                log::warn!("findfont: substituting default font for {:?}", name);
                font::make_font_dict(self.vm_mut(), name, 1)
            }
        }
    }

    fn define_font(&mut self) -> PostScriptResult<()> {
        let font = self.pop()?;
        let key_obj = self.pop()?;

        if !matches!(font.kind, ObjectKind::Dictionary(..)) {
            anyhow::bail!(PostScriptError::TypeCheck);
        }

        let key = self.object_to_dict_key(key_obj)?;

        let directory = self.font_directory();
        self.vm_mut()
            .get_dict_mut(directory)
            .insert(key, font.clone())?;

        self.push(font);

        Ok(())
    }

    fn scale_font_dict(
        &mut self,
        dict: DictionaryIndex,
        transform: Matrix,
    ) -> PostScriptResult<DictionaryIndex> {
        let base = font::font_matrix_from_dict(self.vm(), dict)?;

        font::with_font_matrix(self.vm_mut(), dict, base * transform)
    }

    fn select_font(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        let size_or_matrix = self.pop()?;
        let name = self.pop_font_key()?;

        let base = self.resolve_font(name)?;

        let transform = match size_or_matrix.kind {
            ObjectKind::Int(..) | ObjectKind::Real(..) => {
                let scale = size_or_matrix.into_real()?;
                Matrix::scaling(scale, scale)
            }
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                if self.vm().get_arr(arr).len() != 6 {
                    anyhow::bail!(PostScriptError::RangeCheck);
                }

                self.read_matrix(arr)?
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        let scaled = self.scale_font_dict(base, transform)?;
        let info = font::font_info_from_dict(self.vm(), scaled)?;

        gtx.set_font(info);

        Ok(())
    }
}

struct TangentArc {
    t1: Point,
    t2: Point,
    center: Point,
    start_angle: f64,
    end_angle: f64,
    clockwise: bool,
}

/// The fillet geometry for `arct`: tangent points, center, and sweep of the
/// circle of the given radius tangent to both line segments at the corner
/// `p1`. Returns `None` when the three points are collinear or coincident
fn tangent_arc(p0: Point, p1: Point, p2: Point, radius: f64) -> Option<TangentArc> {
    let v1 = (p0 - p1).with_distance_from_origin(1.0);
    let v2 = (p2 - p1).with_distance_from_origin(1.0);

    let cross = v1.x * v2.y - v1.y * v2.x;

    if cross.abs() < 1e-12 || radius == 0.0 {
        return None;
    }

    let cos_angle = (v1.x * v2.x + v1.y * v2.y).clamp(-1.0, 1.0);
    let half_angle = cos_angle.acos() / 2.0;

    let tangent_distance = radius / half_angle.tan();
    let center_distance = radius / half_angle.sin();

    let t1 = p1 + v1 * tangent_distance;
    let t2 = p1 + v2 * tangent_distance;
    let center = p1 + (v1 + v2).with_distance_from_origin(center_distance);

    let start_angle = (t1.y - center.y).atan2(t1.x - center.x).to_degrees();
    let end_angle = (t2.y - center.y).atan2(t2.x - center.x).to_degrees();

    Some(TangentArc {
        t1,
        t2,
        center,
        start_angle,
        end_angle,
        clockwise: cross > 0.0,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn right_angle_fillet() {
        let arc = tangent_arc(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            10.0,
        )
        .unwrap();

        assert!((arc.t1.x - 90.0).abs() < 1e-9);
        assert!(arc.t1.y.abs() < 1e-9);
        assert!((arc.t2.x - 100.0).abs() < 1e-9);
        assert!((arc.t2.y - 10.0).abs() < 1e-9);
        assert!((arc.center.x - 90.0).abs() < 1e-9);
        assert!((arc.center.y - 10.0).abs() < 1e-9);
        assert!(!arc.clockwise);
    }

    #[test]
    fn collinear_points_collapse() {
        assert!(tangent_arc(
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(100.0, 0.0),
            10.0,
        )
        .is_none());
    }
}

#[cfg(test)]
mod graphics_test {
    use super::*;

    use crate::{
        interpreter::Interpreter,
        object::ObjectKind,
        render::{RecordedCall, RecordingContext},
    };

    const HEIGHT: f64 = 400.0;

    fn run(source: &[u8]) -> (Interpreter, RecordingContext) {
        let mut interpreter = Interpreter::load(source).unwrap();
        let mut ctx = RecordingContext::new(HEIGHT);

        interpreter.run(&mut ctx).unwrap();

        (interpreter, ctx)
    }

    fn pop_real(interpreter: &mut Interpreter) -> f64 {
        interpreter.pop().unwrap().into_real().unwrap()
    }

    #[test]
    fn stroke_emits_exact_call_sequence() {
        let (_, ctx) = run(b"newpath 10 10 moveto 20 20 lineto stroke");

        assert_eq!(
            ctx.calls(),
            &[
                RecordedCall::NewPath,
                RecordedCall::MoveTo(Point::new(10.0, 10.0)),
                RecordedCall::LineTo(Point::new(20.0, 20.0)),
                RecordedCall::Stroke,
            ]
        );
    }

    #[test]
    fn translate_shifts_current_point_coordinates() {
        let (mut interpreter, _) =
            run(b"0 0 moveto gsave 1 0 translate currentpoint grestore currentpoint");

        let y_after = pop_real(&mut interpreter);
        let x_after = pop_real(&mut interpreter);
        let y_inside = pop_real(&mut interpreter);
        let x_inside = pop_real(&mut interpreter);

        // the same device point reads one unit lower in the translated
        // system, and identically once the state is restored
        assert!((x_after - x_inside - 1.0).abs() < 1e-9);
        assert!((y_after - y_inside).abs() < 1e-9);
        assert!(x_after.abs() < 1e-9);
        assert!(y_after.abs() < 1e-9);
    }

    #[test]
    fn sin_of_ninety_degrees() {
        let (mut interpreter, _) = run(b"90 sin");

        assert!((pop_real(&mut interpreter) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn default_ctm_flips_y() {
        let (mut interpreter, _) = run(b"matrix currentmatrix");

        let arr = interpreter.pop_array().unwrap();
        let arr = interpreter.vm().get_arr(arr);

        let expected = [1.0, 0.0, 0.0, -1.0, 0.0, HEIGHT];

        for (obj, want) in arr.as_slice().iter().zip(expected) {
            let got = obj.clone().into_real().unwrap();
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }
    }

    #[test]
    fn currentmatrix_setmatrix_round_trip() {
        let (mut interpreter, _) = run(
            b"30 rotate
              matrix currentmatrix setmatrix
              matrix currentmatrix aload pop
              30 neg rotate",
        );

        // six matrix entries of the rotated CTM survive the round trip
        let f = pop_real(&mut interpreter);
        let e = pop_real(&mut interpreter);
        let d = pop_real(&mut interpreter);
        let c = pop_real(&mut interpreter);
        let b = pop_real(&mut interpreter);
        let a = pop_real(&mut interpreter);

        let expected = Matrix::rotation(30.0) * crate::graphics::default_ctm(HEIGHT, None);

        assert!((a - expected.a).abs() < 1e-9);
        assert!((b - expected.b).abs() < 1e-9);
        assert!((c - expected.c).abs() < 1e-9);
        assert!((d - expected.d).abs() < 1e-9);
        assert!((e - expected.tx).abs() < 1e-9);
        assert!((f - expected.ty).abs() < 1e-9);
    }

    #[test]
    fn translate_composes_with_ctm() {
        let (mut interpreter, _) = run(b"10 20 translate matrix currentmatrix aload pop");

        let ty = pop_real(&mut interpreter);
        let tx = pop_real(&mut interpreter);

        // T(10,20) ahead of the y-flipping default CTM
        assert!((tx - 10.0).abs() < 1e-9);
        assert!((ty - (HEIGHT - 20.0)).abs() < 1e-9);
    }

    #[test]
    fn matrix_overload_fills_operand() {
        let (mut interpreter, _) = run(b"5 7 matrix translate aload pop");

        let ty = pop_real(&mut interpreter);
        let tx = pop_real(&mut interpreter);
        let d = pop_real(&mut interpreter);
        let c = pop_real(&mut interpreter);
        let b = pop_real(&mut interpreter);
        let a = pop_real(&mut interpreter);

        assert_eq!([a, b, c, d, tx, ty], [1.0, 0.0, 0.0, 1.0, 5.0, 7.0]);
    }

    #[test]
    fn gsave_grestore_restores_paint_state() {
        let (mut interpreter, _) = run(
            b"3 setlinewidth 1 setlinecap 2 setlinejoin 4 setmiterlimit
              0.2 0.4 0.6 setrgbcolor
              [2 1] 0.5 setdash
              gsave
              9 setlinewidth 0 setlinecap 0 setlinejoin 10 setmiterlimit
              0 setgray [ ] 0 setdash
              grestore
              currentlinewidth currentlinecap currentlinejoin currentmiterlimit",
        );

        assert!((pop_real(&mut interpreter) - 4.0).abs() < 1e-9);
        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
        assert!((pop_real(&mut interpreter) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn grestore_restores_color_and_dash() {
        let (mut interpreter, _) = run(
            b"0.2 0.4 0.6 setrgbcolor [5 2] 1 setdash
              gsave 0 setgray [ ] 0 setdash grestore
              currentrgbcolor
              currentdash",
        );

        let offset = pop_real(&mut interpreter);
        assert!((offset - 1.0).abs() < 1e-9);

        let dash = interpreter.pop_array().unwrap();
        let dash = interpreter.vm().get_arr(dash);
        assert_eq!(dash.len(), 2);

        let blue = pop_real(&mut interpreter);
        let green = pop_real(&mut interpreter);
        let red = pop_real(&mut interpreter);

        assert!((red - 0.2).abs() < 1e-9);
        assert!((green - 0.4).abs() < 1e-9);
        assert!((blue - 0.6).abs() < 1e-9);
    }

    #[test]
    fn setgray_reads_back_as_rgb() {
        let (mut interpreter, _) = run(b"0.5 setgray currentrgbcolor");

        for _ in 0..3 {
            assert!((pop_real(&mut interpreter) - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn currentgray_from_rgb() {
        let (mut interpreter, _) = run(b"1 1 1 setrgbcolor currentgray");

        assert!((pop_real(&mut interpreter) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn relative_path_operators() {
        let (_, ctx) = run(b"10 10 moveto 5 -2 rlineto 1 1 rmoveto");

        assert_eq!(
            ctx.calls(),
            &[
                RecordedCall::MoveTo(Point::new(10.0, 10.0)),
                RecordedCall::LineTo(Point::new(15.0, 8.0)),
                RecordedCall::MoveTo(Point::new(16.0, 9.0)),
            ]
        );
    }

    #[test]
    fn rlineto_without_current_point() {
        let mut interpreter = Interpreter::load(b"1 2 rlineto").unwrap();
        let mut ctx = RecordingContext::new(HEIGHT);

        let err = interpreter.run(&mut ctx).unwrap_err();

        assert_eq!(
            err.downcast_ref::<PostScriptError>(),
            Some(&PostScriptError::NoCurrentPoint)
        );
    }

    #[test]
    fn curveto_records_control_points() {
        let (_, ctx) = run(b"0 0 moveto 1 2 3 4 5 6 curveto");

        assert_eq!(
            ctx.calls()[1],
            RecordedCall::BezierCurveTo(
                Point::new(1.0, 2.0),
                Point::new(3.0, 4.0),
                Point::new(5.0, 6.0)
            )
        );
    }

    #[test]
    fn rcurveto_offsets_from_current_point() {
        let (_, ctx) = run(b"10 10 moveto 1 0 2 0 3 0 rcurveto");

        assert_eq!(
            ctx.calls()[1],
            RecordedCall::BezierCurveTo(
                Point::new(11.0, 10.0),
                Point::new(12.0, 10.0),
                Point::new(13.0, 10.0)
            )
        );
    }

    #[test]
    fn arc_updates_current_point() {
        let (mut interpreter, ctx) = run(b"newpath 0 0 10 0 90 arc currentpoint");

        let y = pop_real(&mut interpreter);
        let x = pop_real(&mut interpreter);

        assert!(x.abs() < 1e-9);
        assert!((y - 10.0).abs() < 1e-9);

        assert!(matches!(
            ctx.calls()[1],
            RecordedCall::Arc {
                clockwise: false,
                ..
            }
        ));
    }

    #[test]
    fn arcn_is_clockwise() {
        let (_, ctx) = run(b"newpath 0 0 10 90 0 arcn");

        assert!(matches!(
            ctx.calls()[1],
            RecordedCall::Arc {
                clockwise: true,
                ..
            }
        ));
    }

    #[test]
    fn arcto_pushes_tangent_points() {
        let (mut interpreter, _) =
            run(b"0 0 moveto 100 0 100 100 10 arcto");

        let yt2 = pop_real(&mut interpreter);
        let xt2 = pop_real(&mut interpreter);
        let yt1 = pop_real(&mut interpreter);
        let xt1 = pop_real(&mut interpreter);

        assert!((xt1 - 90.0).abs() < 1e-9);
        assert!(yt1.abs() < 1e-9);
        assert!((xt2 - 100.0).abs() < 1e-9);
        assert!((yt2 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn fill_clears_current_point() {
        let (_, kind) = {
            let mut interpreter =
                Interpreter::load(b"0 0 moveto 10 0 lineto 10 10 lineto fill currentpoint")
                    .unwrap();
            let mut ctx = RecordingContext::new(HEIGHT);

            let err = interpreter.run(&mut ctx).unwrap_err();
            let kind = err
                .downcast_ref::<PostScriptError>()
                .map(PostScriptError::name);

            (interpreter, kind)
        };

        assert_eq!(kind, Some("nocurrentpoint"));
    }

    #[test]
    fn rect_operators_record() {
        let (_, ctx) = run(b"1 2 30 40 rectfill 5 6 70 80 rectstroke 0 0 10 10 rectclip");

        assert_eq!(
            ctx.calls(),
            &[
                RecordedCall::FillRect(Point::new(1.0, 2.0), 30.0, 40.0),
                RecordedCall::StrokeRect(Point::new(5.0, 6.0), 70.0, 80.0),
                RecordedCall::RectClip(Point::new(0.0, 0.0), 10.0, 10.0),
            ]
        );
    }

    #[test]
    fn clip_records_rule() {
        let (_, ctx) = run(b"0 0 moveto 10 0 lineto 10 10 lineto closepath clip newpath");

        assert!(ctx
            .calls()
            .contains(&RecordedCall::Clip(FillRule::NonZero)));
    }

    #[test]
    fn eoclip_records_even_odd() {
        let (_, ctx) = run(b"0 0 moveto 10 0 lineto 10 10 lineto closepath eoclip");

        assert!(ctx
            .calls()
            .contains(&RecordedCall::Clip(FillRule::EvenOdd)));
    }

    #[test]
    fn findfont_scalefont_setfont() {
        let (_, ctx) = run(b"/Helvetica findfont 12 scalefont setfont");

        match ctx.calls().last().unwrap() {
            RecordedCall::SetFont(info) => {
                assert_eq!(info.name, b"Helvetica");
                assert!((info.size() - 12.0).abs() < 1e-9);
            }
            other => panic!("expected SetFont, found {:?}", other),
        }
    }

    #[test]
    fn selectfont_shorthand() {
        let (_, ctx) = run(b"/Courier 10 selectfont");

        match ctx.calls().last().unwrap() {
            RecordedCall::SetFont(info) => {
                assert_eq!(info.name, b"Courier");
                assert!((info.size() - 10.0).abs() < 1e-9);
            }
            other => panic!("expected SetFont, found {:?}", other),
        }
    }

    #[test]
    fn show_advances_current_point() {
        let (mut interpreter, ctx) = run(
            b"/Helvetica findfont 10 scalefont setfont
              0 0 moveto (Hi) show currentpoint",
        );

        let y = pop_real(&mut interpreter);
        let x = pop_real(&mut interpreter);

        // two glyphs of fallback advance 0.6 em at 10pt
        assert!((x - 12.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);

        assert!(ctx
            .calls()
            .contains(&RecordedCall::FillText(b"Hi".to_vec(), Point::origin())));
    }

    #[test]
    fn stringwidth_matches_show_advance() {
        let (mut interpreter, _) = run(
            b"/Helvetica findfont 10 scalefont setfont (Hi) stringwidth",
        );

        let wy = pop_real(&mut interpreter);
        let wx = pop_real(&mut interpreter);

        assert!((wx - 12.0).abs() < 1e-6);
        assert!(wy.abs() < 1e-6);
    }

    #[test]
    fn show_without_font_is_invalidfont() {
        let mut interpreter = Interpreter::load(b"0 0 moveto (Hi) show").unwrap();
        let mut ctx = RecordingContext::new(HEIGHT);

        let err = interpreter.run(&mut ctx).unwrap_err();

        assert_eq!(
            err.downcast_ref::<PostScriptError>(),
            Some(&PostScriptError::InvalidFont)
        );
    }

    #[test]
    fn definefont_registers_in_font_directory() {
        let (_, ctx) = run(
            b"/MyFont 4 dict
              dup /FontName /MyFont put
              dup /FontMatrix [0.001 0 0 0.001 0 0] put
              dup /FontType 1 put
              dup /Encoding StandardEncoding put
              definefont pop
              /MyFont findfont 8 scalefont setfont",
        );

        match ctx.calls().last().unwrap() {
            RecordedCall::SetFont(info) => {
                assert_eq!(info.name, b"MyFont");
                assert!((info.size() - 8.0).abs() < 1e-9);
            }
            other => panic!("expected SetFont, found {:?}", other),
        }
    }

    #[test]
    fn makefont_applies_matrix() {
        let (_, ctx) = run(b"/Helvetica findfont [14 0 0 14 0 0] makefont setfont");

        match ctx.calls().last().unwrap() {
            RecordedCall::SetFont(info) => {
                assert!((info.size() - 14.0).abs() < 1e-9);
            }
            other => panic!("expected SetFont, found {:?}", other),
        }
    }

    #[test]
    fn charpath_records() {
        let (_, ctx) = run(
            b"/Helvetica findfont 10 scalefont setfont
              0 0 moveto (A) false charpath",
        );

        assert!(ctx
            .calls()
            .contains(&RecordedCall::CharPath(b"A".to_vec(), Point::origin())));
    }

    #[test]
    fn setdash_rejects_negative_entries() {
        let mut interpreter = Interpreter::load(b"[-1 2] 0 setdash").unwrap();
        let mut ctx = RecordingContext::new(HEIGHT);

        let err = interpreter.run(&mut ctx).unwrap_err();

        assert_eq!(
            err.downcast_ref::<PostScriptError>(),
            Some(&PostScriptError::RangeCheck)
        );
    }

    #[test]
    fn setcolorspace_resets_color() {
        let (mut interpreter, _) =
            run(b"0.9 setgray /DeviceRGB setcolorspace currentrgbcolor");

        for _ in 0..3 {
            assert!(pop_real(&mut interpreter).abs() < 1e-9);
        }
    }
}
