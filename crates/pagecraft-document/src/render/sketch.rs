// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sketch renderer — a small pure-Rust rasteriser for previews.
//
// Walks the page content stream and paints what can be drawn cheaply: filled
// and stroked paths (curves flattened to chords) in gray, RGB, or CMYK, and
// embedded images (JPEG, or raw 8-bit gray/RGB samples). Fonts are never
// loaded; each word of a text run becomes a muted bar over its approximate
// extent, so a preview shows the page layout rather than an exact rendering.
// Good enough for a thumbnail grid and needs no native library.

use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage, imageops};
use imageproc::drawing::draw_line_segment_mut;
use lopdf::content::Content;
use lopdf::{Dictionary, Object, Stream};
use pagecraft_core::error::{PagecraftError, Result};
use tracing::{debug, trace};

use super::{PageRenderer, scaled_size};
use crate::pdf::reader::{OpenedDocument, PdfReader};

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Nested q/Q deeper than this is ignored rather than grown without bound.
const MAX_STATE_DEPTH: usize = 256;

/// Chords per flattened Bézier segment.
const CURVE_STEPS: usize = 8;

/// Glyph metrics used in place of real fonts, in units of the font size.
const GLYPH_ADVANCE: f32 = 0.5;
const GLYPH_HEIGHT: f32 = 0.6;

/// Device line widths below this are drawn as one-pixel lines.
const HAIRLINE: f32 = 1.5;

type Point = (f32, f32);

/// Affine transform `[a b c d e f]` in PDF order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let [a, b, c, d, e, f] = numbers::<6>(operands)?;
        Some(Self { a, b, c, d, e, f })
    }

    fn translate(x: f32, y: f32) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::IDENTITY
        }
    }

    /// `self` applied first, then `next`.
    fn then(&self, next: &Self) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> Point {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length scaling of the transform, averaged over both axes.
    fn expansion(&self) -> f32 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

/// Text parameters carried by the graphics state (Tc, Tw, Tz, TL, Tf, Tr, Ts).
#[derive(Debug, Clone, Copy)]
struct TextState {
    char_spacing: f32,
    word_spacing: f32,
    /// Tz as a fraction, 1.0 for 100%.
    horizontal_scale: f32,
    leading: f32,
    font_size: f32,
    rise: f32,
    invisible: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            font_size: 0.0,
            rise: 0.0,
            invisible: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgb<u8>,
    stroke: Rgb<u8>,
    line_width: f32,
    text: TextState,
}

/// The current path, already in device pixels.
#[derive(Debug, Default)]
struct Path {
    subpaths: Vec<Vec<Point>>,
}

impl Path {
    fn move_to(&mut self, point: Point) {
        self.subpaths.push(vec![point]);
    }

    fn line_to(&mut self, point: Point) {
        match self.subpaths.last_mut() {
            Some(subpath) => subpath.push(point),
            None => self.subpaths.push(vec![point]),
        }
    }

    fn current(&self) -> Option<Point> {
        self.subpaths.last().and_then(|subpath| subpath.last().copied())
    }

    /// Cubic Bézier from the current point, flattened into chords.
    fn curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        let Some(start) = self.current() else {
            self.move_to(end);
            return;
        };
        for step in 1..=CURVE_STEPS {
            let t = step as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let (w0, w1, w2, w3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.line_to((
                w0 * start.0 + w1 * c1.0 + w2 * c2.0 + w3 * end.0,
                w0 * start.1 + w1 * c1.1 + w2 * c2.1 + w3 * end.1,
            ));
        }
    }

    fn close(&mut self) {
        if let Some(subpath) = self.subpaths.last_mut() {
            if let Some(&first) = subpath.first() {
                if subpath.len() > 1 && subpath.last() != Some(&first) {
                    subpath.push(first);
                }
            }
        }
    }

    fn polygon(&mut self, corners: [Point; 4]) {
        let [p0, p1, p2, p3] = corners;
        self.subpaths.push(vec![p0, p1, p2, p3, p0]);
    }

    fn take(&mut self) -> Vec<Vec<Point>> {
        std::mem::take(&mut self.subpaths)
    }
}

/// Which paint a path-painting operator applies.
#[derive(Debug, Clone, Copy)]
struct PaintOp {
    close: bool,
    /// `Some(even_odd)` when the path is filled.
    fill: Option<bool>,
    stroke: bool,
}

impl PaintOp {
    fn for_operator(operator: &str) -> Option<Self> {
        let (close, fill, stroke) = match operator {
            "f" | "F" => (false, Some(false), false),
            "f*" => (false, Some(true), false),
            "B" => (false, Some(false), true),
            "B*" => (false, Some(true), true),
            "b" => (true, Some(false), true),
            "b*" => (true, Some(true), true),
            "S" => (false, None, true),
            "s" => (true, None, true),
            "n" => (false, None, false),
            _ => return None,
        };
        Some(Self { close, fill, stroke })
    }
}

/// Paints one page onto an RGB canvas.
struct Painter<'a> {
    reader: &'a PdfReader,
    page_index: usize,
    canvas: RgbImage,
    /// User space to device pixels (y flipped, scaled, origin at MediaBox).
    device: Matrix,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    path: Path,
    text_matrix: Matrix,
    line_matrix: Matrix,
}

impl<'a> Painter<'a> {
    fn new(reader: &'a PdfReader, page_index: usize, scale: f32) -> Result<Self> {
        let [llx, lly, urx, ury] = reader.media_box(page_index);
        let (width, height) = scaled_size(page_index, urx - llx, ury - lly, scale)?;
        let device = Matrix {
            a: scale,
            b: 0.0,
            c: 0.0,
            d: -scale,
            e: -llx * scale,
            f: ury * scale,
        };
        Ok(Self {
            reader,
            page_index,
            canvas: RgbImage::from_pixel(width, height, PAPER),
            device,
            state: GraphicsState {
                ctm: Matrix::IDENTITY,
                fill: INK,
                stroke: INK,
                line_width: 1.0,
                text: TextState::default(),
            },
            saved: Vec::new(),
            path: Path::default(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
        })
    }

    fn paint(&mut self, content: &Content) {
        for operation in &content.operations {
            let operator = operation.operator.as_str();
            let operands = operation.operands.as_slice();
            if let Some(op) = PaintOp::for_operator(operator) {
                self.paint_path(op);
                continue;
            }
            match operator {
                "q" => {
                    if self.saved.len() < MAX_STATE_DEPTH {
                        self.saved.push(self.state);
                    }
                }
                "Q" => {
                    if let Some(state) = self.saved.pop() {
                        self.state = state;
                    }
                }
                "cm" => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        self.state.ctm = matrix.then(&self.state.ctm);
                    }
                }
                "w" => {
                    if let Some([width]) = numbers::<1>(operands) {
                        self.state.line_width = width.abs();
                    }
                }
                "g" | "rg" | "k" => {
                    if let Some(colour) = colour(operands) {
                        self.state.fill = colour;
                    }
                }
                "G" | "RG" | "K" => {
                    if let Some(colour) = colour(operands) {
                        self.state.stroke = colour;
                    }
                }
                "m" => {
                    if let Some([x, y]) = numbers::<2>(operands) {
                        let point = self.to_device().apply(x, y);
                        self.path.move_to(point);
                    }
                }
                "l" => {
                    if let Some([x, y]) = numbers::<2>(operands) {
                        let point = self.to_device().apply(x, y);
                        self.path.line_to(point);
                    }
                }
                "c" => {
                    if let Some([x1, y1, x2, y2, x3, y3]) = numbers::<6>(operands) {
                        let m = self.to_device();
                        self.path.curve_to(m.apply(x1, y1), m.apply(x2, y2), m.apply(x3, y3));
                    }
                }
                "v" => {
                    if let (Some([x2, y2, x3, y3]), Some(start)) = (numbers::<4>(operands), self.path.current()) {
                        let m = self.to_device();
                        self.path.curve_to(start, m.apply(x2, y2), m.apply(x3, y3));
                    }
                }
                "y" => {
                    if let Some([x1, y1, x3, y3]) = numbers::<4>(operands) {
                        let m = self.to_device();
                        let end = m.apply(x3, y3);
                        self.path.curve_to(m.apply(x1, y1), end, end);
                    }
                }
                "h" => self.path.close(),
                "re" => {
                    if let Some([x, y, w, h]) = numbers::<4>(operands) {
                        let m = self.to_device();
                        self.path.polygon([
                            m.apply(x, y),
                            m.apply(x + w, y),
                            m.apply(x + w, y + h),
                            m.apply(x, y + h),
                        ]);
                    }
                }
                "BT" => {
                    self.text_matrix = Matrix::IDENTITY;
                    self.line_matrix = Matrix::IDENTITY;
                }
                "Tc" | "Tw" | "Tz" | "TL" | "Ts" => {
                    if let Some([value]) = numbers::<1>(operands) {
                        let text = &mut self.state.text;
                        match operator {
                            "Tc" => text.char_spacing = value,
                            "Tw" => text.word_spacing = value,
                            "Tz" => text.horizontal_scale = value / 100.0,
                            "TL" => text.leading = value,
                            _ => text.rise = value,
                        }
                    }
                }
                "Tf" => {
                    if let Some(size) = operands.get(1).and_then(number) {
                        self.state.text.font_size = size;
                    }
                }
                "Tr" => {
                    if let Some([mode]) = numbers::<1>(operands) {
                        self.state.text.invisible = matches!(mode as i64, 3 | 7);
                    }
                }
                "Td" => {
                    if let Some([tx, ty]) = numbers::<2>(operands) {
                        self.next_line(tx, ty);
                    }
                }
                "TD" => {
                    if let Some([tx, ty]) = numbers::<2>(operands) {
                        self.state.text.leading = -ty;
                        self.next_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        self.text_matrix = matrix;
                        self.line_matrix = matrix;
                    }
                }
                "T*" => self.next_line(0.0, -self.state.text.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(bytes);
                    }
                }
                "'" => {
                    self.next_line(0.0, -self.state.text.leading);
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(bytes);
                    }
                }
                "\"" => {
                    if let Some([word, character]) = numbers::<2>(operands) {
                        self.state.text.word_spacing = word;
                        self.state.text.char_spacing = character;
                    }
                    self.next_line(0.0, -self.state.text.leading);
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show_text(bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show_spaced_text(items);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name);
                    }
                }
                _ => {}
            }
        }
    }

    fn to_device(&self) -> Matrix {
        self.state.ctm.then(&self.device)
    }

    fn paint_path(&mut self, op: PaintOp) {
        if op.close {
            self.path.close();
        }
        let subpaths = self.path.take();
        if let Some(even_odd) = op.fill {
            let colour = self.state.fill;
            self.fill_polygons(&subpaths, even_odd, colour);
        }
        if op.stroke {
            self.stroke_subpaths(&subpaths);
        }
    }

    /// Scanline fill of device-space polygons, sampled at pixel centres and
    /// limited to the rows and columns of the canvas.
    fn fill_polygons(&mut self, polygons: &[Vec<Point>], even_odd: bool, colour: Rgb<u8>) {
        let mut edges: Vec<(Point, Point)> = Vec::new();
        for polygon in polygons {
            let (Some(&first), Some(&last)) = (polygon.first(), polygon.last()) else {
                continue;
            };
            let closing = (last != first).then_some((last, first));
            for edge in polygon.windows(2).map(|pair| (pair[0], pair[1])).chain(closing) {
                let (p, q) = edge;
                if [p.0, p.1, q.0, q.1].iter().all(|v| v.is_finite()) && p.1 != q.1 {
                    edges.push(edge);
                }
            }
        }
        if edges.is_empty() {
            return;
        }

        let (width, height) = self.canvas.dimensions();
        let top = edges.iter().map(|(p, q)| p.1.min(q.1)).fold(f32::INFINITY, f32::min);
        let bottom = edges.iter().map(|(p, q)| p.1.max(q.1)).fold(f32::NEG_INFINITY, f32::max);
        let first_row = (top - 0.5).ceil().clamp(0.0, height as f32) as u32;
        let end_row = (bottom - 0.5).ceil().clamp(0.0, height as f32) as u32;

        let mut crossings: Vec<(f32, i32)> = Vec::new();
        for row in first_row..end_row {
            let y = row as f32 + 0.5;
            crossings.clear();
            for &((x0, y0), (x1, y1)) in &edges {
                if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
                    let x = x0 + (y - y0) / (y1 - y0) * (x1 - x0);
                    crossings.push((x, if y1 > y0 { 1 } else { -1 }));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for (index, &(x, direction)) in crossings.iter().enumerate() {
                winding += if even_odd { 1 } else { direction };
                let inside = if even_odd { winding % 2 != 0 } else { winding != 0 };
                let Some(&(next, _)) = crossings.get(index + 1) else {
                    break;
                };
                if !inside {
                    continue;
                }
                let from = (x - 0.5).ceil().clamp(0.0, width as f32) as u32;
                let to = (next - 0.5).ceil().clamp(0.0, width as f32) as u32;
                for column in from..to {
                    self.canvas.put_pixel(column, row, colour);
                }
            }
        }
    }

    fn stroke_subpaths(&mut self, subpaths: &[Vec<Point>]) {
        let colour = self.state.stroke;
        let line_width = self.state.line_width * self.to_device().expansion();
        let (width, height) = self.canvas.dimensions();

        for subpath in subpaths {
            for pair in subpath.windows(2) {
                let (start, end) = (pair[0], pair[1]);
                if line_width < HAIRLINE {
                    if let Some((from, to)) = clip_segment(start, end, width as f32, height as f32) {
                        draw_line_segment_mut(&mut self.canvas, from, to, colour);
                    }
                } else if let Some(band) = segment_band(start, end, line_width / 2.0) {
                    self.fill_polygons(&[band.to_vec()], false, colour);
                }
            }
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Advance through a string, drawing one bar per space-separated word.
    fn show_text(&mut self, bytes: &[u8]) {
        let text = self.state.text;
        let mut advance = 0.0;
        let mut word_start = None;
        let mut words = Vec::new();
        for &byte in bytes {
            let space = byte == b' ';
            if space {
                if let Some(start) = word_start.take() {
                    words.push((start, advance));
                }
            } else if word_start.is_none() {
                word_start = Some(advance);
            }
            let spacing = text.char_spacing + if space { text.word_spacing } else { 0.0 };
            advance += (GLYPH_ADVANCE * text.font_size + spacing) * text.horizontal_scale;
        }
        if let Some(start) = word_start {
            words.push((start, advance));
        }

        if !text.invisible && text.font_size != 0.0 {
            let to_device = self.text_matrix.then(&self.state.ctm).then(&self.device);
            let base = text.rise;
            let top = text.rise + GLYPH_HEIGHT * text.font_size;
            let colour = muted(self.state.fill);
            for (start, end) in words {
                let corners = [
                    to_device.apply(start, base),
                    to_device.apply(end, base),
                    to_device.apply(end, top),
                    to_device.apply(start, top),
                ];
                self.fill_polygons(&[corners.to_vec()], false, colour);
            }
        }
        self.text_matrix = Matrix::translate(advance, 0.0).then(&self.text_matrix);
    }

    /// TJ: strings interleaved with adjustments in thousandths of a text unit.
    fn show_spaced_text(&mut self, items: &[Object]) {
        for item in items {
            match item {
                Object::String(bytes, _) => self.show_text(bytes),
                other => {
                    if let Some(adjust) = number(other) {
                        let text = self.state.text;
                        let shift = -adjust / 1000.0 * text.font_size * text.horizontal_scale;
                        self.text_matrix = Matrix::translate(shift, 0.0).then(&self.text_matrix);
                    }
                }
            }
        }
    }

    /// Device-space bounding box of a user-space rectangle, clipped to the
    /// canvas. `None` when nothing is visible.
    fn device_bounds(&self, [x, y, w, h]: [f32; 4]) -> Option<(u32, u32, u32, u32)> {
        let matrix = self.to_device();
        let corners = [
            matrix.apply(x, y),
            matrix.apply(x + w, y),
            matrix.apply(x, y + h),
            matrix.apply(x + w, y + h),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

        let (width, height) = self.canvas.dimensions();
        let x0 = min_x.round().clamp(0.0, width as f32) as u32;
        let x1 = max_x.round().clamp(0.0, width as f32) as u32;
        let y0 = min_y.round().clamp(0.0, height as f32) as u32;
        let y1 = max_y.round().clamp(0.0, height as f32) as u32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }

    /// Images paint into the unit square of the current CTM. Form XObjects
    /// are not descended into.
    fn draw_xobject(&mut self, name: &[u8]) {
        let Some(stream) = self.xobject(name) else {
            trace!(name = %String::from_utf8_lossy(name), "XObject not found");
            return;
        };
        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
        if subtype != Some(b"Image".as_slice()) {
            trace!(name = %String::from_utf8_lossy(name), "skipping non-image XObject");
            return;
        }
        let Some(image) = decode_image(stream) else {
            debug!(
                page_index = self.page_index,
                name = %String::from_utf8_lossy(name),
                "unsupported image encoding, skipped"
            );
            return;
        };
        let Some((x, y, width, height)) = self.device_bounds([0.0, 0.0, 1.0, 1.0]) else {
            return;
        };
        let scaled = imageops::resize(&image, width, height, imageops::FilterType::Triangle);
        imageops::overlay(&mut self.canvas, &scaled, i64::from(x), i64::from(y));
    }

    fn xobject(&self, name: &[u8]) -> Option<&'a Stream> {
        let reader = self.reader;
        let resources = reader.resources(self.page_index)?;
        let xobjects = reader.resolve(resources.get(b"XObject").ok()?).as_dict().ok()?;
        reader.resolve(xobjects.get(name).ok()?).as_stream().ok()
    }
}

/// Decode an image XObject into RGB. JPEG data goes through the `image`
/// decoder; otherwise only unfiltered or Flate 8-bit gray/RGB is understood.
fn decode_image(stream: &Stream) -> Option<RgbImage> {
    let dict = &stream.dict;
    if has_filter(dict, b"DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .ok()
            .map(|image| image.to_rgb8());
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }
    let samples = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());

    match dict.get(b"ColorSpace").and_then(Object::as_name).ok()? {
        b"DeviceRGB" => RgbImage::from_raw(width, height, samples),
        b"DeviceGray" => GrayImage::from_raw(width, height, samples)
            .map(|gray| DynamicImage::ImageLuma8(gray).to_rgb8()),
        _ => None,
    }
}

fn has_filter(dict: &Dictionary, filter: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == filter,
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|item| matches!(item, Object::Name(name) if name == filter)),
        _ => false,
    }
}

fn number(operand: &Object) -> Option<f32> {
    match operand {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(out)
}

/// Colour operands of g/G (gray), rg/RG (RGB), or k/K (CMYK).
fn colour(operands: &[Object]) -> Option<Rgb<u8>> {
    match operands.len() {
        1 => {
            let [gray] = numbers::<1>(operands)?;
            let level = channel(gray);
            Some(Rgb([level, level, level]))
        }
        3 => {
            let [r, g, b] = numbers::<3>(operands)?;
            Some(Rgb([channel(r), channel(g), channel(b)]))
        }
        4 => {
            let [c, m, y, k] = numbers::<4>(operands)?;
            Some(Rgb([
                channel((1.0 - c) * (1.0 - k)),
                channel((1.0 - m) * (1.0 - k)),
                channel((1.0 - y) * (1.0 - k)),
            ]))
        }
        _ => None,
    }
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Halfway between `colour` and paper; text bars stand out less than fills.
fn muted(colour: Rgb<u8>) -> Rgb<u8> {
    let Rgb(channels) = colour;
    Rgb(channels.map(|value| ((u16::from(value) + 255) / 2) as u8))
}

/// Clip a device-space segment to `[0, width] x [0, height]`
/// (Liang-Barsky). `None` when it misses the canvas.
fn clip_segment(start: Point, end: Point, width: f32, height: f32) -> Option<(Point, Point)> {
    if ![start.0, start.1, end.0, end.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    for (p, q) in [(-dx, start.0), (dx, width - start.0), (-dy, start.1), (dy, height - start.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        (start.0 + t0 * dx, start.1 + t0 * dy),
        (start.0 + t1 * dx, start.1 + t1 * dy),
    ))
}

/// The quadrilateral a wide stroke covers along one segment.
fn segment_band(start: Point, end: Point, half_width: f32) -> Option<[Point; 4]> {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = dx.hypot(dy);
    if !length.is_finite() || length == 0.0 {
        return None;
    }
    let (nx, ny) = (-dy / length * half_width, dx / length * half_width);
    Some([
        (start.0 + nx, start.1 + ny),
        (end.0 + nx, end.1 + ny),
        (end.0 - nx, end.1 - ny),
        (start.0 - nx, start.1 - ny),
    ])
}

/// Layout-level preview renderer built on the content stream alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SketchRenderer;

impl SketchRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRenderer for SketchRenderer {
    fn render(&self, source: &OpenedDocument, page_index: usize, scale: f32) -> Result<DynamicImage> {
        let reader = source.reader();
        let raw = reader.page_content(page_index)?;
        let content = Content::decode(&raw).map_err(|err| PagecraftError::RenderFailure {
            page_index,
            detail: format!("content stream does not parse: {}", err),
        })?;

        let mut painter = Painter::new(reader, page_index, scale)?;
        painter.paint(&content);

        let canvas = match reader.rotation(page_index) {
            90 => imageops::rotate90(&painter.canvas),
            180 => imageops::rotate180(&painter.canvas),
            270 => imageops::rotate270(&painter.canvas),
            _ => painter.canvas,
        };
        debug!(
            page_index,
            width = canvas.width(),
            height = canvas.height(),
            operations = content.operations.len(),
            "page sketched"
        );
        Ok(DynamicImage::ImageRgb8(canvas))
    }

    fn name(&self) -> &'static str {
        "sketch"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fixtures;

    fn open(bytes: Vec<u8>) -> OpenedDocument {
        OpenedDocument::open("sketch.pdf", Arc::from(bytes)).unwrap()
    }

    #[test]
    fn canvas_follows_media_box_and_scale() {
        let doc = open(fixtures::single_page_pdf([0, 0, 200, 300], 0, "0 g 0 0 200 150 re f"));
        let image = SketchRenderer.render(&doc, 0, 0.5).unwrap().to_rgb8();

        assert_eq!(image.dimensions(), (100, 150));
        // PDF origin is bottom-left, so the bottom half is filled.
        assert_eq!(image.get_pixel(50, 120), &INK);
        assert_eq!(image.get_pixel(50, 30), &PAPER);
    }

    #[test]
    fn saved_state_restores_fill_colour_and_transform() {
        let content = "q 1 0 0 rg 2 0 0 2 0 0 cm 0 0 50 50 re f Q 150 0 50 50 re f";
        let doc = open(fixtures::single_page_pdf([0, 0, 200, 200], 0, content));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();

        // Red square scaled to 100x100 in the lower-left corner.
        assert_eq!(image.get_pixel(50, 150), &Rgb([255, 0, 0]));
        // After Q: default black, identity transform.
        assert_eq!(image.get_pixel(175, 175), &INK);
        assert_eq!(image.get_pixel(125, 150), &PAPER);
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let doc = open(fixtures::single_page_pdf([0, 0, 200, 100], 90, ""));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap();
        assert_eq!((image.width(), image.height()), (100, 200));
    }

    #[test]
    fn jpeg_images_are_painted() {
        let doc = open(fixtures::jpeg_image_pdf([200, 30, 30]));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();

        let Rgb([r, g, b]) = *image.get_pixel(50, 50);
        assert!(r > 150 && g < 100 && b < 100, "got {r},{g},{b}");
    }

    #[test]
    fn cmyk_fill_converts_to_rgb() {
        let doc = open(fixtures::single_page_pdf([0, 0, 10, 10], 0, "0 1 1 0 k 0 0 10 10 re f"));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(5, 5), &Rgb([255, 0, 0]));
    }

    #[test]
    fn matrix_concatenation_order() {
        let scale = Matrix { a: 2.0, d: 2.0, ..Matrix::IDENTITY };
        let shift = Matrix { e: 10.0, f: 5.0, ..Matrix::IDENTITY };
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn enormous_media_box_is_refused_before_allocating() {
        let doc = open(fixtures::single_page_pdf([0, 0, 1_000_000_000, 1_000_000_000], 0, ""));
        assert!(matches!(
            SketchRenderer.render(&doc, 0, 1.0),
            Err(PagecraftError::RenderFailure { page_index: 0, .. })
        ));
    }

    #[test]
    fn closed_paths_fill_their_interior() {
        let doc = open(fixtures::single_page_pdf([0, 0, 100, 100], 0, "0 0 m 100 0 l 0 100 l h f"));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(10, 90), &INK);
        assert_eq!(image.get_pixel(90, 10), &PAPER);

        let blob = "50 0 m 100 0 100 100 50 100 c 0 100 0 0 50 0 c f";
        let doc = open(fixtures::single_page_pdf([0, 0, 100, 100], 0, blob));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(50, 50), &INK);
        assert_eq!(image.get_pixel(2, 2), &PAPER);
    }

    #[test]
    fn fill_rules_differ_on_nested_rectangles() {
        let nonzero = open(fixtures::single_page_pdf([0, 0, 100, 100], 0, "0 0 100 100 re 25 25 50 50 re f"));
        let even_odd = open(fixtures::single_page_pdf([0, 0, 100, 100], 0, "0 0 100 100 re 25 25 50 50 re f*"));

        let image = SketchRenderer.render(&nonzero, 0, 1.0).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(50, 50), &INK);
        let image = SketchRenderer.render(&even_odd, 0, 1.0).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(50, 50), &PAPER);
        assert_eq!(image.get_pixel(10, 10), &INK);
    }

    #[test]
    fn strokes_use_the_stroke_colour_and_width() {
        let content = "0 0 1 RG 10 10 m 190 10 l S 1 0 0 RG 5 w 10 50 m 190 50 l S";
        let doc = open(fixtures::single_page_pdf([0, 0, 200, 100], 0, content));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();

        assert_eq!(image.get_pixel(100, 90), &Rgb([0, 0, 255]));
        assert_eq!(image.get_pixel(100, 49), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(100, 51), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(100, 70), &PAPER);
    }

    #[test]
    fn text_runs_leave_a_bar_per_word() {
        let content = "BT /F1 20 Tf 10 50 Td (Hello world) Tj ET";
        let doc = open(fixtures::single_page_pdf([0, 0, 200, 100], 0, content));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();

        let Rgb([r, g, b]) = *image.get_pixel(30, 45);
        assert!(r < 200 && r == g && g == b, "got {r},{g},{b}");
        assert_ne!(image.get_pixel(90, 45), &PAPER);
        // The gap between the words and the space past the run stay blank.
        assert_eq!(image.get_pixel(65, 45), &PAPER);
        assert_eq!(image.get_pixel(150, 45), &PAPER);
    }

    #[test]
    fn spaced_and_invisible_text() {
        let content = "BT /F1 10 Tf 0 10 Td [(ab) -2000 (cd)] TJ ET";
        let doc = open(fixtures::single_page_pdf([0, 0, 100, 20], 0, content));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();
        // "ab" covers 0..10, the adjustment skips 20, "cd" covers 30..40.
        assert_ne!(image.get_pixel(5, 7), &PAPER);
        assert_eq!(image.get_pixel(20, 7), &PAPER);
        assert_ne!(image.get_pixel(35, 7), &PAPER);

        let hidden = "BT 3 Tr /F1 10 Tf 0 10 Td (ab) Tj ET";
        let doc = open(fixtures::single_page_pdf([0, 0, 100, 20], 0, hidden));
        let image = SketchRenderer.render(&doc, 0, 1.0).unwrap().to_rgb8();
        assert!(image.pixels().all(|pixel| *pixel == PAPER));
    }
}
