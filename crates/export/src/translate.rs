//! Annotation to content-stream translation
//!
//! Each annotation becomes a self-contained `q`..`Q` block of PDF
//! operators in page space (bottom-left origin). Opacity goes through
//! named ExtGState entries and text through two Type1 font resources;
//! the translator records which names a page ends up using so the
//! caller can register exactly those resources.

use std::collections::BTreeSet;

use lopdf::content::Operation;
use lopdf::{Document, Object};
use redline_core::{Annotation, Point, Shape};

use crate::images::ImageTable;
use crate::transform::{parse_hex_color, PageTransform};

/// Highlighter strokes widen by this factor
const HIGHLIGHTER_WIDTH_FACTOR: f32 = 5.0;

/// Squiggly wave amplitude in page units
const SQUIGGLE_AMPLITUDE: f32 = 2.0;

/// Resource name of the regular text font (Helvetica)
pub const FONT_REGULAR: &str = "RLF1";

/// Resource name of the stamp label font (Helvetica-Bold)
pub const FONT_BOLD: &str = "RLF2";

/// Alpha percentages: highlighter ink, stamp box, stamp timestamp
pub const ALPHA_HIGHLIGHTER: u16 = 40;
pub const ALPHA_STAMP: u16 = 80;
pub const ALPHA_TIMESTAMP: u16 = 70;

/// ExtGState resource name for an alpha percentage
pub fn alpha_name(percent: u16) -> String {
    format!("RLGS{percent}")
}

/// Resources a page's annotation block ended up referencing
#[derive(Debug, Default)]
pub struct PageNeeds {
    pub alphas: BTreeSet<u16>,
    pub regular_font: bool,
    pub bold_font: bool,
    pub images: BTreeSet<String>,
}

impl PageNeeds {
    fn alpha(&mut self, percent: u16) -> String {
        self.alphas.insert(percent);
        alpha_name(percent)
    }
}

/// Append the operator block for one annotation
///
/// Signature/initials annotations with an undecodable payload are
/// skipped (the image table logs them); everything else always emits.
pub fn push_annotation_ops(
    ops: &mut Vec<Operation>,
    needs: &mut PageNeeds,
    doc: &mut Document,
    images: &mut ImageTable,
    annotation: &Annotation,
    t: &PageTransform,
) {
    let (r, g, b) = parse_hex_color(&annotation.color);
    let stroke_width = t.len_x(annotation.stroke_width);

    match &annotation.shape {
        Shape::Pen { points } | Shape::Underline { points } | Shape::Strikethrough { points } => {
            stroke_polyline(ops, points, t, (r, g, b), stroke_width, None);
        }
        Shape::Highlighter { points } => {
            let gs = needs.alpha(ALPHA_HIGHLIGHTER);
            stroke_polyline(
                ops,
                points,
                t,
                (r, g, b),
                stroke_width * HIGHLIGHTER_WIDTH_FACTOR,
                Some(gs),
            );
        }
        Shape::Squiggly { points } => {
            stroke_squiggle(ops, points, t, (r, g, b), stroke_width);
        }
        Shape::Rectangle { x, y, width, height } => {
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new("w", vec![stroke_width.into()]));
            ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
            ops.push(Operation::new(
                "re",
                vec![
                    t.x(*x).into(),
                    t.y(y + height).into(),
                    t.len_x(*width).into(),
                    t.len_y(*height).into(),
                ],
            ));
            ops.push(Operation::new("S", vec![]));
            ops.push(Operation::new("Q", vec![]));
        }
        Shape::Circle { cx, cy, rx, ry } => {
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new("w", vec![stroke_width.into()]));
            ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
            ellipse_path(ops, t.x(*cx), t.y(*cy), t.len_x(*rx), t.len_y(*ry));
            ops.push(Operation::new("s", vec![]));
            ops.push(Operation::new("Q", vec![]));
        }
        Shape::Text { x, y, content, font_size, .. } => {
            needs.regular_font = true;
            let size = t.len_y(*font_size);
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec![Object::Name(FONT_REGULAR.into()), size.into()]));
            ops.push(Operation::new("TL", vec![(size * 1.2).into()]));
            // Baseline of the first line sits one em below the box top.
            ops.push(Operation::new(
                "Td",
                vec![t.x(*x).into(), t.y(y + font_size).into()],
            ));
            for (i, line) in content.lines().enumerate() {
                if i > 0 {
                    ops.push(Operation::new("T*", vec![]));
                }
                ops.push(Operation::new("Tj", vec![Object::string_literal(line)]));
            }
            ops.push(Operation::new("ET", vec![]));
            ops.push(Operation::new("Q", vec![]));
        }
        Shape::Stamp { x, y, width, height, text, font_size, timestamp } => {
            needs.bold_font = true;
            let gs_box = needs.alpha(ALPHA_STAMP);

            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new("gs", vec![Object::Name(gs_box.into_bytes())]));
            ops.push(Operation::new("w", vec![2.0_f32.into()]));
            ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
            ops.push(Operation::new(
                "re",
                vec![
                    t.x(*x).into(),
                    t.y(y + height).into(),
                    t.len_x(*width).into(),
                    t.len_y(*height).into(),
                ],
            ));
            ops.push(Operation::new("S", vec![]));

            let label_size = t.len_y(*font_size);
            centered_text(
                ops,
                FONT_BOLD,
                text,
                label_size,
                t.x(x + width / 2.0),
                t.y(y + height * 0.35),
                (r, g, b),
                None,
            );

            if let Some(timestamp) = timestamp {
                let gs_time = needs.alpha(ALPHA_TIMESTAMP);
                centered_text(
                    ops,
                    FONT_BOLD,
                    timestamp,
                    label_size * 0.45,
                    t.x(x + width / 2.0),
                    t.y(y + height * 0.70),
                    (r, g, b),
                    Some(gs_time),
                );
            }
            ops.push(Operation::new("Q", vec![]));
        }
        Shape::Signature { x, y, width, height, image_data }
        | Shape::Initials { x, y, width, height, image_data } => {
            let Some((name, _)) = images.ensure(doc, image_data) else {
                return;
            };
            needs.images.insert(name.clone());
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![
                    t.len_x(*width).into(),
                    0.into(),
                    0.into(),
                    t.len_y(*height).into(),
                    t.x(*x).into(),
                    t.y(y + height).into(),
                ],
            ));
            ops.push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
            ops.push(Operation::new("Q", vec![]));
        }
    }
}

fn stroke_polyline(
    ops: &mut Vec<Operation>,
    points: &[Point],
    t: &PageTransform,
    (r, g, b): (f32, f32, f32),
    width: f32,
    gs: Option<String>,
) {
    let Some(first) = points.first() else {
        return;
    };
    if points.len() < 2 {
        return;
    }

    ops.push(Operation::new("q", vec![]));
    if let Some(gs) = gs {
        ops.push(Operation::new("gs", vec![Object::Name(gs.into_bytes())]));
    }
    ops.push(Operation::new("J", vec![1.into()]));
    ops.push(Operation::new("j", vec![1.into()]));
    ops.push(Operation::new("w", vec![width.into()]));
    ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
    ops.push(Operation::new("m", vec![t.x(first.x).into(), t.y(first.y).into()]));
    for p in &points[1..] {
        ops.push(Operation::new("l", vec![t.x(p.x).into(), t.y(p.y).into()]));
    }
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

/// Wavy stroke: one quadratic arc per recorded point with alternating
/// amplitude, emitted as cubics (PDF has no quadratic operator)
fn stroke_squiggle(
    ops: &mut Vec<Operation>,
    points: &[Point],
    t: &PageTransform,
    (r, g, b): (f32, f32, f32),
    width: f32,
) {
    if points.len() < 2 {
        return;
    }

    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("J", vec![1.into()]));
    ops.push(Operation::new("j", vec![1.into()]));
    ops.push(Operation::new("w", vec![width.into()]));
    ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
    ops.push(Operation::new(
        "m",
        vec![t.x(points[0].x).into(), t.y(points[0].y).into()],
    ));

    let mut prev = points[0];
    for (i, p) in points.iter().enumerate().skip(1) {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let control = Point::new(p.x - 2.5, p.y + sign * SQUIGGLE_AMPLITUDE);

        // Quadratic (prev, control, p) as a cubic with both handles
        // two thirds of the way toward the control point.
        let c1x = prev.x + 2.0 / 3.0 * (control.x - prev.x);
        let c1y = prev.y + 2.0 / 3.0 * (control.y - prev.y);
        let c2x = p.x + 2.0 / 3.0 * (control.x - p.x);
        let c2y = p.y + 2.0 / 3.0 * (control.y - p.y);
        ops.push(Operation::new(
            "c",
            vec![
                t.x(c1x).into(),
                t.y(c1y).into(),
                t.x(c2x).into(),
                t.y(c2y).into(),
                t.x(p.x).into(),
                t.y(p.y).into(),
            ],
        ));
        prev = *p;
    }
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

/// Four-arc Bezier ellipse, kappa = 0.5523
fn ellipse_path(ops: &mut Vec<Operation>, cx: f32, cy: f32, rx: f32, ry: f32) {
    const KAPPA: f32 = 0.5523;
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);

    ops.push(Operation::new("m", vec![(cx + rx).into(), cy.into()]));
    ops.push(Operation::new(
        "c",
        vec![
            (cx + rx).into(),
            (cy + ky).into(),
            (cx + kx).into(),
            (cy + ry).into(),
            cx.into(),
            (cy + ry).into(),
        ],
    ));
    ops.push(Operation::new(
        "c",
        vec![
            (cx - kx).into(),
            (cy + ry).into(),
            (cx - rx).into(),
            (cy + ky).into(),
            (cx - rx).into(),
            cy.into(),
        ],
    ));
    ops.push(Operation::new(
        "c",
        vec![
            (cx - rx).into(),
            (cy - ky).into(),
            (cx - kx).into(),
            (cy - ry).into(),
            cx.into(),
            (cy - ry).into(),
        ],
    ));
    ops.push(Operation::new(
        "c",
        vec![
            (cx + kx).into(),
            (cy - ry).into(),
            (cx + rx).into(),
            (cy - ky).into(),
            (cx + rx).into(),
            cy.into(),
        ],
    ));
}

/// Average Helvetica advance for the all-caps stamp alphabet
const STAMP_CHAR_WIDTH_EM: f32 = 0.6;

#[allow(clippy::too_many_arguments)]
fn centered_text(
    ops: &mut Vec<Operation>,
    font: &str,
    text: &str,
    size: f32,
    center_x: f32,
    baseline_y: f32,
    (r, g, b): (f32, f32, f32),
    gs: Option<String>,
) {
    let width = text.chars().count() as f32 * size * STAMP_CHAR_WIDTH_EM;
    ops.push(Operation::new("q", vec![]));
    if let Some(gs) = gs {
        ops.push(Operation::new("gs", vec![Object::Name(gs.into_bytes())]));
    }
    ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![Object::Name(font.into()), size.into()]));
    ops.push(Operation::new(
        "Td",
        vec![(center_x - width / 2.0).into(), baseline_y.into()],
    ));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
    ops.push(Operation::new("Q", vec![]));
}
