//! PDF rendering of a [`Report`].

use crate::error::{Error, Result};
use crate::report::{Report, format_confidence};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::Path;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const THUMB_MAX: u32 = 200;
const BAR_MAX_WIDTH: f32 = 280.0;

/// Render `report` as a single A4 page.
pub fn render_pdf(report: &Report) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let thumb = report.source.thumbnail(THUMB_MAX);
    let (thumb_w, thumb_h) = thumb.dimensions();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => thumb_w as i64,
            "Height" => thumb_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        },
        thumb.into_raw(),
    ));

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
            "F2" => bold_id,
        },
        "XObject" => dictionary! {
            "Im1" => image_id,
        },
    });

    let content = Content {
        operations: page_operations(report, thumb_w as i64, thumb_h as i64),
    };
    let encoded = content.encode().map_err(pdf_error)?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1_i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0_i64.into(), 0_i64.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(pdf_error)?;
    Ok(out)
}

pub fn save_pdf(report: &Report, path: impl AsRef<Path>) -> Result<()> {
    let bytes = render_pdf(report)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn page_operations(report: &Report, thumb_w: i64, thumb_h: i64) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN - 20;
    text(&mut ops, "F2", 20, MARGIN, y, &report.title);

    y -= 20;
    let thumb_bottom = y - thumb_h;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![
            thumb_w.into(),
            0_i64.into(),
            0_i64.into(),
            thumb_h.into(),
            MARGIN.into(),
            thumb_bottom.into(),
        ],
    ));
    ops.push(Operation::new("Do", vec!["Im1".into()]));
    ops.push(Operation::new("Q", vec![]));
    text(
        &mut ops,
        "F1",
        9,
        MARGIN,
        thumb_bottom - 14,
        &format!("Source image: {} x {} px", report.image_width, report.image_height),
    );

    y = thumb_bottom - 50;
    for (kind, prediction) in report.rows() {
        let marker = if kind == report.best_model { "  (best)" } else { "" };
        let heading = format!(
            "{kind}: {} - {}{marker}",
            prediction.predicted_label,
            format_confidence(prediction.confidence)
        );
        text(&mut ops, "F2", 13, MARGIN, y, &heading);
        y -= 20;

        for (idx, (label, prob)) in report
            .labels
            .iter()
            .zip(&prediction.probability_distribution)
            .enumerate()
        {
            text(&mut ops, "F1", 10, MARGIN + 20, y, label);
            let width = (prob.clamp(0.0, 1.0) * BAR_MAX_WIDTH).round() as i64;
            let shade = if idx == prediction.class_index { 0.2 } else { 0.7 };
            ops.push(Operation::new("g", vec![Object::Real(shade)]));
            ops.push(Operation::new(
                "re",
                vec![
                    (MARGIN + 170).into(),
                    (y - 2).into(),
                    width.max(1).into(),
                    10_i64.into(),
                ],
            ));
            ops.push(Operation::new("f", vec![]));
            ops.push(Operation::new("g", vec![0_i64.into()]));
            text(
                &mut ops,
                "F1",
                10,
                MARGIN + 180 + BAR_MAX_WIDTH as i64,
                y,
                &format_confidence(*prob),
            );
            y -= 16;
        }
        y -= 20;
    }

    text(&mut ops, "F2", 14, MARGIN, y, &report.conclusion());
    if report.models_agree() {
        text(&mut ops, "F1", 10, MARGIN, y - 18, "Both models predict the same species.");
    } else {
        text(&mut ops, "F1", 10, MARGIN, y - 18, "The models disagree on the species.");
    }
    ops
}

fn text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, s: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(s))]));
    ops.push(Operation::new("ET", vec![]));
}

/// Latin-1 subset of WinAnsi; anything else becomes `?`.
fn win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if (c as u32) < 256 { c as u32 as u8 } else { b'?' })
        .collect()
}

fn pdf_error(err: impl std::fmt::Display) -> Error {
    Error::Export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::default_labels;
    use crate::compare::compare;
    use crate::inference::ScoreVector;
    use crate::report::assemble;
    use crate::sample::ImageSample;
    use image::{Rgb, RgbImage};

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn report() -> Report {
        let result = compare(
            &ScoreVector(vec![0.1, 0.7, 0.2]),
            &ScoreVector(vec![0.2, 0.3, 0.5]),
            &default_labels(),
        )
        .unwrap();
        let img = ImageSample::from_rgb(RgbImage::from_pixel(500, 300, Rgb([40, 160, 60])));
        assemble(result, &img)
    }

    #[test]
    fn pdf_contains_load_bearing_fields() {
        let bytes = render_pdf(&report()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, "Cactus Classification Report"));
        assert!(contains(&bytes, "CNN: Ferocactus - 70.00%"));
        assert!(contains(&bytes, "MobileNetV2: Gymnocalycium - 50.00%"));
        assert!(contains(&bytes, "Best model: CNN"));
        assert!(contains(&bytes, "/Im1 Do"));
    }

    #[test]
    fn pdf_parses_back_as_one_page() {
        let bytes = render_pdf(&report()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(win_ansi("Kaktus ü 🌵"), b"Kaktus \xfc ?".to_vec());
    }
}
