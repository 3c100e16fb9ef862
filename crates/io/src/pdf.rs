//! PDF writer.
//!
//! Replays a [`PdfLayout`] onto printpdf pages using the builtin Helvetica
//! family. Layout works in points from the top of the page; printpdf wants
//! millimetres from the bottom.

use std::time::Instant;

use printpdf::{
    BuiltinFont, Color as PdfColor, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};

use statdeck_config::Color;
use statdeck_core::Section;

use crate::filename::ExportKind;
use crate::options::{ExportOptions, ExportResult};
use crate::pdf_layout::{build_pdf_layout, DrawOp, FontStyle, PdfLayout, PdfPage};

const MM_PER_PT: f32 = 25.4 / 72.0;
const DOCUMENT_TITLE: &str = "Chat Export";

fn mm(points: f32) -> Mm {
    Mm(points * MM_PER_PT)
}

fn pdf_color(color: Color) -> PdfColor {
    let (r, g, b) = color.to_unit();
    PdfColor::Rgb(Rgb::new(r, g, b, None))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

/// Export sections to PDF bytes.
pub fn export_to_pdf(sections: &[Section], opts: &ExportOptions) -> Result<(Vec<u8>, ExportResult), String> {
    let start = Instant::now();

    let layout = build_pdf_layout(sections, opts);
    let bytes = write_pdf(&layout, DOCUMENT_TITLE)?;

    let mut result = ExportResult::new(ExportKind::Pdf);
    result.sections_exported = sections.len();
    result.units = layout.pages.len();
    result.tables_split = layout.tables_split;
    result.placeholders = layout.placeholders;
    result.malformed_sections = layout.malformed_sections;
    result.bytes_written = bytes.len();
    result.export_duration_ms = start.elapsed().as_millis();
    log::debug!("pdf export: {}", result.summary());
    Ok((bytes, result))
}

/// Render a finished layout.
pub fn write_pdf(layout: &PdfLayout, title: &str) -> Result<Vec<u8>, String> {
    let (width, height) = (mm(layout.width), mm(layout.height));
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");

    let load = |font| doc.add_builtin_font(font).map_err(|e| format!("Failed to load font: {}", e));
    let fonts = Fonts {
        regular: load(BuiltinFont::Helvetica)?,
        bold: load(BuiltinFont::HelveticaBold)?,
        italic: load(BuiltinFont::HelveticaOblique)?,
    };

    for (i, page) in layout.pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(width, height, "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        draw_page(&layer, page, layout.height, &fonts);
    }

    doc.save_to_bytes().map_err(|e| format!("Failed to write PDF: {}", e))
}

fn draw_page(layer: &PdfLayerReference, page: &PdfPage, page_height: f32, fonts: &Fonts) {
    for op in &page.ops {
        match op {
            DrawOp::Text { x, y, size, style, color, text } => {
                layer.set_fill_color(pdf_color(*color));
                layer.use_text(text.as_str(), *size, mm(*x), mm(page_height - *y), fonts.get(*style));
            }
            DrawOp::Rule { x1, x2, y, color } => {
                let y = mm(page_height - *y);
                layer.set_outline_color(pdf_color(*color));
                layer.set_outline_thickness(0.5);
                layer.add_line(Line {
                    points: vec![(Point::new(mm(*x1), y), false), (Point::new(mm(*x2), y), false)],
                    is_closed: false,
                });
            }
        }
    }
}
