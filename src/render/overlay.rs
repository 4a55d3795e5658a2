//! Debug overlays: boxes drawn onto page rasters, packed into one PDF.

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::{BBox, BlockCategory, MiddleDocument, Page, SpanKind};

/// A rectangle to draw, in page units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayBox {
    /// Region
    pub bbox: BBox,
    /// Stroke color
    pub color: [u8; 3],
}

impl OverlayBox {
    /// Create a new overlay box.
    pub fn new(bbox: BBox, color: [u8; 3]) -> Self {
        Self { bbox, color }
    }
}

fn category_color(category: BlockCategory) -> [u8; 3] {
    match category {
        BlockCategory::Title => [102, 102, 255],
        BlockCategory::PlainText => [153, 0, 76],
        BlockCategory::Image => [153, 255, 51],
        BlockCategory::ImageCaption | BlockCategory::ImageFootnote => [102, 178, 255],
        BlockCategory::Table => [204, 204, 0],
        BlockCategory::TableCaption | BlockCategory::TableFootnote => [255, 153, 51],
        BlockCategory::Formula | BlockCategory::FormulaCaption => [0, 255, 0],
        BlockCategory::InlineFormula => [0, 153, 153],
        BlockCategory::Abandon => [158, 158, 158],
    }
}

fn span_color(kind: SpanKind) -> [u8; 3] {
    match kind {
        SpanKind::Text => [255, 0, 0],
        SpanKind::Image => [0, 255, 0],
        SpanKind::Table => [204, 0, 255],
        SpanKind::Formula => [0, 0, 255],
        SpanKind::InlineFormula => [0, 255, 255],
    }
}

/// Raw layout detections of every page.
pub fn model_boxes(pages: &[Page]) -> Vec<Vec<OverlayBox>> {
    pages
        .iter()
        .map(|page| {
            page.layout_blocks
                .iter()
                .filter(|b| b.bbox.is_valid())
                .map(|b| OverlayBox::new(b.bbox, category_color(b.category)))
                .collect()
        })
        .collect()
}

/// Assembled blocks of every page, nested and discarded ones included.
pub fn layout_boxes(doc: &MiddleDocument) -> Vec<Vec<OverlayBox>> {
    doc.pages()
        .iter()
        .map(|page| {
            page.all_blocks()
                .into_iter()
                .map(|b| OverlayBox::new(b.bbox, category_color(b.category)))
                .collect()
        })
        .collect()
}

/// Spans of every page.
pub fn span_boxes(doc: &MiddleDocument) -> Vec<Vec<OverlayBox>> {
    doc.pages()
        .iter()
        .map(|page| {
            page.all_blocks()
                .into_iter()
                .flat_map(|b| b.spans())
                .map(|s| OverlayBox::new(s.bbox, span_color(s.kind)))
                .collect()
        })
        .collect()
}

/// Draw `boxes[i]` onto a copy of page `i`'s raster (a blank canvas when the
/// page has none).
pub fn draw_page(page: &Page, boxes: &[OverlayBox]) -> RgbImage {
    let mut canvas = match &page.raster {
        Some(raster) => raster.as_ref().clone(),
        None => RgbImage::from_pixel(
            page.width.ceil().max(1.0) as u32,
            page.height.ceil().max(1.0) as u32,
            Rgb([255, 255, 255]),
        ),
    };
    let scale = page.raster_scale();
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    for b in boxes.iter().filter(|b| b.bbox.is_valid()) {
        let px = b.bbox.scale(scale).clamp_to(w, h);
        let rect = Rect::at(px.x0 as i32, px.y0 as i32)
            .of_size((px.width() as u32).max(1), (px.height() as u32).max(1));
        draw_hollow_rect_mut(&mut canvas, rect, Rgb(b.color));
        if rect.width() > 2 && rect.height() > 2 {
            let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                .of_size(rect.width() - 2, rect.height() - 2);
            draw_hollow_rect_mut(&mut canvas, inner, Rgb(b.color));
        }
    }
    canvas
}

/// Render one overlay page per input page and pack them into a PDF.
pub fn render_overlay_pdf(pages: &[Page], boxes: &[Vec<OverlayBox>]) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for (i, page) in pages.iter().enumerate() {
        let page_boxes = boxes.get(i).map(|b| b.as_slice()).unwrap_or(&[]);
        let image = draw_page(page, page_boxes);
        let (iw, ih) = image.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(image.as_raw())?;
        let data = encoder.finish()?;

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => iw as i64,
                "Height" => ih as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "FlateDecode",
            },
            data,
        ));

        let pw = page.width.max(1.0);
        let ph = page.height.max(1.0);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::from(pw),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::from(ph),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::from(pw),
                Object::from(ph),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::Render(format!("overlay PDF: {}", e)))?;
    Ok(output)
}

/// Draw a box set onto the page rasters and write a multi-page PDF.
pub fn draw_overlays(pages: &[Page], boxes: &[Vec<OverlayBox>], output_path: &Path) -> Result<()> {
    let bytes = render_overlay_pdf(pages, boxes)?;
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, bytes)?;
    log::info!("Wrote overlay {}", output_path.display());
    Ok(())
}
