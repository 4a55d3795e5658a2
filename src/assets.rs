//! Image and table assets cropped from page rasters.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::model::{BBox, Block, MiddleDocument, Page, Span};
use crate::writer::DataWriter;

/// Deterministic asset file name for a region: SHA-256 of page index and box.
pub fn asset_name(page_idx: usize, bbox: &BBox) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{}:{:.2},{:.2},{:.2},{:.2}",
            page_idx, bbox.x0, bbox.y0, bbox.x1, bbox.y1
        )
        .as_bytes(),
    );
    format!("{}.jpg", hex::encode(hasher.finalize()))
}

/// Crop `bbox` (page units) from a raster, `None` when the region is empty.
pub fn crop_region(raster: &RgbImage, bbox: &BBox, scale: f32) -> Option<RgbImage> {
    let (w, h) = (raster.width() as f32, raster.height() as f32);
    let px = bbox.scale(scale).clamp_to(w, h);
    let x = px.x0.floor() as u32;
    let y = px.y0.floor() as u32;
    let width = (px.x1.ceil() as u32).saturating_sub(x);
    let height = (px.y1.ceil() as u32).saturating_sub(y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(image::imageops::crop_imm(raster, x, y, width, height).to_image())
}

/// Encode an image as JPEG.
pub fn encode_jpeg(image: RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut buffer, ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}

/// Crop every image and table span from the page rasters and write it to
/// `image_dir/<asset name>`. Returns the number of assets written.
///
/// Pages without a raster are skipped with a warning.
pub fn export_assets(
    doc: &MiddleDocument,
    pages: &[Page],
    writer: &dyn DataWriter,
    image_dir: &str,
) -> Result<usize> {
    let counts: Vec<usize> = doc
        .pages()
        .par_iter()
        .map(|middle| -> Result<usize> {
            let spans: Vec<&Span> = middle
                .blocks
                .iter()
                .flat_map(asset_spans)
                .collect();
            if spans.is_empty() {
                return Ok(0);
            }
            let Some(page) = pages.iter().find(|p| p.index == middle.page_idx) else {
                return Ok(0);
            };
            let Some(raster) = page.raster.as_ref() else {
                log::warn!(
                    "Page {}: no raster, skipped {} image assets",
                    middle.page_idx,
                    spans.len()
                );
                return Ok(0);
            };

            let scale = page.raster_scale();
            let mut written = 0;
            for span in spans {
                let Some(name) = span.image_path.as_deref() else {
                    continue;
                };
                let Some(crop) = crop_region(raster, &span.bbox, scale) else {
                    continue;
                };
                let path = join_path(image_dir, name);
                writer.write(&path, &encode_jpeg(crop)?)?;
                written += 1;
            }
            Ok(written)
        })
        .collect::<Result<_>>()?;

    let total = counts.iter().sum();
    log::info!("Exported {} image assets", total);
    Ok(total)
}

fn asset_spans(block: &Block) -> Vec<&Span> {
    block
        .spans()
        .filter(|s| s.image_path.is_some())
        .collect()
}

pub(crate) fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_name_deterministic() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let a = asset_name(0, &b);
        assert_eq!(a, asset_name(0, &b));
        assert_ne!(a, asset_name(1, &b));
        assert_eq!(a.len(), 64 + 4);
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn test_crop_region() {
        let raster = RgbImage::new(200, 200);
        let crop = crop_region(&raster, &BBox::new(10.0, 10.0, 50.0, 30.0), 2.0).unwrap();
        assert_eq!((crop.width(), crop.height()), (80, 40));
        assert!(crop_region(&raster, &BBox::new(150.0, 150.0, 160.0, 160.0), 2.0).is_none());
    }

    #[test]
    fn test_encode_jpeg() {
        let bytes = encode_jpeg(RgbImage::new(8, 8)).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("images/", "a.jpg"), "images/a.jpg");
        assert_eq!(join_path("", "a.jpg"), "a.jpg");
    }
}
