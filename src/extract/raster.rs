//! Images: dimensions from the `image` decoder, plus an optional caption
//! from the enrichment model.
//!
//! A caption failure is logged and the image is rendered without one; only
//! an undecodable image fails the strategy.

use super::{read_staged, ExtractRequest};
use crate::enrichment::encode_image;
use crate::error::ExtractError;
use crate::pipeline::select::ConverterCategory;
use image::ImageReader;
use std::io::Cursor;
use tracing::{debug, warn};

const CATEGORY: ConverterCategory = ConverterCategory::Image;

/// What the decoder learned about an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

/// Decode the header of an in-memory image.
pub fn inspect(bytes: &[u8]) -> Result<ImageInfo, ExtractError> {
    let format = image::guess_format(bytes).map_err(|e| ExtractError::failed(CATEGORY, e))?;
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| ExtractError::failed(CATEGORY, e))?;
    Ok(ImageInfo {
        width,
        height,
        mime_type: format.to_mime_type(),
    })
}

pub async fn extract(req: ExtractRequest) -> Result<String, ExtractError> {
    let path = req.path.clone();
    let (bytes, info) = tokio::task::spawn_blocking(move || {
        let bytes = read_staged(&path, CATEGORY)?;
        let info = inspect(&bytes)?;
        Ok::<_, ExtractError>((bytes, info))
    })
    .await
    .map_err(|e| ExtractError::TaskPanicked {
        category: CATEGORY,
        detail: e.to_string(),
    })??;
    debug!(width = info.width, height = info.height, mime = info.mime_type, "Inspected image");

    let caption = match &req.enrichment {
        Some(enrichment) => {
            match enrichment
                .caption_image(encode_image(&bytes, info.mime_type))
                .await
            {
                Ok(caption) if !caption.is_empty() => Some(caption),
                Ok(_) => None,
                Err(e) => {
                    warn!(filename = %req.filename, error = %e, "Image caption failed");
                    None
                }
            }
        }
        None => None,
    };

    Ok(render(&req.filename, &info, caption.as_deref()))
}

fn render(filename: &str, info: &ImageInfo, caption: Option<&str>) -> String {
    let mut md = format!("# {filename}\n\nImageSize: {}x{}", info.width, info.height);
    if let Some(caption) = caption {
        md.push_str("\n\n## Description\n\n");
        md.push_str(caption);
    }
    md
}
