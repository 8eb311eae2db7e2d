//! Slide rasterisation: render every page of the deck to a `DynamicImage`
//! via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Why cap pixels?
//!
//! Slide sizes vary: a poster-format page rendered naively could produce a
//! multi-gigapixel image and exhaust memory. `max_rendered_pixels` caps the
//! longest edge regardless of physical size, which also matches the
//! image-size sweet spot for GPT-4-class vision (around 1,024–2,048 px).

use crate::config::NotesConfig;
use crate::error::NotesError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Rasterise every slide of the deck into an image.
///
/// This runs inside `spawn_blocking` since pdfium operations are CPU-bound.
///
/// # Returns
/// A vector of `(slide_index_1based, DynamicImage)` tuples, in slide order,
/// covering the whole deck contiguously.
pub async fn render_slides(
    deck_path: &Path,
    config: &NotesConfig,
) -> Result<Vec<(usize, DynamicImage)>, NotesError> {
    let path = deck_path.to_path_buf();
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_slides_blocking(&path, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| NotesError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of slide rendering.
fn render_slides_blocking(
    deck_path: &Path,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<(usize, DynamicImage)>, NotesError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_file(deck_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                NotesError::WrongPassword {
                    path: deck_path.to_path_buf(),
                }
            } else {
                NotesError::PasswordRequired {
                    path: deck_path.to_path_buf(),
                }
            }
        } else {
            NotesError::CorruptPdf {
                path: deck_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_slides = pages.len() as usize;
    if total_slides == 0 {
        return Err(NotesError::EmptyDeck {
            path: deck_path.to_path_buf(),
        });
    }
    info!("Deck loaded: {} slides", total_slides);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_slides);

    for idx in 0..total_slides {
        let index = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| NotesError::RasterisationFailed {
                slide: index,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            NotesError::RasterisationFailed {
                slide: index,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered slide {} → {}x{} px",
            index,
            image.width(),
            image.height()
        );

        results.push((index, image));
    }

    Ok(results)
}
