//! Merge the per-slide PDFs into one booklet, ordered by slide index.
//!
//! Ordering is numeric on the index parsed out of the filename, never
//! lexicographic: `document_2.pdf` sorts before `document_10.pdf`. Files that
//! do not match the `document_<digits>.pdf` shape (including a booklet left
//! over from a previous run) are ignored by the directory scan.

use crate::error::NotesError;
use lopdf::{Bookmark, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parse the slide index out of a `document_<digits>.pdf` filename.
///
/// Returns `None` for anything else, so the scan skips aux files and the
/// merged booklet itself.
pub fn slide_index_from_filename(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    let digits = name.strip_prefix("document_")?.strip_suffix(".pdf")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Collect the per-slide PDFs under `dir`, sorted by slide index ascending.
pub fn collect_slide_pdfs(dir: &Path) -> Result<Vec<PathBuf>, NotesError> {
    let entries = std::fs::read_dir(dir).map_err(|e| NotesError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut indexed: Vec<(usize, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| NotesError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if let Some(index) = slide_index_from_filename(&path) {
            indexed.push((index, path));
        }
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}

/// Merge `inputs` (already sorted) into a single PDF at `output`.
///
/// Returns the page count of the merged document. This is synchronous and
/// CPU-bound; callers run it under `spawn_blocking`.
pub fn merge_slide_pdfs(inputs: &[PathBuf], output: &Path) -> Result<usize, NotesError> {
    if inputs.is_empty() {
        return Err(NotesError::MergeFailed {
            detail: "no slide PDFs to merge".into(),
        });
    }

    let mut merged = Document::with_version("1.5");
    let mut max_id = 1u32;
    // Pages in booklet order: input order, then `get_pages` page order within
    // each input. A BTreeMap over renumbered ids would follow object-id
    // order instead, which is not guaranteed to match page order.
    let mut pages_vec: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for input in inputs {
        let mut doc = Document::load(input).map_err(|e| NotesError::MergeFailed {
            detail: format!("failed to load '{}': {}", input.display(), e),
        })?;

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let title = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let first_page = doc.get_pages().values().next().copied();
        if let Some(page_id) = first_page {
            merged.add_bookmark(Bookmark::new(title, [0.0, 0.0, 1.0], 0, page_id), None);
        }

        for (_, object_id) in doc.get_pages() {
            if let Ok(page) = doc.get_object(object_id) {
                pages_vec.push((object_id, page.clone()));
            }
        }
        objects.extend(doc.objects);
    }

    // Rebuild a single Pages tree and Catalog over the collected objects.
    // Kids and Count are overwritten below, so the first Pages dictionary
    // seen is a fine root to reuse.
    let mut pages_root: Option<(ObjectId, lopdf::Dictionary)> = None;
    let mut catalog: Option<(ObjectId, lopdf::Dictionary)> = None;

    for (object_id, object) in &objects {
        match object.type_name().unwrap_or("") {
            "Catalog" => {
                if catalog.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        catalog = Some((*object_id, dict.clone()));
                    }
                }
            }
            "Pages" => {
                if pages_root.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        pages_root = Some((*object_id, dict.clone()));
                    }
                }
            }
            _ => {}
        }
    }

    let (pages_id, mut pages_dict) = pages_root.ok_or_else(|| NotesError::MergeFailed {
        detail: "no Pages tree found in any input".into(),
    })?;
    let (catalog_id, mut catalog_dict) = catalog.ok_or_else(|| NotesError::MergeFailed {
        detail: "no Catalog found in any input".into(),
    })?;

    for (object_id, object) in &objects {
        match object.type_name().unwrap_or("") {
            "Catalog" | "Pages" => {}
            "Page" | "Outlines" | "Outline" => {}
            _ => {
                merged.objects.insert(*object_id, object.clone());
            }
        }
    }

    for (page_id, page) in &pages_vec {
        if let Ok(dict) = page.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(*page_id, Object::Dictionary(dict));
        }
    }

    let page_count = pages_vec.len();
    pages_dict.set("Count", page_count as u32);
    pages_dict.set(
        "Kids",
        pages_vec
            .iter()
            .map(|(id, _)| Object::Reference(*id))
            .collect::<Vec<_>>(),
    );
    merged
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    catalog_dict.set("Pages", pages_id);
    catalog_dict.remove(b"Outlines");
    merged
        .objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));
    merged.trailer.set("Root", catalog_id);

    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.adjust_zero_pages();

    // Renumbering rewrote every id, so resolve the catalog through the
    // trailer rather than the pre-renumber id.
    if let Some(outline_id) = merged.build_outline() {
        if let Ok(Object::Reference(root_id)) = merged.trailer.get(b"Root").map(Object::to_owned) {
            if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(root_id) {
                dict.set("Outlines", Object::Reference(outline_id));
            }
        }
    }

    merged.compress();
    merged.save(output).map_err(|e| NotesError::MergeFailed {
        detail: format!("failed to save '{}': {}", output.display(), e),
    })?;

    info!(
        "Merged {} PDFs ({} pages) into {}",
        inputs.len(),
        page_count,
        output.display()
    );
    debug!("Merged inputs: {:?}", inputs);

    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// A minimal one-page PDF with the given marker text.
    fn one_page_pdf(path: &Path, marker: &str) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(marker)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn filename_parsing_accepts_only_slide_pdfs() {
        assert_eq!(
            slide_index_from_filename(Path::new("/x/document_7.pdf")),
            Some(7)
        );
        assert_eq!(
            slide_index_from_filename(Path::new("document_12.pdf")),
            Some(12)
        );
        assert_eq!(slide_index_from_filename(Path::new("document_7.tex")), None);
        assert_eq!(slide_index_from_filename(Path::new("document_.pdf")), None);
        assert_eq!(
            slide_index_from_filename(Path::new("document_7a.pdf")),
            None
        );
        assert_eq!(
            slide_index_from_filename(Path::new("Notes_OPTICS.pdf")),
            None
        );
    }

    #[test]
    fn scan_orders_numerically_and_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "document_10.pdf",
            "document_2.pdf",
            "document_2.tex",
            "Notes_THEME.pdf",
        ] {
            std::fs::write(dir.path().join(name), b"%PDF-1.5").unwrap();
        }

        let pdfs = collect_slide_pdfs(dir.path()).unwrap();
        let names: Vec<_> = pdfs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["document_2.pdf", "document_10.pdf"]);
    }

    #[test]
    fn merge_combines_all_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("document_2.pdf");
        let b = dir.path().join("document_3.pdf");
        let c = dir.path().join("document_10.pdf");
        one_page_pdf(&a, "slide two");
        one_page_pdf(&b, "slide three");
        one_page_pdf(&c, "slide ten");

        let output = dir.path().join("Notes_MERGED.pdf");
        let inputs = collect_slide_pdfs(dir.path()).unwrap();
        let pages = merge_slide_pdfs(&inputs, &output).unwrap();

        assert_eq!(pages, 3);
        let reloaded = Document::load(&output).unwrap();
        let page_ids: Vec<ObjectId> = reloaded.get_pages().into_values().collect();
        assert_eq!(page_ids.len(), 3);

        // Page order must follow the input order, recovered from the text
        // marker each source document carries.
        let markers: Vec<String> = page_ids
            .iter()
            .map(|id| {
                String::from_utf8_lossy(&reloaded.get_page_content(*id).unwrap()).into_owned()
            })
            .collect();
        assert!(markers[0].contains("slide two"));
        assert!(markers[1].contains("slide three"));
        assert!(markers[2].contains("slide ten"));
    }

    #[test]
    fn merge_of_nothing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = merge_slide_pdfs(&[], &dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, NotesError::MergeFailed { .. }));
    }

    #[test]
    fn single_input_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("document_1.pdf");
        one_page_pdf(&a, "only slide");
        let output = dir.path().join("Notes_ONE.pdf");
        let pages = merge_slide_pdfs(&[a], &output).unwrap();
        assert_eq!(pages, 1);
        assert!(output.exists());
    }
}
