//! Document rendering: draw instructions onto the original PDF
//!
//! Loads the template bytes with lopdf, registers a Helvetica font resource
//! on each touched page, and appends one content stream per page with the
//! text operations. Untouched page content is preserved as-is.
//!
//! Per-instruction failures (a page the document does not have, glyphs the
//! font cannot encode) skip that single instruction and surface as warnings:
//! a partially-filled document is still useful, a fatally failed one is not.
//! Only document-level load/save failures abort.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{AppError, Result};

use super::resolver::DrawInstruction;

/// Resource name for the fill font on each touched page
const FILL_FONT: &str = "FfHelv";

/// A rendered (filled) document
#[derive(Debug)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    /// Instructions actually drawn
    pub drawn: usize,
    /// One entry per skipped instruction
    pub warnings: Vec<String>,
}

/// Render draw instructions onto the original document bytes.
pub fn render(original: &[u8], instructions: &[DrawInstruction]) -> Result<RenderedPdf> {
    let mut doc = Document::load_mem(original)
        .map_err(|e| AppError::Render(format!("failed to load template PDF: {e}")))?;

    let pages = doc.get_pages();
    let page_count = pages.len();

    let mut warnings = Vec::new();
    let mut drawn = 0usize;

    // Group instructions by page; instructions for pages the document does
    // not have are skipped with a warning.
    let mut by_page: BTreeMap<u32, Vec<&DrawInstruction>> = BTreeMap::new();
    for instruction in instructions {
        match pages.get(&instruction.page) {
            Some(_) => by_page.entry(instruction.page).or_default().push(instruction),
            None => warnings.push(format!(
                "page {} not in document ({} page(s)); skipped \"{}\"",
                instruction.page, page_count, instruction.text
            )),
        }
    }

    if !by_page.is_empty() {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        for (page_number, page_instructions) in by_page {
            let page_id = pages[&page_number];

            let mut content = String::new();
            content.push_str("q\n0 g\n0 Tr\n");
            let mut page_drawn = 0usize;

            for instruction in page_instructions {
                let Some(encoded) = encode_win_ansi(&instruction.text) else {
                    warnings.push(format!(
                        "page {}: text \"{}\" has glyphs outside WinAnsi; skipped",
                        page_number, instruction.text
                    ));
                    continue;
                };

                content.push_str("BT\n");
                let _ = writeln!(content, "/{} {} Tf", FILL_FONT, instruction.font_size);
                let _ = writeln!(content, "{} {} Td", instruction.x, instruction.y);
                let _ = writeln!(content, "<{}> Tj", hex::encode(encoded));
                content.push_str("ET\n");
                page_drawn += 1;
            }

            content.push_str("Q\n");

            if page_drawn == 0 {
                continue;
            }

            ensure_page_font(&mut doc, page_id, font_id)?;
            append_content(&mut doc, page_id, content.into_bytes())?;
            drawn += page_drawn;
        }
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::Render(format!("failed to write filled PDF: {e}")))?;

    Ok(RenderedPdf {
        bytes,
        drawn,
        warnings,
    })
}

/// Encode text for a WinAnsi-encoded Type1 font. Returns `None` when the
/// text contains glyphs outside the Latin-1 subset.
fn encode_win_ansi(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            (cp < 0x100).then_some(cp as u8)
        })
        .collect()
}

/// Register the fill font in the page's resource dictionary.
///
/// Resources (and the Font sub-dictionary) may live inline on the page or
/// behind indirect references; all four combinations occur in the wild.
fn ensure_page_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
    let resources_ref = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(resources_id) = resources_ref {
        let font_ref = {
            let resources = doc.get_dictionary(resources_id)?;
            match resources.get(b"Font") {
                Ok(Object::Reference(id)) => Some(*id),
                _ => None,
            }
        };
        if let Some(font_dict_id) = font_ref {
            let fonts = doc.get_object_mut(font_dict_id)?.as_dict_mut()?;
            fonts.set(FILL_FONT, Object::Reference(font_id));
        } else {
            let resources = doc.get_object_mut(resources_id)?.as_dict_mut()?;
            set_font_entry(resources, font_id);
        }
        return Ok(());
    }

    let font_ref = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Dictionary(resources)) => match resources.get(b"Font") {
                Ok(Object::Reference(id)) => Some(*id),
                _ => None,
            },
            _ => None,
        }
    };
    if let Some(font_dict_id) = font_ref {
        let fonts = doc.get_object_mut(font_dict_id)?.as_dict_mut()?;
        fonts.set(FILL_FONT, Object::Reference(font_id));
        return Ok(());
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    if page.get(b"Resources").is_err() {
        page.set("Resources", Object::Dictionary(Dictionary::new()));
    }
    let resources = page.get_mut(b"Resources")?.as_dict_mut()?;
    set_font_entry(resources, font_id);

    Ok(())
}

fn set_font_entry(resources: &mut Dictionary, font_id: ObjectId) {
    if resources.get(b"Font").is_err() {
        resources.set("Font", Object::Dictionary(Dictionary::new()));
    }
    if let Ok(fonts) = resources.get_mut(b"Font").and_then(|o| o.as_dict_mut()) {
        fonts.set(FILL_FONT, Object::Reference(font_id));
    }
}

/// Append a content stream to a page, preserving the existing content.
fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
    let replacement = match existing {
        Some(Object::Array(mut items)) => {
            items.push(Object::Reference(stream_id));
            Object::Array(items)
        }
        Some(reference @ Object::Reference(_)) => {
            Object::Array(vec![reference, Object::Reference(stream_id)])
        }
        Some(inline) => {
            // Inline content stream: promote it to an indirect object so it
            // can share an array with the new stream.
            let inline_id = doc.add_object(inline);
            Object::Array(vec![
                Object::Reference(inline_id),
                Object::Reference(stream_id),
            ])
        }
        None => Object::Reference(stream_id),
    };

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", replacement);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal single-page PDF with a Helvetica resource and one text run
    fn test_pdf() -> Vec<u8> {
        use lopdf::content::{Content, Operation};

        let mut doc = Document::with_version("1.5");
        let page_tree_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        });

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 750.into()]),
                Operation::new("Tj", vec![Object::string_literal("Template")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap_or_default(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(page_tree_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
        });

        let page_tree = dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(vec![Object::Reference(page_id)]),
            "Count" => 1,
        };
        doc.objects
            .insert(page_tree_id, Object::Dictionary(page_tree));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(page_tree_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).expect("failed to build test PDF");
        output
    }

    fn instruction(page: u32, text: &str) -> DrawInstruction {
        DrawInstruction {
            page,
            x: 100.0,
            y: 700.0,
            font_size: 12.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn draws_instruction_and_output_still_parses() {
        let original = test_pdf();
        let rendered = render(&original, &[instruction(1, "Jane Doe")]).unwrap();

        assert_eq!(rendered.drawn, 1);
        assert!(rendered.warnings.is_empty());

        let doc = Document::load_mem(&rendered.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn unfilled_document_round_trips() {
        let original = test_pdf();
        let rendered = render(&original, &[]).unwrap();

        assert_eq!(rendered.drawn, 0);
        let doc = Document::load_mem(&rendered.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn missing_page_is_a_warning_not_an_error() {
        let original = test_pdf();
        let rendered = render(&original, &[instruction(7, "lost")]).unwrap();

        assert_eq!(rendered.drawn, 0);
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.warnings[0].contains("page 7"));
    }

    #[test]
    fn non_winansi_glyphs_skip_only_that_instruction() {
        let original = test_pdf();
        let rendered = render(
            &original,
            &[instruction(1, "日本語"), instruction(1, "latin")],
        )
        .unwrap();

        assert_eq!(rendered.drawn, 1);
        assert_eq!(rendered.warnings.len(), 1);
    }

    #[test]
    fn invalid_bytes_are_a_render_error() {
        let err = render(b"not a pdf", &[instruction(1, "x")]).unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
    }

    #[test]
    fn win_ansi_encoding_accepts_latin1_only() {
        assert_eq!(encode_win_ansi("Jane"), Some(b"Jane".to_vec()));
        assert_eq!(encode_win_ansi("café"), Some(vec![b'c', b'a', b'f', 0xE9]));
        assert_eq!(encode_win_ansi("日本"), None);
    }
}
