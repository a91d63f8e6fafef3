//! EPUB format handler.

use crate::error::{AppError, Result};
use crate::formats::FormatHandler;
use crate::library::BookMetadata;
use roxmltree::{Document, Node};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Handler for EPUB files.
pub struct EpubHandler;

impl EpubHandler {
    /// Find the OPF file path from container.xml.
    fn find_opf_path(archive: &mut ZipArchive<File>) -> Result<String> {
        let mut container = archive.by_name("META-INF/container.xml")?;
        let mut content = String::new();
        container.read_to_string(&mut content)?;

        let doc = Document::parse(&content)?;

        doc.descendants()
            .find(|n| n.has_tag_name("rootfile"))
            .and_then(|n| n.attribute("full-path"))
            .map(String::from)
            .ok_or_else(|| AppError::InvalidFormat("No rootfile in container.xml".into()))
    }

    /// Parse the OPF package document into metadata.
    pub(crate) fn parse_opf(content: &str) -> Result<BookMetadata> {
        let doc = Document::parse(content)?;
        let mut metadata = BookMetadata::default();

        let Some(block) = doc
            .descendants()
            .find(|n| n.tag_name().name() == "metadata")
        else {
            return Ok(metadata);
        };

        for node in block.children().filter(|n| n.is_element()) {
            let Some(text) = node.text().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };

            let slot = match node.tag_name().name() {
                "title" => &mut metadata.title,
                "creator" => &mut metadata.author,
                "language" => &mut metadata.language,
                "publisher" => &mut metadata.publisher,
                "description" => &mut metadata.description,
                "identifier" => {
                    if metadata.isbn.is_none() {
                        metadata.isbn = Self::as_isbn(node, text);
                    }
                    continue;
                }
                _ => continue,
            };

            // First occurrence wins
            if slot.is_none() {
                *slot = Some(text.to_string());
            }
        }

        Ok(metadata)
    }

    /// Return the identifier value if it is marked as an ISBN.
    fn as_isbn(node: Node, text: &str) -> Option<String> {
        let scheme_is_isbn = node
            .attributes()
            .any(|a| a.name() == "scheme" && a.value().eq_ignore_ascii_case("isbn"));
        if !scheme_is_isbn && !text.to_lowercase().contains("isbn") {
            return None;
        }

        const URN_PREFIX: &str = "urn:isbn:";
        let value = match text.get(..URN_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(URN_PREFIX) => &text[URN_PREFIX.len()..],
            _ => text,
        };
        Some(value.trim().to_string())
    }
}

impl FormatHandler for EpubHandler {
    fn extract_metadata(&self, path: &Path) -> Result<BookMetadata> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let opf_path = Self::find_opf_path(&mut archive)?;

        let mut opf_content = String::new();
        archive
            .by_name(&opf_path)?
            .read_to_string(&mut opf_content)?;

        Self::parse_opf(&opf_content)
    }
}
