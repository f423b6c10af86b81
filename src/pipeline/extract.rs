//! Content extraction: page text and tables via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on async worker threads.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so the
//! runtime stays responsive while a long statement is being read.

use crate::config::ParserConfig;
use crate::error::BankParserError;
use crate::pipeline::input;
use crate::pipeline::tables::{detect_tables, TableGrid, TableSettings, TextFragment};
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Text and tables pulled out of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Text of every page that had any, each followed by a newline.
    pub text: String,
    pub tables: Vec<ExtractedTable>,
    pub page_count: usize,
}

/// One detected table, tagged with its position in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// 1-based page number.
    pub page: usize,
    /// 1-based index of the table within its page.
    pub table: usize,
    pub data: TableGrid,
}

/// Extract text and tables from the PDF at `path`.
pub async fn extract_content(
    path: &Path,
    config: &ParserConfig,
) -> Result<ExtractedContent, BankParserError> {
    let path = input::resolve_local(path)?;
    let lib_path = config.pdfium_lib_path.clone();
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        extract_blocking(&path, lib_path.as_deref(), password.as_deref())
    })
    .await
    .map_err(|e| BankParserError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Bind to the pdfium shared library.
///
/// Searches `lib_path` when given; otherwise the current directory and then
/// the system library path.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, BankParserError> {
    let bindings = match lib_path {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| {
        BankParserError::Configuration(format!(
            "Failed to load the pdfium library: {:?}\n\
             Install libpdfium or point PDFIUM_LIB_PATH at the directory containing it.",
            e
        ))
    })?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of content extraction.
fn extract_blocking(
    pdf_path: &Path,
    lib_path: Option<&Path>,
    password: Option<&str>,
) -> Result<ExtractedContent, BankParserError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| extraction_error(pdf_path, format!("{:?}", e)))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let settings = TableSettings::default();
    let mut content = ExtractedContent {
        page_count,
        ..Default::default()
    };

    for (page_index, page) in pages.iter().enumerate() {
        let page_num = page_index + 1;
        let text = match page.text() {
            Ok(text) => text,
            Err(e) => {
                warn!("Page {}: no text layer ({:?})", page_num, e);
                continue;
            }
        };

        let page_text = text.all();
        if !page_text.trim().is_empty() {
            content.text.push_str(&page_text);
            content.text.push('\n');
        }

        let fragments: Vec<TextFragment> = text
            .segments()
            .iter()
            .map(|segment| {
                let bounds = segment.bounds();
                TextFragment::new(
                    segment.text(),
                    bounds.left().value,
                    bounds.right().value,
                    bounds.top().value,
                    bounds.bottom().value,
                )
            })
            .collect();

        let grids = detect_tables(&fragments, &settings);
        debug!(
            "Page {}: {} chars, {} fragments, {} tables",
            page_num,
            page_text.chars().count(),
            fragments.len(),
            grids.len()
        );

        content
            .tables
            .extend(grids.into_iter().enumerate().map(|(i, data)| ExtractedTable {
                page: page_num,
                table: i + 1,
                data,
            }));
    }

    info!(
        "Extracted {} chars and {} tables from {}",
        content.text.chars().count(),
        content.tables.len(),
        pdf_path.display()
    );
    Ok(content)
}

fn extraction_error(path: &Path, detail: String) -> BankParserError {
    BankParserError::Extraction {
        path: PathBuf::from(path),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_fails_before_pdfium_is_touched() {
        let config = ParserConfig::builder()
            .pdfium_lib_path("/nonexistent/pdfium")
            .build()
            .unwrap();
        let err = extract_content(Path::new("/no/such/statement.pdf"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, BankParserError::FileNotFound { .. }), "{err}");
    }

    #[test]
    fn bad_library_path_is_a_configuration_error() {
        let err = bind_pdfium(Some(Path::new("/nonexistent/pdfium"))).unwrap_err();
        assert!(matches!(err, BankParserError::Configuration(_)), "{err}");
    }

    #[test]
    fn table_serialises_with_null_cells() {
        let table = ExtractedTable {
            page: 2,
            table: 1,
            data: vec![vec![Some("01/04".into()), None]],
        };
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["table"], 1);
        assert!(json["data"][0][1].is_null());
    }
}
