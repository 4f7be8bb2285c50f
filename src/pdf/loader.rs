//! Document loading boundary
//!
//! Parsing is MuPDF's job. The rest of the crate only sees
//! [`DocumentLoader`]: given a [`DocumentSource`], produce a page count and
//! the text layer of every page, or an error.

use thiserror::Error;

use super::types::{DocumentSource, LoadedDocument};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("no document selected")]
    NoSource,
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse document: {0}")]
    Parse(String),
    #[error("document has no pages")]
    Empty,
    #[error("PDF support is not compiled in")]
    Unsupported,
}

/// Turns a file reference into a laid-out-able document
pub trait DocumentLoader: Send + Sync {
    fn load(&self, source: &DocumentSource) -> Result<LoadedDocument, DocumentError>;
}

#[cfg(feature = "pdf")]
pub use mupdf_backend::MupdfLoader;

#[cfg(feature = "pdf")]
mod mupdf_backend {
    use log::debug;
    use mupdf::text_page::TextBlockType;
    use mupdf::{Document, Page, TextPageFlags};

    use super::{DocumentError, DocumentLoader};
    use crate::pdf::types::{CharInfo, DocumentSource, LineBounds, LoadedDocument, PageText};

    const PDF_MAGIC: &str = "application/pdf";

    /// Loads documents through MuPDF
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MupdfLoader;

    impl MupdfLoader {
        fn open(source: &DocumentSource) -> Result<Document, DocumentError> {
            match source {
                DocumentSource::Path(path) => {
                    if !path.exists() {
                        return Err(DocumentError::Io {
                            path: path.display().to_string(),
                            source: std::io::Error::from(std::io::ErrorKind::NotFound),
                        });
                    }
                    Document::open(path.to_string_lossy().as_ref())
                        .map_err(|e| DocumentError::Parse(e.to_string()))
                }
                DocumentSource::Bytes { data, .. } => Document::from_bytes(data, PDF_MAGIC)
                    .map_err(|e| DocumentError::Parse(e.to_string())),
                DocumentSource::None => Err(DocumentError::NoSource),
            }
        }
    }

    impl DocumentLoader for MupdfLoader {
        fn load(&self, source: &DocumentSource) -> Result<LoadedDocument, DocumentError> {
            let doc = Self::open(source)?;
            let page_count = doc
                .page_count()
                .map_err(|e| DocumentError::Parse(e.to_string()))?
                as usize;

            if page_count == 0 {
                return Err(DocumentError::Empty);
            }

            let title = doc
                .metadata(mupdf::MetadataName::Title)
                .ok()
                .filter(|t| !t.is_empty());

            let mut pages = Vec::with_capacity(page_count);
            for page_num in 0..page_count {
                let page = doc
                    .load_page(page_num as i32)
                    .map_err(|e| DocumentError::Parse(e.to_string()))?;
                pages.push(extract_page_text(&page));
            }

            debug!("Loaded {page_count} pages from {}", source.display_name());

            Ok(LoadedDocument {
                page_count,
                title,
                pages,
            })
        }
    }

    fn extract_page_text(page: &Page) -> PageText {
        let (width, height) = page
            .bounds()
            .map(|b| (b.x1 - b.x0, b.y1 - b.y0))
            .unwrap_or((0.0, 0.0));

        PageText {
            width,
            height,
            lines: extract_line_bounds(page),
        }
    }

    fn extract_line_bounds(page: &Page) -> Vec<LineBounds> {
        page.to_text_page(TextPageFlags::empty())
            .map(|text_page| {
                let mut bounds = Vec::new();

                for block in text_page.blocks() {
                    if block.r#type() != TextBlockType::Text {
                        continue;
                    }
                    for line in block.lines() {
                        let bbox = line.bounds();
                        let chars: Vec<CharInfo> = line
                            .chars()
                            .filter_map(|ch| {
                                ch.char().map(|c| CharInfo {
                                    x: ch.origin().x,
                                    c,
                                })
                            })
                            .collect();

                        if chars.is_empty() {
                            continue;
                        }

                        bounds.push(LineBounds {
                            x0: bbox.x0,
                            y0: bbox.y0,
                            x1: bbox.x1,
                            y1: bbox.y1,
                            chars,
                        });
                    }
                }
                bounds
            })
            .unwrap_or_default()
    }
}

/// Loader used when the crate is built without MuPDF
#[cfg(not(feature = "pdf"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedLoader;

#[cfg(not(feature = "pdf"))]
impl DocumentLoader for UnsupportedLoader {
    fn load(&self, _source: &DocumentSource) -> Result<LoadedDocument, DocumentError> {
        Err(DocumentError::Unsupported)
    }
}

/// The loader the binary uses
#[must_use]
pub fn default_loader() -> std::sync::Arc<dyn DocumentLoader> {
    #[cfg(feature = "pdf")]
    {
        std::sync::Arc::new(MupdfLoader)
    }
    #[cfg(not(feature = "pdf"))]
    {
        std::sync::Arc::new(UnsupportedLoader)
    }
}
