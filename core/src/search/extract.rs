use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mime::Mime;
use pulldown_cmark::{Event, Parser, TagEnd};
use thiserror::Error;

/// Turns the raw bytes of a stored document into searchable text.
///
/// Implement this to make more document types searchable, e.g. PDF through an
/// external library, and register it with [`Extractors::register`].
pub trait TextExtractor: Send + Sync {
    /// Media types this extractor understands.
    fn media_types(&self) -> Vec<Mime>;

    fn extract(&self, content: &[u8]) -> Result<String, ExtractError>;
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extraction failed: {0}")]
    Failed(String),
}

/// Maps a stored `file_type` (lowercased extension with dot) to a media type.
pub fn media_type_for(file_type: &str) -> Option<Mime> {
    let essence = match file_type {
        ".txt" | ".log" => "text/plain",
        ".csv" => "text/csv",
        ".json" => "application/json",
        ".md" | ".markdown" => "text/markdown",
        ".pdf" => "application/pdf",
        _ => return None,
    };
    essence.parse().ok()
}

/// Plain text, read as UTF-8 with invalid sequences replaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn media_types(&self) -> Vec<Mime> {
        vec![mime::TEXT_PLAIN, mime::TEXT_CSV, mime::APPLICATION_JSON]
    }

    fn extract(&self, content: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(content).into_owned())
    }
}

/// Markdown as written, followed by its rendered text.
///
/// The source keeps everything in the file searchable (link targets, inline HTML,
/// markup). The rendered text lets a phrase match across emphasis, so
/// `Green *silicate*` is found by `green silicate`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownExtractor;

impl TextExtractor for MarkdownExtractor {
    fn media_types(&self) -> Vec<Mime> {
        "text/markdown".parse().into_iter().collect()
    }

    fn extract(&self, content: &[u8]) -> Result<String, ExtractError> {
        let source = String::from_utf8_lossy(content);
        let mut text = String::with_capacity(source.len() * 2 + 1);
        text.push_str(&source);
        text.push('\n');
        for event in Parser::new(&source) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                    text.push('\n')
                }
                _ => {}
            }
        }
        Ok(text)
    }
}

/// Registry of text extractors keyed by media type essence (`text/plain`).
///
/// The default set covers plain text and Markdown. PDF is recognized as a type
/// but has no built-in extractor, so PDF documents are skipped by search unless
/// one is registered.
#[derive(Clone)]
pub struct Extractors {
    by_type: HashMap<String, Arc<dyn TextExtractor>>,
}

impl Extractors {
    pub fn empty() -> Self {
        Extractors { by_type: HashMap::new() }
    }

    /// Registers `extractor` for each of its media types, replacing earlier registrations.
    pub fn register(&mut self, extractor: impl TextExtractor + 'static) -> &mut Self {
        let extractor: Arc<dyn TextExtractor> = Arc::new(extractor);
        for media_type in extractor.media_types() {
            self.by_type.insert(media_type.essence_str().to_string(), extractor.clone());
        }
        self
    }

    /// The extractor responsible for a stored `file_type`, if any.
    pub fn for_file_type(&self, file_type: &str) -> Option<&dyn TextExtractor> {
        let media_type = media_type_for(file_type)?;
        self.by_type.get(media_type.essence_str()).map(|e| e.as_ref())
    }

    pub fn supports(&self, file_type: &str) -> bool {
        self.for_file_type(file_type).is_some()
    }
}

impl Default for Extractors {
    fn default() -> Self {
        let mut extractors = Extractors::empty();
        extractors.register(PlainTextExtractor).register(MarkdownExtractor);
        extractors
    }
}

impl fmt::Debug for Extractors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.by_type.keys().collect();
        types.sort();
        f.debug_struct("Extractors").field("media_types", &types).finish()
    }
}
