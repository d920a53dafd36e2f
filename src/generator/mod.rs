//! EPUB3 fixed-layout packaging.
//!
//! The packager writes every document of the book into a scratch tree and then archives that
//! tree. The archive layout is fixed:
//!
//! ```text
//! mimetype                                        (stored, first entry)
//! META-INF/container.xml
//! META-INF/com.apple.ibooks.display-options.xml
//! OEBPS/content.opf
//! OEBPS/nav.xhtml
//! OEBPS/toc.ncx
//! OEBPS/images/page_0001.jpg
//! OEBPS/pages/page_0001.xhtml
//! ```

pub mod documents;
pub mod epub;

pub use epub::EpubPackager;

/// Literal content of the `mimetype` entry.
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// Directory holding the package document and all content.
pub const PACKAGE_ROOT: &str = "OEBPS";

/// Reader hint file declaring fixed layout and spread behavior.
pub const DISPLAY_OPTIONS_PATH: &str = "META-INF/com.apple.ibooks.display-options.xml";

/// Placeholder written for empty author or publisher fields.
pub const UNKNOWN_CONTRIBUTOR: &str = "Unknown";

/// Escapes text for XML character data and attribute values.
///
/// `%` is escaped as well so inserted text can never be mistaken for a template placeholder.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '%' => escaped.push_str("&#37;"),
            c => escaped.push(c),
        }
    }
    escaped
}
