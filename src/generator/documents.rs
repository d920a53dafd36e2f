//! Rendering of the XML documents inside the EPUB container.
//!
//! All functions here are pure: they turn book metadata and the page list into strings.

use crate::generator::{PACKAGE_ROOT, UNKNOWN_CONTRIBUTOR, escape_xml};
use crate::types::{CanonicalSize, Placement};

const CONTAINER_TEMPLATE: &str = include_str!("../../templates/container.xml");
const DISPLAY_OPTIONS_TEMPLATE: &str = include_str!("../../templates/display-options.xml");
const PAGE_TEMPLATE: &str = include_str!("../../templates/page.xhtml");
const OPF_TEMPLATE: &str = include_str!("../../templates/content.opf");
const NAV_TEMPLATE: &str = include_str!("../../templates/nav.xhtml");
const NCX_TEMPLATE: &str = include_str!("../../templates/toc.ncx");

/// One page of the book as it appears inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// 1-based position in reading order
    pub number: usize,
    pub placement: Placement,
    pub image_extension: &'static str,
    pub image_mime: &'static str,
}

impl PageEntry {
    pub fn page_id(&self) -> String {
        format!("page_{:04}", self.number)
    }

    pub fn image_id(&self) -> String {
        format!("img_{:04}", self.number)
    }

    /// Markup document path relative to the package root.
    pub fn page_href(&self) -> String {
        format!("pages/page_{:04}.xhtml", self.number)
    }

    /// Image path relative to the package root.
    pub fn image_href(&self) -> String {
        format!("images/page_{:04}.{}", self.number, self.image_extension)
    }
}

/// Metadata and page list shared by every document of one book.
#[derive(Debug, Clone)]
pub struct BookDocuments<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub publisher: &'a str,
    pub language: &'a str,
    /// UUID without the `urn:uuid:` prefix
    pub identifier: &'a str,
    /// `dcterms:modified` value, e.g. "2024-05-01T12:00:00Z"
    pub modified: &'a str,
    pub canonical_size: CanonicalSize,
    pub pages: &'a [PageEntry],
}

fn or_unknown(text: &str) -> &str {
    if text.trim().is_empty() {
        UNKNOWN_CONTRIBUTOR
    } else {
        text
    }
}

impl BookDocuments<'_> {
    pub fn container_xml() -> String {
        CONTAINER_TEMPLATE.replace("%opf_path%", &format!("{}/content.opf", PACKAGE_ROOT))
    }

    pub fn display_options_xml() -> String {
        DISPLAY_OPTIONS_TEMPLATE.to_string()
    }

    /// A single full-bleed image sized exactly to the canonical size.
    pub fn page_xhtml(&self, page: &PageEntry) -> String {
        let title = format!("{} - Page {}", self.title, page.number);
        PAGE_TEMPLATE
            .replace("%width%", &self.canonical_size.width.to_string())
            .replace("%height%", &self.canonical_size.height.to_string())
            .replace("%src%", &format!("../{}", page.image_href()))
            .replace("%language%", &escape_xml(self.language))
            .replace("%title%", &escape_xml(&title))
            .replace("%alt%", &escape_xml(&title))
    }

    /// The package document: metadata, manifest and right-to-left spine.
    pub fn content_opf(&self) -> String {
        let mut manifest = Vec::with_capacity(self.pages.len() * 2);
        let mut spine = Vec::with_capacity(self.pages.len());

        for (i, page) in self.pages.iter().enumerate() {
            manifest.push(format!(
                r#"    <item id="{}" href="{}" media-type="application/xhtml+xml"/>"#,
                page.page_id(),
                page.page_href()
            ));
            let cover = if i == 0 { r#" properties="cover-image""# } else { "" };
            manifest.push(format!(
                r#"    <item id="{}" href="{}" media-type="{}"{}/>"#,
                page.image_id(),
                page.image_href(),
                page.image_mime,
                cover
            ));

            spine.push(match page.placement.spine_property() {
                Some(property) => format!(
                    r#"    <itemref idref="{}" properties="{}"/>"#,
                    page.page_id(),
                    property
                ),
                None => format!(r#"    <itemref idref="{}"/>"#, page.page_id()),
            });
        }

        let cover_id = self
            .pages
            .first()
            .map(|p| p.image_id())
            .unwrap_or_default();

        OPF_TEMPLATE
            .replace("%manifest%", &manifest.join("\n"))
            .replace("%spine%", &spine.join("\n"))
            .replace("%cover_id%", &cover_id)
            .replace("%width%", &self.canonical_size.width.to_string())
            .replace("%height%", &self.canonical_size.height.to_string())
            .replace("%identifier%", &escape_xml(self.identifier))
            .replace("%modified%", &escape_xml(self.modified))
            .replace("%language%", &escape_xml(self.language))
            .replace("%title%", &escape_xml(self.title))
            .replace("%creator%", &escape_xml(or_unknown(self.author)))
            .replace("%publisher%", &escape_xml(or_unknown(self.publisher)))
    }

    /// EPUB3 navigation document listing every page in order.
    pub fn nav_xhtml(&self) -> String {
        let items = self
            .pages
            .iter()
            .map(|page| {
                format!(
                    r#"<li><a href="{}">Page {}</a></li>"#,
                    page.page_href(),
                    page.number
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        NAV_TEMPLATE
            .replace("%items%", &items)
            .replace("%cover_href%", &self.cover_href())
            .replace("%language%", &escape_xml(self.language))
            .replace("%title%", &escape_xml(self.title))
    }

    /// NCX index for EPUB2-era readers.
    pub fn toc_ncx(&self) -> String {
        let nav_points = self
            .pages
            .iter()
            .map(|page| {
                format!(
                    concat!(
                        r#"    <navPoint id="nav_{:04}" playOrder="{}">"#,
                        "\n",
                        r#"      <navLabel><text>Page {}</text></navLabel>"#,
                        "\n",
                        r#"      <content src="{}"/>"#,
                        "\n",
                        "    </navPoint>"
                    ),
                    page.number,
                    page.number,
                    page.number,
                    page.page_href()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        NCX_TEMPLATE
            .replace("%navpoints%", &nav_points)
            .replace("%identifier%", &escape_xml(self.identifier))
            .replace("%language%", &escape_xml(self.language))
            .replace("%title%", &escape_xml(self.title))
    }

    fn cover_href(&self) -> String {
        self.pages
            .first()
            .map(|p| p.page_href())
            .unwrap_or_default()
    }
}
