//! Document aggregation
//!
//! Pure assembly of per-page results into the final response text. The
//! only place the page-marker format exists.

use doc_extract_common::{DocumentResult, PageResult};

/// Render the boundary marker for one page
///
/// The marker shape is a documented default; tests pin it here so a format
/// change surfaces in exactly one place.
fn page_marker(index: u32) -> String {
    format!("\n--- Page {index} ---\n")
}

/// Concatenate per-page results into a single document result
///
/// Pages are emitted in ascending page-index order regardless of the input
/// order, each prefixed with its boundary marker. A page with no
/// recognized lines contributes its marker followed by an empty body.
/// Deterministic and side-effect free: identical input always produces
/// identical output.
#[must_use]
pub fn aggregate(filename: &str, results: &[PageResult]) -> DocumentResult {
    let mut ordered: Vec<&PageResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.index);

    let mut text = String::new();
    for page in ordered {
        text.push_str(&page_marker(page.index));
        text.push_str(&page.text());
    }

    DocumentResult {
        filename: filename.to_string(),
        text,
    }
}
