//! Common handler utilities and shared types

use serde::Serialize;
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::models::MediaType;
use crate::services::{GalleryQuery, UploadService};

// ============================================================================
// Gallery Query
// ============================================================================

/// Gallery filters from raw query parameters.
///
/// Browsers submit empty fields as `page=`; anything that is not a positive
/// number falls back to page 1.
pub fn gallery_query(params: &HashMap<String, String>) -> GalleryQuery {
    let field = |name: &str| params.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
    let page = params
        .get("page")
        .and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1);

    GalleryQuery {
        search: field("search"),
        category: field("category"),
        page,
    }
}

// ============================================================================
// Upload Form Options
// ============================================================================

/// Media type choice on the upload form
#[derive(Debug, Clone, Serialize)]
pub struct MediaTypeOption {
    pub value: String,
    pub accepted_formats: &'static str,
    /// Value for the file input's `accept` attribute
    pub accept: &'static str,
}

impl From<MediaType> for MediaTypeOption {
    fn from(media_type: MediaType) -> Self {
        Self {
            value: media_type.to_string(),
            accepted_formats: media_type.accepted_formats(),
            accept: match media_type {
                MediaType::Image => "image/*",
                MediaType::Video => "video/*",
                MediaType::Audio => "audio/*",
                MediaType::Text => "",
            },
        }
    }
}

/// Context shared by every rendering of the upload form
pub fn upload_options(uploads: &UploadService) -> TeraContext {
    let media_types: Vec<MediaTypeOption> = MediaType::ALL.into_iter().map(MediaTypeOption::from).collect();
    let mut context = TeraContext::new();
    context.insert("categories", uploads.categories());
    context.insert("media_types", &media_types);
    context.insert("max_mb", &(uploads.max_file_size() / (1024 * 1024)));
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_gallery_query_defaults() {
        assert_eq!(gallery_query(&HashMap::new()), GalleryQuery::default());
        assert_eq!(gallery_query(&params(&[("page", "")])).page, 1);
        assert_eq!(gallery_query(&params(&[("page", "0")])).page, 1);
        assert_eq!(gallery_query(&params(&[("page", "abc")])).page, 1);
    }

    #[test]
    fn test_gallery_query_keeps_category_case() {
        let query = gallery_query(&params(&[("search", " naga "), ("category", "Alam"), ("page", "3")]));
        assert_eq!(query.search, "naga");
        assert_eq!(query.category, "Alam");
        assert_eq!(query.page, 3);
    }

    #[test]
    fn test_text_media_accepts_any_file() {
        let option = MediaTypeOption::from(MediaType::Text);
        assert_eq!(option.value, "text");
        assert_eq!(option.accept, "");
        assert_eq!(MediaTypeOption::from(MediaType::Audio).accept, "audio/*");
    }
}
