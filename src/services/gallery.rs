//! Gallery browsing
//!
//! The backend returns every artwork card; searching, category filtering
//! and pagination happen here.

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, DynStore};
use crate::models::{ArtworkCard, ArtworkDetail, RecordId};
use crate::services::engagement::LikeState;

/// Gallery filters as submitted by the browse form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryQuery {
    #[serde(default)]
    pub search: String,
    /// Exact category, empty for all
    #[serde(default)]
    pub category: String,
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

impl Default for GalleryQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: String::new(),
            page: default_page(),
        }
    }
}

/// Card on the browse page with the viewer's own like
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryItem {
    #[serde(flatten)]
    pub card: ArtworkCard,
    pub liked: bool,
}

/// One page of filtered cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryPage {
    pub items: Vec<GalleryItem>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Distinct categories present in the gallery, first-seen order
    pub categories: Vec<String>,
}

/// Artwork detail with the viewer's like state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkView {
    pub artwork: ArtworkDetail,
    pub like: LikeState,
}

/// Distinct non-empty categories in first-seen order
pub fn distinct_categories(cards: &[ArtworkCard]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for card in cards {
        let category = &card.artwork.category;
        if !category.is_empty() && !seen.iter().any(|c| c == category) {
            seen.push(category.clone());
        }
    }
    seen
}

/// Apply search, category and pagination to cards already ordered newest first
pub fn filter_and_paginate(cards: Vec<ArtworkCard>, query: &GalleryQuery, page_size: usize) -> GalleryPage {
    let categories = distinct_categories(&cards);
    let search = query.search.trim();
    let page_size = page_size.max(1);

    let filtered: Vec<ArtworkCard> = cards
        .into_iter()
        .filter(|c| search.is_empty() || c.matches_search(search))
        .filter(|c| query.category.is_empty() || c.artwork.category == query.category)
        .collect();

    let total_items = filtered.len();
    let total_pages = total_items.div_ceil(page_size);
    let page = query.page.max(1);

    let items = filtered
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .map(|card| GalleryItem { card, liked: false })
        .collect();

    GalleryPage {
        items,
        page,
        total_pages,
        total_items,
        categories,
    }
}

/// Gallery service
pub struct GalleryService {
    store: DynStore,
    page_size: usize,
    recent_limit: usize,
}

impl GalleryService {
    pub fn new(store: DynStore, page_size: usize, recent_limit: usize) -> Self {
        Self {
            store,
            page_size,
            recent_limit,
        }
    }

    /// Newest artworks for the landing page
    pub async fn recent_artworks(&self) -> Result<Vec<ArtworkCard>, BackendError> {
        self.store.list_artworks(Some(self.recent_limit)).await
    }

    /// One filtered page; the viewer's likes are looked up per card shown
    pub async fn browse(&self, query: &GalleryQuery, viewer: Option<&RecordId>) -> Result<GalleryPage, BackendError> {
        let cards = self.store.list_artworks(None).await?;
        let mut page = filter_and_paginate(cards, query, self.page_size);
        if let Some(user_id) = viewer {
            for item in &mut page.items {
                item.liked = self.store.has_liked(&item.card.artwork.id, user_id).await?;
            }
        }
        Ok(page)
    }

    /// Artwork with artist, like total and whether the viewer liked it
    pub async fn artwork_detail(
        &self,
        id: &RecordId,
        viewer: Option<&RecordId>,
    ) -> Result<Option<ArtworkView>, BackendError> {
        let Some(artwork) = self.store.get_artwork(id).await? else {
            return Ok(None);
        };

        let count = self.store.count_likes(id).await?;
        let liked = match viewer {
            Some(user_id) => self.store.has_liked(id, user_id).await?,
            None => false,
        };

        Ok(Some(ArtworkView {
            artwork,
            like: LikeState { liked, count },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AccountAndDataStore, MemoryStore};
    use crate::models::{Artwork, MediaType, Role, UserSummary};
    use chrono::Utc;
    use std::sync::Arc;

    fn card(id: &str, title: &str, category: &str) -> ArtworkCard {
        ArtworkCard {
            artwork: Artwork {
                id: RecordId::from(id),
                title: title.to_string(),
                description: None,
                category: category.to_string(),
                media_type: MediaType::Image,
                media_url: format!("https://cdn/{id}.png"),
                artist_id: RecordId::from("a"),
                created_at: Utc::now(),
            },
            artist: Some(UserSummary {
                id: None,
                name: Some("Rani".into()),
                avatar_url: None,
            }),
            like_count: 0,
            comment_count: 0,
        }
    }

    fn query(search: &str, category: &str, page: usize) -> GalleryQuery {
        GalleryQuery {
            search: search.into(),
            category: category.into(),
            page,
        }
    }

    #[test]
    fn test_category_filter_is_case_sensitive() {
        let cards = vec![card("1", "A", "alam"), card("2", "B", "Alam")];
        let page = filter_and_paginate(cards, &query("", "alam", 1), 12);
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].card.artwork.id, RecordId::from("1"));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let cards = vec![card("1", "Kastil Senja", "kastil"), card("2", "Hutan", "alam")];
        let page = filter_and_paginate(cards, &query("SENJA", "", 1), 12);
        assert_eq!(page.total_items, 1);

        let cards = vec![card("1", "Kastil", "kastil"), card("2", "Hutan", "alam")];
        let by_artist = filter_and_paginate(cards, &query("rani", "", 1), 12);
        assert_eq!(by_artist.total_items, 2);
    }

    #[test]
    fn test_pagination_and_out_of_range() {
        let cards: Vec<ArtworkCard> = (0..25).map(|i| card(&i.to_string(), "T", "alam")).collect();

        let first = filter_and_paginate(cards.clone(), &query("", "", 1), 12);
        assert_eq!(first.items.len(), 12);
        assert_eq!(first.total_pages, 3);

        let last = filter_and_paginate(cards.clone(), &query("", "", 3), 12);
        assert_eq!(last.items.len(), 1);

        let beyond = filter_and_paginate(cards, &query("", "", 9), 12);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_items, 25);
    }

    #[test]
    fn test_distinct_categories_first_seen() {
        let cards = vec![
            card("1", "A", "kastil"),
            card("2", "B", ""),
            card("3", "C", "alam"),
            card("4", "D", "kastil"),
        ];
        assert_eq!(distinct_categories(&cards), vec!["kastil", "alam"]);
    }

    #[tokio::test]
    async fn test_recent_artworks_are_limited_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let artist = store.seed_account("Rani", "rani@x.id", "Rahasia#1", Role::Artist).await;
        for i in 0..6 {
            store.seed_artwork(&artist.id, &format!("Karya {i}"), "", "alam").await;
        }
        let gallery = GalleryService::new(store, 12, 4);

        let recent = gallery.recent_artworks().await.unwrap();
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0].artwork.title, "Karya 5");
    }

    #[tokio::test]
    async fn test_detail_reports_viewer_like() {
        let store = Arc::new(MemoryStore::new());
        let artist = store.seed_account("Rani", "rani@x.id", "Rahasia#1", Role::Artist).await;
        store.seed_account("Budi", "budi@x.id", "Rahasia#2", Role::User).await;
        let art = store.seed_artwork(&artist.id, "Naga", "", "mitologi").await;
        let fan = store.sign_in("budi@x.id", "Rahasia#2").await.unwrap();
        store.insert_like(&fan, &art.id).await.unwrap();

        let gallery = GalleryService::new(store, 12, 4);
        let as_fan = gallery.artwork_detail(&art.id, Some(&fan.account.id)).await.unwrap().unwrap();
        assert_eq!(as_fan.like, LikeState { liked: true, count: 1 });

        let as_artist = gallery.artwork_detail(&art.id, Some(&artist.id)).await.unwrap().unwrap();
        assert_eq!(as_artist.like, LikeState { liked: false, count: 1 });

        assert!(gallery
            .artwork_detail(&RecordId::from("missing"), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_browse_marks_viewer_likes() {
        let store = Arc::new(MemoryStore::new());
        let artist = store.seed_account("Rani", "rani@x.id", "Rahasia#1", Role::Artist).await;
        store.seed_account("Budi", "budi@x.id", "Rahasia#2", Role::User).await;
        let liked = store.seed_artwork(&artist.id, "Naga", "", "mitologi").await;
        store.seed_artwork(&artist.id, "Kastil", "", "kastil").await;
        let fan = store.sign_in("budi@x.id", "Rahasia#2").await.unwrap();
        store.insert_like(&fan, &liked.id).await.unwrap();

        let gallery = GalleryService::new(store, 12, 4);
        let page = gallery.browse(&GalleryQuery::default(), Some(&fan.account.id)).await.unwrap();
        let marked: Vec<(&str, bool)> = page
            .items
            .iter()
            .map(|i| (i.card.artwork.title.as_str(), i.liked))
            .collect();
        assert_eq!(marked, vec![("Kastil", false), ("Naga", true)]);

        let anonymous = gallery.browse(&GalleryQuery::default(), None).await.unwrap();
        assert!(anonymous.items.iter().all(|i| !i.liked));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::models::{Artwork, MediaType};
    use chrono::Utc;
    use proptest::prelude::*;

    fn arb_card() -> impl Strategy<Value = ArtworkCard> {
        ("[a-zA-Z ]{1,12}", prop_oneof![Just("alam"), Just("Alam"), Just("fiksi"), Just("")]).prop_map(
            |(title, category)| ArtworkCard {
                artwork: Artwork {
                    id: RecordId::random(),
                    title,
                    description: None,
                    category: category.to_string(),
                    media_type: MediaType::Image,
                    media_url: "https://cdn/x.png".into(),
                    artist_id: RecordId::from("a"),
                    created_at: Utc::now(),
                },
                artist: None,
                like_count: 0,
                comment_count: 0,
            },
        )
    }

    proptest! {
        /// Every card on a category page has exactly that category
        #[test]
        fn category_filter_exact(cards in prop::collection::vec(arb_card(), 0..40), page in 1usize..5) {
            let q = GalleryQuery { search: String::new(), category: "alam".into(), page };
            let result = filter_and_paginate(cards, &q, 12);
            prop_assert!(result.items.iter().all(|c| c.card.artwork.category == "alam"));
        }

        /// Pages never exceed the page size and together cover every match
        #[test]
        fn pages_cover_matches(cards in prop::collection::vec(arb_card(), 0..40), page_size in 1usize..15) {
            let total = cards.len();
            let pages = total.div_ceil(page_size).max(1);
            let mut seen = 0;
            for page in 1..=pages {
                let q = GalleryQuery { page, ..GalleryQuery::default() };
                let result = filter_and_paginate(cards.clone(), &q, page_size);
                prop_assert!(result.items.len() <= page_size);
                seen += result.items.len();
            }
            prop_assert_eq!(seen, total);
        }
    }
}
