//! Demo data
//!
//! Seeds the in-memory adapters with a few accounts and artworks so the
//! gallery can be explored without a hosted backend.

use std::sync::Arc;

use crate::backend::{AccountAndDataStore, BackendError, MemoryStore};
use crate::media::{MediaError, MediaUpload, MediaUploader, MemoryUploader};
use crate::models::{MediaType, NewArtwork, NewComment, Role};

/// Password shared by every demo account
pub const DEMO_PASSWORD: &str = "Demo#2024";

pub const DEMO_ARTIST_EMAIL: &str = "artist@demo.local";
pub const DEMO_USER_EMAIL: &str = "fan@demo.local";

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Media(#[from] MediaError),
}

const ARTWORKS: &[(&str, &str, &str, &str)] = &[
    ("Peri Senja", "A fairy resting at dusk", "fairy", "#f59e0b"),
    ("Kastil Awan", "A castle floating above the clouds", "kastil", "#6366f1"),
    ("Hutan Pagi", "Morning light through the forest", "alam", "#22c55e"),
    ("Naga Laut", "Sea dragon of the southern coast", "mitologi", "#0ea5e9"),
    ("Kota Bintang", "A city among the stars", "fiksi", "#ec4899"),
];

fn placeholder_svg(title: &str, color: &str) -> Vec<u8> {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="480"><rect width="640" height="480" fill="{color}"/><text x="320" y="250" font-family="sans-serif" font-size="40" fill="#fff" text-anchor="middle">{title}</text></svg>"##
    )
    .into_bytes()
}

/// Fill the in-memory adapters with demo content
pub async fn seed(store: &MemoryStore, uploader: &MemoryUploader) -> Result<(), DemoError> {
    store.seed_account("Rani Lukis", DEMO_ARTIST_EMAIL, DEMO_PASSWORD, Role::Artist).await;
    store.seed_account("Budi Penikmat", DEMO_USER_EMAIL, DEMO_PASSWORD, Role::User).await;

    let artist = store.sign_in(DEMO_ARTIST_EMAIL, DEMO_PASSWORD).await?;
    let fan = store.sign_in(DEMO_USER_EMAIL, DEMO_PASSWORD).await?;

    for (index, (title, description, category, color)) in ARTWORKS.iter().enumerate() {
        let media_url = uploader
            .upload(MediaUpload {
                filename: format!("{}.svg", title.to_lowercase().replace(' ', "-")),
                content_type: "image/svg+xml".to_string(),
                bytes: placeholder_svg(title, color),
            })
            .await?;

        let artwork = store
            .insert_artwork(
                &artist,
                NewArtwork {
                    title: title.to_string(),
                    description: description.to_string(),
                    artist_id: artist.account.id.clone(),
                    category: category.to_string(),
                    media_type: MediaType::Image,
                    media_url,
                },
            )
            .await?;

        if index % 2 == 0 {
            store.insert_like(&fan, &artwork.id).await?;
            store
                .insert_comment(
                    &fan,
                    NewComment {
                        artwork_id: artwork.id.clone(),
                        user_id: fan.account.id.clone(),
                        text: format!("{} is beautiful!", title),
                    },
                )
                .await?;
        }
    }

    tracing::info!(
        "Demo data seeded: log in as {} or {} with password {}",
        DEMO_ARTIST_EMAIL,
        DEMO_USER_EMAIL,
        DEMO_PASSWORD
    );
    Ok(())
}

/// Seeded adapters whose media URLs point at `{public_url}/demo-media`
pub async fn seeded(public_url: &str) -> Result<(Arc<MemoryStore>, Arc<MemoryUploader>), DemoError> {
    let store = Arc::new(MemoryStore::new());
    let uploader = Arc::new(MemoryUploader::new(format!(
        "{}/demo-media",
        public_url.trim_end_matches('/')
    )));
    seed(&store, &uploader).await?;
    Ok((store, uploader))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_gallery() {
        let (store, uploader) = seeded("http://localhost:8080/").await.unwrap();

        let cards = store.list_artworks(None).await.unwrap();
        assert_eq!(cards.len(), ARTWORKS.len());
        assert_eq!(cards[0].artwork.title, "Kota Bintang");
        assert!(cards[0].artwork.media_url.starts_with("http://localhost:8080/demo-media/"));
        assert_eq!(uploader.uploads().await.len(), ARTWORKS.len());

        let liked: u64 = cards.iter().map(|c| c.like_count).sum();
        assert_eq!(liked, 3);
    }

    #[tokio::test]
    async fn test_demo_accounts_sign_in() {
        let (store, _) = seeded("http://localhost:8080").await.unwrap();
        let artist = store.sign_in(DEMO_ARTIST_EMAIL, DEMO_PASSWORD).await.unwrap();
        assert!(artist.account.is_artist());
        let fan = store.sign_in(DEMO_USER_EMAIL, DEMO_PASSWORD).await.unwrap();
        assert!(!fan.account.is_artist());
    }
}
