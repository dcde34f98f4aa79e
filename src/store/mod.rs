pub mod types;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::analysis::{decode_data_url, is_data_url, AnalysisResult};
use crate::schedule::{CompletedIds, ServiceSlot, SlotStatus};
use types::{EpisodeRecord, StoredImage};

// Key prefixes, no trailing slashes
const RECORD_PREFIX: &str = "episode/record";
const IMAGE_PREFIX: &str = "episode/image";

pub const THUMBNAIL_FILE: &str = "thumb_16_9.png";
pub const COVER_FILE: &str = "cover_1_1.png";

fn record_key(id: &str) -> String {
    format!("{}/{}", RECORD_PREFIX, id)
}
fn image_key(path: &str) -> String {
    format!("{}/{}", IMAGE_PREFIX, path)
}

/// Store path for an episode's artwork, e.g. `episodes/{id}/thumb_16_9.png`.
pub fn image_path(episode_id: &str, file_name: &str) -> String {
    format!("episodes/{}/{}", episode_id, file_name)
}

pub struct EpisodeStore {
    storage: Storage,
}

impl EpisodeStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![RECORD_PREFIX.to_string(), IMAGE_PREFIX.to_string()];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self { storage })
    }

    /// Save the analysis for `slot` as a published episode.
    ///
    /// Generated images still held as `data:` URLs are uploaded in the same
    /// commit and replaced by their store paths. Saving again overwrites.
    pub async fn publish(
        &self,
        slot: &ServiceSlot,
        mut analysis: AnalysisResult,
        saved_by: &str,
    ) -> Result<EpisodeRecord> {
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        let mut images = Vec::new();

        if let Some(generated) = analysis.generated_images.as_mut() {
            for (url, file_name) in [
                (&mut generated.thumbnail_16_9, THUMBNAIL_FILE),
                (&mut generated.artwork_1_1, COVER_FILE),
            ] {
                if !is_data_url(url) {
                    continue;
                }
                let (_mime, bytes) = decode_data_url(url)
                    .with_context(|| format!("decode generated {}", file_name))?;
                let path = image_path(&slot.id, file_name);
                images.push(StoredImage {
                    path: path.clone(),
                    digest: blake3::hash(&bytes).to_hex().to_string(),
                    size: bytes.len(),
                });
                delta.put_raw(image_key(&path), bytes);
                *url = path;
            }
        }

        // Artwork from an earlier save that this one does not rewrite
        if let Some(bytes) = delta.get_raw(&record_key(&slot.id)).await? {
            match serde_json::from_slice::<EpisodeRecord>(&bytes) {
                Ok(previous) => {
                    for old in previous.images {
                        if !images.iter().any(|img| img.path == old.path) {
                            delta.delete(image_key(&old.path));
                        }
                    }
                }
                Err(e) => {
                    warn!(episode_id = %slot.id, "Replacing unreadable episode record: {}", e)
                }
            }
        }

        let record = EpisodeRecord {
            id: slot.id.clone(),
            site_id: slot.site_id.clone(),
            date: slot.date,
            time: slot.time.clone(),
            ai_analysis: analysis,
            status: SlotStatus::Published,
            saved_at: chrono::Utc::now().timestamp(),
            saved_by: saved_by.to_string(),
            images,
        };

        delta.put_raw(
            record_key(&record.id),
            serde_json::to_vec(&record).context("serialize EpisodeRecord")?,
        );
        self.storage.commit(delta).await?;
        debug!(
            episode_id = %record.id,
            images = record.images.len(),
            saved_by,
            "episode stored"
        );
        Ok(record)
    }

    pub async fn get_episode(&self, id: &str) -> Result<Option<EpisodeRecord>> {
        let snapshot = self.storage.latest_snapshot();
        let Some(bytes) = snapshot.get_raw(&record_key(id)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("corrupt episode record {}", id))?;
        Ok(Some(record))
    }

    /// List saved episodes, most recently saved first.
    pub async fn list_episodes(&self, limit: usize) -> Result<Vec<EpisodeRecord>> {
        let snapshot = self.storage.latest_snapshot();
        let mut stream = snapshot.prefix_raw(RECORD_PREFIX);
        let mut results = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((key, value)) => match serde_json::from_slice::<EpisodeRecord>(&value) {
                    Ok(record) => results.push(record),
                    Err(e) => warn!(key = %key, "Skipping unreadable episode record: {}", e),
                },
                Err(e) => {
                    warn!("Error reading episode stream: {}", e);
                }
            }
        }

        results.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        results.truncate(limit);
        Ok(results)
    }

    /// Delete an episode and its uploaded images.
    pub async fn delete_episode(&self, id: &str) -> Result<bool> {
        let Some(record) = self.get_episode(id).await? else {
            return Ok(false);
        };
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        for image in &record.images {
            delta.delete(image_key(&image.path));
        }
        delta.delete(record_key(id));
        self.storage.commit(delta).await?;
        debug!(episode_id = id, "episode deleted");
        Ok(true)
    }

    pub async fn get_image(&self, path: &str) -> Result<Vec<u8>> {
        let snapshot = self.storage.latest_snapshot();
        snapshot
            .get_raw(&image_key(path))
            .await?
            .ok_or_else(|| anyhow::anyhow!("image not found: {}", path))
    }
}

impl CompletedIds for EpisodeStore {
    /// Ids of every saved episode. Only keys are read, never record bodies.
    async fn list_completed_ids(&self) -> Result<HashSet<String>> {
        let snapshot = self.storage.latest_snapshot();
        let prefix = format!("{}/", RECORD_PREFIX);
        let mut stream = snapshot.prefix_keys(RECORD_PREFIX);
        let mut ids = HashSet::new();

        while let Some(entry) = stream.next().await {
            let key = entry.context("Error reading episode keys")?;
            if let Some(id) = key.strip_prefix(&prefix) {
                ids.insert(id.to_string());
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_result;
    use crate::analysis::{to_data_url, GeneratedImages};
    use chrono::NaiveDate;

    fn slot() -> ServiceSlot {
        ServiceSlot::new(
            "campos85",
            NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
            "19:30",
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = EpisodeStore::new(dir.path()).await.unwrap();

        assert!(store.get_episode("campos85_20240512_1930").await.unwrap().is_none());
        assert!(store.list_completed_ids().await.unwrap().is_empty());

        let record = store.publish(&slot(), sample_result(), "ana").await.unwrap();
        assert_eq!(record.status, SlotStatus::Published);
        assert!(record.images.is_empty());

        let loaded = store
            .get_episode("campos85_20240512_1930")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.saved_by, "ana");
        assert_eq!(loaded.time, "19:30");
        assert_eq!(loaded.ai_analysis, sample_result());

        let ids = store.list_completed_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("campos85_20240512_1930"));
        assert_eq!(store.list_episodes(10).await.unwrap().len(), 1);

        assert!(store.delete_episode("campos85_20240512_1930").await.unwrap());
        assert!(store.list_completed_ids().await.unwrap().is_empty());
        assert!(!store.delete_episode("campos85_20240512_1930").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_uploads_generated_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = EpisodeStore::new(dir.path()).await.unwrap();

        let mut analysis = sample_result();
        analysis.generated_images = Some(GeneratedImages {
            thumbnail_16_9: to_data_url("image/png", b"wide"),
            artwork_1_1: "https://cdn.example.org/cover.png".to_string(),
        });

        let record = store.publish(&slot(), analysis, "ana").await.unwrap();
        let images = record.ai_analysis.generated_images.as_ref().unwrap();
        assert_eq!(images.thumbnail_16_9, "episodes/campos85_20240512_1930/thumb_16_9.png");
        assert_eq!(images.artwork_1_1, "https://cdn.example.org/cover.png");

        assert_eq!(record.images.len(), 1);
        assert_eq!(record.images[0].size, 4);
        assert_eq!(record.images[0].digest, blake3::hash(b"wide").to_hex().to_string());

        let bytes = store.get_image(&images.thumbnail_16_9).await.unwrap();
        assert_eq!(bytes, b"wide");
        assert!(store.get_image("episodes/none/cover_1_1.png").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_republish_drops_replaced_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = EpisodeStore::new(dir.path()).await.unwrap();
        let thumb = image_path("campos85_20240512_1930", THUMBNAIL_FILE);
        let cover = image_path("campos85_20240512_1930", COVER_FILE);

        let mut analysis = sample_result();
        analysis.generated_images = Some(GeneratedImages {
            thumbnail_16_9: to_data_url("image/png", b"wide"),
            artwork_1_1: to_data_url("image/png", b"square"),
        });
        store.publish(&slot(), analysis, "ana").await.unwrap();
        assert_eq!(store.get_image(&thumb).await.unwrap(), b"wide");

        // same paths rewritten: the new bytes win
        let mut again = sample_result();
        again.generated_images = Some(GeneratedImages {
            thumbnail_16_9: to_data_url("image/png", b"wider"),
            artwork_1_1: "https://cdn.example.org/cover.png".to_string(),
        });
        let record = store.publish(&slot(), again, "bia").await.unwrap();
        assert_eq!(record.images.len(), 1);
        assert_eq!(store.get_image(&thumb).await.unwrap(), b"wider");
        assert!(store.get_image(&cover).await.is_err());

        // re-analysis without a photo
        let record = store.publish(&slot(), sample_result(), "bia").await.unwrap();
        assert!(record.images.is_empty());
        assert!(store.get_image(&thumb).await.is_err());

        assert!(store.delete_episode("campos85_20240512_1930").await.unwrap());
        assert!(store.get_image(&thumb).await.is_err());
        assert!(store.get_image(&cover).await.is_err());
    }
}
