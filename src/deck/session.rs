//! Review session for one topic

use crate::content::{ContentError, ContentStore};
use crate::library::{DeckIndex, DeckSource, DeckSources};
use crate::storage::KeyValueStore;

use super::cards::split_into_cards;
use super::progress::{progress_key, ProgressLog};

/// Underscores in folder names read as spaces
pub fn pretty(name: &str) -> String {
    name.replace('_', " ")
}

fn clamp_index(idx: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let last = i64::try_from(len - 1).unwrap_or(i64::MAX);
    usize::try_from(idx.clamp(0, last)).unwrap_or(0)
}

/// Card and image review over one topic.
///
/// The card position is saved after every move and restored when a source is
/// (re)selected.
pub struct DeckSession<S> {
    store: S,
    system: String,
    topic: String,
    sources: DeckSources,
    source: DeckSource,
    cards: Vec<String>,
    card_idx: usize,
    image_idx: usize,
}

impl<S: KeyValueStore> DeckSession<S> {
    /// Open `system`/`topic` on its first available text source
    pub async fn open<C>(
        store: S,
        index: &DeckIndex,
        system: &str,
        topic: &str,
        content: &C,
    ) -> Result<Self, ContentError>
    where
        C: ContentStore + ?Sized,
    {
        let entry = index
            .topic(system, topic)
            .ok_or_else(|| ContentError::NotFound(format!("{}/{}", system, topic)))?;
        let source = entry.sources.first_available().unwrap_or(DeckSource::Quick);

        let mut session = Self {
            store,
            system: system.to_string(),
            topic: topic.to_string(),
            sources: entry.sources.clone(),
            source,
            cards: Vec::new(),
            card_idx: 0,
            image_idx: 0,
        };
        session.select_source(source, content).await?;
        Ok(session)
    }

    /// Load every file of `source` as one deck and jump to the saved card
    pub async fn select_source<C>(&mut self, source: DeckSource, content: &C) -> Result<(), ContentError>
    where
        C: ContentStore + ?Sized,
    {
        let mut cards = Vec::new();
        for file in self.sources.files(source) {
            let text = content.fetch(file).await?;
            cards.extend(split_into_cards(&text));
        }

        self.source = source;
        self.cards = cards;
        let saved = ProgressLog::new(&self.store).get(&self.progress_key());
        self.card_idx = saved
            .map(|progress| clamp_index(progress.idx, self.cards.len()))
            .unwrap_or(0);
        tracing::debug!(
            "Loaded {} cards for {} (resuming at {})",
            self.cards.len(),
            self.progress_key(),
            self.card_idx
        );

        self.save_progress();
        Ok(())
    }

    fn progress_key(&self) -> String {
        progress_key(&self.system, &self.topic, self.source)
    }

    fn save_progress(&self) {
        if let Err(e) = ProgressLog::new(&self.store).record(&self.progress_key(), self.card_idx) {
            tracing::warn!("Failed to save deck progress: {}", e);
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn source(&self) -> DeckSource {
        self.source
    }

    /// Text sources with at least one file
    pub fn available_sources(&self) -> Vec<DeckSource> {
        DeckSource::ALL
            .into_iter()
            .filter(|&source| !self.sources.files(source).is_empty())
            .collect()
    }

    pub fn cards(&self) -> &[String] {
        &self.cards
    }

    pub fn card_index(&self) -> usize {
        self.card_idx
    }

    pub fn current_card(&self) -> Option<&str> {
        self.cards.get(self.card_idx).map(String::as_str)
    }

    /// `Card 3 / 10`, or `No cards`
    pub fn position_label(&self) -> String {
        if self.cards.is_empty() {
            "No cards".to_string()
        } else {
            format!("Card {} / {}", self.card_idx + 1, self.cards.len())
        }
    }

    fn move_card(&mut self, delta: i64) -> Option<&str> {
        if self.cards.is_empty() {
            return None;
        }
        let target = i64::try_from(self.card_idx).unwrap_or(i64::MAX).saturating_add(delta);
        self.card_idx = clamp_index(target, self.cards.len());
        self.save_progress();
        self.current_card()
    }

    pub fn next_card(&mut self) -> Option<&str> {
        self.move_card(1)
    }

    pub fn prev_card(&mut self) -> Option<&str> {
        self.move_card(-1)
    }

    pub fn images(&self) -> &[String] {
        &self.sources.images
    }

    /// Start the image viewer from the first image
    pub fn open_images(&mut self) -> Option<&str> {
        self.image_idx = 0;
        self.current_image()
    }

    pub fn image_index(&self) -> usize {
        self.image_idx
    }

    pub fn current_image(&self) -> Option<&str> {
        self.sources.images.get(self.image_idx).map(String::as_str)
    }

    /// File name of the current image
    pub fn image_caption(&self) -> Option<&str> {
        self.current_image()
            .and_then(|url| url.rsplit('/').next())
    }

    fn move_image(&mut self, delta: i64) -> Option<&str> {
        let total = self.sources.images.len();
        if total == 0 {
            return None;
        }
        let target = i64::try_from(self.image_idx).unwrap_or(i64::MAX).saturating_add(delta);
        self.image_idx = clamp_index(target, total);
        self.current_image()
    }

    pub fn next_image(&mut self) -> Option<&str> {
        self.move_image(1)
    }

    pub fn prev_image(&mut self) -> Option<&str> {
        self.move_image(-1)
    }
}
