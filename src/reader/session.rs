//! The open chapter and everything done to it

use crate::anchor::{encode_range, AnchorDescriptor};
use crate::content::{rewrite_relative_urls, ContentError, ContentStore};
use crate::dom::{Document, NodeId, Range};
use crate::highlights::{apply_mark, remove_all_marks, restore_highlights, HighlightLog, MarkConfig};
use crate::library::ChapterIndex;
use crate::storage::{load_json, save_json, KeyValueStore};

use super::prefs::{scroll_key, LastChapter, ReaderPrefs, LAST_KEY};

/// Element name of the reader container that fragments are injected into
pub const CONTAINER_TAG: &str = "div";

/// Identifies one chapter-open request.
///
/// Only the most recently issued ticket may install its fragment; results
/// for older tickets arrive too late and are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTicket {
    generation: u64,
    url: String,
}

impl OpenTicket {
    pub fn url(&self) -> &str {
        &self.url
    }
}

struct OpenChapter {
    url: String,
    doc: Document,
}

/// Reader state for one user
pub struct ReaderSession<S> {
    store: S,
    marks: MarkConfig,
    generation: u64,
    current: Option<OpenChapter>,
    track_last: bool,
}

impl<S: KeyValueStore> ReaderSession<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            marks: MarkConfig::default(),
            generation: 0,
            current: None,
            track_last: true,
        }
    }

    /// Open chapters without recording them as the chapter to resume
    pub fn without_resume_tracking(mut self) -> Self {
        self.track_last = false;
        self
    }

    pub fn with_mark_config(mut self, marks: MarkConfig) -> Self {
        self.marks = marks;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start opening `url`; any earlier pending open becomes stale
    pub fn begin_open(&mut self, url: &str) -> OpenTicket {
        self.generation += 1;
        tracing::debug!("Opening {} (request {})", url, self.generation);
        OpenTicket {
            generation: self.generation,
            url: url.to_string(),
        }
    }

    pub fn is_current(&self, ticket: &OpenTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Install the fetched fragment for `ticket` and replay its highlights.
    ///
    /// Returns `false` without touching anything when the ticket is stale.
    pub fn finish_open(&mut self, ticket: &OpenTicket, html: &str) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!("Discarding stale content for {}", ticket.url);
            return false;
        }

        let html = rewrite_relative_urls(html, &ticket.url).unwrap_or_else(|e| {
            tracing::warn!("Leaving URLs of {} as-is: {}", ticket.url, e);
            html.to_string()
        });
        let mut doc = Document::parse_fragment(CONTAINER_TAG, &html);
        let root = doc.root();

        let descriptors = HighlightLog::new(&self.store).load_all(&ticket.url);
        let report = restore_highlights(&mut doc, root, &descriptors, &self.marks);
        if !report.skipped.is_empty() {
            tracing::debug!(
                "{}: {} highlight(s) could not be anchored",
                ticket.url,
                report.skipped.len()
            );
        }
        tracing::info!("Opened {} ({} highlights)", ticket.url, report.applied);

        self.current = Some(OpenChapter {
            url: ticket.url.clone(),
            doc,
        });
        if self.track_last {
            let last = LastChapter {
                url: ticket.url.clone(),
            };
            if let Err(e) = save_json(&self.store, LAST_KEY, &last) {
                tracing::warn!("Failed to remember last chapter: {}", e);
            }
        }
        true
    }

    /// Record a failed fetch for `ticket`; the reader is left without a
    /// chapter so nothing can be highlighted against the error view.
    pub fn fail_open(&mut self, ticket: &OpenTicket, error: &ContentError) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        tracing::warn!("Could not load {}: {}", ticket.url, error);
        self.current = None;
        true
    }

    /// Fetch and open `url`.
    ///
    /// `Ok(false)` means another open started while this one was fetching.
    pub async fn open<C>(&mut self, content: &C, url: &str) -> Result<bool, ContentError>
    where
        C: ContentStore + ?Sized,
    {
        let ticket = self.begin_open(url);
        match content.fetch(url).await {
            Ok(html) => Ok(self.finish_open(&ticket, &html)),
            Err(e) => {
                self.fail_open(&ticket, &e);
                Err(e)
            }
        }
    }

    /// Reopen the chapter recorded by the last session, if it is still listed
    pub async fn resume<C>(&mut self, index: &ChapterIndex, content: &C) -> Result<bool, ContentError>
    where
        C: ContentStore + ?Sized,
    {
        let Some(url) = self.last_chapter() else {
            return Ok(false);
        };
        if index.find(&url).is_none() {
            tracing::debug!("Last chapter {} is no longer listed", url);
            return Ok(false);
        }
        self.open(content, &url).await
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|chapter| chapter.url.as_str())
    }

    /// Rendered chapter tree; its root is the reader container
    pub fn document(&self) -> Option<&Document> {
        self.current.as_ref().map(|chapter| &chapter.doc)
    }

    pub fn container(&self) -> Option<NodeId> {
        self.document().map(Document::root)
    }

    /// Current chapter markup, highlights included
    pub fn render(&self) -> Option<String> {
        self.document().map(|doc| doc.inner_html(doc.root()))
    }

    /// Highlight `selection` in the open chapter and log it.
    ///
    /// Returns `None`, changing nothing, when no chapter is open or the
    /// selection cannot be encoded (collapsed, inverted, out of bounds,
    /// inside a comment or outside the container).
    pub fn highlight(&mut self, selection: &Range) -> Option<AnchorDescriptor> {
        let chapter = self.current.as_mut()?;
        let root = chapter.doc.root();

        let descriptor = match encode_range(&chapter.doc, root, selection) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::debug!("Ignoring selection: {}", e);
                return None;
            }
        };
        apply_mark(&mut chapter.doc, selection, &self.marks)?;

        if let Err(e) = HighlightLog::new(&self.store).append(&chapter.url, &descriptor) {
            tracing::warn!("Failed to save highlight for {}: {}", chapter.url, e);
        }
        Some(descriptor)
    }

    /// Remove every highlight from the open chapter and drop its log.
    /// Returns the number of markers removed.
    pub fn clear_highlights(&mut self) -> usize {
        let Some(chapter) = self.current.as_mut() else {
            return 0;
        };
        let root = chapter.doc.root();
        let removed = remove_all_marks(&mut chapter.doc, root, &self.marks);

        if let Err(e) = HighlightLog::new(&self.store).clear_all(&chapter.url) {
            tracing::warn!("Failed to clear highlights for {}: {}", chapter.url, e);
        }
        removed
    }

    /// Remember the scroll offset of the open chapter
    pub fn record_scroll(&self, offset: f64) {
        let Some(url) = self.current_url() else {
            return;
        };
        if let Err(e) = self.store.set(&scroll_key(url), &offset.to_string()) {
            tracing::warn!("Failed to save scroll position: {}", e);
        }
    }

    /// Saved scroll offset for `url`, `0` when unknown
    pub fn saved_scroll(&self, url: &str) -> f64 {
        self.store
            .get(&scroll_key(url))
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|offset| offset.is_finite())
            .unwrap_or(0.0)
    }

    pub fn last_chapter(&self) -> Option<String> {
        load_json::<LastChapter, _>(&self.store, LAST_KEY).map(|last| last.url)
    }

    pub fn prefs(&self) -> ReaderPrefs {
        ReaderPrefs::load(&self.store)
    }

    pub fn set_prefs(&self, prefs: &ReaderPrefs) {
        if let Err(e) = prefs.save(&self.store) {
            tracing::warn!("Failed to save preferences: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::NodeLocation;
    use crate::content::FsContentStore;
    use crate::dom::Boundary;
    use crate::highlights::log_key;
    use crate::library::ChapterItem;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use tempfile::TempDir;

    const URL: &str = "build/content/firstaid/cardio/heart.html";
    const HTML: &str = "<p>Hello <b>world</b></p>\n<p>Second paragraph</p>";

    fn opened(store: &MemoryStore) -> ReaderSession<&MemoryStore> {
        let mut session = ReaderSession::new(store);
        let ticket = session.begin_open(URL);
        assert!(session.finish_open(&ticket, HTML));
        session
    }

    fn select(session: &ReaderSession<&MemoryStore>, needle: &str, from: usize, to: usize) -> Range {
        let doc = session.document().unwrap();
        let text = doc.find_text(doc.root(), needle).unwrap();
        Range::within(text, from, to)
    }

    fn mark_texts(session: &ReaderSession<&MemoryStore>) -> Vec<String> {
        let doc = session.document().unwrap();
        doc.elements_by_name(doc.root(), "mark")
            .into_iter()
            .map(|m| doc.text_content(m))
            .collect()
    }

    #[test]
    fn test_highlight_persists_and_restores() {
        let store = MemoryStore::new();
        let mut session = opened(&store);

        let range = select(&session, "world", 0, 5);
        let descriptor = session.highlight(&range).unwrap();
        assert_eq!(descriptor.start, NodeLocation::new(vec![0, 1, 0], 0));
        assert_eq!(mark_texts(&session), vec!["world"]);

        let reopened = opened(&store);
        assert_eq!(mark_texts(&reopened), vec!["world"]);
        assert_eq!(reopened.render(), session.render());
    }

    #[test]
    fn test_stale_open_is_discarded() {
        let store = MemoryStore::new();
        let mut session = ReaderSession::new(&store);

        let first = session.begin_open("a.html");
        let second = session.begin_open("b/c.html");

        assert!(!session.finish_open(&first, "<p>A</p>"));
        assert!(session.current_url().is_none());
        assert!(session.finish_open(&second, "<p>C</p>"));
        assert_eq!(session.current_url(), Some("b/c.html"));
        assert_eq!(session.last_chapter().as_deref(), Some("b/c.html"));
    }

    #[test]
    fn test_rejected_selections_leave_no_trace() {
        let store = MemoryStore::new();
        let mut session = opened(&store);

        let collapsed = select(&session, "Second", 3, 3);
        assert!(session.highlight(&collapsed).is_none());
        assert!(!store.contains_key(&log_key(URL)));

        let mut closed = ReaderSession::new(&store);
        assert!(closed.highlight(&collapsed).is_none());
        assert_eq!(closed.clear_highlights(), 0);
    }

    #[test]
    fn test_inverted_and_oversized_selections_rejected() {
        let store = MemoryStore::new();
        let mut session = opened(&store);
        let before = session.render();

        let inverted = select(&session, "Second", 5, 1);
        assert!(session.highlight(&inverted).is_none());
        let oversized = select(&session, "Second", 0, 99);
        assert!(session.highlight(&oversized).is_none());

        let doc = session.document().unwrap();
        let hello = doc.find_text(doc.root(), "Hello").unwrap();
        let second = doc.find_text(doc.root(), "Second").unwrap();
        let backwards = Range::new(Boundary::new(second, 2), Boundary::new(hello, 1));
        assert!(session.highlight(&backwards).is_none());

        assert!(!store.contains_key(&log_key(URL)));
        assert_eq!(session.render(), before);
        assert!(mark_texts(&opened(&store)).is_empty());
    }

    #[test]
    fn test_untracked_session_keeps_last_chapter() {
        let store = MemoryStore::new();
        drop(opened(&store));

        let mut preview = ReaderSession::new(&store).without_resume_tracking();
        let ticket = preview.begin_open("other/page.html");
        assert!(preview.finish_open(&ticket, "<p>Other</p>"));
        assert_eq!(preview.current_url(), Some("other/page.html"));
        assert_eq!(preview.last_chapter().as_deref(), Some(URL));

        let fresh = MemoryStore::new();
        let mut untracked = ReaderSession::new(&fresh).without_resume_tracking();
        let ticket = untracked.begin_open(URL);
        assert!(untracked.finish_open(&ticket, HTML));
        assert!(!fresh.contains_key(LAST_KEY));
    }

    #[test]
    fn test_clear_highlights() {
        let store = MemoryStore::new();
        let mut session = opened(&store);
        let before = session.render();

        let range = select(&session, "Second", 0, 6);
        session.highlight(&range).unwrap();
        let range = select(&session, "Hello", 1, 4);
        session.highlight(&range).unwrap();

        assert_eq!(session.clear_highlights(), 2);
        assert_eq!(session.render(), before);
        assert!(!store.contains_key(&log_key(URL)));

        assert_eq!(session.clear_highlights(), 0);
        assert_eq!(session.render(), before);
        assert!(mark_texts(&opened(&store)).is_empty());
    }

    #[test]
    fn test_unresolvable_entries_are_kept_for_later() {
        let store = MemoryStore::new();
        let good = {
            let mut session = opened(&store);
            let range = select(&session, "Second", 0, 6);
            session.highlight(&range).unwrap()
        };
        let log = HighlightLog::new(&store);
        log.clear_all(URL).unwrap();
        let bogus = AnchorDescriptor::new(
            NodeLocation::new(vec![7, 0], 0),
            NodeLocation::new(vec![7, 0], 1),
        );
        log.append(URL, &bogus).unwrap();
        log.append(URL, &good).unwrap();

        let session = opened(&store);

        assert_eq!(mark_texts(&session), vec!["Second"]);
        assert_eq!(log.load_all(URL).len(), 2);
    }

    #[test]
    fn test_relative_urls_rebased_on_open() {
        let store = MemoryStore::new();
        let mut session = ReaderSession::new(&store);
        let ticket = session.begin_open(URL);
        session.finish_open(&ticket, r#"<p><img src="fig.png"></p>"#);

        assert_eq!(
            session.render().unwrap(),
            r#"<p><img src="build/content/firstaid/cardio/fig.png"></p>"#
        );
    }

    #[test]
    fn test_scroll_positions() {
        let store = MemoryStore::new();
        let session = opened(&store);

        assert_eq!(session.saved_scroll(URL), 0.0);
        session.record_scroll(412.5);
        assert_eq!(session.saved_scroll(URL), 412.5);

        store.set(&scroll_key("other.html"), "garbage").unwrap();
        assert_eq!(session.saved_scroll("other.html"), 0.0);
    }

    #[test]
    fn test_fallback_wrap_across_elements() {
        let store = MemoryStore::new();
        let mut session = opened(&store);
        let doc = session.document().unwrap();
        let hello = doc.find_text(doc.root(), "Hello").unwrap();
        let world = doc.find_text(doc.root(), "world").unwrap();
        let range = Range::new(Boundary::new(hello, 2), Boundary::new(world, 3));

        session.highlight(&range).unwrap();
        assert_eq!(mark_texts(&session), vec!["llo wor"]);

        let reopened = opened(&store);
        assert_eq!(reopened.render(), session.render());
    }

    #[tokio::test]
    async fn test_open_and_resume_from_content_store() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(URL);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, HTML).unwrap();
        let content = FsContentStore::new(dir.path());
        let store = MemoryStore::new();

        let mut session = ReaderSession::new(&store);
        assert!(session.open(&content, URL).await.unwrap());
        assert!(session.open(&content, "build/content/missing.html").await.is_err());
        assert!(session.current_url().is_none());

        let index = ChapterIndex {
            generated: Utc::now(),
            items: vec![ChapterItem {
                source: "firstaid".to_string(),
                system: "cardio".to_string(),
                title: "Heart".to_string(),
                slug: "heart".to_string(),
                url: URL.to_string(),
                updated: Utc::now(),
            }],
        };
        let mut next = ReaderSession::new(&store);
        assert!(next.resume(&index, &content).await.unwrap());
        assert_eq!(next.current_url(), Some(URL));

        let empty = ChapterIndex {
            generated: Utc::now(),
            items: vec![],
        };
        let mut other = ReaderSession::new(&store);
        assert!(!other.resume(&empty, &content).await.unwrap());
    }
}
