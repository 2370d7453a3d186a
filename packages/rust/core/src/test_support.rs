//! Fixtures shared by the core crate's tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use boardshelf_rulebook::{DocumentKind, ParsedRulebook};
use boardshelf_shared::{
    BoardshelfError, CatalogEntry, FamilyContext, FamilyId, GameId, GeneratedContent,
    PipelineState, Result, Taxonomy,
};
use boardshelf_storage::{NewGame, Storage};

use crate::collaborators::{
    Classifier, Collaborators, ContentGenerator, GenerationRequest, RulebookParser,
};
use crate::progress::ProgressEvent;

/// An in-memory entry in the `imported` state.
pub fn entry(name: &str, year: Option<i32>) -> CatalogEntry {
    let now = Utc::now();
    CatalogEntry {
        id: GameId::new(),
        name: name.to_string(),
        slug: boardshelf_shared::slugify(name),
        year_published: year,
        state: PipelineState::Imported,
        rulebook_url: None,
        bgg_id: None,
        family_id: None,
        rulebook_text: None,
        complexity: None,
        taxonomy: None,
        content: GeneratedContent::default(),
        last_error: None,
        last_processed_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// A fresh database in the temp directory.
pub async fn test_storage() -> Storage {
    let path = std::env::temp_dir().join(format!("boardshelf_core_test_{}.db", Uuid::now_v7()));
    Storage::open(&path).await.unwrap()
}

/// Persist the identity fields of an in-memory entry.
pub async fn insert_entry(storage: &Storage, entry: &CatalogEntry) {
    storage
        .insert_game(&NewGame {
            id: entry.id.clone(),
            name: entry.name.clone(),
            slug: entry.slug.clone(),
            year_published: entry.year_published,
            state: entry.state,
            rulebook_url: entry.rulebook_url.clone(),
            bgg_id: entry.bgg_id,
            family_id: entry.family_id.clone(),
        })
        .await
        .unwrap();
}

/// Poll until the family's processing lock is cleared. Returns `false` if it
/// is still held after about half a second.
pub async fn wait_for_unlock(storage: &Storage, family_id: &FamilyId) -> bool {
    for _ in 0..50 {
        let family = storage.get_family(family_id).await.unwrap().unwrap();
        if family.processing_lock.is_none() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Drain every event sent on a progress channel.
pub async fn collect_events(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Names of entries that should fail or hang, plus a call counter.
#[derive(Default)]
pub struct Behaviour {
    failing: Mutex<HashSet<String>>,
    stalling: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl Behaviour {
    pub fn fail_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Calls for `name` never return.
    pub fn stall_for(&self, name: &str) {
        self.stalling.lock().unwrap().insert(name.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn call(&self, name: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stalls = self.stalling.lock().unwrap().contains(name);
        if stalls {
            std::future::pending::<()>().await;
        }
        self.failing.lock().unwrap().contains(name)
    }
}

#[derive(Default)]
pub struct FakeParser {
    behaviour: Behaviour,
}

impl std::ops::Deref for FakeParser {
    type Target = Behaviour;

    fn deref(&self) -> &Behaviour {
        &self.behaviour
    }
}

#[async_trait]
impl RulebookParser for FakeParser {
    async fn parse(&self, entry: &CatalogEntry, rulebook_url: &str) -> Result<ParsedRulebook> {
        if self.call(&entry.name).await {
            return Err(BoardshelfError::Network(format!(
                "rulebook unreachable: {rulebook_url}"
            )));
        }
        let body = format!(
            "# {}\n\n## Setup\n\nShuffle the deck and deal five cards.\n\n## Turn\n\nPlace a worker, then **collect** income.\n",
            entry.name
        );
        boardshelf_rulebook::parse_document(rulebook_url, &body, DocumentKind::Markdown)
    }
}

#[derive(Default)]
pub struct FakeClassifier {
    behaviour: Behaviour,
}

impl std::ops::Deref for FakeClassifier {
    type Target = Behaviour;

    fn deref(&self) -> &Behaviour {
        &self.behaviour
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, entry: &CatalogEntry, _rulebook_text: &str) -> Result<Taxonomy> {
        if self.call(&entry.name).await {
            return Err(BoardshelfError::Classification("classifier offline".into()));
        }
        Ok(Taxonomy {
            categories: vec!["card-game".into()],
            mechanics: vec!["worker-placement".into()],
        })
    }
}

/// Generator fake that records the family context each call received.
#[derive(Default)]
pub struct FakeGenerator {
    behaviour: Behaviour,
    received: Mutex<Vec<(String, Option<FamilyContext>)>>,
    shutdowns: AtomicUsize,
}

impl FakeGenerator {
    /// `(entry name, family context)` per generate call, in call order.
    pub fn received(&self) -> Vec<(String, Option<FamilyContext>)> {
        self.received.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl std::ops::Deref for FakeGenerator {
    type Target = Behaviour;

    fn deref(&self) -> &Behaviour {
        &self.behaviour
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    fn model_id(&self) -> &str {
        "fake/model"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent> {
        self.received
            .lock()
            .unwrap()
            .push((request.name.clone(), request.family_context.clone()));
        if self.call(&request.name).await {
            return Err(BoardshelfError::Generation("backend rejected request".into()));
        }
        Ok(GeneratedContent {
            rules: Some(json!({
                "summary": format!("How to play {}.", request.name),
                "key_terms": ["Worker"],
            })),
            setup: Some(json!(format!("Set up {}.", request.name))),
            reference: None,
        })
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared handles to the fakes, kept by the test for assertions.
#[derive(Default, Clone)]
pub struct Fakes {
    pub parser: Arc<FakeParser>,
    pub classifier: Arc<FakeClassifier>,
    pub generator: Arc<FakeGenerator>,
}

impl Fakes {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            parser: self.parser.clone(),
            classifier: self.classifier.clone(),
            generator: self.generator.clone(),
        }
    }
}
