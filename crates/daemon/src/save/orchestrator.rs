// End-to-end handling of one save request.

use std::path::PathBuf;

use storysave_common::csf::CsfFile;
use storysave_common::path::normalize_path;
use storysave_common::protocol::story::{SaveStoryPayload, SaveStoryResponse};
use tracing::{debug, info};

use crate::save::diagnostics::Diagnostics;
use crate::save::fault::SaveFault;
use crate::save::locator::find_story;
use crate::save::planner::EditPlan;
use crate::store::{FsStoryStore, PathLocks, StoryStore};

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedStory {
    pub path: PathBuf,
    pub export_name: String,
}

pub struct SaveOrchestrator<S: StoryStore = FsStoryStore> {
    root: PathBuf,
    store: S,
    locks: Option<PathLocks>,
    diagnostics: Diagnostics,
}

impl SaveOrchestrator<FsStoryStore> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_store(root, FsStoryStore)
    }
}

impl<S: StoryStore> SaveOrchestrator<S> {
    pub fn with_store(root: impl Into<PathBuf>, store: S) -> Self {
        Self {
            root: root.into(),
            store,
            locks: Some(PathLocks::new()),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Whether saves to the same file wait for each other (on by default).
    pub fn with_serialized_writes(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(PathLocks::new);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run the save and turn its outcome into the response for the client.
    pub async fn handle(&self, payload: &SaveStoryPayload) -> SaveStoryResponse {
        match self.save(payload).await {
            Ok(saved) => {
                info!(
                    story_id = %payload.id,
                    path = %saved.path.display(),
                    export_name = %saved.export_name,
                    "story saved"
                );
                SaveStoryResponse::saved(&payload.id)
            }
            Err(fault) => self.diagnostics.report(&payload.id, &fault),
        }
    }

    /// Locate, plan, edit and write. Nothing is written unless every step
    /// before the write succeeded.
    pub async fn save(&self, payload: &SaveStoryPayload) -> Result<SavedStory, SaveFault> {
        let path = self.resolve(&payload.import_path)?;
        let _guard = match &self.locks {
            Some(locks) => Some(locks.lock(&path).await),
            None => None,
        };

        let source = self
            .store
            .read(&path)
            .await
            .map_err(|source| SaveFault::Read { path: path.clone(), source })?;
        let mut file = CsfFile::parse(&payload.import_path, &source)
            .map_err(|source| SaveFault::Parse { path: path.clone(), source })?;

        let story_key = payload
            .story_key()
            .ok_or_else(|| SaveFault::MissingStoryKey { story_id: payload.id.clone() })?;
        let stories = file.stories();
        let located = find_story(&stories, story_key)?;
        let plan = EditPlan::new(located.export_name.as_str(), payload.new_story_name());
        debug!(story_id = %payload.id, ?plan, "planned story edit");

        let target = plan.execute(&mut file)?;
        file.apply_args(&target, &payload.args).map_err(|source| SaveFault::Mutation {
            export_name: target.export_name().to_string(),
            source,
        })?;

        self.store
            .write(&path, &file.serialize())
            .await
            .map_err(|source| SaveFault::Write { path: path.clone(), source })?;

        Ok(SavedStory { path, export_name: target.export_name().to_string() })
    }

    fn resolve(&self, import_path: &str) -> Result<PathBuf, SaveFault> {
        let relative = normalize_path(import_path).map_err(|source| SaveFault::InvalidPath {
            import_path: import_path.to_string(),
            source,
        })?;
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use storysave_common::protocol::story::SAVE_FAILED_MESSAGE;

    use super::*;
    use crate::save::fault::FaultKind;

    const BUTTON: &str = "export default { title: 'Button' };\n\nexport const Primary = {\n  args: {\n    label: 'Button',\n  },\n};\n";

    /// In-memory store that records every write.
    #[derive(Clone, Default)]
    struct MemoryStore {
        files: Arc<Mutex<HashMap<PathBuf, String>>>,
        writes: Arc<Mutex<Vec<PathBuf>>>,
        fail_writes: bool,
    }

    impl MemoryStore {
        fn with_file(path: &str, contents: &str) -> Self {
            let store = Self::default();
            store.files.lock().unwrap().insert(PathBuf::from(path), contents.to_string());
            store
        }

        fn contents(&self, path: &str) -> String {
            self.files.lock().unwrap()[Path::new(path)].clone()
        }

        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl StoryStore for MemoryStore {
        async fn read(&self, path: &Path) -> io::Result<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.writes.lock().unwrap().push(path.to_path_buf());
            self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }
    }

    fn payload(value: serde_json::Value) -> SaveStoryPayload {
        serde_json::from_value(value).unwrap()
    }

    fn orchestrator(store: MemoryStore) -> SaveOrchestrator<MemoryStore> {
        SaveOrchestrator::with_store("/project", store)
    }

    #[tokio::test]
    async fn updates_story_in_place() {
        let store = MemoryStore::with_file("/project/Button.stories.tsx", BUTTON);
        let orchestrator = orchestrator(store.clone());

        let response = orchestrator
            .handle(&payload(json!({
                "id": "button--primary",
                "importPath": "./Button.stories.tsx",
                "args": { "label": "Click" }
            })))
            .await;

        assert_eq!(response, SaveStoryResponse::saved("button--primary"));
        assert_eq!(store.write_count(), 1);
        assert_eq!(
            store.contents("/project/Button.stories.tsx"),
            BUTTON.replace("'Button',\n  },", "'Click',\n  },")
        );
    }

    #[tokio::test]
    async fn save_as_reports_new_export() {
        let store = MemoryStore::with_file("/project/Button.stories.tsx", BUTTON);
        let saved = orchestrator(store.clone())
            .save(&payload(json!({
                "id": "button--primary",
                "importPath": "Button.stories.tsx",
                "name": "PrimaryLong",
                "args": { "label": "Long" }
            })))
            .await
            .unwrap();

        assert_eq!(saved.export_name, "PrimaryLong");
        assert_eq!(saved.path, PathBuf::from("/project/Button.stories.tsx"));
        assert!(store
            .contents("/project/Button.stories.tsx")
            .ends_with("export const PrimaryLong = {\n  args: {\n    label: 'Long',\n  },\n};\n"));
    }

    #[tokio::test]
    async fn faults_map_to_kinds_and_never_write() {
        let cases = [
            (json!({ "id": "button--primary", "importPath": "../Button.stories.tsx" }), FaultKind::FileLoad),
            (json!({ "id": "button--primary", "importPath": "Missing.stories.tsx" }), FaultKind::FileLoad),
            (json!({ "id": "button--tertiary", "importPath": "Button.stories.tsx" }), FaultKind::StoryNotFound),
            (json!({ "id": "button", "importPath": "Button.stories.tsx" }), FaultKind::StoryNotFound),
            (
                json!({ "id": "button--primary", "importPath": "Button.stories.tsx", "name": "Primary" }),
                FaultKind::Duplicate,
            ),
            (
                json!({ "id": "button--primary", "importPath": "Button.stories.tsx", "name": "not valid" }),
                FaultKind::Duplicate,
            ),
        ];

        for (request, expected) in cases {
            let store = MemoryStore::with_file("/project/Button.stories.tsx", BUTTON);
            let fault = orchestrator(store.clone()).save(&payload(request.clone())).await.unwrap_err();
            assert_eq!(fault.kind(), expected, "request {request}");
            assert_eq!(store.write_count(), 0, "request {request} must not write");
            assert_eq!(store.contents("/project/Button.stories.tsx"), BUTTON);
        }
    }

    #[tokio::test]
    async fn unparseable_file_is_file_load_fault() {
        let store = MemoryStore::with_file("/project/Broken.stories.tsx", "export const A = {\n");
        let fault = orchestrator(store.clone())
            .save(&payload(json!({ "id": "broken--a", "importPath": "Broken.stories.tsx" })))
            .await
            .unwrap_err();
        assert!(matches!(fault, SaveFault::Parse { .. }));
        assert_eq!(fault.kind(), FaultKind::FileLoad);
    }

    #[tokio::test]
    async fn function_story_is_mutation_fault() {
        let source = "export default { title: 'Button' };\nexport const Primary = () => <Button />;\n";
        let store = MemoryStore::with_file("/project/Button.stories.tsx", source);
        let fault = orchestrator(store.clone())
            .save(&payload(json!({
                "id": "button--primary",
                "importPath": "Button.stories.tsx",
                "args": { "label": "x" }
            })))
            .await
            .unwrap_err();
        assert_eq!(fault.kind(), FaultKind::Mutation);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn ambiguous_story_key_is_rejected() {
        let source = "export default { title: 'Button' };\nexport const primary = {};\nexport const Primary = {};\n";
        let store = MemoryStore::with_file("/project/Button.stories.tsx", source);
        let fault = orchestrator(store.clone())
            .save(&payload(json!({ "id": "button--primary", "importPath": "Button.stories.tsx" })))
            .await
            .unwrap_err();
        assert_eq!(fault.kind(), FaultKind::AmbiguousStory);
    }

    #[tokio::test]
    async fn write_failure_gives_generic_response() {
        let mut store = MemoryStore::with_file("/project/Button.stories.tsx", BUTTON);
        store.fail_writes = true;
        let response = orchestrator(store.clone())
            .handle(&payload(json!({
                "id": "button--primary",
                "importPath": "Button.stories.tsx",
                "args": { "label": "Click" }
            })))
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(SAVE_FAILED_MESSAGE));
        assert_eq!(store.contents("/project/Button.stories.tsx"), BUTTON);
    }

    #[tokio::test]
    async fn serialized_saves_to_one_file_keep_every_story() {
        let store = MemoryStore::with_file("/project/Button.stories.tsx", BUTTON);
        let orchestrator = Arc::new(orchestrator(store.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|index| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    orchestrator
                        .handle(&payload(json!({
                            "id": "button--primary",
                            "importPath": "Button.stories.tsx",
                            "name": format!("Copy{index}"),
                            "args": { "index": index }
                        })))
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().success);
        }

        let contents = store.contents("/project/Button.stories.tsx");
        let file = CsfFile::parse("Button.stories.tsx", &contents).unwrap();
        assert_eq!(file.story_exports().len(), 9);
        assert_eq!(store.write_count(), 8);
    }

    #[test]
    fn serialized_writes_can_be_disabled() {
        let orchestrator =
            SaveOrchestrator::with_store("/project", MemoryStore::default()).with_serialized_writes(false);
        assert!(orchestrator.locks.is_none());
        assert_eq!(orchestrator.root(), Path::new("/project"));
    }
}
