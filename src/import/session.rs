//! Stepwise import driver.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use serde_json::Value;

use crate::config::CodecConfig;
use crate::document::{Document, ExternalEntry};
use crate::error::{CodecResult, EnvelopeError, StructuralError, ValidationError};
use crate::host::Host;
use crate::scene::{SceneInfo, verify_scene};

use super::{Getter, ImportRegistry, ImportReport, Importer, global_getter};

#[derive(Debug, Clone, Default)]
pub struct ImportParameters {
    pub config: CodecConfig,
}

impl ImportParameters {
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }
}

/// Lifecycle of an [`ImportSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    /// Externals may still be resolved.
    ResolvingExternals,
    Importing,
    Finished,
    /// A tree failed to import; the session accepts no further steps.
    Failed,
}

/// An import in progress. Resolve external references with
/// [`set_external`](Self::set_external), then import one tree per
/// [`step`](Self::step).
pub struct ImportSession<'h, H: Host> {
    importer: Importer<'h, H>,
    external: BTreeMap<u64, ExternalEntry>,
    scenes: BTreeMap<u64, SceneInfo>,
    material_name: Option<String>,
    remaining: VecDeque<Value>,
    resolved: BTreeSet<u64>,
    total_steps: usize,
    state: ImportState,
}

impl<'h, H: Host> ImportSession<'h, H> {
    /// Check the document against the running host and prepare its trees.
    pub fn new(
        host: &'h mut H,
        document: Document,
        registry: ImportRegistry<H>,
        parameters: ImportParameters,
    ) -> CodecResult<Self> {
        document.check_version(&host.host_version())?;
        if document.trees.is_empty() {
            return Err(EnvelopeError::NoTrees.into());
        }
        registry.handlers().validate(host.schema())?;

        let Document {
            trees,
            external,
            scenes,
            material_name,
            ..
        } = document;
        let remaining: VecDeque<Value> = trees.into();
        tracing::info!(
            trees = remaining.len(),
            externals = external.len(),
            "import session started"
        );

        Ok(Self {
            importer: Importer::new(host, registry, parameters.config),
            external,
            scenes,
            material_name,
            total_steps: remaining.len(),
            remaining,
            resolved: BTreeSet::new(),
            state: ImportState::ResolvingExternals,
        })
    }

    /// Parse `text`, plain or compressed, and start a session on it.
    pub fn from_text(
        host: &'h mut H,
        text: &str,
        registry: ImportRegistry<H>,
        parameters: ImportParameters,
    ) -> CodecResult<Self> {
        Self::new(host, Document::parse(text)?, registry, parameters)
    }

    pub fn from_file(
        host: &'h mut H,
        path: &Path,
        registry: ImportRegistry<H>,
        parameters: ImportParameters,
    ) -> CodecResult<Self> {
        Self::new(host, Document::read_from_file(path)?, registry, parameters)
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// External references the document makes, by id.
    pub fn externals(&self) -> &BTreeMap<u64, ExternalEntry> {
        &self.external
    }

    /// Settings snapshot a scene reference was exported with.
    pub fn scene_info(&self, scene_id: u64) -> Option<&SceneInfo> {
        self.scenes.get(&scene_id)
    }

    pub fn host(&self) -> &H {
        self.importer.host()
    }

    /// Bind external references to host objects. `None` leaves the
    /// reference empty. Each resolved object must be an instance of the
    /// entry's fixed type and reachable by global name; scenes must also
    /// match the settings they were exported with.
    pub fn set_external<I>(&mut self, resolutions: I) -> CodecResult<()>
    where
        I: IntoIterator<Item = (u64, Option<H::Handle>)>,
    {
        for (external_id, handle) in resolutions {
            let entry = self
                .external
                .get(&external_id)
                .ok_or(EnvelopeError::UnknownExternal { external_id })?;
            if self.resolved.contains(&external_id) {
                return Err(ValidationError::DuplicateExternal { external_id }.into());
            }

            let getter = match handle {
                None => Getter::Null,
                Some(handle) => {
                    let host = self.importer.host();
                    let actual = host.type_name(&handle)?;
                    if !host.schema().is_a(&actual, &entry.fixed_type_name) {
                        return Err(ValidationError::ExternalTypeMismatch {
                            external_id,
                            expected: entry.fixed_type_name.clone(),
                            actual,
                        }
                        .into());
                    }
                    if let Some(scene_id) = entry.scene_id {
                        let info = self.scenes.get(&scene_id).ok_or_else(|| {
                            StructuralError::MalformedField {
                                expected: format!("settings for scene {scene_id}"),
                                path: format!("external {external_id}"),
                            }
                        })?;
                        verify_scene(host, info, &handle).map_err(|source| {
                            ValidationError::ExternalScene {
                                external_id,
                                source,
                            }
                        })?;
                    }
                    global_getter(host, &handle, external_id)?
                }
            };

            tracing::debug!(external_id, %getter, "external resolved");
            self.importer.register_external(external_id, getter)?;
            self.resolved.insert(external_id);
        }
        Ok(())
    }

    /// Close external resolution. Entries without a description default to
    /// empty; any other unresolved entry is an error.
    pub fn start(&mut self) -> CodecResult<()> {
        if self.state != ImportState::ResolvingExternals {
            return Ok(());
        }
        for (&external_id, entry) in &self.external {
            if self.resolved.contains(&external_id) {
                continue;
            }
            match &entry.description {
                None => self.importer.register_external(external_id, Getter::Null)?,
                Some(description) => {
                    return Err(ValidationError::UnresolvedExternal {
                        external_id,
                        description: description.clone(),
                    }
                    .into());
                }
            }
        }
        self.state = ImportState::Importing;
        Ok(())
    }

    /// Import the next tree. Returns whether more trees remain.
    ///
    /// After a tree fails the session is [`ImportState::Failed`] and every
    /// later step returns [`EnvelopeError::ImportFailed`].
    pub fn step(&mut self) -> CodecResult<bool> {
        match self.state {
            ImportState::ResolvingExternals => self.start()?,
            ImportState::Failed => return Err(EnvelopeError::ImportFailed.into()),
            ImportState::Finished => return Ok(false),
            ImportState::Importing => {}
        }
        let Some(tree) = self.remaining.pop_front() else {
            self.state = ImportState::Finished;
            return Ok(false);
        };

        let material = if self.remaining.is_empty() {
            self.material_name.as_deref()
        } else {
            None
        };
        let root = match self.importer.import_tree(&tree, material) {
            Ok(root) => root,
            Err(err) => {
                tracing::warn!(
                    remaining = self.remaining.len(),
                    "tree import failed, abandoning session"
                );
                self.state = ImportState::Failed;
                return Err(err);
            }
        };
        tracing::info!(%root, remaining = self.remaining.len(), "imported tree");

        if self.remaining.is_empty() {
            self.state = ImportState::Finished;
            let report = self.importer.report();
            tracing::info!(
                trees = report.imported_trees,
                nodes = report.imported_nodes,
                links = report.imported_links,
                warnings = report.warnings.len(),
                "import finished"
            );
        }
        Ok(self.state != ImportState::Finished)
    }

    /// Import every remaining tree.
    pub fn run(&mut self) -> CodecResult<&ImportReport> {
        while self.step()? {}
        Ok(self.importer.report())
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Trees imported so far.
    pub fn progress(&self) -> usize {
        let failed = usize::from(self.state == ImportState::Failed);
        self.total_steps - self.remaining.len() - failed
    }

    pub fn report(&self) -> &ImportReport {
        self.importer.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::export::{ExportParameters, ExportSession};
    use crate::handlers::{export_registry, import_registry};
    use crate::import::Phase;
    use crate::mem::{MemHost, sample};

    fn showcase_document() -> Document {
        let (host, _) = sample::showcase().unwrap();
        let mut export = ExportSession::new(
            &host,
            ExportParameters::tree(sample::MAIN_TREE),
            export_registry().unwrap(),
        )
        .unwrap();
        export.run().unwrap();
        export.document().unwrap()
    }

    #[test]
    fn first_step_closes_resolution() {
        let mut target = MemHost::new();
        let mut import = ImportSession::new(
            &mut target,
            showcase_document(),
            import_registry().unwrap(),
            ImportParameters::default(),
        )
        .unwrap();
        assert_eq!(import.state(), ImportState::ResolvingExternals);
        assert_eq!(import.externals().len(), 2);

        assert!(import.step().unwrap());
        assert_eq!(import.state(), ImportState::Importing);
        assert_eq!(import.progress(), 1);

        assert!(!import.step().unwrap());
        assert_eq!(import.state(), ImportState::Finished);
        assert!(!import.step().unwrap());
        assert_eq!(import.progress(), 2);
        assert!(import.report().last_root.is_some());
    }

    #[test]
    fn scene_settings_travel_with_the_document() {
        let document = showcase_document();
        let mut target = MemHost::new();
        let import = ImportSession::new(
            &mut target,
            document,
            import_registry().unwrap(),
            ImportParameters::default(),
        )
        .unwrap();
        let scene_id = import
            .externals()
            .values()
            .find_map(|entry| entry.scene_id)
            .unwrap();
        let info = import.scene_info(scene_id).unwrap();
        assert_eq!(info.engine, "CYCLES");
        let layers: Vec<&str> = info.view_layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(layers, ["ViewLayer", "Shadows"]);
    }

    /// Point every zone input in `value` at `output`.
    fn repair_zones(value: &mut Value, output: &str) {
        match value {
            Value::Object(map) => {
                for (key, field) in map.iter_mut() {
                    if key == crate::vocab::PAIRED_OUTPUT && field.is_string() {
                        *field = Value::from(output);
                    } else {
                        repair_zones(field, output);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| repair_zones(item, output)),
            _ => {}
        }
    }

    #[test]
    fn a_failed_tree_ends_the_session() {
        let mut document = showcase_document();
        if let Some(main) = document.trees.last_mut() {
            repair_zones(main, "Missing");
        }
        let mut target = MemHost::new();
        let mut import = ImportSession::new(
            &mut target,
            document,
            import_registry().unwrap(),
            ImportParameters::default(),
        )
        .unwrap();

        assert!(import.step().unwrap());
        let err = import.step().unwrap_err();
        match err {
            CodecError::Structural(StructuralError::BrokenPairing { partner, path }) => {
                assert_eq!(partner, "Missing");
                assert!(path.contains(sample::MAIN_TREE), "{path}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(import.state(), ImportState::Failed);
        assert_eq!(import.progress(), 1);
        for phase in [Phase::StructuralPairing, Phase::LateFlag, Phase::EnumDefault] {
            assert_eq!(import.importer.pending(phase), 0);
        }

        assert!(matches!(
            import.step(),
            Err(CodecError::Envelope(EnvelopeError::ImportFailed))
        ));
        assert!(matches!(
            import.run(),
            Err(CodecError::Envelope(EnvelopeError::ImportFailed))
        ));
    }

    #[test]
    fn documents_without_trees_are_refused() {
        let mut document = showcase_document();
        document.trees.clear();
        let mut target = MemHost::new();
        let err = ImportSession::new(
            &mut target,
            document,
            import_registry().unwrap(),
            ImportParameters::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, CodecError::Envelope(EnvelopeError::NoTrees)));
    }
}
