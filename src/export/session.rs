//! Stepwise export driver.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use crate::config::CodecConfig;
use crate::document::{Document, ExternalEntry, FORMAT_VERSION};
use crate::error::{CodecResult, EnvelopeError, StructuralError};
use crate::host::{GlobalKey, Host};
use crate::path::PathTrail;
use crate::scene::SceneInfo;
use crate::vocab;

use super::{ExportRegistry, ExportReport, Exporter, External, Pointer, SerializedNode};

/// Which object the export starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSelector {
    /// A node group, by name.
    Tree(String),
    /// The embedded tree of a material, by material name.
    Material(String),
}

#[derive(Debug, Clone)]
pub struct ExportParameters {
    pub root: RootSelector,
    pub config: CodecConfig,
}

impl ExportParameters {
    pub fn tree(name: impl Into<String>) -> Self {
        Self {
            root: RootSelector::Tree(name.into()),
            config: CodecConfig::default(),
        }
    }

    pub fn material(name: impl Into<String>) -> Self {
        Self {
            root: RootSelector::Material(name.into()),
            config: CodecConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }
}

/// Lifecycle of an [`ExportSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    TraversingRoots,
    PartitioningExternals,
    Finalized,
}

/// An export in progress: one tree per [`step`](Self::step), then one final
/// step that resolves pointers into ids and external references.
pub struct ExportSession<'h, H: Host> {
    exporter: Exporter<'h, H>,
    pending: VecDeque<(H::Handle, PathTrail)>,
    trees: Vec<SerializedNode>,
    externals: BTreeMap<u64, External>,
    scenes: BTreeMap<u64, SceneInfo>,
    material_name: Option<String>,
    total_steps: usize,
    state: ExportState,
}

impl<'h, H: Host> ExportSession<'h, H> {
    /// Locate the root, collect the trees to export and validate `registry`
    /// against the host schema.
    pub fn new(
        host: &'h H,
        parameters: ExportParameters,
        registry: ExportRegistry<H>,
    ) -> CodecResult<Self> {
        registry.handlers().validate(host.schema())?;

        let (root, path, material_name) = match &parameters.root {
            RootSelector::Tree(name) => {
                let key = GlobalKey::new(vocab::NODE_GROUPS, name.as_str());
                let tree = host
                    .lookup_global(&key)
                    .ok_or_else(|| StructuralError::RootNotFound { key: key.to_string() })?;
                (tree, PathTrail::root(format!("Tree ({name})")), None)
            }
            RootSelector::Material(name) => {
                let key = GlobalKey::new(vocab::MATERIALS, name.as_str());
                let material = host
                    .lookup_global(&key)
                    .ok_or_else(|| StructuralError::RootNotFound { key: key.to_string() })?;
                let tree = host
                    .get_pointer(&material, vocab::NODE_TREE_PROP)?
                    .ok_or_else(|| StructuralError::RootNotFound {
                        key: format!("{key}.{}", vocab::NODE_TREE_PROP),
                    })?;
                (
                    tree,
                    PathTrail::root(format!("Material ({name})")),
                    Some(name.clone()),
                )
            }
        };

        let pending: VecDeque<_> = if parameters.config.export_sub_trees {
            collect_trees(host, &root, path)?.into()
        } else {
            VecDeque::from([(root, path)])
        };
        let total_steps = pending.len() + 1;
        tracing::info!(trees = pending.len(), "export session started");

        Ok(Self {
            exporter: Exporter::new(host, registry, parameters.config),
            pending,
            trees: Vec::new(),
            externals: BTreeMap::new(),
            scenes: BTreeMap::new(),
            material_name,
            total_steps,
            state: ExportState::TraversingRoots,
        })
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Advance by one step. Returns whether more steps remain.
    pub fn step(&mut self) -> CodecResult<bool> {
        match self.state {
            ExportState::TraversingRoots => {
                if let Some((tree, path)) = self.pending.pop_front() {
                    tracing::info!(%path, "exporting tree");
                    let node = self.exporter.export_tree(&tree, &path)?;
                    self.trees.push(node);
                }
                if self.pending.is_empty() {
                    self.state = ExportState::PartitioningExternals;
                }
                Ok(true)
            }
            ExportState::PartitioningExternals => {
                let (externals, scenes) = self.exporter.finalize()?;
                self.externals = externals;
                self.scenes = scenes;
                self.state = ExportState::Finalized;
                let report = self.exporter.report();
                tracing::info!(
                    trees = report.exported_trees,
                    nodes = report.exported_nodes,
                    links = report.exported_links,
                    externals = self.externals.len(),
                    warnings = report.warnings.len(),
                    "export finished"
                );
                Ok(false)
            }
            ExportState::Finalized => Ok(false),
        }
    }

    /// Run every remaining step.
    pub fn run(&mut self) -> CodecResult<()> {
        while self.step()? {}
        Ok(())
    }

    /// Number of trees plus the final resolution step.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Steps completed so far.
    pub fn progress(&self) -> usize {
        let finalized = usize::from(self.state == ExportState::Finalized);
        self.total_steps - 1 - self.pending.len() + finalized
    }

    pub fn report(&self) -> &ExportReport {
        self.exporter.report()
    }

    /// External references, available once the session is finalized.
    pub fn externals(&self) -> &BTreeMap<u64, External> {
        &self.externals
    }

    /// The pointer an external reference was created for.
    pub fn pointer(&self, external: &External) -> Option<&Pointer<H::Handle>> {
        self.exporter.pointers().get(external.pointer)
    }

    /// Attach descriptions to external references, shown to whoever
    /// resolves them on import.
    pub fn set_descriptions<I, S>(&mut self, descriptions: I) -> CodecResult<()>
    where
        I: IntoIterator<Item = (u64, S)>,
        S: Into<String>,
    {
        for (external_id, description) in descriptions {
            let external = self
                .externals
                .get_mut(&external_id)
                .ok_or(EnvelopeError::UnknownExternal { external_id })?;
            external.description = Some(description.into());
        }
        Ok(())
    }

    /// Build the document. Fails until the session is finalized.
    pub fn document(&self) -> CodecResult<Document> {
        if self.state != ExportState::Finalized {
            return Err(EnvelopeError::ExportNotFinished.into());
        }
        let pointers = self.exporter.pointers();
        Ok(Document {
            host_version: self.exporter.host().host_version(),
            format_version: FORMAT_VERSION.to_string(),
            material_name: self.material_name.clone(),
            trees: self
                .trees
                .iter()
                .map(|tree| tree.to_json(pointers))
                .collect::<CodecResult<_>>()?,
            external: self
                .externals
                .iter()
                .map(|(id, e)| {
                    (
                        *id,
                        ExternalEntry {
                            description: e.description.clone(),
                            fixed_type_name: e.fixed_type_name.clone(),
                            scene_id: e.scene_id,
                        },
                    )
                })
                .collect(),
            scenes: self.scenes.clone(),
        })
    }

    /// The document as text, in the configured form.
    pub fn export_to_string(&self) -> CodecResult<String> {
        let config = self.exporter.config();
        let document = self.document()?;
        Ok(if config.compress {
            document.to_compressed()?
        } else {
            document.to_json(config.json_indent)?
        })
    }

    pub fn export_to_file(&self, path: &Path) -> CodecResult<()> {
        let config = self.exporter.config();
        self.document()?
            .write_to_file(path, config.compress, config.json_indent)?;
        Ok(())
    }
}

/// Post-order list of `root` and every tree it uses through group nodes,
/// each tree once. Sub-trees precede the trees that use them.
fn collect_trees<H: Host>(
    host: &H,
    root: &H::Handle,
    path: PathTrail,
) -> CodecResult<Vec<(H::Handle, PathTrail)>> {
    let mut done = Vec::new();
    let mut visiting = Vec::new();
    visit_tree(host, root, path, &mut done, &mut visiting)?;
    Ok(done
        .into_iter()
        .map(|(tree, _, path)| (tree, path))
        .collect())
}

type Collected<Hd> = Vec<(Hd, String, PathTrail)>;

fn visit_tree<H: Host>(
    host: &H,
    tree: &H::Handle,
    path: PathTrail,
    done: &mut Collected<H::Handle>,
    visiting: &mut Vec<String>,
) -> CodecResult<()> {
    let name = host.display_name(tree)?;
    if visiting.contains(&name) || done.iter().any(|(_, n, _)| *n == name) {
        return Err(StructuralError::DuplicateRootTree {
            name,
            path: path.to_string(),
        }
        .into());
    }
    visiting.push(name.clone());

    let nodes = host.get_collection(tree, vocab::NODES_PROP)?;
    for i in 0..host.collection_len(&nodes)? {
        let node = host.element(&nodes, i)?;
        if !host.has_property(&node, vocab::NODE_TREE_PROP)? {
            continue;
        }
        let Some(sub_tree) = host.get_pointer(&node, vocab::NODE_TREE_PROP)? else {
            continue;
        };
        let sub_name = host.display_name(&sub_tree)?;
        if done.iter().any(|(_, n, _)| *n == sub_name) {
            continue;
        }
        let node_name = host.display_name(&node)?;
        let sub_path = path.add(format!("Group ({node_name}, {sub_name})"));
        tracing::debug!(path = %sub_path, "found sub-tree");
        visit_tree(host, &sub_tree, sub_path, done, visiting)?;
    }

    visiting.pop();
    done.push((tree.clone(), name, path));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::handlers::export_registry;
    use crate::mem::{MemHost, sample};

    fn session(host: &MemHost) -> ExportSession<'_, MemHost> {
        ExportSession::new(
            host,
            ExportParameters::tree(sample::MAIN_TREE),
            export_registry().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn one_step_per_tree_then_resolution() {
        let (host, _) = sample::showcase().unwrap();
        let mut export = session(&host);
        assert_eq!(export.total_steps(), 3);
        assert_eq!(export.progress(), 0);
        assert!(matches!(
            export.document(),
            Err(CodecError::Envelope(EnvelopeError::ExportNotFinished))
        ));

        assert!(export.step().unwrap());
        assert_eq!(export.progress(), 1);
        assert_eq!(export.state(), ExportState::TraversingRoots);
        assert!(export.step().unwrap());
        assert_eq!(export.state(), ExportState::PartitioningExternals);
        assert!(export.externals().is_empty());

        assert!(!export.step().unwrap());
        assert_eq!(export.state(), ExportState::Finalized);
        assert_eq!(export.progress(), 3);
        assert_eq!(export.externals().len(), 2);
        assert!(!export.step().unwrap());
    }

    #[test]
    fn shared_sub_trees_come_first_and_once() {
        let (mut host, main) = sample::showcase().unwrap();
        let sub = host
            .lookup_global(&GlobalKey::new(vocab::NODE_GROUPS, sample::SUB_TREE))
            .unwrap();
        let second = host.add_node(&main, vocab::GROUP_NODE).unwrap();
        host.set_pointer(&second, vocab::NODE_TREE_PROP, Some(&sub))
            .unwrap();

        let mut export = session(&host);
        assert_eq!(export.total_steps(), 3);
        export.run().unwrap();
        let document = export.document().unwrap();
        let names: Vec<&str> = document
            .trees
            .iter()
            .map(|tree| tree["data"][vocab::NAME].as_str().unwrap())
            .collect();
        assert_eq!(names, [sample::SUB_TREE, sample::MAIN_TREE]);
    }

    #[test]
    fn descriptions_need_a_known_external() {
        let (host, _) = sample::showcase().unwrap();
        let mut export = session(&host);
        export.run().unwrap();
        let err = export.set_descriptions(vec![(999_u64, "nothing")]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Envelope(EnvelopeError::UnknownExternal { external_id: 999 })
        ));
    }

    #[test]
    fn group_cycles_are_refused() {
        let (mut host, main) = sample::showcase().unwrap();
        let sub = host
            .lookup_global(&GlobalKey::new(vocab::NODE_GROUPS, sample::SUB_TREE))
            .unwrap();
        let back = host.add_node(&sub, vocab::GROUP_NODE).unwrap();
        host.set_pointer(&back, vocab::NODE_TREE_PROP, Some(&main))
            .unwrap();

        let err = ExportSession::new(
            &host,
            ExportParameters::tree(sample::MAIN_TREE),
            export_registry().unwrap(),
        )
        .err()
        .unwrap();
        match err {
            CodecError::Structural(StructuralError::DuplicateRootTree { name, path }) => {
                assert_eq!(name, sample::MAIN_TREE);
                assert!(path.contains(sample::SUB_TREE), "{path}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_root_is_reported() {
        let host = MemHost::new();
        let err = ExportSession::new(
            &host,
            ExportParameters::tree("Nowhere"),
            export_registry().unwrap(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            CodecError::Structural(StructuralError::RootNotFound { .. })
        ));
    }
}
