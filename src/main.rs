//! graphclip CLI: inspect, convert and check exported documents.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use graphclip::config::CodecConfig;
use graphclip::document::{Document, FORMAT_VERSION};
use graphclip::export::{ExportParameters, ExportSession};
use graphclip::handlers::{export_registry, import_registry};
use graphclip::import::{ImportParameters, ImportSession};
use graphclip::mem::{MemHost, sample};

#[derive(Parser)]
#[command(name = "graphclip", version, about = "Reflective subgraph codec")]
struct Cli {
    /// TOML file with codec settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a document: versions, trees and external references.
    Inspect {
        /// Document to read, plain or compressed.
        file: PathBuf,
    },

    /// Rewrite a document as plain JSON or in compressed form.
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Write the compressed form.
        #[arg(long)]
        compress: bool,

        /// JSON indentation; defaults to the configured one.
        #[arg(long)]
        indent: Option<usize>,
    },

    /// Check whether a host running `host_version` could import a document.
    Check {
        file: PathBuf,

        #[arg(long)]
        host_version: String,
    },

    /// Build the sample graph in the reference host, export it and import it
    /// into a fresh host.
    Demo {
        /// Also write the exported document here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CodecConfig::load(path)?,
        None => CodecConfig::default(),
    };

    match cli.command {
        Commands::Inspect { file } => inspect(&file),
        Commands::Convert {
            input,
            output,
            compress,
            indent,
        } => {
            let document = Document::read_from_file(&input)?;
            let indent = indent.unwrap_or(config.json_indent);
            document.write_to_file(&output, compress, indent)?;
            println!(
                "Wrote {} ({})",
                output.display(),
                if compress { "compressed" } else { "plain JSON" }
            );
            Ok(())
        }
        Commands::Check { file, host_version } => {
            let document = Document::read_from_file(&file)?;
            document.check_version(&host_version)?;
            println!(
                "{} can be imported by host {host_version} (format {FORMAT_VERSION})",
                file.display()
            );
            Ok(())
        }
        Commands::Demo { out } => demo(config, out.as_deref()),
    }
}

fn inspect(file: &Path) -> Result<()> {
    let document = Document::read_from_file(file)?;
    println!("Document: {}", file.display());
    println!("  host version:   {}", document.host_version);
    println!("  format version: {}", document.format_version);
    if let Some(material) = &document.material_name {
        println!("  material:       {material}");
    }

    println!("Trees ({}):", document.trees.len());
    for tree in &document.trees {
        let data = tree.get("data");
        let field = |key: &str| {
            data.and_then(|d| d.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or("?")
                .to_string()
        };
        let nodes = data
            .and_then(|d| d.get("nodes"))
            .and_then(|n| n.get("data"))
            .and_then(|d| d.get("items"))
            .and_then(|i| i.as_array())
            .map_or(0, Vec::len);
        println!("  {:<24} {:<20} {nodes} nodes", field("name"), field("idname"));
    }

    if document.external.is_empty() {
        println!("No external references.");
    } else {
        println!("External references ({}):", document.external.len());
        for (id, entry) in &document.external {
            let scene = entry
                .scene_id
                .map(|s| format!(" scene #{s}"))
                .unwrap_or_default();
            println!(
                "  #{id:<5} {:<16} {}{scene}",
                entry.fixed_type_name,
                entry.description.as_deref().unwrap_or("(optional)")
            );
        }
    }
    for (id, scene) in &document.scenes {
        println!(
            "Scene #{id}: engine {}, {} view layers",
            scene.engine,
            scene.view_layers.len()
        );
    }
    Ok(())
}

fn demo(config: CodecConfig, out: Option<&Path>) -> Result<()> {
    let (host, _) = sample::showcase()?;

    let parameters = ExportParameters::tree(sample::MAIN_TREE).with_config(config.clone());
    let mut export = ExportSession::new(&host, parameters, export_registry()?)?;
    export.run()?;
    let report = export.report();
    println!(
        "Exported {} trees, {} nodes, {} links, {} externals",
        report.exported_trees,
        report.exported_nodes,
        report.exported_links,
        export.externals().len()
    );
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }

    let text = export.export_to_string()?;
    if let Some(path) = out {
        std::fs::write(path, &text).into_diagnostic()?;
        println!("Wrote {}", path.display());
    }

    let mut target = MemHost::new();
    let mut import = ImportSession::from_text(
        &mut target,
        &text,
        import_registry()?,
        ImportParameters::with_config(config),
    )?;
    let report = import.run()?;
    println!(
        "Imported {} trees, {} nodes, {} links",
        report.imported_trees, report.imported_nodes, report.imported_links
    );
    for (original, created) in &report.renamed {
        println!("  renamed: {original} -> {created}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}
