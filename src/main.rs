//! `boxview-dump`: builds and lays out a document described in JSON and
//! prints the resulting box tree.
//!
//! ```text
//! boxview-dump <doc.json> [--width=N] [--settings=PATH] [--exact] [--log-dir=PATH]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use serde::Deserialize;

use boxview::data::memory::ObjectRecord;
use boxview::data::{MemoryStore, ObjectHandle};
use boxview::settings::resolve_settings;
use boxview::text::{MemoryRegistry, Segmenter};
use boxview::view::{DeclarativeConstructor, Frag, RootBox, ViewSpec};

const DEFAULT_WIDTH: i32 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
struct DumpArgs {
    doc: PathBuf,
    width: i32,
    settings: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    /// Materialize every lazy box before printing.
    exact: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<DumpArgs, String> {
    let mut doc = None;
    let mut width = DEFAULT_WIDTH;
    let mut settings = None;
    let mut log_dir = None;
    let mut exact = false;

    for arg in args {
        if let Some(value) = arg.strip_prefix("--width=") {
            width = value
                .parse()
                .map_err(|_| format!("invalid width: {value}"))?;
        } else if let Some(value) = arg.strip_prefix("--settings=") {
            settings = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--log-dir=") {
            log_dir = Some(PathBuf::from(value));
        } else if arg == "--exact" {
            exact = true;
        } else if arg.starts_with("--") {
            return Err(format!("unknown option: {arg}"));
        } else if doc.is_none() {
            doc = Some(PathBuf::from(arg));
        } else {
            return Err(format!("unexpected argument: {arg}"));
        }
    }

    Ok(DumpArgs {
        doc: doc.ok_or("missing document path")?,
        width,
        settings,
        log_dir,
        exact,
    })
}

/// The document file: objects, the view over them and where to start.
#[derive(Debug, Deserialize)]
struct DocFile {
    root: u64,
    #[serde(default)]
    frag: u32,
    #[serde(default)]
    objects: Vec<ObjectRecord>,
    #[serde(default)]
    view: ViewSpec,
}

fn dump(args: &DumpArgs) -> Result<String, Box<dyn std::error::Error>> {
    let settings = resolve_settings(args.settings.as_deref())?;
    let doc: DocFile = serde_json::from_str(&std::fs::read_to_string(&args.doc)?)?;

    let mut view = RootBox::new(
        MemoryStore::from_records(doc.objects),
        DeclarativeConstructor::new(doc.view),
        ObjectHandle(doc.root),
        Frag(doc.frag),
        Segmenter::new(MemoryRegistry::with_defaults()),
        settings,
    )?;
    view.layout(args.width)?;
    if args.exact {
        view.exact_height()?;
    }
    let size = view.estimated_size();
    tracing::info!(
        doc = %args.doc.display(),
        width = args.width,
        height = size.height,
        boxes = view.tree().len(),
        "document laid out"
    );
    Ok(view.tree().dump())
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("boxview-dump: {e}");
            eprintln!(
                "usage: boxview-dump <doc.json> [--width=N] [--settings=PATH] [--exact] [--log-dir=PATH]"
            );
            return ExitCode::from(2);
        }
    };
    let _logging = boxview::logging::init(args.log_dir.as_deref());

    match dump(&args) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "dump failed");
            eprintln!("boxview-dump: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/dump_args.rs"]
mod tests;
