//! Load `.locflow.toml` from a directory (CLI only). Library callers pass a `SessionConfig` directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::IngestOpts;

use super::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LocflowToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    db_path: Option<String>,
    batch_size: Option<usize>,
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    chunk_size: Option<usize>,
    verbose: Option<bool>,
}

/// Parse settings text. Unknown keys are ignored.
pub(crate) fn parse_locflow_toml(text: &str) -> Result<LocflowToml, toml::de::Error> {
    toml::from_str(text)
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub(crate) fn load_locflow_toml(dir: &Path) -> Option<LocflowToml> {
    let path = dir.join(PackagePaths::get().toml_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_locflow_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $file_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $section.$file_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &LocflowToml, opts: &mut IngestOpts) {
    let s = &file.settings;
    if let Some(ref p) = s.db_path {
        opts.db_path = PathBuf::from(p);
    }
    apply_file_opt!(s, opts, batch_size => session.batch_size);
    apply_file_opt!(s, opts, workers => session.worker_count);
    apply_file_opt!(s, opts, queue_capacity => session.queue_capacity);
    apply_file_opt!(s, opts, chunk_size => chunk_size);
    apply_file_opt!(s, opts, verbose => verbose);
}
