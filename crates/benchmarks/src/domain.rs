//! Task domain inference for evaluation-harness results.
//!
//! The harness lays results out as
//! `<result_dir>/<action_space>/<observation_type>/<model>/<domain>/<task_id>/result.txt`,
//! but the prefix depth varies with configuration. The domain is found by
//! matching path components against the known domain names; when nothing
//! matches, the grandparent of the score file is used, then its parent.
//! The fallback is a heuristic, not a guarantee.

use std::path::{Component, Path};

/// Domains shipped with the evaluation harness.
pub const KNOWN_DOMAINS: &[&str] = &[
    "chrome",
    "gimp",
    "libreoffice_calc",
    "libreoffice_impress",
    "libreoffice_writer",
    "multi_apps",
    "os",
    "thunderbird",
    "vlc",
    "vs_code",
];

/// Label used when no directory is available at all.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Infer the domain label of `score_file`, relative to `root`.
pub fn infer_domain(root: &Path, score_file: &Path) -> String {
    let relative = score_file.strip_prefix(root).unwrap_or(score_file);
    let dirs: Vec<&str> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(name) => name.to_str(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    // Deepest match wins.
    if let Some(known) = dirs.iter().rev().find(|d| KNOWN_DOMAINS.contains(*d)) {
        return (*known).to_string();
    }

    match dirs.as_slice() {
        [] => UNKNOWN_DOMAIN.to_string(),
        [parent] => (*parent).to_string(),
        [.., grandparent, _task] => (*grandparent).to_string(),
    }
}
