//! Finding the spec document for a command name.

use std::path::{Path, PathBuf};

use crate::error::SpecError;
use crate::spec::SpecTree;

pub const SPEC_SUFFIX: &str = ".cmd.yaml";

/// Specs compiled into the binary, consulted last.
const BUNDLED: &[(&str, &str)] = &[
    ("docker", include_str!("../commands/docker.cmd.yaml")),
    ("git", include_str!("../commands/git.cmd.yaml")),
];

/// Where a spec came from, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Bundled(&'static str),
}

/// Load the spec for `name`, which may be a path to a document, the name of a
/// document in `commands_dir`, or the name of a bundled spec.
pub fn resolve(name: &str, commands_dir: &Path) -> Result<(SpecTree, Source), SpecError> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Ok((SpecTree::load_file(direct)?, Source::File(direct.to_path_buf())));
    }

    let in_dir = commands_dir.join(format!("{name}{SPEC_SUFFIX}"));
    if in_dir.is_file() {
        return Ok((SpecTree::load_file(&in_dir)?, Source::File(in_dir)));
    }
    log::debug!("no `{}`, trying bundled specs", in_dir.display());

    match BUNDLED.iter().find(|(bundled, _)| *bundled == name) {
        Some((bundled, document)) => Ok((SpecTree::load(document)?, Source::Bundled(bundled))),
        None => Err(SpecError::NotFound(name.to_string())),
    }
}

pub fn bundled_names() -> impl Iterator<Item = &'static str> {
    BUNDLED.iter().map(|(name, _)| *name)
}
