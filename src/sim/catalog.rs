/// Level catalog: the `<index>.level.json` files of the data directory.
///
/// Files whose base name is not a number are skipped, as are files that
/// fail to parse. Entries sort by `(index, name)`.

use std::path::{Path, PathBuf};

use crate::sim::level::read_level_name;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelInfo {
    pub index: u32,
    pub name: String,
    pub path: PathBuf,
}

pub fn scan(data_dir: &Path) -> Vec<LevelInfo> {
    let entries = match std::fs::read_dir(data_dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("Could not list levels in {}: {}", data_dir.display(), e);
            return vec![];
        }
    };

    let mut levels: Vec<LevelInfo> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|path| {
            let file_name = path.file_name()?.to_str()?;
            let index: u32 = file_name.strip_suffix(".level.json")?.parse().ok()?;
            match read_level_name(&path) {
                Ok(name) => Some(LevelInfo { index, name, path }),
                Err(e) => {
                    tracing::warn!("Skipping level {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect();

    levels.sort_by(|a, b| (a.index, &a.name).cmp(&(b.index, &b.name)));
    levels
}

/// Next catalog index after `current`, wrapping to the first.
pub fn next_index(levels: &[LevelInfo], current: u32) -> Option<u32> {
    levels.iter()
        .map(|l| l.index)
        .find(|&i| i > current)
        .or_else(|| levels.first().map(|l| l.index))
}

/// Previous catalog index before `current`, wrapping to the last.
pub fn previous_index(levels: &[LevelInfo], current: u32) -> Option<u32> {
    levels.iter()
        .rev()
        .map(|l| l.index)
        .find(|&i| i < current)
        .or_else(|| levels.last().map(|l| l.index))
}
