use std::fs;
use std::path::{Path, PathBuf};

use crate::encode::tile::EncodedTile;
use crate::foundation::error::{GridError, GridResult};
use crate::package::sink::{
    SinkConfig, TILE_EXTENSION, TileSink, profile_cell_key, tile_file_name,
};
use crate::profile::table::DeviceProfile;
use crate::workspace::Workspace;

/// Name of the index written next to the tiles.
pub const MANIFEST_FILE: &str = "tiles.json";

/// Options for [`DirTileSink`].
#[derive(Clone, Debug)]
pub struct DirTileSinkOpts {
    /// Directory receiving the finished tiles (created if missing).
    pub out_dir: PathBuf,
    /// Replace existing tile files in `out_dir`.
    pub overwrite: bool,
    /// Where the per-delivery staging workspace is created.
    pub workspace_root: PathBuf,
}

impl DirTileSinkOpts {
    /// Stage under the system temporary directory.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            overwrite: false,
            workspace_root: std::env::temp_dir(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct Manifest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hardware_model: Option<&'a str>,
    rows: u32,
    cols: u32,
    tile_width: u32,
    tile_height: u32,
    tiles: &'a [ManifestTile],
}

#[derive(Debug, serde::Serialize)]
struct ManifestTile {
    row: u32,
    col: u32,
    file: String,
    cell: String,
}

/// Writes tiles into a directory, all-or-nothing.
///
/// Tiles are first written into a private [`Workspace`]; only `end` moves them into `out_dir`
/// together with [`MANIFEST_FILE`]. If any file cannot be placed, `end` removes what it already
/// published and restores the files it displaced, so `out_dir` is left as it was. `abort`, or
/// dropping the sink before `end`, removes the workspace and leaves `out_dir` untouched.
#[derive(Debug)]
pub struct DirTileSink {
    opts: DirTileSinkOpts,
    cfg: Option<SinkConfig>,
    workspace: Option<Workspace>,
    staged: Vec<ManifestTile>,
}

impl DirTileSink {
    /// Create a sink; nothing touches the filesystem until `begin`.
    pub fn new(opts: DirTileSinkOpts) -> Self {
        Self {
            opts,
            cfg: None,
            workspace: None,
            staged: Vec::new(),
        }
    }

    /// Final paths of the delivered tiles, in row-major order.
    pub fn delivered_paths(&self) -> Vec<PathBuf> {
        self.staged
            .iter()
            .map(|t| self.opts.out_dir.join(&t.file))
            .collect()
    }

    /// Fail with [`GridError::Config`] if delivering `profile`'s tiles would replace existing
    /// files without `overwrite`. `begin` runs the same check; callers can run it before paying
    /// for slicing.
    pub fn check_targets(&self, profile: &DeviceProfile) -> GridResult<()> {
        if self.opts.overwrite {
            return Ok(());
        }
        let p = profile;
        let names = (0..p.rows)
            .flat_map(|r| (0..p.cols).map(move |c| tile_file_name(r, c, TILE_EXTENSION)))
            .chain(std::iter::once(MANIFEST_FILE.to_string()));
        for name in names {
            let target = self.opts.out_dir.join(&name);
            if target.exists() {
                return Err(GridError::config(format!(
                    "'{}' already exists (pass overwrite to replace it)",
                    target.display()
                )));
            }
        }
        Ok(())
    }

    fn workspace(&self) -> GridResult<&Workspace> {
        self.workspace
            .as_ref()
            .ok_or_else(|| GridError::invariant("tile pushed before begin"))
    }
}

impl TileSink for DirTileSink {
    fn begin(&mut self, cfg: SinkConfig) -> GridResult<()> {
        self.check_targets(&cfg.profile)?;
        self.workspace = Some(Workspace::create(&self.opts.workspace_root)?);
        self.staged.clear();
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_tile(&mut self, tile: &EncodedTile) -> GridResult<()> {
        let file = tile_file_name(tile.row, tile.col, TILE_EXTENSION);
        let staged = self.workspace()?.path().join(&file);
        fs::write(&staged, &tile.bytes)
            .map_err(|e| GridError::resource(format!("stage {file}: {e}")))?;
        self.staged.push(ManifestTile {
            row: tile.row,
            col: tile.col,
            file,
            cell: profile_cell_key(tile.row, tile.col),
        });
        Ok(())
    }

    fn end(&mut self) -> GridResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| GridError::invariant("end called before begin"))?;
        let staging = self.workspace()?;

        let p = &cfg.profile;
        let manifest = Manifest {
            model: &p.name,
            hardware_model: p.hardware_model.as_deref(),
            rows: p.rows,
            cols: p.cols,
            tile_width: p.tile_width,
            tile_height: p.tile_height,
            tiles: &self.staged,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| GridError::invariant(format!("serialize tile manifest: {e}")))?;
        fs::write(staging.path().join(MANIFEST_FILE), json)
            .map_err(|e| GridError::resource(format!("stage {MANIFEST_FILE}: {e}")))?;

        fs::create_dir_all(&self.opts.out_dir).map_err(|e| {
            GridError::resource(format!(
                "create output dir '{}': {e}",
                self.opts.out_dir.display()
            ))
        })?;

        // manifest goes last so a present tiles.json always describes a complete set
        let names = self
            .staged
            .iter()
            .map(|t| t.file.as_str())
            .chain(std::iter::once(MANIFEST_FILE))
            .collect::<Vec<_>>();

        // same filesystem as the targets, so every final move is a plain rename
        let txn = Workspace::create(&self.opts.out_dir)?;
        let incoming = txn.path().join("new");
        let replaced = txn.path().join("old");
        for dir in [&incoming, &replaced] {
            fs::create_dir(dir)
                .map_err(|e| GridError::resource(format!("prepare publish: {e}")))?;
        }
        for name in &names {
            move_file(&staging.path().join(name), &incoming.join(name))?;
        }

        let mut log = PublishLog::default();
        if let Err(e) = publish_all(&names, &incoming, &replaced, &self.opts.out_dir, &mut log) {
            log.roll_back();
            return Err(e);
        }

        let published = names.len();
        close_quietly(txn);
        if let Some(ws) = self.workspace.take() {
            close_quietly(ws);
        }
        tracing::info!(
            out_dir = %self.opts.out_dir.display(),
            tiles = published - 1,
            "delivered tiles"
        );
        Ok(())
    }

    fn abort(&mut self) {
        self.workspace = None;
        self.staged.clear();
    }
}

/// Files moved into the output directory so far, and the files they displaced.
#[derive(Default)]
struct PublishLog {
    published: Vec<PathBuf>,
    backups: Vec<(PathBuf, PathBuf)>,
}

impl PublishLog {
    /// Undo every publish, newest first, then put displaced files back.
    fn roll_back(self) {
        for target in self.published.iter().rev() {
            let _ = fs::remove_file(target);
        }
        for (backup, target) in self.backups.iter().rev() {
            let _ = fs::rename(backup, target);
        }
        tracing::warn!(
            removed = self.published.len(),
            restored = self.backups.len(),
            "rolled back partial tile delivery"
        );
    }
}

fn publish_all(
    names: &[&str],
    incoming: &Path,
    replaced: &Path,
    out_dir: &Path,
    log: &mut PublishLog,
) -> GridResult<()> {
    for name in names {
        let target = out_dir.join(name);
        // directories are never displaced; the rename below fails on them instead
        if fs::symlink_metadata(&target).is_ok_and(|m| !m.is_dir()) {
            let backup = replaced.join(name);
            fs::rename(&target, &backup).map_err(|e| {
                GridError::resource(format!("set aside '{}': {e}", target.display()))
            })?;
            log.backups.push((backup, target.clone()));
        }
        fs::rename(incoming.join(name), &target)
            .map_err(|e| GridError::resource(format!("publish '{}': {e}", target.display())))?;
        log.published.push(target);
    }
    Ok(())
}

/// Move a file, falling back to copy when the rename crosses filesystems.
fn move_file(from: &Path, to: &Path) -> GridResult<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    let name = to.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    fs::copy(from, to).map_err(|e| GridError::resource(format!("prepare {name}: {e}")))?;
    Ok(())
}

fn close_quietly(ws: Workspace) {
    let id = ws.id().to_string();
    if let Err(e) = ws.close() {
        tracing::warn!(%id, error = %e, "workspace cleanup failed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/package/dir.rs"]
mod tests;
