use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;

use crate::foundation::core::CanvasSize;
use crate::foundation::error::{GridError, GridResult};

/// Canvas size and button-grid geometry of one controller model.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceProfile {
    /// Lookup key, lowercase.
    pub name: String,
    /// Required canvas width in pixels.
    pub canvas_width: u32,
    /// Required canvas height in pixels.
    pub canvas_height: u32,
    /// Button rows.
    pub rows: u32,
    /// Button columns.
    pub cols: u32,
    /// Width of one button image.
    pub tile_width: u32,
    /// Height of one button image.
    pub tile_height: u32,
    /// Alternative lookup keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Vendor hardware model code, for packagers that build device profiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_model: Option<String>,
}

impl DeviceProfile {
    fn builtin(
        name: &str,
        canvas: (u32, u32),
        grid: (u32, u32),
        hardware_model: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            canvas_width: canvas.0,
            canvas_height: canvas.1,
            rows: grid.0,
            cols: grid.1,
            tile_width: 96,
            tile_height: 96,
            aliases: Vec::new(),
            hardware_model: Some(hardware_model.to_string()),
        }
    }

    /// Canvas size the profile expects.
    pub fn canvas(&self) -> CanvasSize {
        CanvasSize::new(self.canvas_width, self.canvas_height)
    }

    /// Number of buttons.
    pub fn tile_count(&self) -> usize {
        (self.rows as usize) * (self.cols as usize)
    }

    /// `true` when `key` (already normalized) names this profile.
    fn answers_to(&self, key: &str) -> bool {
        self.name == key || self.aliases.iter().any(|a| normalize_key(a) == key)
    }

    /// Check that the declared grid is exactly what floor division of the canvas yields.
    pub fn validate(&self) -> GridResult<()> {
        if self.name.trim().is_empty() {
            return Err(GridError::config("device profile name must be non-empty"));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(GridError::config(format!(
                "profile '{}': tile size must be non-zero",
                self.name
            )));
        }
        if self.canvas().is_empty() {
            return Err(GridError::config(format!(
                "profile '{}': canvas size must be non-zero",
                self.name
            )));
        }
        let rows = self.canvas_height / self.tile_height;
        let cols = self.canvas_width / self.tile_width;
        if rows != self.rows || cols != self.cols {
            return Err(GridError::config(format!(
                "profile '{}': declared grid {}x{} but a {} canvas of {}x{} tiles yields {rows}x{cols}",
                self.name,
                self.rows,
                self.cols,
                self.canvas(),
                self.tile_width,
                self.tile_height
            )));
        }
        if rows == 0 || cols == 0 {
            return Err(GridError::config(format!(
                "profile '{}': canvas is smaller than one tile",
                self.name
            )));
        }
        Ok(())
    }
}

/// Ordered lookup table of device profiles.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProfileTable {
    profiles: Vec<DeviceProfile>,
}

static BUILTIN: LazyLock<ProfileTable> = LazyLock::new(|| ProfileTable {
    profiles: vec![
        DeviceProfile::builtin("mini", (288, 192), (2, 3), "20GAI9901"),
        DeviceProfile::builtin("regular", (480, 288), (3, 5), "20GAA9901"),
        DeviceProfile::builtin("plus", (384, 192), (2, 4), "20GBD9901"),
        DeviceProfile::builtin("neo", (384, 192), (2, 4), "20GBJ9901"),
        DeviceProfile::builtin("xl", (768, 384), (4, 8), "20GAT9901"),
    ],
});

impl ProfileTable {
    /// The process-wide built-in table.
    pub fn builtin() -> &'static ProfileTable {
        &BUILTIN
    }

    /// Build a validated table from a list of profiles.
    pub fn new(profiles: Vec<DeviceProfile>) -> GridResult<Self> {
        let table = Self {
            profiles: profiles
                .into_iter()
                .map(|mut p| {
                    p.name = normalize_key(&p.name);
                    p
                })
                .collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Parse a JSON array of profiles.
    pub fn from_reader<R: std::io::Read>(r: R) -> GridResult<Self> {
        let profiles: Vec<DeviceProfile> = serde_json::from_reader(r)
            .map_err(|e| GridError::config(format!("parse device profile JSON: {e}")))?;
        Self::new(profiles)
    }

    /// Parse a JSON array of profiles from disk.
    pub fn from_path(path: impl AsRef<Path>) -> GridResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            GridError::config(format!("open device profile JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Overlay `other` onto `self`: same-named profiles are replaced, new ones appended.
    pub fn merge(&self, other: &ProfileTable) -> GridResult<Self> {
        let mut profiles = self.profiles.clone();
        for p in &other.profiles {
            match profiles.iter_mut().find(|existing| existing.name == p.name) {
                Some(existing) => *existing = p.clone(),
                None => profiles.push(p.clone()),
            }
        }
        Self::new(profiles)
    }

    /// Profiles in table order.
    pub fn profiles(&self) -> &[DeviceProfile] {
        &self.profiles
    }

    /// Look up a profile by name or alias (case-insensitive, surrounding whitespace ignored).
    pub fn get(&self, model: &str) -> GridResult<&DeviceProfile> {
        let key = normalize_key(model);
        self.profiles
            .iter()
            .find(|p| p.answers_to(&key))
            .ok_or_else(|| GridError::unknown_model(model.trim()))
    }

    fn validate(&self) -> GridResult<()> {
        let mut seen = HashSet::new();
        for p in &self.profiles {
            p.validate()?;
            let aliases = p.aliases.iter().map(|a| normalize_key(a));
            for key in std::iter::once(p.name.clone()).chain(aliases) {
                if !seen.insert(key.clone()) {
                    return Err(GridError::config(format!(
                        "model key '{key}' is defined more than once"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Resolve `model` and check that the decoded canvas matches it exactly.
#[tracing::instrument(skip(table))]
pub fn validate_dimensions<'t>(
    table: &'t ProfileTable,
    model: &str,
    actual: CanvasSize,
) -> GridResult<&'t DeviceProfile> {
    let profile = table.get(model)?;
    let expected = profile.canvas();
    if expected != actual {
        return Err(GridError::DimensionMismatch {
            expected_w: expected.width,
            expected_h: expected.height,
            actual_w: actual.width,
            actual_h: actual.height,
        });
    }
    Ok(profile)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

#[cfg(test)]
#[path = "../../tests/unit/profile/table.rs"]
mod tests;
