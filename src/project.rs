use std::{
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::Path,
};

use crate::{
    config::Settings,
    encode::ensure_parent_dir,
    foundation::error::{PathlightError, PathlightResult},
    path::{ControlPoint, PathModel},
};

/// Saved editing state: the settings plus the authored control points.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Project {
    pub settings: Settings,
    pub path_points: Vec<ControlPoint>,
}

impl Project {
    pub fn new(settings: Settings, path_points: Vec<ControlPoint>) -> Self {
        Self {
            settings,
            path_points,
        }
    }

    /// Snapshot the current editing state.
    pub fn capture(settings: &Settings, model: &PathModel) -> Self {
        Self::new(settings.clone(), model.points().to_vec())
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> PathlightResult<Self> {
        let project: Self = serde_json::from_reader(r)
            .map_err(|e| PathlightError::serde(format!("parse project JSON: {e}")))?;
        for p in &project.path_points {
            p.validate()?;
        }
        Ok(project)
    }

    pub fn from_path(path: impl AsRef<Path>) -> PathlightResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            PathlightError::resource(format!("open project '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PathlightResult<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let f = File::create(path).map_err(|e| {
            PathlightError::resource(format!("create project '{}': {e}", path.display()))
        })?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush().map_err(|e| {
            PathlightError::resource(format!("write project '{}': {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), points = self.path_points.len(), "project saved");
        Ok(())
    }

    /// An editable path model seeded with the saved points and smoothing.
    pub fn to_model(&self) -> PathlightResult<PathModel> {
        let mut model = PathModel::from_points(self.path_points.clone())?;
        model.set_smoothing(self.settings.smoothing);
        Ok(model)
    }
}
