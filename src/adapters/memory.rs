use crate::domain::model::{BoundingBox, Garden};
use crate::domain::ports::GardenStore;
use crate::utils::error::{GardenError, Result};
use crate::utils::validation::validate_file_extension;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct GardenFile {
    #[serde(default)]
    gardens: Vec<Garden>,
}

/// Garden store over a fixed list, answering bounding-box queries only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGardenStore {
    gardens: Vec<Garden>,
}

impl InMemoryGardenStore {
    pub fn new(gardens: Vec<Garden>) -> Self {
        Self { gardens }
    }

    /// Loads gardens from a `.json` array or a `.toml` file with `[[gardens]]` tables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let shown = path.to_string_lossy();
        validate_file_extension("store.gardens_file", &shown, &["json", "toml"])?;

        let content = std::fs::read_to_string(path)?;
        let gardens = if shown.ends_with(".json") {
            serde_json::from_str::<Vec<Garden>>(&content)?
        } else {
            toml::from_str::<GardenFile>(&content)
                .map_err(|e| GardenError::ConfigValidationError {
                    field: "store.gardens_file".to_string(),
                    message: format!("TOML parsing error: {}", e),
                })?
                .gardens
        };

        let store = Self::new(gardens);
        store.check_coordinates()?;
        tracing::debug!("Loaded {} gardens from {}", store.len(), shown);
        Ok(store)
    }

    fn check_coordinates(&self) -> Result<()> {
        for garden in &self.gardens {
            if !crate::core::geo::is_valid_coordinate(garden.latitude, garden.longitude) {
                return Err(GardenError::InvalidConfigValueError {
                    field: format!("gardens.{}", garden.id),
                    value: format!("({}, {})", garden.latitude, garden.longitude),
                    reason: "Coordinates out of range".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.gardens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gardens.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Garden> {
        self.gardens.iter().find(|g| g.id == id)
    }
}

#[async_trait]
impl GardenStore for InMemoryGardenStore {
    async fn gardens_in_box(&self, bbox: &BoundingBox) -> Result<Vec<Garden>> {
        Ok(self
            .gardens
            .iter()
            .filter(|g| bbox.contains(g.latitude, g.longitude))
            .cloned()
            .collect())
    }
}
