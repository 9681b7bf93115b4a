use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr, eyre};
use log::{debug, info};
use serde_yaml::{Mapping, Value};

/// A CV YAML document, edited in place as a YAML value tree
#[derive(Debug, Clone)]
pub struct CvDocument {
    pub path: PathBuf,
    pub root: Value,
}

impl CvDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("CV file not found: {}", path.display()))?;

        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(raw)
            .wrap_err_with(|| format!("failed to parse CV YAML {}", path.display()))?;
        debug!("loaded CV from {}", path.display());

        Ok(CvDocument {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn save(&self) -> Result<()> {
        let raw = serde_yaml::to_string(&self.root)?;
        fs::write(&self.path, raw)
            .wrap_err_with(|| format!("failed to write CV file {}", self.path.display()))?;
        info!("updated {}", self.path.display());

        Ok(())
    }

    fn cv(&self) -> Option<&Mapping> {
        self.root.get("cv")?.as_mapping()
    }

    /// Username of the GoogleScholar entry among `cv.social_networks`
    pub fn google_scholar_id(&self) -> Option<String> {
        self.cv()?
            .get("social_networks")?
            .as_sequence()?
            .iter()
            .find(|network| {
                network
                    .get("network")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name.to_lowercase().replace(' ', "") == "googlescholar")
            })?
            .get("username")?
            .as_str()
            .map(str::to_string)
    }

    pub fn sections(&self) -> Option<&Mapping> {
        self.cv()?.get("sections")?.as_mapping()
    }

    pub fn sections_mut(&mut self) -> Result<&mut Mapping> {
        self.root
            .get_mut("cv")
            .ok_or_else(|| eyre!("no 'cv' mapping in {}", self.path.display()))?
            .get_mut("sections")
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| eyre!("no 'cv.sections' mapping in {}", self.path.display()))
    }

    /// Entries of a section, `None` when the section is absent or not a list
    pub fn section_mut(&mut self, name: &str) -> Result<Option<&mut Vec<Value>>> {
        Ok(self
            .sections_mut()?
            .get_mut(name)
            .and_then(Value::as_sequence_mut))
    }
}
