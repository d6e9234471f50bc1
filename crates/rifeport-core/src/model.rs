use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{InterpError, Result};

/// Environment variable that overrides the installed models directory.
pub const MODELS_DIR_ENV: &str = "RIFEPORT_MODELS_DIR";

const MODELS_SUBDIR: &str = "models";

/// Network layout family, decided once from the model name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArchVariant {
    #[default]
    Legacy,
    V2Style,
    V4Style,
}

impl ArchVariant {
    /// Classifies a model by the final component of its name or path.
    pub fn classify(name_or_path: &str) -> Self {
        let name = Path::new(name_or_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| name_or_path.to_lowercase());

        if ["rife-v4", "rife4", "rife-4"].iter().any(|p| name.contains(p)) {
            Self::V4Style
        } else if ["rife-v2", "rife-v3"].iter().any(|p| name.contains(p)) {
            Self::V2Style
        } else {
            Self::Legacy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::V2Style => "v2",
            Self::V4Style => "v4",
        }
    }

    /// V4 networks accept an explicit timestep.
    pub fn takes_timestep(&self) -> bool {
        matches!(self, Self::V4Style)
    }

    /// Spatial alignment the flow network needs on both frame edges.
    pub fn pad_alignment(&self) -> u32 {
        match self {
            Self::V4Style => 64,
            Self::Legacy | Self::V2Style => 32,
        }
    }
}

impl fmt::Display for ArchVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model directory that existed at resolution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDirectory {
    path: PathBuf,
}

impl ModelDirectory {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to a file inside the directory, failing fast when it is missing.
    pub fn require_file(&self, name: &str) -> Result<PathBuf> {
        let file = self.path.join(name);
        if file.is_file() {
            Ok(file)
        } else {
            Err(InterpError::ModelNotFound { path: file })
        }
    }
}

/// Everything a backend needs to know about the model it loads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: String,
    pub directory: ModelDirectory,
    pub variant: ArchVariant,
    pub scale: u32,
}

impl ModelDescriptor {
    pub fn path(&self) -> &Path {
        self.directory.path()
    }
}

/// Locates model directories by name or path.
#[derive(Clone, Debug)]
pub struct ModelStore {
    models_dir: PathBuf,
}

impl ModelStore {
    /// `root` is the installation directory; names resolve under `root/models`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::from_models_dir(root.as_ref().join(MODELS_SUBDIR))
    }

    /// Store whose named models live directly in `dir`.
    pub fn from_models_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: dir.into(),
        }
    }

    /// Store at `$RIFEPORT_MODELS_DIR`, or `models/` next to the running executable.
    pub fn installed() -> Self {
        if let Some(dir) = std::env::var_os(MODELS_DIR_ENV) {
            return Self::from_models_dir(dir);
        }

        let root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn resolve(&self, name_or_path: &str) -> Result<ModelDirectory> {
        let candidate = Path::new(name_or_path);
        let path = if candidate.is_absolute() || candidate.is_dir() {
            candidate.to_path_buf()
        } else {
            self.models_dir.join(name_or_path)
        };

        if !path.is_dir() {
            return Err(InterpError::ModelNotFound { path });
        }

        debug!(model = name_or_path, path = %path.display(), "resolved model directory");
        Ok(ModelDirectory { path })
    }

    /// Names of the model directories in the store, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries =
            std::fs::read_dir(&self.models_dir).map_err(|_| InterpError::ModelNotFound {
                path: self.models_dir.clone(),
            })?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_variants_from_names() {
        assert_eq!(ArchVariant::classify("rife-v4.6"), ArchVariant::V4Style);
        assert_eq!(ArchVariant::classify("rife4"), ArchVariant::V4Style);
        assert_eq!(ArchVariant::classify("RIFE-4.22-lite"), ArchVariant::V4Style);
        assert_eq!(ArchVariant::classify("rife-v2.3"), ArchVariant::V2Style);
        assert_eq!(ArchVariant::classify("rife-v3.1"), ArchVariant::V2Style);
        assert_eq!(ArchVariant::classify("rife-HD"), ArchVariant::Legacy);
        assert_eq!(ArchVariant::classify("rife"), ArchVariant::Legacy);
    }

    #[test]
    fn classification_ignores_parent_directories() {
        assert_eq!(
            ArchVariant::classify("/opt/rife-v4/models/rife-anime"),
            ArchVariant::Legacy
        );
        assert_eq!(
            ArchVariant::classify("/opt/models/rife-v2.4"),
            ArchVariant::V2Style
        );
    }

    #[test]
    fn resolves_names_under_models_dir() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("models/rife-v4.6")).unwrap();

        let store = ModelStore::new(root.path());
        let dir = store.resolve("rife-v4.6").unwrap();
        assert_eq!(dir.path(), root.path().join("models/rife-v4.6"));
    }

    #[test]
    fn resolves_absolute_paths_directly() {
        let root = tempfile::tempdir().unwrap();
        let custom = root.path().join("elsewhere");
        std::fs::create_dir_all(&custom).unwrap();

        let store = ModelStore::from_models_dir(root.path().join("unused"));
        let dir = store.resolve(custom.to_str().unwrap()).unwrap();
        assert_eq!(dir.path(), custom);
    }

    #[test]
    fn missing_directory_is_model_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = ModelStore::new(root.path());

        let err = store.resolve("rife-v9").unwrap_err();
        match err {
            InterpError::ModelNotFound { path } => {
                assert_eq!(path, root.path().join("models/rife-v9"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let missing_abs = root.path().join("nope");
        assert!(matches!(
            store.resolve(missing_abs.to_str().unwrap()),
            Err(InterpError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn regular_file_is_not_a_model_directory() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("models")).unwrap();
        std::fs::write(root.path().join("models/rife-v4"), b"not a dir").unwrap();

        let store = ModelStore::new(root.path());
        assert!(matches!(
            store.resolve("rife-v4"),
            Err(InterpError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn require_file_reports_missing_weights() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("models/rife")).unwrap();
        std::fs::write(root.path().join("models/rife/flownet.param"), b"7767517").unwrap();

        let dir = ModelStore::new(root.path()).resolve("rife").unwrap();
        assert!(dir.require_file("flownet.param").is_ok());
        match dir.require_file("flownet.onnx") {
            Err(InterpError::ModelNotFound { path }) => assert!(path.ends_with("flownet.onnx")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn lists_model_directories() {
        let root = tempfile::tempdir().unwrap();
        for name in ["rife-v4.6", "rife-v2.3", "rife"] {
            std::fs::create_dir_all(root.path().join("models").join(name)).unwrap();
        }
        std::fs::write(root.path().join("models/README"), b"").unwrap();

        let store = ModelStore::new(root.path());
        assert_eq!(store.list().unwrap(), vec!["rife", "rife-v2.3", "rife-v4.6"]);
    }
}
