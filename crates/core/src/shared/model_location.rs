use std::path::PathBuf;

/// Where the pretrained model artifacts are loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelLocation {
    /// Base URL; artifacts are fetched as `<base>/<name>` and cached locally.
    Url(String),
    /// Local directory holding the artifacts.
    Directory(PathBuf),
}

impl ModelLocation {
    /// Interprets a configuration string: `http(s)://` is a URL, anything
    /// else a filesystem path.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            ModelLocation::Url(trimmed.to_string())
        } else {
            ModelLocation::Directory(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelLocation::Url(url) => write!(f, "{url}"),
            ModelLocation::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}
