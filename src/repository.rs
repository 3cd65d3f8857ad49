use crate::config::RepositoryConfig;
use crate::loader::{directory_location_from_str, LoadError};
use url::Url;

/// Spec files laid out as `{root}/{branch}/{dir}/{file}`, where `root` is a local
/// checkout or an http(s) raw-content prefix.
#[derive(Debug, Clone)]
pub struct Repository {
    root: Url,
    dir: Vec<String>,
}

impl Repository {
    pub fn new(config: &RepositoryConfig) -> Result<Self, LoadError> {
        Ok(Self {
            root: directory_location_from_str(&config.root)?,
            dir: segments(&config.dir).map(str::to_string).collect(),
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Locates `file` on `branch`. Paths climbing out of the repository are reported as
    /// not found.
    pub fn file_location(&self, branch: &str, file: &str) -> Result<Url, LoadError> {
        let escapes = |part: &str| {
            part.is_empty() || segments(part).any(|segment| segment == "." || segment == "..")
        };
        if escapes(branch) || escapes(file) || segments(file).next().is_none() {
            return Err(LoadError::NotFound {
                location: format!("{}/{}", branch, file),
                reason: "not a file in the repository".to_string(),
            });
        }

        let mut location = self.root.clone();
        location
            .path_segments_mut()
            .map_err(|_| LoadError::InvalidLocation {
                location: self.root.to_string(),
                reason: "repository root can't hold paths".to_string(),
            })?
            .pop_if_empty()
            .extend(segments(branch))
            .extend(&self.dir)
            .extend(segments(file));

        Ok(location)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(root: &str, dir: &str) -> Repository {
        Repository::new(&RepositoryConfig {
            root: root.to_string(),
            dir: dir.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn remote_layout() {
        let repo = repository("https://raw.githubusercontent.com/acme/api", "specs/v1");

        assert_eq!(
            repo.file_location("main", "pets.yaml").unwrap().as_str(),
            "https://raw.githubusercontent.com/acme/api/main/specs/v1/pets.yaml"
        );
        assert_eq!(
            repo.file_location("feature/cats", "models/cat.yaml")
                .unwrap()
                .as_str(),
            "https://raw.githubusercontent.com/acme/api/feature/cats/specs/v1/models/cat.yaml"
        );
    }

    #[test]
    fn local_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path().to_str().unwrap(), "");

        let location = repo.file_location("main", "pets.yaml").unwrap();
        assert_eq!(location.scheme(), "file");
        assert_eq!(
            location.to_file_path().unwrap(),
            dir.path().join("main").join("pets.yaml")
        );
    }

    #[test]
    fn escaping_paths_are_not_found() {
        let repo = repository("https://example.com/repo", "specs");

        for (branch, file) in [
            ("main", "../secrets.yaml"),
            ("..", "pets.yaml"),
            ("main", "models/../../x.yaml"),
            ("main", ""),
            ("", "pets.yaml"),
        ] {
            assert!(
                matches!(
                    repo.file_location(branch, file),
                    Err(LoadError::NotFound { .. })
                ),
                "{}/{}",
                branch,
                file
            );
        }
    }
}
