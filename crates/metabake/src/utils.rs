use std::path::{Path, PathBuf};

use metabake_datasmart::DataSmart;
use metabake_util::split::split_search_path;

use crate::errors::MetadataError;
use crate::MetaResult;

/// Find `item` in the first entry of the colon-separated `path` that contains it.
pub fn which<P: AsRef<str>, I: AsRef<Path>>(
    path: P,
    item: I,
    reversed: bool,
) -> MetaResult<Option<PathBuf>> {
    let mut paths: Vec<&str> = split_search_path(path.as_ref()).collect();
    if reversed {
        paths.reverse();
    }

    for candidate in paths
        .into_iter()
        .map(|path| PathBuf::from(path).join(item.as_ref()))
    {
        if candidate.exists() {
            return Ok(Some(candidate.canonicalize()?));
        }
    }

    Ok(None)
}

/// Maps a path named in metadata to the file that will be read.
pub trait FileResolver {
    /// `including_dir` is the directory of the file that named `file`, if any.
    fn resolve(
        &self,
        file: &Path,
        including_dir: Option<&Path>,
        d: &DataSmart,
    ) -> MetaResult<PathBuf>;
}

/// Searches the including file's directory, then every `BBPATH` entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct BbPathResolver;

impl FileResolver for BbPathResolver {
    fn resolve(
        &self,
        file: &Path,
        including_dir: Option<&Path>,
        d: &DataSmart,
    ) -> MetaResult<PathBuf> {
        if file.is_absolute() {
            if file.exists() {
                return Ok(file.to_path_buf());
            }
            return Err(MetadataError::NotFound {
                file: file.to_path_buf(),
                search_path: String::new(),
            }
            .into());
        }

        let bbpath = match d.get_var("BBPATH") {
            Some(raw) => d.expand(&raw)?,
            None => String::new(),
        };
        let search_path = match including_dir {
            Some(dir) => format!("{}:{}", dir.display(), bbpath),
            None => bbpath,
        };

        which(&search_path, file, false)?.ok_or_else(|| {
            MetadataError::NotFound {
                file: file.to_path_buf(),
                search_path,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn which_first_hit_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir(second.path().join("conf")).unwrap();
        fs::write(second.path().join("conf/local.conf"), "").unwrap();
        fs::create_dir(first.path().join("conf")).unwrap();
        fs::write(first.path().join("conf/local.conf"), "").unwrap();

        let path = format!("{}:{}", first.path().display(), second.path().display());
        assert_eq!(
            which(&path, "conf/local.conf", false).unwrap(),
            Some(first.path().join("conf/local.conf").canonicalize().unwrap())
        );
        assert_eq!(
            which(&path, "conf/local.conf", true).unwrap(),
            Some(second.path().join("conf/local.conf").canonicalize().unwrap())
        );
        assert_eq!(which(&path, "conf/missing.conf", false).unwrap(), None);
    }

    #[test]
    fn resolver_prefers_including_dir() {
        let layer = tempfile::tempdir().unwrap();
        let recipes = tempfile::tempdir().unwrap();
        fs::write(layer.path().join("common.inc"), "").unwrap();
        fs::write(recipes.path().join("common.inc"), "").unwrap();

        let d = DataSmart::new();
        d.set_var("BBPATH", layer.path().display().to_string());

        let resolved = BbPathResolver
            .resolve(Path::new("common.inc"), Some(recipes.path()), &d)
            .unwrap();
        assert_eq!(
            resolved,
            recipes.path().join("common.inc").canonicalize().unwrap()
        );

        let resolved = BbPathResolver
            .resolve(Path::new("common.inc"), None, &d)
            .unwrap();
        assert_eq!(
            resolved,
            layer.path().join("common.inc").canonicalize().unwrap()
        );
    }

    #[test]
    fn resolver_reports_not_found() {
        let d = DataSmart::new();
        d.set_var("BBPATH", "/nonexistent/layer");

        let err = BbPathResolver
            .resolve(Path::new("conf/bitbake.conf"), None, &d)
            .unwrap_err();
        assert!(MetadataError::is_not_found(&err));
        assert!(err.to_string().contains("/nonexistent/layer"));

        let err = BbPathResolver
            .resolve(Path::new("/nonexistent/abs.bb"), None, &d)
            .unwrap_err();
        assert!(MetadataError::is_not_found(&err));
    }
}
