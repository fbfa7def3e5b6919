use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Platform base directory for the default home: `%APPDATA%` on Windows,
/// `$HOME` elsewhere.
fn platform_base_dir() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "APPDATA";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";

    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("environment variable {var} is not set"))
}

/// Expand a leading `~` into the platform base directory.
fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return platform_base_dir();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_base_dir()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the server home directory into an absolute path.
///
/// `None` selects `<platform base>/<default_subdir>`. Relative paths are
/// anchored at the current working directory. With `create` the directory is
/// created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_base_dir()?.join(default_subdir),
    };

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("cannot read current directory")?
            .join(path)
    };

    if create {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("cannot create home_dir {}", path.display()))?;
    }
    Ok(path)
}

/// Resolve `file` against `base_dir` unless it is already absolute.
pub fn resolve_under(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_home_dir_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let wanted = tmp.path().join("nested/home");

        let resolved =
            resolve_home_dir(Some(wanted.to_string_lossy().to_string()), ".unused", true).unwrap();

        assert_eq!(resolved, wanted);
        assert!(resolved.is_dir());
    }

    #[test]
    fn relative_home_dir_becomes_absolute() {
        let resolved = resolve_home_dir(Some("some/relative".into()), ".unused", false).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/relative"));
    }

    #[test]
    fn resolve_under_keeps_absolute_paths() {
        let tmp = tempdir().unwrap();
        let abs = tmp.path().join("x.log");
        assert_eq!(resolve_under(&abs.to_string_lossy(), Path::new("/base")), abs);
        assert_eq!(
            resolve_under("logs/x.log", Path::new("/base")),
            PathBuf::from("/base/logs/x.log")
        );
    }
}
