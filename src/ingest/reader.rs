use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    utils::{BoxFuture, fs::exists, log},
};

/// One readable text file of the corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path relative to the corpus root, `/`-separated.
    pub source: String,
    pub file_name: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct Corpus {
    pub documents: Vec<SourceDocument>,
    pub skipped: Vec<SkippedFile>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn relative_source(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        parts.join("/")
    }
}

fn walk<'a>(
    dir: PathBuf,
    files: &'a mut Vec<PathBuf>,
    skipped: &'a mut Vec<SkippedFile>,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn(format!("skipping directory {}: {}", dir.display(), e));
                skipped.push(SkippedFile {
                    path: dir,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let mut paths = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => paths.push(entry.path()),
                Ok(None) => break,
                Err(e) => {
                    log::warn(format!("error listing {}: {}", dir.display(), e));
                    skipped.push(SkippedFile {
                        path: dir.clone(),
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }
        paths.sort();

        for path in paths {
            if is_hidden(&path) {
                continue;
            }
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => walk(path, &mut *files, &mut *skipped).await,
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    log::warn(format!("skipping {}: {}", path.display(), e));
                    skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
    })
}

/// Reads every visible file under `root` in sorted path order.
///
/// Hidden entries (leading `.`) are ignored. Unreadable or non-UTF-8 files are skipped with a
/// warning and reported in [`Corpus::skipped`]. `root` may also name a single file.
pub async fn read_corpus(root: impl AsRef<Path>) -> Result<Corpus> {
    let root = root.as_ref();
    if !exists(root).await {
        return Err(Error::NotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    let mut skipped = Vec::new();
    if tokio::fs::metadata(root).await?.is_dir() {
        walk(root.to_path_buf(), &mut files, &mut skipped).await;
    } else {
        files.push(root.to_path_buf());
    }

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn(format!("skipping unreadable file {}: {}", path.display(), e));
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::warn(format!("skipping non-UTF-8 file {}: {}", path.display(), e));
                skipped.push(SkippedFile {
                    path,
                    reason: format!("not valid UTF-8: {}", e),
                });
                continue;
            }
        };
        documents.push(SourceDocument {
            source: relative_source(root, &path),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            text,
        });
    }

    Ok(Corpus { documents, skipped })
}

#[cfg(test)]
mod tests {
    use ragdesk_macros::logged_test;

    use super::*;

    #[logged_test]
    async fn walks_sorted_and_skips_hidden_and_binary() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        tokio::fs::create_dir_all(root.join("faq/billing")).await?;
        tokio::fs::create_dir_all(root.join(".git")).await?;
        tokio::fs::write(root.join("zeta.txt"), "last").await?;
        tokio::fs::write(root.join("faq/errors.md"), "Error 429").await?;
        tokio::fs::write(root.join("faq/billing/plans.md"), "Plans").await?;
        tokio::fs::write(root.join(".env"), "SECRET=1").await?;
        tokio::fs::write(root.join(".git/HEAD"), "ref").await?;
        tokio::fs::write(root.join("logo.png"), [0xff, 0xfe, 0x00, 0x9f]).await?;

        let corpus = read_corpus(root).await?;
        let sources: Vec<&str> = corpus.documents.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["faq/billing/plans.md", "faq/errors.md", "zeta.txt"]);
        assert_eq!(corpus.documents[1].file_name, "errors.md");
        assert_eq!(corpus.skipped.len(), 1);
        assert!(corpus.skipped[0].path.ends_with("logo.png"));
        Ok(())
    }

    #[logged_test]
    async fn missing_root_is_not_found() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let err = read_corpus(dir.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }

    #[logged_test]
    async fn single_file_root() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "hello").await?;
        let corpus = read_corpus(&path).await?;
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.documents[0].source, "notes.txt");
        Ok(())
    }
}
