//! LaTeX compilation behind the [`LatexEngine`] seam.
//!
//! The engine is a trait so the run loop can be exercised end-to-end in tests
//! with a fake that fabricates PDFs instantly — no TeX distribution needed.
//! The production implementation shells out to `xelatex` (configurable) with
//! a hard wall-clock budget: a pathological document that makes the engine
//! loop is killed at the deadline rather than wedging the whole run.

use crate::error::CompileError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum bytes of engine output kept in a [`CompileError::Failed`] log.
const LOG_TAIL_BYTES: usize = 4096;

/// One LaTeX compilation: `.tex` in, `.pdf` out.
///
/// Implementations report failures as [`CompileError`]; the run loop attaches
/// the slide index and continues with the remaining slides.
pub trait LatexEngine: Send + Sync {
    /// Compile `tex_path`, placing the PDF (and aux files) in `out_dir`.
    ///
    /// Returns the path of the produced PDF.
    fn compile(
        &self,
        tex_path: &Path,
        out_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf, CompileError>> + Send;
}

/// Production engine: spawns the configured LaTeX binary as a subprocess.
pub struct XelatexEngine {
    program: String,
    timeout: Duration,
}

impl XelatexEngine {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl LatexEngine for XelatexEngine {
    async fn compile(&self, tex_path: &Path, out_dir: &Path) -> Result<PathBuf, CompileError> {
        if !tex_path.exists() {
            return Err(CompileError::MissingFile {
                path: tex_path.to_path_buf(),
            });
        }
        if !out_dir.exists() {
            return Err(CompileError::MissingFile {
                path: out_dir.to_path_buf(),
            });
        }

        debug!(
            "Compiling {} with {} (timeout {}s)",
            tex_path.display(),
            self.program,
            self.timeout.as_secs()
        );

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(format!("-output-directory={}", out_dir.display()))
            .arg(tex_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // If the timeout fires, the output future is dropped and the
            // child is killed rather than left running detached.
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CompileError::EngineNotFound {
                    program: self.program.clone(),
                    detail: e.to_string(),
                }
            } else {
                CompileError::Io(e)
            }
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => {
                warn!(
                    "{} timed out after {}s on {}",
                    self.program,
                    self.timeout.as_secs(),
                    tex_path.display()
                );
                return Err(CompileError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
            Ok(result) => result?,
        };

        if !output.status.success() {
            return Err(CompileError::Failed {
                status: output.status.code(),
                log: log_tail(&output.stdout, &output.stderr),
            });
        }

        let pdf_path = expected_pdf_path(tex_path, out_dir);
        if !pdf_path.exists() {
            // Engines occasionally exit zero without producing output (e.g.
            // an empty document body).
            return Err(CompileError::Failed {
                status: output.status.code(),
                log: format!(
                    "engine exited successfully but '{}' was not produced",
                    pdf_path.display()
                ),
            });
        }

        Ok(pdf_path)
    }
}

/// Where the engine will place the PDF for `tex_path` under `out_dir`.
pub fn expected_pdf_path(tex_path: &Path, out_dir: &Path) -> PathBuf {
    let stem = tex_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{stem}.pdf"))
}

/// The tail of stdout+stderr, bounded so one broken document cannot bloat
/// the run report with megabytes of engine log.
fn log_tail(stdout: &[u8], stderr: &[u8]) -> String {
    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(stdout),
        String::from_utf8_lossy(stderr)
    );
    let trimmed = combined.trim();
    if trimmed.len() <= LOG_TAIL_BYTES {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - LOG_TAIL_BYTES;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("…{}", &trimmed[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_pdf_path_swaps_extension_and_dir() {
        let pdf = expected_pdf_path(
            Path::new("/tmp/tex/document_3.tex"),
            Path::new("/tmp/out"),
        );
        assert_eq!(pdf, PathBuf::from("/tmp/out/document_3.pdf"));
    }

    #[test]
    fn log_tail_bounds_output() {
        let big = vec![b'x'; LOG_TAIL_BYTES * 2];
        let tail = log_tail(&big, b"");
        assert!(tail.len() <= LOG_TAIL_BYTES + '…'.len_utf8());
        assert!(tail.starts_with('…'));
    }

    #[test]
    fn log_tail_keeps_short_output_verbatim() {
        let tail = log_tail(b"! Undefined control sequence.", b"some stderr");
        assert!(tail.contains("Undefined control sequence"));
        assert!(tail.contains("some stderr"));
    }

    #[tokio::test]
    async fn missing_tex_file_is_reported_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let engine = XelatexEngine::new("definitely-not-a-real-engine", Duration::from_secs(1));
        let err = engine
            .compile(&dir.path().join("document_1.tex"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::MissingFile { .. }));
    }

    #[tokio::test]
    async fn missing_engine_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("document_1.tex");
        tokio::fs::write(&tex, "\\documentclass{article}\\begin{document}x\\end{document}")
            .await
            .unwrap();
        let engine = XelatexEngine::new("definitely-not-a-real-engine", Duration::from_secs(1));
        let err = engine.compile(&tex, dir.path()).await.unwrap_err();
        assert!(matches!(err, CompileError::EngineNotFound { .. }));
    }

    /// Write an executable shell script standing in for a LaTeX engine.
    #[cfg(unix)]
    fn fake_engine_script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-tex");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn wedged_engine_is_killed_at_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("document_1.tex");
        tokio::fs::write(&tex, "irrelevant").await.unwrap();
        let script = fake_engine_script(dir.path(), "sleep 10");
        let engine = XelatexEngine::new(
            script.to_string_lossy().into_owned(),
            Duration::from_millis(200),
        );
        let err = engine.compile(&tex, dir.path()).await.unwrap_err();
        assert!(matches!(err, CompileError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_carries_the_engine_log() {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("document_1.tex");
        tokio::fs::write(&tex, "irrelevant").await.unwrap();
        let script = fake_engine_script(
            dir.path(),
            "echo '! Undefined control sequence.'; exit 1",
        );
        let engine =
            XelatexEngine::new(script.to_string_lossy().into_owned(), Duration::from_secs(5));
        let err = engine.compile(&tex, dir.path()).await.unwrap_err();
        match err {
            CompileError::Failed { status, log } => {
                assert_eq!(status, Some(1));
                assert!(log.contains("Undefined control sequence"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_exit_without_a_pdf_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("document_1.tex");
        tokio::fs::write(&tex, "irrelevant").await.unwrap();
        let script = fake_engine_script(dir.path(), "exit 0");
        let engine =
            XelatexEngine::new(script.to_string_lossy().into_owned(), Duration::from_secs(5));
        let err = engine.compile(&tex, dir.path()).await.unwrap_err();
        match err {
            CompileError::Failed { log, .. } => assert!(log.contains("not produced")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
