// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External renderers: LibreOffice in headless mode, and Microsoft Office
// driven through PowerShell COM automation on Windows.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use pdflock_core::error::ConversionFailure;
use pdflock_core::types::OfficeKind;
use tracing::{debug, warn};

use crate::convert::PdfRenderer;

/// How often a running converter is checked against its deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code the automation script uses when the COM server cannot start.
const HOST_MISSING_EXIT: i32 = 3;

// ---------------------------------------------------------------------------
// LibreOffice
// ---------------------------------------------------------------------------

/// Converts documents with `soffice --headless --convert-to pdf`.
pub struct SofficeRenderer {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl SofficeRenderer {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl PdfRenderer for SofficeRenderer {
    fn name(&self) -> &str {
        "LibreOffice"
    }

    fn is_available(&self) -> bool {
        find_program(&self.program).is_some()
    }

    fn render(
        &self,
        _kind: OfficeKind,
        input: &Path,
        output: &Path,
    ) -> Result<(), ConversionFailure> {
        let out_dir = output
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = input
            .file_stem()
            .ok_or_else(|| ConversionFailure::Failed("input has no file name".into()))?;
        let mut produced_name = stem.to_os_string();
        produced_name.push(".pdf");
        let produced = out_dir.join(produced_name);

        // A private profile lets conversion run while the user has
        // LibreOffice open.
        let profile = out_dir.join(".soffice-profile");

        let mut command = Command::new(&self.program);
        command
            .arg("--headless")
            .arg("--norestore")
            .arg(format!("-env:UserInstallation={}", file_url(&profile)))
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input);

        let result = run_to_completion(command, self.name(), self.timeout)?;
        if !result.status.success() {
            return Err(ConversionFailure::Failed(failure_message(self.name(), &result)));
        }
        if !produced.is_file() {
            return Err(ConversionFailure::Failed(format!(
                "LibreOffice did not produce {}",
                produced.display()
            )));
        }
        if produced != output {
            std::fs::rename(&produced, output).map_err(|err| {
                ConversionFailure::Failed(format!("cannot move converted PDF: {err}"))
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Microsoft Office automation
// ---------------------------------------------------------------------------

/// Converts documents by scripting Word, Excel or PowerPoint over COM.
pub struct OfficeAutomationRenderer {
    shell: PathBuf,
    timeout: Option<Duration>,
}

impl OfficeAutomationRenderer {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            shell: PathBuf::from("powershell"),
            timeout,
        }
    }
}

impl PdfRenderer for OfficeAutomationRenderer {
    fn name(&self) -> &str {
        "Microsoft Office"
    }

    fn is_available(&self) -> bool {
        cfg!(windows) && find_program(&self.shell).is_some()
    }

    fn render(
        &self,
        kind: OfficeKind,
        input: &Path,
        output: &Path,
    ) -> Result<(), ConversionFailure> {
        let input = std::path::absolute(input)
            .map_err(|err| ConversionFailure::Failed(format!("cannot resolve input: {err}")))?;
        let output = std::path::absolute(output)
            .map_err(|err| ConversionFailure::Failed(format!("cannot resolve output: {err}")))?;

        let mut command = Command::new(&self.shell);
        command
            .args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass"])
            .arg("-Command")
            .arg(automation_script(kind, &input, &output));

        let result = run_to_completion(command, "PowerShell", self.timeout)?;
        match result.status.code() {
            Some(0) => Ok(()),
            Some(HOST_MISSING_EXIT) => Err(ConversionFailure::HostApplicationMissing {
                application: host_application(kind).into(),
            }),
            _ => Err(ConversionFailure::Failed(failure_message(
                host_application(kind),
                &result,
            ))),
        }
    }
}

fn host_application(kind: OfficeKind) -> &'static str {
    match kind {
        OfficeKind::WordProcessor => "Microsoft Word",
        OfficeKind::Spreadsheet => "Microsoft Excel",
        OfficeKind::Presentation => "Microsoft PowerPoint",
    }
}

/// PowerShell that exports one document to PDF, exiting with
/// [`HOST_MISSING_EXIT`] when the application's COM server is absent.
fn automation_script(kind: OfficeKind, input: &Path, output: &Path) -> String {
    let input = ps_quote(input.as_os_str());
    let output = ps_quote(output.as_os_str());

    let (prog_id, export) = match kind {
        OfficeKind::WordProcessor => (
            "Word.Application",
            format!(
                "$doc = $app.Documents.Open({input}, $false, $true); \
                 $doc.ExportAsFixedFormat({output}, 17); $doc.Close($false)"
            ),
        ),
        OfficeKind::Spreadsheet => (
            "Excel.Application",
            format!(
                "$app.DisplayAlerts = $false; $wb = $app.Workbooks.Open({input}); \
                 $wb.ExportAsFixedFormat(0, {output}); $wb.Close($false)"
            ),
        ),
        OfficeKind::Presentation => (
            "PowerPoint.Application",
            format!(
                "$p = $app.Presentations.Open({input}, $true, $false, $false); \
                 $p.SaveAs({output}, 32); $p.Close()"
            ),
        ),
    };

    format!(
        "$ErrorActionPreference = 'Stop'; \
         try {{ $app = New-Object -ComObject {prog_id} }} catch {{ exit {HOST_MISSING_EXIT} }}; \
         try {{ {export} }} finally {{ $app.Quit() }}"
    )
}

/// Single-quoted PowerShell literal.
fn ps_quote(value: &OsStr) -> String {
    format!("'{}'", value.to_string_lossy().replace('\'', "''"))
}

// ---------------------------------------------------------------------------
// Process helpers
// ---------------------------------------------------------------------------

/// Run `command`, killing it once `timeout` elapses.
///
/// Stderr is drained on a separate thread so a chatty converter never blocks
/// on a full pipe. A program that cannot be found maps to
/// `HostApplicationMissing`.
fn run_to_completion(
    mut command: Command,
    application: &str,
    timeout: Option<Duration>,
) -> Result<Output, ConversionFailure> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ConversionFailure::HostApplicationMissing {
            application: application.into(),
        },
        _ => ConversionFailure::Failed(format!("cannot start {application}: {err}")),
    })?;
    debug!(application, pid = child.id(), "converter started");

    let stderr = child.stderr.take();
    let drain = std::thread::spawn(move || {
        let mut captured = Vec::new();
        if let Some(mut pipe) = stderr {
            if let Err(err) = pipe.read_to_end(&mut captured) {
                debug!(%err, "cannot read converter stderr");
            }
        }
        captured
    });

    let status = match timeout {
        None => child
            .wait()
            .map_err(|err| ConversionFailure::Failed(err.to_string()))?,
        Some(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                match child.try_wait() {
                    Ok(Some(status)) => break status,
                    Ok(None) if Instant::now() >= deadline => {
                        warn!(application, ?limit, "converter timed out, killing it");
                        if let Err(err) = child.kill() {
                            warn!(%err, "cannot kill converter");
                        }
                        if let Err(err) = child.wait() {
                            warn!(%err, "cannot reap converter");
                        }
                        // Descendants may still hold stderr open; the drain
                        // thread is left to finish on its own.
                        return Err(ConversionFailure::TimedOut { after: limit });
                    }
                    Ok(None) => std::thread::sleep(POLL_INTERVAL),
                    Err(err) => return Err(ConversionFailure::Failed(err.to_string())),
                }
            }
        }
    };

    let stderr = drain.join().unwrap_or_else(|_| {
        warn!("converter stderr reader panicked");
        Vec::new()
    });
    Ok(Output {
        status,
        stdout: Vec::new(),
        stderr,
    })
}

fn failure_message(application: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{application} exited with {}", output.status)
    } else {
        format!("{application} failed: {stderr}")
    }
}

/// Locate `program` directly or on `PATH`.
fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// `file://` URL for a local path, as LibreOffice expects for profiles.
fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let text = absolute.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_unavailable() {
        let renderer = SofficeRenderer::new("/nonexistent/bin/soffice", None);
        assert!(!renderer.is_available());
    }

    #[test]
    fn missing_program_maps_to_host_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("letter.docx");
        std::fs::write(&input, b"PK").expect("write");
        let renderer = SofficeRenderer::new("pdflock-no-such-converter", None);

        let err = renderer
            .render(OfficeKind::WordProcessor, &input, &dir.path().join("letter.pdf"))
            .unwrap_err();
        assert_eq!(
            err,
            ConversionFailure::HostApplicationMissing {
                application: "LibreOffice".into()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn slow_converter_is_killed() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let started = Instant::now();
        let err = run_to_completion(command, "sleep", Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, ConversionFailure::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn converter_flooding_stderr_still_completes() {
        let mut command = Command::new("sh");
        command.args(["-c", "head -c 200000 /dev/zero >&2; exit 0"]);
        let output = run_to_completion(command, "sh", Some(Duration::from_secs(10)))
            .expect("completes before the deadline");
        assert!(output.status.success());
        assert_eq!(output.stderr.len(), 200_000);
    }

    #[cfg(unix)]
    #[test]
    fn stderr_reaches_failure_message() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo 'source file is damaged' >&2; exit 1"]);
        let output = run_to_completion(command, "sh", None).expect("runs");
        assert!(!output.status.success());
        assert_eq!(failure_message("sh", &output), "sh failed: source file is damaged");
    }

    #[test]
    fn script_quotes_paths_and_selects_application() {
        let script = automation_script(
            OfficeKind::Presentation,
            Path::new("C:/Users/o'neil/deck.pptx"),
            Path::new("C:/tmp/deck.pdf"),
        );
        assert!(script.contains("PowerPoint.Application"));
        assert!(script.contains("'C:/Users/o''neil/deck.pptx'"));
        assert!(script.contains("SaveAs('C:/tmp/deck.pdf', 32)"));
        assert!(script.contains(&format!("exit {HOST_MISSING_EXIT}")));

        let sheet = automation_script(
            OfficeKind::Spreadsheet,
            Path::new("book.xlsx"),
            Path::new("book.pdf"),
        );
        assert!(sheet.contains("ExportAsFixedFormat(0, 'book.pdf')"));
    }

    #[test]
    fn file_urls() {
        assert_eq!(file_url(Path::new("/tmp/profile")), "file:///tmp/profile");
    }
}
