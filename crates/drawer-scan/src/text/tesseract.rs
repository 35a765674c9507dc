//! Conventional OCR through the `tesseract` command-line engine.

use super::{encode_png, TextError, TextExtractor};
use image::RgbImage;
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractParams {
    pub binary: String,
    /// Page segmentation mode; 7 treats the crop as a single text line.
    pub psm: u8,
    pub language: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TesseractParams {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            psm: 7,
            language: None,
            timeout_secs: 30,
        }
    }
}

/// Runs `tesseract stdin stdout` per crop; raw output needs
/// [`clean_ocr_text`](super::clean_ocr_text).
pub struct TesseractTextExtractor {
    params: TesseractParams,
}

impl TesseractTextExtractor {
    pub fn new(params: TesseractParams) -> Self {
        Self { params }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.params.binary);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(self.params.psm.to_string());
        if let Some(lang) = &self.params.language {
            cmd.arg("-l").arg(lang);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd
    }
}

impl TextExtractor for TesseractTextExtractor {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn needs_cleanup(&self) -> bool {
        true
    }

    fn extract_text(&self, crop: &RgbImage) -> Result<String, TextError> {
        let png = encode_png(crop)?;
        let timeout = Duration::from_secs(self.params.timeout_secs);
        let mut child = self.command().spawn()?;

        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                stdin.write_all(&png)?;
                drop(stdin);
                Ok::<(), std::io::Error>(())
            })
        });
        let reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut s = String::new();
                out.read_to_string(&mut s).map(|_| s)
            })
        });

        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TextError::Timeout(timeout));
            }
            thread::sleep(Duration::from_millis(20));
        };

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                // The engine may exit before draining stdin; its status decides.
                Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(TextError::Engine("stdin writer panicked".to_string())),
            }
        }

        let raw = match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| TextError::Engine("stdout reader panicked".to_string()))??,
            None => String::new(),
        };
        if !status.success() {
            return Err(TextError::Engine(format!("exited with {status}")));
        }
        debug!("tesseract raw output {raw:?}");
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_reads_png_from_stdin() {
        let ex = TesseractTextExtractor::new(TesseractParams {
            language: Some("eng".to_string()),
            ..TesseractParams::default()
        });
        let cmd = ex.command();
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, ["stdin", "stdout", "--psm", "7", "-l", "eng"]);
        assert!(ex.needs_cleanup());
    }

    #[test]
    fn missing_binary_is_an_io_error() {
        let ex = TesseractTextExtractor::new(TesseractParams {
            binary: "/nonexistent/tesseract-binary".to_string(),
            ..TesseractParams::default()
        });
        let crop = RgbImage::new(4, 4);
        assert!(matches!(ex.extract_text(&crop), Err(TextError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn engine_that_never_reads_stdin_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("stalled-ocr");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ex = TesseractTextExtractor::new(TesseractParams {
            binary: script.to_string_lossy().into_owned(),
            timeout_secs: 1,
            ..TesseractParams::default()
        });
        // Noise defeats PNG compression so the payload exceeds a pipe buffer.
        let mut state = 0x2545_f491_u32;
        let crop = RgbImage::from_fn(400, 400, |_, _| {
            let mut px = [0u8; 3];
            for c in &mut px {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                *c = (state >> 24) as u8;
            }
            image::Rgb(px)
        });

        let started = Instant::now();
        let result = ex.extract_text(&crop);
        assert!(matches!(result, Err(TextError::Timeout(_))), "{result:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
