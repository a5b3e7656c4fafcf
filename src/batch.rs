use std::fmt;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use tracing::{debug, info, warn};

use crate::capabilities::Backends;
use crate::config::Config;
use crate::discovery::collect_image_files;
use crate::dispatch::remove_background;
use crate::errors::{BgRemoveError, Result};
use crate::naming::{should_skip, NamingPolicy};

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Saved { output: PathBuf },
    Skipped { output: PathBuf },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub input: PathBuf,
    pub outcome: FileOutcome,
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = file_name(&self.input);
        match &self.outcome {
            FileOutcome::Saved { output } => {
                write!(f, "Saved: {}", display_path(output).display())
            }
            FileOutcome::Skipped { output } => write!(
                f,
                "Skip {name}: {} exists (use --force to overwrite)",
                file_name(output)
            ),
            FileOutcome::Failed { message } => write!(f, "Error processing {name}: {message}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done: {} saved, {} skipped, {} failed.",
            self.saved(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Removes the background of every image directly inside `work_dir`.
pub struct BatchRemover {
    config: Config,
    backends: Backends,
    work_dir: PathBuf,
}

impl BatchRemover {
    pub fn new(config: Config, backends: Backends, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            backends,
            work_dir: work_dir.into(),
        }
    }

    /// Process the whole directory, printing notices to stdout.
    pub fn run(&self) -> Result<BatchReport> {
        self.run_to(&mut io::stdout().lock())
    }

    /// Process the whole directory, writing operator notices to `out`.
    ///
    /// Only a failure to create the output directory, to list `work_dir` or
    /// to write to `out` is returned as an error; per-file problems end up
    /// in the report.
    pub fn run_to<W: Write>(&self, out: &mut W) -> Result<BatchReport> {
        let policy = self.config.naming_policy(&self.work_dir);

        if let NamingPolicy::Separate { dir } = &policy {
            fs::create_dir_all(dir).map_err(|e| BgRemoveError::FileSystem {
                path: dir.clone(),
                operation: "output directory creation".to_string(),
                source: e,
            })?;
        }

        let image_files = collect_image_files(&self.work_dir)?;
        if image_files.is_empty() {
            writeln!(out, "No images found in {}.", self.work_dir.display())?;
            return Ok(BatchReport::default());
        }

        writeln!(out, "{}", self.backends.capabilities())?;
        info!(
            files = image_files.len(),
            method = %self.config.method,
            output_dir = %policy.output_dir().display(),
            "starting batch"
        );

        for (output, inputs) in policy.collisions(&image_files) {
            warn!(
                output = %output.display(),
                inputs = ?inputs,
                "several inputs share one output path, later ones overwrite or skip"
            );
        }

        let mut report = BatchReport::default();
        for input in image_files {
            let outcome = self.process_file(&input, &policy);
            let file_report = FileReport { input, outcome };
            writeln!(out, "{file_report}")?;
            report.files.push(file_report);
        }

        Ok(report)
    }

    /// Resolve, guard, remove and save one file. Never fails: errors become
    /// `FileOutcome::Failed`.
    pub fn process_file(&self, input: &Path, policy: &NamingPolicy) -> FileOutcome {
        let output = policy.resolve(input);

        if should_skip(&output, self.config.force) {
            debug!(input = %input.display(), output = %output.display(), "output exists");
            return FileOutcome::Skipped { output };
        }

        match self.remove_and_save(input, &output) {
            Ok(()) => FileOutcome::Saved { output },
            Err(err) => {
                debug!(input = %input.display(), error = ?err, "processing failed");
                FileOutcome::Failed {
                    message: err.report(),
                }
            }
        }
    }

    fn remove_and_save(&self, input: &Path, output: &Path) -> Result<()> {
        let image = remove_background(&self.backends, self.config.method, input)?;
        save_png(&image, output)
    }
}

/// Encode fully before touching `output` so a failed encode leaves no file.
pub fn save_png(image: &RgbaImage, output: &Path) -> Result<()> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| BgRemoveError::ImageProcessing {
            path: output.display().to_string(),
            operation: "png encode".to_string(),
            source: Box::new(e),
        })?;

    fs::write(output, buffer.into_inner()).map_err(|e| BgRemoveError::FileSystem {
        path: output.to_path_buf(),
        operation: "write output".to_string(),
        source: e,
    })
}

/// `./output/a.png` is shown as `output/a.png`.
fn display_path(path: &Path) -> &Path {
    path.strip_prefix(".").unwrap_or(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_lines() {
        let saved = FileReport {
            input: PathBuf::from("./cat.jpg"),
            outcome: FileOutcome::Saved {
                output: PathBuf::from("output/cat_no_bg.png"),
            },
        };
        let skipped = FileReport {
            input: PathBuf::from("./cat.jpg"),
            outcome: FileOutcome::Skipped {
                output: PathBuf::from("output/cat_no_bg.png"),
            },
        };
        let failed = FileReport {
            input: PathBuf::from("./cat.jpg"),
            outcome: FileOutcome::Failed {
                message: "boom".to_string(),
            },
        };

        assert_eq!(saved.to_string(), "Saved: output/cat_no_bg.png");
        let saved_in_cwd = FileReport {
            input: PathBuf::from("./cat.jpg"),
            outcome: FileOutcome::Saved {
                output: PathBuf::from("./output/cat_no_bg.png"),
            },
        };
        assert_eq!(saved_in_cwd.to_string(), "Saved: output/cat_no_bg.png");
        assert_eq!(
            skipped.to_string(),
            "Skip cat.jpg: cat_no_bg.png exists (use --force to overwrite)"
        );
        assert_eq!(failed.to_string(), "Error processing cat.jpg: boom");
    }

    #[test]
    fn test_summary_counts() {
        let report = BatchReport {
            files: vec![
                FileReport {
                    input: PathBuf::from("a.png"),
                    outcome: FileOutcome::Saved {
                        output: PathBuf::from("a_no_bg.png"),
                    },
                },
                FileReport {
                    input: PathBuf::from("b.png"),
                    outcome: FileOutcome::Failed {
                        message: "x".to_string(),
                    },
                },
            ],
        };

        assert_eq!(report.to_string(), "Done: 1 saved, 0 skipped, 1 failed.");
    }
}
