use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const OUTPUT_SUFFIX: &str = "_no_bg";
pub const OUTPUT_EXTENSION: &str = "png";

/// Where a cut-out is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingPolicy {
    /// `<dir>/<stem>_no_bg.png`
    Separate { dir: PathBuf },
    /// `<dir>/<stem>.png`, next to the input
    InPlace { dir: PathBuf },
}

impl NamingPolicy {
    pub fn output_dir(&self) -> &Path {
        match self {
            Self::Separate { dir } | Self::InPlace { dir } => dir,
        }
    }

    pub fn resolve(&self, input: &Path) -> PathBuf {
        match self {
            Self::Separate { dir } => {
                // pushed rather than `with_extension` so dotted stems survive
                let mut name = OsString::from(input.file_stem().unwrap_or_default());
                name.push(format!("{OUTPUT_SUFFIX}.{OUTPUT_EXTENSION}"));
                dir.join(name)
            }
            Self::InPlace { dir } => dir
                .join(input.file_name().unwrap_or_default())
                .with_extension(OUTPUT_EXTENSION),
        }
    }

    /// Groups of inputs that resolve to the same output path.
    pub fn collisions<'a>(&self, inputs: &'a [PathBuf]) -> Vec<(PathBuf, Vec<&'a Path>)> {
        let mut by_output: HashMap<PathBuf, Vec<&Path>> = HashMap::new();
        for input in inputs {
            by_output
                .entry(self.resolve(input))
                .or_default()
                .push(input.as_path());
        }

        let mut collisions = by_output
            .into_iter()
            .filter(|(_, inputs)| inputs.len() > 1)
            .collect::<Vec<_>>();
        collisions.sort_by(|a, b| a.0.cmp(&b.0));
        collisions
    }
}

/// True when writing `output` must be skipped to protect an existing file.
pub fn should_skip(output: &Path, force: bool) -> bool {
    !force && output.is_file()
}
