use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::naming::NamingPolicy;

/// Which background-removal backend to use.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
    /// Learned model if available, otherwise GrabCut
    #[default]
    Auto,
    /// U²-Net style ONNX matting model
    #[value(alias = "rembg")]
    LearnedModel,
    /// OpenCV GrabCut seeded with a centered rectangle
    #[value(alias = "grabcut")]
    Classical,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::LearnedModel => "learned-model",
            Self::Classical => "classical",
        })
    }
}

#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about = "Remove the background of every image in the current directory",
    long_about = None
)]
pub struct Config {
    /// Output directory, ignored with --inplace
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Background-removal backend
    #[arg(long, value_enum, default_value_t = Method::Auto)]
    pub method: Method,

    /// Overwrite existing outputs
    #[arg(long)]
    pub force: bool,

    /// Write `<stem>.png` next to the input instead of using --output-dir
    #[arg(long)]
    pub inplace: bool,

    /// ONNX model used by the learned-model backend
    #[arg(short, long, default_value = "~/.u2net/u2net.onnx")]
    pub model: String,

    /// GPU used by the CUDA / TensorRT execution providers
    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// -v: info, -vv: debug, -vvv: trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            method: Method::Auto,
            force: false,
            inplace: false,
            model: "~/.u2net/u2net.onnx".to_string(),
            device_id: 0,
            verbose: 0,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    /// Naming policy for a run rooted at `work_dir`.
    ///
    /// A relative `--output-dir` is taken relative to `work_dir`.
    pub fn naming_policy(&self, work_dir: &Path) -> NamingPolicy {
        if self.inplace {
            NamingPolicy::InPlace {
                dir: work_dir.to_path_buf(),
            }
        } else {
            NamingPolicy::Separate {
                dir: work_dir.join(&self.output_dir),
            }
        }
    }

    /// Model path with a leading `~` expanded.
    pub fn model_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.model).into_owned())
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli() {
        let parsed = Config::parse_from(["bgremove-batch"]);
        let default = Config::default();

        assert_eq!(parsed.output_dir, default.output_dir);
        assert_eq!(parsed.method, Method::Auto);
        assert!(!parsed.force);
        assert!(!parsed.inplace);
        assert_eq!(parsed.model, default.model);
    }

    #[test]
    fn test_method_aliases() {
        let config = Config::parse_from(["bgremove-batch", "--method", "grabcut"]);
        assert_eq!(config.method, Method::Classical);

        let config = Config::parse_from(["bgremove-batch", "--method", "rembg"]);
        assert_eq!(config.method, Method::LearnedModel);

        let config = Config::parse_from(["bgremove-batch", "--method", "learned-model"]);
        assert_eq!(config.method, Method::LearnedModel);
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert!(Config::try_parse_from(["bgremove-batch", "--method", "magic"]).is_err());
    }

    #[test]
    fn test_inplace_ignores_output_dir() {
        let config = Config::parse_from(["bgremove-batch", "-o", "elsewhere", "--inplace"]);
        let policy = config.naming_policy(Path::new("/work"));

        assert_eq!(
            policy,
            NamingPolicy::InPlace {
                dir: PathBuf::from("/work")
            }
        );
    }

    #[test]
    fn test_relative_output_dir_joins_work_dir() {
        let config = Config::parse_from(["bgremove-batch", "--output-dir", "out"]);
        let policy = config.naming_policy(Path::new("/work"));

        assert_eq!(
            policy,
            NamingPolicy::Separate {
                dir: PathBuf::from("/work/out")
            }
        );
    }

    #[test]
    fn test_every_flag_has_help() {
        use clap::CommandFactory;

        let command = Config::command();
        for arg in command.get_arguments() {
            assert!(
                arg.get_help().is_some(),
                "--{} has no help text",
                arg.get_id()
            );
        }
    }

    #[test]
    fn test_verbosity_filter() {
        let config = Config::parse_from(["bgremove-batch", "-vv"]);
        assert_eq!(config.log_filter(), "debug");
    }
}
