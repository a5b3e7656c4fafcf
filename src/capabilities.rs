use std::fmt;

use tracing::debug;

use crate::config::Config;
use crate::model::U2NetModel;
use crate::traits::{InteractiveSegmenter, MattingModel};

/// Which backends are usable for this run. Computed once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub learned_model: bool,
    pub classical: bool,
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Available backends: {} {}",
            if self.learned_model { "learned-model" } else { "-" },
            if self.classical { "classical" } else { "-" },
        )
    }
}

/// Backend instances that survived probing.
#[derive(Default)]
pub struct Backends {
    pub learned_model: Option<Box<dyn MattingModel>>,
    pub classical: Option<Box<dyn InteractiveSegmenter>>,
}

impl Backends {
    pub fn new(
        learned_model: Option<Box<dyn MattingModel>>,
        classical: Option<Box<dyn InteractiveSegmenter>>,
    ) -> Self {
        Self {
            learned_model,
            classical,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Try to bring up every backend. A backend that fails for any reason is
    /// simply absent; the reason only reaches the debug log.
    pub fn probe(config: &Config) -> Self {
        let model_path = config.model_path();
        let learned_model = match U2NetModel::new(&model_path, config.device_id) {
            Ok(model) => Some(Box::new(model) as Box<dyn MattingModel>),
            Err(err) => {
                debug!(
                    path = %model_path.display(),
                    error = %err.report(),
                    "learned-model backend unavailable"
                );
                None
            }
        };

        Self::new(learned_model, probe_classical())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            learned_model: self.learned_model.is_some(),
            classical: self.classical.is_some(),
        }
    }
}

#[cfg(feature = "opencv")]
fn probe_classical() -> Option<Box<dyn InteractiveSegmenter>> {
    match crate::grabcut::OpenCvSegmenter::probe() {
        Ok(segmenter) => Some(Box::new(segmenter)),
        Err(err) => {
            debug!(error = %err.report(), "classical backend unavailable");
            None
        }
    }
}

#[cfg(not(feature = "opencv"))]
fn probe_classical() -> Option<Box<dyn InteractiveSegmenter>> {
    debug!("classical backend unavailable: built without the `opencv` feature");
    None
}
