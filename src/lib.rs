pub mod batch;
pub mod capabilities;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod errors;
pub mod grabcut;
pub mod model;
pub mod naming;
pub mod traits;

mod imageops_ai;

pub mod mocks;

pub use batch::{BatchRemover, BatchReport, FileOutcome, FileReport};
pub use capabilities::{Backends, Capabilities};
pub use config::{Config, Method};
pub use errors::{BgRemoveError, Result};
pub use model::U2NetModel;
pub use naming::NamingPolicy;
pub use traits::*;
