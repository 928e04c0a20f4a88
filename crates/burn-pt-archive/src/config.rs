use std::path::PathBuf;

use crate::order::OrderStrategy;

/// Arguments for opening a PyTorch archive.
///
/// # Examples
///
/// ```no_run
/// use burn_pt_archive::{LoadArgs, OrderStrategy, PtArchive};
///
/// let args = LoadArgs::new("yolov5s.pt".into())
///     .with_root("yolov5s")
///     .with_strategy(OrderStrategy::LengthPrefixedToken);
///
/// let mut archive = PtArchive::open_with(args).expect("Failed to open archive");
/// let first = archive.next_tensor().expect("Archive holds no tensor");
/// ```
#[derive(Debug, Clone)]
pub struct LoadArgs {
    /// The path to the file to load.
    pub file: PathBuf,

    /// Top level directory of the archive, detected when not set.
    pub root: Option<String>,

    /// Order strategy to use instead of trying them all.
    pub strategy: Option<OrderStrategy>,
}

impl LoadArgs {
    /// Create a new `LoadArgs` instance.
    ///
    /// # Arguments
    ///
    /// * `file` - The path to the file to load.
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            root: None,
            strategy: None,
        }
    }

    /// Set the top level directory holding `data.pkl` and `data/`.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory name, with or without a trailing `/`.
    pub fn with_root(mut self, root: &str) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Force a single order strategy. Fallback to the other strategies is disabled.
    pub fn with_strategy(mut self, strategy: OrderStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

impl From<PathBuf> for LoadArgs {
    fn from(val: PathBuf) -> Self {
        LoadArgs::new(val)
    }
}

impl From<String> for LoadArgs {
    fn from(val: String) -> Self {
        LoadArgs::new(val.into())
    }
}

impl From<&str> for LoadArgs {
    fn from(val: &str) -> Self {
        LoadArgs::new(val.into())
    }
}
