pub mod cells;
pub mod error;
pub mod format;
pub mod generator;
pub mod kernel;

pub use cells::split_code_into_cells;
pub use error::{NotebookError, Result};
pub use format::{Cell, Notebook, Output, outputs_from_execution};
pub use generator::{
    NotebookGenerator, NotebookMetadata, NotebookRequest, NotebookSummary, read_notebook,
    relative_figure_path,
};
pub use kernel::{Kernel, KernelSpec};
