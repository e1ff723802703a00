pub mod collector;
pub mod error;
pub mod progress;
pub mod sequential;
pub mod status;
pub mod thread_dispatcher;

pub use collector::ProgressCollector;
pub use error::DispatchError;
pub use progress::SharedProgress;
pub use sequential::SequentialDispatcher;
pub use status::FullStatusReport;
pub use thread_dispatcher::{DispatchHandle, PeriodicReportGuard, TaskFn, ThreadDispatcher};
