mod config;
mod countdown;
mod fio_binary;
mod job_file;
mod process;
mod progress;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::config::{BenchConfig, ConfigError};
    pub use crate::countdown::countdown_confirm;
    pub use crate::fio_binary::{
        benchmark_invocation, fio_path, fio_version, prepare_invocation, FIO_BENCH_FIO_PATH_ENV,
    };
    pub use crate::job_file::{format_duration, JobFileError, JobFileSummary, PrepareTarget};
    pub use crate::process::{Invocation, ProcessRunner};
    pub use crate::progress::{
        FioStatusParser, ProgressDisplay, ProgressMode, ProgressParser, ProgressSnapshot,
    };
    pub use crate::shutdown::{start_shutdown_listener, ShutdownHandle, ShutdownListener};
    pub use crate::types::TrialError;
}
