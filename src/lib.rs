pub mod barrier;
pub mod config;
pub mod logging;
pub mod notify;
pub mod pool;
pub mod routing;
pub mod semaphore;
pub mod thread_handle;
pub mod wait_queue;

pub use barrier::{Barrier, BarrierError};
pub use config::ToolkitConfig;
pub use notify::{Chain, ChainError, Operation, Publication, SubscriberCallback};
pub use pool::{PoolError, ThreadPool};
pub use routing::{RouteKey, RouteRecord, RoutingError, RoutingTable};
pub use semaphore::Semaphore;
pub use thread_handle::{ThreadHandle, ThreadHandleError};
pub use wait_queue::WaitQueue;
