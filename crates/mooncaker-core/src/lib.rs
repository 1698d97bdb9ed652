pub mod broker;
pub mod console;
pub mod error;
pub mod key;
pub mod notify;
pub mod supervisor;

pub use broker::KeyBroker;
pub use console::{CommandError, CommandSpec, Console};
pub use error::CoreError;
pub use key::{
    CallerSink, GuardedSink, KeyError, KeyQueue, KeyQueueSender, KeySink, KeySource, KeyStore,
};
pub use notify::{
    LogNotifier, Notifier, NotifierHandle, NotifyError, key_request_notice, suggestion_notice,
};
pub use supervisor::{ControllerConfig, Restart, SupervisorConfig, WorkerPolicy, WorkerSupervisor};
