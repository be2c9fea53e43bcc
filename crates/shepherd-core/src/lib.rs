mod checker;
mod error;
mod graph;
mod logger;
mod ports;
mod process;
mod supervisor;
mod table;

pub use error::{Error, Result};
pub use graph::DepGraph;
pub use logger::Logger;
pub use ports::{PortListenerLookup, ProcfsPortLookup, Protocol};
pub use process::Pid;
pub use supervisor::{Supervisor, CHECK_INTERVAL};
pub use table::{ServiceState, ServiceTable};
