use std::{fs, io};

use crate::process::Pid;

/// Transport protocol of a probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn tables(self) -> [&'static str; 2] {
        match self {
            Protocol::Tcp => ["/proc/net/tcp", "/proc/net/tcp6"],
            Protocol::Udp => ["/proc/net/udp", "/proc/net/udp6"],
        }
    }

    // Socket states in the /proc/net tables: a TCP listener is in LISTEN,
    // a bound UDP socket shows up as unconnected (TCP_CLOSE).
    fn listening_state(self) -> &'static str {
        match self {
            Protocol::Tcp => "0A",
            Protocol::Udp => "07",
        }
    }
}

/// Resolve the pid of the process listening on a port.
///
/// The contract: given a protocol and a decimal port, return the owning pid
/// if some process is listening on it, `None` otherwise.
pub trait PortListenerLookup: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the underlying listener table cannot be read.
    fn listener_pid(&self, proto: Protocol, port: &str) -> io::Result<Option<Pid>>;
}

/// Lookup backed by the Linux proc filesystem: the socket tables under
/// `/proc/net` give the inode of the listening socket, and `/proc/<pid>/fd`
/// gives the process holding it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsPortLookup;

impl PortListenerLookup for ProcfsPortLookup {
    fn listener_pid(&self, proto: Protocol, port: &str) -> io::Result<Option<Pid>> {
        let Ok(port) = port.parse::<u16>() else {
            return Ok(None);
        };

        for table in proto.tables() {
            let text = match fs::read_to_string(table) {
                Ok(text) => text,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if let Some(inode) = listener_inode(&text, proto, port) {
                return pid_owning_socket(inode);
            }
        }

        Ok(None)
    }
}

/// Scan one socket table for a listening socket bound to `port`, returning
/// its inode. Table lines look like
/// `sl local_address rem_address st ... uid timeout inode ...`, with the
/// local port in hex after the colon.
fn listener_inode(table: &str, proto: Protocol, port: u16) -> Option<u64> {
    for line in table.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }

        let Some((_, port_hex)) = fields[1].rsplit_once(':') else {
            continue;
        };
        let Ok(local_port) = u16::from_str_radix(port_hex, 16) else {
            continue;
        };
        if local_port != port || !fields[3].eq_ignore_ascii_case(proto.listening_state()) {
            continue;
        }

        if let Ok(inode) = fields[9].parse() {
            return Some(inode);
        }
    }
    None
}

/// Walk `/proc/<pid>/fd` entries looking for the process whose fd table
/// holds `socket:[inode]`. Processes we cannot inspect are skipped.
fn pid_owning_socket(inode: u64) -> io::Result<Option<Pid>> {
    let needle = format!("socket:[{inode}]");

    for entry in fs::read_dir("/proc")? {
        let entry = entry?;
        let Some(pid) = entry.file_name().to_str().and_then(|name| name.parse().ok()) else {
            continue;
        };
        let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(target) = fs::read_link(fd.path()) {
                if target.to_str() == Some(needle.as_str()) {
                    return Ok(Some(pid));
                }
            }
        }
    }

    Ok(None)
}
