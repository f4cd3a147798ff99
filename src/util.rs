use sysinfo::System;

/// Hostname reported in message headers.
pub fn hostname() -> String {
    System::host_name().unwrap_or_else(|| String::from("unknown"))
}

/// First line of every outgoing message, e.g. `*host* (systemd)`.
pub fn message_header(host: &str, tag: &str) -> String {
    format!("*{host}* ({tag})")
}
