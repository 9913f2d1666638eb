use serde::{Deserialize, Serialize};

/// Operational limits and nameserver sources for the asynchronous resolver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Ceiling on simultaneously open query sockets.
    #[serde(default = "default_fd_limit")]
    pub fd_limit: usize,

    /// Seconds a dispatched query may stay unanswered.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_port")]
    pub port: u16,

    /// One literal address per line; read in preference to `resolv_conf`.
    #[serde(default = "default_servers_file")]
    pub servers_file: String,

    /// System resolver file; only `nameserver <addr>` lines are used.
    #[serde(default = "default_resolv_conf")]
    pub resolv_conf: String,

    /// When non-empty, used instead of either file.
    #[serde(default)]
    pub nameservers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fd_limit: default_fd_limit(),
            timeout: default_timeout(),
            port: default_port(),
            servers_file: default_servers_file(),
            resolv_conf: default_resolv_conf(),
            nameservers: vec![],
        }
    }
}

fn default_fd_limit() -> usize {
    64
}

fn default_timeout() -> u64 {
    30
}

fn default_port() -> u16 {
    53
}

fn default_servers_file() -> String {
    "/etc/firedns.conf".to_string()
}

fn default_resolv_conf() -> String {
    "/etc/resolv.conf".to_string()
}
