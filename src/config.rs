use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for the execution admission queue.
///
/// `limit` bounds how many executions may run concurrently; `max_queue_size`
/// bounds how many may wait for a slot. Both are fixed for the life of a
/// queue instance.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of concurrently running executions
    pub limit: usize,
    /// Maximum number of executions waiting in the backlog
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            max_queue_size: 50,
        }
    }
}

impl QueueConfig {
    pub fn new(limit: usize, max_queue_size: usize) -> Self {
        Self {
            limit,
            max_queue_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    pub listen_addr: SocketAddr,
    /// Admission queue sizing
    pub queue: QueueConfig,
    /// Optional JSON file to seed the inventory from at startup
    pub inventory_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:8470"
                .parse()
                .expect("default listen address is valid"),
            queue: QueueConfig::default(),
            inventory_path: None,
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_inventory_path(mut self, path: PathBuf) -> Self {
        self.inventory_path = Some(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_default() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.limit, 10);
        assert_eq!(cfg.max_queue_size, 50);
    }

    #[test]
    fn queue_config_new() {
        let cfg = QueueConfig::new(3, 7);
        assert_eq!(cfg.limit, 3);
        assert_eq!(cfg.max_queue_size, 7);
    }

    #[test]
    fn server_config_default() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:8470");
        assert_eq!(cfg.queue.limit, 10);
        assert!(cfg.inventory_path.is_none());
    }

    #[test]
    fn server_config_builders() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let cfg = ServerConfig::new(addr)
            .with_queue(QueueConfig::new(2, 4))
            .with_inventory_path(PathBuf::from("/etc/muster/inventory.json"));
        assert_eq!(cfg.listen_addr, addr);
        assert_eq!(cfg.queue.limit, 2);
        assert_eq!(cfg.queue.max_queue_size, 4);
        assert_eq!(
            cfg.inventory_path.as_deref(),
            Some(std::path::Path::new("/etc/muster/inventory.json"))
        );
    }
}
