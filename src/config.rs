use std::net::SocketAddr;
use std::path::PathBuf;

const DATABASE_FILE: &str = "jobsync.redb";

/// Process-wide settings, read once at startup and passed into constructors.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP gateway binds to
    pub listen_addr: SocketAddr,
    /// Parent directory of every repository checkout
    pub build_root: PathBuf,
    /// Directory holding the record database
    pub db_root: PathBuf,
    /// Remote name used when a create request does not name one
    pub default_remote: String,
    /// Shell used to interpret task commands (`<shell> -c <command>`)
    pub shell: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:8080"
                .parse()
                .expect("default listen address is valid"),
            build_root: PathBuf::from("builds"),
            db_root: PathBuf::from("db"),
            default_remote: "origin".to_string(),
            shell: "sh".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr, build_root: PathBuf, db_root: PathBuf) -> Self {
        Self {
            listen_addr,
            build_root,
            db_root,
            ..Default::default()
        }
    }

    pub fn with_default_remote(mut self, remote: impl Into<String>) -> Self {
        self.default_remote = remote.into();
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Location of the redb file inside the db root.
    pub fn database_path(&self) -> PathBuf {
        self.db_root.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_default() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.build_root, PathBuf::from("builds"));
        assert_eq!(cfg.db_root, PathBuf::from("db"));
        assert_eq!(cfg.default_remote, "origin");
        assert_eq!(cfg.shell, "sh");
    }

    #[test]
    fn server_config_new() {
        let addr: SocketAddr = "10.0.0.1:9000".parse().unwrap();
        let cfg = ServerConfig::new(addr, PathBuf::from("/srv/builds"), PathBuf::from("/srv/db"));
        assert_eq!(cfg.listen_addr, addr);
        assert_eq!(cfg.build_root, PathBuf::from("/srv/builds"));
        assert_eq!(cfg.db_root, PathBuf::from("/srv/db"));
        assert_eq!(cfg.default_remote, "origin");
    }

    #[test]
    fn server_config_builders() {
        let cfg = ServerConfig::default()
            .with_default_remote("upstream")
            .with_shell("bash");
        assert_eq!(cfg.default_remote, "upstream");
        assert_eq!(cfg.shell, "bash");
    }

    #[test]
    fn database_path_lives_under_db_root() {
        let cfg = ServerConfig {
            db_root: PathBuf::from("/var/lib/jobsync"),
            ..Default::default()
        };
        assert_eq!(
            cfg.database_path(),
            PathBuf::from("/var/lib/jobsync/jobsync.redb")
        );
    }
}
