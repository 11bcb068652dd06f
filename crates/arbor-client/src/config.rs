//! Connection configuration for the directory service.

use serde::Deserialize;

/// Default application port of the directory service.
pub const DEFAULT_PORT: u16 = 9082;

/// Well-known administrative account used when no username is given.
pub const DEFAULT_USERNAME: &str = "itim manager";

/// How to reach and authenticate against a directory service instance.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Distinguished name of the directory root, e.g. `ou=demo,dc=com`.
    /// The root container path `//` resolves to this value.
    pub root_dn: String,

    #[serde(default = "default_username")]
    pub username: String,

    pub password: String,

    /// When set, remote faults, connectivity failures and version-gate
    /// refusals are reported as non-zero return codes instead of errors.
    /// Fatal faults abort regardless.
    #[serde(default)]
    pub tolerant: bool,

    /// Accept invalid TLS certificates. Lab appliances commonly run with
    /// self-signed certificates; leave this off anywhere else.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl DirectoryConfig {
    /// Base URL of the remote object API.
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.hostname, self.port)
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("root_dn", &self.root_dn)
            .field("username", &self.username)
            .field("password", &"***")
            .field("tolerant", &self.tolerant)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}
