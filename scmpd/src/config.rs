use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, File};
use serde::Deserialize;

/// Server configuration, loaded once at startup and never mutated
/// afterwards (spec.md §3, "Server configuration").
#[derive(Debug, Clone, Deserialize)]
pub struct ScmpdConfig {
    #[serde(rename = "UpdaterProgram")]
    pub updater_program: PathBuf,
    #[serde(rename = "SSHServer")]
    pub ssh_server: SshServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshServerConfig {
    #[serde(rename = "ListenAddress")]
    pub listen_address: String,
    #[serde(rename = "ListenPort")]
    pub listen_port: u16,
    #[serde(rename = "SSHPrivKeyFile")]
    pub ssh_priv_key_file: PathBuf,
    #[serde(rename = "AuthorizedUser")]
    pub authorized_user: String,
    #[serde(rename = "AuthorizedKeys")]
    pub authorized_keys: Vec<String>,
}

impl ScmpdConfig {
    /// The listen address, with IPv6 literals wrapped in brackets, as
    /// required by spec.md §4.1's "Construct the listen address".
    pub fn listen_socket_addr_string(&self) -> String {
        let addr = &self.ssh_server.listen_address;
        if addr.contains(':') && !addr.starts_with('[') {
            format!("[{}]:{}", addr, self.ssh_server.listen_port)
        } else {
            format!("{}:{}", addr, self.ssh_server.listen_port)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ssh_server.listen_port < 1024 {
            bail!(
                "SSHServer.ListenPort must be >= 1024, got {}",
                self.ssh_server.listen_port
            );
        }
        if self.ssh_server.authorized_user.is_empty() {
            bail!("SSHServer.AuthorizedUser must not be empty");
        }
        if self.ssh_server.authorized_keys.is_empty() {
            bail!("SSHServer.AuthorizedKeys must contain at least one key");
        }
        Ok(())
    }
}

/// Load and validate the YAML config file at `path`.
///
/// Any failure here (missing file, malformed YAML, a field failing
/// validation) is a fatal config error per spec.md §7.
pub fn load_config(path: &Path) -> Result<ScmpdConfig> {
    let path_str = path
        .to_str()
        .context("config path is not valid UTF-8")?;

    let config: ScmpdConfig = Config::builder()
        .add_source(File::with_name(path_str))
        .build()
        .with_context(|| format!("failed to read config file {}", path.display()))?
        .try_deserialize()
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    const VALID: &str = r#"
UpdaterProgram: /opt/scmpd/scmpd-updater
SSHServer:
  ListenAddress: "0.0.0.0"
  ListenPort: 2022
  SSHPrivKeyFile: /etc/scmpd/host_ed25519
  AuthorizedUser: deployer
  AuthorizedKeys:
    - "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHV note"
"#;

    #[test]
    fn loads_valid_config() {
        let f = write_config(VALID);
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.ssh_server.authorized_user, "deployer");
        assert_eq!(cfg.ssh_server.listen_port, 2022);
        assert_eq!(cfg.listen_socket_addr_string(), "0.0.0.0:2022");
    }

    #[test]
    fn rejects_low_port() {
        let f = write_config(
            r#"
UpdaterProgram: /opt/scmpd/scmpd-updater
SSHServer:
  ListenAddress: "0.0.0.0"
  ListenPort: 22
  SSHPrivKeyFile: /etc/scmpd/host_ed25519
  AuthorizedUser: deployer
  AuthorizedKeys: ["ssh-ed25519 AAA note"]
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn wraps_ipv6_listen_address() {
        let f = write_config(
            r#"
UpdaterProgram: /opt/scmpd/scmpd-updater
SSHServer:
  ListenAddress: "::"
  ListenPort: 2022
  SSHPrivKeyFile: /etc/scmpd/host_ed25519
  AuthorizedUser: deployer
  AuthorizedKeys: ["ssh-ed25519 AAA note"]
"#,
        );
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.listen_socket_addr_string(), "[::]:2022");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/scmpd.yaml")).is_err());
    }
}
