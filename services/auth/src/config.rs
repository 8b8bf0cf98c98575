//! Process configuration not owned by a specific component

use anyhow::Result;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the service listens on
    pub bind_address: String,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `AUTH_BIND_ADDRESS`: Listen address (default: "0.0.0.0:3000")
    pub fn from_env() -> Result<Self> {
        let bind_address =
            std::env::var("AUTH_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        if bind_address.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("AUTH_BIND_ADDRESS is not a socket address: {}", bind_address);
        }

        Ok(ServerConfig { bind_address })
    }
}

/// Administrator seeded at startup
#[derive(Clone)]
pub struct BootstrapAdminConfig {
    pub phone: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for BootstrapAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdminConfig")
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

impl BootstrapAdminConfig {
    /// Read the bootstrap administrator, if configured
    ///
    /// # Environment Variables
    /// - `ADMIN_PHONE`: Phone number of the administrator
    /// - `ADMIN_PASSWORD`: Initial password
    /// - `ADMIN_NAME`: Display name (default: "Administrator")
    pub fn from_env() -> Option<Self> {
        let phone = std::env::var("ADMIN_PHONE").ok().filter(|s| !s.is_empty())?;
        let password = std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty())?;
        let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());

        Some(BootstrapAdminConfig {
            phone,
            password,
            name,
        })
    }
}
