use anyhow::{Context, Result, bail};
use clap::Parser;
use confab_core::IceServerConfig;
use confab_server::{
    AllowAnonymous, JwtVerifier, SessionConfig, TokenVerifier, TransportConfig,
};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "confab", version, about = "Realtime collaboration server")]
pub struct Cli {
    /// Address the HTTP/websocket listener binds to.
    #[arg(long, env = "CONFAB_LISTEN", default_value = "0.0.0.0:4000")]
    pub listen: SocketAddr,

    #[arg(
        long = "stun-url",
        env = "CONFAB_STUN_URLS",
        value_delimiter = ',',
        default_value = "stun:stun.l.google.com:19302"
    )]
    pub stun_urls: Vec<String>,

    #[arg(long, env = "CONFAB_TURN_URL")]
    pub turn_url: Option<String>,

    #[arg(long, env = "CONFAB_TURN_USERNAME", requires = "turn_url")]
    pub turn_username: Option<String>,

    #[arg(long, env = "CONFAB_TURN_CREDENTIAL", requires = "turn_url")]
    pub turn_credential: Option<String>,

    /// RS256 public key as KID=PATH to a PEM file. Repeatable.
    #[arg(
        long = "jwt-key",
        env = "CONFAB_JWT_KEYS",
        value_delimiter = ',',
        value_parser = parse_pair
    )]
    pub jwt_keys: Vec<(String, String)>,

    /// HS256 shared secret as KID=SECRET. Development only.
    #[arg(long = "jwt-secret", value_parser = parse_pair)]
    pub jwt_secrets: Vec<(String, String)>,

    /// Accept unauthenticated connections when no keys are configured.
    #[arg(long, env = "CONFAB_ALLOW_ANONYMOUS")]
    pub allow_anonymous: bool,

    /// Seconds a server re-offer waits for its answer. 0 waits forever.
    #[arg(long, env = "CONFAB_NEGOTIATION_TIMEOUT_SECS", default_value_t = 10)]
    pub negotiation_timeout_secs: u64,

    /// Fallback log filter when RUST_LOG is unset.
    #[arg(long, env = "CONFAB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((kid, value)) if !kid.is_empty() && !value.is_empty() => {
            Ok((kid.to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KID=VALUE, got '{raw}'")),
    }
}

impl Cli {
    pub fn transport_config(&self) -> TransportConfig {
        let mut ice_servers = Vec::new();
        if !self.stun_urls.is_empty() {
            ice_servers.push(IceServerConfig {
                urls: self.stun_urls.clone(),
                username: None,
                credential: None,
            });
        }
        if let Some(url) = &self.turn_url {
            ice_servers.push(IceServerConfig {
                urls: vec![url.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            });
        }
        TransportConfig { ice_servers }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            negotiation_timeout: match self.negotiation_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn verifier(&self) -> Result<Arc<dyn TokenVerifier>> {
        if self.jwt_keys.is_empty() && self.jwt_secrets.is_empty() {
            if !self.allow_anonymous {
                bail!("no --jwt-key or --jwt-secret configured; pass --allow-anonymous to run open");
            }
            return Ok(Arc::new(AllowAnonymous));
        }

        let mut verifier = JwtVerifier::new();
        for (kid, path) in &self.jwt_keys {
            let path = PathBuf::from(path);
            let pem = fs::read(&path)
                .with_context(|| format!("Failed to read key {} from {}", kid, path.display()))?;
            verifier = verifier
                .with_rsa_pem(kid.as_str(), &pem)
                .with_context(|| format!("Failed to load key {kid}"))?;
        }
        for (kid, secret) in &self.jwt_secrets {
            verifier = verifier.with_secret(kid.as_str(), secret.as_bytes());
        }
        Ok(Arc::new(verifier))
    }
}
