// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// MQTT bridge

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use dsc_keybus_bridge::{
    Bridge, BridgeConfig, DiscoveryConfig, HostLink, MonotonicClock, RumqttTransport,
    SimulatedPanel,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "dsc2mqtt")]
#[command(about = "Bridge between a DSC keybus alarm panel and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    mqtt: MqttToml,
    panel: PanelToml,
    #[serde(default)]
    bridge: BridgeToml,
    #[serde(default)]
    keybus: KeybusToml,
    #[serde(default)]
    discovery: DiscoveryToml,
    #[serde(default, deserialize_with = "deserialize_zone_names")]
    zone_names: HashMap<u32, String>,
}

fn deserialize_zone_names<'de, D>(deserializer: D) -> Result<HashMap<u32, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let string_map: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    string_map
        .into_iter()
        .map(|(k, v)| {
            k.parse::<u32>()
                .map(|id| (id, v))
                .map_err(|_| serde::de::Error::custom(format!("invalid zone number: {k}")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default = "default_topic_prefix")]
    topic_prefix: String,
    #[serde(default = "default_keep_alive")]
    keep_alive_secs: u64,
    #[serde(default = "default_connect_timeout")]
    connect_timeout_ms: u64,
}

fn default_client_id() -> String {
    "alarmsys".to_string()
}
fn default_topic_prefix() -> String {
    "alarmsys".to_string()
}
fn default_keep_alive() -> u64 {
    60
}
fn default_connect_timeout() -> u64 {
    5000
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    #[serde(default)]
    access_code: String,
    #[serde(default = "default_partition")]
    default_partition: u8,
    #[serde(default = "default_partitions")]
    partitions: u8,
    #[serde(default = "default_zone_groups")]
    zone_groups: u8,
    #[serde(default = "default_write_queue_capacity")]
    write_queue_capacity: usize,
}

fn default_partition() -> u8 {
    1
}
fn default_partitions() -> u8 {
    1
}
fn default_zone_groups() -> u8 {
    8
}
fn default_write_queue_capacity() -> usize {
    4
}

#[derive(Debug, Deserialize)]
struct BridgeToml {
    #[serde(default = "default_retry_interval")]
    retry_interval_ms: u32,
    #[serde(default = "default_tick_interval")]
    tick_interval_ms: u64,
}

impl Default for BridgeToml {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_retry_interval() -> u32 {
    2000
}
fn default_tick_interval() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
struct KeybusToml {
    #[serde(default = "default_exit_delay_polls")]
    exit_delay_polls: u32,
}

impl Default for KeybusToml {
    fn default() -> Self {
        Self { exit_delay_polls: default_exit_delay_polls() }
    }
}

fn default_exit_delay_polls() -> u32 {
    30_000
}

#[derive(Debug, Default, Deserialize)]
struct DiscoveryToml {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    node_id: Option<String>,
    #[serde(default)]
    pgm_outputs: u8,
}

fn build_bridge_config(config: &Config) -> Result<BridgeConfig> {
    let (host, port) = parse_mqtt_url(&config.mqtt.url)?;

    let defaults = DiscoveryConfig::default();
    let discovery = DiscoveryConfig {
        enabled: config.discovery.enabled,
        prefix: config.discovery.prefix.clone().unwrap_or(defaults.prefix),
        node_id: config.discovery.node_id.clone().unwrap_or(defaults.node_id),
        pgm_outputs: config.discovery.pgm_outputs,
    };

    let mut builder = BridgeConfig::builder()
        .client_id(&config.mqtt.client_id)
        .broker(host, port)
        .keep_alive_secs(config.mqtt.keep_alive_secs)
        .connect_timeout_ms(config.mqtt.connect_timeout_ms)
        .topic_prefix(&config.mqtt.topic_prefix)
        .access_code(&config.panel.access_code)
        .default_partition(config.panel.default_partition)
        .partitions(config.panel.partitions)
        .zone_groups(config.panel.zone_groups)
        .write_queue_capacity(config.panel.write_queue_capacity)
        .retry_interval_ms(config.bridge.retry_interval_ms)
        .discovery(discovery);
    if let (Some(username), Some(password)) = (&config.mqtt.username, &config.mqtt.password) {
        builder = builder.credentials(username, password);
    }
    for (zone, name) in &config.zone_names {
        builder = builder.zone_name(*zone, name);
    }

    let bridge_config = builder.build();
    bridge_config.validate().context("Invalid bridge configuration")?;
    Ok(bridge_config)
}

fn load_config(path: &str) -> Result<Config> {
    let config_text = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&config_text).context("Failed to parse config file")
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=dsc_keybus_bridge=debug).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    let mut bridge_config = build_bridge_config(&config)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        info!(
            "Bridging keybus to MQTT broker at {}:{} (prefix {})",
            bridge_config.broker_host, bridge_config.broker_port, bridge_config.topic_prefix
        );
        let panel = SimulatedPanel::new(
            bridge_config.partitions,
            bridge_config.access_code.as_str(),
            config.keybus.exit_delay_polls,
        );
        let mut bridge = Bridge::new(
            &bridge_config,
            RumqttTransport::default(),
            panel,
            HostLink::new(),
            MonotonicClock::new(),
        )?;

        let mut ticker = interval(Duration::from_millis(config.bridge.tick_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    bridge.tick().await;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down...");
                    break false;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                    break false;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading config and restarting connections...");
                    break true;
                }
            }
        };

        if let Err(e) = bridge.shutdown().await {
            warn!("Error disconnecting from broker: {e}");
        }

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        info!("Reloading config from {}", cli.config);
        match load_config(&cli.config) {
            Ok(new_config) => match build_bridge_config(&new_config) {
                Ok(new_bridge_config) => {
                    config = new_config;
                    bridge_config = new_bridge_config;
                    info!("Config reloaded successfully");
                }
                Err(e) => warn!("Invalid bridge config in new config, keeping previous: {e:#}"),
            },
            Err(e) => warn!("Failed to reload config, keeping previous: {e:#}"),
        }

        info!("Reconnecting...");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str
        .parse()
        .context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}
