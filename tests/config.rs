use std::env;
use std::time::Duration;

use cardinal_dds::{ChannelConfig, WireFormat};
use serial_test::serial;

const VARS: [&str; 6] = [
    "CARDINAL_DOMAIN_ID",
    "CARDINAL_PARTICIPANT_NAME",
    "CARDINAL_HISTORY_DEPTH",
    "CARDINAL_MAX_PAYLOAD",
    "CARDINAL_RECEIVE_TIMEOUT_MS",
    "CARDINAL_WIRE_FORMAT",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_overrides() {
    clear_env();
    assert_eq!(ChannelConfig::from_env(), ChannelConfig::default());

    let config = ChannelConfig::default();
    assert_eq!(config.domain_id, 0);
    assert_eq!(config.participant_name, "Cardinal_Participant");
    assert_eq!(config.history_depth, 100);
    assert_eq!(config.receive_timeout, Duration::ZERO);
    assert_eq!(config.wire_format, WireFormat::LengthPrefixed);
}

#[test]
#[serial]
fn test_every_override_is_applied() {
    clear_env();
    env::set_var("CARDINAL_DOMAIN_ID", "42");
    env::set_var("CARDINAL_PARTICIPANT_NAME", "Bridge_Participant");
    env::set_var("CARDINAL_HISTORY_DEPTH", "16");
    env::set_var("CARDINAL_MAX_PAYLOAD", "2048");
    env::set_var("CARDINAL_RECEIVE_TIMEOUT_MS", "250");
    env::set_var("CARDINAL_WIRE_FORMAT", "fixed");

    let config = ChannelConfig::from_env();
    clear_env();

    assert_eq!(config.domain_id, 42);
    assert_eq!(config.participant_name, "Bridge_Participant");
    assert_eq!(config.history_depth, 16);
    assert_eq!(config.max_payload_size, 2048);
    assert_eq!(config.receive_timeout, Duration::from_millis(250));
    assert_eq!(config.wire_format, WireFormat::Fixed);

    let container = config.container_config();
    assert_eq!(container.domain_id, 42);
    assert_eq!(container.participant_name, "Bridge_Participant");
    assert_eq!(container.history_depth, 16);
}

#[test]
#[serial]
fn test_invalid_overrides_keep_current_values() {
    clear_env();
    env::set_var("CARDINAL_DOMAIN_ID", "-1");
    env::set_var("CARDINAL_PARTICIPANT_NAME", "");
    env::set_var("CARDINAL_HISTORY_DEPTH", "abc");
    env::set_var("CARDINAL_MAX_PAYLOAD", "lots");
    env::set_var("CARDINAL_RECEIVE_TIMEOUT_MS", "1.5");
    env::set_var("CARDINAL_WIRE_FORMAT", "bogus");

    let config = ChannelConfig::from_env();
    clear_env();

    assert_eq!(config, ChannelConfig::default());
}

#[test]
#[serial]
fn test_overrides_apply_on_top_of_existing_values() {
    clear_env();
    env::set_var("CARDINAL_HISTORY_DEPTH", "nope");
    env::set_var("CARDINAL_WIRE_FORMAT", " Length-Prefixed ");

    let mut config = ChannelConfig {
        history_depth: 7,
        wire_format: WireFormat::Fixed,
        ..ChannelConfig::default()
    };
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.history_depth, 7);
    assert_eq!(config.wire_format, WireFormat::LengthPrefixed);
}

#[test]
#[serial]
fn test_zero_history_depth_clamps_to_one() {
    clear_env();
    env::set_var("CARDINAL_HISTORY_DEPTH", "0");

    let config = ChannelConfig::from_env();
    clear_env();

    assert_eq!(config.history_depth, 1);
}
