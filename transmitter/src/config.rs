use sluice_config::load_config;
use sluice_config::shared::TransmitterConfig;

/// Loads the [`TransmitterConfig`] and validates it.
pub fn load_transmitter_config() -> anyhow::Result<TransmitterConfig> {
    let config = load_config::<TransmitterConfig>()?;
    config.validate()?;

    Ok(config)
}
