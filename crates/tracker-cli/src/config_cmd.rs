//! `config [key [value]]` (spec §4.11, §6): print the whole config, read
//! one key, or write one key.

use anyhow::{Result, bail};
use tracker_config::{Config, paths};

pub fn config(key: Option<String>, value: Option<String>) -> Result<()> {
    let path = paths::config_path();

    match (key, value) {
        (None, None) => {
            let config = Config::load_or_default(&path);
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        (Some(key), None) => {
            let config = Config::load_or_default(&path);
            match config.get_key(&key) {
                Some(value) => println!("{value}"),
                None => bail!("unknown config key '{key}'"),
            }
        }
        (Some(key), Some(value)) => {
            let mut config = Config::load_or_default(&path);
            config.set_key(&key, &value)?;
            config.save(&path)?;
            println!("Set {key} = {value}");
        }
        (None, Some(_)) => unreachable!("clap requires a key before a value"),
    }
    Ok(())
}
