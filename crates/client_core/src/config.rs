use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use shared::domain::LayoutId;

use crate::store::DEFAULT_LAYOUT;

pub const SETTINGS_FILE: &str = "sketch.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSettings {
    pub message: String,
    pub kind: String,
    pub ok_label: String,
    pub cancel_label: String,
    pub title: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            message: "Are you sure?".into(),
            kind: "warning".into(),
            ok_label: "Delete".into(),
            cancel_label: "Keep".into(),
            title: "Delete".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub layout_id: LayoutId,
    pub event_buffer: usize,
    pub bootstrap_refresh: bool,
    pub prompt: PromptSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            layout_id: LayoutId::new(DEFAULT_LAYOUT),
            event_buffer: 1024,
            bootstrap_refresh: true,
            prompt: PromptSettings::default(),
        }
    }
}

/// Defaults, then `sketch.toml` in the working directory, then `APP__*` variables.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();
    if Path::new(SETTINGS_FILE).exists() {
        apply_file(&mut settings, Path::new(SETTINGS_FILE))?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();
    apply_file(&mut settings, path)?;
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, path: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    apply_toml(settings, &raw)
        .with_context(|| format!("invalid settings file '{}'", path.display()))
}

fn apply_toml(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(raw)?;

    if let Some(v) = file_cfg.get("layout_id").and_then(toml::Value::as_str) {
        settings.layout_id = LayoutId::new(v);
    }
    if let Some(v) = file_cfg.get("event_buffer").and_then(toml::Value::as_integer) {
        settings.event_buffer = usize::try_from(v).context("event_buffer must be positive")?;
    }
    if let Some(v) = file_cfg
        .get("bootstrap_refresh")
        .and_then(toml::Value::as_bool)
    {
        settings.bootstrap_refresh = v;
    }
    if let Some(prompt) = file_cfg.get("prompt").and_then(toml::Value::as_table) {
        let text = |key: &str| prompt.get(key).and_then(toml::Value::as_str).map(str::to_string);
        if let Some(v) = text("message") {
            settings.prompt.message = v;
        }
        if let Some(v) = text("kind") {
            settings.prompt.kind = v;
        }
        if let Some(v) = text("ok_label") {
            settings.prompt.ok_label = v;
        }
        if let Some(v) = text("cancel_label") {
            settings.prompt.cancel_label = v;
        }
        if let Some(v) = text("title") {
            settings.prompt.title = v;
        }
    }
    Ok(())
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("APP__LAYOUT_ID") {
        settings.layout_id = LayoutId::new(v);
    }
    if let Some(v) = var("APP__EVENT_BUFFER") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_buffer = parsed;
        }
    }
    if let Some(v) = var("APP__BOOTSTRAP_REFRESH") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.bootstrap_refresh = parsed;
        }
    }
    if let Some(v) = var("APP__PROMPT_MESSAGE") {
        settings.prompt.message = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
