//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-component-id";
pub const DEFAULT_ID_PREFIX: &str = "cmp";
pub const DEFAULT_IMAGE_WIDTH: &str = "100%";
pub const DEFAULT_FLOAT_GAP: &str = "1em";

/// Command-line arguments for the quire binary.
#[derive(Debug, Parser)]
#[command(
    name = "quire",
    version,
    about = "Inspect and export component-annotated editor markup"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUIRE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Load markup into a fresh editing session and print the component registry.
    Inspect(InspectArgs),
    /// Print publishable markup with editor markers removed.
    Export(ExportArgs),
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,

    /// Only list components of this kind (image|layout|gallery|figure|quote|comparison|hero).
    #[arg(long, value_name = "KIND")]
    pub kind: Option<String>,

    /// Markup file to load.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Markup file to load.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the attribute that carries component ids.
    #[arg(long = "marker-attribute", value_name = "NAME")]
    pub marker_attribute: Option<String>,
}

impl Command {
    pub fn overrides(&self) -> &Overrides {
        match self {
            Command::Inspect(args) => &args.overrides,
            Command::Export(args) => &args.overrides,
        }
    }
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub editor: EditorSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Knobs of an editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    /// Attribute stamped on every tracked node; always a `data-*` name.
    pub marker_attribute: String,
    pub id_prefix: String,
    /// Width given to inserted images when the caller does not pick one.
    pub default_image_width: String,
    /// Margin between a floated image and the text flowing around it.
    pub float_gap: String,
    /// Follow inserted content with an empty paragraph.
    pub trailing_paragraph: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            default_image_width: DEFAULT_IMAGE_WIDTH.to_string(),
            float_gap: DEFAULT_FLOAT_GAP.to_string(),
            trailing_paragraph: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("QUIRE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(cli.command.overrides());

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    editor: RawEditorSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(attribute) = overrides.marker_attribute.as_ref() {
            self.editor.marker_attribute = Some(attribute.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            editor: build_editor_settings(raw.editor)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_editor_settings(editor: RawEditorSettings) -> Result<EditorSettings, LoadError> {
    let defaults = EditorSettings::default();

    let marker_attribute = match trimmed(editor.marker_attribute) {
        Some(name) => {
            let name = name.to_ascii_lowercase();
            validate_marker_attribute(&name)?;
            name
        }
        None => defaults.marker_attribute,
    };

    let id_prefix = match trimmed(editor.id_prefix) {
        Some(prefix) if prefix.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') => {
            prefix
        }
        Some(prefix) => {
            return Err(LoadError::invalid(
                "editor.id_prefix",
                format!("`{prefix}` may only contain ASCII letters, digits and underscores"),
            ));
        }
        None => defaults.id_prefix,
    };

    let default_image_width = trimmed(editor.default_image_width)
        .map(|width| validate_css_value("editor.default_image_width", width))
        .transpose()?
        .unwrap_or(defaults.default_image_width);

    let float_gap = trimmed(editor.float_gap)
        .map(|gap| validate_css_value("editor.float_gap", gap))
        .transpose()?
        .unwrap_or(defaults.float_gap);

    Ok(EditorSettings {
        marker_attribute,
        id_prefix,
        default_image_width,
        float_gap,
        trailing_paragraph: editor.trailing_paragraph.unwrap_or(defaults.trailing_paragraph),
    })
}

fn validate_marker_attribute(name: &str) -> Result<(), LoadError> {
    let Some(suffix) = name.strip_prefix("data-") else {
        return Err(LoadError::invalid(
            "editor.marker_attribute",
            format!("`{name}` must start with `data-`"),
        ));
    };
    let valid = !suffix.is_empty()
        && suffix
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(LoadError::invalid(
            "editor.marker_attribute",
            format!("`{name}` is not a valid data attribute name"),
        ))
    }
}

fn validate_css_value(key: &'static str, value: String) -> Result<String, LoadError> {
    if value.contains([';', '{', '}', '"']) {
        return Err(LoadError::invalid(
            key,
            format!("`{value}` is not a single CSS value"),
        ));
    }
    Ok(value)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEditorSettings {
    marker_attribute: Option<String>,
    id_prefix: Option<String>,
    default_image_width: Option<String>,
    float_gap: Option<String>,
    trailing_paragraph: Option<bool>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
