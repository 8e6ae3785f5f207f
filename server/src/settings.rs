use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use processor::{ProcessorConfig, SessionConfig};
use serde::Deserialize;
use tracing::info;

const ENV_PREFIX: &str = "BEDROCK_CHAT";

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub aws: SessionConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Settings {
    /// Reads `name.{toml,yaml,json,...}` if present, then applies
    /// `BEDROCK_CHAT__SECTION__FIELD` environment overrides.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        Self::from_builder(Config::builder().add_source(File::with_name(name).required(false)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("processor.stop"),
            )
            .build()?
            .try_deserialize()?;

        info!(
            "Loaded settings for model {} on {}:{}",
            settings.processor.model, settings.host, settings.port
        );

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> anyhow::Result<Settings> {
        Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn reads_processor_and_session_sections() {
        let settings = from_toml(
            r#"
            port = 8080

            [processor]
            model = "cohere.command-text-v14"
            system_prompt = "Answer in one sentence."
            max_tokens = 200
            temperature = 0.7
            stop = ["\n"]

            [aws]
            region = "us-east-1"

            [aws.credentials]
            profile = "bedrock"
            "#,
        )
        .unwrap();

        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.processor.model, "cohere.command-text-v14");
        assert_eq!(
            settings.processor.system_prompt.as_deref(),
            Some("Answer in one sentence.")
        );
        assert!(settings.processor.prompt.is_none());
        assert_eq!(settings.processor.max_tokens, Some(200));
        assert_eq!(settings.processor.temperature, Some(0.7));
        assert_eq!(settings.processor.stop, Some(vec!["\n".to_string()]));
        assert_eq!(settings.aws.region.as_deref(), Some("us-east-1"));
        assert_eq!(settings.aws.credentials.profile.as_deref(), Some("bedrock"));
    }

    #[test]
    fn processor_section_is_required() {
        assert!(from_toml("port = 8080").is_err());
    }
}
