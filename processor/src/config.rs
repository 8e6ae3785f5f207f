use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, ConfigLoader, Region, SdkConfig};
use aws_sdk_bedrockruntime::config::Credentials;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const FIELD_MODEL: &str = "model";
pub const FIELD_PROMPT: &str = "prompt";
pub const FIELD_SYSTEM_PROMPT: &str = "system_prompt";
pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_TOP_P: &str = "top_p";

const ROLE_SESSION_NAME: &str = "bedrock_chat_processor";

/// Fields of the `aws_bedrock_chat` processor.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProcessorConfig {
    /// Bedrock model ID, e.g. `anthropic.claude-3-5-sonnet-20240620-v1:0`.
    pub model: String,
    /// Prompt template. When absent the whole payload is sent as the prompt.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Sequences that cause the model to stop generating.
    #[serde(default)]
    pub stop: Option<Vec<String>>,
    /// Nucleus sampling threshold.
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Missing(FIELD_MODEL));
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens < 1 || max_tokens > i64::from(i32::MAX) {
                return Err(ConfigError::MaxTokens(max_tokens));
            }
        }
        check_unit_interval(FIELD_TEMPERATURE, self.temperature)?;
        check_unit_interval(FIELD_TOP_P, self.top_p)?;
        Ok(())
    }

    /// `max_tokens` narrowed to the SDK's type. Only meaningful after
    /// [`ProcessorConfig::validate`].
    pub(crate) fn max_tokens_i32(&self) -> Option<i32> {
        self.max_tokens.and_then(|v| i32::try_from(v).ok())
    }
}

fn check_unit_interval(field: &'static str, value: Option<f32>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(ConfigError::OutOfRange { field, value: v }),
        _ => Ok(()),
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Named profile from the shared credentials file.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// ARN of a role to assume with the resolved credentials.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_external_id: Option<String>,
}

/// AWS session fields shared by every AWS component.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub region: Option<String>,
    /// Overrides the service endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.role_external_id.is_some() && self.credentials.role.is_none() {
            return Err(ConfigError::ExternalIdWithoutRole);
        }
        match (&self.credentials.id, &self.credentials.secret) {
            (Some(_), None) => Err(ConfigError::IncompleteCredentials("secret")),
            (None, Some(_)) => Err(ConfigError::IncompleteCredentials("id")),
            _ => Ok(()),
        }
    }

    /// Resolves the SDK configuration, falling back to the default provider
    /// chain for anything not set here. With `credentials.role` set, the
    /// resolved credentials are used to assume that role.
    pub async fn load(&self) -> Result<SdkConfig, ConfigError> {
        self.validate()?;

        let sdk_config = self.loader().load().await;

        let Some(role) = &self.credentials.role else {
            return Ok(sdk_config);
        };

        debug!("Assuming AWS role: {}", role);
        let mut builder = AssumeRoleProvider::builder(role).session_name(ROLE_SESSION_NAME);
        if let Some(external_id) = &self.credentials.role_external_id {
            builder = builder.external_id(external_id);
        }
        let provider = builder.configure(&sdk_config).build().await;

        Ok(self.loader().credentials_provider(provider).load().await)
    }

    fn loader(&self) -> ConfigLoader {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &self.region {
            debug!("Using AWS region: {}", region);
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint {
            debug!("Using endpoint override: {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(profile) = &self.credentials.profile {
            debug!("Using AWS profile: {}", profile);
            loader = loader.profile_name(profile);
        }
        if let (Some(id), Some(secret)) = (&self.credentials.id, &self.credentials.secret) {
            debug!("Using static AWS credentials");
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                self.credentials.token.clone(),
                None,
                "processor-config",
            ));
        }

        loader
    }
}
