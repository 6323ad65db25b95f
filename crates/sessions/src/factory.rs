//! Session selection from `AppConfig`.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use llmpu_config::AppConfig;
use llmpu_core::{Error, Session};
use tracing::debug;

use crate::openai_compat::OpenAiCompatSession;

/// The session types that can be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    OpenAiCompatible,
}

impl SessionKind {
    pub const ALL: [SessionKind; 1] = [SessionKind::OpenAiCompatible];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::OpenAiCompatible => "openai_compatible",
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| Error::Config {
                message: format!("Unknown session type '{s}' (expected: openai_compatible)"),
            })
    }
}

/// Build a session from configuration.
///
/// The formatter is chosen by `prompt_format`; personas are applied when the
/// format supports them.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Session>, Error> {
    let kind: SessionKind = config.session_type.parse()?;
    let formatter = config.prompt_format.build(&config.personas);

    debug!(
        session = %kind,
        host = %config.host,
        format = %config.prompt_format,
        personas = formatter.supports_personas(),
        "Building session"
    );

    match kind {
        SessionKind::OpenAiCompatible => {
            let mut session = OpenAiCompatSession::with_timeout(
                &config.host,
                &config.endpoint_path,
                Duration::from_secs(config.request_timeout_secs),
            )?
            .with_formatter(formatter)
            .with_token_limit(config.token_limit)
            .with_extra_props(config.extra_props.clone());

            if let Some(api_key) = &config.api_key {
                session = session.with_api_key(api_key);
            }

            Ok(Arc::new(session))
        }
    }
}
