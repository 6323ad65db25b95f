//! Session trait, the abstraction over model endpoints.
//!
//! A Session knows how to take an ordered context of turns, format it for a
//! provider, perform the network exchange, and hand back the reply.
//!
//! Implementations: OpenAI-compatible chat completions (`llmpu-sessions`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::turn::Turn;

/// The role/content pair a provider answered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReply {
    pub role: String,
    pub content: String,
}

impl From<SessionReply> for Turn {
    fn from(reply: SessionReply) -> Self {
        Turn::new(reply.role, reply.content)
    }
}

/// The core Session trait.
///
/// The processing unit calls `respond()` once per evaluation without knowing
/// which provider or prompt format is behind it.
#[async_trait]
pub trait Session: Send + Sync {
    /// A human-readable name for this session (e.g., "openai_compatible").
    fn name(&self) -> &str;

    /// Send `context` and return the provider's reply.
    ///
    /// `token_limit` overrides the session's configured limit for this call.
    async fn respond(
        &self,
        context: &[Turn],
        token_limit: Option<u32>,
    ) -> std::result::Result<SessionReply, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSession;

    #[async_trait]
    impl Session for EchoSession {
        fn name(&self) -> &str {
            "echo"
        }

        async fn respond(
            &self,
            context: &[Turn],
            _token_limit: Option<u32>,
        ) -> std::result::Result<SessionReply, SessionError> {
            let last = context
                .last()
                .ok_or_else(|| SessionError::InvalidResponse("empty context".into()))?;
            Ok(SessionReply {
                role: "assistant".into(),
                content: last.content.clone(),
            })
        }
    }

    #[tokio::test]
    async fn reply_converts_into_turn() {
        let session = EchoSession;
        let reply = session.respond(&[Turn::user("ping")], None).await.unwrap();
        assert_eq!(Turn::from(reply), Turn::assistant("ping"));
    }

    #[tokio::test]
    async fn session_errors_pass_through() {
        let session = EchoSession;
        let err = session.respond(&[], None).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidResponse(_)));
    }
}
