//! Shared test helpers for processing unit tests.

use llmpu_core::error::SessionError;
use llmpu_core::{Session, SessionReply, Turn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock session that returns scripted replies and records every call.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedSession {
    replies: Mutex<VecDeque<Result<SessionReply, SessionError>>>,
    contexts: Mutex<Vec<Vec<Turn>>>,
    token_limits: Mutex<Vec<Option<u32>>>,
}

impl ScriptedSession {
    pub fn new(replies: Vec<Result<SessionReply, SessionError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            contexts: Mutex::new(Vec::new()),
            token_limits: Mutex::new(Vec::new()),
        })
    }

    /// Successful assistant replies, in order.
    pub fn replies(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(Self::reply(t))).collect())
    }

    pub fn reply(text: &str) -> SessionReply {
        SessionReply {
            role: "assistant".into(),
            content: text.into(),
        }
    }

    /// Every context the session was called with.
    pub fn contexts(&self) -> Vec<Vec<Turn>> {
        self.contexts.lock().unwrap().clone()
    }

    pub fn token_limits(&self) -> Vec<Option<u32>> {
        self.token_limits.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Session for ScriptedSession {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(
        &self,
        context: &[Turn],
        token_limit: Option<u32>,
    ) -> Result<SessionReply, SessionError> {
        self.contexts.lock().unwrap().push(context.to_vec());
        self.token_limits.lock().unwrap().push(token_limit);

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedSession: no more replies"))
    }
}
