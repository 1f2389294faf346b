//! Scripted [`Completion`] used by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use procura_ai::{OutputSchema, structured};
use serde_json::Value;

use crate::completion::Completion;
use crate::error::{Error, Result};

/// One canned reply
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Raw model text. Structured calls decode and validate it.
    Text(String),
    /// An already-decoded structured value. Still validated against the schema.
    Json(Value),
    /// A provider failure
    Fail(String),
}

pub(crate) fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

pub(crate) fn json(value: Value) -> Reply {
    Reply::Json(value)
}

pub(crate) fn fail(message: &str) -> Reply {
    Reply::Fail(message.to_string())
}

/// Which method a prompt arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Text,
    Structured,
}

/// Replays replies in order and records every prompt.
pub(crate) struct ScriptedCompletion {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<(Mode, String)>>,
}

impl ScriptedCompletion {
    pub(crate) fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn prompts(&self) -> Vec<(Mode, String)> {
        self.prompts.lock().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.replies.lock().len()
    }

    fn next(&self, mode: Mode, prompt: &str) -> Result<Reply> {
        self.prompts.lock().push((mode, prompt.to_string()));
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Other("scripted completion ran out of replies".into()))
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.next(Mode::Text, prompt)? {
            Reply::Text(s) => Ok(s),
            Reply::Json(value) => Ok(value.to_string()),
            Reply::Fail(message) => Err(procura_ai::Error::api(503, message).into()),
        }
    }

    async fn complete_structured(&self, prompt: &str, schema: &OutputSchema) -> Result<Value> {
        match self.next(Mode::Structured, prompt)? {
            Reply::Text(s) => Ok(structured::decode_structured(&s, schema)?),
            Reply::Json(value) => {
                structured::validate(&value, schema)?;
                Ok(value)
            }
            Reply::Fail(message) => Err(procura_ai::Error::api(503, message).into()),
        }
    }
}
