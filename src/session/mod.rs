// Conversation session module
// Append-only chat history owned by one user session


use chrono::{DateTime, Utc};
use std::fmt;

use crate::answer::AnswerEngine;
use crate::index::{SearchResult, VectorIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

impl fmt::Display for Speaker {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "You"),
            Self::Bot => write!(f, "Bot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// Zero-based position in the log
    pub ordinal: usize,
    pub at: DateTime<Utc>,
}

impl fmt::Display for Turn {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

/// Ordered, append-only list of turns. Unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> &Turn {
        let ordinal = self.turns.len();
        self.turns.push(Turn {
            speaker,
            text: text.into(),
            ordinal,
            at: Utc::now(),
        });
        &self.turns[ordinal]
    }

    #[inline]
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// State of one chat session; create at session start, drop at session end
#[derive(Debug, Default)]
pub struct ChatSession {
    log: ConversationLog,
}

impl ChatSession {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `question` and record the exchange as a user turn followed by a
    /// bot turn. Blank questions are ignored and return `None`.
    #[inline]
    pub fn submit(
        &mut self,
        engine: &AnswerEngine,
        index: Option<&VectorIndex>,
        question: &str,
    ) -> Option<&[Turn]> {
        self.submit_with_sources(engine, index, question)
            .map(|(turns, _)| turns)
    }

    /// Same as [`ChatSession::submit`], also returning the retrieved chunks
    #[inline]
    pub fn submit_with_sources(
        &mut self,
        engine: &AnswerEngine,
        index: Option<&VectorIndex>,
        question: &str,
    ) -> Option<(&[Turn], Vec<SearchResult>)> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        let (answer, sources) = engine.answer_with_sources(question, index);
        let start = self.log.len();
        self.log.append(Speaker::User, question);
        self.log.append(Speaker::Bot, answer);

        Some((&self.log.all()[start..], sources))
    }

    #[inline]
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }
}
