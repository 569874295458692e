//! Exploration threads: the three fixed lenses and their isolated logs

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use super::DomainError;
use crate::llm::Message;
use crate::prompts::Template;
use crate::response::StructuredResponse;

/// One of the three fixed exploration lenses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThreadKind {
    EmotionalRootCauses,
    UnconventionalAssociations,
    ImaginaryFeedback,
}

impl ThreadKind {
    pub const ALL: [ThreadKind; 3] = [
        ThreadKind::EmotionalRootCauses,
        ThreadKind::UnconventionalAssociations,
        ThreadKind::ImaginaryFeedback,
    ];

    /// 1-based position, as shown to the user
    pub fn number(&self) -> u8 {
        match self {
            Self::EmotionalRootCauses => 1,
            Self::UnconventionalAssociations => 2,
            Self::ImaginaryFeedback => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::EmotionalRootCauses),
            2 => Some(Self::UnconventionalAssociations),
            3 => Some(Self::ImaginaryFeedback),
            _ => None,
        }
    }

    /// Stable id used in the mindmap (`thread_1`..`thread_3`)
    pub fn id(&self) -> &'static str {
        match self {
            Self::EmotionalRootCauses => "thread_1",
            Self::UnconventionalAssociations => "thread_2",
            Self::ImaginaryFeedback => "thread_3",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| DomainError::UnknownThread(id.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EmotionalRootCauses => "Emotional Root Causes",
            Self::UnconventionalAssociations => "Unconventional Associations",
            Self::ImaginaryFeedback => "Imaginary Customers' Feedback",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::EmotionalRootCauses => "Explore the underlying emotional needs, fears, or motivations",
            Self::UnconventionalAssociations => "Connect the problem to unexpected domains, metaphors, or analogies",
            Self::ImaginaryFeedback => "Imagine different feedback perspectives on potential solutions",
        }
    }

    /// Prompt template that drives this thread's exploration
    pub fn template(&self) -> Template {
        match self {
            Self::EmotionalRootCauses => Template::EmotionalRootCauses,
            Self::UnconventionalAssociations => Template::UnconventionalAssociations,
            Self::ImaginaryFeedback => Template::ImaginaryFeedback,
        }
    }

    /// Resolve a free-text thread choice: a number or a name alias
    pub fn from_choice(choice: &str) -> Option<Self> {
        debug!(%choice, "ThreadKind::from_choice: called");
        let normalized = choice.trim().to_lowercase();
        if let Ok(n) = normalized.parse::<u8>() {
            return Self::from_number(n);
        }
        match normalized.as_str() {
            "emotional" | "emotional root" | "emotional root causes" | "root causes" => {
                Some(Self::EmotionalRootCauses)
            }
            "unconventional" | "unconventional associations" | "associations" => {
                Some(Self::UnconventionalAssociations)
            }
            "imaginary" | "feedback" | "imaginary customers" | "customers feedback" | "customers' feedback"
            | "imaginary customers feedback" | "imaginary customers' feedback" => Some(Self::ImaginaryFeedback),
            _ => None,
        }
    }
}

impl fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for ThreadKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// A thread's private conversation and the payload of its last exploration
#[derive(Debug, Clone)]
pub struct ExplorationThread {
    pub kind: ThreadKind,
    /// Messages scoped to this thread only
    pub log: Vec<Message>,
    pub exploration: Option<StructuredResponse>,
}

impl ExplorationThread {
    fn new(kind: ThreadKind, system_prompt: &str) -> Self {
        Self {
            kind,
            log: vec![Message::system(system_prompt)],
            exploration: None,
        }
    }

    pub fn is_explored(&self) -> bool {
        self.exploration.is_some()
    }
}

/// Status of a thread in the selection menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Current,
    Explored,
    Unexplored,
}

/// A line of the thread selection menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadOption {
    pub kind: ThreadKind,
    pub status: ThreadStatus,
}

impl ThreadOption {
    /// "Name (marker): description", without the number
    pub fn label(&self) -> String {
        let marker = match self.status {
            ThreadStatus::Current => " (current)",
            ThreadStatus::Explored => " (explored)",
            ThreadStatus::Unexplored => "",
        };
        format!("{}{}: {}", self.kind.name(), marker, self.kind.description())
    }
}

impl fmt::Display for ThreadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.kind.number(), self.label())
    }
}

/// The three threads of a session, created once the statement is final
#[derive(Debug, Clone)]
pub struct ThreadRegistry {
    threads: [ExplorationThread; 3],
}

impl ThreadRegistry {
    /// Create all three threads, each log opening with the system persona
    pub fn new(system_prompt: &str) -> Self {
        debug!("ThreadRegistry::new: called");
        Self {
            threads: ThreadKind::ALL.map(|kind| ExplorationThread::new(kind, system_prompt)),
        }
    }

    fn index(kind: ThreadKind) -> usize {
        usize::from(kind.number() - 1)
    }

    pub fn get(&self, kind: ThreadKind) -> &ExplorationThread {
        &self.threads[Self::index(kind)]
    }

    pub fn get_mut(&mut self, kind: ThreadKind) -> &mut ExplorationThread {
        &mut self.threads[Self::index(kind)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExplorationThread> {
        self.threads.iter()
    }

    /// Menu lines with status markers relative to the active thread
    pub fn options(&self, active: Option<ThreadKind>) -> Vec<ThreadOption> {
        self.threads
            .iter()
            .map(|t| ThreadOption {
                kind: t.kind,
                status: if Some(t.kind) == active {
                    ThreadStatus::Current
                } else if t.is_explored() {
                    ThreadStatus::Explored
                } else {
                    ThreadStatus::Unexplored
                },
            })
            .collect()
    }
}
