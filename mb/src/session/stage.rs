//! Workflow stages and the free-text choices that move between them

use std::fmt;

use crate::domain::{BranchId, ThreadKind};

/// Where the session is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    CollectInput,
    GenerateStatementA,
    GenerateStatementB,
    AwaitChoice,
    PresentThreads,
    AwaitThreadOrBranch,
    ExploreThread(ThreadKind),
    SelectBranch(BranchId),
    AwaitConceptGuidance { branch: BranchId, suggested: String },
    ExpandConcept { branch: BranchId, guidance: String },
    Ended,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollectInput => "collect_input",
            Self::GenerateStatementA => "generate_statement_a",
            Self::GenerateStatementB => "generate_statement_b",
            Self::AwaitChoice => "await_choice",
            Self::PresentThreads => "present_threads",
            Self::AwaitThreadOrBranch => "await_thread_or_branch",
            Self::ExploreThread(_) => "explore_thread",
            Self::SelectBranch(_) => "select_branch",
            Self::AwaitConceptGuidance { .. } => "await_concept_guidance",
            Self::ExpandConcept { .. } => "expand_concept",
            Self::Ended => "ended",
        }
    }

    /// Stages that wait on the human rather than doing work
    pub fn awaits_input(&self) -> bool {
        matches!(
            self,
            Self::CollectInput | Self::AwaitChoice | Self::AwaitThreadOrBranch | Self::AwaitConceptGuidance { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Answer to the statement choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementChoice {
    A,
    B,
    RegenerateA,
    RegenerateB,
}

impl StatementChoice {
    /// Interpret a free-text answer; `None` when it names nothing
    ///
    /// Regenerate requests win over plain numbers, so "r1" is never read as "1".
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_lowercase();
        if s.contains("r1") || s.contains("regenerate 1") || s.contains("regenerate statement 1") {
            return Some(Self::RegenerateA);
        }
        if s.contains("r2") || s.contains("regenerate 2") || s.contains("regenerate statement 2") {
            return Some(Self::RegenerateB);
        }
        if s.contains('1') {
            return Some(Self::A);
        }
        if s.contains('2') {
            return Some(Self::B);
        }
        None
    }
}

/// Answer at the thread/branch menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationChoice {
    Thread(ThreadKind),
    Branch(BranchId),
    Stop,
}

/// Why a navigation answer couldn't be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// Started with `b` but isn't a branch id
    BadBranchId(String),
    Unrecognized(String),
}

impl NavigationChoice {
    pub fn parse(input: &str) -> Result<Self, NavigationError> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("stop") {
            return Ok(Self::Stop);
        }
        if s.starts_with(['b', 'B']) {
            return s
                .parse::<BranchId>()
                .map(Self::Branch)
                .map_err(|_| NavigationError::BadBranchId(s.to_string()));
        }
        ThreadKind::from_choice(s)
            .map(Self::Thread)
            .ok_or_else(|| NavigationError::Unrecognized(s.to_string()))
    }
}
