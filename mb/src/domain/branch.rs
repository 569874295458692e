//! Branch tree: the arena of idea nodes grown by exploration and expansion

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use super::{DomainError, ThreadKind};
use crate::response::StructuredResponse;

/// Session-wide branch handle, displayed as `b<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId(u64);

impl BranchId {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn number(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl FromStr for BranchId {
    type Err = DomainError;

    /// Accepts `b12` or `B12`, surrounding whitespace allowed
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .strip_prefix(['b', 'B'])
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u64>().ok())
            .map(BranchId)
            .ok_or_else(|| DomainError::InvalidBranchId(trimmed.to_string()))
    }
}

impl Serialize for BranchId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which response section (or expansion) produced a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BranchSource {
    #[serde(rename = "emotionalSeeds")]
    EmotionalSeeds,
    #[serde(rename = "habitHeuristicAlignment")]
    HabitHeuristicAlignment,
    #[serde(rename = "delightfulSubversion")]
    DelightfulSubversion,
    #[serde(rename = "attributeBasedBridging")]
    AttributeBasedBridging,
    #[serde(rename = "broaderDomains")]
    BroaderDomains,
    #[serde(rename = "metaphoricalLinks")]
    MetaphoricalLinks,
    #[serde(rename = "imaginaryFeedback")]
    ImaginaryFeedback,
    #[serde(rename = "concept_expansion")]
    ConceptExpansion,
}

impl BranchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmotionalSeeds => "emotionalSeeds",
            Self::HabitHeuristicAlignment => "habitHeuristicAlignment",
            Self::DelightfulSubversion => "delightfulSubversion",
            Self::AttributeBasedBridging => "attributeBasedBridging",
            Self::BroaderDomains => "broaderDomains",
            Self::MetaphoricalLinks => "metaphoricalLinks",
            Self::ImaginaryFeedback => "imaginaryFeedback",
            Self::ConceptExpansion => "concept_expansion",
        }
    }
}

impl fmt::Display for BranchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heading, content and provenance for a branch not yet in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSeed {
    pub heading: String,
    pub content: String,
    pub source: BranchSource,
}

impl BranchSeed {
    pub fn new(heading: impl Into<String>, content: impl Into<String>, source: BranchSource) -> Self {
        Self {
            heading: heading.into(),
            content: content.into(),
            source,
        }
    }
}

/// One idea node
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: BranchId,
    pub thread: ThreadKind,
    pub heading: String,
    pub content: String,
    pub source: BranchSource,
    pub parent: Option<BranchId>,
    pub children: Vec<BranchId>,
    pub expanded: bool,
    pub expansion: Option<StructuredResponse>,
}

impl Branch {
    /// "heading: content", the form handed to guidance and expansion prompts
    pub fn concept(&self) -> String {
        format!("{}: {}", self.heading, self.content)
    }
}

/// Arena of branches indexed by id, with per-thread top-level order
///
/// Ids come from a counter that only moves forward; removed ids are never
/// handed out again.
#[derive(Debug, Clone, Default)]
pub struct BranchTree {
    branches: BTreeMap<BranchId, Branch>,
    roots: BTreeMap<ThreadKind, Vec<BranchId>>,
    last_id: u64,
}

impl BranchTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> BranchId {
        self.last_id += 1;
        BranchId(self.last_id)
    }

    fn insert(&mut self, thread: ThreadKind, parent: Option<BranchId>, seed: BranchSeed) -> BranchId {
        let id = self.allocate();
        info!(%id, %thread, heading = %seed.heading, source = %seed.source, "Created branch");
        self.branches.insert(
            id,
            Branch {
                id,
                thread,
                heading: seed.heading,
                content: seed.content,
                source: seed.source,
                parent,
                children: Vec::new(),
                expanded: false,
                expansion: None,
            },
        );
        id
    }

    /// Add a thread-level branch
    pub fn add_top_level(&mut self, thread: ThreadKind, seed: BranchSeed) -> BranchId {
        debug!(%thread, "BranchTree::add_top_level: called");
        let id = self.insert(thread, None, seed);
        self.roots.entry(thread).or_default().push(id);
        id
    }

    /// Add a child under `parent`, inheriting its thread
    pub fn add_child(&mut self, parent: BranchId, seed: BranchSeed) -> Result<BranchId, DomainError> {
        debug!(%parent, "BranchTree::add_child: called");
        let thread = self.get(parent)?.thread;
        let id = self.insert(thread, Some(parent), seed);
        if let Some(p) = self.branches.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Attach expansion results to `parent` in one step
    ///
    /// Fails without touching the tree if the parent is unknown or already
    /// expanded. Otherwise every seed becomes a child and the payload is stored.
    pub fn record_expansion(
        &mut self,
        parent: BranchId,
        seeds: Vec<BranchSeed>,
        payload: StructuredResponse,
    ) -> Result<Vec<BranchId>, DomainError> {
        debug!(%parent, seed_count = seeds.len(), "BranchTree::record_expansion: called");
        if self.get(parent)?.expanded {
            return Err(DomainError::AlreadyExpanded(parent));
        }

        let mut created = Vec::with_capacity(seeds.len());
        for seed in seeds {
            created.push(self.add_child(parent, seed)?);
        }

        if let Some(p) = self.branches.get_mut(&parent) {
            p.expanded = true;
            p.expansion = Some(payload);
        }
        Ok(created)
    }

    /// Remove every branch owned by `thread`, returning the removed ids
    ///
    /// Descendants share their root's thread, so whole subtrees go.
    pub fn reset_thread(&mut self, thread: ThreadKind) -> Vec<BranchId> {
        debug!(%thread, "BranchTree::reset_thread: called");
        let removed: Vec<BranchId> = self
            .branches
            .values()
            .filter(|b| b.thread == thread)
            .map(|b| b.id)
            .collect();

        for id in &removed {
            self.branches.remove(id);
        }
        self.roots.remove(&thread);

        info!(%thread, removed = removed.len(), "Reset thread branches");
        removed
    }

    /// Look up a branch
    pub fn get(&self, id: BranchId) -> Result<&Branch, DomainError> {
        self.branches.get(&id).ok_or(DomainError::NotFound(id))
    }

    pub fn contains(&self, id: BranchId) -> bool {
        self.branches.contains_key(&id)
    }

    /// Top-level branches of a thread, in creation order
    pub fn top_level(&self, thread: ThreadKind) -> impl Iterator<Item = &Branch> {
        self.roots
            .get(&thread)
            .into_iter()
            .flatten()
            .filter_map(|id| self.branches.get(id))
    }

    /// Children of a branch, in creation order
    pub fn children(&self, id: BranchId) -> impl Iterator<Item = &Branch> {
        self.branches
            .get(&id)
            .into_iter()
            .flat_map(|b| b.children.iter())
            .filter_map(|child| self.branches.get(child))
    }

    /// All live branches in id order
    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Highest id handed out so far (live or removed)
    pub fn last_allocated(&self) -> Option<BranchId> {
        (self.last_id > 0).then_some(BranchId(self.last_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seed(heading: &str) -> BranchSeed {
        BranchSeed::new(heading, format!("{heading} content"), BranchSource::EmotionalSeeds)
    }

    #[test]
    fn test_branch_id_display_and_parse() {
        assert_eq!(BranchId::new(7).to_string(), "b7");
        assert_eq!("b12".parse::<BranchId>().unwrap(), BranchId::new(12));
        assert_eq!(" B3 ".parse::<BranchId>().unwrap(), BranchId::new(3));
        assert!("b".parse::<BranchId>().is_err());
        assert!("12".parse::<BranchId>().is_err());
        assert!("b1x".parse::<BranchId>().is_err());
        assert!("thread".parse::<BranchId>().is_err());
    }

    #[test]
    fn test_add_top_level_and_child() {
        let mut tree = BranchTree::new();
        let b1 = tree.add_top_level(ThreadKind::EmotionalRootCauses, seed("a"));
        let b2 = tree.add_child(b1, seed("child")).unwrap();

        assert_eq!(b1.to_string(), "b1");
        assert_eq!(b2.to_string(), "b2");

        let child = tree.get(b2).unwrap();
        assert_eq!(child.parent, Some(b1));
        assert_eq!(child.thread, ThreadKind::EmotionalRootCauses);
        assert_eq!(tree.get(b1).unwrap().children, vec![b2]);
        assert_eq!(tree.top_level(ThreadKind::EmotionalRootCauses).count(), 1);
    }

    #[test]
    fn test_add_child_unknown_parent() {
        let mut tree = BranchTree::new();
        let err = tree.add_child(BranchId::new(9), seed("x")).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(id) if id == BranchId::new(9)));
        assert!(tree.is_empty());
        assert_eq!(tree.last_allocated(), None);
    }

    #[test]
    fn test_reset_thread_removes_subtree_only() {
        let mut tree = BranchTree::new();
        let t1 = tree.add_top_level(ThreadKind::EmotionalRootCauses, seed("t1"));
        let t1_child = tree.add_child(t1, seed("t1 child")).unwrap();
        let t2 = tree.add_top_level(ThreadKind::UnconventionalAssociations, seed("t2"));

        let removed = tree.reset_thread(ThreadKind::EmotionalRootCauses);

        assert_eq!(removed, vec![t1, t1_child]);
        assert!(matches!(tree.get(t1), Err(DomainError::NotFound(_))));
        assert!(matches!(tree.get(t1_child), Err(DomainError::NotFound(_))));
        assert!(tree.get(t2).is_ok());
        assert_eq!(tree.top_level(ThreadKind::EmotionalRootCauses).count(), 0);

        // The counter keeps going
        let next = tree.add_top_level(ThreadKind::EmotionalRootCauses, seed("again"));
        assert_eq!(next, BranchId::new(4));
    }

    #[test]
    fn test_record_expansion_once() {
        let mut tree = BranchTree::new();
        let parent = tree.add_top_level(ThreadKind::ImaginaryFeedback, seed("p"));
        let seeds = vec![seed("c1"), seed("c2"), seed("c3")];
        let payload = StructuredResponse::Structured(serde_json::json!({"expandedConcepts": []}));

        let created = tree.record_expansion(parent, seeds, payload.clone()).unwrap();
        assert_eq!(created.len(), 3);

        let p = tree.get(parent).unwrap();
        assert!(p.expanded);
        assert_eq!(p.expansion.as_ref(), Some(&payload));
        assert_eq!(tree.children(parent).count(), 3);

        let again = tree.record_expansion(parent, vec![seed("c4")], payload);
        assert!(matches!(again, Err(DomainError::AlreadyExpanded(_))));
        assert_eq!(tree.children(parent).count(), 3);
    }

    #[test]
    fn test_record_expansion_degraded_creates_no_children() {
        let mut tree = BranchTree::new();
        let parent = tree.add_top_level(ThreadKind::EmotionalRootCauses, seed("p"));
        let created = tree
            .record_expansion(parent, Vec::new(), StructuredResponse::degraded("prose"))
            .unwrap();

        assert!(created.is_empty());
        let p = tree.get(parent).unwrap();
        assert!(p.expanded);
        assert_eq!(p.expansion.as_ref().and_then(|e| e.raw_response()), Some("prose"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Top(usize),
        Child(usize),
        Reset(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize).prop_map(Op::Top),
            (0..64usize).prop_map(Op::Child),
            (0..3usize).prop_map(Op::Reset),
        ]
    }

    proptest! {
        #[test]
        fn prop_ids_increase_and_threads_match(ops in proptest::collection::vec(op_strategy(), 0..80)) {
            let mut tree = BranchTree::new();
            let mut issued: Vec<BranchId> = Vec::new();
            let mut removed: Vec<BranchId> = Vec::new();

            for op in ops {
                match op {
                    Op::Top(t) => {
                        let id = tree.add_top_level(ThreadKind::ALL[t], seed("top"));
                        issued.push(id);
                    }
                    Op::Child(pick) => {
                        let live: Vec<BranchId> = tree.iter().map(|b| b.id).collect();
                        if live.is_empty() {
                            continue;
                        }
                        let parent = live[pick % live.len()];
                        let id = tree.add_child(parent, seed("child")).unwrap();
                        issued.push(id);
                    }
                    Op::Reset(t) => {
                        removed.extend(tree.reset_thread(ThreadKind::ALL[t]));
                    }
                }
            }

            // Strictly increasing, never repeated
            for pair in issued.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }

            // Children live in their parent's thread
            for branch in tree.iter() {
                if let Some(parent) = branch.parent {
                    let parent = tree.get(parent).unwrap();
                    prop_assert_eq!(parent.thread, branch.thread);
                }
            }

            // Removed ids stay gone
            for id in removed {
                prop_assert!(tree.get(id).is_err());
            }
        }
    }
}
