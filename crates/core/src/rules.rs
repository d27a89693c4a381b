//! The rule registry: patterns mapped to ordered action lists, and the matching algorithm.
use crate::action::{Action, ActionList, contains_action};
use crate::context::Context;
use crate::error::{ParseError, RuleError};
use crate::pattern::{Anchor, Form, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Where mandatory actions go relative to universal matches in a result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MandatoryPlacement {
    /// `[matched] [universal] [mandatory]`
    #[default]
    AfterUniversal,
    /// `[matched] [mandatory] [universal]`
    BeforeUniversal,
}

/// The registration and matching interface shared by every registry.
pub trait RuleManager: Send + Sync + Debug {
    /// Declares a prefix usable in patterns registered afterwards.
    fn add_namespace(&mut self, prefix: &str, uri: &str);

    fn add_rule(&mut self, pattern: &str, action: Arc<dyn Action>) -> Result<(), RuleError>;

    /// Adds an action used only for paths that no pattern matches.
    fn add_fallback_action(&mut self, action: Arc<dyn Action>);

    fn add_fallback_actions(&mut self, actions: ActionList) {
        for action in actions {
            self.add_fallback_action(action);
        }
    }

    /// Adds an action appended to every match result.
    fn add_mandatory_action(&mut self, action: Arc<dyn Action>);

    fn add_mandatory_actions(&mut self, actions: ActionList) {
        for action in actions {
            self.add_mandatory_action(action);
        }
    }

    /// The ordered actions that apply to an element at `path`.
    fn matching_actions(&self, path: &str) -> ActionList;

    /// Every distinct registered action, in first-registration order.
    fn actions(&self) -> ActionList;

    /// An independent registry sharing the same action instances.
    fn copy(&self) -> Result<Box<dyn RuleManager>, RuleError>;

    fn start_parse(&self, ctx: &mut Context) -> Result<(), ParseError> {
        for action in self.actions() {
            action.start_parse(ctx)?;
        }
        Ok(())
    }

    fn finish_parse(&self, ctx: &mut Context) -> Result<(), ParseError> {
        for action in self.actions() {
            action.finish_parse(ctx)?;
        }
        Ok(())
    }

    /// The enclosing registry for scoped registries.
    fn parent(&self) -> Option<Arc<dyn RuleManager>> {
        None
    }
}

#[derive(Debug, Clone)]
struct RuleEntry {
    pattern: Pattern,
    actions: ActionList,
    /// Registration sequence number of each action, parallel to `actions`.
    order: Vec<usize>,
}

/// The standard registry.
///
/// Relative exact patterns are indexed by their last segment, so a lookup only
/// examines the candidates that could possibly end the current path.
#[derive(Debug, Clone, Default)]
pub struct DefaultRuleManager {
    namespaces: HashMap<String, String>,
    entries: Vec<RuleEntry>,
    by_key: HashMap<String, usize>,
    absolute: HashMap<String, usize>,
    relative: HashMap<String, Vec<usize>>,
    wildcards: Vec<usize>,
    universal: Vec<usize>,
    actions: ActionList,
    fallback: ActionList,
    mandatory: ActionList,
    placement: MandatoryPlacement,
    registrations: usize,
}

impl DefaultRuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placement(placement: MandatoryPlacement) -> Self {
        Self {
            placement,
            ..Self::default()
        }
    }

    pub fn placement(&self) -> MandatoryPlacement {
        self.placement
    }

    pub fn set_placement(&mut self, placement: MandatoryPlacement) {
        self.placement = placement;
    }

    /// The registered patterns, in first-registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.entries.iter().map(|e| &e.pattern)
    }

    pub fn fallback_actions(&self) -> &[Arc<dyn Action>] {
        &self.fallback
    }

    pub fn mandatory_actions(&self) -> &[Arc<dyn Action>] {
        &self.mandatory
    }

    fn remember(&mut self, action: &Arc<dyn Action>) {
        if !contains_action(&self.actions, action) {
            self.actions.push(action.clone());
        }
    }

    fn index(&mut self, idx: usize) {
        let pattern = &self.entries[idx].pattern;
        if pattern.is_universal() {
            self.universal.push(idx);
            return;
        }
        match (pattern.form(), pattern.anchor()) {
            (Form::Exact, Anchor::Absolute) => {
                self.absolute.insert(pattern.fixed().to_string(), idx);
            }
            (Form::Exact, Anchor::Relative) => {
                let last = pattern.last_fixed_segment().to_string();
                self.relative.entry(last).or_default().push(idx);
            }
            _ => self.wildcards.push(idx),
        }
    }

    /// Picks the single winning ordinary entry: exact absolute, else the longest
    /// tail, else the most specific wildcard.
    fn ordinary_match(&self, path: &str) -> Option<&RuleEntry> {
        if let Some(&idx) = self.absolute.get(path) {
            return Some(&self.entries[idx]);
        }

        let last = crate::path::last_segment(path);
        let tail = self
            .relative
            .get(last)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
            .filter(|e| e.pattern.matches(path))
            .max_by_key(|e| e.pattern.specificity());
        if tail.is_some() {
            return tail;
        }

        self.wildcards
            .iter()
            .map(|&idx| &self.entries[idx])
            .filter(|e| e.pattern.matches(path))
            .max_by_key(|e| {
                (
                    e.pattern.form().rank(),
                    e.pattern.specificity(),
                    e.pattern.anchor() == Anchor::Absolute,
                )
            })
    }
}

impl RuleManager for DefaultRuleManager {
    fn add_namespace(&mut self, prefix: &str, uri: &str) {
        self.namespaces.insert(prefix.to_string(), uri.to_string());
    }

    fn add_rule(&mut self, pattern: &str, action: Arc<dyn Action>) -> Result<(), RuleError> {
        let pattern = Pattern::parse(pattern, &self.namespaces)?;
        let key = pattern.key();
        log::trace!("Adding rule '{}' -> {}", key, action.name());
        self.remember(&action);
        let seq = self.registrations;
        self.registrations += 1;
        match self.by_key.get(&key) {
            Some(&idx) => {
                let entry = &mut self.entries[idx];
                entry.actions.push(action);
                entry.order.push(seq);
            }
            None => {
                let idx = self.entries.len();
                self.entries.push(RuleEntry {
                    pattern,
                    actions: vec![action],
                    order: vec![seq],
                });
                self.by_key.insert(key, idx);
                self.index(idx);
            }
        }
        Ok(())
    }

    fn add_fallback_action(&mut self, action: Arc<dyn Action>) {
        self.remember(&action);
        self.fallback.push(action);
    }

    fn add_mandatory_action(&mut self, action: Arc<dyn Action>) {
        self.remember(&action);
        self.mandatory.push(action);
    }

    fn matching_actions(&self, path: &str) -> ActionList {
        let ordinary = self.ordinary_match(path);
        // Universal actions across all matching patterns, in registration order.
        let mut universal: Vec<(usize, &Arc<dyn Action>)> = self
            .universal
            .iter()
            .map(|&idx| &self.entries[idx])
            .filter(|e| e.pattern.matches(path))
            .flat_map(|e| e.order.iter().copied().zip(e.actions.iter()))
            .collect();
        universal.sort_by_key(|&(seq, _)| seq);

        let mut result = match ordinary {
            Some(entry) => entry.actions.clone(),
            None if universal.is_empty() => self.fallback.clone(),
            None => Vec::new(),
        };

        let mut additive = Vec::new();
        for (_, action) in universal {
            if !contains_action(&result, action) && !contains_action(&additive, action) {
                additive.push(action.clone());
            }
        }

        match self.placement {
            MandatoryPlacement::AfterUniversal => {
                result.extend(additive);
                result.extend(self.mandatory.iter().cloned());
            }
            MandatoryPlacement::BeforeUniversal => {
                result.extend(self.mandatory.iter().cloned());
                result.extend(additive);
            }
        }
        result
    }

    fn actions(&self) -> ActionList {
        self.actions.clone()
    }

    fn copy(&self) -> Result<Box<dyn RuleManager>, RuleError> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagged(&'static str);

    impl Action for Tagged {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn action(tag: &'static str) -> Arc<dyn Action> {
        Arc::new(Tagged(tag))
    }

    fn names(list: &ActionList) -> Vec<&str> {
        list.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn test_exact_beats_longer_tail() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("/a/b", action("exact")).unwrap();
        rules.add_rule("x/y/z/a/b", action("long-tail")).unwrap();
        rules.add_rule("a/b", action("tail")).unwrap();
        assert_eq!(names(&rules.matching_actions("/a/b")), vec!["exact"]);
        assert_eq!(names(&rules.matching_actions("/q/a/b")), vec!["tail"]);
        assert_eq!(names(&rules.matching_actions("/x/y/z/a/b")), vec!["long-tail"]);
    }

    #[test]
    fn test_longest_tail_wins() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("*/d", action("short")).unwrap();
        rules.add_rule("*/b/c/d", action("long")).unwrap();
        rules.add_rule("c/d", action("middle")).unwrap();
        assert_eq!(names(&rules.matching_actions("/a/b/c/d")), vec!["long"]);
        assert_eq!(names(&rules.matching_actions("/x/c/d")), vec!["middle"]);
        assert_eq!(names(&rules.matching_actions("/x/d")), vec!["short"]);
    }

    #[test]
    fn test_tail_does_not_match_partial_segment() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("a/b", action("ab")).unwrap();
        assert!(rules.matching_actions("/xab").is_empty());
        assert!(rules.matching_actions("/xa/b").is_empty());
        assert_eq!(names(&rules.matching_actions("/x/a/b")), vec!["ab"]);
    }

    #[test]
    fn test_universal_is_additive() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("!*/d", action("universal")).unwrap();
        rules.add_rule("*/c/d", action("ordinary")).unwrap();
        assert_eq!(
            names(&rules.matching_actions("/x/c/d")),
            vec!["ordinary", "universal"]
        );
        assert_eq!(names(&rules.matching_actions("/x/d")), vec!["universal"]);
    }

    #[test]
    fn test_universal_skips_already_included_actions() {
        let shared = action("shared");
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("a", shared.clone()).unwrap();
        rules.add_rule("!a", shared.clone()).unwrap();
        rules.add_rule("!*", action("everywhere")).unwrap();
        assert_eq!(names(&rules.matching_actions("/a")), vec!["shared", "everywhere"]);
    }

    #[test]
    fn test_universal_actions_keep_registration_order_across_patterns() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("!*", action("u1")).unwrap();
        rules.add_rule("!a", action("u2")).unwrap();
        rules.add_rule("!*", action("u3")).unwrap();
        assert_eq!(names(&rules.matching_actions("/a")), vec!["u1", "u2", "u3"]);
        assert_eq!(names(&rules.matching_actions("/b")), vec!["u1", "u3"]);
    }

    #[test]
    fn test_registration_order_within_pattern() {
        let mut rules = DefaultRuleManager::new();
        for tag in ["r1", "r2", "r3"] {
            rules.add_rule("item", action(tag)).unwrap();
        }
        assert_eq!(names(&rules.matching_actions("/list/item")), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_equivalent_spellings_share_one_list() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("a/b", action("plain")).unwrap();
        rules.add_rule("*/a/b/", action("starred")).unwrap();
        assert_eq!(names(&rules.matching_actions("/a/b")), vec!["plain", "starred"]);
        assert_eq!(rules.patterns().count(), 1);
    }

    #[test]
    fn test_fallback_only_when_nothing_matches() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("/root/known", action("known")).unwrap();
        rules.add_fallback_actions(vec![action("f1"), action("f2")]);
        assert_eq!(names(&rules.matching_actions("/root/known")), vec!["known"]);
        assert_eq!(names(&rules.matching_actions("/root/unknown")), vec!["f1", "f2"]);

        rules.add_rule("!unknown", action("universal")).unwrap();
        assert_eq!(names(&rules.matching_actions("/root/unknown")), vec!["universal"]);
    }

    #[test]
    fn test_mandatory_placement() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("/a", action("h")).unwrap();
        rules.add_rule("!a", action("u")).unwrap();
        rules.add_mandatory_action(action("m"));
        assert_eq!(names(&rules.matching_actions("/a")), vec!["h", "u", "m"]);
        assert_eq!(names(&rules.matching_actions("/other")), vec!["m"]);

        rules.set_placement(MandatoryPlacement::BeforeUniversal);
        assert_eq!(names(&rules.matching_actions("/a")), vec!["h", "m", "u"]);
    }

    #[test]
    fn test_wildcard_precedence() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("*", action("all")).unwrap();
        rules.add_rule("/doc/*", action("under-doc")).unwrap();
        rules.add_rule("list/?", action("list-child")).unwrap();
        rules.add_rule("name", action("name")).unwrap();

        assert_eq!(names(&rules.matching_actions("/doc")), vec!["all"]);
        assert_eq!(names(&rules.matching_actions("/doc/x/y")), vec!["under-doc"]);
        assert_eq!(names(&rules.matching_actions("/doc/list/item")), vec!["list-child"]);
        assert_eq!(names(&rules.matching_actions("/doc/list/name")), vec!["name"]);
    }

    #[test]
    fn test_longer_wildcard_prefix_wins() {
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("b/*", action("short")).unwrap();
        rules.add_rule("a/b/*", action("long")).unwrap();
        assert_eq!(names(&rules.matching_actions("/a/b/c/d")), vec!["long"]);
        assert_eq!(names(&rules.matching_actions("/x/b/c")), vec!["short"]);
    }

    #[test]
    fn test_unique_action_list() {
        let shared = action("shared");
        let mut rules = DefaultRuleManager::new();
        rules.add_rule("a", shared.clone()).unwrap();
        rules.add_rule("b", shared.clone()).unwrap();
        rules.add_fallback_action(action("fallback"));
        rules.add_mandatory_action(shared);
        assert_eq!(names(&rules.actions()), vec!["shared", "fallback"]);
    }

    #[test]
    fn test_namespaced_patterns() {
        let mut rules = DefaultRuleManager::new();
        assert!(matches!(
            rules.add_rule("p:item", action("x")),
            Err(RuleError::UndeclaredPrefix { .. })
        ));
        rules.add_namespace("p", "urn:p");
        rules.add_rule("p:item", action("item")).unwrap();
        assert_eq!(names(&rules.matching_actions("/root/{urn:p}item")), vec!["item"]);
        assert!(rules.matching_actions("/root/item").is_empty());
    }

    #[test]
    fn test_copy_is_independent() {
        let shared = action("shared");
        let mut original = DefaultRuleManager::new();
        original.add_rule("a", shared.clone()).unwrap();
        let mut copy = original.copy().unwrap();
        copy.add_rule("b", action("only-in-copy")).unwrap();

        assert!(original.matching_actions("/b").is_empty());
        assert_eq!(names(&copy.matching_actions("/b")), vec!["only-in-copy"]);
        assert!(Arc::ptr_eq(&copy.matching_actions("/a")[0], &shared));
    }

    #[test]
    fn test_empty_registry_matches_nothing() {
        let rules = DefaultRuleManager::new();
        assert!(rules.matching_actions("/a").is_empty());
        assert!(rules.actions().is_empty());
    }

    #[test]
    fn test_placement_serializes_kebab_case() {
        let json = serde_json::to_string(&MandatoryPlacement::BeforeUniversal).unwrap();
        assert_eq!(json, "\"before-universal\"");
        let parsed: MandatoryPlacement = serde_json::from_str("\"after-universal\"").unwrap();
        assert_eq!(parsed, MandatoryPlacement::AfterUniversal);
    }
}
