//! Event matcher: decides which rules an event satisfies
//!
//! A rule matches when the event's subject kind is one of the rule's
//! resource kinds and the rule's pattern finds a match in the event
//! message. Compiled patterns are cached per (rule name, pattern); a rule
//! whose pattern does not compile never matches and is reported once.

use crate::error::{NotifierError, Result};
use crate::types::{ClusterEvent, Rule};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Compiled form of one rule's pattern
struct CachedPattern {
    /// Source pattern this entry was compiled from
    pattern: String,

    /// Compilation error text when the pattern is invalid
    compiled: std::result::Result<Arc<Regex>, String>,
}

/// Matches events against rules with a compiled-pattern cache
#[derive(Default)]
pub struct EventMatcher {
    /// rule name → compiled pattern
    cache: Mutex<HashMap<String, CachedPattern>>,
}

impl EventMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the rules (in input order) that `event` satisfies
    pub fn matches(&self, event: &ClusterEvent, rules: &[Rule]) -> Vec<Rule> {
        let matched: Vec<Rule> = rules
            .iter()
            .filter(|rule| self.is_match(event, rule))
            .cloned()
            .collect();

        tracing::debug!(
            subject = %event.subject(),
            candidates = rules.len(),
            matched = matched.len(),
            "Event matched against rules"
        );
        matched
    }

    /// Evaluate a single rule's predicate against an event
    pub fn is_match(&self, event: &ClusterEvent, rule: &Rule) -> bool {
        if !rule.watches_kind(&event.subject_kind) {
            tracing::trace!(
                rule = %rule.name,
                subject = %event.subject(),
                "Kind not watched"
            );
            return false;
        }

        let matched = match self.compiled(rule) {
            Ok(re) => re.is_match(&event.message),
            Err(_) => false,
        };

        if matched {
            tracing::debug!(rule = %rule.name, subject = %event.subject(), "Rule matched");
        } else {
            tracing::trace!(
                rule = %rule.name,
                subject = %event.subject(),
                "Pattern did not match"
            );
        }
        matched
    }

    /// Drop the cached pattern of a removed rule
    pub fn forget(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Evict cached patterns whose rule is no longer registered
    ///
    /// A matching pass that started from an older snapshot can compile a
    /// rule after it was forgotten; this drops such leftovers.
    pub fn retain<S: AsRef<str>>(&self, live: &[S]) {
        let live: HashSet<&str> = live.iter().map(AsRef::as_ref).collect();
        let mut cache = self.lock();
        let before = cache.len();
        cache.retain(|name, _| live.contains(name.as_str()));
        let evicted = before - cache.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted cached patterns of removed rules");
        }
    }

    /// Compile and cache a rule's pattern ahead of the first event
    ///
    /// An invalid pattern is reported as a configuration error. The rule
    /// stays usable by callers; it simply never matches.
    pub fn validate_pattern(&self, rule: &Rule) -> Result<()> {
        self.compiled(rule)
            .map(|_| ())
            .map_err(|reason| NotifierError::Configuration {
                rule: rule.name.clone(),
                reason,
            })
    }

    /// Number of cached patterns
    pub fn cached(&self) -> usize {
        self.lock().len()
    }

    /// Compiled pattern for `rule`, compiling and caching on first use or
    /// when the rule's pattern changed since the entry was cached
    fn compiled(&self, rule: &Rule) -> std::result::Result<Arc<Regex>, String> {
        let mut cache = self.lock();

        if let Some(entry) = cache.get(&rule.name) {
            if entry.pattern == rule.message_pattern {
                return entry.compiled.clone();
            }
        }

        let compiled = match Regex::new(&rule.message_pattern) {
            Ok(re) => Ok(Arc::new(re)),
            Err(e) => {
                tracing::error!(
                    rule = %rule.name,
                    pattern = %rule.message_pattern,
                    error = %e,
                    "Invalid message pattern, rule will never match"
                );
                Err(format!(
                    "invalid message pattern '{}': {}",
                    rule.message_pattern, e
                ))
            }
        };

        cache.insert(
            rule.name.clone(),
            CachedPattern {
                pattern: rule.message_pattern.clone(),
                compiled: compiled.clone(),
            },
        );
        compiled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedPattern>> {
        // The map is never left half-updated, so a poisoned lock is still usable
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Destination;

    fn rule(name: &str, kinds: &[&str], pattern: &str) -> Rule {
        Rule::new(
            name,
            kinds.iter().copied(),
            pattern,
            Destination::new("C1", "xoxb"),
        )
    }

    fn event(kind: &str, message: &str) -> ClusterEvent {
        ClusterEvent::new(kind, "web-0", "default", message)
    }

    fn names(rules: &[Rule]) -> Vec<&str> {
        rules.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_kind_and_pattern_match() {
        let matcher = EventMatcher::new();
        let rules = vec![rule("r1", &["Pod"], "timeout")];

        let matched = matcher.matches(&event("Pod", "dial tcp 10.0.0.1:8080: i/o timeout"), &rules);
        assert_eq!(names(&matched), vec!["r1"]);
    }

    #[test]
    fn test_kind_mismatch() {
        let matcher = EventMatcher::new();
        let rules = vec![rule("r1", &["Pod"], "timeout")];
        assert!(matcher.matches(&event("Service", "timeout"), &rules).is_empty());
    }

    #[test]
    fn test_pattern_mismatch() {
        let matcher = EventMatcher::new();
        let rules = vec![rule("r1", &["Pod"], "timeout")];
        assert!(matcher.matches(&event("Pod", "started OK"), &rules).is_empty());
    }

    #[test]
    fn test_empty_kinds_match_nothing() {
        let matcher = EventMatcher::new();
        let rules = vec![rule("r1", &[], ".*")];
        assert!(matcher.matches(&event("Pod", "anything"), &rules).is_empty());
    }

    #[test]
    fn test_kind_match_is_exact() {
        let matcher = EventMatcher::new();
        let rules = vec![rule("r1", &["Pod"], ".*")];
        assert!(matcher.matches(&event("pod", "x"), &rules).is_empty());
        assert!(matcher.matches(&event("PodTemplate", "x"), &rules).is_empty());
    }

    #[test]
    fn test_pattern_is_unanchored_search() {
        let matcher = EventMatcher::new();
        let rules = vec![rule("r1", &["Pod"], "probe (failed|errored)")];
        let matched = matcher.matches(&event("Pod", "Readiness probe failed: 503"), &rules);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_multiple_rules_subset() {
        let matcher = EventMatcher::new();
        let rules = vec![
            rule("a", &["Pod"], "timeout"),
            rule("b", &["Pod", "Node"], "time"),
            rule("c", &["Node"], "timeout"),
            rule("d", &["Pod"], "^OOMKilled$"),
        ];

        let matched = matcher.matches(&event("Pod", "i/o timeout"), &rules);
        assert_eq!(names(&matched), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_pattern_isolated() {
        let matcher = EventMatcher::new();
        let rules = vec![
            rule("bad", &["Pod"], "(unclosed"),
            rule("good", &["Pod"], "unclosed"),
        ];

        let matched = matcher.matches(&event("Pod", "(unclosed"), &rules);
        assert_eq!(names(&matched), vec!["good"]);

        // Still non-matching on later passes, from the cached failure
        let matched = matcher.matches(&event("Pod", "(unclosed"), &rules);
        assert_eq!(names(&matched), vec!["good"]);
        assert_eq!(matcher.cached(), 2);
    }

    #[test]
    fn test_pattern_update_invalidates_cache() {
        let matcher = EventMatcher::new();
        let ev = event("Pod", "liveness failure");

        assert!(!matcher.is_match(&ev, &rule("r1", &["Pod"], "timeout")));
        assert!(matcher.is_match(&ev, &rule("r1", &["Pod"], "failure")));
        assert_eq!(matcher.cached(), 1);
    }

    #[test]
    fn test_fixed_pattern_recovers_after_update() {
        let matcher = EventMatcher::new();
        let ev = event("Pod", "failure");

        assert!(!matcher.is_match(&ev, &rule("r1", &["Pod"], "fail[")));
        assert!(matcher.is_match(&ev, &rule("r1", &["Pod"], "fail")));
    }

    #[test]
    fn test_forget_drops_cache_entry() {
        let matcher = EventMatcher::new();
        matcher.is_match(&event("Pod", "x"), &rule("r1", &["Pod"], "x"));
        assert_eq!(matcher.cached(), 1);

        matcher.forget("r1");
        matcher.forget("r1");
        assert_eq!(matcher.cached(), 0);
    }

    #[test]
    fn test_stale_pass_after_forget_is_evicted() {
        let matcher = EventMatcher::new();
        let ev = event("Pod", "timeout");
        let stale = vec![rule("r1", &["Pod"], "timeout"), rule("r2", &["Pod"], "timeout")];

        matcher.matches(&ev, &stale);
        matcher.forget("r1");
        // A pass still holding the old snapshot compiles r1 again
        matcher.matches(&ev, &stale);
        assert_eq!(matcher.cached(), 2);

        matcher.retain(&["r2"]);
        assert_eq!(matcher.cached(), 1);
        assert!(matcher.is_match(&ev, &stale[1]));
    }

    #[test]
    fn test_kind_mismatch_skips_compilation() {
        let matcher = EventMatcher::new();
        matcher.is_match(&event("Service", "x"), &rule("r1", &["Pod"], "x"));
        assert_eq!(matcher.cached(), 0);
    }

    #[test]
    fn test_matching_does_not_mutate_inputs() {
        let matcher = EventMatcher::new();
        let rules = vec![rule("r1", &["Pod"], "timeout")];
        let ev = event("Pod", "timeout");
        let (rules_before, ev_before) = (rules.clone(), ev.clone());

        matcher.matches(&ev, &rules);
        assert_eq!(rules, rules_before);
        assert_eq!(ev, ev_before);
    }

    #[test]
    fn test_validate_pattern() {
        let matcher = EventMatcher::new();
        assert!(matcher.validate_pattern(&rule("ok", &["Pod"], "time(out)?")).is_ok());

        let err = matcher.validate_pattern(&rule("bad", &["Pod"], "[")).unwrap_err();
        match err {
            NotifierError::Configuration { rule, reason } => {
                assert_eq!(rule, "bad");
                assert!(reason.contains("invalid message pattern"));
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }

        // Cached: a second validation reports the same error without recompiling
        assert!(matcher.validate_pattern(&rule("bad", &["Pod"], "[")).is_err());
        assert_eq!(matcher.cached(), 2);
    }
}
