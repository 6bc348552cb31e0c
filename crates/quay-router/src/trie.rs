//! Trie-based route storage for efficient lookups

use crate::matcher::{Match, PathMatcher};
use crate::route::Route;
use quay_core::{Error, Result};
use std::collections::HashMap;

/// Node in the route trie
#[derive(Debug, Default)]
struct TrieNode {
    /// Static children (exact match)
    children: HashMap<String, TrieNode>,

    /// Parameter child (e.g., :id)
    param_child: Option<Box<TrieNode>>,

    /// Wildcard child (e.g., *filepath)
    wildcard_child: Option<Box<TrieNode>>,

    /// Route and its compiled matcher (if terminal)
    terminal: Option<(Route, PathMatcher)>,
}

/// Trie holding the routes of a single HTTP method
#[derive(Debug, Default)]
pub struct RouteTrie {
    root: TrieNode,
    count: usize,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl RouteTrie {
    /// Create a new route trie
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route into the trie
    pub fn insert(&mut self, route: Route) -> Result<()> {
        let matcher = PathMatcher::new(route.path.clone())?;
        let mut current = &mut self.root;

        for segment in segments(&route.path) {
            current = if segment.starts_with(':') {
                current.param_child.get_or_insert_with(Box::default).as_mut()
            } else if segment.starts_with('*') {
                current.wildcard_child.get_or_insert_with(Box::default).as_mut()
            } else {
                current.children.entry(segment.to_string()).or_default()
            };
        }

        if current.terminal.is_some() {
            return Err(Error::Config(format!(
                "Route already exists: {} {}",
                route.method, route.path
            )));
        }

        current.terminal = Some((route, matcher));
        self.count += 1;

        Ok(())
    }

    /// Match a path against routes in the trie
    pub fn match_path(&self, path: &str) -> Option<Match> {
        let segments = segments(path);

        let mut matches = Vec::new();
        Self::match_recursive(&self.root, &segments, 0, &mut matches);

        // Stable sort keeps static > param > wildcard order among equal priorities
        matches.sort_by(|a, b| b.route.priority.cmp(&a.route.priority));
        matches.into_iter().next()
    }

    fn match_recursive(node: &TrieNode, segments: &[&str], index: usize, matches: &mut Vec<Match>) {
        if index == segments.len() {
            if let Some(found) = Self::terminal_match(node, segments, None) {
                matches.push(found);
            }
            return;
        }

        let segment = segments[index];

        if let Some(child) = node.children.get(segment) {
            Self::match_recursive(child, segments, index + 1, matches);
        }

        if let Some(child) = &node.param_child {
            Self::match_recursive(child, segments, index + 1, matches);
        }

        if let Some(child) = &node.wildcard_child {
            let rest = segments[index..].join("/");
            if let Some(found) = Self::terminal_match(child, segments, Some(rest)) {
                matches.push(found);
            }
        }
    }

    fn terminal_match(node: &TrieNode, segments: &[&str], wildcard: Option<String>) -> Option<Match> {
        let (route, matcher) = node.terminal.as_ref()?;
        let path = format!("/{}", segments.join("/"));

        matcher.matches(&path).map(|params| Match {
            route: route.clone(),
            params,
            wildcard,
        })
    }

    /// Get number of routes in the trie
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if trie is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
