//! Per-HTTP-method segment tree: construction and matching.
//!
//! Each HTTP method gets its own root `Node`. A node holds the literal children reachable from it
//! (keyed by [`hash_segment`], guarded by an exact string compare to tolerate hash collisions),
//! at most one wildcard (capturing) child, and the routes that terminate exactly at this node,
//! sorted by descending API version so matching always prefers the newest compatible route.

use std::collections::HashMap;
use std::sync::Arc;

use crate::router::hash::hash_segment;
use crate::router::segment::{Route, Segment};

/// A single node in a method's segment tree.
#[derive(Default)]
pub struct Node {
    /// Literal children, keyed by segment hash; each bucket holds every literal whose hash
    /// collided, disambiguated by exact string equality at lookup time.
    literal_children: HashMap<u64, Vec<(String, Node)>>,
    /// The capturing child, if any route registered under this node has one at this depth. Only
    /// one wildcard child can exist per node: two routes that both capture at the same depth
    /// share it.
    wildcard_child: Option<Box<Node>>,
    /// Routes that terminate at this exact node, sorted by descending `version`.
    routes: Vec<Arc<Route>>,
}

impl Node {
    fn child_mut(&mut self, segment: &Segment) -> &mut Node {
        match segment {
            Segment::Literal(s) => {
                let hash = hash_segment(s);
                let bucket = self.literal_children.entry(hash).or_default();
                if let Some(pos) = bucket.iter().position(|(k, _)| k == s) {
                    &mut bucket[pos].1
                } else {
                    bucket.push((s.clone(), Node::default()));
                    &mut bucket.last_mut().unwrap().1
                }
            }
            Segment::Capture { .. } => self.wildcard_child.get_or_insert_with(|| Box::new(Node::default())),
        }
    }

    fn insert(&mut self, segments: &[Segment], route: Arc<Route>) {
        match segments.split_first() {
            None => {
                self.routes.push(route);
                self.routes.sort_by(|a, b| b.version.cmp(&a.version));
            }
            Some((head, rest)) => self.child_mut(head).insert(rest, route),
        }
    }

    /// Recursively matches `path_segments` against this subtree. Returns the selected route
    /// (highest version not exceeding `requested_version`, with no special case for `0` — a
    /// requested version of `0` only matches routes registered at version `0`) together with the
    /// ordered list of captured `(arg_name, raw_value)` pairs in root-to-leaf order.
    fn traverse<'p>(
        &self,
        path_segments: &[&'p str],
        requested_version: u32,
    ) -> Option<(Arc<Route>, Vec<(String, &'p str)>)> {
        match path_segments.split_first() {
            None => self.select_version(requested_version).map(|r| (r, Vec::new())),
            Some((head, rest)) => {
                // Literal children are tried first: an exact textual match is always preferred
                // over a capture at the same depth.
                if let Some(bucket) = self.literal_children.get(&hash_segment(head)) {
                    if let Some((_, child)) = bucket.iter().find(|(k, _)| k == head) {
                        if let Some(found) = child.traverse(rest, requested_version) {
                            return Some(found);
                        }
                    }
                }
                if let Some(child) = &self.wildcard_child {
                    if let Some((route, mut captures)) = child.traverse(rest, requested_version) {
                        let arg_name = route
                            .segments
                            .get(route.segments.len() - rest.len() - 1)
                            .and_then(|s| match s {
                                Segment::Capture { arg_name } => Some(arg_name.clone()),
                                Segment::Literal(_) => None,
                            })
                            .unwrap_or_default();
                        // Captures accumulate during unwind (leaf to root); each frame prepends
                        // its own segment so the final vector reads root-to-leaf.
                        captures.insert(0, (arg_name, *head));
                        return Some((route, captures));
                    }
                }
                None
            }
        }
    }

    /// Routes are stored sorted by descending version, so the first one whose version does not
    /// exceed `requested_version` is also the highest such version. There is no carve-out for
    /// `requested_version == 0`: it matches only routes registered at version `0`, same as any
    /// other requested version matches only routes at or below it.
    fn select_version(&self, requested_version: u32) -> Option<Arc<Route>> {
        self.routes.iter().find(|r| r.version <= requested_version).cloned()
    }
}

/// The segment tree for a single HTTP method.
#[derive(Default)]
pub struct SegmentTree {
    root: Node,
}

impl SegmentTree {
    pub fn new() -> Self {
        SegmentTree::default()
    }

    /// Registers `route` under its own `segments`. Two routes with identical segments and method
    /// may coexist only if they carry different `version`s; inserting two routes with the same
    /// method, segments, and version is a caller bug (the later registration simply shadows
    /// nothing — both remain in the version list, and matching picks whichever sorts first,
    /// which is unspecified). Route registration should be validated for uniqueness upstream.
    pub fn insert(&mut self, route: Arc<Route>) {
        let segments = route.segments.clone();
        self.root.insert(&segments, route);
    }

    /// Matches a `/`-split path against this tree, returning the selected route and its captured
    /// path arguments in declaration order.
    pub fn match_path(&self, path: &str, requested_version: u32) -> Option<(Arc<Route>, Vec<(String, String)>)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.root
            .traverse(&segments, requested_version)
            .map(|(route, captures)| {
                let owned = captures
                    .into_iter()
                    .map(|(name, value)| (name, value.to_string()))
                    .collect();
                (route, owned)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::boxed;
    use crate::router::segment::{Arg, ArgSource, Segment, Visibility};
    use crate::value::ArgType;
    use hyper::Method;

    fn literal_route(method: Method, path: &[&str], version: u32) -> Arc<Route> {
        Arc::new(Route {
            method,
            version,
            segments: path.iter().map(|s| Segment::Literal(s.to_string())).collect(),
            args: Vec::new(),
            handler: boxed(move |_ctx| crate::task::Task::finished(Ok(serde_json::json!({"ok": true})))),
            body_arg_index: None,
        })
    }

    fn capture_route(method: Method, literal_prefix: &str, arg_name: &str, version: u32) -> Arc<Route> {
        Arc::new(Route {
            method,
            version,
            segments: vec![
                Segment::Literal(literal_prefix.to_string()),
                Segment::Capture {
                    arg_name: arg_name.to_string(),
                },
            ],
            args: vec![Arg {
                name: arg_name.to_string(),
                ty: ArgType::String,
                source: ArgSource::Path,
                visibility: Visibility::Public,
                optional: false,
                default: None,
            }],
            handler: boxed(move |_ctx| crate::task::Task::finished(Ok(serde_json::json!({"ok": true})))),
            body_arg_index: None,
        })
    }

    #[test]
    fn exact_literal_match() {
        let mut tree = SegmentTree::new();
        tree.insert(literal_route(Method::GET, &["users", "me"], 1));
        let (route, captures) = tree.match_path("/users/me", 1).unwrap();
        assert_eq!(route.path_template(), "/users/me");
        assert!(captures.is_empty());
    }

    #[test]
    fn literal_preferred_over_capture_at_same_depth() {
        let mut tree = SegmentTree::new();
        tree.insert(literal_route(Method::GET, &["users", "me"], 1));
        tree.insert(capture_route(Method::GET, "users", "id", 1));
        let (route, captures) = tree.match_path("/users/me", 1).unwrap();
        assert_eq!(route.path_template(), "/users/me");
        assert!(captures.is_empty());

        let (route, captures) = tree.match_path("/users/42", 1).unwrap();
        assert_eq!(route.path_template(), "/users/{id}");
        assert_eq!(captures, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn version_selection_picks_highest_not_exceeding_request() {
        let mut tree = SegmentTree::new();
        tree.insert(literal_route(Method::GET, &["ping"], 1));
        tree.insert(literal_route(Method::GET, &["ping"], 2));
        tree.insert(literal_route(Method::GET, &["ping"], 3));

        // Requesting version 0 with no v=0 route registered matches nothing: there is no
        // "no preference" carve-out, only the literal rule `r.version <= requested_version`.
        assert!(tree.match_path("/ping", 0).is_none());
        assert_eq!(tree.match_path("/ping", 2).unwrap().0.version, 2);
        assert_eq!(tree.match_path("/ping", 5).unwrap().0.version, 3);
        assert!(tree.match_path("/ping", 1).is_some());
    }

    #[test]
    fn version_zero_route_serves_as_the_default_fallback() {
        let mut tree = SegmentTree::new();
        tree.insert(literal_route(Method::GET, &["users"], 0));
        tree.insert(literal_route(Method::GET, &["users"], 2));

        // API-VERSION: 0 matches only the v=0 route, never the newer one.
        assert_eq!(tree.match_path("/users", 0).unwrap().0.version, 0);
        // A requested version between the two still resolves to the highest route at or below it.
        assert_eq!(tree.match_path("/users", 1).unwrap().0.version, 0);
        assert_eq!(tree.match_path("/users", 2).unwrap().0.version, 2);
    }

    #[test]
    fn no_match_returns_none() {
        let mut tree = SegmentTree::new();
        tree.insert(literal_route(Method::GET, &["ping"], 1));
        assert!(tree.match_path("/pong", 1).is_none());
    }

    #[test]
    fn multiple_captures_collect_in_root_to_leaf_order() {
        let mut tree = SegmentTree::new();
        tree.insert(Arc::new(Route {
            method: Method::GET,
            version: 1,
            segments: vec![
                Segment::Literal("orgs".to_string()),
                Segment::Capture { arg_name: "org".to_string() },
                Segment::Literal("repos".to_string()),
                Segment::Capture { arg_name: "repo".to_string() },
            ],
            args: vec![],
            handler: boxed(|_ctx| crate::task::Task::finished(Ok(serde_json::json!({})))),
            body_arg_index: None,
        }));
        let (_route, captures) = tree.match_path("/orgs/acme/repos/widgets", 1).unwrap();
        assert_eq!(
            captures,
            vec![
                ("org".to_string(), "acme".to_string()),
                ("repo".to_string(), "widgets".to_string())
            ]
        );
    }
}
