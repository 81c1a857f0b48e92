//! Compressed radix trie for route patterns
//!
//! Nodes hold shared path fragments; children are ordered by priority (the
//! number of handlers in their subtree) so the hottest subtree is probed
//! first, and the `indices` bytes mirror that order for single-byte child
//! dispatch. Wildcard children are tagged (`Param`, `CatchAll`) rather than
//! flagged, and every structural conflict is reported at insertion time.
//!
//! The trie is byte-oriented: fragments may split anywhere, including
//! inside a multi-byte character, so fragments are raw bytes and only the
//! captured parameter values are converted back to strings.
//!
//! Matching precedence: static beats param beats catch-all. A catch-all
//! absorbs the whole remaining path, which by construction has no deeper
//! siblings.

use crate::error::InsertError;
use crate::handler::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Static,
    Root,
    Param,
    CatchAll,
}

/// Result of a lookup.
pub(crate) struct Lookup<'a, T> {
    pub value: Option<&'a T>,
    pub params: Params,
    /// The path differs from a registered route only by a trailing slash.
    pub tsr: bool,
}

#[derive(Debug)]
pub(crate) struct Node<T> {
    path: Vec<u8>,
    kind: NodeKind,
    wild_child: bool,
    indices: Vec<u8>,
    children: Vec<Node<T>>,
    value: Option<T>,
    priority: u32,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            kind: NodeKind::Static,
            wild_child: false,
            indices: Vec::new(),
            children: Vec::new(),
            value: None,
            priority: 0,
        }
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl<T> Node<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a pattern. Conflicts with previously inserted patterns are
    /// errors, and registration failures should be treated as fatal
    /// configuration errors.
    pub(crate) fn add_route(&mut self, path: &str, value: T) -> Result<(), InsertError> {
        self.priority += 1;

        // empty tree
        if self.path.is_empty() && self.children.is_empty() && self.value.is_none() {
            self.insert_child(path.as_bytes(), path, value)?;
            self.kind = NodeKind::Root;
            return Ok(());
        }

        self.walk_insert(path.as_bytes(), path, value)
    }

    fn walk_insert(&mut self, path: &[u8], full_path: &str, value: T) -> Result<(), InsertError> {
        // longest common prefix with this node's fragment
        let mut i = 0;
        let max = path.len().min(self.path.len());
        while i < max && path[i] == self.path[i] {
            i += 1;
        }

        // split the edge when the fragment diverges
        if i < self.path.len() {
            let child = Node {
                path: self.path[i..].to_vec(),
                kind: NodeKind::Static,
                wild_child: self.wild_child,
                indices: std::mem::take(&mut self.indices),
                children: std::mem::take(&mut self.children),
                value: self.value.take(),
                priority: self.priority - 1,
            };
            self.indices = vec![child.path[0]];
            self.children = vec![child];
            self.path.truncate(i);
            self.wild_child = false;
        }

        // the whole pattern was consumed: this node is the leaf
        if i == path.len() {
            if self.value.is_some() {
                return Err(InsertError::DuplicateRoute(full_path.to_string()));
            }
            self.value = Some(value);
            return Ok(());
        }

        let path = &path[i..];

        if self.wild_child {
            let child = &mut self.children[0];
            child.priority += 1;

            // the new pattern must agree with the existing wildcard
            if path.len() >= child.path.len()
                && child.path[..] == path[..child.path.len()]
                && child.kind != NodeKind::CatchAll
                && (child.path.len() >= path.len() || path[child.path.len()] == b'/')
            {
                return child.walk_insert(path, full_path, value);
            }

            let end = path.iter().position(|&b| b == b'/').unwrap_or(path.len());
            return Err(InsertError::ConflictingWildcard {
                segment: text(&path[..end]),
                existing: text(&child.path),
                route: full_path.to_string(),
            });
        }

        let c = path[0];

        // slash after a param node descends into its only child
        if self.kind == NodeKind::Param && c == b'/' && self.children.len() == 1 {
            let child = &mut self.children[0];
            child.priority += 1;
            return child.walk_insert(path, full_path, value);
        }

        // existing static child with a matching first byte
        for i in 0..self.indices.len() {
            if self.indices[i] == c {
                let i = self.increment_child_priority(i);
                return self.children[i].walk_insert(path, full_path, value);
            }
        }

        // no match: insert a fresh child
        if c != b':' && c != b'*' {
            self.indices.push(c);
            self.children.push(Node::default());
            let i = self.increment_child_priority(self.indices.len() - 1);
            return self.children[i].insert_child(path, full_path, value);
        }

        self.insert_child(path, full_path, value)
    }

    /// Insert the remainder of a pattern below this node, splitting out
    /// wildcard segments as dedicated child nodes.
    fn insert_child(&mut self, path: &[u8], full_path: &str, value: T) -> Result<(), InsertError> {
        let mut n = self;
        let mut offset = 0;
        let mut i = 0;

        while i < path.len() {
            let c = path[i];
            if c != b':' && c != b'*' {
                i += 1;
                continue;
            }

            // wildcard runs to the next '/' or the end of the pattern
            let mut end = i + 1;
            while end < path.len() && path[end] != b'/' {
                if path[end] == b':' || path[end] == b'*' {
                    return Err(InsertError::InvalidPattern {
                        route: full_path.to_string(),
                        reason: "only one wildcard per path segment is allowed".to_string(),
                    });
                }
                end += 1;
            }

            if !n.children.is_empty() {
                return Err(InsertError::ConflictingWildcard {
                    segment: text(&path[i..end]),
                    existing: text(&n.indices),
                    route: full_path.to_string(),
                });
            }

            if end - i < 2 {
                return Err(InsertError::InvalidPattern {
                    route: full_path.to_string(),
                    reason: "wildcards must have a non-empty name".to_string(),
                });
            }

            if c == b':' {
                if i > 0 {
                    n.path = path[offset..i].to_vec();
                    offset = i;
                }

                n.children = vec![Node {
                    kind: NodeKind::Param,
                    ..Node::default()
                }];
                n.wild_child = true;
                n = &mut n.children[0];
                n.priority += 1;

                // more pattern after the param: chain a static child
                if end < path.len() {
                    n.path = path[offset..end].to_vec();
                    offset = end;
                    n.children = vec![Node {
                        priority: 1,
                        ..Node::default()
                    }];
                    n = &mut n.children[0];
                }

                i = end;
            } else {
                // catch-all
                if end != path.len() {
                    return Err(InsertError::InvalidPattern {
                        route: full_path.to_string(),
                        reason: "catch-all is only allowed at the end of the route".to_string(),
                    });
                }
                if n.path.last() == Some(&b'/') {
                    return Err(InsertError::ConflictingWildcard {
                        segment: text(&path[i..end]),
                        existing: text(&n.path),
                        route: full_path.to_string(),
                    });
                }
                if i == 0 || path[i - 1] != b'/' {
                    return Err(InsertError::InvalidPattern {
                        route: full_path.to_string(),
                        reason: "no / before catch-all".to_string(),
                    });
                }

                let slash = i - 1;
                n.path = path[offset..slash].to_vec();

                // first a marker node, then the leaf holding the variable
                n.children = vec![Node {
                    kind: NodeKind::CatchAll,
                    wild_child: true,
                    ..Node::default()
                }];
                n.indices = vec![b'/'];
                n = &mut n.children[0];
                n.priority += 1;

                n.children = vec![Node {
                    path: path[slash..].to_vec(),
                    kind: NodeKind::CatchAll,
                    value: Some(value),
                    priority: 1,
                    ..Node::default()
                }];
                return Ok(());
            }
        }

        // no wildcard remains; this node is the leaf
        n.path = path[offset..].to_vec();
        n.value = Some(value);
        Ok(())
    }

    /// Bump a child's priority and keep siblings sorted by descending
    /// priority, mirroring the move in `indices`. Returns the child's new
    /// position.
    fn increment_child_priority(&mut self, pos: usize) -> usize {
        self.children[pos].priority += 1;
        let priority = self.children[pos].priority;

        let mut new_pos = pos;
        while new_pos > 0 && self.children[new_pos - 1].priority < priority {
            self.children.swap(new_pos - 1, new_pos);
            new_pos -= 1;
        }

        if new_pos != pos {
            let b = self.indices.remove(pos);
            self.indices.insert(new_pos, b);
        }

        new_pos
    }

    /// Resolve a concrete path to its value and captured parameters.
    pub(crate) fn get_value(&self, path: &str) -> Lookup<'_, T> {
        let mut n = self;
        let mut path = path.as_bytes();
        let mut params = Params::new();

        loop {
            let fragment = n.path.as_slice();

            if path.len() > fragment.len() && &path[..fragment.len()] == fragment {
                path = &path[fragment.len()..];

                if !n.wild_child {
                    let c = path[0];
                    let mut descended = false;
                    for (i, &index) in n.indices.iter().enumerate() {
                        if index == c {
                            n = &n.children[i];
                            descended = true;
                            break;
                        }
                    }
                    if descended {
                        continue;
                    }

                    // dead end; a handler one slash up means a removable
                    // trailing slash
                    let tsr = path == b"/" && n.value.is_some();
                    return Lookup {
                        value: None,
                        params,
                        tsr,
                    };
                }

                n = &n.children[0];
                match n.kind {
                    NodeKind::Param => {
                        let end = path.iter().position(|&b| b == b'/').unwrap_or(path.len());
                        params.push(text(&n.path[1..]), text(&path[..end]));

                        if end < path.len() {
                            if !n.children.is_empty() {
                                path = &path[end..];
                                n = &n.children[0];
                                continue;
                            }
                            let tsr = path.len() == end + 1;
                            return Lookup {
                                value: None,
                                params,
                                tsr,
                            };
                        }

                        if n.value.is_some() {
                            return Lookup {
                                value: n.value.as_ref(),
                                params,
                                tsr: false,
                            };
                        }
                        let mut tsr = false;
                        if n.children.len() == 1 {
                            let child = &n.children[0];
                            tsr = child.path == b"/" && child.value.is_some();
                        }
                        return Lookup {
                            value: None,
                            params,
                            tsr,
                        };
                    }
                    NodeKind::CatchAll => {
                        // the remainder after the slash is the capture
                        params.push(text(&n.path[2..]), text(&path[1..]));
                        return Lookup {
                            value: n.value.as_ref(),
                            params,
                            tsr: false,
                        };
                    }
                    _ => {
                        // a wild child is always Param or CatchAll
                        return Lookup {
                            value: None,
                            params,
                            tsr: false,
                        };
                    }
                }
            } else if path == fragment {
                if n.value.is_some() {
                    return Lookup {
                        value: n.value.as_ref(),
                        params,
                        tsr: false,
                    };
                }

                if path == b"/" && n.wild_child && n.kind != NodeKind::Root {
                    return Lookup {
                        value: None,
                        params,
                        tsr: true,
                    };
                }

                // an addable trailing slash may reach a handler
                for (i, &index) in n.indices.iter().enumerate() {
                    if index == b'/' {
                        let child = &n.children[i];
                        let tsr = (child.path.len() == 1 && child.value.is_some())
                            || (child.kind == NodeKind::CatchAll
                                && child.children.first().is_some_and(|c| c.value.is_some()));
                        return Lookup {
                            value: None,
                            params,
                            tsr,
                        };
                    }
                }

                return Lookup {
                    value: None,
                    params,
                    tsr: false,
                };
            }

            // no match at this node
            let tsr = path == b"/"
                || (fragment.len() == path.len() + 1
                    && fragment[path.len()] == b'/'
                    && path == &fragment[..fragment.len() - 1]
                    && n.value.is_some());
            return Lookup {
                value: None,
                params,
                tsr,
            };
        }
    }

    /// Find a registered route matching `path` case-insensitively (ASCII
    /// folding), returning it in its registered spelling. With
    /// `fix_trailing_slash` a missing or surplus trailing slash is repaired
    /// as well.
    pub(crate) fn find_case_insensitive_path(
        &self,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        let mut out = Vec::with_capacity(path.len() + 1);
        if self.walk_case_insensitive(path.as_bytes(), fix_trailing_slash, &mut out) {
            Some(text(&out))
        } else {
            None
        }
    }

    fn walk_case_insensitive(
        &self,
        path: &[u8],
        fix_trailing_slash: bool,
        out: &mut Vec<u8>,
    ) -> bool {
        let fragment = self.path.as_slice();

        if path.len() >= fragment.len() && path[..fragment.len()].eq_ignore_ascii_case(fragment) {
            let path = &path[fragment.len()..];
            out.extend_from_slice(fragment);

            if path.is_empty() {
                if self.value.is_some() {
                    return true;
                }
                // try adding a trailing slash
                if fix_trailing_slash {
                    for (i, &index) in self.indices.iter().enumerate() {
                        if index == b'/' {
                            let child = &self.children[i];
                            if (child.path.len() == 1 && child.value.is_some())
                                || (child.kind == NodeKind::CatchAll
                                    && child.children.first().is_some_and(|c| c.value.is_some()))
                            {
                                out.push(b'/');
                                return true;
                            }
                            break;
                        }
                    }
                }
                return false;
            }

            if !self.wild_child {
                let c = path[0].to_ascii_lowercase();
                for (i, &index) in self.indices.iter().enumerate() {
                    if index.to_ascii_lowercase() == c {
                        let mark = out.len();
                        if self.children[i].walk_case_insensitive(path, fix_trailing_slash, out) {
                            return true;
                        }
                        out.truncate(mark);
                    }
                }

                // nothing matched; a lone surplus slash can be dropped
                return fix_trailing_slash && path == b"/" && self.value.is_some();
            }

            let child = &self.children[0];
            match child.kind {
                NodeKind::Param => {
                    let end = path.iter().position(|&b| b == b'/').unwrap_or(path.len());
                    // the parameter value keeps its original spelling
                    out.extend_from_slice(&path[..end]);

                    if end < path.len() {
                        if !child.children.is_empty() {
                            return child.children[0].walk_case_insensitive(
                                &path[end..],
                                fix_trailing_slash,
                                out,
                            );
                        }
                        return fix_trailing_slash
                            && path.len() == end + 1
                            && child.value.is_some();
                    }

                    if child.value.is_some() {
                        return true;
                    }
                    if fix_trailing_slash && child.children.len() == 1 {
                        let grandchild = &child.children[0];
                        if grandchild.path == b"/" && grandchild.value.is_some() {
                            out.push(b'/');
                            return true;
                        }
                    }
                    false
                }
                NodeKind::CatchAll => {
                    out.extend_from_slice(path);
                    child.value.is_some()
                }
                _ => false,
            }
        } else {
            // a missing trailing slash still counts as a match
            fix_trailing_slash
                && path.len() + 1 == fragment.len()
                && fragment[path.len()] == b'/'
                && path.eq_ignore_ascii_case(&fragment[..path.len()])
                && self.value.is_some()
                && {
                    out.extend_from_slice(fragment);
                    true
                }
        }
    }
}
