// src/planarity.rs

//! Left-right planarity test (de Fraysseix-Rosenstiehl criterion, in the
//! formulation of Brandes). Boolean test only; no embedding is produced.
//!
//! The PMFG filter calls this after every tentative edge insertion, so the
//! test must handle disconnected graphs and isolated nodes.

/// Returns true when the undirected simple graph given by `node_count` and
/// `edges` (pairs of distinct node ids below `node_count`) is planar.
pub fn is_planar(node_count: usize, edges: &[(usize, usize)]) -> bool {
    let n = node_count;
    let m = edges.len();
    // Every graph on up to four nodes is planar.
    if n < 5 {
        return true;
    }
    // Euler bound for simple planar graphs.
    if m > 3 * n - 6 {
        return false;
    }
    LrState::new(n, edges).run()
}

const NONE: usize = usize::MAX;

/// An interval of directed edge ids on the conflict stack. `NONE` bounds mark
/// an empty side.
#[derive(Clone, Copy)]
struct Interval {
    low: usize,
    high: usize,
}

impl Interval {
    fn empty() -> Self {
        Interval { low: NONE, high: NONE }
    }

    fn is_empty(&self) -> bool {
        self.low == NONE && self.high == NONE
    }
}

#[derive(Clone, Copy)]
struct ConflictPair {
    l: Interval,
    r: Interval,
}

impl ConflictPair {
    fn new() -> Self {
        ConflictPair {
            l: Interval::empty(),
            r: Interval::empty(),
        }
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.l, &mut self.r);
    }
}

struct LrState {
    // Undirected input.
    adj: Vec<Vec<(usize, usize)>>, // node -> (neighbor, undirected edge id)
    oriented: Vec<bool>,           // per undirected edge

    // Directed edges created during the orientation DFS.
    edge_src: Vec<usize>,
    edge_dst: Vec<usize>,
    lowpt: Vec<usize>,
    lowpt2: Vec<usize>,
    nesting_depth: Vec<usize>,

    height: Vec<usize>, // NONE = unvisited
    parent_edge: Vec<usize>,
    out: Vec<Vec<usize>>, // node -> outgoing directed edge ids, traversal order

    // Testing phase.
    ordered: Vec<Vec<usize>>,
    stack: Vec<ConflictPair>,
    stack_bottom: Vec<usize>,
    lowpt_edge: Vec<usize>,
    eref: Vec<usize>,
}

impl LrState {
    fn new(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut adj = vec![Vec::new(); n];
        for (id, &(u, v)) in edges.iter().enumerate() {
            adj[u].push((v, id));
            adj[v].push((u, id));
        }
        LrState {
            adj,
            oriented: vec![false; edges.len()],
            edge_src: Vec::with_capacity(edges.len()),
            edge_dst: Vec::with_capacity(edges.len()),
            lowpt: Vec::with_capacity(edges.len()),
            lowpt2: Vec::with_capacity(edges.len()),
            nesting_depth: Vec::with_capacity(edges.len()),
            height: vec![NONE; n],
            parent_edge: vec![NONE; n],
            out: vec![Vec::new(); n],
            ordered: Vec::new(),
            stack: Vec::new(),
            stack_bottom: Vec::new(),
            lowpt_edge: Vec::new(),
            eref: Vec::new(),
        }
    }

    fn run(mut self) -> bool {
        // Phase 1: orientation DFS from every root of the (possibly
        // disconnected) graph.
        let n = self.adj.len();
        for v in 0..n {
            if self.height[v] == NONE {
                self.height[v] = 0;
                self.orient(v);
            }
        }

        // Sort each adjacency by nesting depth; the stable sort keeps the
        // traversal order on ties, which keeps the test deterministic.
        self.ordered = self
            .out
            .iter()
            .map(|edges| {
                let mut sorted = edges.clone();
                sorted.sort_by_key(|&e| self.nesting_depth[e]);
                sorted
            })
            .collect();

        let m = self.edge_src.len();
        self.stack_bottom = vec![0; m];
        self.lowpt_edge = vec![NONE; m];
        self.eref = vec![NONE; m];

        // Phase 2: testing DFS from every root.
        for v in 0..n {
            if self.parent_edge[v] == NONE && !self.test(v) {
                return false;
            }
        }
        true
    }

    fn new_edge(&mut self, src: usize, dst: usize) -> usize {
        let id = self.edge_src.len();
        self.edge_src.push(src);
        self.edge_dst.push(dst);
        self.lowpt.push(self.height[src]);
        self.lowpt2.push(self.height[src]);
        self.nesting_depth.push(0);
        id
    }

    fn orient(&mut self, v: usize) {
        let e = self.parent_edge[v];
        for k in 0..self.adj[v].len() {
            let (w, ueid) = self.adj[v][k];
            if self.oriented[ueid] {
                continue;
            }
            self.oriented[ueid] = true;

            let vw = self.new_edge(v, w);
            self.out[v].push(vw);

            if self.height[w] == NONE {
                // Tree edge.
                self.parent_edge[w] = vw;
                self.height[w] = self.height[v] + 1;
                self.orient(w);
            } else {
                // Back edge.
                self.lowpt[vw] = self.height[w];
            }

            self.nesting_depth[vw] = 2 * self.lowpt[vw];
            if self.lowpt2[vw] < self.height[v] {
                // Chordal: give it a deeper nesting slot.
                self.nesting_depth[vw] += 1;
            }

            if e != NONE {
                if self.lowpt[vw] < self.lowpt[e] {
                    self.lowpt2[e] = self.lowpt[e].min(self.lowpt2[vw]);
                    self.lowpt[e] = self.lowpt[vw];
                } else if self.lowpt[vw] > self.lowpt[e] {
                    self.lowpt2[e] = self.lowpt2[e].min(self.lowpt[vw]);
                } else {
                    self.lowpt2[e] = self.lowpt2[e].min(self.lowpt2[vw]);
                }
            }
        }
    }

    fn test(&mut self, v: usize) -> bool {
        let e = self.parent_edge[v];
        let order = self.ordered[v].clone();
        for (idx, &ei) in order.iter().enumerate() {
            self.stack_bottom[ei] = self.stack.len();
            let w = self.edge_dst[ei];
            if self.parent_edge[w] == ei {
                // Tree edge.
                if !self.test(w) {
                    return false;
                }
            } else {
                // Back edge: its own return edge is itself.
                self.lowpt_edge[ei] = ei;
                let mut p = ConflictPair::new();
                p.r = Interval { low: ei, high: ei };
                self.stack.push(p);
            }

            if self.lowpt[ei] < self.height[v] {
                // ei has a return edge below v.
                if e != NONE {
                    if idx == 0 {
                        self.lowpt_edge[e] = self.lowpt_edge[ei];
                    } else if !self.add_constraints(ei, e) {
                        return false;
                    }
                }
            }
        }

        if e != NONE {
            let u = self.edge_src[e];
            self.trim_back_edges(u);
            // The reference of e is its highest surviving return edge.
            if self.lowpt[e] < self.height[u] {
                if let Some(top) = self.stack.last() {
                    let hl = top.l.high;
                    let hr = top.r.high;
                    if hl != NONE && (hr == NONE || self.lowpt[hl] > self.lowpt[hr]) {
                        self.eref[e] = hl;
                    } else {
                        self.eref[e] = hr;
                    }
                }
            }
        }
        true
    }

    fn conflicting(&self, i: &Interval, b: usize) -> bool {
        !i.is_empty() && self.lowpt[i.high] > self.lowpt[b]
    }

    fn add_constraints(&mut self, ei: usize, e: usize) -> bool {
        let mut p = ConflictPair::new();

        // Merge the return edges of ei into p.r.
        while self.stack.len() > self.stack_bottom[ei] {
            let mut q = match self.stack.pop() {
                Some(q) => q,
                None => return false,
            };
            if !q.l.is_empty() {
                q.swap();
            }
            if !q.l.is_empty() {
                return false; // Both sides populated: not planar.
            }
            if self.lowpt[q.r.low] > self.lowpt[e] {
                if p.r.is_empty() {
                    p.r.high = q.r.high;
                } else {
                    self.eref[p.r.low] = q.r.high;
                }
                p.r.low = q.r.low;
            } else {
                // Align below the lowpoint of e.
                self.eref[q.r.low] = self.lowpt_edge[e];
            }
        }

        // Merge conflicting return edges of the earlier siblings into p.l.
        while let Some(top) = self.stack.last() {
            if !(self.conflicting(&top.l, ei) || self.conflicting(&top.r, ei)) {
                break;
            }
            let mut q = match self.stack.pop() {
                Some(q) => q,
                None => break,
            };
            if self.conflicting(&q.r, ei) {
                q.swap();
            }
            if self.conflicting(&q.r, ei) {
                return false; // Conflict on both sides: not planar.
            }
            // Merge the interval below lowpt(ei) into p.r.
            if p.r.low != NONE {
                self.eref[p.r.low] = q.r.high;
            }
            if q.r.low != NONE {
                p.r.low = q.r.low;
            }
            if p.l.is_empty() {
                p.l.high = q.l.high;
            } else {
                self.eref[p.l.low] = q.l.high;
            }
            p.l.low = q.l.low;
        }

        if !(p.l.is_empty() && p.r.is_empty()) {
            self.stack.push(p);
        }
        true
    }

    fn lowest(&self, p: &ConflictPair) -> usize {
        if p.l.is_empty() {
            return self.lowpt[p.r.low];
        }
        if p.r.is_empty() {
            return self.lowpt[p.l.low];
        }
        self.lowpt[p.l.low].min(self.lowpt[p.r.low])
    }

    /// Drops and trims intervals whose back edges return to `u`, the parent
    /// endpoint of the tree edge being closed.
    fn trim_back_edges(&mut self, u: usize) {
        while let Some(top) = self.stack.last() {
            if self.lowest(top) != self.height[u] {
                break;
            }
            self.stack.pop();
        }

        if let Some(mut p) = self.stack.pop() {
            // Trim the left interval.
            while p.l.high != NONE && self.edge_dst[p.l.high] == u {
                p.l.high = self.eref[p.l.high];
            }
            if p.l.high == NONE && p.l.low != NONE {
                self.eref[p.l.low] = p.r.low;
                p.l.low = NONE;
            }
            // Trim the right interval.
            while p.r.high != NONE && self.edge_dst[p.r.high] == u {
                p.r.high = self.eref[p.r.high];
            }
            if p.r.high == NONE && p.r.low != NONE {
                self.eref[p.r.low] = p.l.low;
                p.r.low = NONE;
            }
            self.stack.push(p);
        }
    }
}
