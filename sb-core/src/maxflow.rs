/// A minimal Dinic's max-flow implementation over integer capacities,
/// used by ConstraintEnforcer to compute minimum s-t cuts (§4.8.2).
pub struct FlowGraph {
    // to, cap, reverse-edge-index
    adj: Vec<Vec<usize>>,
    edges: Vec<(usize, i64, i64)>, // (to, cap, original_cap)
}

pub const INF_CAPACITY: i64 = 1_000_000_000;

impl FlowGraph {
    pub fn new(num_nodes: usize) -> FlowGraph {
        FlowGraph {
            adj: vec![Vec::new(); num_nodes],
            edges: Vec::new(),
        }
    }

    /// Adds a directed arc `from -> to` with the given capacity and its
    /// zero-capacity residual reverse arc. Returns the forward arc index.
    pub fn add_edge(&mut self, from: usize, to: usize, cap: i64) -> usize {
        let fwd = self.edges.len();
        self.edges.push((to, cap, cap));
        self.adj[from].push(fwd);
        let rev = self.edges.len();
        self.edges.push((from, 0, 0));
        self.adj[to].push(rev);
        fwd
    }

    fn bfs_levels(&self, s: usize) -> Vec<i32> {
        let mut level = vec![-1; self.adj.len()];
        level[s] = 0;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(s);
        while let Some(u) = queue.pop_front() {
            for &e in &self.adj[u] {
                let (to, cap, _) = self.edges[e];
                if cap > 0 && level[to] < 0 {
                    level[to] = level[u] + 1;
                    queue.push_back(to);
                }
            }
        }
        level
    }

    fn dfs_blocking(
        &mut self,
        u: usize,
        t: usize,
        pushed: i64,
        level: &[i32],
        iter: &mut [usize],
    ) -> i64 {
        if u == t || pushed == 0 {
            return pushed;
        }
        while iter[u] < self.adj[u].len() {
            let e = self.adj[u][iter[u]];
            let (to, cap, _) = self.edges[e];
            if cap > 0 && level[to] == level[u] + 1 {
                let tr = pushed.min(cap);
                let got = self.dfs_blocking(to, t, tr, level, iter);
                if got > 0 {
                    self.edges[e].1 -= got;
                    let rev = e ^ 1;
                    self.edges[rev].1 += got;
                    return got;
                }
            }
            iter[u] += 1;
        }
        0
    }

    /// Runs Dinic's algorithm from `s` to `t`, mutating residual
    /// capacities in place, and returns the max flow value.
    pub fn max_flow(&mut self, s: usize, t: usize) -> i64 {
        let mut total = 0;
        loop {
            let level = self.bfs_levels(s);
            if level[t] < 0 {
                break;
            }
            let mut iter = vec![0usize; self.adj.len()];
            loop {
                let pushed = self.dfs_blocking(s, t, INF_CAPACITY, &level, &mut iter);
                if pushed == 0 {
                    break;
                }
                total += pushed;
            }
        }
        total
    }

    /// Nodes reachable from `s` in the residual graph after `max_flow`
    /// has run; the min cut is every original-capacity edge crossing
    /// from this set to its complement.
    pub fn reachable_from(&self, s: usize) -> Vec<bool> {
        let mut seen = vec![false; self.adj.len()];
        seen[s] = true;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(s);
        while let Some(u) = queue.pop_front() {
            for &e in &self.adj[u] {
                let (to, cap, _) = self.edges[e];
                if cap > 0 && !seen[to] {
                    seen[to] = true;
                    queue.push_back(to);
                }
            }
        }
        seen
    }

    pub fn original_cap(&self, edge_idx: usize) -> i64 {
        self.edges[edge_idx].2
    }

    pub fn to_of(&self, edge_idx: usize) -> usize {
        self.edges[edge_idx].0
    }
}
