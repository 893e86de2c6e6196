//! The physical operator contract (§4.4).
//!
//! Operators are lazy producers pulled by an executor with no async runtime
//! anywhere in scope (single-threaded, cooperative, no preemption); see
//! DESIGN.md for the reasoning behind a synchronous iterator per operator
//! rather than a push-based, polled pipeline.
//!
//! Every operator owns its upstream producer(s) and is itself one; building
//! the physical plan is just nesting these iterators bottom-up, one entry
//! point per stage, minus any poll/waker machinery a synchronous pull
//! doesn't need.

use flint_error::Result;
use flint_types::Morsel;

/// A boxed, pull-based stream of morsels. Every physical operator is, or
/// produces, one of these.
pub type OperatorStream = Box<dyn Iterator<Item = Result<Morsel>> + Send>;

/// A named node in the physical plan, for `EXPLAIN` rendering.
///
/// Operators that wrap an upstream stream in a plain `Iterator` adaptor
/// (most of them) don't need to implement this directly; the physical
/// planner wraps each stage in a [`Labeled`] as it builds the pipeline so
/// `EXPLAIN` can walk the tree without every operator struct carrying its
/// own name plumbing.
pub trait Explain {
    fn operator_name(&self) -> &'static str;
}

/// One node of the `EXPLAIN` tree the physical planner builds alongside the
/// executable pipeline (§4.1 hint validation warnings surface here too).
#[derive(Debug, Clone)]
pub struct ExplainNode {
    pub name: &'static str,
    pub detail: Option<String>,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn leaf(name: &'static str) -> Self {
        ExplainNode { name, detail: None, children: Vec::new() }
    }

    pub fn unary(name: &'static str, child: ExplainNode) -> Self {
        ExplainNode { name, detail: None, children: vec![child] }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Render as an indented text tree, the shape `SHOW`/`EXPLAIN` output
    /// takes (§6).
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(self.name);
        if let Some(detail) = &self.detail {
            out.push_str(" (");
            out.push_str(detail);
            out.push(')');
        }
        out.push('\n');
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}
