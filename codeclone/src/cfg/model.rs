use ruff_python_ast::{Expr, Stmt};

/// One entry in a basic block. Conditions, iterables, context expressions,
/// and match subjects are recorded as expression statements; synthetic
/// markers injected by the builder are `Meta`.
#[derive(Debug, Clone)]
pub enum BlockStmt<'a> {
    /// A statement taken verbatim from the function body.
    Stmt(&'a Stmt),
    /// An expression recorded as a statement.
    Cond(&'a Expr),
    /// A synthetic marker, printed under the `__CC_META__::` namespace.
    Meta(String),
}

/// A basic block: ordered statements plus ordered successor ids.
#[derive(Debug)]
pub struct Block<'a> {
    pub id: usize,
    pub statements: Vec<BlockStmt<'a>>,
    pub successors: Vec<usize>,
    pub terminated: bool,
}

impl<'a> Block<'a> {
    pub(super) fn new(id: usize) -> Self {
        Self {
            id,
            statements: Vec::new(),
            successors: Vec::new(),
            terminated: false,
        }
    }

    /// Adds an edge, preserving insertion order and ignoring duplicates.
    pub fn add_successor(&mut self, target: usize) {
        if !self.successors.contains(&target) {
            self.successors.push(target);
        }
    }
}

/// Control-flow graph for a single function. Block 0 is the entry, block 1
/// the synthetic exit; terminal blocks have no successors beyond it.
#[derive(Debug)]
pub struct Cfg<'a> {
    pub qualname: String,
    pub blocks: Vec<Block<'a>>,
}

impl<'a> Cfg<'a> {
    pub(super) const ENTRY: usize = 0;
    pub(super) const EXIT: usize = 1;

    pub(super) fn new(qualname: &str) -> Self {
        let mut cfg = Self {
            qualname: qualname.to_owned(),
            blocks: Vec::new(),
        };
        cfg.create_block(); // entry
        cfg.create_block(); // exit
        cfg
    }

    /// Allocates a fresh block with the next sequential id.
    pub(super) fn create_block(&mut self) -> usize {
        let id = self.blocks.len();
        self.blocks.push(Block::new(id));
        id
    }

    /// Entry block id.
    #[must_use]
    pub const fn entry(&self) -> usize {
        Self::ENTRY
    }

    /// Exit block id.
    #[must_use]
    pub const fn exit(&self) -> usize {
        Self::EXIT
    }
}
