//! 解码树构建
//!
//! 从声明表生成解码树：
//! 1. 过滤出当前 XLEN 有效的声明并检查其自洽性
//! 2. 所有候选共享的未决固定位组成 switch；没有共享位时按使用最多的位二分
//! 3. 固定位已全部判定的候选作为回退，随候选一起下沉，最终由固定位最多者胜出

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::decl::{DeclKind, InstrSize, InstructionDeclaration, Xlen};
use super::operands::MAX_OPERANDS;
use super::tree::{DeclId, DecoderTree, Node, NodeId};

/// 构建错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no declarations apply to {0}")]
    Empty(Xlen),

    #[error("{mnemonic}: pattern 0x{pattern:08x} sets bits outside mask 0x{mask:08x}")]
    PatternOutsideMask {
        mnemonic: &'static str,
        mask: u32,
        pattern: u32,
    },

    #[error("{mnemonic}: low two opcode bits are not fixed, encoded width is undetermined")]
    WidthUndetermined { mnemonic: &'static str },

    #[error("{mnemonic}: declared width does not match its low opcode bits")]
    WidthMismatch { mnemonic: &'static str },

    #[error("{mnemonic}: {arity} operands exceed the supported maximum of {max}")]
    TooManyOperands {
        mnemonic: &'static str,
        arity: usize,
        max: usize,
    },

    #[error("mnemonic {0} declared more than once for the same width")]
    DuplicateMnemonic(&'static str),

    #[error("{first} and {second} match the same encodings with equal specificity (e.g. 0x{example:08x})")]
    Ambiguous {
        first: &'static str,
        second: &'static str,
        example: u32,
    },
}

/// 构建指定 XLEN 的解码树
pub fn build(xlen: Xlen, declarations: &[InstructionDeclaration]) -> Result<DecoderTree, BuildError> {
    let decls: Vec<InstructionDeclaration> = declarations
        .iter()
        .filter(|d| d.variant.includes(xlen))
        .copied()
        .collect();
    if decls.is_empty() {
        return Err(BuildError::Empty(xlen));
    }
    validate(&decls)?;

    let mut builder = TreeBuilder {
        decls: &decls,
        nodes: vec![Node::Illegal],
        leaves: HashMap::new(),
    };
    let all: Vec<DeclId> = (0..decls.len()).collect();
    let root = builder.partition(&all, 0, 0)?;
    let nodes = builder.nodes;

    let tree = DecoderTree {
        xlen,
        decls,
        nodes,
        root,
    };
    log::debug!(
        "built {} decoder tree: {} declarations, {} nodes, depth {}",
        xlen,
        tree.decls.len(),
        tree.nodes.len(),
        tree.depth()
    );
    Ok(tree)
}

/// 单条声明与重名检查
fn validate(decls: &[InstructionDeclaration]) -> Result<(), BuildError> {
    let mut seen = HashMap::with_capacity(decls.len());
    for decl in decls {
        if decl.pattern & !decl.mask != 0 {
            return Err(BuildError::PatternOutsideMask {
                mnemonic: decl.mnemonic,
                mask: decl.mask,
                pattern: decl.pattern,
            });
        }
        if decl.mask & 0b11 != 0b11 {
            return Err(BuildError::WidthUndetermined { mnemonic: decl.mnemonic });
        }
        if decl.size != InstrSize::of(decl.pattern) {
            return Err(BuildError::WidthMismatch { mnemonic: decl.mnemonic });
        }
        if decl.size == InstrSize::Compressed && decl.mask & 0xFFFF_0000 != 0 {
            return Err(BuildError::PatternOutsideMask {
                mnemonic: decl.mnemonic,
                mask: decl.mask,
                pattern: decl.pattern,
            });
        }
        if decl.arity() > MAX_OPERANDS {
            return Err(BuildError::TooManyOperands {
                mnemonic: decl.mnemonic,
                arity: decl.arity(),
                max: MAX_OPERANDS,
            });
        }
        if seen.insert(decl.mnemonic, ()).is_some() {
            return Err(BuildError::DuplicateMnemonic(decl.mnemonic));
        }
    }
    Ok(())
}

struct TreeBuilder<'a> {
    decls: &'a [InstructionDeclaration],
    nodes: Vec<Node>,
    /// 每条声明只生成一个叶子
    leaves: HashMap<DeclId, NodeId>,
}

/// 非法叶子固定在 0 号节点
const ILLEGAL: NodeId = 0;

impl TreeBuilder<'_> {
    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        (self.nodes.len() - 1) as NodeId
    }

    /// `decided` 为路径上已判定的位，`value` 为这些位的取值
    fn partition(&mut self, cands: &[DeclId], decided: u32, value: u32) -> Result<NodeId, BuildError> {
        if cands.is_empty() {
            return Ok(ILLEGAL);
        }

        let (settled, open): (Vec<DeclId>, Vec<DeclId>) = cands
            .iter()
            .partition(|&&i| self.decls[i].mask & !decided == 0);

        if open.is_empty() {
            return self.leaf(&settled, value);
        }

        let common = open
            .iter()
            .fold(!decided, |acc, &i| acc & self.decls[i].mask);

        if common != 0 {
            let mut groups: BTreeMap<u32, Vec<DeclId>> = BTreeMap::new();
            for &i in &open {
                groups.entry(self.decls[i].pattern & common).or_default().push(i);
            }
            let default = if settled.is_empty() {
                ILLEGAL
            } else {
                self.leaf(&settled, value)?
            };
            let mut cases = Vec::with_capacity(groups.len());
            for (key, mut group) in groups {
                group.extend_from_slice(&settled);
                let child = self.partition(&group, decided | common, value | key)?;
                cases.push((key, child));
            }
            return Ok(self.push(Node::Switch {
                mask: common,
                cases: cases.into_boxed_slice(),
                default,
            }));
        }

        // 没有所有候选都固定的位，选被最多候选固定的位二分；平局取低位
        let mut best = (0u32, 0usize);
        for bit in 0..32u32 {
            if decided & (1 << bit) != 0 {
                continue;
            }
            let uses = open
                .iter()
                .filter(|&&i| self.decls[i].mask & (1 << bit) != 0)
                .count();
            if uses > best.1 {
                best = (bit, uses);
            }
        }
        let bit = best.0;
        let flag = 1u32 << bit;

        let mut zero = Vec::new();
        let mut one = Vec::new();
        for &i in cands {
            let decl = &self.decls[i];
            if decl.mask & flag == 0 {
                zero.push(i);
                one.push(i);
            } else if decl.pattern & flag == 0 {
                zero.push(i);
            } else {
                one.push(i);
            }
        }
        let zero = self.partition(&zero, decided | flag, value)?;
        let one = self.partition(&one, decided | flag, value | flag)?;
        Ok(self.push(Node::Branch {
            bit: bit as u8,
            zero,
            one,
        }))
    }

    /// 所有候选在当前路径上都完全匹配，取固定位最多的一条
    fn leaf(&mut self, settled: &[DeclId], value: u32) -> Result<NodeId, BuildError> {
        let mut ranked = settled.to_vec();
        ranked.sort_by_key(|&i| std::cmp::Reverse(self.decls[i].specificity()));
        let winner = ranked[0];
        if let Some(&runner_up) = ranked.get(1) {
            if self.decls[runner_up].specificity() == self.decls[winner].specificity() {
                return Err(BuildError::Ambiguous {
                    first: self.decls[winner].mnemonic,
                    second: self.decls[runner_up].mnemonic,
                    example: value | self.decls[winner].pattern,
                });
            }
        }

        match self.decls[winner].kind {
            DeclKind::Illegal => Ok(ILLEGAL),
            kind => {
                if let Some(&id) = self.leaves.get(&winner) {
                    return Ok(id);
                }
                let node = if kind == DeclKind::Nop {
                    Node::Nop(winner)
                } else {
                    Node::Leaf(winner)
                };
                let id = self.push(node);
                self.leaves.insert(winner, id);
                Ok(id)
            }
        }
    }
}
