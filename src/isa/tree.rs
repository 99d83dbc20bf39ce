//! 解码树
//!
//! 节点保存在一个 arena (`Vec<Node>`) 中，用 `NodeId` 互相引用。
//! 子节点总是先于父节点创建，因此任何路径上的 id 严格递减，遍历必然终止。

use std::fmt;

use super::decl::{InstructionDeclaration, Xlen};

/// 节点下标
pub type NodeId = u32;

/// 声明在树内声明表中的下标
pub type DeclId = usize;

/// 解码树节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// 按多位 mask 分派，`cases` 按取值升序，未命中走 `default`
    Switch {
        mask: u32,
        cases: Box<[(u32, NodeId)]>,
        default: NodeId,
    },
    /// 按单个位分派
    Branch { bit: u8, zero: NodeId, one: NodeId },
    /// 唯一匹配的声明
    Leaf(DeclId),
    /// 空操作声明
    Nop(DeclId),
    /// 非法编码
    Illegal,
}

/// 解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision<'a> {
    Instruction(DeclId, &'a InstructionDeclaration),
    Nop(&'a InstructionDeclaration),
    Illegal,
}

impl Decision<'_> {
    pub fn is_illegal(&self) -> bool {
        matches!(self, Decision::Illegal)
    }

    /// 命中的声明助记符
    pub fn mnemonic(&self) -> Option<&'static str> {
        match self {
            Decision::Instruction(_, decl) | Decision::Nop(decl) => Some(decl.mnemonic),
            Decision::Illegal => None,
        }
    }
}

/// 单一 XLEN 的解码树
///
/// 构建后只读，可以在多个 CPU 之间共享。
#[derive(Clone)]
pub struct DecoderTree {
    pub(super) xlen: Xlen,
    pub(super) decls: Vec<InstructionDeclaration>,
    pub(super) nodes: Vec<Node>,
    pub(super) root: NodeId,
}

impl DecoderTree {
    /// 把一个指令字解码为声明
    ///
    /// 对任意 32 位输入都返回结果，16-bit 指令只看低 16 位的固定位。
    pub fn decide(&self, raw: u32) -> Decision<'_> {
        let mut id = self.root;
        loop {
            match &self.nodes[id as usize] {
                Node::Switch { mask, cases, default } => {
                    let key = raw & mask;
                    id = match cases.binary_search_by_key(&key, |&(value, _)| value) {
                        Ok(i) => cases[i].1,
                        Err(_) => *default,
                    };
                }
                Node::Branch { bit, zero, one } => {
                    id = if (raw >> bit) & 1 == 0 { *zero } else { *one };
                }
                Node::Leaf(decl) => return Decision::Instruction(*decl, &self.decls[*decl]),
                Node::Nop(decl) => return Decision::Nop(&self.decls[*decl]),
                Node::Illegal => return Decision::Illegal,
            }
        }
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    /// 参与构建的声明（已按 XLEN 过滤）
    pub fn declarations(&self) -> &[InstructionDeclaration] {
        &self.decls
    }

    pub fn declaration(&self, id: DeclId) -> Option<&InstructionDeclaration> {
        self.decls.get(id)
    }

    /// 按助记符查找
    pub fn find(&self, mnemonic: &str) -> Option<&InstructionDeclaration> {
        self.decls.iter().find(|d| d.mnemonic == mnemonic)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// 最长路径上的分派节点个数
    pub fn depth(&self) -> usize {
        // 子节点 id 小于父节点，按 id 升序即为拓扑序
        let mut depth = vec![0usize; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            depth[id] = match node {
                Node::Switch { cases, default, .. } => {
                    1 + cases
                        .iter()
                        .map(|&(_, child)| depth[child as usize])
                        .fold(depth[*default as usize], usize::max)
                }
                Node::Branch { zero, one, .. } => {
                    1 + depth[*zero as usize].max(depth[*one as usize])
                }
                Node::Leaf(_) | Node::Nop(_) | Node::Illegal => 0,
            };
        }
        depth.get(self.root as usize).copied().unwrap_or(0)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let pad = indent * 2;
        match &self.nodes[id as usize] {
            Node::Switch { mask, cases, default } => {
                writeln!(f, "{:pad$}switch mask=0x{mask:08x}", "")?;
                for &(value, child) in cases.iter() {
                    writeln!(f, "{:pad$}case 0x{value:08x}:", "")?;
                    self.render(f, child, indent + 1)?;
                }
                writeln!(f, "{:pad$}default:", "")?;
                self.render(f, *default, indent + 1)
            }
            Node::Branch { bit, zero, one } => {
                writeln!(f, "{:pad$}bit {bit} = 0:", "")?;
                self.render(f, *zero, indent + 1)?;
                writeln!(f, "{:pad$}bit {bit} = 1:", "")?;
                self.render(f, *one, indent + 1)
            }
            Node::Leaf(decl) => writeln!(f, "{:pad$}{}", "", self.decls[*decl].mnemonic),
            Node::Nop(decl) => writeln!(f, "{:pad$}{} (nop)", "", self.decls[*decl].mnemonic),
            Node::Illegal => writeln!(f, "{:pad$}<illegal>", ""),
        }
    }
}

/// 缩进文本形式的整棵树，用于调试
impl fmt::Display for DecoderTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} decoder tree ({} nodes)", self.xlen, self.nodes.len())?;
        self.render(f, self.root, 0)
    }
}

impl fmt::Debug for DecoderTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderTree")
            .field("xlen", &self.xlen)
            .field("declarations", &self.decls.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
