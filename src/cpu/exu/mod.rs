//! 执行单元，按 ISA 模块拆分
//!
//! 每个 handler 只依赖操作数的位置：压缩指令的操作数已经按展开后的
//! 标准指令排列，因此 `C.*` 直接复用标准指令的 handler。

use super::dispatch::HandlerDef;

mod base;
mod mul;
mod priv_instr;
mod zicsr;

/// 内置 handler 表
pub static HANDLERS: &[HandlerDef] = &[
    // ========== RV I ==========
    HandlerDef::new("LUI", base::lui),
    HandlerDef::new("AUIPC", base::auipc).with_pc(),
    HandlerDef::new("JAL", base::jal).with_size().with_pc(),
    HandlerDef::new("JALR", base::jalr).with_size().with_pc(),
    HandlerDef::new("BEQ", base::beq).with_pc(),
    HandlerDef::new("BNE", base::bne).with_pc(),
    HandlerDef::new("BLT", base::blt).with_pc(),
    HandlerDef::new("BGE", base::bge).with_pc(),
    HandlerDef::new("BLTU", base::bltu).with_pc(),
    HandlerDef::new("BGEU", base::bgeu).with_pc(),
    HandlerDef::new("LB", base::lb),
    HandlerDef::new("LH", base::lh),
    HandlerDef::new("LW", base::lw),
    HandlerDef::new("LD", base::ld),
    HandlerDef::new("LBU", base::lbu),
    HandlerDef::new("LHU", base::lhu),
    HandlerDef::new("LWU", base::lwu),
    HandlerDef::new("SB", base::sb),
    HandlerDef::new("SH", base::sh),
    HandlerDef::new("SW", base::sw),
    HandlerDef::new("SD", base::sd),
    HandlerDef::new("ADDI", base::addi),
    HandlerDef::new("SLTI", base::slti),
    HandlerDef::new("SLTIU", base::sltiu),
    HandlerDef::new("XORI", base::xori),
    HandlerDef::new("ORI", base::ori),
    HandlerDef::new("ANDI", base::andi),
    HandlerDef::new("SLLI", base::slli),
    HandlerDef::new("SRLI", base::srli),
    HandlerDef::new("SRAI", base::srai),
    HandlerDef::new("ADD", base::add),
    HandlerDef::new("SUB", base::sub),
    HandlerDef::new("SLL", base::sll),
    HandlerDef::new("SLT", base::slt),
    HandlerDef::new("SLTU", base::sltu),
    HandlerDef::new("XOR", base::xor),
    HandlerDef::new("SRL", base::srl),
    HandlerDef::new("SRA", base::sra),
    HandlerDef::new("OR", base::or),
    HandlerDef::new("AND", base::and),
    HandlerDef::new("ADDIW", base::addiw),
    HandlerDef::new("SLLIW", base::slliw),
    HandlerDef::new("SRLIW", base::srliw),
    HandlerDef::new("SRAIW", base::sraiw),
    HandlerDef::new("ADDW", base::addw),
    HandlerDef::new("SUBW", base::subw),
    HandlerDef::new("SLLW", base::sllw),
    HandlerDef::new("SRLW", base::srlw),
    HandlerDef::new("SRAW", base::sraw),
    HandlerDef::new("ECALL", priv_instr::ecall),
    HandlerDef::new("EBREAK", priv_instr::ebreak).with_pc(),
    // ========== RV M ==========
    HandlerDef::new("MUL", mul::mul),
    HandlerDef::new("MULH", mul::mulh),
    HandlerDef::new("MULHSU", mul::mulhsu),
    HandlerDef::new("MULHU", mul::mulhu),
    HandlerDef::new("DIV", mul::div),
    HandlerDef::new("DIVU", mul::divu),
    HandlerDef::new("REM", mul::rem),
    HandlerDef::new("REMU", mul::remu),
    HandlerDef::new("MULW", mul::mulw),
    HandlerDef::new("DIVW", mul::divw),
    HandlerDef::new("DIVUW", mul::divuw),
    HandlerDef::new("REMW", mul::remw),
    HandlerDef::new("REMUW", mul::remuw),
    // ========== Zicsr ==========
    HandlerDef::new("CSRRW", zicsr::csrrw),
    HandlerDef::new("CSRRS", zicsr::csrrs),
    HandlerDef::new("CSRRC", zicsr::csrrc),
    HandlerDef::new("CSRRWI", zicsr::csrrwi),
    HandlerDef::new("CSRRSI", zicsr::csrrsi),
    HandlerDef::new("CSRRCI", zicsr::csrrci),
    // ========== 特权指令 ==========
    HandlerDef::new("MRET", priv_instr::mret),
    HandlerDef::new("SRET", priv_instr::sret),
    HandlerDef::new("WFI", priv_instr::wfi),
    HandlerDef::new("SFENCE.VMA", priv_instr::sfence_vma),
    // ========== RV C ==========
    HandlerDef::new("C.ADDI4SPN", base::addi),
    HandlerDef::new("C.LW", base::lw),
    HandlerDef::new("C.LD", base::ld),
    HandlerDef::new("C.SW", base::sw),
    HandlerDef::new("C.SD", base::sd),
    HandlerDef::new("C.ADDI", base::addi),
    HandlerDef::new("C.JAL", base::jal).with_size().with_pc(),
    HandlerDef::new("C.ADDIW", base::addiw),
    HandlerDef::new("C.LI", base::addi),
    HandlerDef::new("C.ADDI16SP", base::addi),
    HandlerDef::new("C.LUI", base::lui),
    HandlerDef::new("C.SRLI", base::srli),
    HandlerDef::new("C.SRAI", base::srai),
    HandlerDef::new("C.ANDI", base::andi),
    HandlerDef::new("C.SUB", base::sub),
    HandlerDef::new("C.XOR", base::xor),
    HandlerDef::new("C.OR", base::or),
    HandlerDef::new("C.AND", base::and),
    HandlerDef::new("C.SUBW", base::subw),
    HandlerDef::new("C.ADDW", base::addw),
    HandlerDef::new("C.J", base::jal).with_size().with_pc(),
    HandlerDef::new("C.BEQZ", base::beq).with_pc(),
    HandlerDef::new("C.BNEZ", base::bne).with_pc(),
    HandlerDef::new("C.SLLI", base::slli),
    HandlerDef::new("C.LWSP", base::lw),
    HandlerDef::new("C.LDSP", base::ld),
    HandlerDef::new("C.JR", base::jalr).with_size().with_pc(),
    HandlerDef::new("C.MV", base::add),
    HandlerDef::new("C.EBREAK", priv_instr::ebreak).with_pc(),
    HandlerDef::new("C.JALR", base::jalr).with_size().with_pc(),
    HandlerDef::new("C.ADD", base::add),
    HandlerDef::new("C.SWSP", base::sw),
    HandlerDef::new("C.SDSP", base::sd),
];
