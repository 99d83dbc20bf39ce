//! RV32I/RV64I 基础整数指令声明

use crate::isa::decl::InstructionDeclaration as Decl;
use crate::isa::fields::*;

// ========== 基础指令声明表 ==========

/// RV32I 与 RV64I 共用的基础指令，以及各自独有的变体
pub static RV_BASE_DECLS: &[Decl] = &[
    // ========== U-type ==========
    Decl::new("LUI", U_TYPE_MASK, OP_LUI, &[RD, IMM_U]),
    Decl::new("AUIPC", U_TYPE_MASK, OP_AUIPC, &[RD, IMM_U]),

    // ========== 跳转 ==========
    Decl::new("JAL", U_TYPE_MASK, OP_JAL, &[RD, IMM_J]),
    Decl::new("JALR", I_TYPE_MASK, i_type(0b000, OP_JALR), &[RD, RS1, IMM_I]),

    // ========== B-type ==========
    Decl::new("BEQ", I_TYPE_MASK, i_type(0b000, OP_BRANCH), &[RS1, RS2, IMM_B]),
    Decl::new("BNE", I_TYPE_MASK, i_type(0b001, OP_BRANCH), &[RS1, RS2, IMM_B]),
    Decl::new("BLT", I_TYPE_MASK, i_type(0b100, OP_BRANCH), &[RS1, RS2, IMM_B]),
    Decl::new("BGE", I_TYPE_MASK, i_type(0b101, OP_BRANCH), &[RS1, RS2, IMM_B]),
    Decl::new("BLTU", I_TYPE_MASK, i_type(0b110, OP_BRANCH), &[RS1, RS2, IMM_B]),
    Decl::new("BGEU", I_TYPE_MASK, i_type(0b111, OP_BRANCH), &[RS1, RS2, IMM_B]),

    // ========== Load ==========
    Decl::new("LB", I_TYPE_MASK, i_type(0b000, OP_LOAD), &[RD, RS1, IMM_I]),
    Decl::new("LH", I_TYPE_MASK, i_type(0b001, OP_LOAD), &[RD, RS1, IMM_I]),
    Decl::new("LW", I_TYPE_MASK, i_type(0b010, OP_LOAD), &[RD, RS1, IMM_I]),
    Decl::new("LD", I_TYPE_MASK, i_type(0b011, OP_LOAD), &[RD, RS1, IMM_I]).rv64(),
    Decl::new("LBU", I_TYPE_MASK, i_type(0b100, OP_LOAD), &[RD, RS1, IMM_I]),
    Decl::new("LHU", I_TYPE_MASK, i_type(0b101, OP_LOAD), &[RD, RS1, IMM_I]),
    Decl::new("LWU", I_TYPE_MASK, i_type(0b110, OP_LOAD), &[RD, RS1, IMM_I]).rv64(),

    // ========== Store ==========
    Decl::new("SB", I_TYPE_MASK, i_type(0b000, OP_STORE), &[RS1, RS2, IMM_S]),
    Decl::new("SH", I_TYPE_MASK, i_type(0b001, OP_STORE), &[RS1, RS2, IMM_S]),
    Decl::new("SW", I_TYPE_MASK, i_type(0b010, OP_STORE), &[RS1, RS2, IMM_S]),
    Decl::new("SD", I_TYPE_MASK, i_type(0b011, OP_STORE), &[RS1, RS2, IMM_S]).rv64(),

    // ========== I-type ALU ==========
    Decl::new("ADDI", I_TYPE_MASK, i_type(0b000, OP_IMM), &[RD, RS1, IMM_I]),
    Decl::new("SLTI", I_TYPE_MASK, i_type(0b010, OP_IMM), &[RD, RS1, IMM_I]),
    Decl::new("SLTIU", I_TYPE_MASK, i_type(0b011, OP_IMM), &[RD, RS1, IMM_I]),
    Decl::new("XORI", I_TYPE_MASK, i_type(0b100, OP_IMM), &[RD, RS1, IMM_I]),
    Decl::new("ORI", I_TYPE_MASK, i_type(0b110, OP_IMM), &[RD, RS1, IMM_I]),
    Decl::new("ANDI", I_TYPE_MASK, i_type(0b111, OP_IMM), &[RD, RS1, IMM_I]),

    // ========== 移位立即数：RV32 为 5 位 shamt，RV64 为 6 位 ==========
    Decl::new("SLLI", R_TYPE_MASK, r_type(0b0000000, 0b001, OP_IMM), &[RD, RS1, SHAMT5]).rv32(),
    Decl::new("SRLI", R_TYPE_MASK, r_type(0b0000000, 0b101, OP_IMM), &[RD, RS1, SHAMT5]).rv32(),
    Decl::new("SRAI", R_TYPE_MASK, r_type(0b0100000, 0b101, OP_IMM), &[RD, RS1, SHAMT5]).rv32(),
    Decl::new("SLLI", SHIFT64_MASK, r_type(0b0000000, 0b001, OP_IMM), &[RD, RS1, SHAMT6]).rv64(),
    Decl::new("SRLI", SHIFT64_MASK, r_type(0b0000000, 0b101, OP_IMM), &[RD, RS1, SHAMT6]).rv64(),
    Decl::new("SRAI", SHIFT64_MASK, r_type(0b0100000, 0b101, OP_IMM), &[RD, RS1, SHAMT6]).rv64(),

    // ========== R-type ALU ==========
    Decl::new("ADD", R_TYPE_MASK, r_type(0b0000000, 0b000, OP_REG), &[RD, RS1, RS2]),
    Decl::new("SUB", R_TYPE_MASK, r_type(0b0100000, 0b000, OP_REG), &[RD, RS1, RS2]),
    Decl::new("SLL", R_TYPE_MASK, r_type(0b0000000, 0b001, OP_REG), &[RD, RS1, RS2]),
    Decl::new("SLT", R_TYPE_MASK, r_type(0b0000000, 0b010, OP_REG), &[RD, RS1, RS2]),
    Decl::new("SLTU", R_TYPE_MASK, r_type(0b0000000, 0b011, OP_REG), &[RD, RS1, RS2]),
    Decl::new("XOR", R_TYPE_MASK, r_type(0b0000000, 0b100, OP_REG), &[RD, RS1, RS2]),
    Decl::new("SRL", R_TYPE_MASK, r_type(0b0000000, 0b101, OP_REG), &[RD, RS1, RS2]),
    Decl::new("SRA", R_TYPE_MASK, r_type(0b0100000, 0b101, OP_REG), &[RD, RS1, RS2]),
    Decl::new("OR", R_TYPE_MASK, r_type(0b0000000, 0b110, OP_REG), &[RD, RS1, RS2]),
    Decl::new("AND", R_TYPE_MASK, r_type(0b0000000, 0b111, OP_REG), &[RD, RS1, RS2]),

    // ========== RV64 32 位运算 ==========
    Decl::new("ADDIW", I_TYPE_MASK, i_type(0b000, OP_IMM_32), &[RD, RS1, IMM_I]).rv64(),
    Decl::new("SLLIW", R_TYPE_MASK, r_type(0b0000000, 0b001, OP_IMM_32), &[RD, RS1, SHAMT5]).rv64(),
    Decl::new("SRLIW", R_TYPE_MASK, r_type(0b0000000, 0b101, OP_IMM_32), &[RD, RS1, SHAMT5]).rv64(),
    Decl::new("SRAIW", R_TYPE_MASK, r_type(0b0100000, 0b101, OP_IMM_32), &[RD, RS1, SHAMT5]).rv64(),
    Decl::new("ADDW", R_TYPE_MASK, r_type(0b0000000, 0b000, OP_REG_32), &[RD, RS1, RS2]).rv64(),
    Decl::new("SUBW", R_TYPE_MASK, r_type(0b0100000, 0b000, OP_REG_32), &[RD, RS1, RS2]).rv64(),
    Decl::new("SLLW", R_TYPE_MASK, r_type(0b0000000, 0b001, OP_REG_32), &[RD, RS1, RS2]).rv64(),
    Decl::new("SRLW", R_TYPE_MASK, r_type(0b0000000, 0b101, OP_REG_32), &[RD, RS1, RS2]).rv64(),
    Decl::new("SRAW", R_TYPE_MASK, r_type(0b0100000, 0b101, OP_REG_32), &[RD, RS1, RS2]).rv64(),

    // ========== 内存屏障：单 hart 下为空操作 ==========
    Decl::new("FENCE", I_TYPE_MASK, i_type(0b000, OP_MISC_MEM), &[]).nop(),
    Decl::new("FENCE.I", I_TYPE_MASK, i_type(0b001, OP_MISC_MEM), &[]).nop(),

    // ========== 系统调用 ==========
    Decl::new("ECALL", EXACT_MASK, 0x00000073, &[]),
    Decl::new("EBREAK", EXACT_MASK, 0x00100073, &[]),
];
