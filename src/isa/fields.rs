//! 指令字段布局
//!
//! 各指令格式的操作数位段与 opcode/mask 常量，供声明表共用

use super::decl::{ArgumentField, BitSegment};

macro_rules! seg {
    ($lsb:expr, $len:expr => $dst:expr) => {
        BitSegment { lsb: $lsb, len: $len, dst: $dst }
    };
}

const fn unsigned(segments: &'static [BitSegment]) -> ArgumentField {
    ArgumentField::Bits { segments, signed: false }
}

const fn signed(segments: &'static [BitSegment]) -> ArgumentField {
    ArgumentField::Bits { segments, signed: true }
}

// ========== opcode 常量 ==========

pub const OP_LUI: u32 = 0b0110111;
pub const OP_AUIPC: u32 = 0b0010111;
pub const OP_JAL: u32 = 0b1101111;
pub const OP_JALR: u32 = 0b1100111;
pub const OP_BRANCH: u32 = 0b1100011;
pub const OP_LOAD: u32 = 0b0000011;
pub const OP_STORE: u32 = 0b0100011;
pub const OP_IMM: u32 = 0b0010011;
pub const OP_IMM_32: u32 = 0b0011011;
pub const OP_REG: u32 = 0b0110011;
pub const OP_REG_32: u32 = 0b0111011;
pub const OP_MISC_MEM: u32 = 0b0001111;
pub const OP_SYSTEM: u32 = 0b1110011;

// ========== mask 常量 ==========

/// R-type：opcode + funct3 + funct7
pub const R_TYPE_MASK: u32 = 0xFE00707F;
/// I/S/B-type：opcode + funct3
pub const I_TYPE_MASK: u32 = 0x0000707F;
/// U/J-type：仅 opcode
pub const U_TYPE_MASK: u32 = 0x0000007F;
/// RV64 移位立即数：opcode + funct3 + funct6
pub const SHIFT64_MASK: u32 = 0xFC00707F;
/// 全部位固定
pub const EXACT_MASK: u32 = 0xFFFFFFFF;
/// 压缩指令：quadrant + funct3
pub const C_MASK: u32 = 0xE003;

/// 组装 R-type pattern
pub const fn r_type(funct7: u32, funct3: u32, opcode: u32) -> u32 {
    (funct7 << 25) | (funct3 << 12) | opcode
}

/// 组装 I/S/B-type pattern
pub const fn i_type(funct3: u32, opcode: u32) -> u32 {
    (funct3 << 12) | opcode
}

/// 组装压缩指令 pattern
pub const fn c_type(funct3: u32, quadrant: u32) -> u32 {
    (funct3 << 13) | quadrant
}

// ========== 标准格式字段 ==========

/// rd [11:7]
pub const RD: ArgumentField = unsigned(&[seg!(7, 5 => 0)]);
/// rs1 [19:15]
pub const RS1: ArgumentField = unsigned(&[seg!(15, 5 => 0)]);
/// rs2 [24:20]
pub const RS2: ArgumentField = unsigned(&[seg!(20, 5 => 0)]);

/// imm[11:0] = raw[31:20]
pub const IMM_I: ArgumentField = signed(&[seg!(20, 12 => 0)]);
/// imm[11:5] = raw[31:25], imm[4:0] = raw[11:7]
pub const IMM_S: ArgumentField = signed(&[seg!(7, 5 => 0), seg!(25, 7 => 5)]);
/// imm[12|10:5] = raw[31:25], imm[4:1|11] = raw[11:7]
pub const IMM_B: ArgumentField = signed(&[
    seg!(8, 4 => 1),
    seg!(25, 6 => 5),
    seg!(7, 1 => 11),
    seg!(31, 1 => 12),
]);
/// imm[31:12] = raw[31:12]
pub const IMM_U: ArgumentField = signed(&[seg!(12, 20 => 12)]);
/// imm[20|10:1|11|19:12] = raw[31:12]
pub const IMM_J: ArgumentField = signed(&[
    seg!(21, 10 => 1),
    seg!(20, 1 => 11),
    seg!(12, 8 => 12),
    seg!(31, 1 => 20),
]);

/// shamt[4:0] = raw[24:20]
pub const SHAMT5: ArgumentField = unsigned(&[seg!(20, 5 => 0)]);
/// shamt[5:0] = raw[25:20]
pub const SHAMT6: ArgumentField = unsigned(&[seg!(20, 6 => 0)]);

/// CSR 地址 [31:20]
pub const CSR: ArgumentField = unsigned(&[seg!(20, 12 => 0)]);
/// zimm [19:15]
pub const ZIMM: ArgumentField = unsigned(&[seg!(15, 5 => 0)]);

pub const X0: ArgumentField = ArgumentField::Constant(0);
pub const X1: ArgumentField = ArgumentField::Constant(1);
pub const X2: ArgumentField = ArgumentField::Constant(2);
pub const ZERO: ArgumentField = ArgumentField::Constant(0);

// ========== 压缩格式字段 ==========

/// rs2 [6:2]
pub const C_RS2: ArgumentField = unsigned(&[seg!(2, 5 => 0)]);
/// rd'/rs2' [4:2]
pub const C_RD_P: ArgumentField = ArgumentField::CompressedReg { lsb: 2 };
/// rs1'/rd' [9:7]
pub const C_RS1_P: ArgumentField = ArgumentField::CompressedReg { lsb: 7 };

/// imm[5] = raw[12], imm[4:0] = raw[6:2]
pub const C_IMM6: ArgumentField = signed(&[seg!(2, 5 => 0), seg!(12, 1 => 5)]);
/// nzimm[17] = raw[12], nzimm[16:12] = raw[6:2]
pub const C_IMM_LUI: ArgumentField = signed(&[seg!(2, 5 => 12), seg!(12, 1 => 17)]);
/// nzimm[9] = raw[12], nzimm[4|6|8:7|5] = raw[6:2]
pub const C_IMM_ADDI16SP: ArgumentField = signed(&[
    seg!(6, 1 => 4),
    seg!(2, 1 => 5),
    seg!(5, 1 => 6),
    seg!(3, 2 => 7),
    seg!(12, 1 => 9),
]);
/// nzuimm[5:4|9:6|2|3] = raw[12:5]
pub const C_IMM_ADDI4SPN: ArgumentField = unsigned(&[
    seg!(6, 1 => 2),
    seg!(5, 1 => 3),
    seg!(11, 2 => 4),
    seg!(7, 4 => 6),
]);
/// shamt[5] = raw[12], shamt[4:0] = raw[6:2]
pub const C_SHAMT6: ArgumentField = unsigned(&[seg!(2, 5 => 0), seg!(12, 1 => 5)]);
/// shamt[4:0] = raw[6:2]
pub const C_SHAMT5: ArgumentField = unsigned(&[seg!(2, 5 => 0)]);

/// C.LW/C.SW: uimm[5:3] = raw[12:10], uimm[2|6] = raw[6:5]
pub const C_UIMM_W: ArgumentField = unsigned(&[seg!(6, 1 => 2), seg!(10, 3 => 3), seg!(5, 1 => 6)]);
/// C.LD/C.SD: uimm[5:3] = raw[12:10], uimm[7:6] = raw[6:5]
pub const C_UIMM_D: ArgumentField = unsigned(&[seg!(10, 3 => 3), seg!(5, 2 => 6)]);
/// C.LWSP: uimm[5] = raw[12], uimm[4:2|7:6] = raw[6:2]
pub const C_UIMM_LWSP: ArgumentField = unsigned(&[seg!(4, 3 => 2), seg!(12, 1 => 5), seg!(2, 2 => 6)]);
/// C.LDSP: uimm[5] = raw[12], uimm[4:3|8:6] = raw[6:2]
pub const C_UIMM_LDSP: ArgumentField = unsigned(&[seg!(5, 2 => 3), seg!(12, 1 => 5), seg!(2, 3 => 6)]);
/// C.SWSP: uimm[5:2|7:6] = raw[12:7]
pub const C_UIMM_SWSP: ArgumentField = unsigned(&[seg!(9, 4 => 2), seg!(7, 2 => 6)]);
/// C.SDSP: uimm[5:3|8:6] = raw[12:7]
pub const C_UIMM_SDSP: ArgumentField = unsigned(&[seg!(10, 3 => 3), seg!(7, 3 => 6)]);

/// C.J/C.JAL: offset[11|4|9:8|10|6|7|3:1|5] = raw[12:2]
pub const C_IMM_J: ArgumentField = signed(&[
    seg!(3, 3 => 1),
    seg!(11, 1 => 4),
    seg!(2, 1 => 5),
    seg!(7, 1 => 6),
    seg!(6, 1 => 7),
    seg!(9, 2 => 8),
    seg!(8, 1 => 10),
    seg!(12, 1 => 11),
]);
/// C.BEQZ/C.BNEZ: offset[8|4:3] = raw[12:10], offset[7:6|2:1|5] = raw[6:2]
pub const C_IMM_B: ArgumentField = signed(&[
    seg!(3, 2 => 1),
    seg!(10, 2 => 3),
    seg!(2, 1 => 5),
    seg!(5, 2 => 6),
    seg!(12, 1 => 8),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_immediates() {
        // addi x1, x0, -1
        assert_eq!(IMM_I.extract(0xFFF00093), -1);
        // sw x2, 8(x1)
        assert_eq!(IMM_S.extract(0x0020A423), 8);
        // jal x1, 2048
        assert_eq!(IMM_J.extract(0x001000EF), 2048);
        // lui x1, 0x80000
        assert_eq!(IMM_U.extract(0x800000B7), -0x8000_0000);
    }

    #[test]
    fn test_compressed_immediates() {
        // c.addi16sp sp, -16 => 0x717D
        assert_eq!(C_IMM_ADDI16SP.extract(0x717D), -16);
        // c.j -2 => 0xBFFD
        assert_eq!(C_IMM_J.extract(0xBFFD), -2);
        // c.lwsp x1, 4(sp) => 0x4092
        assert_eq!(C_UIMM_LWSP.extract(0x4092), 4);
    }
}
