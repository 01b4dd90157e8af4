//! Decoded instruction records and the per-instruction pipeline timestamps.

/// Broad classification of an instruction, used to pick a reservation
/// station kind at issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Load,
    Store,
    Beq,
    CallOrRet,
    Add,
    Sub,
    Nor,
    Mul,
}

/// Fully distinguishes every mnemonic. `CallOrRet` splits into `Call`/`Ret`
/// here since both share a station kind but differ at writeback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Load,
    Store,
    Beq,
    Call,
    Ret,
    Add,
    Sub,
    Nor,
    Mul,
}

impl Opcode {
    /// The station category an opcode is dispatched to.
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Load => Category::Load,
            Self::Store => Category::Store,
            Self::Beq => Category::Beq,
            Self::Call | Self::Ret => Category::CallOrRet,
            Self::Add => Category::Add,
            Self::Sub => Category::Sub,
            Self::Nor => Category::Nor,
            Self::Mul => Category::Mul,
        }
    }
}

/// A decoded instruction together with the four timestamps the pipeline
/// stamps as it progresses. `0` in any timestamp field means "not yet".
#[derive(Debug, Clone)]
pub struct Instruction {
    pub source_reg_s: u8,
    pub source_reg_t: u8,
    pub dest_reg_d: u8,
    pub immediate: i16,
    pub category: Category,
    pub opcode: Opcode,
    pub raw_text: String,
    pub program_index: usize,

    pub issue_cycle: u64,
    pub exec_start_cycle: u64,
    pub exec_end_cycle: u64,
    pub writeback_cycle: u64,
}

impl Instruction {
    #[must_use]
    pub fn new(
        opcode: Opcode,
        source_reg_s: u8,
        source_reg_t: u8,
        dest_reg_d: u8,
        immediate: i16,
        raw_text: String,
        program_index: usize,
    ) -> Self {
        Self {
            source_reg_s,
            source_reg_t,
            dest_reg_d,
            immediate,
            category: opcode.category(),
            opcode,
            raw_text,
            program_index,
            issue_cycle: 0,
            exec_start_cycle: 0,
            exec_end_cycle: 0,
            writeback_cycle: 0,
        }
    }

    /// Whether every timestamp has been stamped — the instruction completed.
    #[must_use]
    pub const fn has_completed(&self) -> bool {
        self.writeback_cycle != 0
    }
}
