use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::io::{self, Write};

/// Opcodes of the instruction stream. The discriminants are part of the
/// compiled-file fingerprint format and must not be renumbered.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    PushConst = 1,
    LoadVar = 2,
    StoreVar = 3,
    LoadField = 4,
    StoreField = 5,
    Add = 6,
    Sub = 7,
    Mul = 8,
    Div = 9,
    Percent = 10,
    Eq = 11,
    Ne = 12,
    Gt = 13,
    Ge = 14,
    Lt = 15,
    Le = 16,
    And = 17,
    Or = 18,
    Not = 19,
    Jump = 20,
    JumpIfFalse = 21,
    Call = 22,
    Ret = 23,
    New = 24,
    Pop = 25,
    Print = 26,
    Halt = 27,
    SetupTry = 28,
    PopTry = 29,
    Throw = 30,
    GetStatic = 31,
    SetStatic = 32,
    BuildList = 33,
    BuildMap = 34,
    LoadIndex = 35,
    StoreIndex = 36,
}

/// Tagged operand attached to an instruction.
///
/// `None` and `Null` are distinct on purpose: the VM treats them identically
/// in `PushConst`, but the compiler distinguishes "no operand" from an
/// explicit null constant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Operand {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    /// (method or function name, argument count) for `Call`.
    Call(String, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(op: OpCode) -> Self {
        Self {
            op,
            operand: Operand::None,
        }
    }

    pub fn with(op: OpCode, operand: Operand) -> Self {
        Self { op, operand }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{:?}", self.op),
            Operand::Int(i) => write!(f, "{:?} {}", self.op, i),
            Operand::Float(n) => write!(f, "{:?} {}", self.op, n),
            Operand::Str(s) => write!(f, "{:?} {:?}", self.op, s),
            Operand::Null => write!(f, "{:?} null", self.op),
            Operand::Call(name, argc) => write!(f, "{:?} {} {}", self.op, name, argc),
        }
    }
}

/// A compiled method body plus its parameter names in declaration order;
/// `Call` binds arguments to these positionally.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledMethod {
    pub bytecode: Vec<Instruction>,
    pub param_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledClass {
    pub name: String,
    pub superclass: Option<String>,
    pub id: u16,
    pub methods: HashMap<String, CompiledMethod>,
    pub static_methods: HashMap<String, CompiledMethod>,
    pub static_init: Vec<Instruction>,
}

/// Everything one compilation produces. Immutable once built; the VM borrows
/// it for the whole run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub main: Vec<Instruction>,
    /// Static initializers of all classes, concatenated in class-ID order.
    pub static_init: Vec<Instruction>,
    pub classes: BTreeMap<u16, CompiledClass>,
    /// Global variable names in first-store order; integer operands of
    /// `LoadVar`/`StoreVar` index into this list.
    pub globals: Vec<String>,
}

/// The sentinel value the `z` keyword compiles to. `Call` recognizes it as
/// its callee and dispatches to the built-in system table.
pub const SYSTEM_RECEIVER: &str = "SYSTEM_Z";

pub const BYTECODE_MAGIC: &[u8; 4] = b"ALPH";

impl Program {
    /// Serializes the main stream as a compile fingerprint: the `ALPH` magic,
    /// a little-endian u32 instruction count, then one opcode byte per
    /// instruction. Operands are not preserved, so the file identifies a
    /// compile but cannot be executed.
    pub fn write_bytecode<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(BYTECODE_MAGIC)?;
        out.write_all(&(self.main.len() as u32).to_le_bytes())?;
        for instruction in &self.main {
            out.write_all(&[instruction.op as u8])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_discriminants_match_the_file_format() {
        assert_eq!(OpCode::PushConst as u8, 1);
        assert_eq!(OpCode::Percent as u8, 10);
        assert_eq!(OpCode::Halt as u8, 27);
        assert_eq!(OpCode::StoreIndex as u8, 36);
    }

    #[test]
    fn bytecode_file_is_magic_count_then_opcodes() {
        let program = Program {
            main: vec![
                Instruction::with(OpCode::PushConst, Operand::Float(1.0)),
                Instruction::new(OpCode::Pop),
                Instruction::new(OpCode::Halt),
            ],
            ..Program::default()
        };

        let mut buf = Vec::new();
        program.write_bytecode(&mut buf).unwrap();

        assert_eq!(&buf[0..4], b"ALPH");
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 3);
        assert_eq!(&buf[8..], &[1, 25, 27]);
    }

    #[test]
    fn null_operand_is_not_the_absent_operand() {
        assert_ne!(
            Instruction::with(OpCode::PushConst, Operand::Null),
            Instruction::new(OpCode::PushConst)
        );
    }

    #[test]
    fn instructions_display_with_their_operands() {
        let call = Instruction::with(OpCode::Call, Operand::Call("greet".to_string(), 2));
        assert_eq!(call.to_string(), "Call greet 2");
        assert_eq!(Instruction::new(OpCode::Halt).to_string(), "Halt");
    }
}
