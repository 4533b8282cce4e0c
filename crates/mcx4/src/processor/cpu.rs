//! The instruction-pointer-driven execution engine that walks a compiled
//! program against a controller's registers and ports.

use crate::compiler::{compile, Program};
use crate::error::{McxError, RunError};
use crate::instruction::Instruction;
use crate::io::ControllerIo;
use crate::operand::Operand;
use crate::processor::flags::TestFlags;

/// Executes a compiled [`Program`] one instruction at a time against a
/// [`ControllerIo`] supplied by the caller on every call, rather than
/// holding a reference to one itself.
#[derive(Debug, Default)]
pub struct Cpu {
    program: Program,
    pointer: usize,
    flags: TestFlags,
}

impl Cpu {
    /// Creates a CPU with no program loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the loaded program, resetting the instruction pointer and
    /// predicate flags. Register and port state is untouched.
    pub fn load(&mut self, program: Program) {
        self.program = program;
        self.pointer = 0;
        self.flags = TestFlags::empty();
    }

    /// Compiles `code` and loads it, replacing any previously loaded program.
    pub fn compile(&mut self, code: &str) {
        self.load(compile(code));
    }

    /// Compiles and runs `code` to completion in one call, without looping
    /// back to the start once the last instruction executes.
    ///
    /// # Errors
    ///
    /// Returns an error from the first instruction that fails to execute.
    pub fn execute(&mut self, io: &mut ControllerIo, code: &str) -> Result<(), McxError> {
        self.compile(code);
        while self.pointer < self.program.instructions.len() {
            self.advance(io, false)?;
        }
        self.pointer = 0;
        Ok(())
    }

    /// Executes the instruction currently under the pointer and advances it,
    /// looping back to the start of the program once the end is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the current instruction fails to execute.
    pub fn step(&mut self, io: &mut ControllerIo) -> Result<(), McxError> {
        self.advance(io, true)
    }

    fn advance(&mut self, io: &mut ControllerIo, looping: bool) -> Result<(), McxError> {
        if self.program.instructions.is_empty() {
            return Ok(());
        }
        let inst = self.program.instructions[self.pointer].clone();
        let cursor = self.exec(io, &inst)?;
        self.pointer = cursor.unwrap_or(self.pointer + 1);
        if looping && self.pointer >= self.program.instructions.len() {
            self.pointer = 0;
        }
        Ok(())
    }

    /// Executes a single instruction, returning the jump target if it's a
    /// `jmp` (or a `cond` guarding one).
    fn exec(&mut self, io: &mut ControllerIo, inst: &Instruction) -> Result<Option<usize>, McxError> {
        match inst {
            Instruction::Nop => Ok(None),
            Instruction::Mov { value, dest } => {
                let value = self.resolve(io, value)?;
                io.write_to(dest, value)?;
                Ok(None)
            }
            Instruction::Add(operand) => {
                let delta = self.resolve(io, operand)?;
                let acc = io.value_of("acc")?;
                io.write_to("acc", acc + delta)?;
                Ok(None)
            }
            Instruction::Sub(operand) => {
                let delta = self.resolve(io, operand)?;
                let acc = io.value_of("acc")?;
                io.write_to("acc", acc - delta)?;
                Ok(None)
            }
            Instruction::Mul(operand) => {
                let factor = self.resolve(io, operand)?;
                let acc = io.value_of("acc")?;
                io.write_to("acc", acc * factor)?;
                Ok(None)
            }
            Instruction::Not => {
                let acc = io.value_of("acc")?;
                io.write_to("acc", if acc == 0 { 100 } else { 0 })?;
                Ok(None)
            }
            Instruction::Dgt(operand) => {
                let bit = self.resolve(io, operand)?;
                let acc = io.value_of("acc")?;
                io.write_to("acc", digit_extract(acc, bit))?;
                Ok(None)
            }
            Instruction::Dst { bit, value } => {
                let bit = self.resolve(io, bit)?;
                let value = self.resolve(io, value)?;
                let acc = io.value_of("acc")?;
                io.write_to("acc", digit_set(acc, bit, value))?;
                Ok(None)
            }
            Instruction::Jmp(label) => {
                let target = self
                    .program
                    .labels
                    .get(label)
                    .copied()
                    .ok_or_else(|| RunError::Label(label.clone()))?;
                log::trace!("jmp {label} -> instruction {target}");
                Ok(Some(target))
            }
            Instruction::Slp(operand) => {
                let atus = self.resolve(io, operand)?;
                io.request_sleep(atus);
                Ok(None)
            }
            Instruction::Test { comparator, a, b } => {
                let a = self.resolve(io, a)?;
                let b = self.resolve(io, b)?;
                self.flags = evaluate(comparator, a, b)?;
                Ok(None)
            }
            Instruction::Cond { sign, inst } => {
                let take = if *sign {
                    self.flags.contains(TestFlags::PLUS)
                } else {
                    self.flags.contains(TestFlags::MINUS)
                };
                if take {
                    self.exec(io, inst)
                } else {
                    Ok(None)
                }
            }
            Instruction::Unknown { opcode, .. } => {
                Err(McxError::Run(RunError::Command(opcode.clone())))
            }
        }
    }

    fn resolve(&mut self, io: &mut ControllerIo, operand: &Operand) -> Result<i64, McxError> {
        match operand {
            Operand::Literal(value) => Ok(*value),
            Operand::Name(name) => io.value_of(name),
        }
    }
}

/// Evaluates a `test` comparator against two already-resolved operands.
///
/// # Errors
///
/// Returns [`RunError::Command`] for any comparator other than `eq`, `cp`,
/// `lt`, or `gt`.
fn evaluate(comparator: &str, a: i64, b: i64) -> Result<TestFlags, McxError> {
    let (plus, minus) = match comparator {
        "eq" => (a == b, a != b),
        "cp" => (a > b, a < b),
        "lt" => (a < b, !(a < b)),
        "gt" => (a > b, !(a > b)),
        other => return Err(McxError::Run(RunError::Command(format!("t{other}")))),
    };
    Ok(TestFlags::from_result(plus, minus))
}

/// Isolates decimal digit `bit` (little-endian, `0` is the ones place) of
/// `value`, or `0` if `value` doesn't have that many digits.
fn digit_extract(value: i64, bit: i64) -> i64 {
    if bit < 0 {
        return 0;
    }
    let digits = value.unsigned_abs().to_string();
    let bit = bit as usize;
    digits
        .chars()
        .rev()
        .nth(bit)
        .and_then(|c| c.to_digit(10))
        .map_or(0, i64::from)
}

/// Overwrites decimal digit `bit` (little-endian) of `acc` with the last
/// digit of `value`, or `0` if `acc` doesn't have that many digits.
fn digit_set(acc: i64, bit: i64, value: i64) -> i64 {
    let bit = (bit.unsigned_abs() % 10) as usize;
    let digit = (value.unsigned_abs() % 10) as u8;

    let mut digits: Vec<u8> = acc
        .unsigned_abs()
        .to_string()
        .bytes()
        .map(|b| b - b'0')
        .rev()
        .collect();
    if digits.len() <= bit {
        return 0;
    }
    digits[bit] = digit;
    digits
        .iter()
        .rev()
        .fold(0i64, |acc, d| acc * 10 + i64::from(*d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcx4_core::ControllerId;

    fn io() -> ControllerIo {
        ControllerIo::new(ControllerId(0), "mc0".to_string(), 1, 0, 1)
    }

    #[test]
    fn arithmetic_and_comments() {
        let mut io = io();
        let mut cpu = Cpu::new();
        cpu.execute(&mut io, "add 1 ; comment\nadd 2\n").unwrap();
        assert_eq!(io.register("acc").unwrap(), 3);
    }

    #[test]
    fn mul_and_not() {
        let mut io = io();
        let mut cpu = Cpu::new();
        cpu.execute(&mut io, "add 5\nmul 4\nnot\n").unwrap();
        assert_eq!(io.register("acc").unwrap(), 0);
        let mut io2 = io();
        let mut cpu2 = Cpu::new();
        cpu2.execute(&mut io2, "not\n").unwrap();
        assert_eq!(io2.register("acc").unwrap(), 100);
    }

    #[test]
    fn digit_extract_is_little_endian() {
        assert_eq!(digit_extract(4567, 0), 7);
        assert_eq!(digit_extract(4567, 3), 4);
        assert_eq!(digit_extract(4567, 9), 0);
    }

    #[test]
    fn digit_set_rewrites_one_digit() {
        assert_eq!(digit_set(4567, 0, 9), 4569);
        assert_eq!(digit_set(4567, 3, 9), 9567);
        assert_eq!(digit_set(45, 9, 9), 0);
    }

    #[test]
    fn predicated_test_runs_one_branch() {
        let mut io = io();
        io.write_to("acc", 0).unwrap();
        let mut cpu = Cpu::new();
        cpu.execute(&mut io, "teq acc 2\n+ mov 1 acc\n- mov 3 acc\n")
            .unwrap();
        assert_eq!(io.register("acc").unwrap(), 3);
    }

    #[test]
    fn jump_loop_terminates_via_sleep() {
        let mut io = io();
        let mut cpu = Cpu::new();
        cpu.compile("loop:\nadd 1\ntlt acc 3\n+jmp loop\n");
        for _ in 0..8 {
            cpu.step(&mut io).unwrap();
        }
        assert_eq!(io.register("acc").unwrap(), 3);
    }

    #[test]
    fn unknown_instruction_is_a_command_error() {
        let mut io = io();
        let mut cpu = Cpu::new();
        let err = cpu.execute(&mut io, "frobnicate\n").unwrap_err();
        assert!(matches!(err, McxError::Run(RunError::Command(_))));
    }

    #[test]
    fn unknown_comparator_is_a_command_error() {
        let mut io = io();
        let mut cpu = Cpu::new();
        let err = cpu.execute(&mut io, "tzz acc 1\n").unwrap_err();
        assert!(matches!(err, McxError::Run(RunError::Command(_))));
    }

    #[test]
    fn jump_to_missing_label_is_a_label_error() {
        let mut io = io();
        let mut cpu = Cpu::new();
        let err = cpu.execute(&mut io, "jmp nowhere\n").unwrap_err();
        assert!(matches!(err, McxError::Run(RunError::Label(_))));
    }
}
