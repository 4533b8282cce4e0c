//! Turns source text into a flat instruction list and a label table.

use std::collections::HashMap;

use crate::instruction::Instruction;
use crate::operand::Operand;

/// The result of compiling a program: its instructions in execution order,
/// and a map from label name to the index of the instruction it points at.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
}

/// Compiles source text into a [`Program`].
///
/// Lines are processed independently: a `name:` prefix records a label
/// pointing at the instruction index about to be assigned (so a line can
/// both carry a label and compile to an instruction), `;` and `#` start a
/// line comment, and blank lines (after stripping labels and comments) are
/// skipped entirely and consume no instruction index.
///
/// A leading `+` or `-` token wraps the rest of the line in
/// [`Instruction::Cond`]; a leading `t<comparator>` token (e.g. `teq`,
/// `tlt`) is rewritten into [`Instruction::Test`]. Neither rewrite is
/// reapplied recursively to a `Cond`'s inner instruction, matching how a
/// single compiler pass only ever inspects the first token of a line once.
#[must_use]
pub fn compile(code: &str) -> Program {
    let mut program = Program::default();
    let mut index = 0usize;

    for raw_line in code.split('\n') {
        let mut line = raw_line;
        if line.contains(':') {
            let parts: Vec<&str> = line.splitn(3, ':').collect();
            let label = parts[0].trim().to_string();
            program.labels.insert(label, index);
            line = if parts.len() == 2 { parts[1] } else { "" };
        }
        let line = line.split(';').next().unwrap_or("");
        let line = line.split('#').next().unwrap_or("");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        index += 1;
        program.instructions.push(parse_line(line));
    }

    program
}

/// Parses one non-empty, comment-stripped line into an instruction,
/// applying the `+`/`-` and `t<cmp>` rewrites.
fn parse_line(line: &str) -> Instruction {
    let tokens: Vec<&str> = line.split(' ').collect();
    match tokens[0] {
        "+" => Instruction::Cond {
            sign: true,
            inst: Box::new(parse_plain(&tokens[1..])),
        },
        "-" => Instruction::Cond {
            sign: false,
            inst: Box::new(parse_plain(&tokens[1..])),
        },
        opcode if opcode.starts_with('t') => {
            let comparator = opcode[1..].to_string();
            let a = Operand::parse(tokens.get(1).copied().unwrap_or(""));
            let b = Operand::parse(tokens.get(2).copied().unwrap_or(""));
            Instruction::Test { comparator, a, b }
        }
        _ => parse_plain(&tokens),
    }
}

/// Parses a token sequence into an instruction without the `+`/`-`/`t<cmp>`
/// rewrites. Used both for ordinary lines and for a `Cond`'s inner tokens.
fn parse_plain(tokens: &[&str]) -> Instruction {
    let opcode = tokens.first().copied().unwrap_or("");
    let args = &tokens[1.min(tokens.len())..];
    match opcode.to_lowercase().as_str() {
        "nop" => Instruction::Nop,
        "mov" if args.len() >= 2 => Instruction::Mov {
            value: Operand::parse(args[0]),
            dest: args[1].to_string(),
        },
        "add" if !args.is_empty() => Instruction::Add(Operand::parse(args[0])),
        "sub" if !args.is_empty() => Instruction::Sub(Operand::parse(args[0])),
        "mul" if !args.is_empty() => Instruction::Mul(Operand::parse(args[0])),
        "not" => Instruction::Not,
        "dgt" if !args.is_empty() => Instruction::Dgt(Operand::parse(args[0])),
        "dst" if args.len() >= 2 => Instruction::Dst {
            bit: Operand::parse(args[0]),
            value: Operand::parse(args[1]),
        },
        "jmp" if !args.is_empty() => Instruction::Jmp(args[0].to_string()),
        "slp" if !args.is_empty() => Instruction::Slp(Operand::parse(args[0])),
        _ => Instruction::Unknown {
            opcode: opcode.to_string(),
            args: args.iter().map(|t| (*t).to_string()).collect(),
        },
    }
}
