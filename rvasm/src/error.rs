use thiserror::Error;

/// Everything that can go wrong turning source text into a binary image.
/// Every variant carries the 1-based source line it was raised from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("line {line}: unknown mnemonic \"{mnemonic}\"")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: unknown register \"{name}\"")]
    UnknownRegister { line: usize, name: String },

    #[error("line {line}: unknown label \"{label}\"")]
    UnknownLabel { line: usize, label: String },

    #[error("line {line}: label \"{label}\" is defined more than once")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: immediate {value} does not fit in {bits} bits")]
    ImmediateOutOfRange { line: usize, value: i64, bits: u32 },

    #[error("line {line}: malformed operand list: {detail}")]
    MalformedOperand { line: usize, detail: String },

    #[error("I/O error reading source: {0}")]
    IoError(String),
}
