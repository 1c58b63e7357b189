use thiserror::Error;

/// Reasons a cartridge image is rejected at load time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("cartridge image is {len} bytes, larger than the {max} byte maximum")]
    TooLarge { len: usize, max: usize },

    #[error("cartridge image is {len} bytes, too small to contain a header")]
    TooSmall { len: usize },

    #[error("cartridge header logo does not match")]
    BadLogo,

    #[error("cartridge header checksum mismatch (header {expected:#04X}, computed {computed:#04X})")]
    BadHeaderChecksum { expected: u8, computed: u8 },
}

/// Fatal conditions raised while executing code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("unimplemented opcode {opcode:#04X} at {pc:#06X}")]
    UnimplementedOpcode { opcode: u8, pc: u16 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid image: {0}")]
    InvalidImage(#[from] LoadError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
