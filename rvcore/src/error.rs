use thiserror::Error;

/// Why [`crate::Simulator::load`] refused a program image.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    #[error("program is {program_len} bytes, but memory only has {capacity} bytes free from the base address")]
    LoadTooLarge { program_len: usize, capacity: usize },
}
