/// Byte order used for every multi-byte read/write in the workspace.
pub type Endian = byteorder::LittleEndian;
