//! Standard exit codes (BSD sysexits.h compatible)

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (invalid draft, failed validation)
pub const DATAERR: i32 = 65;

/// Cannot open input (unknown draft)
pub const NOINPUT: i32 = 66;

/// Service unavailable (backend unreachable or rejecting requests)
pub const UNAVAILABLE: i32 = 69;

/// Can't create output file
pub const CANTCREAT: i32 = 73;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
