//! Register names of the MIPS-style target machine

pub const SP: &str = "$sp";
pub const FP: &str = "$fp";
pub const RA: &str = "$ra";
pub const V0: &str = "$v0";
pub const A0: &str = "$a0";
pub const T0: &str = "$t0";
pub const T1: &str = "$t1";
