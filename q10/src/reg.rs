use num_enum::IntoPrimitive;
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, EnumString, Display,
)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Reg {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(r) => Ok(r),
            Err(_) => Err(format!("Unknown register name: {s}")),
        }
    }

    /// Register number, 0..=7.
    pub fn num(self) -> u8 {
        self.into()
    }
}
