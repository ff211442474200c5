//! Exploit model selection from the command line.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rhsim_byte_range::{AnyFlip, ByteRange};
use rhsim_core::ExploitModel;
use rhsim_pte::PteFlip;

/// An exploit model as named on the command line.
///
/// Accepted forms are `any`, `pte`, `pte:PHYS_BITS` and `range:START-END`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExploitSpec {
    /// Every flip is exploitable
    Any,
    /// Flips in the PFN field of page-table entries
    Pte(PteFlip),
    /// Flips within a page byte range
    Range(ByteRange),
}

impl ExploitSpec {
    /// Instantiates the exploit model.
    pub fn build(&self) -> Box<dyn ExploitModel + Send + Sync> {
        match self {
            ExploitSpec::Any => Box::new(AnyFlip),
            ExploitSpec::Pte(model) => Box::new(model.clone()),
            ExploitSpec::Range(model) => Box::new(model.clone()),
        }
    }
}

impl Display for ExploitSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExploitSpec::Any => write!(f, "any"),
            ExploitSpec::Pte(model) => write!(f, "pte:{}", model.phys_bits),
            ExploitSpec::Range(model) => {
                write!(f, "range:{:#x}-{:#x}", model.range.start, model.range.end)
            }
        }
    }
}

impl FromStr for ExploitSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        match (name, arg) {
            ("any", None) => Ok(ExploitSpec::Any),
            ("pte", None) => Ok(ExploitSpec::Pte(PteFlip::default())),
            ("pte", Some(bits)) => bits
                .parse()
                .ok()
                .filter(|bits| (13..=52).contains(bits))
                .map(|phys_bits| {
                    ExploitSpec::Pte(PteFlip {
                        phys_bits,
                        ..Default::default()
                    })
                })
                .ok_or_else(|| format!("invalid number of physical bits: {}", bits)),
            ("range", Some(range)) => ByteRange::parse(range)
                .map(ExploitSpec::Range)
                .ok_or_else(|| format!("invalid byte range: {}", range)),
            _ => Err(format!(
                "unknown exploit model `{}` (expected any, pte[:BITS] or range:START-END)",
                s
            )),
        }
    }
}
