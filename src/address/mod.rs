//! Address resolution: postal-code lookup feeding the address step.

pub mod lookup;
pub mod resolver;

pub use lookup::{CepDirectory, CepRecord, ViaCepDirectory};
pub use resolver::{AddressResolver, ResolvedAddress};
