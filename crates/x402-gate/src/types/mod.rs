//! Wire types shared by the gate, the verifiers, and the paying client.

mod amount;
mod challenge;
mod common;

pub use amount::*;
pub use challenge::*;
pub use common::*;
