//! `filesage strategies`: list strategy names.

use anyhow::Result;
use filesage_core::compare::Strategy;

pub fn run_strategies() -> Result<i32> {
    for s in Strategy::ALL {
        let note = if s.is_partial() {
            "match is inconclusive unless trusted"
        } else {
            "content comparison"
        };
        println!("{:<22}  {}", s.name(), note);
    }
    Ok(0)
}
