//! Hash command implementation.

use anyhow::Result;

use reconnect_core::IntegrityAlgorithm;

/// Execute the hash command.
pub fn execute(text: &str, sha3: bool) -> Result<()> {
    let algorithm = if sha3 {
        IntegrityAlgorithm::Sha3_256
    } else {
        IntegrityAlgorithm::Rolling32
    };
    println!("{}", algorithm.tag(text));
    Ok(())
}
