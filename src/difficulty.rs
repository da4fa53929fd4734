use super::*;

/// Expands compact difficulty bits into the full target and the decimal
/// digit count logged alongside it. The four bytes arrive hex-encoded in
/// display order, so they are reversed before the little-endian decode.
pub fn calc_difficulty(bits: &str) -> Result<(usize, Target)> {
    let mut bytes = hex::decode(bits).with_context(|| format!("invalid difficulty bits `{bits}`"))?;

    ensure!(
        bytes.len() == 4,
        "difficulty bits `{bits}` must be 8 hex chars"
    );

    bytes.reverse();

    let compact = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let target = Target::from_compact(CompactTarget::from_consensus(compact));
    let digits = U256::from_big_endian(&target.to_be_bytes()).to_string().len();

    Ok((digits, target))
}
