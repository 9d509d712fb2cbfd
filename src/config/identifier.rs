use super::{BACK_OFFSET, DIVIDERS_OFFSET, EXTERNAL_CLOCK_OFFSET, FRONT_IO_GROUP_SIZE,
    MAX_DIVIDERS, MAX_SCALERS, SCALERS_OFFSET};
use once_cell::sync::Lazy;
use regex::Regex;

static FRONT_IO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-C])([0-9]{1,2})$").expect("front io pattern")
});
static SCALER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^S([0-9]{1,2})$").expect("scaler pattern"));
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^clock_([0-9]+)([kM])?Hz$").expect("clock pattern"));
static DIVIDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_D([0-9]+)$").expect("divider pattern"));

/// Whether the name is a front I/O port: `A0..A31`, `B0..B31` or `C0..C31`.
pub fn is_front_io(name: &str) -> bool {
    FRONT_IO
        .captures(name)
        .and_then(|c| c[2].parse::<usize>().ok())
        .map_or(false, |index| index < 2 * FRONT_IO_GROUP_SIZE)
}

/// Whether the name is the LEMO form of a front port, indices 16..31.
pub fn is_lemo_io(name: &str) -> bool {
    FRONT_IO
        .captures(name)
        .and_then(|c| c[2].parse::<usize>().ok())
        .map_or(false, |index| {
            (FRONT_IO_GROUP_SIZE..2 * FRONT_IO_GROUP_SIZE).contains(&index)
        })
}

/// Whether the name is the back-plane output port.
pub fn is_back(name: &str) -> bool {
    name == "Back"
}

/// Whether the name is the external clock output port.
pub fn is_extern_clock(name: &str) -> bool {
    name == "Extern"
}

/// Whether the name is a clock source: `clock_<digits>Hz`, `clock_<digits>kHz`
/// or `clock_<digits>MHz`.
pub fn is_clock(name: &str) -> bool {
    CLOCK.is_match(name)
}

/// Whether the name is a scaler: `S0..S31`.
pub fn is_scaler(name: &str) -> bool {
    SCALER
        .captures(name)
        .and_then(|c| c[1].parse::<usize>().ok())
        .map_or(false, |index| index < MAX_SCALERS)
}

/// Whether the name is a reserved downscale placeholder `_D<k>`. These are
/// synthesized internally; source lines can not spell them since identifiers
/// may not start with an underscore.
pub fn is_divider(name: &str) -> bool {
    DIVIDER
        .captures(name)
        .and_then(|c| c[1].parse::<usize>().ok())
        .map_or(false, |index| index < MAX_DIVIDERS)
}

/// Whether the name can only be a user macro: none of the reserved port,
/// clock, scaler or placeholder forms.
pub fn is_user_variable(name: &str) -> bool {
    !name.is_empty()
        && !is_front_io(name)
        && !is_back(name)
        && !is_extern_clock(name)
        && !is_clock(name)
        && !is_scaler(name)
        && !is_divider(name)
        && !name.starts_with('_')
}

/// The frequency of a clock name in Hz.
pub fn parse_frequency(name: &str) -> Option<u64> {
    let captures = CLOCK.captures(name)?;
    let base: u64 = captures[1].parse().ok()?;
    let gain: u64 = match captures.get(2).map(|m| m.as_str()) {
        Some("k") => 1_000,
        Some("M") => 1_000_000,
        _ => 1,
    };
    base.checked_mul(gain)
}

/// The global source index of a port-like identifier.
///
/// Front ports map into 0..48 with the LEMO form folded onto its group's
/// 0..15 lane, scalers to their scaler slot, `Back`/`Extern` and downscale
/// placeholders to their fixed offsets. Clock and macro names have no fixed
/// index and return None.
pub fn identifier_index(name: &str) -> Option<usize> {
    if is_back(name) {
        return Some(BACK_OFFSET);
    }
    if is_extern_clock(name) {
        return Some(EXTERNAL_CLOCK_OFFSET);
    }
    if let Some(captures) = FRONT_IO.captures(name) {
        let index: usize = captures[2].parse().ok()?;
        if index >= 2 * FRONT_IO_GROUP_SIZE {
            return None;
        }
        let group = (captures[1].as_bytes()[0] - b'A') as usize;
        return Some(index % FRONT_IO_GROUP_SIZE + group * FRONT_IO_GROUP_SIZE);
    }
    if let Some(captures) = SCALER.captures(name) {
        let index: usize = captures[1].parse().ok()?;
        if index >= MAX_SCALERS {
            return None;
        }
        return Some(SCALERS_OFFSET + index);
    }
    if let Some(captures) = DIVIDER.captures(name) {
        let index: usize = captures[1].parse().ok()?;
        if index >= MAX_DIVIDERS {
            return None;
        }
        return Some(DIVIDERS_OFFSET + index);
    }
    None
}
