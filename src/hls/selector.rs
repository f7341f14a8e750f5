use crate::error::{Error, Result};

use super::types::{MasterPlaylist, Resolution, Variant};

/// Caller's rendition preference, if any.
#[derive(Clone, Copy, Debug, Default)]
pub struct Preference {
    pub resolution: Option<Resolution>,
    pub bandwidth: Option<u64>,
}

/// Deterministically selects one variant from `master`, returning
/// its absolute URI. The same `(master, preference)` pair always yields the
/// same result: selection only ever looks at `variants` in order and
/// never at external state.
pub fn select_variant(master: &MasterPlaylist, preference: Preference) -> Result<String> {
    if master.variants.is_empty() {
        return Err(Error::NoVariant);
    }

    let chosen = if let Some(pref_res) = preference.resolution {
        select_by_resolution(&master.variants, pref_res)
    } else if let Some(pref_bw) = preference.bandwidth {
        select_by_bandwidth(&master.variants, pref_bw)
    } else {
        select_highest_bandwidth(&master.variants)
    };

    Ok(chosen.uri.clone())
}

fn select_by_resolution(variants: &[Variant], pref: Resolution) -> &Variant {
    let candidates: Vec<&Variant> = variants
        .iter()
        .filter(|v| v.resolution.map(|r| r.height <= pref.height).unwrap_or(true))
        .collect();

    let pool: Vec<&Variant> = if candidates.is_empty() {
        variants.iter().collect()
    } else {
        candidates
    };

    pool.into_iter()
        .enumerate()
        .max_by_key(|(order, v)| {
            let height = v.resolution.map(|r| r.height).unwrap_or(0);
            (height, v.bandwidth, std::cmp::Reverse(*order))
        })
        .map(|(_, v)| v)
        .expect("variants non-empty")
}

fn select_by_bandwidth(variants: &[Variant], pref: u64) -> &Variant {
    let within_budget: Vec<&Variant> = variants.iter().filter(|v| v.bandwidth <= pref).collect();

    if let Some(best) = within_budget
        .into_iter()
        .enumerate()
        .max_by_key(|(order, v)| (v.bandwidth, std::cmp::Reverse(*order)))
        .map(|(_, v)| v)
    {
        return best;
    }

    // None qualify: fall back to the lowest-bandwidth variant overall.
    variants
        .iter()
        .enumerate()
        .min_by_key(|(order, v)| (v.bandwidth, *order))
        .map(|(_, v)| v)
        .expect("variants non-empty")
}

fn select_highest_bandwidth(variants: &[Variant]) -> &Variant {
    variants
        .iter()
        .enumerate()
        .max_by_key(|(order, v)| (v.bandwidth, std::cmp::Reverse(*order)))
        .map(|(_, v)| v)
        .expect("variants non-empty")
}
