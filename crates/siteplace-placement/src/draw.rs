//! Weighted random draw

use crate::candidate::CandidateSite;
use rand::Rng;
use rand::seq::SliceRandom;
use siteplace_common::{Error, Result};

fn drawable(site: &CandidateSite) -> bool {
    site.weight.is_finite() && site.weight > 0.0
}

/// Draw one candidate with probability proportional to its weight.
///
/// The pool is shuffled first so ties do not favour insertion order.
/// Sites with a non-positive or non-finite weight are never drawn; a pool
/// with no drawable site fails with `NoEligibleCandidates`.
pub fn choose_weighted<'a, R: Rng + ?Sized>(
    rng: &mut R,
    pool: &mut [&'a CandidateSite],
) -> Result<&'a CandidateSite> {
    pool.shuffle(rng);
    let total: f64 = pool.iter().filter(|s| drawable(s)).map(|s| s.weight).sum();
    if pool.is_empty() || !(total.is_finite() && total > 0.0) {
        return Err(Error::no_eligible(format!(
            "cannot draw from {} candidates with total weight {total}",
            pool.len()
        )));
    }

    let pick = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last = None;
    for site in pool.iter().copied().filter(|s| drawable(s)) {
        cumulative += site.weight;
        if cumulative >= pick {
            return Ok(site);
        }
        last = Some(site);
    }

    // Rounding left the running sum just short of the draw
    last.ok_or_else(|| Error::no_eligible("no drawable candidate"))
}
