//! Structural repair of secondary-hadronic-interaction blocklets.
//!
//! Some simulation productions wrote secondary hadronic interactions with
//! a malformed blocklet structure. A native correction routine rewrites
//! the affected banks in place; because it may reallocate and relink them,
//! the pass runs strictly before any extraction handles are created, and
//! the walk always continues from the link value the routine hands back,
//! never from a cached copy.
//!
//! The routine itself is an external collaborator behind
//! [`StructuralFix`]: the link goes in by value, a possibly-different link
//! and a status code come back. A non-zero status is logged and the walk
//! continues; the pass is best-effort repair, not a precondition.

use tracing::{debug, warn};

use crate::banks::{NEXT_LINK, SIM_SIGNATURE_WORD};
use dst_zebra::Arena;

/// 7-bit blocklet signature marking a secondary hadronic interaction.
pub const SHI_SIGNATURE: i32 = 0x6C;
/// Mask selecting the signature bits of the tag word.
pub const SHI_SIGNATURE_MASK: i32 = 0x7F;

/// Result of one correction call.
#[derive(Debug, Clone, Copy)]
pub struct FixOutcome {
    /// Link of the (possibly relocated) bank; the walk continues from it.
    pub link: i32,
    /// Native status code; zero means success.
    pub status: i32,
}

/// External correction routine for one matched bank.
pub trait StructuralFix {
    /// Repair the bank at `link`, returning where it now lives.
    fn apply(&mut self, arena: &mut dyn Arena, link: i32) -> FixOutcome;
}

/// Stand-in used when no native routine is linked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFix;

impl StructuralFix for NoopFix {
    fn apply(&mut self, _arena: &mut dyn Arena, link: i32) -> FixOutcome {
        FixOutcome { link, status: 0 }
    }
}

/// Counters reported by one repair pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixReport {
    /// Banks whose signature matched.
    pub matched: u32,
    /// Correction calls that returned a non-zero status.
    pub failed: u32,
}

/// Walk the chain starting at `head` and repair every bank whose tag word
/// carries the [`SHI_SIGNATURE`].
pub fn repair_secondary_interactions(
    arena: &mut dyn Arena,
    fix: &mut dyn StructuralFix,
    head: i32,
) -> FixReport {
    let mut report = FixReport::default();
    let mut link = head;
    while link > 0 {
        let tag = arena.iq(link + SIM_SIGNATURE_WORD) & SHI_SIGNATURE_MASK;
        if tag == SHI_SIGNATURE {
            report.matched += 1;
            let outcome = fix.apply(arena, link);
            if outcome.status != 0 {
                warn!(
                    link,
                    status = outcome.status,
                    "secondary interaction correction failed, continuing"
                );
                report.failed += 1;
            }
            // The routine may have relinked the bank; only its returned
            // link is trustworthy from here on.
            link = outcome.link;
            if link <= 0 {
                break;
            }
        }
        link = arena.lq(link + NEXT_LINK);
    }
    if report.matched > 0 {
        debug!(
            matched = report.matched,
            failed = report.failed,
            "secondary interaction repair pass done"
        );
    }
    report
}
