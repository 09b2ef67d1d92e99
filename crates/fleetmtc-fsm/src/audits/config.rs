//! Config audit (spec.md §4.4.9).
//!
//! Requests inventory's recorded root-credential signature and compares it
//! against an MD5 digest of the local shadow entry; on a mismatch it pushes
//! the freshly-computed digest back to inventory and re-requests the
//! signature to confirm the update landed.

use md5::{Digest, Md5};

use crate::effects::{Effect, StepResult, TimerSlot};
use crate::event::Event;

pub fn run(event: Event) -> StepResult<()> {
    match event {
        Event::TimerExpired(TimerSlot::Config) => StepResult::with(
            (),
            vec![Effect::RequestRootCredentialSignature, Effect::ArmTimer { timer: TimerSlot::Config, seconds: 300 }],
        ),
        Event::ConfigAuditData { local_shadow, inventory_signature } => compare(&local_shadow, &inventory_signature),
        _ => StepResult::to(()),
    }
}

fn compare(local_shadow: &[u8], inventory_signature: &str) -> StepResult<()> {
    let digest = format!("{:x}", Md5::digest(local_shadow));
    if digest == inventory_signature {
        return StepResult::to(());
    }
    StepResult::with(
        (),
        vec![Effect::ModifyRootCredentialSignature(digest), Effect::RequestRootCredentialSignature],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_signature_does_nothing() {
        let digest = format!("{:x}", Md5::digest(b"shadow-entry"));
        let r = compare(b"shadow-entry", &digest);
        assert!(r.effects.is_empty());
    }

    #[test]
    fn mismatch_pushes_the_computed_digest() {
        let r = compare(b"shadow-entry", "stale-signature");
        assert!(r.effects.iter().any(|e| matches!(e, Effect::ModifyRootCredentialSignature(_))));
    }
}
