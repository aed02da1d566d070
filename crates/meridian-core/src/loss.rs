// SPDX-License-Identifier: Apache-2.0
//! Loss accounting: applying engagement aftermath to forces and their
//! backing states.
//!
//! These helpers are deliberately forgiving about missing subjects — a
//! resolution must be able to book every surviving participant's losses
//! even when one reference has gone stale — but they never partially apply
//! a single line.

use crate::engagement::EquipmentLoss;
use crate::force::SecurityForce;
use crate::governance::{LegitimacyId, LegitimacyRegistry};
use crate::morale::{MoraleId, MoraleRegistry};
use crate::readiness::{ReadinessId, ReadinessRegistry};
use crate::tick::Tick;

/// Decrements a force's equipment lines by the listed losses, clamping at
/// zero and erasing emptied lines. Unknown assets are skipped.
pub fn apply_equipment_losses(force: &mut SecurityForce, losses: &[EquipmentLoss]) {
    for loss in losses {
        if loss.equipment_id == 0 || loss.qty == 0 {
            continue;
        }
        if let Ok(idx) = force
            .equipment
            .binary_search_by_key(&loss.equipment_id, |l| l.asset_id)
        {
            let line = &mut force.equipment[idx];
            line.qty = line.qty.saturating_sub(loss.qty);
            if line.qty == 0 {
                force.equipment.remove(idx);
            }
        }
    }
}

/// Applies a readiness delta, ignoring unknown subjects.
pub fn apply_readiness(
    registry: &mut ReadinessRegistry,
    readiness_id: ReadinessId,
    delta: i32,
    act_time: Tick,
) {
    let _ = registry.apply_delta(readiness_id, delta, act_time);
}

/// Applies a morale delta, ignoring unknown subjects.
pub fn apply_morale(registry: &mut MoraleRegistry, morale_id: MoraleId, delta: i32) {
    let _ = registry.apply_delta(morale_id, delta);
}

/// Applies a legitimacy delta, ignoring unknown subjects.
pub fn apply_legitimacy(registry: &mut LegitimacyRegistry, legitimacy_id: LegitimacyId, delta: i32) {
    let _ = registry.apply_delta(legitimacy_id, delta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::force::{DomainScope, SecurityForceRegistry};

    #[test]
    fn equipment_losses_clamp_and_erase() {
        let mut forces = SecurityForceRegistry::with_capacity(4, 1);
        forces.register(1, 1, DomainScope::Local, 10, 0).unwrap();
        forces.add_equipment(1, 5, 4).unwrap();
        forces.add_equipment(1, 6, 2).unwrap();
        let force = forces.get_mut(1).unwrap();
        apply_equipment_losses(
            force,
            &[
                EquipmentLoss {
                    equipment_id: 5,
                    qty: 1,
                },
                EquipmentLoss {
                    equipment_id: 6,
                    qty: 10,
                },
                EquipmentLoss {
                    equipment_id: 99,
                    qty: 3,
                },
            ],
        );
        assert_eq!(force.equipment.len(), 1);
        assert_eq!(force.equipment[0].asset_id, 5);
        assert_eq!(force.equipment[0].qty, 3);
    }
}
