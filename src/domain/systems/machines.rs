use crate::domain::entity::{Machine, MachineKind};
use crate::domain::inventory;
use crate::domain::recipe::MINER_RESOURCE;

#[derive(Debug, Clone, Copy)]
pub struct MachineConfig {
    pub miner_interval_ticks: u32,
    pub inventory_cap: u32,
}

/// Runs every machine's per-tick behavior in collection order.
///
/// The power contract gates the whole behavior: an unpowered machine neither
/// produces nor advances its progress counter. Machines with no recipe or no
/// reachable neighbor simply do nothing this tick.
pub fn tick_machines(machines: &mut Vec<Machine>, cfg: MachineConfig) {
    for i in 0..machines.len() {
        if !machines[i].power.satisfied() {
            continue;
        }
        match machines[i].kind {
            MachineKind::Miner => tick_miner(&mut machines[i], cfg),
            MachineKind::Assembler => tick_assembler(&mut machines[i]),
            MachineKind::Belt => tick_belt(machines, i, cfg),
            MachineKind::Inserter => tick_inserter(machines, i, cfg),
            // Turret targeting and firing are owned by the combat system.
            MachineKind::Turret => {}
        }
    }
}

fn tick_miner(m: &mut Machine, cfg: MachineConfig) {
    m.progress += 1;
    if m.progress < cfg.miner_interval_ticks {
        return;
    }
    m.progress = 0;
    if inventory::total_quantity(&m.inventory) >= cfg.inventory_cap {
        return;
    }
    inventory::add(&mut m.inventory, MINER_RESOURCE, 1);
}

fn tick_assembler(m: &mut Machine) {
    let Some(recipe) = &m.recipe else {
        return;
    };

    // Availability check and consumption are separate passes over the same
    // predicate; consumption only starts once the check has passed, so the
    // conversion is all-or-nothing.
    let affordable = recipe
        .inputs
        .iter()
        .all(|req| inventory::count(&m.inventory, &req.name) >= req.quantity);
    if !affordable {
        return;
    }

    for req in &recipe.inputs {
        inventory::take(&mut m.inventory, &req.name, req.quantity);
    }
    for out in &recipe.outputs {
        inventory::add(&mut m.inventory, &out.name, out.quantity);
    }
}

fn tick_belt(machines: &mut [Machine], i: usize, cfg: MachineConfig) {
    if machines[i].inventory.is_empty() {
        return;
    }
    let dest_cell = machines[i].facing.step(machines[i].position);
    let Some(j) = machines.iter().position(|m| m.position == dest_cell) else {
        return;
    };
    if j == i {
        return;
    }
    if inventory::total_quantity(&machines[j].inventory) >= cfg.inventory_cap {
        return;
    }
    let Some(name) = inventory::pop_oldest_unit(&mut machines[i].inventory) else {
        return;
    };
    inventory::add(&mut machines[j].inventory, &name, 1);
}

fn tick_inserter(machines: &mut [Machine], i: usize, cfg: MachineConfig) {
    let pos = machines[i].position;
    let facing = machines[i].facing;

    let Some(src) = machines
        .iter()
        .position(|m| m.position == facing.opposite().step(pos))
    else {
        return;
    };
    let Some(dst) = machines.iter().position(|m| m.position == facing.step(pos)) else {
        return;
    };
    if src == i || dst == i || src == dst {
        return;
    }
    if inventory::total_quantity(&machines[dst].inventory) >= cfg.inventory_cap {
        return;
    }
    let Some(name) = inventory::pop_oldest_unit(&mut machines[src].inventory) else {
        return;
    };
    inventory::add(&mut machines[dst].inventory, &name, 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Facing, GridPos};
    use crate::domain::inventory;
    use crate::domain::recipe::Recipe;

    fn cfg() -> MachineConfig {
        MachineConfig {
            miner_interval_ticks: 60,
            inventory_cap: 10,
        }
    }

    fn machine(id: u64, kind: MachineKind, x: i32, y: i32, facing: Facing) -> Machine {
        Machine::new(id, kind, GridPos::new(x, y), facing)
    }

    #[test]
    fn miner_produces_one_unit_per_interval() {
        let mut machines = vec![machine(1, MachineKind::Miner, 0, 0, Facing::North)];

        for _ in 0..60 {
            tick_machines(&mut machines, cfg());
        }
        assert_eq!(inventory::count(&machines[0].inventory, MINER_RESOURCE), 1);

        for _ in 0..59 {
            tick_machines(&mut machines, cfg());
        }
        assert_eq!(inventory::count(&machines[0].inventory, MINER_RESOURCE), 1);

        tick_machines(&mut machines, cfg());
        assert_eq!(inventory::count(&machines[0].inventory, MINER_RESOURCE), 2);
    }

    #[test]
    fn miner_respects_inventory_cap() {
        let mut machines = vec![machine(1, MachineKind::Miner, 0, 0, Facing::North)];
        inventory::add(&mut machines[0].inventory, MINER_RESOURCE, 10);

        for _ in 0..120 {
            tick_machines(&mut machines, cfg());
        }
        assert_eq!(inventory::total_quantity(&machines[0].inventory), 10);
    }

    #[test]
    fn unpowered_machine_never_mutates_inventory() {
        let mut machines = vec![machine(1, MachineKind::Miner, 0, 0, Facing::North)];
        machines[0].power.connected = false;

        for _ in 0..240 {
            tick_machines(&mut machines, cfg());
        }
        assert!(machines[0].inventory.is_empty());
        assert_eq!(machines[0].progress, 0);

        machines[0].power.connected = true;
        machines[0].power.available = machines[0].power.required - 1.0;
        for _ in 0..240 {
            tick_machines(&mut machines, cfg());
        }
        assert!(machines[0].inventory.is_empty());
    }

    #[test]
    fn assembler_consumes_and_produces_atomically() {
        let mut machines = vec![machine(1, MachineKind::Assembler, 0, 0, Facing::North)];
        machines[0].recipe = Some(Recipe::iron_gear());
        inventory::add(&mut machines[0].inventory, "iron-plate", 2);

        tick_machines(&mut machines, cfg());

        assert_eq!(inventory::count(&machines[0].inventory, "iron-plate"), 0);
        assert_eq!(inventory::count(&machines[0].inventory, "iron-gear"), 1);
    }

    #[test]
    fn assembler_with_partial_inputs_changes_nothing() {
        let mut machines = vec![machine(1, MachineKind::Assembler, 0, 0, Facing::North)];
        machines[0].recipe = Some(Recipe::iron_gear());
        inventory::add(&mut machines[0].inventory, "iron-plate", 1);

        for _ in 0..10 {
            tick_machines(&mut machines, cfg());
        }

        assert_eq!(inventory::count(&machines[0].inventory, "iron-plate"), 1);
        assert_eq!(inventory::count(&machines[0].inventory, "iron-gear"), 0);
    }

    #[test]
    fn assembler_without_recipe_is_inert() {
        let mut machines = vec![machine(1, MachineKind::Assembler, 0, 0, Facing::North)];
        machines[0].recipe = None;
        inventory::add(&mut machines[0].inventory, "iron-plate", 2);

        tick_machines(&mut machines, cfg());
        assert_eq!(inventory::count(&machines[0].inventory, "iron-plate"), 2);
    }

    #[test]
    fn belt_moves_oldest_item_toward_facing() {
        let mut machines = vec![
            machine(1, MachineKind::Belt, 0, 0, Facing::East),
            machine(2, MachineKind::Belt, 1, 0, Facing::East),
        ];
        inventory::add(&mut machines[0].inventory, "iron-ore", 1);
        inventory::add(&mut machines[0].inventory, "iron-gear", 1);

        tick_machines(&mut machines, cfg());

        // Oldest stack moves first; one unit per tick.
        assert_eq!(inventory::count(&machines[0].inventory, "iron-ore"), 0);
        assert_eq!(inventory::count(&machines[1].inventory, "iron-ore"), 1);
        assert_eq!(inventory::count(&machines[0].inventory, "iron-gear"), 1);
    }

    #[test]
    fn belt_refuses_transfer_into_full_destination() {
        let mut machines = vec![
            machine(1, MachineKind::Belt, 0, 0, Facing::East),
            machine(2, MachineKind::Belt, 1, 0, Facing::East),
        ];
        inventory::add(&mut machines[0].inventory, "iron-ore", 1);
        inventory::add(&mut machines[1].inventory, "iron-gear", 10);

        tick_machines(&mut machines, cfg());

        assert_eq!(inventory::count(&machines[0].inventory, "iron-ore"), 1);
        assert_eq!(inventory::total_quantity(&machines[1].inventory), 10);
    }

    #[test]
    fn belt_with_no_destination_machine_holds_items() {
        let mut machines = vec![machine(1, MachineKind::Belt, 0, 0, Facing::East)];
        inventory::add(&mut machines[0].inventory, "iron-ore", 3);

        tick_machines(&mut machines, cfg());
        assert_eq!(inventory::count(&machines[0].inventory, "iron-ore"), 3);
    }

    #[test]
    fn inserter_transfers_from_behind_to_ahead() {
        // Source sits west of the inserter, destination east; inserter faces east.
        let mut machines = vec![
            machine(1, MachineKind::Miner, 0, 0, Facing::North),
            machine(2, MachineKind::Inserter, 1, 0, Facing::East),
            machine(3, MachineKind::Assembler, 2, 0, Facing::North),
        ];
        inventory::add(&mut machines[0].inventory, "iron-ore", 2);

        tick_machines(&mut machines, cfg());

        assert_eq!(inventory::count(&machines[0].inventory, "iron-ore"), 1);
        assert_eq!(inventory::count(&machines[2].inventory, "iron-ore"), 1);
    }
}
