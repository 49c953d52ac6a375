// Stack arithmetic over machine inventories.
//
// Free functions instead of methods so callers can borrow other fields of the
// owning machine (e.g. its recipe) while mutating the stack list.

use crate::domain::entity::ItemStack;

/// Total quantity across all stacks; the per-machine cap applies to this sum.
pub fn total_quantity(stacks: &[ItemStack]) -> u32 {
    stacks.iter().map(|s| s.quantity).sum()
}

/// Quantity held for one item name.
pub fn count(stacks: &[ItemStack], name: &str) -> u32 {
    stacks
        .iter()
        .filter(|s| s.name == name)
        .map(|s| s.quantity)
        .sum()
}

/// Adds quantity, merging into the existing stack for `name` if present.
pub fn add(stacks: &mut Vec<ItemStack>, name: &str, quantity: u32) {
    if quantity == 0 {
        return;
    }
    if let Some(stack) = stacks.iter_mut().find(|s| s.name == name) {
        stack.quantity = stack.quantity.saturating_add(quantity);
        return;
    }
    stacks.push(ItemStack::new(name, quantity));
}

/// Removes quantity for `name`; returns false (and changes nothing) when the
/// inventory holds less than requested. Emptied stacks are dropped.
pub fn take(stacks: &mut Vec<ItemStack>, name: &str, quantity: u32) -> bool {
    if count(stacks, name) < quantity {
        return false;
    }
    let mut remaining = quantity;
    for stack in stacks.iter_mut().filter(|s| s.name == name) {
        if remaining == 0 {
            break;
        }
        let taken = stack.quantity.min(remaining);
        stack.quantity -= taken;
        remaining -= taken;
    }
    stacks.retain(|s| s.quantity > 0);
    true
}

/// Removes one unit from the oldest stack and returns its item name.
pub fn pop_oldest_unit(stacks: &mut Vec<ItemStack>) -> Option<String> {
    let first = stacks.first_mut()?;
    let name = first.name.clone();
    first.quantity -= 1;
    if first.quantity == 0 {
        stacks.remove(0);
    }
    Some(name)
}
