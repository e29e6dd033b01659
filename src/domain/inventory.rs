/// Item kinds and the player's inventory.
///
/// Item kinds are looked up by id in a fixed catalog. The inventory keeps
/// one slot per kind in first-acquired order; counts only grow.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemKind {
    pub id: String,
    pub name: String,
    pub image: String,
}

const CATALOG: &[(&str, &str, &str)] = &[
    ("Arrow",                     "Arrow",                 "weapons/Arrow.svg"),
    ("BottleLargeEmpty",          "empty large bottle",    "inventory/BottleLargeEmpty.svg"),
    ("BottleLargeEndurancedrink", "large endurancedrink",  "inventory/BottleLargeEndurancedrink.svg"),
    ("BottleLargeEnergydrink",    "large energydrink",     "inventory/BottleLargeEnergydrink.svg"),
    ("BottleSmallEmpty",          "empty small bottle",    "inventory/BottleSmallEmpty.svg"),
    ("BottleSmallEndurancedrink", "Endurance",             "inventory/BottleSmallEndurancedrink.svg"),
    ("BottleSmallEnergydrink",    "small bottle of Energy", "inventory/BottleSmallEnergydrink.svg"),
    ("Bow",                       "Bow",                   "weapons/Bow.svg"),
    ("BowBroken",                 "broken Bow",            "inventory/BowBroken.svg"),
    ("Dagger",                    "Dagger",                "weapons/Dagger.svg"),
    ("FireArrow",                 "Fire Arrow",            "weapons/FireArrow.svg"),
    ("IceArrow",                  "Ice Arrow",             "weapons/IceArrow.svg"),
    ("LightningArrow",            "electric Arrow",        "weapons/LightningArrow.svg"),
    ("LongSword",                 "Long Sword",            "weapons/LongSword.svg"),
    ("SmallSword",                "Small Sword",           "weapons/SmallSword.svg"),
    ("StarArrow",                 "Star Arrow",            "weapons/StarArrow.svg"),
    ("TwoHandSword",              "Two Hand Sword",        "weapons/TwohandSword.svg"),
];

impl ItemKind {
    /// Resolve an item id against the catalog.
    /// Unknown ids still produce a kind, named after the id.
    pub fn lookup(id: &str) -> ItemKind {
        match CATALOG.iter().find(|(key, _, _)| *key == id) {
            Some(&(id, name, image)) => ItemKind {
                id: id.to_string(),
                name: name.to_string(),
                image: image.to_string(),
            },
            None => {
                tracing::warn!("Unknown item type \"{}\"", id);
                ItemKind { id: id.to_string(), name: id.to_string(), image: String::new() }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub item: ItemKind,
    pub amount: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Inventory {
    slots: Vec<Slot>,
}

impl Inventory {
    pub fn new() -> Self {
        Inventory { slots: vec![] }
    }

    /// Add `amount` of `item`, appending a new slot on first acquisition.
    /// Returns the slot's new total.
    pub fn update_item(&mut self, item: &ItemKind, amount: u32) -> u32 {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.item.id == item.id) {
            slot.amount += amount;
            return slot.amount;
        }
        self.slots.push(Slot { item: item.clone(), amount });
        amount
    }

    #[cfg(test)]
    pub fn count(&self, id: &str) -> u32 {
        self.slots.iter()
            .find(|s| s.item.id == id)
            .map_or(0, |s| s.amount)
    }

    /// Slots in display order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_resolves_display_name() {
        let kind = ItemKind::lookup("TwoHandSword");
        assert_eq!(kind.name, "Two Hand Sword");
        assert_eq!(kind.image, "weapons/TwohandSword.svg");
    }

    #[test]
    fn unknown_item_falls_back_to_id() {
        let kind = ItemKind::lookup("Banana");
        assert_eq!(kind.name, "Banana");
        assert!(kind.image.is_empty());
    }

    #[test]
    fn counts_accumulate_per_kind() {
        let mut inv = Inventory::new();
        let arrow = ItemKind::lookup("Arrow");
        assert_eq!(inv.update_item(&arrow, 3), 3);
        assert_eq!(inv.update_item(&arrow, 2), 5);
        assert_eq!(inv.count("Arrow"), 5);
        assert_eq!(inv.slots().len(), 1);
    }

    #[test]
    fn insertion_order_is_display_order() {
        let mut inv = Inventory::new();
        inv.update_item(&ItemKind::lookup("Dagger"), 1);
        inv.update_item(&ItemKind::lookup("Arrow"), 4);
        inv.update_item(&ItemKind::lookup("Dagger"), 1);
        let ids: Vec<&str> = inv.slots().iter().map(|s| s.item.id.as_str()).collect();
        assert_eq!(ids, ["Dagger", "Arrow"]);
    }
}
