/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// A tile is a terrain kind plus an optional overlaid item kind. Items are
/// either scenery (trees, fences) or spawn markers that declare where an
/// actor of that type is expected to start.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Terrain {
    Grass,
    DeepWater,
    Water,
    Hill,
    Mountain,
    Sand,
    Ice,
    Lava,
    Unknown, // Unrecognised map character
}

impl Terrain {
    pub fn from_char(c: char) -> Terrain {
        match c {
            'G' => Terrain::Grass,
            'W' => Terrain::DeepWater,
            'w' => Terrain::Water,
            'H' => Terrain::Hill,
            'M' => Terrain::Mountain,
            'S' => Terrain::Sand,
            'I' => Terrain::Ice,
            'L' => Terrain::Lava,
            _   => Terrain::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Terrain::Grass     => "Grass",
            Terrain::DeepWater => "DeepWater",
            Terrain::Water     => "Water",
            Terrain::Hill      => "Hill",
            Terrain::Mountain  => "Mountain",
            Terrain::Sand      => "Sand",
            Terrain::Ice       => "Ice",
            Terrain::Lava      => "Lava",
            Terrain::Unknown   => "",
        }
    }

    /// Can an actor stand on this terrain?
    pub fn is_walkable(self) -> bool {
        !matches!(self, Terrain::DeepWater | Terrain::Mountain | Terrain::Unknown)
    }
}

impl Default for Terrain {
    fn default() -> Self {
        Terrain::Unknown
    }
}

/// Something placed on top of the terrain.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Item {
    Tree,
    Fence,
    // Spawn markers
    Player,
    Enemy,
    Tentaklon,
    Chest,
    Ladder,
    Shop,
}

impl Item {
    pub fn from_char(c: char) -> Option<Item> {
        match c {
            '@' => Some(Item::Tree),
            '#' | '-' | '|' | '/' | '\\' => Some(Item::Fence),
            'P' => Some(Item::Player),
            'E' => Some(Item::Enemy),
            'K' => Some(Item::Tentaklon),
            'C' => Some(Item::Chest),
            'L' => Some(Item::Ladder),
            '$' => Some(Item::Shop),
            _   => None,
        }
    }

    /// Matches the actor type name for spawn markers.
    pub fn name(self) -> &'static str {
        match self {
            Item::Tree      => "Tree",
            Item::Fence     => "Fence",
            Item::Player    => "Player",
            Item::Enemy     => "Enemy",
            Item::Tentaklon => "Tentaklon",
            Item::Chest     => "Chest",
            Item::Ladder    => "Ladder",
            Item::Shop      => "Shop",
        }
    }

    pub fn is_walkable(self) -> bool {
        !matches!(self, Item::Tree | Item::Fence)
    }

    /// Does this item mark the start position of an actor?
    pub fn is_spawn(self) -> bool {
        !matches!(self, Item::Tree | Item::Fence)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Tile {
    pub terrain: Terrain,
    pub item: Option<Item>,
    /// Cleared by level validation when no actor claims the marker.
    pub declared_spawn: bool,
}

impl Tile {
    /// Decode one tile from its 1- or 2-character spec.
    /// `T` and `F` are legacy aliases for grass with a tree or fence on it.
    pub fn from_spec(spec: &str) -> Tile {
        let mut chars = spec.chars();
        let mut t = chars.next().unwrap_or(' ');
        let mut i = chars.next().unwrap_or(' ');

        if t == 'T' {
            t = 'G';
            i = '@';
        } else if t == 'F' {
            t = 'G';
            i = '#';
        }

        let item = Item::from_char(i);
        Tile {
            terrain: Terrain::from_char(t),
            item,
            declared_spawn: item.map_or(false, Item::is_spawn),
        }
    }

    /// Effective walkability: an item decides if present, else the terrain.
    pub fn is_walkable(self) -> bool {
        match self.item {
            Some(item) => item.is_walkable(),
            None => self.terrain.is_walkable(),
        }
    }

    pub fn item_name(self) -> &'static str {
        self.item.map_or("", Item::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_alias_expands_to_grass_with_tree() {
        let t = Tile::from_spec("T");
        assert_eq!(t.terrain, Terrain::Grass);
        assert_eq!(t.item, Some(Item::Tree));
        assert!(!t.is_walkable());
    }

    #[test]
    fn fence_alias_overrides_second_character() {
        let t = Tile::from_spec("FE");
        assert_eq!(t.terrain, Terrain::Grass);
        assert_eq!(t.item, Some(Item::Fence));
    }

    #[test]
    fn item_walkability_wins_over_terrain() {
        // Ladder marker on deep water: the item decides.
        let t = Tile::from_spec("WL");
        assert!(!t.terrain.is_walkable());
        assert!(t.is_walkable());
    }

    #[test]
    fn unknown_character_is_nameless_and_blocked() {
        let t = Tile::from_spec(" ");
        assert_eq!(t.terrain.name(), "");
        assert!(t.item.is_none());
        assert!(!t.is_walkable());
    }

    #[test]
    fn spawn_markers_are_declared() {
        assert!(Tile::from_spec("GE").declared_spawn);
        assert!(!Tile::from_spec("G@").declared_spawn);
        assert!(!Tile::from_spec("G").declared_spawn);
    }
}
