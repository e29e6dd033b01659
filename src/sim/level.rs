/// Level descriptions.
///
/// ## File layout (`<index>.level.json` in the data directory):
///   ```
///   {
///     "levelName": "Meadow",
///     "map": { "filename": "meadow.map", "format": 2 },
///     "player":     { "$ref": "#/actors/hero", "x": 3, "y": 4 },
///     "chests":     [ { "x": 5, "y": 1, "item": "Arrow", "amount": 3 } ],
///     "ladders":    [ { "x": 9, "y": 9, "level": 2, "dx": 1, "dy": 1 } ],
///     "enemies":    [ ... ],
///     "tentaklons": [ ... ],
///     "shops":      [ ... ]
///   }
///   ```
///
/// ## References
/// Any actor object may carry `"$ref": "file.json#/path/to/object"`. An empty
/// file part means `basics.json`. Keys of the referring object win over the
/// referenced ones; references inside referenced objects are followed too.
///
/// Building a level never touches the running game: the caller gets a
/// complete `Level` or an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map as JsonObject, Value};

use crate::domain::actor::{Actor, ActorKind, Appearance, EnergyLevel, LadderTarget};
use crate::domain::ai::MoveScript;
use crate::domain::grid::Point;
use crate::domain::inventory::{Inventory, ItemKind};
use crate::domain::map::{Map, MapFormat};
use crate::error::{LoadError, Result};

/// Level whose ladders lead nowhere.
pub const LIMBO_LEVEL: i64 = -1;
/// Level loaded at startup and underneath bare `.txt` maps.
pub const DEFAULT_LEVEL: u32 = 1;

const BASICS_FILE: &str = "basics.json";
const MAX_REF_DEPTH: usize = 16;

pub fn level_file_name(index: u32) -> String {
    format!("{index}.level.json")
}

/// A fully built level, ready to be swapped into the backend.
#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub file: PathBuf,
    pub map_file: PathBuf,
    pub map: Map,
    /// Roster order: ladders, chests, enemies, tentaklons, shops, player.
    pub actors: Vec<Actor>,
}

// ── JSON Schema ──

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LevelFile {
    #[serde(default)]
    level_name: String,
    map: MapSpec,
    #[serde(default)]
    player: JsonObject<String, Value>,
    #[serde(default)]
    chests: Vec<JsonObject<String, Value>>,
    #[serde(default)]
    ladders: Vec<JsonObject<String, Value>>,
    #[serde(default)]
    enemies: Vec<JsonObject<String, Value>>,
    #[serde(default)]
    tentaklons: Vec<JsonObject<String, Value>>,
    #[serde(default)]
    shops: Vec<JsonObject<String, Value>>,
}

#[derive(Deserialize, Debug)]
struct MapSpec {
    filename: String,
    #[serde(default = "default_map_format")]
    format: i64,
}

fn default_map_format() -> i64 { 2 }

/// Actor fields after reference resolution. Kind-specific fields are
/// simply ignored by kinds that do not use them.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct ActorSpec {
    name: String,
    x: i32,
    y: i32,
    minimum_energy: Option<i32>,
    maximum_energy: Option<i32>,
    maximum_lives: i32,
    image: String,
    image_count: i32,
    energy_levels: Vec<EnergyLevelSpec>,
    #[serde(rename = "type")]
    type_name: Option<String>,
    color: Option<String>,
    // Chest
    item: String,
    amount: i32,
    // Ladder
    level: Option<i64>,
    dx: i32,
    dy: i32,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct EnergyLevelSpec {
    minimum_energy: f64,
    image: String,
    image_count: i32,
}

/// Per-kind defaults for static items.
struct ItemDefaults {
    color: &'static str,
    minimum_energy: i32,
    maximum_energy: i32,
}

const CHEST_DEFAULTS: ItemDefaults = ItemDefaults { color: "#b29764", minimum_energy: 1, maximum_energy: 2 };
const LADDER_DEFAULTS: ItemDefaults = ItemDefaults { color: "#625507", minimum_energy: 1, maximum_energy: 2 };
const SHOP_DEFAULTS: ItemDefaults = ItemDefaults { color: "#3c7a89", minimum_energy: 1, maximum_energy: 2 };

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Read `path` (relative paths resolve against `data_dir`) and build the
/// level it describes. `spawn` places the player somewhere other than its
/// described start.
pub fn load_level_file(data_dir: &Path, path: &Path, spawn: Option<Point>) -> Result<Level> {
    let file = data_dir.join(path);
    tracing::info!("Loading level {}", file.display());

    let text = std::fs::read_to_string(&file).map_err(|source| LoadError::Io {
        path: file.clone(),
        source,
    })?;
    let description: LevelFile = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: file.clone(),
        source,
    })?;

    let map_file = data_dir.join(&description.map.filename);
    let map = Map::from_file(&map_file, MapFormat::from_id(description.map.format)?)?;

    let name = if description.level_name.is_empty() {
        base_name(&file)
    } else {
        description.level_name.clone()
    };

    let mut refs = RefResolver::new(data_dir);
    let actors = build_roster(&description, &mut refs, spawn)?;

    Ok(Level { name, file, map_file, map, actors })
}

/// Level display name without building anything beyond the description.
pub fn read_level_name(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let description: LevelFile = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if description.level_name.is_empty() {
        Ok(base_name(path))
    } else {
        Ok(description.level_name)
    }
}

/// Cross-check actors against spawn markers in the map. Mismatches are
/// logged; markers nobody claims lose their spawn flag. Returns the number
/// of diagnostics logged.
pub fn validate_actors(map: &mut Map, actors: &[Actor], level_file: &Path, map_file: &Path) -> usize {
    let mut claimed: HashMap<usize, &str> = HashMap::new();
    let mut warnings = 0;

    for actor in actors {
        let pos = actor.position();
        let Some(tile) = map.tile_at(pos) else {
            tracing::warn!(
                "{}: start position {} of {} \"{}\" is outside the map",
                level_file.display(), pos, actor.type_name, actor.name,
            );
            warnings += 1;
            continue;
        };

        let item_name = tile.item_name();
        if item_name.is_empty() {
            tracing::warn!(
                "{}: No item at supposed start position {} of {} \"{}\"",
                level_file.display(), pos, actor.type_name, actor.name,
            );
            warnings += 1;
        } else if item_name != actor.type_name {
            tracing::warn!(
                "{}: Unexpected item of type {} at start position {} of {} \"{}\"",
                level_file.display(), item_name, pos, actor.type_name, actor.name,
            );
            warnings += 1;
        }

        claimed.insert(map.index_of(pos), actor.type_name.as_str());
    }

    let unclaimed: Vec<(usize, &'static str)> = map.tiles()
        .filter(|(_, tile)| tile.declared_spawn)
        .filter(|(index, tile)| claimed.get(index).copied() != Some(tile.item_name()))
        .map(|(index, tile)| (index, tile.item_name()))
        .collect();

    for (index, item_name) in unclaimed {
        map.clear_declared_spawn(index);
        tracing::warn!(
            "{}: Map contains a start position of an actor of type {} at {}, \
             but the details are missing in the level description",
            map_file.display(), item_name, map.point_of(index),
        );
        warnings += 1;
    }
    warnings
}

// ── Roster ──

fn build_roster(description: &LevelFile, refs: &mut RefResolver, spawn: Option<Point>) -> Result<Vec<Actor>> {
    let mut actors = Vec::new();

    for object in &description.ladders {
        let spec = refs.spec(object)?;
        let target = match spec.level {
            Some(level) if level > LIMBO_LEVEL => match u32::try_from(level) {
                Ok(index) => LadderTarget::Level(index),
                Err(_) => {
                    tracing::warn!("Ladder at ({}, {}): level {} out of range, staying on this level", spec.x, spec.y, level);
                    LadderTarget::SameLevel
                }
            },
            _ => LadderTarget::SameLevel,
        };
        let kind = ActorKind::Ladder { target, destination: Point::new(spec.dx, spec.dy) };
        actors.push(item_actor(spec, kind, &LADDER_DEFAULTS));
    }

    for object in &description.chests {
        let spec = refs.spec(object)?;
        let kind = ActorKind::Chest {
            item: ItemKind::lookup(&spec.item),
            amount: spec.amount.max(1) as u32,
        };
        actors.push(item_actor(spec, kind, &CHEST_DEFAULTS));
    }

    for object in &description.enemies {
        let spec = refs.spec(object)?;
        actors.push(actor(spec, ActorKind::Enemy));
    }

    for object in &description.tentaklons {
        let spec = refs.spec(object)?;
        let script = MoveScript::new(Point::new(spec.x, spec.y));
        actors.push(actor(spec, ActorKind::Tentaklon { script }));
    }

    for object in &description.shops {
        let spec = refs.spec(object)?;
        actors.push(item_actor(spec, ActorKind::Shop, &SHOP_DEFAULTS));
    }

    let spec = refs.spec(&description.player)?;
    let mut player = actor(spec, ActorKind::Player { inventory: Inventory::new() });
    if let Some(point) = spawn {
        player.place(point);
    }
    actors.push(player);

    Ok(actors)
}

fn actor(spec: ActorSpec, kind: ActorKind) -> Actor {
    let energy_levels: Vec<EnergyLevel> = spec.energy_levels.into_iter()
        .map(|level| EnergyLevel {
            fraction: level.minimum_energy,
            image: level.image,
            image_count: level.image_count.max(0) as u32,
        })
        .collect();

    let appearance = Appearance {
        image: spec.image,
        image_count: spec.image_count.max(0) as u32,
        color: spec.color.unwrap_or_default(),
        energy_levels,
    };

    let mut actor = Actor::new(
        spec.name,
        kind,
        Point::new(spec.x, spec.y),
        spec.minimum_energy.unwrap_or(0),
        spec.maximum_energy.unwrap_or(1),
        spec.maximum_lives.max(1) as u32,
    ).with_appearance(appearance);

    if let Some(type_name) = spec.type_name {
        actor.type_name = type_name;
    }
    actor
}

fn item_actor(mut spec: ActorSpec, kind: ActorKind, defaults: &ItemDefaults) -> Actor {
    spec.minimum_energy.get_or_insert(defaults.minimum_energy);
    spec.maximum_energy.get_or_insert(defaults.maximum_energy);
    spec.color.get_or_insert_with(|| defaults.color.to_string());
    actor(spec, kind)
}

fn base_name(path: &Path) -> String {
    // `3.level.json` -> `3`
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
        .to_string()
}

// ── Reference resolution ──

struct RefResolver {
    data_dir: PathBuf,
    cache: HashMap<PathBuf, Value>,
}

impl RefResolver {
    fn new(data_dir: &Path) -> Self {
        RefResolver { data_dir: data_dir.to_path_buf(), cache: HashMap::new() }
    }

    fn spec(&mut self, object: &JsonObject<String, Value>) -> Result<ActorSpec> {
        let resolved = self.resolve(object.clone(), 0)?;
        serde_json::from_value(Value::Object(resolved)).map_err(|source| LoadError::Json {
            path: self.data_dir.clone(),
            source,
        })
    }

    fn resolve(&mut self, mut object: JsonObject<String, Value>, depth: usize) -> Result<JsonObject<String, Value>> {
        let Some(reference) = object.remove("$ref") else {
            return Ok(object);
        };
        let reference = match reference {
            Value::String(reference) => reference,
            other => return Err(LoadError::Reference(other.to_string())),
        };
        if depth >= MAX_REF_DEPTH {
            return Err(LoadError::Reference(reference));
        }

        let referenced = self.lookup(&reference, depth)?;
        for (key, value) in referenced {
            object.entry(key).or_insert(value);
        }
        Ok(object)
    }

    fn lookup(&mut self, reference: &str, depth: usize) -> Result<JsonObject<String, Value>> {
        let (file, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let file = if file.is_empty() { BASICS_FILE } else { file };

        let path = self.data_dir.join(file);
        let mut object = match self.document(&path)? {
            Value::Object(root) => root,
            _ => return Err(LoadError::Reference(reference.to_string())),
        };
        object = self.resolve(object, depth + 1)?;

        for component in fragment.split('/').filter(|c| !c.is_empty()) {
            object = match object.remove(component) {
                Some(Value::Object(child)) => self.resolve(child, depth + 1)?,
                _ => return Err(LoadError::Reference(reference.to_string())),
            };
        }
        Ok(object)
    }

    fn document(&mut self, path: &Path) -> Result<Value> {
        if let Some(doc) = self.cache.get(path) {
            return Ok(doc.clone());
        }
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: Value = serde_json::from_str(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        self.cache.insert(path.to_path_buf(), doc.clone());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::ActorTag;
    use std::fs;
    use tempfile::TempDir;

    const MAP: &str = "GPGCGL\nGEGKG$\nmeta\n";

    fn data_dir(level: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test.map"), MAP).unwrap();
        fs::write(dir.path().join("1.level.json"), level).unwrap();
        fs::write(
            dir.path().join(BASICS_FILE),
            r##"{ "actors": { "hero": { "name": "Hero", "maximumEnergy": 5, "maximumLives": 3, "image": "hero.svg" },
                             "orc":  { "name": "Orc", "maximumEnergy": 2, "$ref": "#/actors/base" },
                             "base": { "image": "orc.svg", "imageCount": 4 } } }"##,
        ).unwrap();
        dir
    }

    const FULL_LEVEL: &str = r##"{
        "levelName": "Test Meadow",
        "map": { "filename": "test.map", "format": 2 },
        "player": { "$ref": "#/actors/hero", "x": 0, "y": 0, "maximumEnergy": 4 },
        "chests": [ { "name": "Box", "x": 1, "y": 0, "item": "Arrow", "amount": 3 } ],
        "ladders": [ { "name": "Down", "x": 2, "y": 0, "level": 2, "dx": 2, "dy": 1 } ],
        "enemies": [ { "$ref": "#/actors/orc", "x": 0, "y": 1 } ],
        "tentaklons": [ { "name": "Squid", "x": 1, "y": 1, "maximumEnergy": 3 } ],
        "shops": [ { "name": "Store", "x": 2, "y": 1 } ]
    }"##;

    fn load(dir: &TempDir) -> Level {
        load_level_file(dir.path(), Path::new("1.level.json"), None).unwrap()
    }

    #[test]
    fn roster_order_and_kinds() {
        let dir = data_dir(FULL_LEVEL);
        let level = load(&dir);
        let tags: Vec<ActorTag> = level.actors.iter().map(Actor::tag).collect();
        assert_eq!(tags, [
            ActorTag::Ladder, ActorTag::Chest, ActorTag::Enemy,
            ActorTag::Tentaklon, ActorTag::Shop, ActorTag::Player,
        ]);
        assert_eq!(level.name, "Test Meadow");
        assert_eq!((level.map.columns(), level.map.rows()), (3, 2));
    }

    #[test]
    fn references_fill_missing_keys_only() {
        let dir = data_dir(FULL_LEVEL);
        let level = load(&dir);
        let player = level.actors.last().unwrap();
        assert_eq!(player.name, "Hero");
        assert_eq!(player.maximum_energy(), 4); // local key wins
        assert_eq!(player.maximum_lives(), 3);
        assert_eq!(player.appearance.image, "hero.svg");
    }

    #[test]
    fn nested_references_are_followed() {
        let dir = data_dir(FULL_LEVEL);
        let level = load(&dir);
        let orc = &level.actors[2];
        assert_eq!(orc.name, "Orc");
        assert_eq!(orc.appearance.image, "orc.svg");
        assert_eq!(orc.appearance.image_count, 4);
    }

    #[test]
    fn item_defaults_apply() {
        let dir = data_dir(FULL_LEVEL);
        let level = load(&dir);
        let chest = &level.actors[1];
        assert_eq!((chest.minimum_energy(), chest.maximum_energy()), (1, 2));
        assert_eq!(chest.type_name, "Chest");
        assert_eq!(chest.appearance.color, "#b29764");
        match &level.actors[0].kind {
            ActorKind::Ladder { target, destination } => {
                assert_eq!(*target, LadderTarget::Level(2));
                assert_eq!(*destination, Point::new(2, 1));
            }
            other => panic!("expected ladder, got {other:?}"),
        }
    }

    #[test]
    fn ladder_without_level_is_same_level() {
        let level_json = r#"{ "map": { "filename": "test.map" },
            "player": { "x": 0, "y": 0 },
            "ladders": [ { "x": 2, "y": 0, "dx": 0, "dy": 1 }, { "x": 2, "y": 0, "level": -1 } ] }"#;
        let dir = data_dir(level_json);
        let level = load(&dir);
        for ladder in &level.actors[..2] {
            assert!(matches!(ladder.kind, ActorKind::Ladder { target: LadderTarget::SameLevel, .. }));
        }
    }

    #[test]
    fn ladder_level_beyond_u32_stays_on_level() {
        let level_json = r#"{ "map": { "filename": "test.map" },
            "player": { "x": 0, "y": 0 },
            "ladders": [ { "x": 2, "y": 0, "level": 4294967296 }, { "x": 2, "y": 0, "level": 4294967295 } ] }"#;
        let dir = data_dir(level_json);
        let level = load(&dir);
        assert!(matches!(level.actors[0].kind, ActorKind::Ladder { target: LadderTarget::SameLevel, .. }));
        assert!(matches!(level.actors[1].kind, ActorKind::Ladder { target: LadderTarget::Level(u32::MAX), .. }));
    }

    #[test]
    fn level_name_falls_back_to_file_base_name() {
        let dir = data_dir(r#"{ "map": { "filename": "test.map" }, "player": { "x": 1 } }"#);
        let level = load(&dir);
        assert_eq!(level.name, "1");
        assert_eq!(read_level_name(&dir.path().join("1.level.json")).unwrap(), "1");
    }

    #[test]
    fn spawn_override_moves_player_but_keeps_origin() {
        let dir = data_dir(FULL_LEVEL);
        let level = load_level_file(dir.path(), Path::new("1.level.json"), Some(Point::new(2, 1))).unwrap();
        let player = level.actors.last().unwrap();
        assert_eq!(player.position(), Point::new(2, 1));
        assert_eq!(player.origin(), Point::new(0, 0));
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = data_dir("{ not json");
        let err = load_level_file(dir.path(), Path::new("1.level.json"), None).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn missing_map_file_is_reported() {
        let dir = data_dir(r#"{ "map": { "filename": "absent.map" } }"#);
        let err = load_level_file(dir.path(), Path::new("1.level.json"), None).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn dangling_reference_is_reported() {
        let dir = data_dir(r##"{ "map": { "filename": "test.map" }, "player": { "$ref": "#/actors/nobody" } }"##);
        let err = load_level_file(dir.path(), Path::new("1.level.json"), None).unwrap_err();
        assert!(matches!(err, LoadError::Reference(_)));
    }

    #[test]
    fn validation_clears_unclaimed_spawn_markers() {
        // Only the player is described; every other marker is unclaimed.
        let dir = data_dir(r#"{ "map": { "filename": "test.map" }, "player": { "x": 0, "y": 0 } }"#);
        let mut level = load(&dir);
        // Five markers (C, L, E, K, $) are reported.
        assert_eq!(validate_actors(&mut level.map, &level.actors, &level.file, &level.map_file), 5);
        let flagged: Vec<Point> = level.map.tiles()
            .filter(|(_, t)| t.declared_spawn)
            .map(|(i, _)| level.map.point_of(i))
            .collect();
        assert_eq!(flagged, [Point::new(0, 0)]);
    }

    #[test]
    fn validation_keeps_claimed_markers() {
        let dir = data_dir(FULL_LEVEL);
        let mut level = load(&dir);
        assert_eq!(validate_actors(&mut level.map, &level.actors, &level.file, &level.map_file), 0);
        assert_eq!(level.map.tiles().filter(|(_, t)| t.declared_spawn).count(), 6);
    }

    #[test]
    fn level_file_names() {
        assert_eq!(level_file_name(3), "3.level.json");
    }
}
