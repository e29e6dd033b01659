/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. Swap front/back
///
/// Every map tile is two terminal columns wide. The view scrolls with the
/// player when the map is larger than the terminal.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::actor::{Actor, ActorTag};
use crate::domain::grid::Point;
use crate::domain::tile::{Item, Terrain, Tile};
use crate::sim::backend::Backend;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: [u8; 8],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // occupies 2 terminal columns
    cont: bool,    // right half of a wide char, never printed
}

impl Cell {
    /// Explicit background for every "empty" cell. Using the same RGB for
    /// `Clear(ClearType::All)` keeps inter-row gaps on VTE terminals from
    /// showing as lines.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 24, b: 18 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 8],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Differs from any real cell, so a back buffer full of these forces a
    /// full repaint.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, bg: Color) -> Self {
        let mut cell = Self::from_char(c, Color::Reset, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// One column per char, clipped at the right edge.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Paint a whole row, then write `s` on it.
    fn bar(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', fg, bg));
        }
        self.put_str(0, y, s, fg, bg);
    }
}

// ── Camera ──

/// Viewport into the map. `origin` is the map coordinate of the top-left
/// visible tile and may be negative when a small map is centered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Camera {
    origin: Point,
    view_w: usize,
    view_h: usize,
}

impl Camera {
    /// Scroll so that `target` stays out of the outer fifth of the view.
    /// Axes where the map fits are centered instead.
    fn follow(&mut self, target: Point, map_w: usize, map_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.origin.x = follow_axis(self.origin.x, target.x, self.view_w, map_w);
        self.origin.y = follow_axis(self.origin.y, target.y, self.view_h, map_h);
    }

    fn to_map(&self, vx: usize, vy: usize) -> Point {
        Point::new(self.origin.x + vx as i32, self.origin.y + vy as i32)
    }
}

fn follow_axis(start: i32, target: i32, view: usize, world: usize) -> i32 {
    let (view, world) = (view as i32, world as i32);
    if world <= view {
        return -((view - world) / 2);
    }
    let margin = view / 5;
    let mut start = start;
    if target < start + margin {
        start = target - margin;
    } else if target > start + view - margin - 1 {
        start = target - view + margin + 1;
    }
    start.clamp(0, world - view)
}

// ── Colors and glyphs ──

/// `#rrggbb` from the level file. Anything else is ignored.
fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 { return None; }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb { r: channel(0)?, g: channel(2)?, b: channel(4)? })
}

fn dim(color: Color) -> Color {
    match color {
        Color::Rgb { r, g, b } => Color::Rgb { r: r / 2, g: g / 2, b: b / 2 },
        _ => Color::DarkGrey,
    }
}

/// Two narrow chars plus colors for a bare terrain tile.
fn terrain_look(terrain: Terrain) -> (char, char, Color, Color) {
    match terrain {
        Terrain::Grass     => ('"', ' ', Color::Rgb { r: 90, g: 160, b: 70 }, Color::Rgb { r: 34, g: 70, b: 30 }),
        Terrain::DeepWater => ('≈', '≈', Color::Rgb { r: 60, g: 90, b: 200 }, Color::Rgb { r: 10, g: 20, b: 90 }),
        Terrain::Water     => ('~', ' ', Color::Rgb { r: 120, g: 170, b: 240 }, Color::Rgb { r: 30, g: 60, b: 140 }),
        Terrain::Hill      => ('∩', ' ', Color::Rgb { r: 170, g: 140, b: 80 }, Color::Rgb { r: 80, g: 70, b: 35 }),
        Terrain::Mountain  => ('▲', '▲', Color::Rgb { r: 200, g: 200, b: 200 }, Color::Rgb { r: 80, g: 80, b: 80 }),
        Terrain::Sand      => ('·', ' ', Color::Rgb { r: 160, g: 140, b: 80 }, Color::Rgb { r: 190, g: 170, b: 110 }),
        Terrain::Ice       => ('░', '░', Color::Rgb { r: 230, g: 250, b: 255 }, Color::Rgb { r: 150, g: 200, b: 220 }),
        Terrain::Lava      => ('≈', '≈', Color::Rgb { r: 255, g: 200, b: 40 }, Color::Rgb { r: 170, g: 40, b: 10 }),
        Terrain::Unknown   => (' ', ' ', Color::Reset, Color::Reset),
    }
}

/// File stem of an image path: `actors/HeroTired.svg` -> `HeroTired`.
fn image_stem(image: &str) -> &str {
    let file = image.rsplit(['/', '\\']).next().unwrap_or(image);
    file.split('.').next().unwrap_or(file)
}

/// Glyph for the image an actor currently shows. Unknown images fall back
/// to the actor's kind.
fn image_glyph(image: &str) -> Option<char> {
    let glyph = match image_stem(image).to_ascii_lowercase().as_str() {
        "hero"      => '🧙',
        "herotired" => '🥵',
        "goblin"    => '👺',
        "orc"       => '👹',
        "tentaklon" => '🐙',
        "chest"     => '📦',
        "ladder"    => '🪜',
        "shop"      => '🏪',
        _ => return None,
    };
    Some(glyph)
}

fn actor_glyph(actor: &Actor) -> char {
    let mortal = actor.tag().is_autonomous() || actor.tag() == ActorTag::Player;
    if mortal && !actor.is_alive() {
        return '💀';
    }
    if let Some(glyph) = image_glyph(actor.image()) {
        return glyph;
    }
    match actor.tag() {
        ActorTag::Player    => '🧙',
        ActorTag::Enemy     => '👹',
        ActorTag::Tentaklon => '🐙',
        ActorTag::Chest     => '📦',
        ActorTag::Ladder    => '🪜',
        ActorTag::Shop      => '🏪',
    }
}

/// Odd animation frames lighten the actor's background.
fn animate(bg: Color, frame: u32) -> Color {
    match bg {
        Color::Rgb { r, g, b } if frame % 2 == 1 => Color::Rgb {
            r: r.saturating_add(24),
            g: g.saturating_add(24),
            b: b.saturating_add(24),
        },
        other => other,
    }
}

/// Background behind an actor: its level-file color, dimmed once used up.
fn actor_bg(actor: &Actor, terrain_bg: Color) -> Color {
    match parse_hex_color(&actor.appearance.color) {
        Some(c) if actor.is_depleted() => dim(c),
        Some(c) => c,
        None => terrain_bg,
    }
}

// ── Renderer ──

const CELL_W: usize = 2;

/// Vertical layout
const HUD_ROW: usize = 0;
const INVENTORY_ROW: usize = 1;
const MAP_ROW: usize = 3;

const HUD_BG: Color = Color::Rgb { r: 30, g: 45, b: 30 };
const MESSAGE_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    last_level: String,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::default(),
            last_level: String::new(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Draw one frame. `message` goes into the bar under the map.
    pub fn render(&mut self, game: &Backend, message: &str) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // A new level may be smaller than the last one; wipe leftovers.
        if self.last_level != game.level_name() {
            self.last_level = game.level_name().to_string();
            self.camera.origin = Point::default();
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let reserved_rows = MAP_ROW + 4; // HUD + inventory + gaps + message + help
        let max_view_h = self.term_h.saturating_sub(reserved_rows).max(1);
        self.camera.view_w = (self.term_w / CELL_W).min(game.columns().max(1));
        self.camera.view_h = max_view_h.min(game.rows().max(1));
        if let Some(player) = game.player() {
            self.camera.follow(player.position(), game.columns(), game.rows());
        }

        self.front.clear();
        self.compose(game, message);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // ResetColor would fall back to the terminal default, not BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, game: &Backend, message: &str) {
        self.front.bar(HUD_ROW, &hud_line(game), Color::White, HUD_BG);
        self.front.put_str(0, INVENTORY_ROW, &inventory_line(game), Color::Rgb { r: 200, g: 200, b: 160 }, Color::Reset);

        let cam = self.camera;
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= self.front.width { break; }
                match game.map().tile_at(cam.to_map(vx, vy)) {
                    Some(tile) => self.compose_tile(*tile, col, row),
                    None => self.compose_void(col, row),
                }
            }
        }

        // Where a downed player will respawn.
        if let Some(player) = game.player().filter(|p| !p.is_alive()) {
            if let Some((col, row)) = self.screen_pos(player.origin()) {
                let marker = Color::Rgb { r: 240, g: 220, b: 120 };
                self.front.set(col, row, Cell::from_char('[', marker, Color::Reset));
                self.front.set(col + 1, row, Cell::from_char(']', marker, Color::Reset));
            }
        }

        // Roster order puts the player last, so it ends up on top.
        for actor in game.actors() {
            let p = actor.position();
            let Some((col, row)) = self.screen_pos(p) else { continue };
            let terrain_bg = game.map().tile_at(p).map_or(Color::Reset, |t| terrain_look(t.terrain).3);
            let bg = animate(actor_bg(actor, terrain_bg), actor.frame(game.ticks()));
            self.front.set(col, row, Cell::from_char_wide(actor_glyph(actor), bg));
            self.front.set(col + 1, row, Cell::WIDE_CONT);
        }

        let msg_row = MAP_ROW + cam.view_h + 1;
        if msg_row < self.front.height && !message.is_empty() {
            self.front.bar(msg_row, &format!(" ◈ {} ", message), Color::Black, MESSAGE_BG);
        }

        let help_row = MAP_ROW + cam.view_h + 2;
        if help_row < self.front.height {
            let help = " Arrows/WASD:Move  Space:Respawn  R:Restart  N/P:Level  Q:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Terminal column and row of a map point, if it is in view.
    fn screen_pos(&self, p: Point) -> Option<(usize, usize)> {
        let cam = self.camera;
        let vx = p.x - cam.origin.x;
        let vy = p.y - cam.origin.y;
        if vx < 0 || vy < 0 || vx as usize >= cam.view_w || vy as usize >= cam.view_h {
            return None;
        }
        Some((vx as usize * CELL_W, MAP_ROW + vy as usize))
    }

    fn compose_void(&mut self, col: usize, row: usize) {
        self.front.set(col, row, Cell::BLANK);
        self.front.set(col + 1, row, Cell::BLANK);
    }

    fn compose_tile(&mut self, tile: Tile, col: usize, row: usize) {
        let (c0, c1, fg, bg) = terrain_look(tile.terrain);
        match tile.item {
            Some(Item::Tree) => {
                self.front.set(col, row, Cell::from_char_wide('🌲', bg));
                self.front.set(col + 1, row, Cell::WIDE_CONT);
            }
            Some(Item::Fence) => {
                let fence = Color::Rgb { r: 150, g: 110, b: 60 };
                self.front.set(col, row, Cell::from_char('╪', fence, bg));
                self.front.set(col + 1, row, Cell::from_char('═', fence, bg));
            }
            // Spawn markers are drawn by their actors; an orphaned one shows as terrain.
            _ => {
                self.front.set(col, row, Cell::from_char(c0, fg, bg));
                self.front.set(col + 1, row, Cell::from_char(c1, fg, bg));
            }
        }
    }
}

fn hud_line(game: &Backend) -> String {
    let name = if game.level_name().is_empty() { "-" } else { game.level_name() };
    match game.player() {
        Some(p) => {
            let ground = game.map().tile_at(p.position()).map_or("", |t| t.terrain.name());
            let enemies = if game.is_action_timer_running() { "" } else { "  │  enemies waiting" };
            format!(
                " {}  │  Energy {}/{}  │  ♥ {}/{}  │  {}  │  Ticks {}{} ",
                name, p.energy(), p.maximum_energy(), p.lives(), p.maximum_lives(), ground, game.ticks(), enemies,
            )
        }
        None => format!(" {}  │  no player  │  Ticks {} ", name, game.ticks()),
    }
}

fn inventory_line(game: &Backend) -> String {
    match game.inventory() {
        Some(inv) if !inv.is_empty() => {
            let items: Vec<String> = inv.slots().iter()
                .map(|s| format!("{} ×{}", s.item.name, s.amount))
                .collect();
            format!(" Bag: {}", items.join(", "))
        }
        _ => " Bag: empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_or_reject() {
        assert_eq!(parse_hex_color("#b29764"), Some(Color::Rgb { r: 0xb2, g: 0x97, b: 0x64 }));
        assert_eq!(parse_hex_color("b29764"), None);
        assert_eq!(parse_hex_color("#b297"), None);
        assert_eq!(parse_hex_color("#zz9764"), None);
    }

    #[test]
    fn small_map_is_centered() {
        let mut cam = Camera { origin: Point::default(), view_w: 10, view_h: 6 };
        cam.follow(Point::new(1, 1), 4, 2);
        assert_eq!(cam.origin, Point::new(-3, -2));
    }

    #[test]
    fn camera_scrolls_near_the_edge_and_clamps() {
        let mut cam = Camera { origin: Point::default(), view_w: 10, view_h: 10 };
        cam.follow(Point::new(5, 5), 40, 40);
        assert_eq!(cam.origin, Point::new(0, 0));

        cam.follow(Point::new(9, 0), 40, 40);
        assert_eq!(cam.origin.x, 2);

        cam.follow(Point::new(39, 39), 40, 40);
        assert_eq!(cam.origin, Point::new(30, 30));
    }

    #[test]
    fn wide_cells_keep_their_utf8() {
        let cell = Cell::from_char_wide('🌲', Color::Reset);
        assert_eq!(cell.as_str(), "🌲");
        assert!(cell.wide);
        assert_eq!(cell.bg, Cell::BASE_BG);
        assert_eq!(Cell::WIDE_CONT.as_str(), "");
    }

    #[test]
    fn glyph_follows_the_current_image() {
        assert_eq!(image_stem("actors/HeroTired.svg"), "HeroTired");
        assert_eq!(image_stem("Chest"), "Chest");
        assert_eq!(image_glyph("actors/Hero.svg"), Some('🧙'));
        assert_eq!(image_glyph("actors/HeroTired.svg"), Some('🥵'));
        assert_eq!(image_glyph("items/Ladder.svg"), Some('🪜'));
        assert_eq!(image_glyph("unicorn.png"), None);
    }

    #[test]
    fn odd_frames_lighten_the_background() {
        let bg = Color::Rgb { r: 10, g: 250, b: 0 };
        assert_eq!(animate(bg, 0), bg);
        assert_eq!(animate(bg, 1), Color::Rgb { r: 34, g: 255, b: 24 });
        assert_eq!(animate(Color::Reset, 1), Color::Reset);
    }

    #[test]
    fn put_str_clips_at_the_edge() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.put_str(2, 0, "abc", Color::White, Color::Reset);
        assert_eq!(fb.get(3, 0).as_str(), "b");
        assert_eq!(fb.get(1, 0), Cell::BLANK);
    }
}
