use std::error::Error;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use coords::Coord;
use coords::Orientation;
use errors::EmitWarning;
use errors::ParseError;
use grid::Cell;
use grid::Column;
use grid::Entity;
use grid::Grid;
use grid::Kind;
use hints;

pub const HEADER: &str = "Hexcells level v1";

/// Side of the square token frame a level must fit in.
pub const FRAME: usize = 33;

/// A decoded level: metadata plus the populated grid, hints recomputed.
#[derive(Clone, Debug)]
pub struct Level {
    pub title: String,
    pub author: String,
    pub information: String,
    pub grid: Grid,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct EmitOptions {
    /// Prefix every line with a tab, the clipboard-friendly shape.
    pub padding: bool,
    /// Emit the current display state instead of the pristine revealed flags.
    pub display: bool,
}

// ---------------------------------------------------------------------------
// Decoding

type Frame<T> = Vec<Vec<T>>;

fn char_frame_of_text(text: &str) -> Result<Frame<(char, char)>, Box<dyn Error>> {
    let lines: Vec<_> = text.trim().split('\n').collect();
    if lines.len() != FRAME + 5 {
        return Err(Box::new(ParseError(format!(
            "wrong number of lines, got {}, expected {}",
            lines.len(),
            FRAME + 5
        ))));
    }
    let mut frame = vec![];
    for line in &lines[5..] {
        let line = line.trim();
        if line.len() != FRAME * 2 {
            return Err(Box::new(ParseError(format!(
                "all rows should have {} characters, found one with {}",
                FRAME * 2,
                line.len()
            ))));
        }
        let chars: Vec<_> = line.chars().collect();
        let row: Vec<_> = chars
            .chunks(2)
            .map(|chunk| match chunk {
                [left, right] => (*left, *right),
                _ => unreachable!(),
            })
            .collect();
        frame.push(row);
    }
    Ok(frame)
}

enum TokenLeft {
    Dot,
    SmallO,
    BigO,
    SmallX,
    BigX,
    Slash,
    Backslash,
    Pipe,
}

enum TokenRight {
    Dot,
    Plus,
    C,
    N,
}

fn lex_left(c: char) -> Result<TokenLeft, Box<dyn Error>> {
    type L = TokenLeft;
    match c {
        '.' => Ok(L::Dot),
        'o' => Ok(L::SmallO),
        'O' => Ok(L::BigO),
        'x' => Ok(L::SmallX),
        'X' => Ok(L::BigX),
        '/' => Ok(L::Slash),
        '\\' => Ok(L::Backslash),
        '|' => Ok(L::Pipe),
        _ => Err(Box::new(ParseError(format!("unknown left token '{}'", c)))),
    }
}

fn lex_right(c: char) -> Result<TokenRight, Box<dyn Error>> {
    type R = TokenRight;
    match c {
        '.' => Ok(R::Dot),
        '+' => Ok(R::Plus),
        'c' => Ok(R::C),
        'n' => Ok(R::N),
        _ => Err(Box::new(ParseError(format!("unknown right token '{}'", c)))),
    }
}

fn show_info_of(r: &TokenRight) -> u8 {
    match r {
        TokenRight::Dot => 0,
        TokenRight::Plus => 1,
        TokenRight::C | TokenRight::N => 2,
    }
}

fn parse_token(l: TokenLeft, r: TokenRight) -> Result<Option<Entity>, Box<dyn Error>> {
    type L = TokenLeft;
    type R = TokenRight;
    match (l, r) {
        (L::Dot, R::Dot) => Ok(None),
        (L::Dot, _right) => Err(Box::new(ParseError("hint flag on an empty slot".into()))),
        (L::SmallO, right) => Ok(Some(Entity::Cell(Cell::new(
            Kind::Empty,
            false,
            show_info_of(&right),
        )))),
        (L::BigO, right) => Ok(Some(Entity::Cell(Cell::new(
            Kind::Empty,
            true,
            show_info_of(&right),
        )))),
        (L::SmallX, right) => Ok(Some(Entity::Cell(Cell::new(
            Kind::Full,
            false,
            show_info_of(&right),
        )))),
        (L::BigX, right) => Ok(Some(Entity::Cell(Cell::new(
            Kind::Full,
            true,
            show_info_of(&right),
        )))),
        (_left @ (L::Slash | L::Backslash | L::Pipe), R::Dot) => {
            Err(Box::new(ParseError("column marker without a number".into())))
        }
        (L::Slash, right) => Ok(Some(Entity::Column(Column::new(
            Orientation::BottomLeft,
            matches!(right, R::C | R::N),
        )))),
        (L::Backslash, right) => Ok(Some(Entity::Column(Column::new(
            Orientation::BottomRight,
            matches!(right, R::C | R::N),
        )))),
        (L::Pipe, right) => Ok(Some(Entity::Column(Column::new(
            Orientation::Bottom,
            matches!(right, R::C | R::N),
        )))),
    }
}

/// Decode one level text into a [Level] with all hints recomputed.
pub fn decode(text: &str) -> Result<Level, Box<dyn Error>> {
    let lines: Vec<_> = text.trim().split('\n').collect();
    if lines.is_empty() || lines[0].trim() != HEADER {
        return Err(Box::new(ParseError("missing header line".into())));
    }
    let frame = char_frame_of_text(text)?;
    let title = lines[1].trim().to_string();
    let author = lines[2].trim().to_string();
    // The information may occupy one or both of the two metadata lines;
    // accept both shapes.
    let information = lines[3..5]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut grid = Grid::new();
    for (y, row) in frame.iter().enumerate() {
        for (x, (left, right)) in row.iter().enumerate() {
            let left = lex_left(*left)?;
            let right = lex_right(*right)?;
            if let Some(entity) = parse_token(left, right)? {
                grid.place(Coord::new(x as isize, y as isize), entity);
            }
        }
    }
    hints::full_update(&mut grid);
    Ok(Level {
        title,
        author,
        information,
        grid,
    })
}

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*Hexcells level v1[ \t]*\r?$").expect("static regex"));

/// Split a text that may hold several levels into one block per level.
/// A block starts at each header line and runs to the next one.
pub fn split_levels(text: &str) -> Vec<String> {
    let starts: Vec<usize> = HEADER_RE.find_iter(text).map(|m| m.start()).collect();
    let mut blocks = vec![];
    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).cloned().unwrap_or(text.len());
        blocks.push(text[*start..end].trim_end().to_string());
    }
    blocks
}

/// Decode every level of a possibly multi-level text. The titles are what a
/// host shows as tab labels.
pub fn load_all(text: &str) -> Result<Vec<Level>, Box<dyn Error>> {
    let mut levels = vec![];
    for block in split_levels(text) {
        levels.push(decode(&block)?);
    }
    Ok(levels)
}

// ---------------------------------------------------------------------------
// Encoding

/// Cells reserved for the host game's UI, one row per frame row.
/// `*` is soft-reserved (overlays: the top-left logo wedge and the counter
/// block in the top-right corner), ` ` is hard-reserved, `.` is free.
static UI_MASK: [&str; FRAME] = [
    "*****.......................**   ",
    "****........................**   ",
    "****........................**   ",
    "***.........................**   ",
    "***.........................*****",
    "**..........................*****",
    "**...............................",
    "*................................",
    "*................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
    ".................................",
];

static MASK: Lazy<Frame<char>> = Lazy::new(|| {
    let mask: Frame<char> = UI_MASK.iter().map(|row| row.chars().collect()).collect();
    for row in &mask {
        assert_eq!(row.len(), FRAME);
    }
    mask
});

fn mask_at(x: isize, y: isize) -> char {
    MASK[y as usize][x as usize]
}

/// Pick the translation that keeps the content inside the frame, overlaps the
/// reserved mask as little as possible, and sits closest to the board center.
/// Returns the translation together with the hard-overlap count of the
/// winner.
fn pick_translation(coords: &[Coord]) -> ((isize, isize), usize) {
    let minx = coords.iter().map(|c| c.x()).min().expect("non-empty");
    let maxx = coords.iter().map(|c| c.x()).max().expect("non-empty");
    let miny = coords.iter().map(|c| c.y()).min().expect("non-empty");
    let maxy = coords.iter().map(|c| c.y()).max().expect("non-empty");
    let frame = FRAME as isize;
    let mut best: Option<((usize, usize, isize), (isize, isize))> = None;
    for dx in -minx..=(frame - 1 - maxx) {
        for dy in -miny..=(frame - 1 - maxy) {
            let mut hard = 0;
            let mut soft = 0;
            for c in coords {
                match mask_at(c.x() + dx, c.y() + dy) {
                    ' ' => hard += 1,
                    '*' => soft += 1,
                    _ => (),
                }
            }
            // Squared distance of the content center from the board center,
            // scaled by 4 to stay integral.
            let ex = minx + maxx + 2 * dx - (frame - 1);
            let ey = miny + maxy + 2 * dy - (frame - 1);
            let d2 = ex * ex + ey * ey;
            let key = (hard, soft, d2);
            match best {
                Some((best_key, _)) if best_key <= key => (),
                _ => best = Some((key, (dx, dy))),
            }
        }
    }
    let (key, translation) = best.expect("at least one translation fits");
    (translation, key.0)
}

fn cell_tokens(cell: &Cell, display: bool) -> (char, char) {
    let shown = if display {
        cell.display().is_some()
    } else {
        cell.revealed
    };
    let left = match (cell.kind, shown) {
        (Kind::Empty, false) => 'o',
        (Kind::Empty, true) => 'O',
        (Kind::Full, false) => 'x',
        (Kind::Full, true) => 'X',
    };
    let right = match cell.show_info {
        0 => '.',
        1 => '+',
        _ => match cell.together() {
            Some(false) => 'n',
            _ => 'c',
        },
    };
    (left, right)
}

fn column_tokens(col: &Column) -> (char, char) {
    let left = match col.orientation {
        Orientation::BottomRight => '\\',
        Orientation::Bottom => '|',
        Orientation::BottomLeft => '/',
    };
    let right = if col.show_info {
        match col.together() {
            Some(false) => 'n',
            _ => 'c',
        }
    } else {
        '+'
    };
    (left, right)
}

/// Emit a level in the text format. Non-fatal layout complaints come back as
/// a secondary value next to the best-effort output.
pub fn encode(level: &Level, opts: EmitOptions) -> (String, Option<EmitWarning>) {
    let coords = level.grid.coords();
    let mut warning = None;
    let (dx, dy) = if coords.is_empty() {
        (0, 0)
    } else {
        let bounds = level.grid.bounds().expect("non-empty grid");
        if bounds.width() > FRAME as isize || bounds.height() > FRAME as isize {
            warning = Some(if bounds.width() > FRAME as isize {
                EmitWarning::TooWide
            } else {
                EmitWarning::TooTall
            });
            // Best effort: anchor at the top-left corner, clip the rest.
            (-bounds.min.x(), -bounds.min.y())
        } else {
            let (translation, hard) = pick_translation(&coords);
            if hard > 0 {
                warning = Some(EmitWarning::OverlapsUI);
            }
            translation
        }
    };

    let mut frame = vec![vec![('.', '.'); FRAME]; FRAME];
    for (coord, entity) in level.grid.iter() {
        let x = coord.x() + dx;
        let y = coord.y() + dy;
        if x < 0 || x >= FRAME as isize || y < 0 || y >= FRAME as isize {
            continue; // clipped, already warned
        }
        let tokens = match entity {
            Entity::Cell(cell) => cell_tokens(cell, opts.display),
            Entity::Column(col) => column_tokens(col),
        };
        frame[y as usize][x as usize] = tokens;
    }

    let mut lines = vec![
        HEADER.to_string(),
        level.title.clone(),
        level.author.clone(),
    ];
    // A single-line information gets a blank line prefixed; a two-line one is
    // written as-is.
    match level.information.find('\n') {
        None => {
            lines.push(String::new());
            lines.push(level.information.clone());
        }
        Some(at) => {
            lines.push(level.information[..at].to_string());
            lines.push(level.information[at + 1..].replace('\n', " "));
        }
    }
    for row in &frame {
        let mut line = String::with_capacity(FRAME * 2);
        for (left, right) in row {
            line.push(*left);
            line.push(*right);
        }
        lines.push(line);
    }
    let text = if opts.padding {
        lines
            .iter()
            .map(|l| format!("\t{}", l))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        lines.join("\n")
    };
    (text, warning)
}

// ---------------------------------------------------------------------------
// JSON dialect (interchange only; the text format is the native one)

#[derive(Serialize, Deserialize)]
struct JsonCell {
    id: usize,
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    neighbors: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    members: Option<Vec<usize>>,
    #[serde(default)]
    revealed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    together: Option<bool>,
    x: i64,
    y: i64,
}

#[derive(Serialize, Deserialize)]
struct JsonColumn {
    members: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    together: Option<bool>,
    x: i64,
    y: i64,
    angle: i32,
}

#[derive(Serialize, Deserialize)]
struct JsonLevel {
    version: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    information: String,
    cells: Vec<JsonCell>,
    columns: Vec<JsonColumn>,
}

pub fn to_json(level: &Level) -> Result<String, Box<dyn Error>> {
    let cells: Vec<(&Coord, &Cell)> = level.grid.iter_cells().collect();
    let id_of = |coord: &Coord| -> Option<usize> { cells.iter().position(|(c, _)| *c == coord) };
    let ids_of = |coords: &[Coord]| -> Vec<usize> {
        coords.iter().filter_map(|c| id_of(c)).collect()
    };
    let mut cells_json = vec![];
    for (id, (coord, cell)) in cells.iter().enumerate() {
        let neighbors: Vec<Coord> = coord
            .neighbors6()
            .iter()
            .filter(|c| level.grid.cell(c).is_some())
            .cloned()
            .collect();
        cells_json.push(JsonCell {
            id,
            kind: match cell.kind {
                Kind::Empty => 0,
                Kind::Full => 1,
            },
            neighbors: Some(ids_of(&neighbors)),
            members: if cell.show_info >= 1 {
                Some(ids_of(cell.members()))
            } else {
                None
            },
            revealed: cell.revealed,
            value: cell.value(),
            together: cell.together(),
            x: coord.x() as i64,
            y: coord.y() as i64,
        });
    }
    let mut columns_json = vec![];
    for (coord, col) in level.grid.iter_columns() {
        columns_json.push(JsonColumn {
            members: ids_of(col.members()),
            value: col.value(),
            together: col.together(),
            x: coord.x() as i64,
            y: coord.y() as i64,
            angle: col.orientation.angle(),
        });
    }
    let json = JsonLevel {
        version: 1,
        title: level.title.clone(),
        author: level.author.clone(),
        information: level.information.clone(),
        cells: cells_json,
        columns: columns_json,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Rebuild a level from the JSON dialect. Geometry comes from the stored
/// coordinates; member lists and values are recomputed, not trusted.
pub fn from_json(text: &str) -> Result<Level, Box<dyn Error>> {
    let json: JsonLevel = serde_json::from_str(text)?;
    let mut grid = Grid::new();
    for cell in &json.cells {
        let kind = match cell.kind {
            0 => Kind::Empty,
            1 => Kind::Full,
            k => return Err(Box::new(ParseError(format!("unknown cell kind {}", k)))),
        };
        let show_info = if cell.together.is_some() {
            2
        } else if cell.value.is_some() {
            1
        } else {
            0
        };
        grid.place(
            Coord::new(cell.x as isize, cell.y as isize),
            Entity::Cell(Cell::new(kind, cell.revealed, show_info)),
        );
    }
    for col in &json.columns {
        let orientation = Orientation::of_angle(col.angle)
            .ok_or_else(|| Box::new(ParseError(format!("unknown angle {}", col.angle))))?;
        grid.place(
            Coord::new(col.x as isize, col.y as isize),
            Entity::Column(Column::new(orientation, col.together.is_some())),
        );
    }
    hints::full_update(&mut grid);
    Ok(Level {
        title: json.title,
        author: json.author,
        information: json.information,
        grid,
    })
}
