//! Ruling-line ("lattice") table finder.
//!
//! Works on one page at a time, in top-down coordinates (y grows downwards,
//! as on screen). The input is whatever straight horizontal and vertical
//! strokes the page draws plus the bounding box of every character; the
//! output is the page's tables as rows of optional cell strings.
//!
//! ## Stages
//!
//! ```text
//! edges ──▶ filter ──▶ snap ──▶ join ──▶ intersections ──▶ cells ──▶ tables ──▶ rows
//! ```
//!
//! - **snap** moves nearly-aligned parallel strokes onto their mean position
//! - **join** fuses collinear strokes whose gap is within tolerance, so a
//!   line drawn in pieces becomes one edge
//! - **cells** are the smallest rectangles whose corners are intersections
//!   connected by edges
//! - **tables** are groups of cells sharing at least one corner; a lone
//!   cell (a framed paragraph, a page border) is not a table
//! - **rows** have one slot per distinct column start in the table, `None`
//!   where a spanning cell covers the slot

use crate::config::TableSettings;
use crate::pipeline::extract::{RawTable, Row};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Largest deviation for a stroke to still count as axis-aligned.
const AXIS_SLACK: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A horizontal or vertical ruling line. `x0 <= x1` and `top <= bottom`
/// always hold; one of the two extents is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl Edge {
    pub fn horizontal(x0: f32, x1: f32, y: f32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            x0: x0.min(x1),
            top: y,
            x1: x0.max(x1),
            bottom: y,
        }
    }

    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            x0: x,
            top: y0.min(y1),
            x1: x,
            bottom: y0.max(y1),
        }
    }

    /// Edge for the straight stroke `(x0, y0) -> (x1, y1)`, or `None` when
    /// the stroke is diagonal.
    pub fn from_segment(x0: f32, y0: f32, x1: f32, y1: f32) -> Option<Self> {
        let (dx, dy) = ((x1 - x0).abs(), (y1 - y0).abs());
        if dy <= AXIS_SLACK && dx > dy {
            Some(Self::horizontal(x0, x1, (y0 + y1) / 2.0))
        } else if dx <= AXIS_SLACK && dy > dx {
            Some(Self::vertical((x0 + x1) / 2.0, y0, y1))
        } else {
            None
        }
    }

    pub fn length(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }

    /// Coordinate across the edge: `y` for horizontals, `x` for verticals.
    fn position(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.top,
            Orientation::Vertical => self.x0,
        }
    }

    fn set_position(&mut self, p: f32) {
        match self.orientation {
            Orientation::Horizontal => {
                self.top = p;
                self.bottom = p;
            }
            Orientation::Vertical => {
                self.x0 = p;
                self.x1 = p;
            }
        }
    }

    fn start(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.x0,
            Orientation::Vertical => self.top,
        }
    }

    fn end(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.x1,
            Orientation::Vertical => self.bottom,
        }
    }

    fn extend_to(&mut self, end: f32) {
        match self.orientation {
            Orientation::Horizontal => self.x1 = self.x1.max(end),
            Orientation::Vertical => self.bottom = self.bottom.max(end),
        }
    }
}

/// One character with its tight bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextChar {
    pub ch: char,
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

/// A table cell rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl Cell {
    fn contains_center(&self, c: &TextChar) -> bool {
        let cx = (c.x0 + c.x1) / 2.0;
        let cy = (c.top + c.bottom) / 2.0;
        self.x0 <= cx && cx < self.x1 && self.top <= cy && cy < self.bottom
    }

    fn corners(&self) -> [Key; 4] {
        [
            key(self.x0, self.top),
            key(self.x1, self.top),
            key(self.x0, self.bottom),
            key(self.x1, self.bottom),
        ]
    }
}

/// Find every table on a page.
///
/// Tables come back ordered top-to-bottom, then left-to-right. Every cell
/// of a returned table is `Some`, possibly empty; `None` appears only where
/// a spanning cell covers a column slot.
pub fn find_tables(edges: &[Edge], chars: &[TextChar], settings: &TableSettings) -> Vec<RawTable> {
    let edges = merge_edges(edges, settings);
    let points = find_intersections(&edges, settings.intersection_tolerance);
    let cells = intersections_to_cells(&points);
    cells_to_tables(cells)
        .iter()
        .map(|cells| table_rows(cells, chars, settings))
        .collect()
}

// ── Edge clean-up ────────────────────────────────────────────────────────

fn merge_edges(edges: &[Edge], settings: &TableSettings) -> Vec<Edge> {
    let (mut horizontal, mut vertical): (Vec<Edge>, Vec<Edge>) = edges
        .iter()
        .copied()
        .filter(|e| e.length() >= settings.min_edge_length)
        .partition(|e| e.orientation == Orientation::Horizontal);

    snap(&mut horizontal, settings.snap_tolerance);
    snap(&mut vertical, settings.snap_tolerance);

    let mut merged = join(horizontal, settings.join_tolerance);
    merged.extend(join(vertical, settings.join_tolerance));
    merged
}

/// Cluster parallel edges by position and move each cluster to its mean.
fn snap(edges: &mut [Edge], tolerance: f32) {
    edges.sort_by(|a, b| a.position().total_cmp(&b.position()));
    let mut start = 0;
    while start < edges.len() {
        let mut end = start + 1;
        while end < edges.len() && edges[end].position() - edges[end - 1].position() <= tolerance {
            end += 1;
        }
        let mean =
            edges[start..end].iter().map(Edge::position).sum::<f32>() / (end - start) as f32;
        for edge in &mut edges[start..end] {
            edge.set_position(mean);
        }
        start = end;
    }
}

/// Merge collinear edges that overlap or nearly touch.
fn join(mut edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    edges.sort_by(|a, b| {
        a.position()
            .total_cmp(&b.position())
            .then(a.start().total_cmp(&b.start()))
    });
    let mut joined: Vec<Edge> = Vec::with_capacity(edges.len());
    for edge in edges {
        match joined.last_mut() {
            Some(last)
                if last.position() == edge.position() && edge.start() <= last.end() + tolerance =>
            {
                last.extend_to(edge.end());
            }
            _ => joined.push(edge),
        }
    }
    joined
}

// ── Intersections ────────────────────────────────────────────────────────

/// Grid point key, quantised to a thousandth of a point.
type Key = (i64, i64);

fn key(x: f32, y: f32) -> Key {
    ((x * 1000.0).round() as i64, (y * 1000.0).round() as i64)
}

#[derive(Debug)]
struct Intersection {
    x: f32,
    y: f32,
    horizontal: Vec<usize>,
    vertical: Vec<usize>,
}

/// Crossing points of vertical and horizontal edges, sorted by `x` then `y`.
fn find_intersections(edges: &[Edge], tolerance: f32) -> BTreeMap<Key, Intersection> {
    let mut points = BTreeMap::new();
    for (vi, v) in edges.iter().enumerate() {
        if v.orientation != Orientation::Vertical {
            continue;
        }
        for (hi, h) in edges.iter().enumerate() {
            if h.orientation != Orientation::Horizontal {
                continue;
            }
            let crosses = v.top - tolerance <= h.top
                && h.top <= v.bottom + tolerance
                && h.x0 - tolerance <= v.x0
                && v.x0 <= h.x1 + tolerance;
            if !crosses {
                continue;
            }
            let point = points.entry(key(v.x0, h.top)).or_insert_with(|| Intersection {
                x: v.x0,
                y: h.top,
                horizontal: Vec::new(),
                vertical: Vec::new(),
            });
            point.horizontal.push(hi);
            point.vertical.push(vi);
        }
    }
    points
}

// ── Cells and tables ─────────────────────────────────────────────────────

fn intersections_to_cells(points: &BTreeMap<Key, Intersection>) -> Vec<Cell> {
    fn shares(a: &[usize], b: &[usize]) -> bool {
        a.iter().any(|i| b.contains(i))
    }
    let connected = |a: &Key, b: &Key| {
        let (pa, pb) = (&points[a], &points[b]);
        if a.0 == b.0 {
            shares(&pa.vertical, &pb.vertical)
        } else if a.1 == b.1 {
            shares(&pa.horizontal, &pb.horizontal)
        } else {
            false
        }
    };

    let keys: Vec<Key> = points.keys().copied().collect();
    let mut cells = Vec::new();
    for (i, top_left) in keys.iter().enumerate() {
        let rest = &keys[i + 1..];
        let right: Vec<&Key> = rest.iter().filter(|k| k.1 == top_left.1).collect();

        'search: for below in rest.iter().filter(|k| k.0 == top_left.0) {
            if !connected(top_left, below) {
                continue;
            }
            for &beside in &right {
                if !connected(top_left, beside) {
                    continue;
                }
                let corner = (beside.0, below.1);
                if points.contains_key(&corner)
                    && connected(&corner, beside)
                    && connected(&corner, below)
                {
                    let (tl, br) = (&points[top_left], &points[&corner]);
                    cells.push(Cell {
                        x0: tl.x,
                        top: tl.y,
                        x1: br.x,
                        bottom: br.y,
                    });
                    break 'search;
                }
            }
        }
    }
    cells
}

fn cells_to_tables(cells: Vec<Cell>) -> Vec<Vec<Cell>> {
    fn root(parent: &mut [usize], i: usize) -> usize {
        let mut r = i;
        while parent[r] != r {
            r = parent[r];
        }
        let mut c = i;
        while parent[c] != r {
            let next = parent[c];
            parent[c] = r;
            c = next;
        }
        r
    }

    let mut parent: Vec<usize> = (0..cells.len()).collect();
    let mut owner: HashMap<Key, usize> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        for corner in cell.corners() {
            match owner.entry(corner) {
                Entry::Occupied(o) => {
                    let a = root(&mut parent, *o.get());
                    let b = root(&mut parent, i);
                    if a != b {
                        parent[b] = a;
                    }
                }
                Entry::Vacant(v) => {
                    v.insert(i);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<Cell>> = BTreeMap::new();
    for (i, cell) in cells.iter().enumerate() {
        groups.entry(root(&mut parent, i)).or_default().push(*cell);
    }

    let mut tables: Vec<Vec<Cell>> = groups.into_values().filter(|t| t.len() > 1).collect();
    let origin = |t: &[Cell]| {
        t.iter().fold((f32::INFINITY, f32::INFINITY), |(top, left), c| {
            (top.min(c.top), left.min(c.x0))
        })
    };
    tables.sort_by(|a, b| {
        let (at, al) = origin(a);
        let (bt, bl) = origin(b);
        at.total_cmp(&bt).then(al.total_cmp(&bl))
    });
    tables
}

// ── Rows and text ────────────────────────────────────────────────────────

fn table_rows(cells: &[Cell], chars: &[TextChar], settings: &TableSettings) -> RawTable {
    let sorted_unique = |mut v: Vec<f32>| {
        v.sort_by(f32::total_cmp);
        v.dedup();
        v
    };
    let columns = sorted_unique(cells.iter().map(|c| c.x0).collect());
    let tops = sorted_unique(cells.iter().map(|c| c.top).collect());

    tops.iter()
        .map(|&top| -> Row {
            columns
                .iter()
                .map(|&x0| {
                    cells
                        .iter()
                        .find(|c| c.top == top && c.x0 == x0)
                        .map(|c| cell_text(c, chars, settings))
                })
                .collect()
        })
        .collect()
}

fn cell_text(cell: &Cell, chars: &[TextChar], settings: &TableSettings) -> String {
    let mut inside: Vec<&TextChar> = chars.iter().filter(|c| cell.contains_center(c)).collect();
    inside.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));

    let mut lines: Vec<Vec<&TextChar>> = Vec::new();
    let mut line_top = f32::NEG_INFINITY;
    for ch in inside {
        match lines.last_mut() {
            Some(line) if ch.top - line_top <= settings.text_y_tolerance => line.push(ch),
            _ => {
                line_top = ch.top;
                lines.push(vec![ch]);
            }
        }
    }

    lines
        .iter_mut()
        .map(|line| {
            line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            render_line(line, settings.text_x_tolerance)
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_line(line: &[&TextChar], x_tolerance: f32) -> String {
    let mut out = String::new();
    let mut prev_x1: Option<f32> = None;
    for ch in line {
        if ch.ch.is_whitespace() || ch.ch.is_control() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            if let Some(x1) = prev_x1 {
                if ch.x0 - x1 > x_tolerance && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            out.push(ch.ch);
        }
        prev_x1 = Some(ch.x1);
    }
    out.trim().to_string()
}
