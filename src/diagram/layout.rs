//! Text layout for parsed flowcharts.

use std::collections::HashMap;

use super::flowchart::{Direction, EdgeStyle, FlowEdge, FlowNode, Flowchart, NodeShape};
use super::theme::Glyphs;
use crate::core::text::width::{center_in_width, pad_to_width, visible_width};

const BOX_GAP: usize = 2;

struct NodeBox {
    lines: [String; 3],
    width: usize,
}

struct Ranking {
    rank: Vec<usize>,
    forward: Vec<(usize, usize)>,
    has_forward_out: Vec<bool>,
    has_forward_in: Vec<bool>,
}

/// Draws `chart` as boxed nodes in rank order followed by an edge listing.
pub fn draw(chart: &Flowchart, glyphs: &Glyphs) -> Vec<String> {
    let ranking = rank_nodes(chart);
    let boxes: Vec<NodeBox> = chart
        .nodes
        .iter()
        .map(|node| node_box(node, glyphs))
        .collect();

    let rank_count = ranking.rank.iter().copied().max().map_or(0, |max| max + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    for (idx, rank) in ranking.rank.iter().enumerate() {
        layers[*rank].push(idx);
    }
    if chart.direction.is_reversed() {
        layers.reverse();
    }

    let mut lines = if chart.direction.is_horizontal() {
        draw_columns(&layers, &boxes, &ranking, chart.direction, glyphs)
    } else {
        draw_rows(&layers, &boxes, &ranking, chart.direction, glyphs)
    };

    if !chart.edges.is_empty() {
        lines.push(String::new());
        lines.extend(chart.edges.iter().map(|edge| edge_line(chart, edge, glyphs)));
    }

    lines
}

/// Drops back-edges with a depth-first pass, then assigns longest-path ranks.
fn rank_nodes(chart: &Flowchart) -> Ranking {
    let count = chart.nodes.len();
    let index: HashMap<&str, usize> = chart
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
    for edge in &chart.edges {
        if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        {
            if from != to {
                adjacency[from].push(to);
            }
        }
    }

    // 0 = unvisited, 1 = on stack, 2 = done
    let mut state = vec![0u8; count];
    let mut forward: Vec<(usize, usize)> = Vec::new();
    for root in 0..count {
        if state[root] != 0 {
            continue;
        }
        state[root] = 1;
        let mut stack = vec![(root, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            if next == adjacency[node].len() {
                state[node] = 2;
                stack.pop();
                continue;
            }
            frame.1 += 1;
            let target = adjacency[node][next];
            match state[target] {
                0 => {
                    forward.push((node, target));
                    state[target] = 1;
                    stack.push((target, 0));
                }
                2 => forward.push((node, target)),
                _ => {}
            }
        }
    }

    let mut indegree = vec![0usize; count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut has_forward_out = vec![false; count];
    let mut has_forward_in = vec![false; count];
    for &(from, to) in &forward {
        indegree[to] += 1;
        outgoing[from].push(to);
        has_forward_out[from] = true;
        has_forward_in[to] = true;
    }

    let mut rank = vec![0usize; count];
    let mut ready: Vec<usize> = (0..count).filter(|idx| indegree[*idx] == 0).rev().collect();
    while let Some(node) = ready.pop() {
        for &next in &outgoing[node] {
            rank[next] = rank[next].max(rank[node] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(next);
            }
        }
    }

    Ranking {
        rank,
        forward,
        has_forward_out,
        has_forward_in,
    }
}

fn draw_rows(
    layers: &[Vec<usize>],
    boxes: &[NodeBox],
    ranking: &Ranking,
    direction: Direction,
    glyphs: &Glyphs,
) -> Vec<String> {
    let row_widths: Vec<usize> = layers
        .iter()
        .map(|layer| {
            let boxes_width: usize = layer.iter().map(|idx| boxes[*idx].width).sum();
            boxes_width + BOX_GAP * layer.len().saturating_sub(1)
        })
        .collect();
    let total_width = row_widths.iter().copied().max().unwrap_or(0);

    // Center column of every node, relative to the whole drawing.
    let mut centers: HashMap<usize, usize> = HashMap::new();
    for (layer, row_width) in layers.iter().zip(&row_widths) {
        let mut offset = (total_width - row_width) / 2;
        for idx in layer {
            centers.insert(*idx, offset + boxes[*idx].width / 2);
            offset += boxes[*idx].width + BOX_GAP;
        }
    }

    let mut lines = Vec::new();
    for (row, layer) in layers.iter().enumerate() {
        for line_idx in 0..3 {
            let joined = layer
                .iter()
                .map(|idx| boxes[*idx].lines[line_idx].as_str())
                .collect::<Vec<_>>()
                .join(&" ".repeat(BOX_GAP));
            lines.push(center_in_width(&joined, total_width).trim_end().to_string());
        }

        let Some(below) = layers.get(row + 1) else {
            break;
        };
        let (upper_marks, lower_marks) = match direction {
            Direction::BottomUp => (
                marks(layer, &centers, &ranking.has_forward_in, glyphs.up),
                marks(below, &centers, &ranking.has_forward_out, glyphs.vertical),
            ),
            _ => (
                marks(layer, &centers, &ranking.has_forward_out, glyphs.vertical),
                marks(below, &centers, &ranking.has_forward_in, glyphs.down),
            ),
        };
        lines.push(connector_row(&upper_marks, total_width));
        if let Some(branch) = branch_row(
            layer,
            below,
            &ranking.forward,
            &centers,
            direction.is_reversed(),
            total_width,
            glyphs,
        ) {
            lines.push(branch);
        }
        lines.push(connector_row(&lower_marks, total_width));
    }

    lines
}

fn marks(
    layer: &[usize],
    centers: &HashMap<usize, usize>,
    flags: &[bool],
    glyph: char,
) -> Vec<(usize, char)> {
    layer
        .iter()
        .filter(|idx| flags[**idx])
        .filter_map(|idx| centers.get(idx).map(|column| (*column, glyph)))
        .collect()
}

fn connector_row(marks: &[(usize, char)], width: usize) -> String {
    let mut row = vec![' '; width];
    for (column, glyph) in marks {
        if let Some(cell) = row.get_mut(*column) {
            *cell = *glyph;
        }
    }
    row.into_iter().collect::<String>().trim_end().to_string()
}

/// Horizontal line joining a parent to its children in the adjacent row, or `None` when no
/// parent there has more than one child.
fn branch_row(
    upper: &[usize],
    lower: &[usize],
    forward: &[(usize, usize)],
    centers: &HashMap<usize, usize>,
    reversed: bool,
    width: usize,
    glyphs: &Glyphs,
) -> Option<String> {
    let (parents, children) = if reversed { (lower, upper) } else { (upper, lower) };
    let fans: Vec<(usize, Vec<usize>)> = parents
        .iter()
        .filter_map(|parent| {
            let mut columns: Vec<usize> = forward
                .iter()
                .filter(|(from, to)| from == parent && children.contains(to))
                .filter_map(|(_, to)| centers.get(to).copied())
                .collect();
            columns.sort_unstable();
            columns.dedup();
            let column = centers.get(parent).copied()?;
            (!columns.is_empty()).then_some((column, columns))
        })
        .collect();
    if fans.iter().all(|(_, columns)| columns.len() < 2) {
        return None;
    }

    // [up, down, left, right] links per cell.
    let mut cells = vec![[false; 4]; width];
    let (parent_side, child_side) = if reversed { (1, 0) } else { (0, 1) };
    for (parent, columns) in &fans {
        let mut link = |column: usize, side: usize| {
            if let Some(cell) = cells.get_mut(column) {
                cell[side] = true;
            }
        };
        link(*parent, parent_side);
        for column in columns {
            link(*column, child_side);
        }
        let start = columns.iter().copied().chain([*parent]).min().unwrap_or(*parent);
        let end = columns.iter().copied().chain([*parent]).max().unwrap_or(*parent);
        for column in start..end {
            link(column, 3);
            link(column + 1, 2);
        }
    }

    let row: String = cells.into_iter().map(|cell| branch_glyph(cell, glyphs)).collect();
    Some(row.trim_end().to_string())
}

fn branch_glyph([up, down, left, right]: [bool; 4], glyphs: &Glyphs) -> char {
    match (up, down, left, right) {
        (false, false, false, false) => ' ',
        (false, false, _, _) => glyphs.horizontal,
        (true, true, false, false) | (true, false, false, false) | (false, true, false, false) => {
            glyphs.vertical
        }
        (true, true, _, _) => glyphs.junction,
        (true, false, true, true) => glyphs.tee_up,
        (false, true, true, true) => glyphs.tee_down,
        (true, false, false, true) => glyphs.bottom_left,
        (true, false, true, false) => glyphs.bottom_right,
        (false, true, false, true) => glyphs.top_left,
        (false, true, true, false) => glyphs.top_right,
    }
}

fn draw_columns(
    layers: &[Vec<usize>],
    boxes: &[NodeBox],
    ranking: &Ranking,
    direction: Direction,
    glyphs: &Glyphs,
) -> Vec<String> {
    struct Column {
        lines: Vec<String>,
        width: usize,
        out_rows: Vec<usize>,
        in_rows: Vec<usize>,
    }

    let columns: Vec<Column> = layers
        .iter()
        .map(|layer| {
            let width = layer.iter().map(|idx| boxes[*idx].width).max().unwrap_or(0);
            let mut lines = Vec::new();
            let mut out_rows = Vec::new();
            let mut in_rows = Vec::new();
            for (position, idx) in layer.iter().enumerate() {
                if position > 0 {
                    lines.push(String::new());
                }
                let middle = lines.len() + 1;
                if ranking.has_forward_out[*idx] {
                    out_rows.push(middle);
                }
                if ranking.has_forward_in[*idx] {
                    in_rows.push(middle);
                }
                lines.extend(boxes[*idx].lines.iter().cloned());
            }
            Column {
                lines,
                width,
                out_rows,
                in_rows,
            }
        })
        .collect();

    let height = columns.iter().map(|column| column.lines.len()).max().unwrap_or(0);
    let arrow: String = match direction {
        Direction::RightLeft => format!(" {}{}{} ", glyphs.left, glyphs.horizontal, glyphs.horizontal),
        _ => format!(" {}{}{} ", glyphs.horizontal, glyphs.horizontal, glyphs.right),
    };
    let blank_gap = " ".repeat(visible_width(&arrow));

    (0..height)
        .map(|row| {
            let mut line = String::new();
            for (col_idx, column) in columns.iter().enumerate() {
                let cell = column.lines.get(row).map(String::as_str).unwrap_or("");
                line.push_str(&pad_to_width(cell, column.width));
                let Some(next) = columns.get(col_idx + 1) else {
                    continue;
                };
                let (left_flow, right_flow) = match direction {
                    Direction::RightLeft => (&column.in_rows, &next.out_rows),
                    _ => (&column.out_rows, &next.in_rows),
                };
                if left_flow.contains(&row) || right_flow.contains(&row) {
                    line.push_str(&arrow);
                } else {
                    line.push_str(&blank_gap);
                }
            }
            line.trim_end().to_string()
        })
        .collect()
}

fn node_box(node: &FlowNode, glyphs: &Glyphs) -> NodeBox {
    let label = node.label.as_str();
    let inner_width = visible_width(label) + 2;
    let fill = glyphs.horizontal.to_string().repeat(inner_width);

    let (corners, sides) = match node.shape {
        NodeShape::Rect => (glyphs.square_corners(), (glyphs.vertical, glyphs.vertical)),
        NodeShape::Round => (glyphs.round_corners(), (glyphs.vertical, glyphs.vertical)),
        NodeShape::Stadium | NodeShape::Circle => (glyphs.round_corners(), ('(', ')')),
        NodeShape::Rhombus => (
            [glyphs.rise, glyphs.fall, glyphs.fall, glyphs.rise],
            ('<', '>'),
        ),
        NodeShape::Flag => (glyphs.square_corners(), ('>', glyphs.vertical)),
    };
    let [top_left, top_right, bottom_left, bottom_right] = corners;

    let lines = [
        format!("{top_left}{fill}{top_right}"),
        format!("{} {label} {}", sides.0, sides.1),
        format!("{bottom_left}{fill}{bottom_right}"),
    ];
    NodeBox {
        lines,
        width: inner_width + 2,
    }
}

fn edge_line(chart: &Flowchart, edge: &FlowEdge, glyphs: &Glyphs) -> String {
    let name = |id: &str| {
        chart
            .node(id)
            .map_or_else(|| id.to_string(), |node| node.label.clone())
    };

    let (fill, head) = match edge.style {
        EdgeStyle::Arrow => (glyphs.horizontal, Some(glyphs.right)),
        EdgeStyle::Open => (glyphs.horizontal, None),
        EdgeStyle::DottedArrow => (glyphs.dotted, Some(glyphs.right)),
        EdgeStyle::Dotted => (glyphs.dotted, None),
        EdgeStyle::Thick => (glyphs.thick, Some(glyphs.right)),
        EdgeStyle::ThickOpen => (glyphs.thick, None),
        EdgeStyle::Cross => (glyphs.horizontal, Some(glyphs.cross)),
        EdgeStyle::Circle => (glyphs.horizontal, Some(glyphs.circle)),
    };
    let tail = head.unwrap_or(fill);
    let connector = match &edge.label {
        Some(label) => format!("{fill}{fill} {label} {fill}{tail}"),
        None => format!("{fill}{fill}{tail}"),
    };

    format!("{} {connector} {}", name(&edge.from), name(&edge.to))
}
