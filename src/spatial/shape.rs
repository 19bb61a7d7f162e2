//! Operations on shapes given as sets of relative cells
//!
//! Shapes originating from polyominoes always contain `(0, 0)`, which makes
//! the container-cell placement enumeration in the fitting and packing tests
//! complete: every placement must map `(0, 0)` onto some container cell.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::glues::{GlueRules, Glues};
use crate::spatial::direction::{direct_neighbors, neighbor};
use crate::spatial::{Cell, Direction};

/// Midpoint of the bounding box of a point set (componentwise floor)
pub fn center(points: impl IntoIterator<Item = Cell>) -> Cell {
    let mut min_x = i32::MAX;
    let mut max_x = i32::MIN;
    let mut min_y = i32::MAX;
    let mut max_y = i32::MIN;
    for (x, y) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_x > max_x {
        return (0, 0);
    }
    ((max_x + min_x).div_euclid(2), (max_y + min_y).div_euclid(2))
}

fn fits_at(container: &FxHashSet<Cell>, shape: &[Cell], offset: Cell) -> bool {
    shape
        .iter()
        .all(|(dx, dy)| container.contains(&(offset.0 + dx, offset.1 + dy)))
}

/// True iff the shape can be translated to fit inside the container
pub fn shape_fits(container: &FxHashSet<Cell>, shape: &[Cell]) -> bool {
    container
        .iter()
        .any(|offset| fits_at(container, shape, *offset))
}

/// All offsets at which the shape fits inside the container
pub fn placements(container: &FxHashSet<Cell>, shape: &[Cell]) -> Vec<Cell> {
    container
        .iter()
        .filter(|offset| fits_at(container, shape, **offset))
        .copied()
        .collect()
}

/// True iff all shapes can be placed disjointly inside the container
///
/// Recursive backtracking, largest shape first, with an early total-cell
/// cutoff.
pub fn is_packable(container: &FxHashSet<Cell>, shapes: &[Vec<Cell>]) -> bool {
    if shapes.iter().map(Vec::len).sum::<usize>() > container.len() {
        return false;
    }
    let mut ascending: Vec<&Vec<Cell>> = shapes.iter().collect();
    ascending.sort_by_key(|s| s.len());
    is_packable_recursive(container, &ascending)
}

fn is_packable_recursive(container: &FxHashSet<Cell>, ascending: &[&Vec<Cell>]) -> bool {
    let Some((largest, rest)) = ascending.split_last() else {
        return true;
    };
    for (x, y) in placements(container, largest) {
        let remaining: FxHashSet<Cell> = container
            .iter()
            .filter(|(cx, cy)| !largest.contains(&(cx - x, cy - y)))
            .copied()
            .collect();
        if is_packable_recursive(&remaining, rest) {
            return true;
        }
    }
    false
}

/// True iff the cell set is 4-connected; the empty set counts as connected
pub fn is_connected(shape: &FxHashSet<Cell>) -> bool {
    let Some(&start) = shape.iter().next() else {
        return true;
    };
    let mut reachable = FxHashSet::default();
    reachable.insert(start);
    let mut active = vec![start];
    while let Some(current) = active.pop() {
        for cell in direct_neighbors(current) {
            if shape.contains(&cell) && reachable.insert(cell) {
                active.push(cell);
            }
        }
    }
    reachable.len() == shape.len()
}

/// Cells glue-connected to `start` within a glue assignment
pub fn glue_connected_component(
    start: Cell,
    glues: &FxHashMap<Cell, Glues>,
    rules: &GlueRules,
) -> FxHashSet<Cell> {
    let mut visited = FxHashSet::default();
    if !glues.contains_key(&start) {
        return visited;
    }
    visited.insert(start);
    let mut active = vec![start];
    while let Some(current) = active.pop() {
        let Some(current_glues) = glues.get(&current) else {
            continue;
        };
        for direction in Direction::ALL {
            let next = neighbor(current, direction);
            if visited.contains(&next) {
                continue;
            }
            let Some(neighbor_glues) = glues.get(&next) else {
                continue;
            };
            if rules.sticks(
                current_glues.side(direction),
                neighbor_glues.side(direction.inverse()),
            ) {
                visited.insert(next);
                active.push(next);
            }
        }
    }
    visited
}

/// True iff every cell of a glue assignment lies in one glue component
pub fn is_connected_by_glues(glues: &FxHashMap<Cell, Glues>, rules: &GlueRules) -> bool {
    let Some(&start) = glues.keys().next() else {
        return true;
    };
    glue_connected_component(start, glues, rules).len() == glues.len()
}

/// Largest glue-connected component of a glue assignment
pub fn find_largest_glue_connected_component(
    glues: &FxHashMap<Cell, Glues>,
    rules: &GlueRules,
) -> FxHashSet<Cell> {
    let mut largest = FxHashSet::default();
    let mut remaining = glues.clone();
    while remaining.len() > largest.len() {
        let Some(&start) = remaining.keys().next() else {
            break;
        };
        let component = glue_connected_component(start, &remaining, rules);
        for cell in &component {
            remaining.remove(cell);
        }
        if component.len() > largest.len() {
            largest = component;
        }
    }
    largest
}

/// True iff `small` occurs inside `large` as a translated sub-shape with
/// identical glues on every matched cell
pub fn is_sub_shape_with_glues(
    small: &FxHashMap<Cell, Glues>,
    large: &FxHashMap<Cell, Glues>,
) -> bool {
    if small.len() > large.len() {
        return false;
    }
    large.keys().any(|(ox, oy)| {
        small.iter().all(|((dx, dy), glues)| {
            large
                .get(&(ox + dx, oy + dy))
                .is_some_and(|other| other == glues)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(raw: &[Cell]) -> FxHashSet<Cell> {
        raw.iter().copied().collect()
    }

    #[test]
    fn test_center_of_bounding_box() {
        assert_eq!(center([(0, 0), (4, 2)]), (2, 1));
        assert_eq!(center([(-3, -3), (0, 0)]), (-2, -2));
    }

    #[test]
    fn test_shape_fits_translated() {
        let container = cells(&[(0, 0), (1, 0), (2, 0), (2, 1)]);
        assert!(shape_fits(&container, &[(0, 0), (1, 0)]));
        assert!(shape_fits(&container, &[(0, 0), (0, 1)]));
        assert!(!shape_fits(&container, &[(0, 0), (1, 1)]));
    }

    #[test]
    fn test_packing_with_backtracking() {
        // 2x2 square: two dominoes pack, three do not
        let container = cells(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let domino = vec![(0, 0), (1, 0)];
        assert!(is_packable(&container, &[domino.clone(), domino.clone()]));
        assert!(!is_packable(
            &container,
            &[domino.clone(), domino.clone(), domino]
        ));
        // an L-tromino plus a single cell needs the backtracking step
        let l_piece = vec![(0, 0), (0, 1), (1, 1)];
        assert!(is_packable(&container, &[l_piece, vec![(0, 0)]]));
    }

    #[test]
    fn test_connectivity() {
        assert!(is_connected(&cells(&[])));
        assert!(is_connected(&cells(&[(0, 0), (0, 1), (1, 1)])));
        assert!(!is_connected(&cells(&[(0, 0), (1, 1)])));
    }

    #[test]
    fn test_glue_connectivity_requires_matching_edges() {
        let rules = GlueRules::reflexive();
        let mut glues = FxHashMap::default();
        glues.insert(
            (0, 0),
            Glues::new(None, Some("a".to_string()), None, None),
        );
        glues.insert(
            (1, 0),
            Glues::new(None, None, None, Some("a".to_string())),
        );
        glues.insert((2, 0), Glues::blank());
        assert!(!is_connected_by_glues(&glues, &rules));
        glues.remove(&(2, 0));
        assert!(is_connected_by_glues(&glues, &rules));
        assert_eq!(
            find_largest_glue_connected_component(&glues, &rules).len(),
            2
        );
    }

    #[test]
    fn test_sub_shape_matching_checks_glues() {
        let tagged = |label: &str| Glues::new(Some(label.to_string()), None, None, None);
        let mut small = FxHashMap::default();
        small.insert((0, 0), tagged("a"));
        let mut large = FxHashMap::default();
        large.insert((0, 0), tagged("b"));
        large.insert((1, 0), tagged("a"));
        assert!(is_sub_shape_with_glues(&small, &large));
        large.remove(&(1, 0));
        assert!(!is_sub_shape_with_glues(&small, &large));
        assert!(!is_sub_shape_with_glues(&large, &small) || large.len() <= small.len());
    }
}
