#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// True if the directed graph given as adjacency lists contains a cycle.
///
/// Three-color depth-first search started from every unvisited vertex, so a
/// cycle anywhere in the graph is found.
pub(crate) fn has_cycle(adjacency: &[Vec<usize>]) -> bool {
    let mut colors = vec![Color::White; adjacency.len()];
    (0..adjacency.len())
        .any(|start| colors[start] == Color::White && visit(start, adjacency, &mut colors))
}

fn visit(vertex: usize, adjacency: &[Vec<usize>], colors: &mut [Color]) -> bool {
    colors[vertex] = Color::Grey;
    for &next in &adjacency[vertex] {
        let color = colors[next];
        match color {
            Color::Grey => return true,
            Color::White if visit(next, adjacency, colors) => return true,
            _ => {}
        }
    }
    colors[vertex] = Color::Black;
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acyclic_diamond() {
        let graph = vec![vec![1, 2], vec![3], vec![3], vec![]];
        assert!(!has_cycle(&graph));
    }

    #[test]
    fn self_loop() {
        assert!(has_cycle(&[vec![0]]));
    }

    #[test]
    fn long_cycle_through_visited_branch() {
        // 0 -> 1 -> 2 is finished before 3 -> 4 -> 5 -> 3 is explored.
        let graph = vec![vec![1, 3], vec![2], vec![], vec![4], vec![5], vec![3]];
        assert!(has_cycle(&graph));
    }

    #[test]
    fn cycle_not_reachable_from_first_vertex() {
        let graph = vec![vec![], vec![2], vec![3], vec![1]];
        assert!(has_cycle(&graph));
    }
}
