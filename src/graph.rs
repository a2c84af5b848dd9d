use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::compiler::{BlockId, CompileError, CompileResult, NodeGraph};

/// Orders blocks so every producer precedes its consumers.
///
/// Ties are broken by insertion order, so the result only depends on the graph
/// structure.
pub fn topo_sort(graph: &NodeGraph) -> CompileResult<Vec<BlockId>> {
    let mut indeg: Vec<usize> = vec![0; graph.len()];
    let mut outgoing: HashMap<BlockId, Vec<BlockId>> = HashMap::new();

    for link in graph.links() {
        let (from, to) = (link.from.block, link.to.block);
        let Some(entry) = indeg.get_mut(to.index()) else {
            return Err(CompileError::UnknownBlock(to.index()));
        };
        *entry += 1;
        outgoing.entry(from).or_default().push(to);
    }

    let mut ready: BinaryHeap<Reverse<BlockId>> = graph
        .block_ids()
        .filter(|id| indeg[id.index()] == 0)
        .map(Reverse)
        .collect();
    let mut order: Vec<BlockId> = Vec::with_capacity(graph.len());

    while let Some(Reverse(n)) = ready.pop() {
        order.push(n);
        if let Some(nexts) = outgoing.get(&n) {
            for m in nexts {
                let entry = &mut indeg[m.index()];
                *entry -= 1;
                if *entry == 0 {
                    ready.push(Reverse(*m));
                }
            }
        }
    }

    if order.len() != graph.len() {
        let stuck = graph
            .block_ids()
            .filter(|id| indeg[id.index()] > 0)
            .filter_map(|id| graph.name(id).ok().map(str::to_string))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CompileError::Cycle(format!(
            "cannot topologically sort, blocks on a cycle: {stuck}"
        )));
    }
    Ok(order)
}

/// Every block `start` depends on, `start` included.
pub fn upstream_reachable(graph: &NodeGraph, start: BlockId) -> BTreeSet<BlockId> {
    let mut incoming: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    for link in graph.links() {
        incoming
            .entry(link.to.block)
            .or_default()
            .push(link.from.block);
    }

    let mut visited: BTreeSet<BlockId> = BTreeSet::new();
    let mut stack: Vec<BlockId> = vec![start];
    while let Some(n) = stack.pop() {
        if !visited.insert(n) {
            continue;
        }
        if let Some(prevs) = incoming.get(&n) {
            stack.extend(prevs.iter().copied());
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::blocks::input::SystemValue;
    use crate::compiler::blocks::{ClampBlock, InputBlock, WaveBlock};

    #[test]
    fn producers_come_first_and_ties_follow_insertion_order() {
        let mut graph = NodeGraph::new();
        let clamp = graph.add_block("clamp", ClampBlock::default());
        let wave = graph.add_block("wave", WaveBlock::default());
        let time = graph.add_block("time", InputBlock::system(SystemValue::Time));
        let lone = graph.add_block("lone", ClampBlock::default());
        graph.connect_named(time, "output", wave, "input").unwrap();
        graph.connect_named(wave, "output", clamp, "value").unwrap();

        let order = topo_sort(&graph).unwrap();
        assert_eq!(order, vec![time, wave, clamp, lone]);
    }

    #[test]
    fn upstream_set_includes_start() {
        let mut graph = NodeGraph::new();
        let time = graph.add_block("time", InputBlock::system(SystemValue::Time));
        let wave = graph.add_block("wave", WaveBlock::default());
        let other = graph.add_block("other", ClampBlock::default());
        graph.connect_named(time, "output", wave, "input").unwrap();

        let up = upstream_reachable(&graph, wave);
        assert!(up.contains(&time));
        assert!(up.contains(&wave));
        assert!(!up.contains(&other));
    }
}
