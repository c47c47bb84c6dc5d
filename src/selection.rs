//! Small node selections that feed set exports: sphere pick and label list difference.

use std::collections::HashSet;

use crate::structs_and_impls::*;

/// Labels of nodes within `radius` of `center` (boundary included), in cloud order
pub fn nodes_within_sphere(cloud: &NodeCloud, center: &Point, radius: f64) -> Vec<usize> {
    cloud
        .nodes
        .iter()
        .filter(|node| (node.coordinates - center).norm() <= radius)
        .map(|node| node.label)
        .collect()
}

/// Nodes of `cloud` whose label is in `labels`, in cloud order
pub fn restrict_to_labels(cloud: &NodeCloud, labels: &[usize]) -> NodeCloud {
    let keep: HashSet<usize> = labels.iter().copied().collect();
    NodeCloud::new(
        cloud.instance.clone(),
        cloud.nodes.iter().filter(|node| keep.contains(&node.label)).cloned().collect(),
    )
}

/// Labels of `all` that are not in `remove`, keeping the order of `all`
pub fn label_difference(all: &[usize], remove: &[usize]) -> Vec<usize> {
    let remove: HashSet<usize> = remove.iter().copied().collect();
    all.iter().copied().filter(|label| !remove.contains(label)).collect()
}
