use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Three-dimensional coordinate, in the frame of the assembly
pub type Point = Vector3<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {                   // Defines a structure to represent a mesh node
    pub label: usize,               // Abaqus node label (part-local, 1-based)
    pub coordinates: Point,         // Spatial coordinates x, y, z
}

impl Node {
    pub fn new(label: usize, coordinates: Point) -> Self {
        Node { label, coordinates }
    }
}

/// Ordered node cloud of one part instance
///
/// Input order is kept all the way through classification, so labels inside a band
/// come out in the same order the deck lists them.
#[derive(Debug, Clone, Default)]
pub struct NodeCloud {
    pub instance: String,           // Instance the nodes were resolved for ("" for flat decks)
    pub nodes: Vec<Node>,           // Nodes in deck order
}

impl NodeCloud {
    pub fn new(instance: impl Into<String>, nodes: Vec<Node>) -> Self {
        NodeCloud { instance: instance.into(), nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One compression site, either from the command line or from a row of the sites table
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: String,
    pub center: Point,              // Peak of the field
    pub upper: Point,               // Upper limit of the banded region
    pub lower: Point,               // Lower limit of the banded region
}

impl Site {
    pub fn new(name: impl Into<String>, center: Point, upper: Point, lower: Point) -> Self {
        Site { name: name.into(), center, upper, lower }
    }

    /// Node set prefix used for this site, e.g. "C5 left" -> "C5_LEFT_BAND"
    pub fn set_prefix(&self) -> String {
        format!("{}_BAND", self.name.trim().to_uppercase().replace(' ', "_"))
    }
}

/// Result of placing one signed axial distance into a band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandAssignment {
    Band(usize),                    // 0 = center slab, num_bands - 1 = edge slab
    Outside,                        // Beyond d_upper or below d_lower
}

impl BandAssignment {
    /// Index as written to output arrays, -1 for outside
    pub fn as_signed(&self) -> i32 {
        match self {
            BandAssignment::Band(index) => *index as i32,
            BandAssignment::Outside => -1,
        }
    }
}

/// Labels per band plus the number of nodes left outside the region
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandClassification {
    pub num_bands: usize,
    pub bands: Vec<Vec<usize>>,     // bands[i] = labels of band i, in input order
    pub outside: usize,             // Nodes routed to the outside bucket
}

impl BandClassification {
    pub fn empty(num_bands: usize) -> Self {
        BandClassification {
            num_bands,
            bands: vec![Vec::new(); num_bands],
            outside: 0,
        }
    }

    pub fn band(&self, index: usize) -> &[usize] {
        self.bands.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn classified(&self) -> usize {
        self.bands.iter().map(Vec::len).sum()
    }

    pub fn non_empty_bands(&self) -> usize {
        self.bands.iter().filter(|b| !b.is_empty()).count()
    }
}

/// How a band index is turned into a fractional position along the cosine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldConvention {
    /// p_i = i / (n - 1); the last band reaches the minimum value exactly
    #[default]
    Linear,
    /// p_i = i / n; the cosine reaches the minimum one virtual band past the edge
    VirtualEdge,
}

impl FieldConvention {
    pub fn name(&self) -> &'static str {
        match self {
            FieldConvention::Linear => "linear",
            FieldConvention::VirtualEdge => "virtual-edge",
        }
    }
}

impl std::fmt::Display for FieldConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Rounded field value per band, band 0 first
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTable {
    pub convention: FieldConvention,
    pub precision: u32,
    pub peak_value: f64,
    pub min_value: f64,
    pub positions: Vec<f64>,        // p_i used for each band
    pub values: Vec<f64>,           // f_i after rounding
}

impl FieldTable {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value formatted with the table precision, as it goes into the deck
    pub fn formatted(&self, band: usize) -> String {
        format!("{:.*}", self.precision as usize, self.values[band])
    }
}

/// Names used for the records of one band
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandNames {
    pub node_set: String,           // e.g. FIELD_BAND_1
    pub predefined_field: String,   // e.g. predefinedfield-1-fieldband1
}

impl BandNames {
    pub fn new(set_prefix: &str, site_index: usize, band: usize) -> Self {
        BandNames {
            node_set: format!("{}_{}", set_prefix, band + 1),
            predefined_field: format!("predefinedfield-{}-fieldband{}", site_index, band + 1),
        }
    }
}
