// Import standard library modules for file I/O operations
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use nalgebra::{Rotation3, Unit};
use tracing::{debug, info, warn};

use crate::error::*;
use crate::parser::abaqus::deck::*;
use crate::structs_and_impls::*;

/// Nodes of one `*Part` block (or of the top level for flat decks)
#[derive(Debug, Clone, PartialEq)]
pub struct PartNodes {
    pub name: String,
    pub nodes: Vec<Node>,
}

/// Rotation line of an `*Instance`: axis through `a` and `b`, angle in degrees
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRotation {
    pub a: Point,
    pub b: Point,
    pub angle_degrees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDef {
    pub name: String,
    pub part: Option<String>,
    pub translation: Option<Point>,
    pub rotation: Option<InstanceRotation>,
    pub inline_nodes: Vec<Node>,    // *Node blocks written directly inside the instance
}

/// Parts and instances of a deck, enough to place every node in the assembly frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbaqusModel {
    pub parts: Vec<PartNodes>,
    pub instances: Vec<InstanceDef>,
}

// Where in the deck the section being read lives
enum Scope {
    TopLevel,
    Part(usize),                    // index into parts
    Instance(usize),                // index into instances
}

// Public structure for the Abaqus INP file parser
pub struct AbaqusInpParser;

impl AbaqusInpParser {
    /// Read and parse an .inp file
    pub fn parse_file(path: &Path) -> Result<(InpDeck, AbaqusModel), ParseError> {
        let text = fs::read_to_string(path)?;       // ? operator propagates any file opening errors
        let deck = InpDeck::parse(&text);
        let model = Self::parse_model(&deck)?;
        info!(
            "read {}: {} lines, {} part(s), {} instance(s)",
            path.display(),
            deck.len(),
            model.parts.len(),
            model.instances.len()
        );
        Ok((deck, model))
    }

    /// Walk the keyword sections and collect parts, instances and their nodes
    pub fn parse_model(deck: &InpDeck) -> Result<AbaqusModel, ParseError> {
        let mut model = AbaqusModel::default();
        let mut scope = Scope::TopLevel;

        for section in deck.sections() {
            let keyword = match deck.keyword_at(section.start) {
                Some(keyword) => keyword,
                None => continue,
            };

            match keyword.marker() {
                Some(Marker::Part) => {
                    let name = keyword.param("name").unwrap_or("").to_string();
                    model.parts.push(PartNodes { name, nodes: Vec::new() });
                    scope = Scope::Part(model.parts.len() - 1);
                }
                Some(Marker::EndPart) | Some(Marker::EndInstance) => {
                    scope = Scope::TopLevel;
                }
                Some(Marker::Instance) => {
                    let instance = Self::parse_instance(deck, section, keyword)?;
                    model.instances.push(instance);
                    scope = Scope::Instance(model.instances.len() - 1);
                }
                Some(Marker::Node) => {
                    let nodes = Self::parse_nodes(deck, section)?;
                    match scope {
                        Scope::Part(index) => model.parts[index].nodes.extend(nodes),
                        Scope::Instance(index) => model.instances[index].inline_nodes.extend(nodes),
                        Scope::TopLevel => {
                            // Flat decks without *Part keep their nodes at the top level
                            match model.parts.iter_mut().find(|p| p.name.is_empty()) {
                                Some(part) => part.nodes.extend(nodes),
                                None => model.parts.push(PartNodes { name: String::new(), nodes }),
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(model)
    }

    /// Parse node data lines "label, x, y[, z]" of one *Node section
    fn parse_nodes(deck: &InpDeck, section: Section) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();

        for (index, line) in deck.data_lines(section) {
            // Split line by commas to get node label and coordinates
            let parts: Vec<&str> = line
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();

            // Need at least the label and two coordinates
            if parts.len() < 3 {
                return Err(ParseError::Format {
                    line: index + 1,
                    message: format!("node line needs a label and 2 or 3 coordinates: '{}'", line.trim()),
                });
            }

            let label = parts[0].parse::<usize>().map_err(|e| {
                ParseError::NumberParse(format!("line {}: invalid node label '{}': {}", index + 1, parts[0], e))
            })?;

            let coordinates: Result<Vec<f64>, _> = parts[1..].iter().map(|s| s.parse::<f64>()).collect();
            let coordinates = coordinates.map_err(|e| {
                ParseError::NumberParse(format!("line {}: invalid coordinate in node {}: {}", index + 1, label, e))
            })?;
            if coordinates.iter().any(|c| !c.is_finite()) {
                return Err(ParseError::Format {
                    line: index + 1,
                    message: format!("non-finite coordinate in node {}: '{}'", label, line.trim()),
                });
            }

            // 2D decks have no z; take the first three values otherwise
            let z = coordinates.get(2).copied().unwrap_or(0.0);
            nodes.push(Node::new(label, Point::new(coordinates[0], coordinates[1], z)));
        }

        Ok(nodes)
    }

    /// *Instance keyword plus its optional translation and rotation lines
    fn parse_instance(deck: &InpDeck, section: Section, keyword: &Keyword) -> Result<InstanceDef, ParseError> {
        let name = keyword.param("name").ok_or_else(|| ParseError::Format {
            line: section.start + 1,
            message: "*Instance without name=".to_string(),
        })?;

        let mut instance = InstanceDef {
            name: name.to_string(),
            part: keyword.param("part").map(str::to_string),
            translation: None,
            rotation: None,
            inline_nodes: Vec::new(),
        };

        for (position, (index, line)) in deck.data_lines(section).enumerate() {
            let values = Self::parse_floats(line, index)?;
            match (position, values.len()) {
                (0, 3) => instance.translation = Some(Point::new(values[0], values[1], values[2])),
                (1, 7) => {
                    instance.rotation = Some(InstanceRotation {
                        a: Point::new(values[0], values[1], values[2]),
                        b: Point::new(values[3], values[4], values[5]),
                        angle_degrees: values[6],
                    })
                }
                _ => {
                    return Err(ParseError::Format {
                        line: index + 1,
                        message: format!("unexpected *Instance data line '{}'", line.trim()),
                    })
                }
            }
        }

        Ok(instance)
    }

    fn parse_floats(line: &str, index: usize) -> Result<Vec<f64>, ParseError> {
        line.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>().map_err(|e| {
                    ParseError::NumberParse(format!("line {}: invalid number '{}': {}", index + 1, s, e))
                })
            })
            .collect()
    }

    /// Node cloud of a named instance, in assembly coordinates
    ///
    /// Decks without any *Instance (flat decks, part-only decks with a single part)
    /// fall back to the nodes of the single part.
    pub fn instance_nodes(model: &AbaqusModel, instance_name: &str) -> Result<NodeCloud, ParseError> {
        if model.instances.is_empty() {
            if model.parts.len() == 1 {
                warn!(
                    "deck has no *Instance, using the {} nodes of part '{}' for '{}'",
                    model.parts[0].nodes.len(),
                    model.parts[0].name,
                    instance_name
                );
                return Ok(NodeCloud::new(instance_name, model.parts[0].nodes.clone()));
            }
            return Err(ParseError::UnknownInstance {
                name: instance_name.to_string(),
                available: Vec::new(),
            });
        }

        let instance = model
            .instances
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(instance_name))
            .ok_or_else(|| ParseError::UnknownInstance {
                name: instance_name.to_string(),
                available: model.instances.iter().map(|i| i.name.clone()).collect(),
            })?;

        let source: &[Node] = match &instance.part {
            Some(part_name) if instance.inline_nodes.is_empty() => model
                .parts
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(part_name))
                .map(|p| p.nodes.as_slice())
                .ok_or_else(|| ParseError::UnknownPart {
                    instance: instance.name.clone(),
                    part: part_name.clone(),
                })?,
            _ => &instance.inline_nodes,
        };

        let nodes = Self::place_nodes(source, instance)?;
        debug!("instance '{}': {} nodes", instance.name, nodes.len());
        Ok(NodeCloud::new(instance.name.clone(), nodes))
    }

    /// Apply translation, then rotation about the a -> b axis
    fn place_nodes(nodes: &[Node], instance: &InstanceDef) -> Result<Vec<Node>, ParseError> {
        let translation = instance.translation.unwrap_or_else(Point::zeros);

        let rotation = match &instance.rotation {
            Some(r) if r.angle_degrees != 0.0 => {
                let axis = Unit::try_new(r.b - r.a, 1e-12).ok_or_else(|| ParseError::Format {
                    line: 0,
                    message: format!("instance '{}' has a degenerate rotation axis", instance.name),
                })?;
                Some((r.a, Rotation3::from_axis_angle(&axis, r.angle_degrees.to_radians())))
            }
            _ => None,
        };

        Ok(nodes
            .iter()
            .map(|node| {
                let moved = node.coordinates + translation;
                let placed = match &rotation {
                    Some((origin, rot)) => origin + rot * (moved - origin),
                    None => moved,
                };
                Node::new(node.label, placed)
            })
            .collect())
    }

    /// Labels of a named node set, following `generate` ranges and nested set names
    pub fn node_set_labels(deck: &InpDeck, set_name: &str) -> Result<Vec<usize>, ParseError> {
        let mut visited = HashSet::new();
        Self::collect_set(deck, set_name, &mut visited)
    }

    fn collect_set(deck: &InpDeck, set_name: &str, visited: &mut HashSet<String>) -> Result<Vec<usize>, ParseError> {
        if !visited.insert(normalize_name(set_name)) {
            return Ok(Vec::new());      // Already expanded, nested sets can repeat
        }

        let mut labels = Vec::new();
        let mut found = false;

        for section in deck.sections() {
            let keyword = match deck.keyword_at(section.start) {
                Some(k) if k.is(Marker::Nset) => k,
                _ => continue,
            };
            if !keyword.param("nset").map_or(false, |n| n.eq_ignore_ascii_case(set_name)) {
                continue;
            }
            found = true;
            let generate = keyword.has_param("generate");

            for (index, line) in deck.data_lines(section) {
                let tokens: Vec<&str> = line.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
                if generate {
                    labels.extend(Self::expand_generate(&tokens, index)?);
                    continue;
                }
                for token in tokens {
                    match token.parse::<usize>() {
                        Ok(label) => labels.push(label),
                        Err(_) => labels.extend(Self::collect_set(deck, token, visited)?),
                    }
                }
            }
        }

        if !found {
            return Err(ParseError::UnknownNodeSet(set_name.to_string()));
        }
        Ok(labels)
    }

    // "first, last[, step]"
    fn expand_generate(tokens: &[&str], index: usize) -> Result<Vec<usize>, ParseError> {
        if tokens.len() < 2 || tokens.len() > 3 {
            return Err(ParseError::Format {
                line: index + 1,
                message: "generate line needs first, last[, step]".to_string(),
            });
        }
        let first = tokens[0].parse::<usize>()?;
        let last = tokens[1].parse::<usize>()?;
        let step = match tokens.get(2) {
            Some(s) => s.parse::<usize>()?,
            None => 1,
        };
        if step == 0 || last < first {
            return Err(ParseError::Format {
                line: index + 1,
                message: format!("invalid generate range {}..{} step {}", first, last, step),
            });
        }
        Ok((first..=last).step_by(step).collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = "\
*Heading
*Part, name=CORD
*Node
      1,           0.,           0.,          -5.
      2,           0.,           0.,           0.
      3,           1.,           0.,           5.
*Nset, nset=ALL, generate
 1, 3, 1
*Nset, nset=TIP
 3
*Nset, nset=BOTH
 1, TIP
*End Part
*Assembly, name=Assembly
*Instance, name=CORD-1, part=CORD
        10.,         0.,          0.
*End Instance
*Instance, name=CORD-2, part=CORD
         0.,         0.,          0.
         0.,         0.,          0.,         0.,         0.,          1.,         90.
*End Instance
*End Assembly
";

    fn model() -> (InpDeck, AbaqusModel) {
        let deck = InpDeck::parse(DECK);
        let model = AbaqusInpParser::parse_model(&deck).unwrap();
        (deck, model)
    }

    #[test]
    fn test_parts_and_instances() {
        let (_, model) = model();
        assert_eq!(model.parts.len(), 1);
        assert_eq!(model.parts[0].name, "CORD");
        assert_eq!(model.parts[0].nodes.len(), 3);
        assert_eq!(model.instances.len(), 2);
        assert_eq!(model.instances[0].part.as_deref(), Some("CORD"));
    }

    #[test]
    fn test_translated_instance() {
        let (_, model) = model();
        let cloud = AbaqusInpParser::instance_nodes(&model, "cord-1").unwrap();
        assert_eq!(cloud.instance, "CORD-1");
        assert_eq!(cloud.nodes[2].label, 3);
        assert!((cloud.nodes[2].coordinates - Point::new(11.0, 0.0, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn test_rotated_instance() {
        let (_, model) = model();
        let cloud = AbaqusInpParser::instance_nodes(&model, "CORD-2").unwrap();
        // 90 degrees about z takes (1, 0, 5) to (0, 1, 5)
        assert!((cloud.nodes[2].coordinates - Point::new(0.0, 1.0, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn test_unknown_instance_lists_available() {
        let (_, model) = model();
        match AbaqusInpParser::instance_nodes(&model, "NOPE") {
            Err(ParseError::UnknownInstance { available, .. }) => {
                assert_eq!(available, vec!["CORD-1".to_string(), "CORD-2".to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_flat_deck_without_parts() {
        let deck = InpDeck::parse("*Node\n1, 0., 0.\n2, 1., 2., 3.\n*Element, type=T3D2\n1, 1, 2\n");
        let model = AbaqusInpParser::parse_model(&deck).unwrap();
        let cloud = AbaqusInpParser::instance_nodes(&model, "PART-1_1-1").unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.nodes[0].coordinates, Point::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_bad_node_line() {
        let deck = InpDeck::parse("*Node\n1, x, 0., 0.\n");
        assert!(matches!(AbaqusInpParser::parse_model(&deck), Err(ParseError::NumberParse(_))));
    }

    #[test]
    fn test_non_finite_node_coordinate() {
        for line in ["1, nan, 0., 0.", "2, 0., inf, 0.", "3, 0., 0., -inf"] {
            let deck = InpDeck::parse(&format!("*Node\n{}\n", line));
            assert!(matches!(
                AbaqusInpParser::parse_model(&deck),
                Err(ParseError::Format { line: 2, .. })
            ));
        }
    }

    #[test]
    fn test_node_set_labels() {
        let (deck, _) = model();
        assert_eq!(AbaqusInpParser::node_set_labels(&deck, "all").unwrap(), vec![1, 2, 3]);
        assert_eq!(AbaqusInpParser::node_set_labels(&deck, "BOTH").unwrap(), vec![1, 3]);
        assert!(matches!(
            AbaqusInpParser::node_set_labels(&deck, "MISSING"),
            Err(ParseError::UnknownNodeSet(_))
        ));
    }
}
