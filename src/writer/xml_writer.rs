use std::fs;
use std::path::Path;

use tracing::info;
use vtkio::model::*; // import model definition of a VTK file

use crate::error::WriterError;
use crate::structs_and_impls::*;

pub struct VTUWriter;

impl VTUWriter {

    /// Write the node cloud as vertex cells with the band index and field value of
    /// every node as point data. Outside nodes get band -1 and field 0.
    pub fn write_banded_cloud(
        cloud: &NodeCloud,
        assignments: &[BandAssignment],
        table: &FieldTable,
        output_path: &Path,
    ) -> Result<(), WriterError> {
        let vtu = Self::banded_cloud_bytes(cloud, assignments, table)?;

        fs::write(output_path, &vtu).map_err(|source| WriterError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;
        info!("band export written to {}", output_path.display());
        Ok(())
    }

    pub fn banded_cloud_bytes(
        cloud: &NodeCloud,
        assignments: &[BandAssignment],
        table: &FieldTable,
    ) -> Result<Vec<u8>, WriterError> {
        if assignments.len() != cloud.len() {
            return Err(WriterError::InvalidData(format!(
                "{} band assignments for {} nodes",
                assignments.len(),
                cloud.len()
            )));
        }

        // 1. Points data
        let points_data: Vec<f64> = cloud
            .nodes
            .iter()
            .flat_map(|node| node.coordinates.iter().copied())
            .collect();

        // 2. One vertex cell per node
        let num_nodes = cloud.len() as u64;
        let connectivity: Vec<u64> = (0..num_nodes).collect();
        let offsets: Vec<u64> = (1..=num_nodes).collect();
        let cell_types = vec![CellType::Vertex; cloud.len()];

        // 3. Point data: band index, field value, original label
        let bands: Vec<i32> = assignments.iter().map(BandAssignment::as_signed).collect();
        let fields: Vec<f64> = assignments
            .iter()
            .map(|assignment| match assignment {
                BandAssignment::Band(index) => table.values.get(*index).copied().unwrap_or(0.0),
                BandAssignment::Outside => 0.0,
            })
            .collect();
        let labels: Vec<u64> = cloud.nodes.iter().map(|node| node.label as u64).collect();

        let point_attributes = vec![
            Attribute::scalars("band", 1).with_data(IOBuffer::I32(bands)),
            Attribute::scalars("field", 1).with_data(IOBuffer::F64(fields)),
            Attribute::scalars("label", 1).with_data(IOBuffer::U64(labels)),
        ];

        let mut vtu = Vec::new();
        Vtk {
            version: Version { major: 2, minor: 2 },
            title: format!("{} bands of {}", table.len(), cloud.instance),
            byte_order: ByteOrder::LittleEndian,
            file_path: None,
            data: DataSet::inline(UnstructuredGridPiece {
                points: IOBuffer::F64(points_data),
                cells: Cells {
                    cell_verts: VertexNumbers::XML {
                        connectivity,
                        offsets,
                    },
                    types: cell_types,
                },
                data: Attributes {
                    point: point_attributes,
                    cell: Vec::new(),
                },
            }),
        }
        .write_xml(&mut vtu)?;

        Ok(vtu)
    }
}
