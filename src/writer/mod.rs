pub mod inp_patch;
pub mod node_list;
pub mod xml_writer;
