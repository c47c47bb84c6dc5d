pub mod abaqus;
pub mod sites_csv;
pub mod node_list;
