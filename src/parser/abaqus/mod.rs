pub mod abaqus_inp;
pub mod deck;
