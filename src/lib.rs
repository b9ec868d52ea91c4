// https://github.com/oprypin/sixcells
// https://www.redblobgames.com/grids/hexagons/

extern crate crypto_hash;
extern crate itertools;
extern crate once_cell;
extern crate regex;
extern crate serde;
extern crate serde_json;

pub mod backend;
pub mod codec;
pub mod coords;
pub mod editor;
pub mod errors;
pub mod grid;
pub mod hints;
pub mod milp;
pub mod scene;
pub mod solver;
pub mod store;
