pub mod tilemm;
